//! # tilegraph
//!
//! Command-line front end for `tilegraph-core`: configuration file,
//! command parsing and command implementations.

pub mod cli;
pub mod config;
