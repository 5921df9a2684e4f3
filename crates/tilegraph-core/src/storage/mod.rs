//! # Storage
//!
//! On-disk cache of the adjacency graph and edge scores.

mod cache_store;

pub use cache_store::*;
