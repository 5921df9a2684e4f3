//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use serde::Serialize;
use std::path::Path;
use tilegraph_core::storage::{rows_to_adjacency, rows_to_edge_scores};
use tilegraph_core::{Pipeline, PipelineOutput, TileGraphError, TileLayer, load_parcels};

fn print_json<T: Serialize>(value: &T) -> Result<(), TileGraphError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_tiles(config: &AppConfig) -> Result<TileLayer, TileGraphError> {
    let tiles = TileLayer::read(&config.inputs.tiles)?;
    tracing::debug!(
        path = %config.inputs.tiles.display(),
        tiles = tiles.len(),
        "tiles loaded"
    );
    Ok(tiles)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Counts reported after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tiles: usize,
    pub edges: usize,
    pub scores: usize,
    pub cache_hit: bool,
    pub mean_r2: Option<f64>,
}

impl RunSummary {
    #[must_use]
    pub fn from_output(output: &PipelineOutput) -> Self {
        Self {
            tiles: output.adjacency.tile_count(),
            edges: output.adjacency.edge_count(),
            scores: output.edge_scores.len(),
            cache_hit: output.cache_hit,
            mean_r2: output.mean_r2(),
        }
    }
}

/// Run the pipeline and print a summary.
pub fn cmd_run(config: &AppConfig, json_mode: bool) -> Result<(), TileGraphError> {
    let tiles = read_tiles(config)?;
    let pipeline = Pipeline::new(config.pipeline.clone())?;
    let inputs = &config.inputs;
    let output = pipeline.run(&config.sources(), &tiles, || {
        load_parcels(&inputs.parcels, &inputs.parcel_tile_field)
    })?;
    let summary = RunSummary::from_output(&output);

    if json_mode {
        return print_json(&summary);
    }

    println!("Tilegraph Run");
    println!("=============");
    println!("Tiles file:   {}", inputs.tiles.display());
    println!("Parcels file: {}", inputs.parcels.display());
    println!();
    println!(
        "Cache:        {}",
        if summary.cache_hit { "hit" } else { "miss" }
    );
    println!("Tiles:        {} (with at least one neighbor)", summary.tiles);
    println!("Edges:        {}", summary.edges);
    println!("Scores:       {}", summary.scores);
    match summary.mean_r2 {
        Some(r2) => println!("Mean R²:      {:.4}", r2),
        None => println!("Mean R²:      n/a"),
    }

    Ok(())
}

// =============================================================================
// FINGERPRINT COMMAND
// =============================================================================

/// Print the fingerprint of the current inputs.
pub fn cmd_fingerprint(config: &AppConfig) -> Result<(), TileGraphError> {
    let tiles = read_tiles(config)?;
    let pipeline = Pipeline::new(config.pipeline.clone())?;
    print_json(&pipeline.fingerprint(&config.sources(), &tiles))
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show the cached bundle and whether it is valid for the current inputs.
pub fn cmd_inspect(config: &AppConfig, json_mode: bool) -> Result<(), TileGraphError> {
    let cache = &config.pipeline.cache;
    let store = cache.store();
    let bundle = store.load();

    // The tiles file may be gone; the bundle is then simply not valid.
    let valid = match (&bundle.fingerprint, read_tiles(config)) {
        (Some(_), Ok(tiles)) => {
            let pipeline = Pipeline::new(config.pipeline.clone())?;
            let current = pipeline.fingerprint(&config.sources(), &tiles);
            bundle.reusable_for(&current).is_some()
        }
        (Some(_), Err(e)) => {
            tracing::warn!(error = %e, "cannot read tiles; cache treated as stale");
            false
        }
        (None, _) => false,
    };
    let edges = rows_to_adjacency(bundle.adjacency_rows.as_deref()).edge_count();
    let scores = rows_to_edge_scores(bundle.score_rows.as_deref()).len();

    if json_mode {
        let output = serde_json::json!({
            "dir": cache.dir.to_string_lossy(),
            "prefix": cache.prefix,
            "enabled": cache.enabled,
            "fingerprint": bundle.fingerprint,
            "adjacency_rows": bundle.adjacency_rows.as_ref().map(Vec::len),
            "score_rows": bundle.score_rows.as_ref().map(Vec::len),
            "edges": edges,
            "scores": scores,
            "valid": valid
        });
        return print_json(&output);
    }

    println!("Tilegraph Cache");
    println!("===============");
    println!("Directory: {}", cache.dir.display());
    println!("Prefix:    {}", cache.prefix);
    println!("Enabled:   {}", cache.enabled);
    println!();

    let Some(fingerprint) = &bundle.fingerprint else {
        println!("No cached bundle.");
        return Ok(());
    };
    println!("Algorithm:   {}", fingerprint.algo_version);
    println!("Buffer:      {} ft", fingerprint.params.buffer_feet);
    println!(
        "Tiles:       {}",
        fingerprint
            .tiles_sig
            .n_tiles
            .map_or_else(|| "unknown".to_string(), |n| n.to_string())
    );
    println!("Edges:       {}", edges);
    println!("Scores:      {}", scores);
    println!(
        "Valid:       {}",
        if valid { "yes" } else { "no (will recompute)" }
    );

    Ok(())
}

// =============================================================================
// CLEAR COMMAND
// =============================================================================

/// Delete the cached bundle.
pub fn cmd_clear(config: &AppConfig, json_mode: bool) -> Result<(), TileGraphError> {
    let removed = config.pipeline.cache.store().clear()?;
    tracing::info!(removed, "cache cleared");

    if json_mode {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!("Removed {} cache file(s)", removed);
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write a default configuration file.
pub fn cmd_init(path: &Path, force: bool) -> Result<(), TileGraphError> {
    if path.exists() && !force {
        return Err(TileGraphError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    AppConfig::default().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
