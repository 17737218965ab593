use anyhow::Result;
use raster_graph::builders::grid_graph::grid_to_edge_list;
use raster_graph::parsers::asc_grid::{load_asc, resolve_raster_base_path};
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use polars::prelude::*;
use serde_json;

#[derive(Debug)]
struct ConversionResult {
    raster: String,
    rows: u64,
    cols: u64,
    edges: u64,
    time_sec: f64,
    stats_json: String,
    error: String,
}

fn run_single_conversion(raster_path: &PathBuf) -> ConversionResult {
    let raster_name = raster_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| raster_path.display().to_string());

    let start_time = Instant::now();
    let default_error_stats = "{}".to_string();

    let grid = match load_asc(raster_path) {
        Ok(grid) => grid,
        Err(e) => {
            return ConversionResult {
                raster: raster_name,
                rows: 0,
                cols: 0,
                edges: 0,
                time_sec: start_time.elapsed().as_secs_f64(),
                stats_json: default_error_stats,
                error: format!("Failed to load raster: {}", e),
            };
        }
    };

    let build_time = Instant::now();
    let edge_list = grid_to_edge_list(grid.masked().view());
    let exec_time_build_only = build_time.elapsed().as_secs_f64();

    let stats = edge_list.stats(grid.ncols.max(1));
    let stats_json = serde_json::to_string(&stats).unwrap_or_else(|e| {
        eprintln!("Failed to serialize edge stats: {}", e);
        default_error_stats.clone()
    });

    let output_path = raster_path.with_file_name(format!("{}_edges.csv", raster_name));
    let write_result = (|| -> Result<()> {
        let mut df_edges = df!(
            "v1" => edge_list.sources.clone(),
            "v2" => edge_list.destinations.clone(),
            "weight" => edge_list.weights.clone(),
        )?;
        let mut output_file = File::create(&output_path)?;
        CsvWriter::new(&mut output_file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df_edges)?;
        Ok(())
    })();

    let error = match write_result {
        Ok(()) => String::new(),
        Err(e) => format!("Failed to write edge CSV: {}", e),
    };

    ConversionResult {
        raster: raster_name,
        rows: grid.nrows as u64,
        cols: grid.ncols as u64,
        edges: edge_list.len() as u64,
        time_sec: exec_time_build_only,
        stats_json,
        error,
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let rasters_to_run: Vec<PathBuf> = if args.is_empty() {
        let base_path = resolve_raster_base_path();
        println!("Raster base path: {:?}", base_path);
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "asc") {
                found.push(path);
            }
        }
        found.sort();
        found
    } else {
        args.into_iter().map(PathBuf::from).collect()
    };

    if rasters_to_run.is_empty() {
        println!("No .asc rasters to convert.");
        return Ok(());
    }

    println!("Starting conversions...\n");

    let mut all_results: Vec<ConversionResult> = Vec::new();
    for raster_path in &rasters_to_run {
        println!("Converting: {}", raster_path.display());
        let result = run_single_conversion(raster_path);
        println!(
            "  Finished: Grid={}x{}, Edges={}, Time={:.3}s, Stats={}, Error='{}'",
            result.rows, result.cols, result.edges, result.time_sec, result.stats_json, result.error
        );
        all_results.push(result);
    }

    println!("\nAll conversions completed. Writing summary to CSV...");

    let rasters_col: Vec<String> = all_results.iter().map(|r| r.raster.clone()).collect();
    let rows_col: Vec<u64> = all_results.iter().map(|r| r.rows).collect();
    let cols_col: Vec<u64> = all_results.iter().map(|r| r.cols).collect();
    let edges_col: Vec<u64> = all_results.iter().map(|r| r.edges).collect();
    let times_col: Vec<f64> = all_results.iter().map(|r| r.time_sec).collect();
    let stats_json_col: Vec<String> = all_results.iter().map(|r| r.stats_json.clone()).collect();
    let errors_col: Vec<String> = all_results.iter().map(|r| r.error.clone()).collect();

    let mut df_summary = df!(
        "raster" => rasters_col,
        "rows" => rows_col,
        "cols" => cols_col,
        "edges" => edges_col,
        "time_sec" => times_col,
        "stats_json" => stats_json_col,
        "error" => errors_col,
    )?;

    let mut output_file = File::create("edge_build_summary.csv")?;
    CsvWriter::new(&mut output_file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df_summary)?;

    println!("Summary successfully written to edge_build_summary.csv");

    Ok(())
}
