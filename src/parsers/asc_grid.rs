use anyhow::{Context, Result, bail};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::grid_graph::mask_sentinel;

const DEFAULT_NODATA: f64 = -9999.0;

/// An Esri ASCII grid: header metadata plus the raw cell values. The nodata
/// sentinel is kept verbatim here; `masked` applies it.
#[derive(Debug, Clone, PartialEq)]
pub struct AscGrid {
    pub nrows: usize,
    pub ncols: usize,
    pub cellsize: f64,
    pub nodata: f64,
    pub values: Array2<f64>,
}

impl AscGrid {
    /// Cell values with the nodata sentinel replaced by `None`.
    pub fn masked(&self) -> Array2<Option<f64>> {
        mask_sentinel(self.values.view(), self.nodata)
    }
}

pub fn resolve_raster_base_path() -> PathBuf {
    let mut base_path = PathBuf::from("./rasters/");
    if !base_path.exists() {
        base_path = PathBuf::from(".");
        eprintln!("Warning: Default raster path not found. Using current directory.");
    }
    base_path
}

pub fn load_asc<P: AsRef<Path>>(file_path: P) -> Result<AscGrid> {
    let path = file_path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read raster file {}", path.display()))?;
    parse_asc(&text).with_context(|| format!("Malformed ASCII grid in {}", path.display()))
}

fn parse_asc(text: &str) -> Result<AscGrid> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

    let mut ncols = None;
    let mut nrows = None;
    let mut cellsize = 1.0;
    let mut nodata = DEFAULT_NODATA;

    // Header lines are `key value`; the data section starts at the first line
    // whose first token parses as a number.
    while let Some(line) = lines.peek() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else { break };
        if key.parse::<f64>().is_ok() {
            break;
        }

        let value = tokens
            .next()
            .with_context(|| format!("Header line '{}' has no value", line.trim()))?;
        match key.to_ascii_lowercase().as_str() {
            "ncols" => ncols = Some(value.parse::<usize>().context("Invalid ncols")?),
            "nrows" => nrows = Some(value.parse::<usize>().context("Invalid nrows")?),
            "cellsize" => cellsize = value.parse().context("Invalid cellsize")?,
            "nodata_value" => nodata = value.parse().context("Invalid NODATA_value")?,
            // xllcorner/yllcorner and any vendor extras are irrelevant here.
            _ => {}
        }
        lines.next();
    }

    let ncols = ncols.context("Missing required header key ncols")?;
    let nrows = nrows.context("Missing required header key nrows")?;

    let mut cells = Vec::with_capacity(nrows * ncols);
    for (row_idx, line) in lines.enumerate() {
        if row_idx >= nrows {
            bail!("More data rows than the declared nrows {}", nrows);
        }
        let before = cells.len();
        for token in line.split_whitespace() {
            let v: f64 = token
                .parse()
                .with_context(|| format!("Non-numeric cell '{}' in data row {}", token, row_idx))?;
            cells.push(v);
        }
        let width = cells.len() - before;
        if width != ncols {
            bail!(
                "Data row {} has {} cells, expected ncols {}",
                row_idx,
                width,
                ncols
            );
        }
    }
    if cells.len() != nrows * ncols {
        bail!(
            "Expected {} data rows of {} cells, found {} cells total",
            nrows,
            ncols,
            cells.len()
        );
    }

    let values = Array2::from_shape_vec((nrows, ncols), cells)
        .context("Cell values do not form an nrows x ncols array")?;

    Ok(AscGrid {
        nrows,
        ncols,
        cellsize,
        nodata,
        values,
    })
}
