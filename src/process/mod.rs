pub mod error;
pub mod impute;
pub mod periods;
pub mod sheets;
pub mod union;
pub mod utils;
pub mod write;

pub use error::TransformError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::config::Config;

/// Preprocess one workbook (a ZIP of per-region CSV sheets, a directory of
/// them, or a single standalone CSV): stack the region sheets, enrich the
/// date column with year/month, mean-fill the configured columns, and write
/// Parquet + CSV into `cfg.out_dir`. Returns the Parquet path.
#[instrument(level = "info", skip(path, cfg), fields(workbook = %path.as_ref().display()))]
pub fn run_workbook<P: AsRef<Path>>(path: P, cfg: &Config) -> Result<PathBuf> {
    let path = path.as_ref();
    let start = Instant::now();

    let is_csv = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    let raw_sheets = if path.is_dir() {
        sheets::load_region_dir(path)?
    } else if is_csv {
        sheets::load_single_csv(path)?
    } else {
        sheets::load_region_zip(path)?
    };
    info!(sheets = raw_sheets.len(), "loaded workbook");

    let batches: Vec<(String, RecordBatch)> = raw_sheets
        .par_iter()
        .map(|(region, sheet)| Ok((region.clone(), sheets::to_record_batch(sheet)?)))
        .collect::<Result<_>>()?;

    let stacked = union::stack_regions(&batches, &cfg.region_column)?;
    let enriched = periods::add_year_month(
        &stacked,
        &cfg.date_column,
        &cfg.drop_columns,
        &cfg.date_format,
    )?;

    let mut table = enriched;
    for column in &cfg.impute_columns {
        table = impute::fill_mean(&table, column)
            .with_context(|| format!("imputing column '{}'", column))?;
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "workbook".to_string());
    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating output directory {:?}", cfg.out_dir))?;

    let parquet_path = cfg.out_dir.join(format!("{}.parquet", stem));
    write::write_parquet(&table, &parquet_path)?;
    write::write_csv(&table, &cfg.out_dir.join(format!("{}.csv", stem)))?;

    info!(rows = table.num_rows(), elapsed = ?start.elapsed(), "workbook processed");
    Ok(parquet_path)
}
