use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use csv::ReaderBuilder;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::process::error::TransformError;
use crate::process::utils::clean_str;

/// One region's sheet as it comes off disk: a header row plus string records.
#[derive(Debug)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse one CSV sheet (header row first) into a `RawSheet`.
pub fn read_csv_sheet<R: Read>(reader: R) -> Result<RawSheet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(clean_str)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    Ok(RawSheet { headers, rows })
}

/// Region label for a sheet file: the file stem ("춘천시.csv" → "춘천시").
fn region_label(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
}

/// Open a workbook archive (a ZIP of per-region CSVs, one sheet per region)
/// and load every `.csv` entry in archive order. The entry order is the block
/// order later passed to `stack_regions`, so it is preserved deliberately.
pub fn load_region_zip<P: AsRef<Path>>(zip_path: P) -> Result<Vec<(String, RawSheet)>> {
    let file = File::open(&zip_path)
        .with_context(|| format!("opening workbook archive {:?}", zip_path.as_ref()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading workbook archive {:?}", zip_path.as_ref()))?;

    let mut sheets = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("ZIP entry #{} in {:?}", i, zip_path.as_ref()))?;
        let name = entry.name().to_string();

        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            debug!(entry = %name, "skipping non-CSV entry");
            continue;
        }
        let Some(region) = region_label(&name) else {
            warn!(entry = %name, "no usable region label, skipping");
            continue;
        };

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .with_context(|| format!("reading {} into memory", name))?;
        let sheet = read_csv_sheet(Cursor::new(buf))
            .with_context(|| format!("parsing sheet {}", name))?;

        debug!(region = %region, rows = sheet.rows.len(), "loaded sheet");
        sheets.push((region, sheet));
    }

    Ok(sheets)
}

/// Load a standalone CSV file as a one-sheet workbook; the file stem is the
/// region label. This is how single-sheet downloads from the portals come in.
pub fn load_single_csv<P: AsRef<Path>>(path: P) -> Result<Vec<(String, RawSheet)>> {
    let path = path.as_ref();
    let region = region_label(&path.to_string_lossy())
        .with_context(|| format!("no usable region label in {:?}", path))?;
    let file = File::open(path).with_context(|| format!("opening sheet {:?}", path))?;
    let sheet = read_csv_sheet(file).with_context(|| format!("parsing sheet {:?}", path))?;
    Ok(vec![(region, sheet)])
}

/// Load every `*.csv` in `dir` as a region sheet, sorted by path so the block
/// order is deterministic.
pub fn load_region_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<(String, RawSheet)>> {
    let pattern = dir.as_ref().join("*.csv");
    let mut paths: Vec<_> = glob::glob(&pattern.to_string_lossy())
        .context("globbing region sheets")?
        .filter_map(|p| p.ok())
        .collect();
    paths.sort();

    let mut sheets = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(region) = region_label(&path.to_string_lossy()) else {
            continue;
        };
        let file = File::open(&path).with_context(|| format!("opening sheet {:?}", path))?;
        let sheet =
            read_csv_sheet(file).with_context(|| format!("parsing sheet {:?}", path))?;
        sheets.push((region, sheet));
    }

    Ok(sheets)
}

/// Convert a raw sheet into an all-Utf8 record batch. Every column is
/// nullable; empty (or whitespace-only) cells and short rows become nulls.
pub fn to_record_batch(sheet: &RawSheet) -> Result<RecordBatch, TransformError> {
    let fields: Vec<Field> = sheet
        .headers
        .iter()
        .map(|h| Field::new(h, DataType::Utf8, true))
        .collect();

    let mut builders: Vec<StringBuilder> = sheet
        .headers
        .iter()
        .map(|_| StringBuilder::with_capacity(sheet.rows.len(), 0))
        .collect();

    for row in &sheet.rows {
        for (i, builder) in builders.iter_mut().enumerate() {
            match row.get(i).map(|v| clean_str(v)) {
                Some(v) if !v.is_empty() => builder.append_value(v),
                _ => builder.append_null(),
            }
        }
    }

    let columns: Vec<ArrayRef> = builders
        .into_iter()
        .map(|mut b| Arc::new(b.finish()) as ArrayRef)
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}
