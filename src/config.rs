use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pipeline configuration, loaded from a YAML file. Every field has a
/// default, so a partial file (or none at all) is fine. All knobs the
/// transforms take are plain parameters here; nothing is read from process
/// globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Index pages scraped for spreadsheet archive links (.zip/.csv).
    pub feeds: Vec<String>,
    /// Column holding the reporting period, as published ("일시").
    pub date_column: String,
    /// strptime-style period format; the monthly statistics use "%Y-%m".
    pub date_format: String,
    /// Name of the stamped region column ("구역").
    pub region_column: String,
    /// Columns removed after enrichment; missing names are ignored.
    pub drop_columns: Vec<String>,
    /// Numeric columns whose gaps are filled with the rounded column mean.
    pub impute_columns: Vec<String>,
    /// Where downloaded workbooks land.
    pub raw_dir: PathBuf,
    /// Where processed Parquet/CSV outputs go.
    pub out_dir: PathBuf,
    /// Where the processed-workbook history lives.
    pub history_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            feeds: Vec::new(),
            date_column: "일시".to_string(),
            date_format: "%Y-%m".to_string(),
            region_column: "구역".to_string(),
            drop_columns: Vec::new(),
            impute_columns: Vec::new(),
            raw_dir: PathBuf::from("data/raw"),
            out_dir: PathBuf::from("data/processed"),
            history_dir: PathBuf::from("history"),
        }
    }
}

impl Config {
    /// Load a config file, falling back to defaults when it doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {:?}", path))
    }
}
