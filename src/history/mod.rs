use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

const HISTORY_FILE: &str = "processed.json";

/// Load the set of workbook names already processed. An absent history file
/// means nothing has been processed yet.
pub fn load_processed(dir: &Path) -> Result<HashSet<String>> {
    let path = dir.join(HISTORY_FILE);
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let f = File::open(&path).with_context(|| format!("opening {:?}", path))?;
    let names: Vec<String> =
        serde_json::from_reader(f).with_context(|| format!("parsing {:?}", path))?;
    Ok(names.into_iter().collect())
}

/// Record `name` as processed. The file is rewritten sorted, via a tmp file
/// and rename so a crash can't corrupt the history.
pub fn record_processed(dir: &Path, name: &str) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating history dir {:?}", dir))?;

    let mut names: Vec<String> = load_processed(dir)?.into_iter().collect();
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
    names.sort();

    let tmp_path = dir.join(".processed.json.tmp");
    let mut tmp = File::create(&tmp_path).with_context(|| format!("creating {:?}", tmp_path))?;
    serde_json::to_writer_pretty(&mut tmp, &names).context("serializing history")?;
    tmp.write_all(b"\n")?;

    let path = dir.join(HISTORY_FILE);
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_loads_as_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_processed(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn recorded_names_round_trip_and_deduplicate() {
        let dir = tempfile::tempdir().unwrap();
        record_processed(dir.path(), "gangwon_2023.zip").unwrap();
        record_processed(dir.path(), "gangwon_2022.zip").unwrap();
        record_processed(dir.path(), "gangwon_2023.zip").unwrap();

        let processed = load_processed(dir.path()).unwrap();
        assert_eq!(processed.len(), 2);
        assert!(processed.contains("gangwon_2023.zip"));
        assert!(processed.contains("gangwon_2022.zip"));
    }
}
