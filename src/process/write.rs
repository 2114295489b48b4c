use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression};
use parquet::file::properties::WriterProperties;
use tracing::debug;

/// Write `batch` as Parquet. Goes to a `.tmp` sibling first and renames over
/// the target so a crash never leaves a truncated output file.
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::BROTLI(BrotliLevel::try_new(5)?))
        .set_dictionary_enabled(true)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("opening parquet writer")?;
    writer.write(batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

/// Write `batch` as CSV with a header row. Same tmp-then-rename dance as
/// `write_parquet`, so the target is never seen half-written.
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("creating {:?}", tmp_path))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch).context("writing csv batch")?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote csv");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Schema::new(vec![Field::new("구역", DataType::Utf8, true)]);
        let col: ArrayRef = Arc::new(StringArray::from(vec![Some("춘천시"), Some("원주시")]));
        RecordBatch::try_new(Arc::new(schema), vec![col]).unwrap()
    }

    #[test]
    fn parquet_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let batch = sample_batch();
        write_parquet(&batch, &path).unwrap();

        let file = File::open(&path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let read = reader.next().unwrap().unwrap();
        assert_eq!(read, batch);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&sample_batch(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("구역"));
        assert_eq!(content.lines().count(), 3);
        assert!(!dir.path().join("out.tmp").exists());
    }
}
