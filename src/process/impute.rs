use std::sync::Arc;

use arrow::array::{new_null_array, Array, ArrayRef, Float64Array, Float64Builder, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;

use crate::process::error::TransformError;
use crate::process::utils::parse_number;

/// Rebuild `batch` with `column` replaced by `array` typed as Float64.
fn replace_column(
    batch: &RecordBatch,
    idx: usize,
    array: ArrayRef,
) -> Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    fields[idx] = Arc::new(Field::new(
        schema.field(idx).name(),
        DataType::Float64,
        true,
    ));
    columns[idx] = array;
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}

/// Coerce `column` to Float64. Strings are parsed per value, anything
/// unparseable (or empty) becomes null; other numeric types are cast;
/// non-numeric types coerce to all-null. Never fails on bad values.
pub fn coerce_numeric(batch: &RecordBatch, column: &str) -> Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let idx = schema
        .index_of(column)
        .map_err(|_| TransformError::ColumnNotFound(column.to_string()))?;
    let col = batch.column(idx);

    if col.data_type() == &DataType::Float64 {
        return Ok(batch.clone());
    }

    let coerced: ArrayRef = if let Some(sarr) = col.as_any().downcast_ref::<StringArray>() {
        let mut b = Float64Builder::with_capacity(sarr.len());
        for opt in sarr.iter() {
            b.append_option(opt.and_then(|s| parse_number(s)));
        }
        Arc::new(b.finish())
    } else if col.data_type().is_numeric() {
        cast(col, &DataType::Float64)?
    } else {
        new_null_array(&DataType::Float64, col.len())
    };

    replace_column(batch, idx, coerced)
}

/// Coerce `column` to Float64 and fill every null with the column mean,
/// rounded to one decimal place. Values already present pass through
/// unchanged, so the operation is idempotent.
///
/// A column with no numeric values at all has no mean to fill with; that is
/// reported as [`TransformError::EmptyColumn`] rather than silently zeroed.
pub fn fill_mean(batch: &RecordBatch, column: &str) -> Result<RecordBatch, TransformError> {
    let coerced = coerce_numeric(batch, column)?;
    let idx = coerced
        .schema()
        .index_of(column)
        .map_err(|_| TransformError::ColumnNotFound(column.to_string()))?;
    let farr = coerced
        .column(idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("coerce_numeric yields Float64")
        .clone();

    if farr.null_count() == 0 {
        return Ok(coerced);
    }

    let (mut sum, mut count) = (0.0_f64, 0_usize);
    for v in farr.iter().flatten() {
        sum += v;
        count += 1;
    }
    if count == 0 {
        return Err(TransformError::EmptyColumn(column.to_string()));
    }
    let fill = (sum / count as f64 * 10.0).round() / 10.0;

    let filled = Float64Array::from_iter_values(farr.iter().map(|opt| opt.unwrap_or(fill)));
    replace_column(&coerced, idx, Arc::new(filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Date32Array;

    fn single_column(name: &str, array: ArrayRef, datatype: DataType) -> RecordBatch {
        let schema = Schema::new(vec![Field::new(name, datatype, true)]);
        RecordBatch::try_new(Arc::new(schema), vec![array]).unwrap()
    }

    fn string_column(name: &str, values: Vec<Option<&str>>) -> RecordBatch {
        single_column(
            name,
            Arc::new(StringArray::from(values)),
            DataType::Utf8,
        )
    }

    fn float_values(batch: &RecordBatch, idx: usize) -> Float64Array {
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap()
            .clone()
    }

    #[test]
    fn coercion_turns_bad_values_into_nulls_not_errors() {
        let batch = string_column("x", vec![Some("10"), Some("abc"), None, Some("3.5")]);
        let out = coerce_numeric(&batch, "x").unwrap();
        let values = float_values(&out, 0);
        assert_eq!(values.value(0), 10.0);
        assert!(values.is_null(1));
        assert!(values.is_null(2));
        assert_eq!(values.value(3), 3.5);
    }

    #[test]
    fn coercion_leaves_float_columns_alone() {
        let batch = single_column(
            "x",
            Arc::new(Float64Array::from(vec![Some(1.0), None])),
            DataType::Float64,
        );
        let out = coerce_numeric(&batch, "x").unwrap();
        assert_eq!(out, batch);
    }

    #[test]
    fn coercion_of_non_numeric_types_is_all_null() {
        let batch = single_column(
            "d",
            Arc::new(Date32Array::from(vec![Some(0), Some(1)])),
            DataType::Date32,
        );
        let out = coerce_numeric(&batch, "d").unwrap();
        assert_eq!(float_values(&out, 0).null_count(), 2);
    }

    #[test]
    fn fill_uses_rounded_mean_and_keeps_present_values() {
        let batch = string_column("x", vec![Some("10"), None, Some("20")]);
        let out = fill_mean(&batch, "x").unwrap();
        let values = float_values(&out, 0);
        assert_eq!(values.null_count(), 0);
        assert_eq!(values.value(0), 10.0);
        assert_eq!(values.value(1), 15.0);
        assert_eq!(values.value(2), 20.0);
    }

    #[test]
    fn mean_is_rounded_to_one_decimal() {
        // mean of 1, 2, 2 is 1.666… → 1.7
        let batch = string_column("x", vec![Some("1"), Some("2"), Some("2"), None]);
        let out = fill_mean(&batch, "x").unwrap();
        assert_eq!(float_values(&out, 0).value(3), 1.7);
    }

    #[test]
    fn fill_mean_is_idempotent() {
        let batch = string_column("x", vec![Some("1"), Some("2"), None]);
        let once = fill_mean(&batch, "x").unwrap();
        let twice = fill_mean(&once, "x").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unparseable_values_are_filled_too() {
        let batch = string_column("x", vec![Some("4"), Some("결측"), Some("6")]);
        let out = fill_mean(&batch, "x").unwrap();
        assert_eq!(float_values(&out, 0).value(1), 5.0);
    }

    #[test]
    fn column_without_numbers_is_an_explicit_error() {
        let batch = string_column("x", vec![Some("a"), Some("b"), None]);
        assert!(matches!(
            fill_mean(&batch, "x"),
            Err(TransformError::EmptyColumn(_))
        ));
    }

    #[test]
    fn missing_column_is_an_error() {
        let batch = string_column("x", vec![Some("1")]);
        assert!(matches!(
            fill_mean(&batch, "y"),
            Err(TransformError::ColumnNotFound(_))
        ));
    }
}
