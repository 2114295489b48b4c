use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;

use crate::process::error::TransformError;

/// Stack per-region sheets into one table, stamping each row with its region
/// label in a new `region_column` (appended last).
///
/// `sheets` is an explicitly ordered slice, not a map: block order in the
/// output is the slice order, and row order inside each block is preserved.
/// Columns are aligned by name in first-seen order; a sheet missing a column
/// gets nulls for it. A shared column name must have the same type in every
/// sheet. Any input column already named like `region_column` is discarded in
/// favour of the stamped label.
pub fn stack_regions(
    sheets: &[(String, RecordBatch)],
    region_column: &str,
) -> Result<RecordBatch, TransformError> {
    if sheets.is_empty() {
        return Err(TransformError::NoSheets);
    }

    // union of data columns, first-seen order
    let mut data_fields: Vec<FieldRef> = Vec::new();
    for (_, batch) in sheets {
        for field in batch.schema().fields() {
            if field.name() == region_column {
                continue;
            }
            match data_fields.iter().find(|f| f.name() == field.name()) {
                Some(existing) => {
                    if existing.data_type() != field.data_type() {
                        return Err(TransformError::TypeMismatch {
                            column: field.name().clone(),
                            left: existing.data_type().clone(),
                            right: field.data_type().clone(),
                        });
                    }
                }
                None => data_fields.push(Arc::new(Field::new(
                    field.name(),
                    field.data_type().clone(),
                    true,
                ))),
            }
        }
    }

    let mut fields = data_fields;
    fields.push(Arc::new(Field::new(region_column, DataType::Utf8, false)));
    let schema = Arc::new(Schema::new(fields));
    let n_data = schema.fields().len() - 1;

    let mut blocks = Vec::with_capacity(sheets.len());
    for (label, batch) in sheets {
        let nrows = batch.num_rows();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(n_data + 1);
        for field in schema.fields().iter().take(n_data) {
            match batch.schema().index_of(field.name()) {
                Ok(i) => columns.push(batch.column(i).clone()),
                Err(_) => columns.push(new_null_array(field.data_type(), nrows)),
            }
        }
        columns.push(Arc::new(StringArray::from(vec![label.as_str(); nrows])) as ArrayRef);
        blocks.push(RecordBatch::try_new(schema.clone(), columns)?);
    }

    concat_batches(&schema, blocks.iter()).map_err(Into::into)
}
