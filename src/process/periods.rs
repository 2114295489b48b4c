use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Builder, Int32Builder, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};

use crate::process::error::TransformError;
use crate::process::utils::clean_str;

/// Derived column names. The upstream spreadsheets are Korean, so the derived
/// headers are too.
pub const YEAR_COLUMN: &str = "연도";
pub const MONTH_COLUMN: &str = "월";

/// Consume up to `max` leading ASCII digits of `rest` as a number.
fn take_number(rest: &mut &str, max: usize) -> Option<u32> {
    let n = rest
        .chars()
        .take(max)
        .take_while(|c| c.is_ascii_digit())
        .count();
    if n == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(n);
    *rest = tail;
    digits.parse().ok()
}

/// Parse a period string against a strptime-style format, supporting the
/// `%Y`/`%m`/`%d`/`%%` subset the monthly statistics actually use. A format
/// without a day resolves to the first of the month, without a month to
/// January. Returns `None` on any mismatch, including trailing input.
pub fn parse_period(s: &str, format: &str) -> Option<NaiveDate> {
    let mut rest = s.trim();
    let (mut year, mut month, mut day) = (None, None, None);

    let mut fmt = format.chars();
    while let Some(c) = fmt.next() {
        if c == '%' {
            match fmt.next()? {
                'Y' => year = Some(take_number(&mut rest, 4)?),
                'm' => month = Some(take_number(&mut rest, 2)?),
                'd' => day = Some(take_number(&mut rest, 2)?),
                '%' => rest = rest.strip_prefix('%')?,
                _ => return None,
            }
        } else {
            rest = rest.strip_prefix(c)?;
        }
    }
    if !rest.is_empty() {
        return None;
    }

    NaiveDate::from_ymd_opt(year? as i32, month.unwrap_or(1), day.unwrap_or(1))
}

/// Replace or append a named column.
fn set_column(
    fields: &mut Vec<FieldRef>,
    columns: &mut Vec<ArrayRef>,
    name: &str,
    datatype: DataType,
    array: ArrayRef,
) {
    let field: FieldRef = Arc::new(Field::new(name, datatype, false));
    match fields.iter().position(|f| f.name() == name) {
        Some(i) => {
            fields[i] = field;
            columns[i] = array;
        }
        None => {
            fields.push(field);
            columns.push(array);
        }
    }
}

/// Parse `date_column` (Utf8) against `date_format`, replacing it in place
/// with a `Date32` column, and derive year/month columns from the parsed
/// dates. `drop_columns` are then removed; names that don't exist are ignored.
///
/// The conversion is all-or-nothing: one unparseable (or null) value fails the
/// whole call, no partially enriched table is produced.
pub fn add_year_month(
    batch: &RecordBatch,
    date_column: &str,
    drop_columns: &[String],
    date_format: &str,
) -> Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let idx = schema
        .index_of(date_column)
        .map_err(|_| TransformError::ColumnNotFound(date_column.to_string()))?;

    let col = batch.column(idx);
    let sarr = col
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| TransformError::NotStrings {
            column: date_column.to_string(),
            datatype: col.data_type().clone(),
        })?;

    let mut dates = Date32Builder::with_capacity(sarr.len());
    let mut years = Int32Builder::with_capacity(sarr.len());
    let mut months = Int32Builder::with_capacity(sarr.len());

    for (row, opt) in sarr.iter().enumerate() {
        let parsed = opt
            .map(clean_str)
            .and_then(|cleaned| parse_period(&cleaned, date_format));
        match parsed {
            Some(date) => {
                dates.append_value(Date32Type::from_naive_date(date));
                years.append_value(date.year());
                months.append_value(date.month() as i32);
            }
            None => {
                return Err(TransformError::DateParse {
                    column: date_column.to_string(),
                    row,
                    value: opt.unwrap_or("").to_string(),
                    format: date_format.to_string(),
                })
            }
        }
    }

    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    fields[idx] = Arc::new(Field::new(date_column, DataType::Date32, false));
    columns[idx] = Arc::new(dates.finish());
    set_column(
        &mut fields,
        &mut columns,
        YEAR_COLUMN,
        DataType::Int32,
        Arc::new(years.finish()),
    );
    set_column(
        &mut fields,
        &mut columns,
        MONTH_COLUMN,
        DataType::Int32,
        Arc::new(months.finish()),
    );

    if !drop_columns.is_empty() {
        let (kept_fields, kept_columns): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .zip(columns)
            .filter(|(f, _)| !drop_columns.iter().any(|d| d == f.name()))
            .unzip();
        fields = kept_fields;
        columns = kept_columns;
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}
