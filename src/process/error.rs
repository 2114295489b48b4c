use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use thiserror::Error;

/// Errors raised by the table transforms. These propagate straight to the
/// caller; nothing is caught or retried inside a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// Date enrichment is all-or-nothing: one bad value fails the whole call.
    #[error("column '{column}' row {row}: cannot parse {value:?} with format '{format}'")]
    DateParse {
        column: String,
        row: usize,
        value: String,
        format: String,
    },

    #[error("column '{column}' holds {datatype} values, expected strings")]
    NotStrings { column: String, datatype: DataType },

    #[error("column '{0}' has no numeric values to average")]
    EmptyColumn(String),

    #[error("column '{column}' has conflicting types across sheets: {left} vs {right}")]
    TypeMismatch {
        column: String,
        left: DataType,
        right: DataType,
    },

    #[error("no sheets to stack")]
    NoSheets,

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}
