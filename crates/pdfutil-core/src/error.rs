use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PdfUtilError>;

#[derive(Error, Debug)]
pub enum PdfUtilError {
    #[error("{0}")]
    Usage(String),

    #[error("Input file '{}' does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("Output file '{}' already exists, aborting. To overwrite provide '-f'", .path.display())]
    OutputExists { path: PathBuf },

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Rotation value '{value}' is not a positive multiple of 90")]
    InvalidRotation { value: i64 },

    #[error("Unknown {field} '{value}', should be one of {}", .allowed.join(", "))]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("Ranges take {arity} values each, but {count} values were provided")]
    MalformedRangeList { arity: usize, count: usize },

    #[error("Invalid date '{value}', expected yyyymmddhhmmss with an optional +hhmm time zone")]
    InvalidDate { value: String },

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Page range failures, reported with one-based page numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Page '{value}' is outside of the file's range ({min}-{max})")]
    OutOfRange { value: i64, min: usize, max: usize },

    #[error("Page '{value}' is not a number")]
    NotANumber { value: String },

    #[error("Range start {start} is greater than end {end}")]
    Inverted { start: usize, end: usize },
}

impl From<lopdf::Error> for PdfUtilError {
    fn from(err: lopdf::Error) -> Self {
        PdfUtilError::Pdf(err.to_string())
    }
}
