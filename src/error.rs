use thiserror::Error;

/// Convenience result type for conversion and narrowing operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error type returned by the conversion pipeline and the type narrower.
///
/// A single enum shared by the JSON, spreadsheet and CSV tabularizers, the exporter and the
/// column store.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Underlying I/O error (source unreadable, sink unwritable).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Workbook error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The JSON items locator does not lead to an array of records.
    #[error(
        "items JSON array not found after traversing over path '{path}', found {found} at line {line} column {column}"
    )]
    ItemsArraySproutNotFound {
        path: String,
        found: String,
        line: usize,
        column: usize,
    },

    /// The requested sheet does not exist in the workbook.
    #[error("sheet not found: '{sheet}'")]
    SheetNotFound { sheet: String },

    /// The requested cell range does not overlap the populated part of the sheet.
    #[error("range not found: {reason} (requested {requested}, sheet bounds {bounds})")]
    RangeNotFound {
        requested: String,
        bounds: String,
        reason: String,
    },

    /// The items locator could not be parsed.
    #[error("invalid locator '{locator}': {message}")]
    InvalidLocator { locator: String, message: String },

    /// A value shape the flattener cannot represent.
    #[error("unsupported value at '{path}': {message}")]
    UnsupportedValue { path: String, message: String },

    /// The input format could not be determined or is not compiled in.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// Column store failure (missing table/column, failed type change, ...).
    #[error("store error: {message}")]
    Store { message: String },
}

impl ConvertError {
    pub(crate) fn store(message: impl Into<String>) -> Self {
        ConvertError::Store {
            message: message.into(),
        }
    }
}
