//! Unified conversion entrypoint.
//!
//! Most callers should use [`convert_from_path`], which converts a JSON document or a spreadsheet
//! into `<input file name>.csv` next to it.
//!
//! - If [`ConvertOptions::format`] is `None`, the format is inferred from the file extension.
//! - If a [`super::observability::ConversionObserver`] is provided, success/failure/alerts are
//!   reported to it.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ConvertError, ConvertResult};
use crate::types::PropertyInfo;

use super::csv::CsvTabularizer;
use super::json::JsonTabularizer;
use super::observability::{ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats};
use super::{ConversionSummary, ExportOptions, convert_to_sibling_csv};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A JSON document holding an array of records.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Spreadsheet,
    /// Delimited text.
    Csv,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Options controlling unified conversion.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ConvertOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<SourceFormat>,
    /// Items locator: a JSON path (`/data/children`) or a sheet range (`Sheet1!A0:D10`).
    pub locator: String,
    /// CSV output dialect.
    pub export: ExportOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ConversionSeverity,
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("format", &self.format)
            .field("locator", &self.locator)
            .field("export", &self.export)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: None,
            locator: String::new(),
            export: ExportOptions::default(),
            observer: None,
            alert_at_or_above: ConversionSeverity::Critical,
        }
    }
}

/// Outcome of [`convert_from_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    /// Path of the written CSV file.
    pub path: PathBuf,
    /// Number of exported records.
    pub records: usize,
    /// Exported columns with their collected statistics, in header order.
    pub columns: Vec<PropertyInfo>,
}

/// Unified conversion entry point for path-based sources.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with record/column counts
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ## JSON with a nested items array
///
/// ```no_run
/// use tabular_crunch::conversion::{convert_from_path, ConvertOptions};
///
/// # fn main() -> Result<(), tabular_crunch::ConvertError> {
/// let opts = ConvertOptions {
///     locator: "/data/children".to_string(),
///     ..Default::default()
/// };
/// let out = convert_from_path("reddit.json", &opts)?;
/// println!("{} records -> {}", out.records, out.path.display());
/// # Ok(())
/// # }
/// ```
///
/// ## Spreadsheet range (feature `excel`)
///
/// ```no_run
/// use tabular_crunch::conversion::{convert_from_path, ConvertOptions};
///
/// # fn main() -> Result<(), tabular_crunch::ConvertError> {
/// let opts = ConvertOptions {
///     locator: "Sheet2!A0:D40".to_string(),
///     ..Default::default()
/// };
/// let out = convert_from_path("budget.xlsx", &opts)?;
/// for col in &out.columns {
///     println!("{} (max {} chars)", col.name, col.max_length);
/// }
/// # Ok(())
/// # }
/// ```
pub fn convert_from_path(path: impl AsRef<Path>, options: &ConvertOptions) -> ConvertResult<ConvertedFile> {
    let path = path.as_ref();
    let format = match options.format {
        Some(f) => f,
        None => infer_format_from_path(path)?,
    };

    let ctx = ConversionContext {
        path: path.to_path_buf(),
        format,
        locator: options.locator.clone(),
    };

    let result = convert_dispatch(path, format, &options.locator, &options.export).map(
        |(out, ConversionSummary { records, columns })| ConvertedFile {
            path: out,
            records,
            columns,
        },
    );

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(file) => obs.on_success(
                &ctx,
                ConversionStats {
                    records: file.records,
                    columns: file.columns.len(),
                },
            ),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn convert_dispatch(
    path: &Path,
    format: SourceFormat,
    locator: &str,
    export: &ExportOptions,
) -> ConvertResult<(PathBuf, ConversionSummary)> {
    match format {
        SourceFormat::Json => convert_to_sibling_csv(&JsonTabularizer::new(), path, locator, export),
        SourceFormat::Csv => convert_to_sibling_csv(&CsvTabularizer::default(), path, locator, export),
        SourceFormat::Spreadsheet => convert_spreadsheet(path, locator, export),
    }
}

fn convert_spreadsheet(
    path: &Path,
    locator: &str,
    export: &ExportOptions,
) -> ConvertResult<(PathBuf, ConversionSummary)> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, locator, export);

    #[cfg(feature = "excel")]
    {
        convert_to_sibling_csv(&super::spreadsheet::SpreadsheetTabularizer::new(), path, locator, export)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ConvertError::UnsupportedFormat {
            message: "spreadsheet conversion not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

fn severity_for_error(e: &ConvertError) -> ConversionSeverity {
    match e {
        ConvertError::Io(_) => ConversionSeverity::Critical,
        ConvertError::Json(err) => {
            if err.is_io() {
                ConversionSeverity::Critical
            } else {
                ConversionSeverity::Error
            }
        }
        ConvertError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => ConversionSeverity::Critical,
            _ => ConversionSeverity::Error,
        },
        #[cfg(feature = "excel")]
        ConvertError::Excel(err) => {
            if error_chain_contains_io(err) {
                ConversionSeverity::Critical
            } else {
                ConversionSeverity::Error
            }
        }
        ConvertError::ItemsArraySproutNotFound { .. }
        | ConvertError::SheetNotFound { .. }
        | ConvertError::RangeNotFound { .. }
        | ConvertError::InvalidLocator { .. }
        | ConvertError::UnsupportedValue { .. }
        | ConvertError::UnsupportedFormat { .. }
        | ConvertError::Store { .. } => ConversionSeverity::Error,
    }
}

#[cfg_attr(not(feature = "excel"), allow(dead_code))]
fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

fn infer_format_from_path(path: &Path) -> ConvertResult<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::UnsupportedFormat {
            message: format!(
                "cannot infer format: path has no extension ({})",
                path.display()
            ),
        })?;

    SourceFormat::from_extension(ext).ok_or_else(|| ConvertError::UnsupportedFormat {
        message: format!(
            "cannot infer format from extension '{ext}' for path ({})",
            path.display()
        ),
    })
}
