//! Conversion of hierarchical sources into flat CSV.
//!
//! Most callers should use [`convert_from_path`] (from [`unified`]) which:
//!
//! - picks the format adapter from the file extension (or from [`ConvertOptions::format`])
//! - runs the two passes: [`SchemaCollector`] first, then [`CsvExporter`]
//! - optionally reports the outcome to a [`ConversionObserver`]
//!
//! Format adapters implement [`Tabularizer`]:
//! - [`json::JsonTabularizer`]
//! - [`spreadsheet::SpreadsheetTabularizer`] (feature `excel`)
//! - [`csv::CsvTabularizer`]
//!
//! Neither pass buffers the source. The second pass re-opens the input and re-derives the same
//! record sequence, so the input must not change between passes.

pub mod collector;
pub mod csv;
pub mod exporter;
pub mod json;
pub mod observability;
pub mod sheet_range;
#[cfg(feature = "excel")]
pub mod spreadsheet;
pub mod unified;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ConvertResult;
use crate::types::{FlattenedRecord, PropertyInfo};

pub use collector::SchemaCollector;
pub use exporter::{CsvExporter, ExportOptions};
pub use observability::{
    ConversionContext, ConversionObserver, ConversionSeverity, ConversionStats, TracingObserver,
};
pub use unified::{ConvertOptions, ConvertedFile, SourceFormat, convert_from_path};

/// Receives the records of one pass over a source.
///
/// `before_entries` and `after_entries` bracket the pass; `process_entry` is called once per
/// record, in source order.
pub trait EntryProcessor {
    fn before_entries(&mut self) -> ConvertResult<()> {
        Ok(())
    }

    fn process_entry(&mut self, entry: &FlattenedRecord) -> ConvertResult<()>;

    fn after_entries(&mut self) -> ConvertResult<()> {
        Ok(())
    }
}

/// A format adapter turning one source file into a sequence of flattened records.
pub trait Tabularizer {
    /// Drive one full pass over the records found at `locator`, opening `input` afresh.
    fn visit_entries(
        &self,
        input: &Path,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()>;

    /// Convert `input` into a CSV file next to it and return the CSV's path.
    fn convert(&self, input: &Path, locator: &str, options: &ExportOptions) -> ConvertResult<PathBuf>;
}

/// Result of a two-pass conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Number of exported records.
    pub records: usize,
    /// Columns in export order, with their collected statistics.
    pub columns: Vec<PropertyInfo>,
}

/// Run the collection pass only.
pub fn collect_schema<T: Tabularizer + ?Sized>(
    tabularizer: &T,
    input: &Path,
    locator: &str,
) -> ConvertResult<SchemaCollector> {
    let mut collector = SchemaCollector::new();
    tabularizer.visit_entries(input, locator, &mut collector)?;
    Ok(collector)
}

/// Collect the schema, then export every record into `writer`.
pub fn convert_to_writer<T: Tabularizer + ?Sized, W: Write>(
    tabularizer: &T,
    input: &Path,
    locator: &str,
    writer: W,
    options: &ExportOptions,
) -> ConvertResult<ConversionSummary> {
    let columns = collect_schema(tabularizer, input, locator)?.into_columns();

    let mut exporter = CsvExporter::new(writer, &columns, options);
    tabularizer.visit_entries(input, locator, &mut exporter)?;
    let records = exporter.rows_written();

    Ok(ConversionSummary { records, columns })
}

/// Convert `input` into `<input file name>.csv` in the same directory.
pub fn convert_to_sibling_csv<T: Tabularizer + ?Sized>(
    tabularizer: &T,
    input: &Path,
    locator: &str,
    options: &ExportOptions,
) -> ConvertResult<(PathBuf, ConversionSummary)> {
    let output = output_path_for(input);
    let writer = BufWriter::new(File::create(&output)?);
    let summary = match convert_to_writer(tabularizer, input, locator, writer, options) {
        Ok(summary) => summary,
        Err(e) => {
            // No partial output on failure.
            let _ = std::fs::remove_file(&output);
            return Err(e);
        }
    };
    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        records = summary.records,
        columns = summary.columns.len(),
        "converted"
    );
    Ok((output, summary))
}

/// `data/people.json` → `data/people.json.csv`.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".csv");
    input.with_file_name(name)
}
