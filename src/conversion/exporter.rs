//! Second pass: serialize flattened records as delimited rows.

use std::collections::HashMap;
use std::io::Write;

use crate::error::ConvertResult;
use crate::types::{
    ARRAY_PLACEHOLDER, FlatProperty, FlattenedRecord, OBJECT_PLACEHOLDER, PropertyInfo, PropertyValue,
    format_number,
};

use super::EntryProcessor;

/// Options controlling the exported CSV text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Field separator (default `,`).
    pub separator: u8,
    /// Line written before the column header. Must start with `#` to be skipped by readers.
    pub comment_line: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            separator: b',',
            comment_line: Some(format!(
                "# Converted by {} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )),
        }
    }
}

/// Writes one line per record, with one field per known column.
///
/// Columns absent from a record are left blank. Lines end with `\n`.
pub struct CsvExporter<'a, W: Write> {
    writer: W,
    columns: &'a [PropertyInfo],
    options: &'a ExportOptions,
    rows: usize,
}

impl<'a, W: Write> CsvExporter<'a, W> {
    /// Create an exporter for the given, finalized column list.
    pub fn new(writer: W, columns: &'a [PropertyInfo], options: &'a ExportOptions) -> Self {
        Self {
            writer,
            columns,
            options,
            rows: 0,
        }
    }

    /// Number of data rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Consume the exporter and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn separator(&self) -> char {
        self.options.separator as char
    }
}

impl<W: Write> EntryProcessor for CsvExporter<'_, W> {
    fn before_entries(&mut self) -> ConvertResult<()> {
        if let Some(comment) = &self.options.comment_line {
            writeln!(self.writer, "{comment}")?;
        }

        let sep = self.separator();
        let header = self
            .columns
            .iter()
            .map(|c| header_field(&c.name, sep))
            .collect::<Vec<_>>()
            .join(&sep.to_string());
        tracing::debug!(%header, "CSV header");
        writeln!(self.writer, "{header}")?;
        Ok(())
    }

    fn process_entry(&mut self, entry: &FlattenedRecord) -> ConvertResult<()> {
        let by_name: HashMap<&str, &FlatProperty> = entry
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        let line = self
            .columns
            .iter()
            .map(|c| {
                by_name
                    .get(c.name.as_str())
                    .map(|p| to_csv_field(&p.value))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join(&self.separator().to_string());

        writeln!(self.writer, "{line}")?;
        self.rows += 1;
        Ok(())
    }

    fn after_entries(&mut self) -> ConvertResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Type-specific textual form of one value.
pub fn to_csv_field(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Number(n) => format_number(*n),
        PropertyValue::String(s) | PropertyValue::Expression(s) => quote_and_escape(s),
        PropertyValue::Boolean(b) => b.to_string(),
        PropertyValue::Null => "NULL".to_string(),
        PropertyValue::Array(_) => ARRAY_PLACEHOLDER.to_string(),
        PropertyValue::Object(_) => OBJECT_PLACEHOLDER.to_string(),
    }
}

/// Wrap in double quotes, backslash-escaping inner quotes and the backslash itself.
pub fn quote_and_escape(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn header_field(name: &str, sep: char) -> String {
    if name.contains(sep) || name.contains('"') || name.contains('\n') {
        quote_and_escape(name)
    } else {
        name.to_string()
    }
}
