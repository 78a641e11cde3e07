//! CSV tabularizer.
//!
//! Reads delimited text (such as the files written by [`super::CsvExporter`]) back into
//! flattened records. Rules:
//!
//! - The first non-comment line is the header.
//! - Lines starting with `#` are skipped.
//! - Quoted fields use backslash escapes (`"say \"hi\""`).
//! - Empty fields are absent from the record; the literal `NULL` becomes [`PropertyValue::Null`];
//!   everything else is a [`PropertyValue::String`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{FlatProperty, FlattenedRecord, PropertyValue};

use super::{EntryProcessor, ExportOptions, Tabularizer, convert_to_sibling_csv};

/// Tabularizer for delimited text files.
#[derive(Debug, Clone, Copy)]
pub struct CsvTabularizer {
    /// Field separator.
    pub separator: u8,
}

impl Default for CsvTabularizer {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

impl CsvTabularizer {
    /// Create a CSV tabularizer with the given separator.
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    /// A reader configured for the exporter's dialect.
    pub fn reader_builder(&self) -> ::csv::ReaderBuilder {
        let mut builder = ::csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .delimiter(self.separator)
            .comment(Some(b'#'))
            .escape(Some(b'\\'))
            .double_quote(false);
        builder
    }

    /// Drive one pass over the records of an already opened CSV stream.
    pub fn visit_entries_from_reader<R: Read>(
        &self,
        reader: R,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        let mut rdr = self.reader_builder().from_reader(reader);
        let headers = rdr.headers()?.clone();

        processor.before_entries()?;
        for result in rdr.records() {
            let record = result?;
            let properties = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, raw)| !raw.is_empty())
                .map(|(name, raw)| FlatProperty::new(name, parse_field(raw)))
                .collect();
            processor.process_entry(&FlattenedRecord::new(properties))?;
        }
        processor.after_entries()
    }
}

impl Tabularizer for CsvTabularizer {
    fn visit_entries(
        &self,
        input: &Path,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        if !locator.trim().trim_matches('/').is_empty() {
            return Err(ConvertError::InvalidLocator {
                locator: locator.to_string(),
                message: "CSV sources have no nested items; use an empty locator".to_string(),
            });
        }
        let file = File::open(input)?;
        self.visit_entries_from_reader(BufReader::new(file), processor)
    }

    fn convert(&self, input: &Path, locator: &str, options: &ExportOptions) -> ConvertResult<PathBuf> {
        convert_to_sibling_csv(self, input, locator, options).map(|(path, _)| path)
    }
}

// Quoting is gone by the time a field gets here, so a string that was literally `NULL` reads
// back as Null too.
fn parse_field(raw: &str) -> PropertyValue {
    if raw == "NULL" {
        PropertyValue::Null
    } else {
        PropertyValue::String(raw.to_string())
    }
}
