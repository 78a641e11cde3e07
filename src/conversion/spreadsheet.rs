#![cfg(feature = "excel")]

//! Spreadsheet tabularizer (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`).
//!
//! Behavior:
//! - Resolves the sheet by name or 0-based index (blank → first sheet)
//! - Computes the populated bounding box of the sheet and rejects requested ranges outside it
//! - Takes column names from the top row of the requested range (column letters when blank)
//! - Emits one record per following row, one property per cell
//!
//! Formula cells yield their formula text, never the cached result. The workbook is opened anew
//! on every pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use calamine::{CellErrorType, Data, Range, Reader, open_workbook_auto};

use crate::error::{ConvertError, ConvertResult};
use crate::types::{FlatProperty, FlattenedRecord, PropertyValue, format_number};

use super::sheet_range::{RangeReference, RectRange, check_ranges_overlap, column_index_to_letters};
use super::{EntryProcessor, ExportOptions, Tabularizer, convert_to_sibling_csv};

/// Tabularizer for workbook files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetTabularizer;

impl SpreadsheetTabularizer {
    /// Create a spreadsheet tabularizer.
    pub fn new() -> Self {
        Self
    }
}

impl Tabularizer for SpreadsheetTabularizer {
    fn visit_entries(
        &self,
        input: &Path,
        locator: &str,
        processor: &mut dyn EntryProcessor,
    ) -> ConvertResult<()> {
        let reference = RangeReference::parse(locator)?;
        let mut workbook = open_workbook_auto(input)?;
        let sheet = resolve_sheet_name(&workbook.sheet_names(), &reference.sheet_name_or_index)?;

        let values = workbook.worksheet_range(&sheet)?;
        let formulas = workbook.worksheet_formula(&sheet).unwrap_or_else(|e| {
            tracing::debug!(%sheet, error = %e, "formulas unavailable, using cell values only");
            Range::empty()
        });
        let grid = SheetGrid { values, formulas };

        let bounds = grid.bounding_range().ok_or_else(|| ConvertError::RangeNotFound {
            requested: reference
                .range
                .map(|r| r.to_string())
                .unwrap_or_else(|| "whole sheet".to_string()),
            bounds: "none".to_string(),
            reason: format!("sheet '{sheet}' has no populated cells"),
        })?;
        let area = match reference.range {
            Some(given) => {
                check_ranges_overlap(&given, &bounds)?;
                given.intersect(&bounds).unwrap_or(bounds)
            }
            None => bounds,
        };
        tracing::debug!(%sheet, %bounds, %area, "converting sheet area");

        let columns = grid.column_names(&area);

        processor.before_entries()?;
        for row in area.first_row + 1..=area.last_row {
            let properties = (area.first_col..=area.last_col)
                .zip(columns.iter())
                .map(|(col, name)| FlatProperty::new(name.clone(), grid.property_value(row, col)))
                .collect();
            processor.process_entry(&FlattenedRecord::new(properties))?;
        }
        processor.after_entries()
    }

    fn convert(&self, input: &Path, locator: &str, options: &ExportOptions) -> ConvertResult<PathBuf> {
        convert_to_sibling_csv(self, input, locator, options).map(|(path, _)| path)
    }
}

/// Pick a sheet by exact name, then by 0-based index; blank means the first sheet.
pub fn resolve_sheet_name(sheet_names: &[String], name_or_index: &str) -> ConvertResult<String> {
    let wanted = name_or_index.trim();
    let not_found = || ConvertError::SheetNotFound {
        sheet: wanted.to_string(),
    };

    if wanted.is_empty() {
        return sheet_names.first().cloned().ok_or_else(not_found);
    }
    if let Some(name) = sheet_names.iter().find(|n| n.as_str() == wanted) {
        return Ok(name.clone());
    }
    wanted
        .parse::<usize>()
        .ok()
        .and_then(|idx| sheet_names.get(idx).cloned())
        .ok_or_else(not_found)
}

static EMPTY_CELL: Data = Data::Empty;

/// Cell values plus formula texts of one sheet, addressed by absolute (row, col).
struct SheetGrid {
    values: Range<Data>,
    formulas: Range<String>,
}

impl SheetGrid {
    /// Union of the populated cells' rows and columns.
    fn bounding_range(&self) -> Option<RectRange> {
        let mut bounds: Option<RectRange> = None;
        let mut include = |row: u32, col: u32| {
            bounds = Some(match bounds {
                None => RectRange::new(col, col, row, row),
                Some(b) => RectRange::new(
                    b.first_col.min(col),
                    b.last_col.max(col),
                    b.first_row.min(row),
                    b.last_row.max(row),
                ),
            });
        };

        if let Some((row0, col0)) = self.values.start() {
            for (r, c, _) in self.values.used_cells() {
                include(row0 + r as u32, col0 + c as u32);
            }
        }
        if let Some((row0, col0)) = self.formulas.start() {
            for (r, c, _) in self.formulas.used_cells() {
                include(row0 + r as u32, col0 + c as u32);
            }
        }
        bounds
    }

    fn formula(&self, row: u32, col: u32) -> Option<&str> {
        self.formulas
            .get_value((row, col))
            .map(String::as_str)
            .filter(|f| !f.is_empty())
    }

    fn value(&self, row: u32, col: u32) -> &Data {
        self.values.get_value((row, col)).unwrap_or(&EMPTY_CELL)
    }

    fn property_value(&self, row: u32, col: u32) -> PropertyValue {
        match self.formula(row, col) {
            Some(formula) => PropertyValue::Expression(formula.to_string()),
            None => cell_to_value(self.value(row, col)),
        }
    }

    /// Names for each column of `area`, taken from its top row.
    fn column_names(&self, area: &RectRange) -> Vec<String> {
        let mut seen = HashSet::new();
        (area.first_col..=area.last_col)
            .map(|col| {
                let text = match self.formula(area.first_row, col) {
                    Some(formula) => formula.chars().filter(|c| c.is_alphanumeric()).collect(),
                    None => cell_to_header_string(self.value(area.first_row, col)),
                };
                let text = text.trim().to_string();
                if text.is_empty() || !seen.insert(text.clone()) {
                    column_index_to_letters(col)
                } else {
                    text
                }
            })
            .collect()
    }
}

/// Map one cell to a property value. Blank cells become an empty string.
pub fn cell_to_value(cell: &Data) -> PropertyValue {
    match cell {
        Data::Int(i) => PropertyValue::Number(*i as f64),
        Data::Float(f) => PropertyValue::Number(*f),
        Data::String(s) => PropertyValue::String(s.clone()),
        Data::Bool(b) => PropertyValue::Boolean(*b),
        Data::DateTime(dt) => PropertyValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => PropertyValue::String(s.clone()),
        Data::Error(e) => PropertyValue::Expression(format!("Error-{}", error_code(e))),
        Data::Empty => PropertyValue::String(String::new()),
    }
}

fn cell_to_header_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("Error{}", error_code(e)),
        Data::Empty => String::new(),
    }
}

/// Numeric error code as stored in workbook files.
#[allow(unreachable_patterns)]
pub fn error_code(e: &CellErrorType) -> i32 {
    match e {
        CellErrorType::Null => 0,
        CellErrorType::Div0 => 7,
        CellErrorType::Value => 15,
        CellErrorType::Ref => 23,
        CellErrorType::Name => 29,
        CellErrorType::Num => 36,
        CellErrorType::NA => 42,
        CellErrorType::GettingData => 43,
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_sheets_by_name_index_or_default() {
        let sheets = names(&["People", "Sheet2", "7"]);
        assert_eq!(resolve_sheet_name(&sheets, "").unwrap(), "People");
        assert_eq!(resolve_sheet_name(&sheets, "Sheet2").unwrap(), "Sheet2");
        assert_eq!(resolve_sheet_name(&sheets, "1").unwrap(), "Sheet2");
        assert_eq!(resolve_sheet_name(&sheets, "7").unwrap(), "7");
        assert!(matches!(
            resolve_sheet_name(&sheets, "Missing"),
            Err(ConvertError::SheetNotFound { .. })
        ));
        assert!(resolve_sheet_name(&sheets, "3").is_err());
    }

    #[test]
    fn maps_cells_to_property_values() {
        assert_eq!(cell_to_value(&Data::Float(2.5)), PropertyValue::Number(2.5));
        assert_eq!(cell_to_value(&Data::Int(3)), PropertyValue::Number(3.0));
        assert_eq!(cell_to_value(&Data::Bool(true)), PropertyValue::Boolean(true));
        assert_eq!(cell_to_value(&Data::Empty), PropertyValue::String(String::new()));
        assert_eq!(
            cell_to_value(&Data::Error(CellErrorType::Div0)),
            PropertyValue::Expression("Error-7".to_string())
        );
    }

    #[test]
    fn header_falls_back_to_column_letters() {
        let mut values: Range<Data> = Range::new((0, 0), (1, 2));
        values.set_value((0, 0), Data::String("id".to_string()));
        values.set_value((0, 2), Data::String("id".to_string()));
        values.set_value((1, 0), Data::Int(1));
        let grid = SheetGrid {
            values,
            formulas: Range::empty(),
        };

        let bounds = grid.bounding_range().unwrap();
        assert_eq!(bounds, RectRange::new(0, 2, 0, 1));
        assert_eq!(grid.column_names(&bounds), names(&["id", "B", "C"]));
    }
}
