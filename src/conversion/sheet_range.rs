//! Spreadsheet locators: `<sheetNameOrIndex>!<startCol><startRow>:<endCol><endRow>`.
//!
//! Columns use spreadsheet letters (`A`, `B`, ..., `Z`, `AA`, ...), rows are 0-based numbers.
//! Both bounds are inclusive.

use std::fmt;

use crate::error::{ConvertError, ConvertResult};

/// An inclusive rectangle of cells, as 0-based column and row indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectRange {
    pub first_col: u32,
    pub last_col: u32,
    pub first_row: u32,
    pub last_row: u32,
}

impl RectRange {
    /// Create a range; bounds are inclusive.
    pub fn new(first_col: u32, last_col: u32, first_row: u32, last_row: u32) -> Self {
        Self {
            first_col,
            last_col,
            first_row,
            last_row,
        }
    }

    /// Parse `A0:F20`. A blank string means "no range".
    pub fn parse(range: &str) -> ConvertResult<Option<Self>> {
        let range = range.trim();
        if range.is_empty() {
            return Ok(None);
        }

        let invalid = |message: &str| ConvertError::InvalidLocator {
            locator: range.to_string(),
            message: message.to_string(),
        };

        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| invalid("expected <col><row>:<col><row>, e.g. A0:F20"))?;
        let (first_col, first_row) = parse_cell_ref(start).ok_or_else(|| invalid("bad start cell"))?;
        let (last_col, last_row) = parse_cell_ref(end).ok_or_else(|| invalid("bad end cell"))?;
        if first_col > last_col || first_row > last_row {
            return Err(invalid("start cell must not lie after the end cell"));
        }

        Ok(Some(Self::new(first_col, last_col, first_row, last_row)))
    }

    /// Whether the given cell lies inside the range.
    pub fn contains(&self, col: u32, row: u32) -> bool {
        (self.first_col..=self.last_col).contains(&col) && (self.first_row..=self.last_row).contains(&row)
    }

    /// The overlapping part of two ranges, if any.
    pub fn intersect(&self, other: &RectRange) -> Option<RectRange> {
        let r = RectRange::new(
            self.first_col.max(other.first_col),
            self.last_col.min(other.last_col),
            self.first_row.max(other.first_row),
            self.last_row.min(other.last_row),
        );
        (r.first_col <= r.last_col && r.first_row <= r.last_row).then_some(r)
    }
}

impl fmt::Display for RectRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_index_to_letters(self.first_col),
            self.first_row,
            column_index_to_letters(self.last_col),
            self.last_row
        )
    }
}

/// A parsed spreadsheet locator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeReference {
    /// Sheet name or 0-based index; blank means the first sheet.
    pub sheet_name_or_index: String,
    /// Requested cells; `None` means the whole sheet.
    pub range: Option<RectRange>,
}

impl RangeReference {
    /// Parse `Sheet2!A0:B3`, `A0:B3`, `Sheet2!` or an empty string.
    pub fn parse(locator: &str) -> ConvertResult<Self> {
        let (sheet, range) = match locator.rsplit_once('!') {
            Some((sheet, range)) => (sheet.trim(), range),
            None => ("", locator),
        };
        Ok(Self {
            sheet_name_or_index: sheet.to_string(),
            range: RectRange::parse(range)?,
        })
    }
}

/// `A` → 0, `Z` → 25, `AA` → 26.
pub fn column_letters_to_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_index_to_letters(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn parse_cell_ref(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim();
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_letters_to_index(letters)?;
    let row = digits.parse::<u32>().ok()?;
    Some((col, row))
}

/// Fail unless the requested range overlaps the populated bounds of the sheet.
pub fn check_ranges_overlap(given: &RectRange, bounds: &RectRange) -> ConvertResult<()> {
    let reason = if given.first_row > bounds.last_row {
        "the given range starts after the last populated row"
    } else if given.last_row < bounds.first_row {
        "the given range ends before the first populated row"
    } else if given.first_col > bounds.last_col {
        "the given range starts after the last populated column"
    } else if given.last_col < bounds.first_col {
        "the given range ends before the first populated column"
    } else {
        return Ok(());
    };

    Err(ConvertError::RangeNotFound {
        requested: given.to_string(),
        bounds: bounds.to_string(),
        reason: reason.to_string(),
    })
}
