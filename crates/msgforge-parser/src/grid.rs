//! Abstract in-memory workbook model.
//!
//! The tabular workbook reader library itself is an external collaborator
//! — callers hand us an already-read grid of trimmed cell strings, keyed
//! by sheet name, rather than a workbook file. This module only knows how
//! to address cells by spreadsheet-style coordinates (`row 2, column C`).

use std::collections::BTreeMap;

/// One sheet: a dense row-major grid of cell text. Blank cells are empty
/// strings, never absent, so coordinate lookups never need an `Option`
/// for the common case of "cell is blank".
#[derive(Debug, Clone, Default)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Build a grid from rows of cell text. Every cell is trimmed of
    /// surrounding whitespace, matching the "whitespace trimming is
    /// mandatory on every cell read" design note.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.trim().to_string()).collect())
            .collect();
        Self { rows }
    }

    /// Number of rows in the grid.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text at 1-based row and spreadsheet column letter (`"A"`,
    /// `"B"`, ... `"Z"`, `"AA"`, ...). Returns `""` for out-of-range or
    /// blank cells — numeric cells stored as whole doubles are expected to
    /// have already been coerced to integer-string form by the caller.
    #[must_use]
    pub fn cell(&self, row_1based: u32, col_letter: &str) -> &str {
        let col = column_letter_to_index(col_letter);
        self.rows
            .get((row_1based as usize).wrapping_sub(1))
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Cell text at 1-based row and 0-based column index.
    #[must_use]
    pub fn cell_at(&self, row_1based: u32, col_index: usize) -> &str {
        self.rows
            .get((row_1based as usize).wrapping_sub(1))
            .and_then(|r| r.get(col_index))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether every cell in the row is blank.
    #[must_use]
    pub fn row_is_blank(&self, row_1based: u32) -> bool {
        self.rows
            .get((row_1based as usize).wrapping_sub(1))
            .is_none_or(|r| r.iter().all(|c| c.is_empty()))
    }
}

/// Converts a spreadsheet column letter (`"A"`, `"Z"`, `"AA"`) to a
/// 0-based column index.
#[must_use]
pub fn column_letter_to_index(letters: &str) -> usize {
    let mut index: usize = 0;
    for ch in letters.chars().filter(|c| c.is_ascii_alphabetic()) {
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
        index = index * 26 + digit;
    }
    index.saturating_sub(1)
}

/// A set of named sheets, as handed to us by the (external) workbook
/// reader. Lookup is exposed through [`crate::sheet::find_sheet`] rather
/// than directly, since discovery has its own matching policy.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Grid>,
}

impl Workbook {
    /// Build a workbook from named grids. The name is kept verbatim;
    /// matching policy lives in sheet discovery, not here.
    pub fn new(sheets: impl IntoIterator<Item = (String, Grid)>) -> Self {
        Self {
            sheets: sheets.into_iter().collect(),
        }
    }

    /// Raw iteration over `(name, grid)` pairs, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Grid)> {
        self.sheets.iter().map(|(k, v)| (k.as_str(), v))
    }
}
