//! Source-row provenance attached to every [`crate::FieldNode`].
//!
//! Provenance never appears in generated artifacts — only in the
//! intermediate tree itself and in audit/validation output.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a field came from in the source workbook.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Provenance {
    /// Sheet name the row was read from.
    pub sheet: String,
    /// 1-based row index within the sheet.
    pub row: u32,
    /// Original, untrimmed cell text the row was parsed from.
    pub original_cell_text: String,
}

impl Provenance {
    /// Build a provenance record.
    pub fn new(sheet: impl Into<String>, row: u32, original_cell_text: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            original_cell_text: original_cell_text.into(),
        }
    }
}
