//! Literal-payload validation against a prebuilt [`OffsetTable`].
//!
//! Everything here is slice arithmetic against `OffsetEntry` bounds; it
//! never re-touches the intermediate tree. Blank padding plus a declared
//! default literal counts as a match, not a mismatch, since the wire
//! format leaves a field blank to mean "use the default".

use crate::{OffsetEntry, OffsetTable};
use msgforge_core::DataType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Why one field's slice failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    /// A hard-coded literal field's slice did not match exactly.
    HardCodedMismatch,
    /// The slice is not one of the field's declared enum codes.
    EnumViolation,
    /// The slice is not a syntactically valid value for its data type.
    FormatError,
}

/// One field whose slice failed validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PayloadDifference {
    /// Dot/bracket-index field path.
    pub field_path: String,
    /// What kind of mismatch this is.
    pub kind: DifferenceKind,
    /// Human-readable detail; payload contents redacted when requested.
    pub detail: String,
}

/// Result of validating one payload against an [`OffsetTable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PayloadReport {
    /// Field paths whose slice matched expectations.
    pub matches: Vec<String>,
    /// Field paths the payload was too short to contain.
    pub missing: Vec<String>,
    /// Bytes beyond the table's total length.
    pub extra_bytes: usize,
    /// Fields whose slice failed validation.
    pub differences: Vec<PayloadDifference>,
}

impl PayloadReport {
    /// `true` iff every field matched and there were no extra bytes.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.differences.is_empty() && self.extra_bytes == 0
    }
}

fn redacted(detail: String, redact: bool) -> String {
    if redact { "<redacted>".to_string() } else { detail }
}

fn is_blank(slice: &str, data_type: &DataType) -> bool {
    match data_type {
        DataType::Numeric | DataType::Amount => slice.chars().all(|c| c == '0'),
        DataType::Textual | DataType::Custom { .. } => slice.chars().all(|c| c == ' '),
    }
}

/// Enum-constraint literal codes, pipe-delimited `code:description` pairs
/// falling back to comma-delimited bare codes.
///
/// Deliberately duplicated rather than shared with the POJO generator's
/// literal parser: the two consumers read the same raw literal for
/// unrelated purposes and should not share a dependency edge for it.
fn parse_enum_codes(literal: &str) -> Vec<String> {
    if literal.contains('|') {
        literal
            .split('|')
            .filter(|s| !s.trim().is_empty())
            .map(|pair| pair.split(':').next().unwrap_or(pair).trim().to_string())
            .collect()
    } else {
        literal
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn is_well_formed(slice: &str, data_type: &DataType) -> bool {
    match data_type {
        DataType::Numeric => slice.chars().all(|c| c.is_ascii_digit()),
        DataType::Amount => slice.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-'),
        DataType::Textual | DataType::Custom { .. } => true,
    }
}

fn validate_entry(payload: &[u8], entry: &OffsetEntry, redact: bool, report: &mut PayloadReport) {
    let start = entry.offset as usize;
    let end = entry.end_offset as usize;
    if payload.len() < end {
        report.missing.push(entry.field_path.clone());
        return;
    }

    let slice = String::from_utf8_lossy(&payload[start..end]).into_owned();

    if let Some(literal) = &entry.hard_coded_literal {
        if &slice != literal {
            report.differences.push(PayloadDifference {
                field_path: entry.field_path.clone(),
                kind: DifferenceKind::HardCodedMismatch,
                detail: redacted(format!("expected hard-coded literal `{literal}`, found `{slice}`"), redact),
            });
            return;
        }
    }

    if is_blank(&slice, &entry.data_type) && entry.default_literal.is_some() {
        report.matches.push(entry.field_path.clone());
        return;
    }

    if let Some(literal) = &entry.enum_constraint {
        let codes = parse_enum_codes(literal);
        if !codes.is_empty() && !codes.iter().any(|c| c == slice.trim()) {
            report.differences.push(PayloadDifference {
                field_path: entry.field_path.clone(),
                kind: DifferenceKind::EnumViolation,
                detail: redacted(format!("`{slice}` is not one of the declared enum codes"), redact),
            });
            return;
        }
    }

    if !is_well_formed(&slice, &entry.data_type) {
        report.differences.push(PayloadDifference {
            field_path: entry.field_path.clone(),
            kind: DifferenceKind::FormatError,
            detail: redacted(format!("`{slice}` is not a valid {} value", entry.data_type), redact),
        });
        return;
    }

    report.matches.push(entry.field_path.clone());
}

/// Validate a literal byte payload against a prebuilt offset table.
///
/// When `redact` is `true`, diagnostic details never include raw payload
/// text, only field paths and violation kinds.
#[must_use]
pub fn validate_payload(payload: &[u8], table: &OffsetTable, redact: bool) -> PayloadReport {
    let mut report = PayloadReport::default();
    for entry in &table.entries {
        validate_entry(payload, entry, redact, &mut report);
    }
    if payload.len() > table.total_length as usize {
        report.extra_bytes = payload.len() - table.total_length as usize;
    }
    report
}
