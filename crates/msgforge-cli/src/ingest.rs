//! JSON-based spec ingestion.
//!
//! The tabular workbook reader itself is an external collaborator
//! (spec §1): this crate never parses real spreadsheet bytes. Instead it
//! accepts a [`SpecDocument`] — a JSON document shaped like an
//! already-read `SheetSet` (sheet name → metadata cells + an ordered row
//! list) — and adapts it into the [`Grid`]/[`Workbook`]/[`SpecRow`] shapes
//! `msgforge-parser` expects. Swapping in a real xlsx reader later means
//! replacing this module only.

use msgforge_core::DataType;
use msgforge_error::{ErrorCode, MsgforgeError};
use msgforge_parser::{Grid, SpecRow, Workbook};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One row of the flattened field table, as supplied by the caller.
/// Mirrors [`SpecRow`] field-for-field except for `sheet`/`row_index`,
/// which this module derives from the row's position in `rows`.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRowInput {
    /// Segment level (depth marker), must be ≥ 1.
    pub level: u32,
    /// Field-name cell text, e.g. `"name"` or `"person:Person"`.
    pub name: String,
    /// Declared wire type. Defaults to [`DataType::Textual`] when absent.
    #[serde(default)]
    pub data_type: Option<DataType>,
    /// Declared byte length.
    pub byte_length: Option<u32>,
    /// `true` for `M` (required). Defaults to `true`.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Default literal, if any.
    #[serde(default)]
    pub default_literal: Option<String>,
    /// Hard-coded literal, if any.
    #[serde(default)]
    pub hard_coded_literal: Option<String>,
    /// Non-empty only on a `groupId` control row.
    #[serde(default)]
    pub group_id_literal: Option<String>,
    /// Raw `min..max` occurrence literal.
    #[serde(default)]
    pub occurrence_literal: Option<String>,
    /// Enum-constraint literal, if any.
    #[serde(default)]
    pub enum_constraint: Option<String>,
}

fn default_required() -> bool {
    true
}

/// One sheet: the fixed-coordinate metadata block (rows 1-6, matching
/// `msgforge_parser::metadata`'s coordinate scheme) plus the field table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetInput {
    /// Metadata cell grid, addressed by 1-based row / column letter.
    #[serde(default)]
    pub metadata_rows: Vec<Vec<String>>,
    /// Ordered field rows.
    #[serde(default)]
    pub rows: Vec<FieldRowInput>,
}

/// A full spec input: every sheet the workbook would have carried,
/// keyed by sheet name exactly as it appeared in the source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecDocument {
    /// Sheet name → sheet content.
    pub sheets: BTreeMap<String, SheetInput>,
}

/// Read and parse a [`SpecDocument`] from a JSON file.
///
/// # Errors
///
/// Returns [`ErrorCode::InputMissingFile`] if the file cannot be read,
/// or [`ErrorCode::InputInvalidWorkbookShape`] if it does not parse as a
/// [`SpecDocument`].
pub fn load_spec_document(path: &Path) -> Result<SpecDocument, MsgforgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MsgforgeError::new(ErrorCode::InputMissingFile, format!("failed to read spec file `{}`", path.display()))
            .with_source(e)
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MsgforgeError::new(
            ErrorCode::InputInvalidWorkbookShape,
            format!("spec file `{}` is not a valid spec document", path.display()),
        )
        .with_source(e)
    })
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("")
}

/// Find a sheet by canonical name using the same exact/case-insensitive/
/// whitespace-insensitive policy as [`msgforge_parser::sheet::find_sheet`].
fn find_sheet<'a>(doc: &'a SpecDocument, canonical: &str) -> Option<(&'a str, &'a SheetInput)> {
    if let Some((k, v)) = doc.sheets.iter().find(|(k, _)| k.as_str() == canonical) {
        return Some((k.as_str(), v));
    }
    if let Some((k, v)) = doc.sheets.iter().find(|(k, _)| k.eq_ignore_ascii_case(canonical)) {
        return Some((k.as_str(), v));
    }
    let canonical_squashed = squash_whitespace(canonical);
    doc.sheets
        .iter()
        .find(|(k, _)| squash_whitespace(k).eq_ignore_ascii_case(&canonical_squashed))
        .map(|(k, v)| (k.as_str(), v))
}

fn to_spec_row(sheet: &str, index: u32, row: &FieldRowInput) -> SpecRow {
    SpecRow {
        sheet: sheet.to_string(),
        row_index: index,
        level: row.level,
        field_cell: row.name.clone(),
        data_type: row.data_type.clone().unwrap_or(DataType::Textual),
        byte_length: row.byte_length,
        required: row.required,
        default_literal: row.default_literal.clone(),
        hard_coded_literal: row.hard_coded_literal.clone(),
        group_id_literal: row.group_id_literal.clone(),
        occurrence_literal: row.occurrence_literal.clone(),
        enum_constraint: row.enum_constraint.clone(),
    }
}

fn to_spec_rows(sheet: &str, input: &SheetInput) -> Vec<SpecRow> {
    input
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| to_spec_row(sheet, i as u32 + 1, row))
        .collect()
}

fn to_workbook(doc: &SpecDocument) -> Workbook {
    Workbook::new(
        doc.sheets
            .iter()
            .map(|(name, sheet)| (name.clone(), Grid::new(sheet.metadata_rows.clone()))),
    )
}

/// Everything [`msgforge_parser::parse_intermediate_tree`] needs,
/// adapted from one or two [`SpecDocument`]s.
pub struct Ingested {
    /// Primary workbook (built from `main`'s metadata cells).
    pub workbook: Workbook,
    /// Shared-header workbook, built from a separately supplied document.
    pub shared_header_workbook: Option<Workbook>,
    /// Pre-resolved field rows for Request/Response/Shared Header,
    /// mirroring the same file-then-embedded precedence
    /// `parse_intermediate_tree` applies to grids internally.
    pub rows: BTreeMap<String, Vec<SpecRow>>,
}

/// Adapt a main [`SpecDocument`] and an optional separately supplied
/// shared-header [`SpecDocument`] into [`Ingested`] form.
#[must_use]
pub fn ingest(main: &SpecDocument, shared: Option<&SpecDocument>) -> Ingested {
    let mut rows = BTreeMap::new();

    if let Some((name, sheet)) = find_sheet(main, msgforge_parser::sheet::REQUEST) {
        rows.insert(msgforge_parser::sheet::REQUEST.to_string(), to_spec_rows(name, sheet));
    }
    if let Some((name, sheet)) = find_sheet(main, msgforge_parser::sheet::RESPONSE) {
        rows.insert(msgforge_parser::sheet::RESPONSE.to_string(), to_spec_rows(name, sheet));
    }

    let shared_rows = shared
        .and_then(|doc| {
            find_sheet(doc, msgforge_parser::sheet::SHARED_HEADER)
                .or_else(|| find_sheet(doc, msgforge_parser::sheet::REQUEST))
        })
        .or_else(|| find_sheet(main, msgforge_parser::sheet::SHARED_HEADER));
    if let Some((name, sheet)) = shared_rows {
        rows.insert(msgforge_parser::sheet::SHARED_HEADER.to_string(), to_spec_rows(name, sheet));
    }

    Ingested {
        workbook: to_workbook(main),
        shared_header_workbook: shared.map(to_workbook),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_request(op_id: &str, rows: Vec<FieldRowInput>) -> SpecDocument {
        let mut metadata_rows = vec![vec![String::new(); 6]; 6];
        metadata_rows[2][2] = op_id.to_string(); // row 3, col C
        let mut sheets = BTreeMap::new();
        sheets.insert("Request".to_string(), SheetInput { metadata_rows, rows });
        SpecDocument { sheets }
    }

    fn row(level: u32, name: &str) -> FieldRowInput {
        FieldRowInput {
            level,
            name: name.to_string(),
            data_type: None,
            byte_length: Some(10),
            required: true,
            default_literal: None,
            hard_coded_literal: None,
            group_id_literal: None,
            occurrence_literal: None,
            enum_constraint: None,
        }
    }

    // -- 1. Ingestion adapts a minimal document into parser-ready shapes ----

    #[test]
    fn ingest_produces_request_rows_and_workbook() {
        let doc = doc_with_request("createApplication", vec![row(1, "limit"), row(1, "name")]);
        let ingested = ingest(&doc, None);
        assert_eq!(ingested.rows.get("Request").map(Vec::len), Some(2));
        assert!(ingested.shared_header_workbook.is_none());
    }

    // -- 2. A separate shared-header document takes precedence --------------

    #[test]
    fn separate_shared_header_document_wins_over_embedded_sheet() {
        let mut doc = doc_with_request("op", vec![row(1, "limit")]);
        doc.sheets.insert(
            "Shared Header".to_string(),
            SheetInput { metadata_rows: Vec::new(), rows: vec![row(1, "embeddedTraceId")] },
        );
        let mut shared_doc = SpecDocument::default();
        shared_doc.sheets.insert(
            "Shared Header".to_string(),
            SheetInput { metadata_rows: Vec::new(), rows: vec![row(1, "fileTraceId")] },
        );

        let ingested = ingest(&doc, Some(&shared_doc));
        let shared_rows = ingested.rows.get("Shared Header").unwrap();
        assert_eq!(shared_rows[0].field_cell, "fileTraceId");
    }

    // -- 3. Sheet lookup is case/whitespace-insensitive -----------------------

    #[test]
    fn sheet_lookup_is_case_insensitive() {
        let mut sheets = BTreeMap::new();
        sheets.insert(
            "REQUEST".to_string(),
            SheetInput { metadata_rows: vec![vec![String::new(); 6]; 6], rows: vec![row(1, "limit")] },
        );
        let doc = SpecDocument { sheets };
        let ingested = ingest(&doc, None);
        assert_eq!(ingested.rows.get("Request").map(Vec::len), Some(1));
    }
}
