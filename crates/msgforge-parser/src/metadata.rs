//! Metadata Extractor: operation identity from fixed cell coordinates.
//!
//! Coordinates (1-based row, spreadsheet column letter), read from the
//! first seven rows of the target sheet:
//!
//! | Row | Col C | Col E |
//! |---|---|---|
//! | 2 | operation name | |
//! | 3 | operation id | version |
//! | 4 | service category | service interface |
//! | 5 | service component | service id |
//! | 6 | description | |

use crate::grid::Grid;
use chrono::Utc;
use msgforge_core::Metadata;
use msgforge_error::{ErrorCode, MsgforgeError};

const ROW_OPERATION_NAME: u32 = 2;
const ROW_OPERATION_ID_AND_VERSION: u32 = 3;
const ROW_SERVICE_CATEGORY_AND_INTERFACE: u32 = 4;
const ROW_SERVICE_COMPONENT_AND_ID: u32 = 5;
const ROW_DESCRIPTION: u32 = 6;
const COL_PRIMARY: &str = "C";
const COL_SECONDARY: &str = "E";

/// Raw fields read from one metadata-bearing sheet, before the
/// first-wins resolution across sources.
#[derive(Debug, Clone, Default)]
pub struct RawMetadata {
    /// Operation name (row 2, col C).
    pub operation_name: Option<String>,
    /// Operation id (row 3, col C). Only field validated as required.
    pub operation_id: Option<String>,
    /// Version (row 3, col E).
    pub version: Option<String>,
    /// Service category (row 4, col C).
    pub service_category: Option<String>,
    /// Service interface (row 4, col E).
    pub service_interface: Option<String>,
    /// Service component (row 5, col C).
    pub service_component: Option<String>,
    /// Service id (row 5, col E).
    pub service_id: Option<String>,
    /// Description (row 6, col C).
    pub description: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Read metadata from fixed cell coordinates in `grid`. Values are
/// trimmed (by [`Grid`] itself); empty cells become `None`.
#[must_use]
pub fn extract_raw(grid: &Grid) -> RawMetadata {
    RawMetadata {
        operation_name: non_empty(grid.cell(ROW_OPERATION_NAME, COL_PRIMARY)),
        operation_id: non_empty(grid.cell(ROW_OPERATION_ID_AND_VERSION, COL_PRIMARY)),
        version: non_empty(grid.cell(ROW_OPERATION_ID_AND_VERSION, COL_SECONDARY)),
        service_category: non_empty(grid.cell(ROW_SERVICE_CATEGORY_AND_INTERFACE, COL_PRIMARY)),
        service_interface: non_empty(grid.cell(ROW_SERVICE_CATEGORY_AND_INTERFACE, COL_SECONDARY)),
        service_component: non_empty(grid.cell(ROW_SERVICE_COMPONENT_AND_ID, COL_PRIMARY)),
        service_id: non_empty(grid.cell(ROW_SERVICE_COMPONENT_AND_ID, COL_SECONDARY)),
        description: non_empty(grid.cell(ROW_DESCRIPTION, COL_PRIMARY)),
    }
}

/// Resolve metadata across the three competing sources in first-wins
/// order: Request sheet → Shared-Header file → embedded Shared-Header
/// sheet. The first source yielding a non-empty operation id wins
/// *entirely* — its other fields are used even if individually blank,
/// matching "first source yielding a non-empty operation id wins".
///
/// # Errors
///
/// Returns [`ErrorCode::ParseMissingOperationId`] if no source has a
/// non-empty operation id.
pub fn resolve(
    request_sheet: RawMetadata,
    shared_header_file: Option<RawMetadata>,
    embedded_shared_header: Option<RawMetadata>,
    source_file: impl Into<String>,
    shared_header_path: Option<String>,
    parser_version: impl Into<String>,
) -> Result<Metadata, MsgforgeError> {
    let candidates = [
        Some(request_sheet),
        shared_header_file,
        embedded_shared_header,
    ];

    let winner = candidates
        .into_iter()
        .flatten()
        .find(|m| m.operation_id.as_deref().is_some_and(|s| !s.is_empty()))
        .ok_or_else(|| {
            MsgforgeError::new(
                ErrorCode::ParseMissingOperationId,
                "no metadata source yielded a non-empty operation id",
            )
        })?;

    Ok(Metadata {
        operation_name: winner.operation_name,
        operation_id: winner.operation_id.expect("checked above"),
        version: winner.version,
        service_category: winner.service_category,
        service_interface: winner.service_interface,
        service_component: winner.service_component,
        service_id: winner.service_id,
        description: winner.description,
        source_file: source_file.into(),
        shared_header_file: shared_header_path,
        parsed_at: Utc::now(),
        parser_version: parser_version.into(),
    })
}
