//! Builds an [`IntermediateTree`] from an abstract tabular message spec.
//!
//! The real-world input is a workbook (xlsx-shaped) of rows and columns;
//! this crate treats that shape abstractly as a [`Workbook`] of named
//! [`Grid`]s so the parsing logic stays independent of any particular
//! spreadsheet library. Sheet discovery, metadata extraction, occurrence
//! parsing, name normalization, and hierarchy reconstruction each live in
//! their own module and compose into [`parse_intermediate_tree`].

#![warn(missing_docs)]

pub mod grid;
pub mod metadata;
pub mod normalize;
pub mod occurrence;
pub mod seg_level;
pub mod sheet;

pub use grid::{Grid, Workbook};
pub use seg_level::SpecRow;

use msgforge_core::{FieldGroup, IntermediateTree};
use msgforge_error::{ErrorCode, MsgforgeError};
use tracing::{debug, info};

/// Version stamped into every [`msgforge_core::Metadata::parser_version`].
pub const PARSER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum container nesting depth, overridable via configuration.
pub const DEFAULT_MAX_NESTING_DEPTH: u32 = 50;

/// One fully-discovered spec input: the primary workbook, an optional
/// separately supplied shared-header workbook, and the source file paths
/// used for provenance in [`msgforge_core::Metadata`].
pub struct ParseInput {
    /// Primary workbook containing at least a `Request` sheet.
    pub workbook: Workbook,
    /// Path (or logical name) of the primary workbook.
    pub source_file: String,
    /// Optional separately supplied shared-header workbook.
    pub shared_header_workbook: Option<Workbook>,
    /// Path (or logical name) of the shared-header workbook, if supplied.
    pub shared_header_path: Option<String>,
    /// Maximum container nesting depth; defaults to
    /// [`DEFAULT_MAX_NESTING_DEPTH`] when `None`.
    pub max_nesting_depth: Option<u32>,
}

/// Parse a [`ParseInput`] into a complete [`IntermediateTree`].
///
/// # Errors
///
/// Returns [`ErrorCode::ParseMissingRequestSheet`] if the primary workbook
/// has no `Request` sheet, or any error surfaced by metadata resolution,
/// occurrence parsing, or hierarchy reconstruction.
pub fn parse_intermediate_tree(
    input: ParseInput,
    rows_of: impl Fn(&Grid, &str) -> Vec<SpecRow>,
) -> Result<IntermediateTree, MsgforgeError> {
    let max_depth = input.max_nesting_depth.unwrap_or(DEFAULT_MAX_NESTING_DEPTH);
    debug!(target: "msgforge.parser", source_file = %input.source_file, max_depth, "parsing spec input");

    let request_grid = sheet::find_sheet(&input.workbook, sheet::REQUEST).ok_or_else(|| {
        MsgforgeError::new(
            ErrorCode::ParseMissingRequestSheet,
            "workbook has no `Request` sheet",
        )
        .with_context("source_file", &input.source_file)
    })?;

    let response_grid = sheet::find_sheet(&input.workbook, sheet::RESPONSE);
    let embedded_shared_header_grid = sheet::find_sheet(&input.workbook, sheet::SHARED_HEADER);

    let shared_header_file_grid = input
        .shared_header_workbook
        .as_ref()
        .and_then(|wb| sheet::find_sheet(wb, sheet::SHARED_HEADER).or_else(|| sheet::find_sheet(wb, sheet::REQUEST)));

    let request_raw = metadata::extract_raw(request_grid);
    let shared_header_file_raw = shared_header_file_grid.map(metadata::extract_raw);
    let embedded_shared_header_raw = embedded_shared_header_grid.map(metadata::extract_raw);

    let md = metadata::resolve(
        request_raw,
        shared_header_file_raw,
        embedded_shared_header_raw,
        input.source_file.clone(),
        input.shared_header_path.clone(),
        PARSER_VERSION,
    )?;

    let request_rows = rows_of(request_grid, sheet::REQUEST);
    let request_roots = seg_level::build_hierarchy(&request_rows, max_depth)?;

    let response_roots = match response_grid {
        Some(grid) => seg_level::build_hierarchy(&rows_of(grid, sheet::RESPONSE), max_depth)?,
        None => Vec::new(),
    };

    // The separately supplied shared-header workbook takes priority over an
    // embedded `Shared Header` sheet for building the field rows themselves,
    // mirroring the same precedence used for metadata resolution.
    let shared_header_rows_grid = shared_header_file_grid.or(embedded_shared_header_grid);
    let shared_header_roots = match shared_header_rows_grid {
        Some(grid) => seg_level::build_hierarchy(&rows_of(grid, sheet::SHARED_HEADER), max_depth)?,
        None => Vec::new(),
    };

    info!(
        target: "msgforge.parser",
        operation_id = %md.operation_id,
        shared_header_fields = shared_header_roots.len(),
        request_fields = request_roots.len(),
        response_fields = response_roots.len(),
        "parsed intermediate tree"
    );

    Ok(IntermediateTree::new(
        md,
        FieldGroup {
            roots: shared_header_roots,
        },
        FieldGroup {
            roots: request_roots,
        },
        FieldGroup {
            roots: response_roots,
        },
    ))
}
