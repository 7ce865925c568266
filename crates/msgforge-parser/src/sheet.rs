//! Sheet Discovery: locate required/optional sheets by canonical name.

use crate::grid::{Grid, Workbook};

/// The canonical sheet names recognized by the pipeline.
pub const REQUEST: &str = "Request";
/// Optional response sheet.
pub const RESPONSE: &str = "Response";
/// Optional embedded shared-header sheet.
pub const SHARED_HEADER: &str = "Shared Header";

/// Find a sheet by canonical name using exact match first, then
/// case-insensitive, then whitespace-insensitive.
#[must_use]
pub fn find_sheet<'a>(wb: &'a Workbook, canonical: &str) -> Option<&'a Grid> {
    if let Some((_, g)) = wb.iter().find(|(name, _)| *name == canonical) {
        return Some(g);
    }
    if let Some((_, g)) = wb
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(canonical))
    {
        return Some(g);
    }
    let canonical_squashed = squash_whitespace(canonical);
    wb.iter()
        .find(|(name, _)| squash_whitespace(name).eq_ignore_ascii_case(&canonical_squashed))
        .map(|(_, g)| g)
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("")
}
