//! Occurrence Parser: `min..max` cardinality literals.

use msgforge_core::Occurrence;
use msgforge_error::{ErrorCode, MsgforgeError};
use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\.\.(\d+)$").expect("valid regex"))
}

/// Parse a trimmed occurrence literal. Empty or missing is treated as
/// `1..1`.
///
/// # Errors
///
/// Returns [`ErrorCode::ParseInvalidOccurrence`] if the literal doesn't
/// match `^(\d+)\.\.(\d+)$` or if `min > max`.
pub fn parse_occurrence(literal: &str) -> Result<Occurrence, MsgforgeError> {
    let trimmed = literal.trim();
    if trimmed.is_empty() {
        return Ok(Occurrence::ONE);
    }

    let caps = pattern().captures(trimmed).ok_or_else(|| {
        MsgforgeError::new(
            ErrorCode::ParseInvalidOccurrence,
            format!("occurrence literal `{trimmed}` does not match `min..max`"),
        )
        .with_context("literal", trimmed)
    })?;

    // Regex guarantees digit-only captures; parse failure is unreachable.
    let min: u32 = caps[1].parse().expect("digits matched by regex");
    let max: u32 = caps[2].parse().expect("digits matched by regex");

    if min > max {
        return Err(MsgforgeError::new(
            ErrorCode::ParseInvalidOccurrence,
            format!("occurrence min ({min}) exceeds max ({max})"),
        )
        .with_context("literal", trimmed));
    }

    Ok(Occurrence { min, max })
}
