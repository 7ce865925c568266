//! Human-readable renderings of machine-readable validation results.
//!
//! Each function here takes a structured result from `msgforge-validate`
//! or the offset engine and renders the same facts as Markdown, for
//! humans reading `validation/consistency-report.md` or `diff.md`
//! without a JSON viewer.

use msgforge_validate::{ConsistencyResult, Severity};
use std::fmt::Write as _;

/// Render a [`ConsistencyResult`] as a Markdown table.
#[must_use]
pub fn render_consistency_md(result: &ConsistencyResult) -> String {
    let mut out = String::new();
    if result.issues.is_empty() {
        out.push_str("# Consistency report\n\nNo issues found.\n");
        return out;
    }

    let errors = result.issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = result.issues.len() - errors;
    writeln!(out, "# Consistency report\n").unwrap();
    writeln!(out, "{errors} error(s), {warnings} warning(s).\n").unwrap();
    writeln!(out, "| Rule | Field | Severity | Message |").unwrap();
    writeln!(out, "|---|---|---|---|").unwrap();
    for issue in &result.issues {
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        writeln!(out, "| {} | `{}` | {severity} | {} |", issue.rule, issue.field_path, issue.message).unwrap();
    }
    out
}

/// Render the original-name -> normalized-name rename table as Markdown.
#[must_use]
pub fn render_diff_md(rename_table: &[(String, String)]) -> String {
    let mut out = String::new();
    let changed: Vec<_> = rename_table.iter().filter(|(original, normalized)| original != normalized).collect();

    writeln!(out, "# Field rename diff\n").unwrap();
    if changed.is_empty() {
        out.push_str("No field name changed during normalization.\n");
        return out;
    }

    writeln!(out, "| Original | Normalized |").unwrap();
    writeln!(out, "|---|---|").unwrap();
    for (original, normalized) in changed {
        writeln!(out, "| `{original}` | `{normalized}` |").unwrap();
    }
    out
}
