//! Seg-Level Parser: hierarchy reconstruction from a flat row list.
//!
//! This is the most subtle algorithm in the pipeline. A container row and
//! its immediate children share the *same* segment level; only a row that
//! opens a container one level deeper carries a level one greater than its
//! enclosing container. A container's scope closes when: a sibling
//! container at the same level appears; a shallower row appears; or a
//! third same-level leaf appears after two consecutive same-level leaves
//! have already been attached (the leaf "chain" auto-closes after two).

use msgforge_core::{DataType, FieldNode, Occurrence, Optionality, Provenance};
use msgforge_error::{ErrorCode, MsgforgeError};

/// One row of the flattened spec sheet, already extracted from whatever
/// coordinate scheme the workbook reader used.
#[derive(Debug, Clone)]
pub struct SpecRow {
    /// Sheet this row came from (for provenance and error context).
    pub sheet: String,
    /// 1-based row index within the sheet.
    pub row_index: u32,
    /// Segment level (depth marker), must be ≥ 1.
    pub level: u32,
    /// Field-name cell text, e.g. `"name"` or `"person:Person"`.
    pub field_cell: String,
    /// Declared wire type token.
    pub data_type: DataType,
    /// Declared byte length (required for leaves).
    pub byte_length: Option<u32>,
    /// `true` for `M` (required), `false` for `O` (optional).
    pub required: bool,
    /// Default literal, if any.
    pub default_literal: Option<String>,
    /// Hard-coded literal, if any.
    pub hard_coded_literal: Option<String>,
    /// Non-empty only on a `groupId` control row.
    pub group_id_literal: Option<String>,
    /// Raw `min..max` occurrence literal.
    pub occurrence_literal: Option<String>,
    /// Enum-constraint literal, if any.
    pub enum_constraint: Option<String>,
}

struct OpenFrame {
    level: u32,
    children: Vec<FieldNode>,
    consecutive_leaf_count: u32,
    // Fields needed to finalize the container node once popped. `None`
    // for the root sentinel frame, which is never finalized into a node.
    pending: Option<PendingContainer>,
}

struct PendingContainer {
    original_name: String,
    normalized_name: String,
    class_name: String,
    occurrence: Occurrence,
    occurrence_literal: Option<String>,
    required: bool,
    provenance: Provenance,
}

/// Build an ordered [`FieldGroup`](msgforge_core::FieldGroup)'s root
/// vector from a flat, ordered row list.
///
/// # Errors
///
/// - [`ErrorCode::ParseLevelJump`] if a row descends more than one level
///   deeper than its enclosing container in a single step.
/// - [`ErrorCode::ParseMaxDepthExceeded`] if nesting exceeds `max_depth`.
/// - [`ErrorCode::ParseDuplicateSibling`] if two siblings normalize to the
///   same name.
/// - [`ErrorCode::ParseInvalidOccurrence`] propagated from the occurrence
///   parser.
pub fn build_hierarchy(rows: &[SpecRow], max_depth: u32) -> Result<Vec<FieldNode>, MsgforgeError> {
    let mut stack: Vec<OpenFrame> = vec![OpenFrame {
        level: 0,
        children: Vec::new(),
        consecutive_leaf_count: 0,
        pending: None,
    }];

    for row in rows {
        if row.level == 0 {
            return Err(MsgforgeError::new(
                ErrorCode::ParseLevelJump,
                "segment level must be a positive integer",
            )
            .with_context("sheet", &row.sheet)
            .with_context("row", row.row_index));
        }

        let (original_name, explicit_class) = split_container_marker(&row.field_cell);
        let is_container = explicit_class.is_some();
        let normalized_name = crate::normalize::normalize_name(&original_name);

        loop {
            let top_level = stack.last().expect("root sentinel never popped").level;

            if top_level > row.level {
                pop_frame(&mut stack, row)?;
                continue;
            }
            if top_level == row.level {
                if is_container {
                    pop_frame(&mut stack, row)?;
                    continue;
                }
                if stack.last().expect("non-empty").consecutive_leaf_count >= 2 {
                    pop_frame(&mut stack, row)?;
                    continue;
                }
                break;
            }
            // top_level < row.level: entering one level deeper.
            if row.level != top_level + 1 {
                return Err(MsgforgeError::new(
                    ErrorCode::ParseLevelJump,
                    format!(
                        "segment level jumped from {top_level} to {} in a single row",
                        row.level
                    ),
                )
                .with_context("sheet", &row.sheet)
                .with_context("row", row.row_index));
            }
            break;
        }

        if stack.len() as u32 > max_depth {
            return Err(MsgforgeError::new(
                ErrorCode::ParseMaxDepthExceeded,
                format!("container nesting exceeded max depth {max_depth}"),
            )
            .with_context("sheet", &row.sheet)
            .with_context("row", row.row_index));
        }

        let occurrence = crate::occurrence::parse_occurrence(
            row.occurrence_literal.as_deref().unwrap_or(""),
        )?;

        let provenance = Provenance::new(row.sheet.clone(), row.row_index, row.field_cell.clone());

        if is_container {
            let class_name = explicit_class.unwrap_or_else(|| crate::normalize::class_name_for(&normalized_name));
            stack.push(OpenFrame {
                level: row.level,
                children: Vec::new(),
                consecutive_leaf_count: 0,
                pending: Some(PendingContainer {
                    original_name,
                    normalized_name,
                    class_name,
                    occurrence,
                    occurrence_literal: row.occurrence_literal.clone(),
                    required: row.required,
                    provenance,
                }),
            });
        } else {
            let node = build_leaf_node(row, original_name, normalized_name, occurrence, provenance);
            let top = stack.last_mut().expect("non-empty");
            check_sibling_duplicate(&top.children, &node)?;
            top.consecutive_leaf_count += 1;
            top.children.push(node);
        }
    }

    // Close every remaining frame, including the root sentinel.
    while stack.len() > 1 {
        close_top_frame(&mut stack)?;
    }

    Ok(stack.pop().expect("root sentinel").children)
}

fn pop_frame(stack: &mut Vec<OpenFrame>, _row: &SpecRow) -> Result<(), MsgforgeError> {
    close_top_frame(stack)
}

fn close_top_frame(stack: &mut Vec<OpenFrame>) -> Result<(), MsgforgeError> {
    let frame = stack.pop().expect("caller ensures non-root frame exists");
    let Some(pending) = frame.pending else {
        // Root sentinel should never be closed by this path.
        stack.push(frame);
        return Ok(());
    };

    let node = FieldNode {
        original_name: pending.original_name,
        normalized_name: pending.normalized_name,
        class_name: Some(pending.class_name),
        segment_level: frame.level,
        byte_length: None,
        data_type: DataType::Custom {
            name: "object".to_string(),
        },
        optionality: if pending.required {
            Optionality::Required
        } else {
            Optionality::Optional
        },
        default_literal: None,
        hard_coded_literal: None,
        group_id: None,
        occurrence_literal: pending.occurrence_literal,
        occurrence: pending.occurrence,
        is_array: pending.occurrence.is_array(),
        is_object: true,
        is_transitory: false,
        enum_constraint: None,
        children: frame.children,
        provenance: pending.provenance,
    };

    let parent = stack.last_mut().expect("root sentinel always remains");
    check_sibling_duplicate(&parent.children, &node)?;
    parent.children.push(node);
    Ok(())
}

fn build_leaf_node(
    row: &SpecRow,
    original_name: String,
    normalized_name: String,
    occurrence: Occurrence,
    provenance: Provenance,
) -> FieldNode {
    let is_group_id = normalized_name == "groupId" && row.group_id_literal.is_some();
    let is_occurrence_count = normalized_name == "occurrenceCount" && !is_group_id;
    let is_transitory = is_group_id || is_occurrence_count;

    FieldNode {
        original_name,
        normalized_name,
        class_name: None,
        segment_level: row.level,
        byte_length: row.byte_length,
        data_type: row.data_type.clone(),
        optionality: if row.required {
            Optionality::Required
        } else {
            Optionality::Optional
        },
        default_literal: row.default_literal.clone(),
        hard_coded_literal: row.hard_coded_literal.clone(),
        group_id: row.group_id_literal.clone(),
        occurrence_literal: row.occurrence_literal.clone(),
        occurrence,
        is_array: occurrence.is_array(),
        is_object: false,
        is_transitory,
        enum_constraint: row.enum_constraint.clone(),
        children: Vec::new(),
        provenance,
    }
}

fn check_sibling_duplicate(siblings: &[FieldNode], candidate: &FieldNode) -> Result<(), MsgforgeError> {
    if let Some(existing) = siblings
        .iter()
        .find(|n| n.normalized_name == candidate.normalized_name)
    {
        return Err(MsgforgeError::new(
            ErrorCode::ParseDuplicateSibling,
            format!(
                "duplicate sibling field `{}`",
                candidate.normalized_name
            ),
        )
        .with_context("rows", vec![existing.provenance.row, candidate.provenance.row])
        .with_context("sheet", &candidate.provenance.sheet));
    }
    Ok(())
}

/// Splits a field-name cell into `(name, explicit_class_name)`. A cell
/// containing `:` introduces a container with the class name given after
/// the colon; otherwise the cell is a plain leaf name.
fn split_container_marker(cell: &str) -> (String, Option<String>) {
    match cell.split_once(':') {
        Some((name, class)) if !class.trim().is_empty() => {
            (name.trim().to_string(), Some(class.trim().to_string()))
        }
        _ => (cell.trim().to_string(), None),
    }
}
