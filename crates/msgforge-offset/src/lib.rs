//! Offset Engine and Payload Validator.
//!
//! The offset engine is a pure, read-only traversal of
//! [`IntermediateTree`] that never touches a real payload; the payload
//! validator consumes its output plus a literal byte-string and never
//! re-touches the tree. Keeping them split this way mirrors the
//! dataflow in the rest of the pipeline: each stage reads the previous
//! stage's output, nothing more.

#![warn(missing_docs)]

pub mod payload;

use msgforge_core::{DataType, Direction, FieldNode, IntermediateTree};
use msgforge_error::{ErrorCode, MsgforgeError};
use serde::{Deserialize, Serialize};

pub use payload::{DifferenceKind, PayloadDifference, PayloadReport, validate_payload};

/// One leaf's position in a fixed-length payload, plus the constraint
/// metadata the payload validator needs without re-reading the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetEntry {
    /// Dot/bracket-index field path, e.g. `items[0].name`.
    pub field_path: String,
    /// Byte offset where this field starts.
    pub offset: u64,
    /// Declared byte length.
    pub length: u64,
    /// `offset + length`.
    pub end_offset: u64,
    /// Container nesting depth, 0 at the root.
    pub nesting_level: u32,
    /// Declared wire type, needed for format/pad checks downstream.
    pub data_type: DataType,
    /// Hard-coded literal the payload slice must match exactly.
    pub hard_coded_literal: Option<String>,
    /// Default literal applied when the slice is blank-padded.
    pub default_literal: Option<String>,
    /// Enum-constraint literal, if any.
    pub enum_constraint: Option<String>,
}

/// An ordered traversal of one message's leaves, plus the total byte
/// length of the message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffsetTable {
    /// Leaves in depth-first IT order.
    pub entries: Vec<OffsetEntry>,
    /// Sum of every entry's length.
    pub total_length: u64,
}

/// Build the offset table for one message direction.
///
/// # Errors
///
/// Returns [`ErrorCode::ValidationStructural`] if a leaf that is not
/// skipped (`occurrence-max > 0`) has no declared byte length.
pub fn build_offset_table(tree: &IntermediateTree, direction: Direction) -> Result<OffsetTable, MsgforgeError> {
    let mut entries = Vec::new();
    let mut cursor: u64 = 0;
    for root in tree.roots_for(direction) {
        walk(root, "", 0, &mut cursor, &mut entries)?;
    }
    Ok(OffsetTable {
        entries,
        total_length: cursor,
    })
}

fn field_name(node: &FieldNode) -> &str {
    if node.normalized_name.is_empty() {
        &node.original_name
    } else {
        &node.normalized_name
    }
}

fn leaf_length(node: &FieldNode) -> Result<u64, MsgforgeError> {
    node.byte_length.map(u64::from).ok_or_else(|| {
        MsgforgeError::new(
            ErrorCode::ValidationStructural,
            format!("field `{}` has no declared byte length", field_name(node)),
        )
        .with_context("sheet", &node.provenance.sheet)
        .with_context("row", node.provenance.row)
    })
}

fn push_leaf(
    node: &FieldNode,
    path: String,
    nesting_level: u32,
    cursor: &mut u64,
    entries: &mut Vec<OffsetEntry>,
) -> Result<(), MsgforgeError> {
    let length = leaf_length(node)?;
    let offset = *cursor;
    let end_offset = offset + length;
    entries.push(OffsetEntry {
        field_path: path,
        offset,
        length,
        end_offset,
        nesting_level,
        data_type: node.data_type.clone(),
        hard_coded_literal: node.hard_coded_literal.clone(),
        default_literal: node.default_literal.clone(),
        enum_constraint: node.enum_constraint.clone(),
    });
    *cursor = end_offset;
    Ok(())
}

fn walk(
    node: &FieldNode,
    prefix: &str,
    nesting_level: u32,
    cursor: &mut u64,
    entries: &mut Vec<OffsetEntry>,
) -> Result<(), MsgforgeError> {
    if node.occurrence.is_skipped() {
        return Ok(());
    }

    let name = field_name(node);

    if node.is_array {
        for index in 0..node.occurrence.fixed_count() {
            let indexed_path = format!("{prefix}{name}[{index}]");
            if node.is_object {
                let child_prefix = format!("{indexed_path}.");
                for child in &node.children {
                    walk(child, &child_prefix, nesting_level + 1, cursor, entries)?;
                }
            } else {
                push_leaf(node, indexed_path, nesting_level, cursor, entries)?;
            }
        }
    } else if node.is_object {
        let child_prefix = format!("{prefix}{name}.");
        for child in &node.children {
            walk(child, &child_prefix, nesting_level + 1, cursor, entries)?;
        }
    } else {
        let path = format!("{prefix}{name}");
        push_leaf(node, path, nesting_level, cursor, entries)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgforge_core::{FieldGroup, Metadata, Occurrence, Optionality, Provenance};

    fn leaf(name: &str, data_type: DataType, len: u32) -> FieldNode {
        FieldNode {
            original_name: name.to_string(),
            normalized_name: name.to_string(),
            class_name: None,
            segment_level: 1,
            byte_length: Some(len),
            data_type,
            optionality: Optionality::Required,
            default_literal: None,
            hard_coded_literal: None,
            group_id: None,
            occurrence_literal: None,
            occurrence: Occurrence::ONE,
            is_array: false,
            is_object: false,
            is_transitory: false,
            enum_constraint: None,
            children: Vec::new(),
            provenance: Provenance::new("Request", 1, name),
        }
    }

    fn tree_with_request(roots: Vec<FieldNode>) -> IntermediateTree {
        IntermediateTree::new(
            Metadata {
                operation_name: None,
                operation_id: "createApplication".into(),
                version: None,
                service_category: None,
                service_interface: None,
                service_component: None,
                service_id: None,
                description: None,
                source_file: "spec.xlsx".into(),
                shared_header_file: None,
                parsed_at: chrono::DateTime::from_timestamp(0, 0).unwrap(),
                parser_version: "test".into(),
            },
            FieldGroup::empty(),
            FieldGroup { roots },
            FieldGroup::empty(),
        )
    }

    // -- 1. Array-of-object expansion matches the worked example -------------

    #[test]
    fn array_of_object_expansion_matches_worked_example() {
        let mut items = leaf("items", DataType::Custom { name: "object".into() }, 0);
        items.is_object = true;
        items.is_array = true;
        items.occurrence = Occurrence { min: 0, max: 2 };
        items.children = vec![
            leaf("name", DataType::Textual, 20),
            leaf("price", DataType::Numeric, 10),
        ];

        let tree = tree_with_request(vec![items]);
        let table = build_offset_table(&tree, Direction::Outbound).unwrap();

        let paths: Vec<_> = table.entries.iter().map(|e| e.field_path.as_str()).collect();
        assert_eq!(paths, vec!["items[0].name", "items[0].price", "items[1].name", "items[1].price"]);
        assert_eq!(table.entries[0].offset, 0);
        assert_eq!(table.entries[1].offset, 20);
        assert_eq!(table.entries[2].offset, 30);
        assert_eq!(table.entries[3].offset, 50);
        assert_eq!(table.total_length, 60);
    }

    // -- 2. Zero-occurrence field is skipped entirely -------------------------

    #[test]
    fn zero_occurrence_field_contributes_nothing() {
        let mut skipped = leaf("unused", DataType::Textual, 10);
        skipped.occurrence = Occurrence { min: 0, max: 0 };

        let tree = tree_with_request(vec![skipped, leaf("kept", DataType::Textual, 5)]);
        let table = build_offset_table(&tree, Direction::Outbound).unwrap();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].field_path, "kept");
        assert_eq!(table.total_length, 5);
    }

    // -- 3. Container nodes contribute zero bytes themselves ------------------

    #[test]
    fn object_container_contributes_no_length_itself() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with_request(vec![person]);
        let table = build_offset_table(&tree, Direction::Outbound).unwrap();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].field_path, "person.name");
        assert_eq!(table.total_length, 20);
    }

    // -- 4. Missing byte length on a live field is an error -------------------

    #[test]
    fn missing_length_on_live_field_is_an_error() {
        let mut field = leaf("amount", DataType::Numeric, 0);
        field.byte_length = None;
        let tree = tree_with_request(vec![field]);
        let err = build_offset_table(&tree, Direction::Outbound).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationStructural);
    }

    // -- 5. Offset monotonicity invariant ------------------------------------

    #[test]
    fn entries_are_contiguous() {
        let tree = tree_with_request(vec![
            leaf("a", DataType::Textual, 5),
            leaf("b", DataType::Textual, 3),
            leaf("c", DataType::Textual, 7),
        ]);
        let table = build_offset_table(&tree, Direction::Outbound).unwrap();
        for pair in table.entries.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].offset);
        }
        assert_eq!(table.total_length, table.entries.iter().map(|e| e.length).sum::<u64>());
    }
}
