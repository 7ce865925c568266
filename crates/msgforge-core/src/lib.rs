//! Canonical data model for the message-spec compiler.
//!
//! [`IntermediateTree`] is the single source of truth built once by the
//! parser and consumed read-only by every generator and validator
//! downstream. Nothing outside the parser ever mutates it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod provenance;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub use provenance::Provenance;

/// Contract version stamped on every persisted intermediate tree.
///
/// Bumped whenever the shape of [`IntermediateTree`] changes in a way that
/// breaks round-tripping of previously emitted `message-tree.json` files.
pub const CONTRACT_VERSION: &str = "msgforge/v1";

/// Errors surfaced while serializing or hashing a tree.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The value could not be converted to canonical JSON.
    #[error("canonical JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Declared wire type of a leaf field, as read from the spec sheet.
///
/// Drives padding/alignment rules in the XML generator and primitive-type
/// mapping in the POJO and OpenAPI generators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataType {
    /// Right-aligned, zero-padded numeric field.
    Numeric,
    /// Left-aligned, space-padded textual field.
    Textual,
    /// Decimal amount/currency field using a dedicated converter.
    Amount,
    /// A declared type not covered by the built-in set, kept verbatim.
    Custom {
        /// Original type token from the spec sheet.
        name: String,
    },
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("numeric"),
            Self::Textual => f.write_str("textual"),
            Self::Amount => f.write_str("amount"),
            Self::Custom { name } => write!(f, "custom({name})"),
        }
    }
}

/// Required (`M`) / optional (`O`) designation from the spec sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Optionality {
    /// `M` in the source sheet.
    Required,
    /// `O` in the source sheet.
    Optional,
}

impl Optionality {
    /// `true` when the field is required.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Which message direction a generator or validator is operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Response side of the operation.
    Inbound,
    /// Request side of the operation.
    Outbound,
}

impl IntermediateTree {
    /// The roots that feed this direction's artifacts: shared-header
    /// fields followed by the direction's own group, in IT order.
    pub fn roots_for(&self, direction: Direction) -> impl Iterator<Item = &FieldNode> {
        self.shared_header.roots.iter().chain(match direction {
            Direction::Outbound => self.request.roots.iter(),
            Direction::Inbound => self.response.roots.iter(),
        })
    }
}

/// Parsed `min..max` cardinality literal.
///
/// `is-array ↔ occurrence-max > 1`, `is-optional ↔ occurrence-min = 0`,
/// `fixed-count = max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Occurrence {
    /// Minimum cardinality.
    pub min: u32,
    /// Maximum cardinality.
    pub max: u32,
}

impl Occurrence {
    /// The `1..1` default used when the literal is empty or missing.
    pub const ONE: Occurrence = Occurrence { min: 1, max: 1 };

    /// Whether this occurrence makes the field array-shaped.
    #[must_use]
    pub fn is_array(self) -> bool {
        self.max > 1
    }

    /// Whether this occurrence makes the field optional.
    #[must_use]
    pub fn is_optional(self) -> bool {
        self.min == 0
    }

    /// The `max` bound, used by repeating-field emission.
    #[must_use]
    pub fn fixed_count(self) -> u32 {
        self.max
    }

    /// Whether this occurrence is entirely skipped (`max == 0`).
    #[must_use]
    pub fn is_skipped(self) -> bool {
        self.max == 0
    }
}

impl Default for Occurrence {
    fn default() -> Self {
        Self::ONE
    }
}

/// A single node in the intermediate tree: either a leaf field or a
/// container (object/array) with children.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldNode {
    /// Name exactly as it appeared in the source sheet.
    pub original_name: String,
    /// Deterministic camelCase identifier derived from `original_name`.
    pub normalized_name: String,
    /// Nested class name for object/array containers (`Initial-Cap` form).
    pub class_name: Option<String>,
    /// Positive-integer depth marker from the source row.
    pub segment_level: u32,
    /// Declared byte length, required for leaves.
    pub byte_length: Option<u32>,
    /// Declared wire type.
    pub data_type: DataType,
    /// `M`/`O` designation.
    pub optionality: Optionality,
    /// Default literal value, if any.
    pub default_literal: Option<String>,
    /// Hard-coded literal value, if any (payload must match exactly).
    pub hard_coded_literal: Option<String>,
    /// Group identifier literal, present only on transitory `groupId` fields.
    pub group_id: Option<String>,
    /// Raw `min..max` occurrence literal as it appeared in the sheet.
    pub occurrence_literal: Option<String>,
    /// Parsed occurrence cardinality.
    pub occurrence: Occurrence,
    /// `true` for array containers or array-of-primitive leaves.
    pub is_array: bool,
    /// `true` for non-leaf containers with children.
    pub is_object: bool,
    /// `true` iff this is a `groupId` or `occurrenceCount` control field.
    pub is_transitory: bool,
    /// Enum-constraint literal (pipe- or comma-delimited), if any.
    pub enum_constraint: Option<String>,
    /// Ordered children; empty for leaves.
    pub children: Vec<FieldNode>,
    /// Source-row provenance. Never emitted in generated artifacts.
    pub provenance: Provenance,
}

impl FieldNode {
    /// A leaf has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// `true` iff this is the transitory `groupId` control field.
    #[must_use]
    pub fn is_group_id_control(&self) -> bool {
        self.is_transitory && self.group_id.is_some()
    }

    /// `true` iff this is the transitory `occurrenceCount` control field.
    #[must_use]
    pub fn is_occurrence_count_control(&self) -> bool {
        self.is_transitory && self.occurrence_literal.is_some() && self.group_id.is_none()
    }

    /// Depth-first iterator over this node and all descendants, in IT order.
    pub fn walk(&self) -> impl Iterator<Item = &FieldNode> {
        FieldNodeWalk {
            stack: vec![self],
        }
    }
}

struct FieldNodeWalk<'a> {
    stack: Vec<&'a FieldNode>,
}

impl<'a> Iterator for FieldNodeWalk<'a> {
    type Item = &'a FieldNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// An ordered sequence of [`FieldNode`] roots. Order mirrors source row
/// order and is authoritative for every downstream consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldGroup {
    /// Root-level fields, in source order.
    pub roots: Vec<FieldNode>,
}

impl FieldGroup {
    /// An empty group.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` when the group has no roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first iterator over every node in the group, in IT order.
    pub fn walk(&self) -> impl Iterator<Item = &FieldNode> {
        self.roots.iter().flat_map(FieldNode::walk)
    }
}

/// Operation identity and parse provenance for a single run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Metadata {
    /// Human-readable operation name.
    pub operation_name: Option<String>,
    /// Stable operation id; seeds generated class/endpoint names. Required.
    pub operation_id: String,
    /// Spec version string.
    pub version: Option<String>,
    /// Service category.
    pub service_category: Option<String>,
    /// Service interface.
    pub service_interface: Option<String>,
    /// Service component.
    pub service_component: Option<String>,
    /// Service id.
    pub service_id: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Path to the primary workbook that produced this tree.
    pub source_file: String,
    /// Path to a separately supplied shared-header workbook, if any.
    pub shared_header_file: Option<String>,
    /// UTC timestamp of parse completion.
    pub parsed_at: DateTime<Utc>,
    /// Version of the parser that produced this tree.
    pub parser_version: String,
}

/// The canonical, ordered, provenance-bearing representation consumed by
/// every downstream generator and validator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IntermediateTree {
    /// Contract version this document was serialized under.
    pub contract_version: String,
    /// Operation metadata.
    pub metadata: Metadata,
    /// Shared-header fields, may be empty.
    pub shared_header: FieldGroup,
    /// Request fields. Required; must not be empty.
    pub request: FieldGroup,
    /// Response fields, may be empty.
    pub response: FieldGroup,
}

impl IntermediateTree {
    /// Construct a new tree stamped with the current [`CONTRACT_VERSION`].
    #[must_use]
    pub fn new(
        metadata: Metadata,
        shared_header: FieldGroup,
        request: FieldGroup,
        response: FieldGroup,
    ) -> Self {
        Self {
            contract_version: CONTRACT_VERSION.to_string(),
            metadata,
            shared_header,
            request,
            response,
        }
    }

    /// Depth-first iterator over every field in shared-header, then
    /// request, then response order.
    pub fn walk_all(&self) -> impl Iterator<Item = &FieldNode> {
        self.shared_header
            .walk()
            .chain(self.request.walk())
            .chain(self.response.walk())
    }
}

/// Serialize `value` to canonical (single-line, field-order-preserving)
/// JSON suitable for hashing.
///
/// # Errors
///
/// Returns [`CoreError::Json`] if the value cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Deterministic content hash of an [`IntermediateTree`], used by the
/// determinism property (two runs over identical input hash identically)
/// and by the output manifest.
///
/// # Errors
///
/// Returns [`CoreError::Json`] if the tree cannot be serialized.
pub fn tree_hash(tree: &IntermediateTree) -> Result<String, CoreError> {
    let json = canonical_json(tree)?;
    Ok(sha256_hex(json.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, len: u32) -> FieldNode {
        FieldNode {
            original_name: name.to_string(),
            normalized_name: name.to_string(),
            class_name: None,
            segment_level: 1,
            byte_length: Some(len),
            data_type: DataType::Textual,
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

    // -- 1. Occurrence semantics --------------------------------------

    #[test]
    fn occurrence_defaults_to_one_one() {
        let occ = Occurrence::default();
        assert!(!occ.is_array());
        assert!(!occ.is_optional());
        assert_eq!(occ.fixed_count(), 1);
    }

    #[test]
    fn occurrence_zero_nine_is_array_and_optional() {
        let occ = Occurrence { min: 0, max: 9 };
        assert!(occ.is_array());
        assert!(occ.is_optional());
        assert_eq!(occ.fixed_count(), 9);
    }

    #[test]
    fn occurrence_zero_zero_is_skipped() {
        let occ = Occurrence { min: 0, max: 0 };
        assert!(occ.is_skipped());
    }

    // -- 2. Tree walking preserves IT order -----------------------------

    #[test]
    fn walk_visits_roots_before_children_is_false_depth_first_preorder() {
        let mut parent = leaf("person", 0);
        parent.children = vec![leaf("name", 10), leaf("age", 3)];
        parent.is_object = true;

        let group = FieldGroup {
            roots: vec![leaf("limit", 5), parent, leaf("birth", 8)],
        };

        let names: Vec<_> = group.walk().map(|n| n.original_name.as_str()).collect();
        assert_eq!(names, vec!["limit", "person", "name", "age", "birth"]);
    }

    // -- 3. Hashing is deterministic -------------------------------------

    #[test]
    fn tree_hash_is_deterministic() {
        let tree = sample_tree();
        let h1 = tree_hash(&tree).unwrap();
        let h2 = tree_hash(&tree).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    fn sample_tree() -> IntermediateTree {
        IntermediateTree::new(
            Metadata {
                operation_name: Some("Create Application".into()),
                operation_id: "createApplication".into(),
                version: Some("1".into()),
                service_category: None,
                service_interface: None,
                service_component: None,
                service_id: None,
                description: None,
                source_file: "spec.xlsx".into(),
                shared_header_file: None,
                parsed_at: DateTime::from_timestamp(0, 0).unwrap(),
                parser_version: "test".into(),
            },
            FieldGroup::empty(),
            FieldGroup {
                roots: vec![leaf("limit", 5)],
            },
            FieldGroup::empty(),
        )
    }
}
