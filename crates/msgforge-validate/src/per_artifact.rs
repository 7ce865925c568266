//! Per-artifact structural validators.
//!
//! Each validator projects the intermediate tree through the same
//! discipline its generator uses (XML keeps transitory control fields,
//! POJO and OpenAPI drop them), producing a normalized field-map plus a
//! list of structural findings (`XML-NNN`, `JB-NNN`, `OA-NNN`).

use indexmap::IndexMap;
use msgforge_core::{DataType, Direction, FieldNode, IntermediateTree};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which artifact family a validator/finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Spring-style XML bean definitions.
    Xml,
    /// Generated Java classes.
    Pojo,
    /// OpenAPI schema documents.
    OpenApi,
}

impl ArtifactKind {
    fn code_prefix(self) -> &'static str {
        match self {
            Self::Xml => "XML",
            Self::Pojo => "JB",
            Self::OpenApi => "OA",
        }
    }
}

/// `{primitive, object, array}` shape of a field, independent of its
/// declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// A leaf value.
    Primitive,
    /// A non-repeating container.
    Object,
    /// A repeating field or container.
    Array,
}

/// One entry in a [`FieldMap`]: everything the consistency validator
/// needs to compare this field across artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    /// The type token as it appears in this artifact's own lexicon
    /// (e.g. `NumericConverter`, `Integer`, `integer`).
    pub declared_type: String,
    /// `true` for the transitory `groupId`/`occurrenceCount` control
    /// fields that only the XML artifact ever carries.
    pub is_transitory: bool,
    /// Structural shape.
    pub shape: Shape,
    /// Whether the field is required (`M`) in the source spec.
    pub required: bool,
}

/// `normalized-field-path -> FieldEntry`, in field discovery order.
pub type FieldMap = IndexMap<String, FieldEntry>;

/// A single structural finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable code, e.g. `XML-002`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Field path the finding concerns, if any.
    pub field_path: Option<String>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_path {
            Some(path) => write!(f, "[{}] {} (field `{path}`)", self.code, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

fn finding(kind: ArtifactKind, number: u32, message: impl Into<String>, field_path: Option<String>) -> Finding {
    Finding {
        code: format!("{}-{number:03}", kind.code_prefix()),
        message: message.into(),
        field_path,
    }
}

fn xml_type_token(node: &FieldNode) -> String {
    if node.is_group_id_control() || node.is_occurrence_count_control() {
        return "StringConverter".to_string();
    }
    match &node.data_type {
        DataType::Numeric => "NumericConverter".to_string(),
        DataType::Textual => "StringConverter".to_string(),
        DataType::Amount => "AmountConverter".to_string(),
        DataType::Custom { .. } => "StringConverter".to_string(),
    }
}

fn pojo_type_token(node: &FieldNode) -> String {
    match &node.data_type {
        DataType::Textual | DataType::Custom { .. } => "String".to_string(),
        DataType::Amount => "java.math.BigDecimal".to_string(),
        DataType::Numeric => match node.byte_length {
            Some(len) if len <= 9 => "Integer".to_string(),
            Some(_) => "Long".to_string(),
            None => "Integer".to_string(),
        },
    }
}

fn openapi_type_token(node: &FieldNode) -> String {
    match &node.data_type {
        DataType::Textual | DataType::Custom { .. } => "string".to_string(),
        DataType::Amount => "number".to_string(),
        DataType::Numeric => "integer".to_string(),
    }
}

fn shape_of(node: &FieldNode) -> Shape {
    if node.is_array {
        Shape::Array
    } else if node.is_object {
        Shape::Object
    } else {
        Shape::Primitive
    }
}

fn build_field_map(
    tree: &IntermediateTree,
    direction: Direction,
    kind: ArtifactKind,
    keep_transitory: bool,
    type_token: fn(&FieldNode) -> String,
) -> (FieldMap, Vec<Finding>) {
    let mut map = FieldMap::new();
    let mut findings = Vec::new();
    let roots: Vec<&FieldNode> = tree.roots_for(direction).collect();
    walk(&roots, None, kind, keep_transitory, type_token, &mut map, &mut findings);

    if map.is_empty() {
        findings.push(finding(kind, 1, "artifact has no fields", None));
    }

    (map, findings)
}

fn walk(
    nodes: &[&FieldNode],
    prefix: Option<&str>,
    kind: ArtifactKind,
    keep_transitory: bool,
    type_token: fn(&FieldNode) -> String,
    map: &mut FieldMap,
    findings: &mut Vec<Finding>,
) {
    for node in nodes {
        let is_transitory = node.is_group_id_control() || node.is_occurrence_count_control();
        if is_transitory && !keep_transitory {
            continue;
        }

        let path = match prefix {
            Some(p) => format!("{p}.{}", node.normalized_name),
            None => node.normalized_name.clone(),
        };

        if !keep_transitory && (node.normalized_name == "groupId" || node.normalized_name == "occurrenceCount") {
            findings.push(finding(
                kind,
                2,
                format!("forbidden field name `{}`", node.normalized_name),
                Some(path.clone()),
            ));
        }

        if let Some(literal) = &node.enum_constraint {
            if literal.trim().is_empty() {
                findings.push(finding(kind, 3, "enum field carries no values", Some(path.clone())));
            }
        }

        map.insert(
            path.clone(),
            FieldEntry {
                declared_type: type_token(node),
                is_transitory,
                shape: shape_of(node),
                required: node.optionality.is_required(),
            },
        );

        if !node.is_leaf() {
            let children: Vec<&FieldNode> = node.children.iter().collect();
            walk(&children, Some(&path), kind, keep_transitory, type_token, map, findings);
        }
    }
}

/// Validate the XML bean projection for `direction`.
#[must_use]
pub fn validate_xml(tree: &IntermediateTree, direction: Direction) -> (FieldMap, Vec<Finding>) {
    build_field_map(tree, direction, ArtifactKind::Xml, true, xml_type_token)
}

/// Validate the POJO projection for `direction`.
#[must_use]
pub fn validate_pojo(tree: &IntermediateTree, direction: Direction) -> (FieldMap, Vec<Finding>) {
    build_field_map(tree, direction, ArtifactKind::Pojo, false, pojo_type_token)
}

/// Validate the OpenAPI projection for `direction`.
#[must_use]
pub fn validate_openapi(tree: &IntermediateTree, direction: Direction) -> (FieldMap, Vec<Finding>) {
    build_field_map(tree, direction, ArtifactKind::OpenApi, false, openapi_type_token)
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

    // -- 1. XML keeps transitory fields, POJO/OpenAPI drop them ------------

    #[test]
    fn xml_keeps_transitory_pojo_and_openapi_drop_it() {
        let mut group_id = leaf("groupId", DataType::Textual, 4);
        group_id.is_transitory = true;
        group_id.group_id = Some("G01".into());

        let tree = tree_with_request(vec![group_id, leaf("amount", DataType::Amount, 12)]);
        let (xml_map, _) = validate_xml(&tree, Direction::Outbound);
        let (pojo_map, _) = validate_pojo(&tree, Direction::Outbound);
        let (oa_map, _) = validate_openapi(&tree, Direction::Outbound);

        assert!(xml_map.contains_key("groupId"));
        assert!(!pojo_map.contains_key("groupId"));
        assert!(!oa_map.contains_key("groupId"));
    }

    // -- 2. Nested field paths use dot notation -----------------------------

    #[test]
    fn nested_object_field_path_uses_dot_notation() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with_request(vec![person]);
        let (map, _) = validate_pojo(&tree, Direction::Outbound);
        assert!(map.contains_key("person"));
        assert!(map.contains_key("person.name"));
    }

    // -- 3. Enum field with no values is a finding --------------------------

    #[test]
    fn empty_enum_constraint_is_flagged() {
        let mut status = leaf("status", DataType::Textual, 1);
        status.enum_constraint = Some("   ".into());
        let tree = tree_with_request(vec![status]);
        let (_, findings) = validate_pojo(&tree, Direction::Outbound);
        assert!(findings.iter().any(|f| f.code == "JB-003"));
    }

    // -- 4. Empty artifact is flagged ---------------------------------------

    #[test]
    fn empty_artifact_is_flagged() {
        let tree = tree_with_request(vec![]);
        let (_, findings) = validate_xml(&tree, Direction::Outbound);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "XML-001");
    }
}
