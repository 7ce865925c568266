//! XML Generator: Spring-style inbound/outbound bean definitions.
//!
//! Unlike the POJO and OpenAPI generators, this one is a pure projection
//! that keeps every field in [`IntermediateTree`] order, transitory
//! control fields included — the XML artifact is the only one that
//! still carries `groupId`/`occurrenceCount` control fields, since the
//! runtime bean reader needs them to parse/assemble the wire format.

#![warn(missing_docs)]

use msgforge_core::{DataType, Direction, FieldNode, IntermediateTree};
use msgforge_error::{ErrorCode, MsgforgeError};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::io::Cursor;

fn namespace(direction: Direction, config: &XmlConfig) -> String {
    match direction {
        Direction::Inbound => config.namespace_inbound.clone(),
        Direction::Outbound => config.namespace_outbound.clone(),
    }
}

fn bean_suffix(direction: Direction) -> &'static str {
    match direction {
        Direction::Inbound => "Response",
        Direction::Outbound => "Request",
    }
}

/// Configuration consumed by the XML generator (a projection of the
/// full run configuration's `xml.*` keys).
#[derive(Debug, Clone)]
pub struct XmlConfig {
    /// `xml.namespace.inbound`.
    pub namespace_inbound: String,
    /// `xml.namespace.outbound`.
    pub namespace_outbound: String,
    /// `xml.project.group-id`, used in `forType` composition.
    pub group_id: String,
    /// `xml.project.artifact-id`, used in `forType` composition.
    pub artifact_id: String,
}

/// Generate one Spring bean XML document for the given direction.
///
/// The request [`FieldGroup`](msgforge_core::FieldGroup) feeds the
/// outbound bean; the response group feeds the inbound bean. The
/// shared-header group, when non-empty, is prepended to both.
///
/// # Errors
///
/// Returns [`ErrorCode::GenerationProjectionViolation`] if the XML
/// writer fails (only possible on an internal invariant break, since
/// all text here is produced from already-validated IT content).
pub fn generate(
    tree: &IntermediateTree,
    direction: Direction,
    config: &XmlConfig,
) -> Result<String, MsgforgeError> {
    let roots: Vec<&FieldNode> = tree.roots_for(direction).collect();

    let bean_id = format!("{}{}", tree.metadata.operation_id, bean_suffix(direction));

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_xml(&mut writer, &roots, &bean_id, direction, config).map_err(xml_error)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| {
        MsgforgeError::new(
            ErrorCode::GenerationProjectionViolation,
            format!("XML output was not valid UTF-8: {e}"),
        )
    })
}

fn xml_error(e: quick_xml::Error) -> MsgforgeError {
    MsgforgeError::new(
        ErrorCode::GenerationProjectionViolation,
        format!("XML writer error: {e}"),
    )
}

fn write_xml(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    roots: &[&FieldNode],
    bean_id: &str,
    direction: Direction,
    config: &XmlConfig,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Decl(quick_xml::events::BytesDecl::new(
        "1.0",
        Some("UTF-8"),
        None,
    )))?;

    let mut beans_start = BytesStart::new("beans");
    beans_start.push_attribute(("xmlns", "http://www.springframework.org/schema/beans"));
    let msg_namespace = namespace(direction, config);
    beans_start.push_attribute(("xmlns:msg", msg_namespace.as_str()));
    writer.write_event(Event::Start(beans_start))?;

    let mut bean_start = BytesStart::new("bean");
    bean_start.push_attribute(("id", bean_id));
    bean_start.push_attribute((
        "class",
        format!("{}.{}.{}", config.group_id, config.artifact_id, bean_id).as_str(),
    ));
    writer.write_event(Event::Start(bean_start))?;

    write_fields_property(writer, roots, config)?;

    writer.write_event(Event::End(BytesEnd::new("bean")))?;
    writer.write_event(Event::End(BytesEnd::new("beans")))?;
    Ok(())
}

fn write_fields_property(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    nodes: &[&FieldNode],
    config: &XmlConfig,
) -> quick_xml::Result<()> {
    let mut prop = BytesStart::new("property");
    prop.push_attribute(("name", "fields"));
    writer.write_event(Event::Start(prop))?;
    writer.write_event(Event::Start(BytesStart::new("list")))?;
    for node in nodes {
        write_node(writer, node, config)?;
    }
    writer.write_event(Event::End(BytesEnd::new("list")))?;
    writer.write_event(Event::End(BytesEnd::new("property")))?;
    Ok(())
}

fn write_node(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    node: &FieldNode,
    config: &XmlConfig,
) -> quick_xml::Result<()> {
    if node.is_object {
        write_container(writer, node, config)
    } else {
        write_leaf(writer, node)
    }
}

fn for_type(config: &XmlConfig, class_name: &str) -> String {
    format!("{}.{}.{}", config.group_id, config.artifact_id, class_name)
}

fn write_container(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    node: &FieldNode,
    config: &XmlConfig,
) -> quick_xml::Result<()> {
    let class_name = node.class_name.as_deref().unwrap_or(&node.normalized_name);
    let bean_class = if node.is_array {
        "RepeatingField"
    } else {
        "CompositeField"
    };

    let mut start = BytesStart::new("bean");
    start.push_attribute(("class", bean_class));
    writer.write_event(Event::Start(start))?;

    write_value_property(writer, "name", &node.normalized_name)?;
    write_value_property(writer, "forType", &for_type(config, class_name))?;
    if node.is_array {
        write_value_property(writer, "fixedCount", &node.occurrence.fixed_count().to_string())?;
    }

    let children: Vec<&FieldNode> = node.children.iter().collect();
    write_fields_property(writer, &children, config)?;

    writer.write_event(Event::End(BytesEnd::new("bean")))?;
    Ok(())
}

fn write_leaf(writer: &mut Writer<Cursor<Vec<u8>>>, node: &FieldNode) -> quick_xml::Result<()> {
    let mut start = BytesStart::new("bean");
    start.push_attribute(("class", "DataField"));
    writer.write_event(Event::Start(start))?;

    write_value_property(writer, "name", &node.normalized_name)?;

    if node.is_group_id_control() {
        write_value_property(writer, "transitory", "true")?;
        write_value_property(writer, "default", node.group_id.as_deref().unwrap_or(""))?;
        write_value_property(writer, "converter", "StringConverter")?;
    } else if node.is_occurrence_count_control() {
        write_value_property(writer, "transitory", "true")?;
        write_value_property(writer, "default", &node.occurrence.fixed_count().to_string())?;
        write_value_property(writer, "align", "RIGHT")?;
        write_value_property(writer, "pad", "0")?;
        write_value_property(writer, "converter", "CounterConverter")?;
    } else {
        if let Some(len) = node.byte_length {
            write_value_property(writer, "length", &len.to_string())?;
        }
        let (align, pad, converter) = padding_rule(&node.data_type);
        write_value_property(writer, "align", align)?;
        write_value_property(writer, "pad", pad)?;
        write_value_property(writer, "converter", converter)?;
        if let Some(default) = &node.default_literal {
            write_value_property(writer, "default", default)?;
        }
        if let Some(hard_coded) = &node.hard_coded_literal {
            write_value_property(writer, "hardCoded", hard_coded)?;
        }
        if node.is_array {
            write_value_property(writer, "fixedCount", &node.occurrence.fixed_count().to_string())?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("bean")))?;
    Ok(())
}

fn padding_rule(data_type: &DataType) -> (&'static str, &'static str, &'static str) {
    match data_type {
        DataType::Numeric => ("RIGHT", "0", "NumericConverter"),
        DataType::Textual => ("LEFT", " ", "StringConverter"),
        DataType::Amount => ("RIGHT", "0", "AmountConverter"),
        DataType::Custom { .. } => ("LEFT", " ", "StringConverter"),
    }
}

fn write_value_property(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> quick_xml::Result<()> {
    let mut start = BytesStart::new("property");
    start.push_attribute(("name", name));
    start.push_attribute(("value", value));
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

/// Build the human-readable original-name → normalized-name rename
/// table for every field in shared-header, request, and response order.
/// Consumed by the CLI to emit `diff.md`.
#[must_use]
pub fn rename_table(tree: &IntermediateTree) -> Vec<(String, String)> {
    tree.walk_all()
        .map(|n| (n.original_name.clone(), n.normalized_name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgforge_core::{FieldGroup, Metadata, Occurrence, Optionality, Provenance};

    fn config() -> XmlConfig {
        XmlConfig {
            namespace_inbound: "urn:msg:inbound".into(),
            namespace_outbound: "urn:msg:outbound".into(),
            group_id: "com.example".into(),
            artifact_id: "msgs".into(),
        }
    }

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

    // -- 1. Leaf projection rules -------------------------------------------

    #[test]
    fn numeric_leaf_is_right_aligned_zero_padded() {
        let tree = tree_with_request(vec![leaf("limit", DataType::Numeric, 5)]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains(r#"name="align" value="RIGHT""#));
        assert!(xml.contains(r#"name="pad" value="0""#));
        assert!(xml.contains("NumericConverter"));
    }

    #[test]
    fn textual_leaf_is_left_aligned_space_padded() {
        let tree = tree_with_request(vec![leaf("name", DataType::Textual, 20)]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains(r#"name="align" value="LEFT""#));
        assert!(xml.contains("StringConverter"));
    }

    // -- 2. Container projection ----------------------------------------------

    #[test]
    fn object_container_emits_composite_field_with_for_type() {
        let mut container = leaf("person", DataType::Custom { name: "object".into() }, 0);
        container.is_object = true;
        container.class_name = Some("Person".into());
        container.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with_request(vec![container]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains("CompositeField"));
        assert!(xml.contains("com.example.msgs.Person"));
    }

    #[test]
    fn array_container_emits_repeating_field_with_fixed_count() {
        let mut container = leaf("items", DataType::Custom { name: "object".into() }, 0);
        container.is_object = true;
        container.is_array = true;
        container.class_name = Some("Item".into());
        container.occurrence = Occurrence { min: 0, max: 5 };
        container.children = vec![leaf("sku", DataType::Textual, 10)];

        let tree = tree_with_request(vec![container]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains("RepeatingField"));
        assert!(xml.contains(r#"name="fixedCount" value="5""#));
    }

    // -- 3. Transitory fields are preserved in XML ---------------------------

    #[test]
    fn group_id_control_field_is_transitory_with_default() {
        let mut node = leaf("groupId", DataType::Textual, 4);
        node.is_transitory = true;
        node.group_id = Some("G01".into());

        let tree = tree_with_request(vec![node]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains(r#"name="transitory" value="true""#));
        assert!(xml.contains(r#"name="default" value="G01""#));
    }

    #[test]
    fn occurrence_count_control_field_defaults_to_fixed_count() {
        let mut node = leaf("occurrenceCount", DataType::Numeric, 2);
        node.is_transitory = true;
        node.occurrence = Occurrence { min: 0, max: 9 };

        let tree = tree_with_request(vec![node]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(xml.contains(r#"name="default" value="9""#));
        assert!(xml.contains("CounterConverter"));
    }

    // -- 4. Order preservation -------------------------------------------------

    #[test]
    fn child_order_mirrors_it_order() {
        let tree = tree_with_request(vec![
            leaf("first", DataType::Textual, 1),
            leaf("second", DataType::Textual, 1),
            leaf("third", DataType::Textual, 1),
        ]);
        let xml = generate(&tree, Direction::Outbound, &config()).unwrap();
        let first_pos = xml.find("\"first\"").unwrap();
        let second_pos = xml.find("\"second\"").unwrap();
        let third_pos = xml.find("\"third\"").unwrap();
        assert!(first_pos < second_pos && second_pos < third_pos);
    }

    // -- 5. Rename table ---------------------------------------------------------

    #[test]
    fn rename_table_pairs_original_and_normalized_names() {
        let tree = tree_with_request(vec![leaf("create_application", DataType::Textual, 1)]);
        let table = rename_table(&tree);
        assert_eq!(table, vec![("create_application".to_string(), "create_application".to_string())]);
    }
}
