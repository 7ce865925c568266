//! POJO Generator: one top-level class per direction, nested classes per
//! object/array container, transitory control fields dropped entirely.
//!
//! Unlike the XML generator, the POJO and OpenAPI generators share a
//! projection discipline: neither ever emits a `groupId` or
//! `occurrenceCount` control field, at any nesting depth.

#![warn(missing_docs)]

use msgforge_core::{DataType, Direction, FieldNode, IntermediateTree};
use msgforge_error::{ErrorCode, MsgforgeError};
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn suffix(direction: Direction) -> &'static str {
    match direction {
        Direction::Inbound => "Response",
        Direction::Outbound => "Request",
    }
}

/// Configuration consumed by the POJO generator (a projection of the
/// full run configuration's `java.*` keys).
#[derive(Debug, Clone)]
pub struct JavaConfig {
    /// `java.package-name`.
    pub package_name: String,
    /// `java.use-lombok`; when `true`, classes carry `@Data` instead of
    /// hand-written getters/setters.
    pub use_lombok: bool,
}

/// Generate the top-level class and every nested class reachable from
/// it, keyed by class name.
///
/// # Errors
///
/// Returns [`ErrorCode::GenerationProjectionViolation`] if a numeric
/// leaf is missing its declared byte length (needed to pick an integer
/// width).
pub fn generate(
    tree: &IntermediateTree,
    direction: Direction,
    config: &JavaConfig,
) -> Result<BTreeMap<String, String>, MsgforgeError> {
    let roots: Vec<&FieldNode> = tree
        .roots_for(direction)
        .filter(|n| !n.is_transitory)
        .collect();

    let class_name = format!("{}{}", class_case(&tree.metadata.operation_id), suffix(direction));

    let mut files = BTreeMap::new();
    emit_class(&class_name, &roots, config, &mut files)?;
    Ok(files)
}

fn emit_class(
    class_name: &str,
    fields: &[&FieldNode],
    config: &JavaConfig,
    files: &mut BTreeMap<String, String>,
) -> Result<(), MsgforgeError> {
    let mut src = String::new();
    writeln!(src, "package {};", config.package_name).unwrap();
    writeln!(src).unwrap();
    if config.use_lombok {
        writeln!(src, "import lombok.Data;").unwrap();
        writeln!(src).unwrap();
        writeln!(src, "@Data").unwrap();
    }
    writeln!(src, "public class {class_name} {{").unwrap();

    for field in fields {
        if field.is_transitory {
            continue;
        }
        emit_field_member(&mut src, field, config)?;
        if let Some(enum_literal) = &field.enum_constraint {
            emit_enum(&mut src, field, enum_literal)?;
        }
        if field.is_object {
            let nested_class = field.class_name.clone().unwrap_or_else(|| class_case(&field.normalized_name));
            let children: Vec<&FieldNode> =
                field.children.iter().filter(|c| !c.is_transitory).collect();
            emit_class(&nested_class, &children, config, files)?;
        }
    }

    if !config.use_lombok {
        emit_accessors(&mut src, fields);
    }

    writeln!(src, "}}").unwrap();
    files.insert(class_name.to_string(), src);
    Ok(())
}

fn emit_field_member(
    src: &mut String,
    field: &FieldNode,
    _config: &JavaConfig,
) -> Result<(), MsgforgeError> {
    writeln!(src, "    /**").unwrap();
    writeln!(src, "     * Original name: {}", field.original_name).unwrap();
    writeln!(
        src,
        "     * Source: {}:{}",
        field.provenance.sheet, field.provenance.row
    )
    .unwrap();
    writeln!(src, "     */").unwrap();

    let java_type = java_type_for(field)?;
    if field.is_array {
        writeln!(src, "    private java.util.List<{java_type}> {};", field.normalized_name).unwrap();
    } else {
        writeln!(src, "    private {java_type} {};", field.normalized_name).unwrap();
    }
    Ok(())
}

fn java_type_for(field: &FieldNode) -> Result<String, MsgforgeError> {
    if field.is_object {
        return Ok(field
            .class_name
            .clone()
            .unwrap_or_else(|| class_case(&field.normalized_name)));
    }
    if field.enum_constraint.is_some() {
        return Ok(class_case(&field.normalized_name));
    }
    Ok(match &field.data_type {
        DataType::Textual => "String".to_string(),
        DataType::Amount => "java.math.BigDecimal".to_string(),
        DataType::Numeric => integer_type_for_length(field)?,
        DataType::Custom { .. } => "String".to_string(),
    })
}

fn integer_type_for_length(field: &FieldNode) -> Result<String, MsgforgeError> {
    let len = field.byte_length.ok_or_else(|| {
        MsgforgeError::new(
            ErrorCode::GenerationProjectionViolation,
            format!(
                "numeric field `{}` has no declared byte length",
                field.normalized_name
            ),
        )
        .with_context("sheet", &field.provenance.sheet)
        .with_context("row", field.provenance.row)
    })?;
    Ok(if len <= 9 {
        "Integer".to_string()
    } else if len <= 18 {
        "Long".to_string()
    } else {
        "java.math.BigInteger".to_string()
    })
}

fn emit_accessors(src: &mut String, fields: &[&FieldNode]) {
    for field in fields {
        if field.is_transitory {
            continue;
        }
        let Ok(java_type) = java_type_for(field) else {
            continue;
        };
        let java_type = if field.is_array {
            format!("java.util.List<{java_type}>")
        } else {
            java_type
        };
        let cap = class_case(&field.normalized_name);
        writeln!(
            src,
            "    public {java_type} get{cap}() {{ return {}; }}",
            field.normalized_name
        )
        .unwrap();
        writeln!(
            src,
            "    public void set{cap}({java_type} value) {{ this.{} = value; }}",
            field.normalized_name
        )
        .unwrap();
    }
}

/// Emit a nested enum plus the four helper methods `{from-code,
/// is-valid, get-code, get-description}` for a field carrying an
/// `enum_constraint` literal (`|`-delimited `code:description` pairs,
/// falling back to `,`-delimited bare codes with the code reused as
/// the description).
fn emit_enum(src: &mut String, field: &FieldNode, literal: &str) -> Result<(), MsgforgeError> {
    let entries = parse_enum_literal(literal);
    if entries.is_empty() {
        return Err(MsgforgeError::new(
            ErrorCode::GenerationProjectionViolation,
            format!("enum field `{}` has no values", field.normalized_name),
        ));
    }

    let enum_name = class_case(&field.normalized_name);
    writeln!(src, "    public enum {enum_name} {{").unwrap();
    for (i, (code, desc)) in entries.iter().enumerate() {
        let sep = if i + 1 == entries.len() { ";" } else { "," };
        writeln!(src, "        {}(\"{code}\", \"{desc}\"){sep}", enum_const_name(code)).unwrap();
    }
    writeln!(src).unwrap();
    writeln!(src, "        private final String code;").unwrap();
    writeln!(src, "        private final String description;").unwrap();
    writeln!(src).unwrap();
    writeln!(
        src,
        "        {enum_name}(String code, String description) {{ this.code = code; this.description = description; }}"
    )
    .unwrap();
    writeln!(src).unwrap();
    writeln!(src, "        public String getCode() {{ return code; }}").unwrap();
    writeln!(src, "        public String getDescription() {{ return description; }}").unwrap();
    writeln!(src).unwrap();
    writeln!(
        src,
        "        public static {enum_name} fromCode(String code) {{"
    )
    .unwrap();
    writeln!(src, "            for ({enum_name} v : values()) {{").unwrap();
    writeln!(src, "                if (v.code.equals(code)) return v;").unwrap();
    writeln!(src, "            }}").unwrap();
    writeln!(
        src,
        "            throw new IllegalArgumentException(\"unknown code: \" + code);"
    )
    .unwrap();
    writeln!(src, "        }}").unwrap();
    writeln!(src).unwrap();
    writeln!(src, "        public static boolean isValid(String code) {{").unwrap();
    writeln!(src, "            for ({enum_name} v : values()) {{").unwrap();
    writeln!(src, "                if (v.code.equals(code)) return true;").unwrap();
    writeln!(src, "            }}").unwrap();
    writeln!(src, "            return false;").unwrap();
    writeln!(src, "        }}").unwrap();
    writeln!(src, "    }}").unwrap();
    Ok(())
}

fn parse_enum_literal(literal: &str) -> Vec<(String, String)> {
    let pairs: Vec<&str> = if literal.contains('|') {
        literal.split('|').collect()
    } else {
        literal.split(',').collect()
    };
    pairs
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((code, desc)) => (code.trim().to_string(), desc.trim().to_string()),
            None => (entry.to_string(), entry.to_string()),
        })
        .collect()
}

fn enum_const_name(code: &str) -> String {
    let upper: String = code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if upper.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        format!("_{upper}")
    } else {
        upper
    }
}

/// `Initial-Cap` form of a normalized (camelCase) name, for class names
/// and accessor method names.
fn class_case(normalized: &str) -> String {
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgforge_core::{FieldGroup, Metadata, Occurrence, Optionality, Provenance};

    fn config() -> JavaConfig {
        JavaConfig {
            package_name: "com.example.msgs".into(),
            use_lombok: false,
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

    // -- 1. Transitory fields dropped entirely -------------------------------

    #[test]
    fn transitory_fields_are_dropped() {
        let mut group_id = leaf("groupId", DataType::Textual, 4);
        group_id.is_transitory = true;
        group_id.group_id = Some("G01".into());

        let tree = tree_with_request(vec![group_id, leaf("amount", DataType::Amount, 12)]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(!top.contains("groupId"));
        assert!(top.contains("amount"));
    }

    // -- 2. Type mapping -------------------------------------------------------

    #[test]
    fn textual_maps_to_string_amount_to_bigdecimal() {
        let tree = tree_with_request(vec![
            leaf("name", DataType::Textual, 20),
            leaf("price", DataType::Amount, 12),
        ]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(top.contains("private String name;"));
        assert!(top.contains("private java.math.BigDecimal price;"));
    }

    #[test]
    fn short_numeric_maps_to_integer_long_numeric_to_long() {
        let tree = tree_with_request(vec![
            leaf("shortNum", DataType::Numeric, 5),
            leaf("longNum", DataType::Numeric, 15),
        ]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(top.contains("private Integer shortNum;"));
        assert!(top.contains("private Long longNum;"));
    }

    // -- 3. Nested classes -----------------------------------------------------

    #[test]
    fn object_container_emits_nested_class_file() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.class_name = Some("Person".into());
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with_request(vec![person]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        assert!(files.contains_key("Person"));
        assert!(files["Person"].contains("private String name;"));
    }

    #[test]
    fn array_of_object_emits_list_of_nested_type() {
        let mut items = leaf("items", DataType::Custom { name: "object".into() }, 0);
        items.is_object = true;
        items.is_array = true;
        items.class_name = Some("Item".into());
        items.occurrence = Occurrence { min: 0, max: 5 };
        items.children = vec![leaf("sku", DataType::Textual, 10)];

        let tree = tree_with_request(vec![items]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(top.contains("private java.util.List<Item> items;"));
    }

    // -- 4. Enum expansion -------------------------------------------------------

    #[test]
    fn enum_constraint_expands_to_sum_type_with_four_helpers() {
        let mut status = leaf("status", DataType::Textual, 1);
        status.enum_constraint = Some("A:Active|I:Inactive".into());

        let tree = tree_with_request(vec![status]);
        let files = generate(&tree, Direction::Outbound, &config()).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(top.contains("public enum Status"));
        assert!(top.contains("fromCode"));
        assert!(top.contains("isValid"));
        assert!(top.contains("getCode"));
        assert!(top.contains("getDescription"));
        assert!(top.contains("ACTIVE(\"A\", \"Active\")"));
    }

    // -- 5. Lombok mode skips hand-written accessors ---------------------------

    #[test]
    fn lombok_mode_omits_getters_and_setters() {
        let tree = tree_with_request(vec![leaf("name", DataType::Textual, 10)]);
        let cfg = JavaConfig {
            package_name: "com.example".into(),
            use_lombok: true,
        };
        let files = generate(&tree, Direction::Outbound, &cfg).unwrap();
        let top = &files["CreateApplicationRequest"];
        assert!(top.contains("@Data"));
        assert!(!top.contains("public String getName()"));
    }

    // -- 6. Missing byte length on numeric field is an error -------------------

    #[test]
    fn numeric_field_without_length_is_an_error() {
        let mut field = leaf("amount", DataType::Numeric, 0);
        field.byte_length = None;
        let tree = tree_with_request(vec![field]);
        let err = generate(&tree, Direction::Outbound, &config()).unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationProjectionViolation);
    }
}
