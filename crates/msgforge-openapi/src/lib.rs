//! OpenAPI Generator: one schema pair (`<OperationId>Request` /
//! `<OperationId>Response`) plus a nested schema per object container,
//! composed with `$ref`. Transitory control fields are dropped, the same
//! projection discipline as the POJO generator.
//!
//! Every map below is an [`IndexMap`], never a plain `HashMap`, so
//! emitted YAML preserves field order deterministically.

#![warn(missing_docs)]

use indexmap::IndexMap;
use msgforge_core::{DataType, FieldNode, IntermediateTree};
use msgforge_error::{ErrorCode, MsgforgeError};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// How nested schemas are laid out across files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Every schema lives under `components/schemas` in the single main
    /// document.
    None,
    /// One file per top-level message, bundling its entire nested
    /// schema closure.
    ByMessage,
    /// One file per individual object schema, cross-referenced by
    /// relative filename.
    ByObject,
}

/// Configuration consumed by the OpenAPI generator (a projection of the
/// full run configuration's `openapi.*` keys).
#[derive(Debug, Clone)]
pub struct OpenApiConfig {
    /// `openapi.version`, e.g. `"3.0.3"` or `"3.1.0"`.
    pub version: String,
    /// `openapi.split-strategy`.
    pub split_strategy: SplitStrategy,
}

/// The generated document set: a main `api.yaml` plus zero or more
/// split schema files, keyed by path relative to the `openapi/`
/// artifact directory.
#[derive(Debug, Clone)]
pub struct OpenApiOutput {
    /// Contents of `openapi/api.yaml`.
    pub main: String,
    /// Additional split files, e.g. `components/schemas/Person.yaml`.
    pub files: BTreeMap<String, String>,
}

/// Generate the full OpenAPI document set for one operation.
///
/// # Errors
///
/// Returns [`ErrorCode::GenerationProjectionViolation`] if a numeric
/// leaf has no declared byte length, or if YAML serialization fails
/// (only possible on an internal invariant break).
pub fn generate(tree: &IntermediateTree, config: &OpenApiConfig) -> Result<OpenApiOutput, MsgforgeError> {
    let mut registry: IndexMap<String, Value> = IndexMap::new();
    let mut deps: IndexMap<String, Vec<String>> = IndexMap::new();

    let base = class_case(&tree.metadata.operation_id);
    let request_name = format!("{base}Request");
    let response_name = format!("{base}Response");

    let request_fields: Vec<&FieldNode> = tree
        .shared_header
        .roots
        .iter()
        .chain(tree.request.roots.iter())
        .filter(|n| !n.is_transitory)
        .collect();
    let request_schema = build_schema(
        &request_name,
        request_fields.into_iter(),
        config,
        &mut registry,
        &mut deps,
    )?;
    registry.insert(request_name.clone(), request_schema);

    let response_fields: Vec<&FieldNode> = tree
        .shared_header
        .roots
        .iter()
        .chain(tree.response.roots.iter())
        .filter(|n| !n.is_transitory)
        .collect();
    let response_schema = build_schema(
        &response_name,
        response_fields.into_iter(),
        config,
        &mut registry,
        &mut deps,
    )?;
    registry.insert(response_name.clone(), response_schema);

    assemble(tree, config, &request_name, &response_name, &registry, &deps)
}

fn build_schema<'a>(
    owner_name: &str,
    fields: impl Iterator<Item = &'a FieldNode>,
    config: &OpenApiConfig,
    registry: &mut IndexMap<String, Value>,
    deps: &mut IndexMap<String, Vec<String>>,
) -> Result<Value, MsgforgeError> {
    let mut properties = IndexMap::new();
    let mut required = Vec::new();

    for field in fields {
        let class_name = field
            .class_name
            .clone()
            .unwrap_or_else(|| class_case(&field.normalized_name));

        let property = if field.is_object {
            if !registry.contains_key(&class_name) {
                let nested = build_schema(&class_name, field.children.iter(), config, registry, deps)?;
                registry.insert(class_name.clone(), nested);
            }
            deps.entry(owner_name.to_string())
                .or_default()
                .push(class_name.clone());
            let reference = ref_value(config.split_strategy, &class_name);
            if field.is_array {
                wrap_array(reference, field)
            } else {
                reference
            }
        } else {
            let scalar = primitive_schema(field, config)?;
            if field.is_array {
                wrap_array(scalar, field)
            } else {
                scalar
            }
        };

        properties.insert(field.normalized_name.clone(), property);
        if field.optionality.is_required() {
            required.push(Value::String(field.normalized_name.clone()));
        }
    }

    let mut map = IndexMap::new();
    map.insert("type".to_string(), Value::String("object".to_string()));
    map.insert(
        "properties".to_string(),
        serde_yaml::to_value(&properties).map_err(yaml_error)?,
    );
    if !required.is_empty() {
        map.insert("required".to_string(), Value::Sequence(required));
    }
    serde_yaml::to_value(&map).map_err(yaml_error)
}

fn primitive_schema(field: &FieldNode, config: &OpenApiConfig) -> Result<Value, MsgforgeError> {
    let mut map = IndexMap::new();
    match &field.data_type {
        DataType::Textual | DataType::Custom { .. } => {
            map.insert("type".to_string(), Value::String("string".to_string()));
        }
        DataType::Amount => {
            map.insert("type".to_string(), Value::String("number".to_string()));
            map.insert("format".to_string(), Value::String("double".to_string()));
        }
        DataType::Numeric => {
            field.byte_length.ok_or_else(|| {
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
            map.insert("type".to_string(), Value::String("integer".to_string()));
        }
    }
    apply_nullable(&mut map, field.optionality.is_required(), &config.version);
    serde_yaml::to_value(&map).map_err(yaml_error)
}

fn apply_nullable(map: &mut IndexMap<String, Value>, required: bool, version: &str) {
    if required {
        return;
    }
    if version.starts_with("3.0") {
        map.insert("nullable".to_string(), Value::Bool(true));
    } else if let Some(Value::String(ty)) = map.get("type").cloned() {
        map.insert(
            "type".to_string(),
            Value::Sequence(vec![Value::String(ty), Value::String("null".to_string())]),
        );
    }
}

fn wrap_array(items: Value, field: &FieldNode) -> Value {
    let mut map = IndexMap::new();
    map.insert("type".to_string(), Value::String("array".to_string()));
    map.insert("items".to_string(), items);
    map.insert(
        "maxItems".to_string(),
        Value::Number(field.occurrence.fixed_count().into()),
    );
    serde_yaml::to_value(&map).expect("array wrapper serializes")
}

fn ref_value(strategy: SplitStrategy, target: &str) -> Value {
    let mut map = IndexMap::new();
    let path = match strategy {
        SplitStrategy::ByObject => format!("{target}.yaml"),
        SplitStrategy::None | SplitStrategy::ByMessage => format!("#/components/schemas/{target}"),
    };
    map.insert("$ref".to_string(), Value::String(path));
    serde_yaml::to_value(&map).expect("ref mapping serializes")
}

fn message_ref(strategy: SplitStrategy, name: &str) -> Value {
    let mut map = IndexMap::new();
    let path = match strategy {
        SplitStrategy::None => format!("#/components/schemas/{name}"),
        SplitStrategy::ByMessage => format!("./components/{name}.yaml"),
        SplitStrategy::ByObject => format!("./components/schemas/{name}.yaml"),
    };
    map.insert("$ref".to_string(), Value::String(path));
    serde_yaml::to_value(&map).expect("ref mapping serializes")
}

fn collect_closure(start: &str, deps: &IndexMap<String, Vec<String>>, seen: &mut BTreeSet<String>, out: &mut Vec<String>) {
    if !seen.insert(start.to_string()) {
        return;
    }
    out.push(start.to_string());
    if let Some(children) = deps.get(start) {
        for child in children {
            collect_closure(child, deps, seen, out);
        }
    }
}

fn assemble(
    tree: &IntermediateTree,
    config: &OpenApiConfig,
    request_name: &str,
    response_name: &str,
    registry: &IndexMap<String, Value>,
    deps: &IndexMap<String, Vec<String>>,
) -> Result<OpenApiOutput, MsgforgeError> {
    let kebab = kebab_case(&tree.metadata.operation_id);

    let mut request_media = IndexMap::new();
    request_media.insert("schema".to_string(), message_ref(config.split_strategy, request_name));
    let mut request_content = IndexMap::new();
    request_content.insert("application/json".to_string(), request_media);
    let mut request_body_wrapper = IndexMap::new();
    request_body_wrapper.insert(
        "content".to_string(),
        serde_yaml::to_value(&request_content).map_err(yaml_error)?,
    );

    let mut response_media = IndexMap::new();
    response_media.insert("schema".to_string(), message_ref(config.split_strategy, response_name));
    let mut response_content = IndexMap::new();
    response_content.insert("application/json".to_string(), response_media);
    let mut response_body = IndexMap::new();
    response_body.insert("description".to_string(), Value::String("Success".to_string()));
    response_body.insert("content".to_string(), serde_yaml::to_value(&response_content).map_err(yaml_error)?);

    let mut responses = IndexMap::new();
    responses.insert("200".to_string(), serde_yaml::to_value(&response_body).map_err(yaml_error)?);

    let mut post = IndexMap::new();
    post.insert("operationId".to_string(), Value::String(tree.metadata.operation_id.clone()));
    if let Some(desc) = &tree.metadata.description {
        post.insert("description".to_string(), Value::String(desc.clone()));
    }
    post.insert("requestBody".to_string(), serde_yaml::to_value(&request_body_wrapper).map_err(yaml_error)?);
    post.insert("responses".to_string(), serde_yaml::to_value(&responses).map_err(yaml_error)?);

    let mut path_item = IndexMap::new();
    path_item.insert("post".to_string(), serde_yaml::to_value(&post).map_err(yaml_error)?);

    let mut paths = IndexMap::new();
    paths.insert(format!("/{kebab}"), path_item);

    let mut info = IndexMap::new();
    info.insert("title".to_string(), Value::String(tree.metadata.operation_id.clone()));
    info.insert(
        "version".to_string(),
        Value::String(tree.metadata.version.clone().unwrap_or_else(|| "1".to_string())),
    );

    let mut main = IndexMap::new();
    main.insert("openapi".to_string(), Value::String(config.version.clone()));
    main.insert("info".to_string(), serde_yaml::to_value(&info).map_err(yaml_error)?);
    main.insert("paths".to_string(), serde_yaml::to_value(&paths).map_err(yaml_error)?);

    let mut files = BTreeMap::new();

    match config.split_strategy {
        SplitStrategy::None => {
            let mut components = IndexMap::new();
            components.insert("schemas".to_string(), serde_yaml::to_value(registry).map_err(yaml_error)?);
            main.insert("components".to_string(), serde_yaml::to_value(&components).map_err(yaml_error)?);
        }
        SplitStrategy::ByMessage => {
            for message_name in [request_name, response_name] {
                let mut seen = BTreeSet::new();
                let mut closure = Vec::new();
                collect_closure(message_name, deps, &mut seen, &mut closure);

                let mut schemas = IndexMap::new();
                for name in &closure {
                    if let Some(schema) = registry.get(name) {
                        schemas.insert(name.clone(), schema.clone());
                    }
                }
                let mut components = IndexMap::new();
                components.insert("schemas".to_string(), serde_yaml::to_value(&schemas).map_err(yaml_error)?);
                let mut file = IndexMap::new();
                file.insert("components".to_string(), serde_yaml::to_value(&components).map_err(yaml_error)?);
                files.insert(
                    format!("components/{message_name}.yaml"),
                    serde_yaml::to_string(&file).map_err(yaml_error)?,
                );
            }
        }
        SplitStrategy::ByObject => {
            for (name, schema) in registry {
                files.insert(
                    format!("components/schemas/{name}.yaml"),
                    serde_yaml::to_string(schema).map_err(yaml_error)?,
                );
            }
        }
    }

    let main_text = serde_yaml::to_string(&main).map_err(yaml_error)?;
    Ok(OpenApiOutput { main: main_text, files })
}

fn yaml_error(e: serde_yaml::Error) -> MsgforgeError {
    MsgforgeError::new(ErrorCode::GenerationProjectionViolation, format!("YAML encoding failed: {e}"))
}

fn class_case(normalized: &str) -> String {
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// `kebab-case` form of a camelCase operation id, used for the generated
/// path (`/create-application`).
fn kebab_case(operation_id: &str) -> String {
    let mut out = String::new();
    for (i, ch) in operation_id.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgforge_core::{FieldGroup, Metadata, Occurrence, Optionality, Provenance};

    fn config(strategy: SplitStrategy) -> OpenApiConfig {
        OpenApiConfig {
            version: "3.0.3".to_string(),
            split_strategy: strategy,
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

    fn tree_with(request: Vec<FieldNode>, response: Vec<FieldNode>) -> IntermediateTree {
        IntermediateTree::new(
            Metadata {
                operation_name: None,
                operation_id: "createApplication".into(),
                version: Some("2".into()),
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
            FieldGroup { roots: request },
            FieldGroup { roots: response },
        )
    }

    // -- 1. Transitory fields dropped ------------------------------------

    #[test]
    fn transitory_field_is_dropped() {
        let mut group_id = leaf("groupId", DataType::Textual, 4);
        group_id.is_transitory = true;
        let tree = tree_with(vec![group_id, leaf("amount", DataType::Amount, 12)], vec![]);
        let out = generate(&tree, &config(SplitStrategy::None)).unwrap();
        let schemas = out.main.clone() + &out.files.values().cloned().collect::<String>();
        assert!(!schemas.contains("groupId"));
    }

    // -- 2. Path and operation id ------------------------------------------

    #[test]
    fn path_uses_kebab_case_operation_id() {
        let tree = tree_with(vec![leaf("amount", DataType::Amount, 12)], vec![]);
        let out = generate(&tree, &config(SplitStrategy::None)).unwrap();
        assert!(out.main.contains("/create-application"));
        assert!(out.main.contains("operationId: createApplication"));
    }

    // -- 3. Required list from optionality ---------------------------------

    #[test]
    fn required_field_is_listed_optional_is_nullable() {
        let mut optional = leaf("nickname", DataType::Textual, 10);
        optional.optionality = Optionality::Optional;
        let tree = tree_with(vec![leaf("amount", DataType::Amount, 12), optional], vec![]);
        let out = generate(&tree, &config(SplitStrategy::None)).unwrap();
        assert!(out.main.contains("required"));
        assert!(out.main.contains("nullable: true"));
    }

    // -- 4. Nested object ref composition -----------------------------------

    #[test]
    fn object_container_is_ref_composed() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.class_name = Some("Person".into());
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with(vec![person], vec![]);
        let out = generate(&tree, &config(SplitStrategy::None)).unwrap();
        assert!(out.main.contains("#/components/schemas/Person"));
        assert!(out.main.contains("Person:"));
    }

    // -- 5. Array field carries maxItems -------------------------------------

    #[test]
    fn array_of_object_carries_max_items() {
        let mut items = leaf("items", DataType::Custom { name: "object".into() }, 0);
        items.is_object = true;
        items.is_array = true;
        items.class_name = Some("Item".into());
        items.occurrence = Occurrence { min: 0, max: 5 };
        items.children = vec![leaf("sku", DataType::Textual, 10)];

        let tree = tree_with(vec![items], vec![]);
        let out = generate(&tree, &config(SplitStrategy::None)).unwrap();
        assert!(out.main.contains("maxItems: 5"));
    }

    // -- 6. Split strategies produce separate files --------------------------

    #[test]
    fn by_object_strategy_emits_one_file_per_class() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.class_name = Some("Person".into());
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with(vec![person], vec![]);
        let out = generate(&tree, &config(SplitStrategy::ByObject)).unwrap();
        assert!(out.files.contains_key("components/schemas/Person.yaml"));
        assert!(out.files.contains_key("components/schemas/CreateApplicationRequest.yaml"));
        assert!(out.main.contains("./components/schemas/CreateApplicationRequest.yaml"));
    }

    #[test]
    fn by_message_strategy_bundles_nested_closure_per_message() {
        let mut person = leaf("person", DataType::Custom { name: "object".into() }, 0);
        person.is_object = true;
        person.class_name = Some("Person".into());
        person.children = vec![leaf("name", DataType::Textual, 20)];

        let tree = tree_with(vec![person], vec![]);
        let out = generate(&tree, &config(SplitStrategy::ByMessage)).unwrap();
        let request_file = &out.files["components/CreateApplicationRequest.yaml"];
        assert!(request_file.contains("Person"));
        assert!(request_file.contains("CreateApplicationRequest"));
    }

    // -- 7. 3.1.0 nullability uses type arrays instead of `nullable` --------

    #[test]
    fn openapi_310_uses_type_array_for_nullable() {
        let mut optional = leaf("nickname", DataType::Textual, 10);
        optional.optionality = Optionality::Optional;
        let tree = tree_with(vec![optional], vec![]);
        let cfg = OpenApiConfig {
            version: "3.1.0".to_string(),
            split_strategy: SplitStrategy::None,
        };
        let out = generate(&tree, &cfg).unwrap();
        assert!(!out.main.contains("nullable"));
        assert!(out.main.contains("- null"));
    }

    // -- 8. Missing numeric length is an error -------------------------------

    #[test]
    fn numeric_field_without_length_is_an_error() {
        let mut field = leaf("amount", DataType::Numeric, 0);
        field.byte_length = None;
        let tree = tree_with(vec![field], vec![]);
        let err = generate(&tree, &config(SplitStrategy::None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::GenerationProjectionViolation);
    }
}
