//! Cross-artifact consistency validator.
//!
//! Consumes the three per-artifact field-maps produced by
//! [`crate::per_artifact`] and checks presence, type, shape, and
//! required-flag agreement over the union of field-paths, in sorted
//! order for deterministic reporting.

use crate::per_artifact::{FieldMap, Shape};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Escalation policy for the soft checks (P0-2 unmapped type, P0-4
/// required-flag disagreement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyMode {
    /// Soft checks escalate to errors.
    Strict,
    /// Soft checks stay warnings.
    Lenient,
}

/// Severity of a single [`ConsistencyIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fails the commit gate.
    Error,
    /// Reported but does not fail the commit gate.
    Warning,
}

/// The type family a declared-type token resolves to, shared across
/// all three artifact lexicons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    /// Numeric (int/long/integer/converter) family.
    Numeric,
    /// Textual (string) family.
    Textual,
    /// Amount/currency (decimal/number) family.
    Amount,
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Numeric => "numeric",
            Self::Textual => "textual",
            Self::Amount => "amount",
        };
        f.write_str(s)
    }
}

/// Declared-type-token → canonical-type lookup table, shared across the
/// three artifact lexicons (`validation.consistency.type-mapping-rules`).
#[derive(Debug, Clone)]
pub struct TypeMappingRules(BTreeMap<String, CanonicalType>);

impl TypeMappingRules {
    /// The built-in table covering every token the three generators
    /// emit.
    #[must_use]
    pub fn built_in() -> Self {
        let mut map = BTreeMap::new();
        for (token, ty) in [
            ("NumericConverter", CanonicalType::Numeric),
            ("StringConverter", CanonicalType::Textual),
            ("AmountConverter", CanonicalType::Amount),
            ("CounterConverter", CanonicalType::Numeric),
            ("Integer", CanonicalType::Numeric),
            ("Long", CanonicalType::Numeric),
            ("java.math.BigInteger", CanonicalType::Numeric),
            ("String", CanonicalType::Textual),
            ("java.math.BigDecimal", CanonicalType::Amount),
            ("integer", CanonicalType::Numeric),
            ("string", CanonicalType::Textual),
            ("number", CanonicalType::Amount),
        ] {
            map.insert(token.to_string(), ty);
        }
        Self(map)
    }

    /// Resolve a declared-type token to its canonical family, or `None`
    /// if the token is not recognized.
    #[must_use]
    pub fn resolve(&self, declared_type: &str) -> Option<CanonicalType> {
        self.0.get(declared_type).copied()
    }

    /// Add or overwrite an entry.
    pub fn insert(&mut self, token: impl Into<String>, ty: CanonicalType) {
        self.0.insert(token.into(), ty);
    }
}

impl Default for TypeMappingRules {
    fn default() -> Self {
        Self::built_in()
    }
}

/// One P0-rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyIssue {
    /// `P0-1` .. `P0-4`.
    pub rule: &'static str,
    /// Field path the issue concerns.
    pub field_path: String,
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

/// The accumulated result of one consistency pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyResult {
    /// Every issue found, in field-path sorted order.
    pub issues: Vec<ConsistencyIssue>,
}

impl ConsistencyResult {
    /// `true` when no issue has [`Severity::Error`].
    #[must_use]
    pub fn passes(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i.severity, Severity::Error))
    }
}

fn relevant_paths(xml: &FieldMap, pojo: &FieldMap, openapi: &FieldMap, ignore_fields: &BTreeSet<String>) -> BTreeSet<String> {
    let mut paths: BTreeSet<String> = BTreeSet::new();
    paths.extend(xml.keys().cloned());
    paths.extend(pojo.keys().cloned());
    paths.extend(openapi.keys().cloned());
    paths.retain(|p| !ignore_fields.contains(p));
    paths.retain(|p| !xml.get(p).is_some_and(|e| e.is_transitory));
    paths
}

/// Check presence, type, shape, and required-flag agreement across the
/// three field-maps, for the union of field-paths (minus
/// `ignore_fields` and XML-only transitory names).
#[must_use]
pub fn check_consistency(
    xml: &FieldMap,
    pojo: &FieldMap,
    openapi: &FieldMap,
    mapping: &TypeMappingRules,
    mode: ConsistencyMode,
    ignore_fields: &BTreeSet<String>,
) -> ConsistencyResult {
    let mut issues = Vec::new();

    for path in relevant_paths(xml, pojo, openapi, ignore_fields) {
        let entries = [xml.get(&path), pojo.get(&path), openapi.get(&path)];
        let present: Vec<_> = entries.iter().flatten().collect();

        // P0-1: presence.
        if present.len() < entries.len() {
            issues.push(ConsistencyIssue {
                rule: "P0-1",
                field_path: path.clone(),
                severity: Severity::Error,
                message: "field missing from at least one artifact".to_string(),
            });
            continue;
        }

        // P0-2: canonical type agreement.
        let canonical: Vec<Option<CanonicalType>> = present.iter().map(|e| mapping.resolve(&e.declared_type)).collect();
        if canonical.iter().any(Option::is_none) {
            issues.push(ConsistencyIssue {
                rule: "P0-2",
                field_path: path.clone(),
                severity: if mode == ConsistencyMode::Strict { Severity::Error } else { Severity::Warning },
                message: "declared type does not resolve under the canonical type mapping".to_string(),
            });
        } else if !all_equal(canonical.iter().flatten()) {
            issues.push(ConsistencyIssue {
                rule: "P0-2",
                field_path: path.clone(),
                severity: Severity::Error,
                message: "canonical types disagree across artifacts".to_string(),
            });
        }

        // P0-3: shape agreement.
        let shapes: Vec<Shape> = present.iter().map(|e| e.shape).collect();
        if !all_equal(shapes.iter()) {
            issues.push(ConsistencyIssue {
                rule: "P0-3",
                field_path: path.clone(),
                severity: Severity::Error,
                message: "field shape disagrees across artifacts".to_string(),
            });
        }

        // P0-4: required-flag agreement.
        let required: Vec<bool> = present.iter().map(|e| e.required).collect();
        if !all_equal(required.iter()) {
            issues.push(ConsistencyIssue {
                rule: "P0-4",
                field_path: path.clone(),
                severity: if mode == ConsistencyMode::Strict { Severity::Error } else { Severity::Warning },
                message: "required flag disagrees across artifacts".to_string(),
            });
        }
    }

    ConsistencyResult { issues }
}

fn all_equal<T: PartialEq>(mut it: impl Iterator<Item = T>) -> bool {
    match it.next() {
        Some(first) => it.all(|x| x == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per_artifact::FieldEntry;

    fn entry(declared_type: &str, shape: Shape, required: bool) -> FieldEntry {
        FieldEntry {
            declared_type: declared_type.to_string(),
            is_transitory: false,
            shape,
            required,
        }
    }

    // -- 1. Fully consistent maps pass ---------------------------------------

    #[test]
    fn consistent_maps_produce_no_issues() {
        let mut xml = FieldMap::new();
        xml.insert("amount".to_string(), entry("AmountConverter", Shape::Primitive, true));
        let mut pojo = FieldMap::new();
        pojo.insert("amount".to_string(), entry("java.math.BigDecimal", Shape::Primitive, true));
        let mut oa = FieldMap::new();
        oa.insert("amount".to_string(), entry("number", Shape::Primitive, true));

        let result = check_consistency(
            &xml,
            &pojo,
            &oa,
            &TypeMappingRules::built_in(),
            ConsistencyMode::Strict,
            &BTreeSet::new(),
        );
        assert!(result.passes());
        assert!(result.issues.is_empty());
    }

    // -- 2. Type and required mismatch yields exactly two issues -------------

    #[test]
    fn type_and_required_mismatch_yields_two_issues() {
        let mut xml = FieldMap::new();
        xml.insert("name".to_string(), entry("StringConverter", Shape::Primitive, true));
        let mut pojo = FieldMap::new();
        pojo.insert("name".to_string(), entry("Integer", Shape::Primitive, false));
        let mut oa = FieldMap::new();
        oa.insert("name".to_string(), entry("string", Shape::Primitive, true));

        let result = check_consistency(
            &xml,
            &pojo,
            &oa,
            &TypeMappingRules::built_in(),
            ConsistencyMode::Strict,
            &BTreeSet::new(),
        );
        assert_eq!(result.issues.len(), 2);
        assert!(result.issues.iter().any(|i| i.rule == "P0-2"));
        assert!(result.issues.iter().any(|i| i.rule == "P0-4"));
        assert!(!result.passes());
    }

    // -- 3. Missing field is a presence error ---------------------------------

    #[test]
    fn missing_field_is_presence_error() {
        let mut xml = FieldMap::new();
        xml.insert("limit".to_string(), entry("NumericConverter", Shape::Primitive, true));
        let pojo = FieldMap::new();
        let oa = FieldMap::new();

        let result = check_consistency(
            &xml,
            &pojo,
            &oa,
            &TypeMappingRules::built_in(),
            ConsistencyMode::Strict,
            &BTreeSet::new(),
        );
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].rule, "P0-1");
    }

    // -- 4. Transitory XML-only field is excluded entirely -------------------

    #[test]
    fn transitory_field_present_only_in_xml_is_not_a_presence_error() {
        let mut xml = FieldMap::new();
        xml.insert(
            "groupId".to_string(),
            FieldEntry {
                declared_type: "StringConverter".to_string(),
                is_transitory: true,
                shape: Shape::Primitive,
                required: true,
            },
        );
        let pojo = FieldMap::new();
        let oa = FieldMap::new();

        let result = check_consistency(
            &xml,
            &pojo,
            &oa,
            &TypeMappingRules::built_in(),
            ConsistencyMode::Strict,
            &BTreeSet::new(),
        );
        assert!(result.issues.is_empty());
    }

    // -- 5. Lenient mode downgrades required mismatch to a warning -----------

    #[test]
    fn lenient_mode_downgrades_required_mismatch() {
        let mut xml = FieldMap::new();
        xml.insert("name".to_string(), entry("StringConverter", Shape::Primitive, true));
        let mut pojo = FieldMap::new();
        pojo.insert("name".to_string(), entry("String", Shape::Primitive, false));
        let mut oa = FieldMap::new();
        oa.insert("name".to_string(), entry("string", Shape::Primitive, true));

        let result = check_consistency(
            &xml,
            &pojo,
            &oa,
            &TypeMappingRules::built_in(),
            ConsistencyMode::Lenient,
            &BTreeSet::new(),
        );
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Warning);
        assert!(result.passes());
    }

    // -- 6. Ignore-fields excludes a path entirely ----------------------------

    #[test]
    fn ignored_field_is_skipped() {
        let mut xml = FieldMap::new();
        xml.insert("internal".to_string(), entry("StringConverter", Shape::Primitive, true));
        let pojo = FieldMap::new();
        let oa = FieldMap::new();

        let mut ignore = BTreeSet::new();
        ignore.insert("internal".to_string());

        let result = check_consistency(&xml, &pojo, &oa, &TypeMappingRules::built_in(), ConsistencyMode::Strict, &ignore);
        assert!(result.issues.is_empty());
    }
}
