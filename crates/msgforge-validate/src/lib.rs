//! Static validators that run after generation: one per-artifact
//! structural check per emitted artifact, then a cross-artifact
//! consistency check over their field-maps.

#![warn(missing_docs)]

pub mod consistency;
pub mod per_artifact;

pub use consistency::{
    CanonicalType, ConsistencyIssue, ConsistencyMode, ConsistencyResult, Severity, TypeMappingRules,
    check_consistency,
};
pub use per_artifact::{ArtifactKind, FieldEntry, FieldMap, Finding, Shape, validate_openapi, validate_pojo, validate_xml};
