//! `RunConfig` loading, CLI-flag overlay, and advisory validation.
//!
//! Configuration is resolved in three layers, each overriding the last:
//! built-in defaults, an optional TOML file, then CLI flags. Every
//! option in the external configuration table has exactly one field
//! here; nothing is read from the environment.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use msgforge_error::{ErrorCode, MsgforgeError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// `{none, by-message, by-object}` OpenAPI schema-splitting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStrategyOption {
    /// Single file, inline components.
    None,
    /// One file per top-level message.
    ByMessage,
    /// One file per individual class.
    ByObject,
}

/// `{DEBUG, INFO, WARN, ERROR}` logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    /// Verbose diagnostic output.
    Debug,
    /// Normal operational output.
    Info,
    /// Unexpected but non-fatal conditions.
    Warn,
    /// Failures only.
    Error,
}

/// `output.*` options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Target output directory. Default `./output`.
    pub root_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { root_dir: "./output".to_string() }
    }
}

/// `parser.*` options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct ParserConfig {
    /// Max container nesting depth before a `PARSE_MAX_DEPTH_EXCEEDED`
    /// error. Default 50.
    pub max_nesting_depth: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { max_nesting_depth: 50 }
    }
}

/// `xml.*` options. The namespace and project coordinates are required
/// for the `generate` command and have no built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct XmlConfig {
    /// `xml.namespace.inbound`.
    pub namespace_inbound: Option<String>,
    /// `xml.namespace.outbound`.
    pub namespace_outbound: Option<String>,
    /// `xml.project.group-id`.
    pub project_group_id: Option<String>,
    /// `xml.project.artifact-id`.
    pub project_artifact_id: Option<String>,
}

/// `java.*` options.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JavaConfig {
    /// `java.package-name`. Derived from the operation id when absent.
    pub package_name: Option<String>,
    /// `java.use-lombok`. Default `false`.
    #[serde(default)]
    pub use_lombok: bool,
}

/// `openapi.*` options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OpenApiConfig {
    /// `openapi.version`. Default `3.0.3`.
    pub version: String,
    /// `openapi.split-strategy`. Default `by-object`.
    pub split_strategy: SplitStrategyOption,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            version: "3.0.3".to_string(),
            split_strategy: SplitStrategyOption::ByObject,
        }
    }
}

/// `audit.*` options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct AuditConfig {
    /// `audit.hash-outputs`. Default `false`.
    pub hash_outputs: bool,
    /// `audit.redact-file-paths`. Default `false`.
    pub redact_file_paths: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { hash_outputs: false, redact_file_paths: false }
    }
}

/// `validation.consistency.*` options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyConfig {
    /// `validation.consistency.strict-mode`. Default `true`.
    pub strict_mode: bool,
    /// `validation.consistency.type-mapping-rules`. Empty means "use the
    /// built-in table".
    #[serde(default)]
    pub type_mapping_rules: BTreeMap<String, String>,
    /// `validation.consistency.ignore-fields`. Default empty.
    #[serde(default)]
    pub ignore_fields: Vec<String>,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            type_mapping_rules: BTreeMap::new(),
            ignore_fields: Vec::new(),
        }
    }
}

/// `validation.*` options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationConfig {
    /// `validation.redact-payload`. Default `true`.
    pub redact_payload: bool,
    /// `validation.consistency.*`.
    pub consistency: ConsistencyConfig,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { redact_payload: true, consistency: ConsistencyConfig::default() }
    }
}

/// The fully resolved configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunConfig {
    /// `output.*`.
    pub output: OutputConfig,
    /// `parser.*`.
    pub parser: ParserConfig,
    /// `xml.*`.
    pub xml: XmlConfig,
    /// `java.*`.
    pub java: JavaConfig,
    /// `openapi.*`.
    pub openapi: OpenApiConfig,
    /// `audit.*`.
    pub audit: AuditConfig,
    /// `validation.*`.
    pub validation: ValidationConfig,
    /// `logging-level`. Default `INFO`.
    pub logging_level: LoggingLevel,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            parser: ParserConfig::default(),
            xml: XmlConfig::default(),
            java: JavaConfig::default(),
            openapi: OpenApiConfig::default(),
            audit: AuditConfig::default(),
            validation: ValidationConfig::default(),
            logging_level: LoggingLevel::Info,
        }
    }
}

/// Partially specified configuration as read from a TOML file. Every
/// field is optional; absent fields fall through to the next layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfigFile {
    /// `output.*` overrides.
    #[serde(default)]
    pub output: PartialOutput,
    /// `parser.*` overrides.
    #[serde(default)]
    pub parser: PartialParser,
    /// `xml.*` overrides.
    #[serde(default)]
    pub xml: XmlConfig,
    /// `java.*` overrides.
    #[serde(default)]
    pub java: PartialJava,
    /// `openapi.*` overrides.
    #[serde(default)]
    pub openapi: PartialOpenApi,
    /// `audit.*` overrides.
    #[serde(default)]
    pub audit: PartialAudit,
    /// `validation.*` overrides.
    #[serde(default)]
    pub validation: PartialValidation,
    /// `logging-level` override.
    #[serde(default)]
    pub logging_level: Option<LoggingLevel>,
}

/// Partial `output.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialOutput {
    /// `output.root-dir`.
    pub root_dir: Option<String>,
}

/// Partial `parser.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialParser {
    /// `parser.max-nesting-depth`.
    pub max_nesting_depth: Option<u32>,
}

/// Partial `java.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialJava {
    /// `java.package-name`.
    pub package_name: Option<String>,
    /// `java.use-lombok`.
    pub use_lombok: Option<bool>,
}

/// Partial `openapi.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialOpenApi {
    /// `openapi.version`.
    pub version: Option<String>,
    /// `openapi.split-strategy`.
    pub split_strategy: Option<SplitStrategyOption>,
}

/// Partial `audit.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialAudit {
    /// `audit.hash-outputs`.
    pub hash_outputs: Option<bool>,
    /// `audit.redact-file-paths`.
    pub redact_file_paths: Option<bool>,
}

/// Partial `validation.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialValidation {
    /// `validation.redact-payload`.
    pub redact_payload: Option<bool>,
    /// `validation.consistency.*`.
    #[serde(default)]
    pub consistency: PartialConsistency,
}

/// Partial `validation.consistency.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialConsistency {
    /// `validation.consistency.strict-mode`.
    pub strict_mode: Option<bool>,
    /// `validation.consistency.type-mapping-rules`.
    pub type_mapping_rules: Option<BTreeMap<String, String>>,
    /// `validation.consistency.ignore-fields`.
    pub ignore_fields: Option<Vec<String>>,
}

/// CLI-flag overrides, the last and highest-priority layer. Every field
/// mirrors one row of the configuration table.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--output-root-dir`.
    pub output_root_dir: Option<String>,
    /// `--max-nesting-depth`.
    pub max_nesting_depth: Option<u32>,
    /// `--xml-namespace-inbound`.
    pub xml_namespace_inbound: Option<String>,
    /// `--xml-namespace-outbound`.
    pub xml_namespace_outbound: Option<String>,
    /// `--xml-project-group-id`.
    pub xml_project_group_id: Option<String>,
    /// `--xml-project-artifact-id`.
    pub xml_project_artifact_id: Option<String>,
    /// `--java-package-name`.
    pub java_package_name: Option<String>,
    /// `--java-use-lombok`.
    pub java_use_lombok: Option<bool>,
    /// `--openapi-version`.
    pub openapi_version: Option<String>,
    /// `--openapi-split-strategy`.
    pub openapi_split_strategy: Option<SplitStrategyOption>,
    /// `--audit-hash-outputs`.
    pub audit_hash_outputs: Option<bool>,
    /// `--audit-redact-file-paths`.
    pub audit_redact_file_paths: Option<bool>,
    /// `--validation-redact-payload`.
    pub validation_redact_payload: Option<bool>,
    /// `--validation-strict-mode`.
    pub validation_strict_mode: Option<bool>,
    /// `--validation-ignore-fields`.
    pub validation_ignore_fields: Option<Vec<String>>,
    /// `--logging-level`.
    pub logging_level: Option<LoggingLevel>,
}

/// Read and parse a TOML configuration file.
///
/// # Errors
///
/// Returns [`ErrorCode::ConfigInvalid`] if the file cannot be read or
/// does not parse as the expected shape.
pub fn load_config_file(path: &Path) -> Result<RunConfigFile, MsgforgeError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MsgforgeError::new(ErrorCode::ConfigInvalid, format!("failed to read config file `{}`", path.display()))
            .with_source(e)
    })?;
    toml::from_str(&content).map_err(|e| {
        MsgforgeError::new(ErrorCode::ConfigInvalid, format!("failed to parse config file `{}`", path.display()))
            .with_source(e)
    })
}

/// Resolve a [`RunConfig`] from defaults, an optional parsed file, and
/// CLI overrides, in that priority order (CLI wins, then file, then
/// built-in defaults).
#[must_use]
pub fn resolve(file: Option<RunConfigFile>, cli: CliOverrides) -> RunConfig {
    let mut config = RunConfig::default();

    if let Some(file) = file {
        if let Some(v) = file.output.root_dir {
            config.output.root_dir = v;
        }
        if let Some(v) = file.parser.max_nesting_depth {
            config.parser.max_nesting_depth = v;
        }
        config.xml = file.xml;
        if let Some(v) = file.java.package_name {
            config.java.package_name = Some(v);
        }
        if let Some(v) = file.java.use_lombok {
            config.java.use_lombok = v;
        }
        if let Some(v) = file.openapi.version {
            config.openapi.version = v;
        }
        if let Some(v) = file.openapi.split_strategy {
            config.openapi.split_strategy = v;
        }
        if let Some(v) = file.audit.hash_outputs {
            config.audit.hash_outputs = v;
        }
        if let Some(v) = file.audit.redact_file_paths {
            config.audit.redact_file_paths = v;
        }
        if let Some(v) = file.validation.redact_payload {
            config.validation.redact_payload = v;
        }
        if let Some(v) = file.validation.consistency.strict_mode {
            config.validation.consistency.strict_mode = v;
        }
        if let Some(v) = file.validation.consistency.type_mapping_rules {
            config.validation.consistency.type_mapping_rules = v;
        }
        if let Some(v) = file.validation.consistency.ignore_fields {
            config.validation.consistency.ignore_fields = v;
        }
        if let Some(v) = file.logging_level {
            config.logging_level = v;
        }
    }

    if let Some(v) = cli.output_root_dir {
        config.output.root_dir = v;
    }
    if let Some(v) = cli.max_nesting_depth {
        config.parser.max_nesting_depth = v;
    }
    if let Some(v) = cli.xml_namespace_inbound {
        config.xml.namespace_inbound = Some(v);
    }
    if let Some(v) = cli.xml_namespace_outbound {
        config.xml.namespace_outbound = Some(v);
    }
    if let Some(v) = cli.xml_project_group_id {
        config.xml.project_group_id = Some(v);
    }
    if let Some(v) = cli.xml_project_artifact_id {
        config.xml.project_artifact_id = Some(v);
    }
    if let Some(v) = cli.java_package_name {
        config.java.package_name = Some(v);
    }
    if let Some(v) = cli.java_use_lombok {
        config.java.use_lombok = v;
    }
    if let Some(v) = cli.openapi_version {
        config.openapi.version = v;
    }
    if let Some(v) = cli.openapi_split_strategy {
        config.openapi.split_strategy = v;
    }
    if let Some(v) = cli.audit_hash_outputs {
        config.audit.hash_outputs = v;
    }
    if let Some(v) = cli.audit_redact_file_paths {
        config.audit.redact_file_paths = v;
    }
    if let Some(v) = cli.validation_redact_payload {
        config.validation.redact_payload = v;
    }
    if let Some(v) = cli.validation_strict_mode {
        config.validation.consistency.strict_mode = v;
    }
    if let Some(v) = cli.validation_ignore_fields {
        config.validation.consistency.ignore_fields = v;
    }
    if let Some(v) = cli.logging_level {
        config.logging_level = v;
    }

    config
}

/// Severity of an advisory configuration warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational note, not necessarily a problem.
    Info,
    /// Likely unintended but not fatal.
    Warning,
}

/// A single advisory warning produced by [`validate_advisory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Dot-delimited path to the field, e.g. `"parser.max_nesting_depth"`.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: WarningSeverity,
}

/// Advisory (non-fatal) checks over a resolved [`RunConfig`].
///
/// Fatal missing-required-option checks (e.g. XML namespaces for
/// `generate`) are the caller's responsibility, since only some
/// subcommands require them.
#[must_use]
pub fn validate_advisory(config: &RunConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.parser.max_nesting_depth == 0 {
        warnings.push(ConfigWarning {
            field: "parser.max_nesting_depth".into(),
            message: "max-nesting-depth of 0 rejects every container field".into(),
            severity: WarningSeverity::Warning,
        });
    }

    if !config.validation.consistency.strict_mode {
        warnings.push(ConfigWarning {
            field: "validation.consistency.strict_mode".into(),
            message: "strict-mode is disabled; type and required-flag disagreements will only warn".into(),
            severity: WarningSeverity::Info,
        });
    }

    if !config.validation.redact_payload {
        warnings.push(ConfigWarning {
            field: "validation.redact_payload".into(),
            message: "payload redaction is disabled; literal payload contents may appear in reports".into(),
            severity: WarningSeverity::Warning,
        });
    }

    for field in &config.validation.consistency.ignore_fields {
        if field.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "validation.consistency.ignore_fields".into(),
                message: "empty field path in ignore-fields has no effect".into(),
                severity: WarningSeverity::Warning,
            });
        }
    }

    warnings
}

/// Require the XML namespace and project-coordinate options the
/// `generate` command needs; these have no built-in default.
///
/// # Errors
///
/// Returns [`ErrorCode::ConfigMissingOption`] naming the first missing
/// field.
pub fn require_xml_options(xml: &XmlConfig) -> Result<(), MsgforgeError> {
    let missing = [
        ("xml.namespace.inbound", xml.namespace_inbound.is_none()),
        ("xml.namespace.outbound", xml.namespace_outbound.is_none()),
        ("xml.project.group-id", xml.project_group_id.is_none()),
        ("xml.project.artifact-id", xml.project_artifact_id.is_none()),
    ];
    for (name, is_missing) in missing {
        if is_missing {
            return Err(MsgforgeError::new(
                ErrorCode::ConfigMissingOption,
                format!("required configuration option `{name}` was not provided"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Defaults match the documented table -------------------------------

    #[test]
    fn defaults_match_documented_table() {
        let config = RunConfig::default();
        assert_eq!(config.output.root_dir, "./output");
        assert_eq!(config.parser.max_nesting_depth, 50);
        assert_eq!(config.openapi.version, "3.0.3");
        assert_eq!(config.openapi.split_strategy, SplitStrategyOption::ByObject);
        assert!(!config.audit.hash_outputs);
        assert!(!config.audit.redact_file_paths);
        assert!(config.validation.redact_payload);
        assert!(config.validation.consistency.strict_mode);
        assert!(config.validation.consistency.ignore_fields.is_empty());
        assert_eq!(config.logging_level, LoggingLevel::Info);
    }

    // -- 2. File values override defaults, CLI overrides the file -----------

    #[test]
    fn cli_overrides_win_over_file_which_overrides_defaults() {
        let file = RunConfigFile {
            output: PartialOutput { root_dir: Some("./from-file".into()) },
            openapi: PartialOpenApi { version: Some("3.1.0".into()), split_strategy: None },
            ..Default::default()
        };
        let cli = CliOverrides {
            output_root_dir: Some("./from-cli".into()),
            ..Default::default()
        };

        let config = resolve(Some(file), cli);
        assert_eq!(config.output.root_dir, "./from-cli");
        assert_eq!(config.openapi.version, "3.1.0");
        assert_eq!(config.parser.max_nesting_depth, 50);
    }

    // -- 3. No file falls through CLI directly onto defaults ------------------

    #[test]
    fn no_file_applies_cli_onto_defaults() {
        let cli = CliOverrides { max_nesting_depth: Some(10), ..Default::default() };
        let config = resolve(None, cli);
        assert_eq!(config.parser.max_nesting_depth, 10);
        assert_eq!(config.output.root_dir, "./output");
    }

    // -- 4. Loading a TOML file round-trips through resolve --------------------

    #[test]
    fn load_config_file_parses_toml_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msgforge.toml");
        std::fs::write(
            &path,
            r#"
            [output]
            root-dir = "./build/out"

            [java]
            use-lombok = true

            [validation]
            redact-payload = false
            "#,
        )
        .unwrap();

        let file = load_config_file(&path).unwrap();
        let config = resolve(Some(file), CliOverrides::default());
        assert_eq!(config.output.root_dir, "./build/out");
        assert!(config.java.use_lombok);
        assert!(!config.validation.redact_payload);
    }

    // -- 5. A missing config file surfaces CONFIG_INVALID -----------------------

    #[test]
    fn missing_config_file_is_config_invalid() {
        let err = load_config_file(Path::new("/nonexistent/msgforge.toml")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalid);
    }

    // -- 6. Advisory warnings flag risky but non-fatal configuration ----------

    #[test]
    fn advisory_warnings_flag_disabled_redaction_and_lenient_mode() {
        let mut config = RunConfig::default();
        config.validation.redact_payload = false;
        config.validation.consistency.strict_mode = false;

        let warnings = validate_advisory(&config);
        assert!(warnings.iter().any(|w| w.field == "validation.redact_payload"));
        assert!(warnings.iter().any(|w| w.field == "validation.consistency.strict_mode"));
    }

    // -- 7. Missing XML options are a fatal CONFIG_MISSING_OPTION --------------

    #[test]
    fn missing_xml_namespace_is_fatal() {
        let xml = XmlConfig::default();
        let err = require_xml_options(&xml).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingOption);
    }

    #[test]
    fn fully_specified_xml_options_pass() {
        let xml = XmlConfig {
            namespace_inbound: Some("urn:msg:inbound".into()),
            namespace_outbound: Some("urn:msg:outbound".into()),
            project_group_id: Some("com.example".into()),
            project_artifact_id: Some("msgforge-generated".into()),
        };
        require_xml_options(&xml).unwrap();
    }
}
