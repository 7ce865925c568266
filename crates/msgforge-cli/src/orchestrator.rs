//! Phase orchestrator: PARSE -> GENERATE -> VALIDATE -> OUTPUT_COMMIT ->
//! AUDIT_FINALIZE.
//!
//! Each public entry point ([`run_generate`], `run_validate` via
//! [`run_validate_only`], [`run_parse_only`]) owns one
//! [`AuditLogger`] for the lifetime of the call: it is created first,
//! finalized last, and written to `<output-root>/audit/` regardless of
//! whether the run committed, rolled back, or failed before reaching the
//! output phase. The [`msgforge_output::Transaction`] governs everything
//! else under the output root, so a rollback leaves no generated
//! artifact behind while still leaving an audit trail.

use crate::ingest;
use crate::report::{render_consistency_md, render_diff_md};
use msgforge_audit::AuditLogger;
use msgforge_config::RunConfig;
use msgforge_core::{Direction, IntermediateTree, canonical_json};
use msgforge_error::{ErrorCode, MsgforgeError};
use msgforge_offset::{PayloadReport, build_offset_table, validate_payload};
use msgforge_output::{PreconditionOutcome, Transaction};
use msgforge_parser::ParseInput;
use msgforge_validate::{CanonicalType, ConsistencyMode, ConsistencyResult, TypeMappingRules, check_consistency, validate_openapi, validate_pojo, validate_xml};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Arguments common to every subcommand that reads a spec document.
pub struct ParseArgs {
    /// Path to the primary spec document (JSON; see [`ingest`]).
    pub spec_path: PathBuf,
    /// Path to a separately supplied shared-header spec document.
    pub shared_header_path: Option<PathBuf>,
    /// Resolved run configuration.
    pub config: RunConfig,
}

/// Arguments for `generate`, a superset of [`ParseArgs`].
pub struct GenerateArgs {
    /// Shared parse inputs.
    pub parse: ParseArgs,
    /// Literal payload to validate against the computed offset table.
    pub payload_path: Option<PathBuf>,
    /// Correlation id stamped on the audit log and the output transaction.
    pub correlation_id: String,
}

/// What `generate` produced, for the CLI to report to the user.
pub struct GenerateReport {
    /// Output root the transaction committed into.
    pub output_root: PathBuf,
    /// Cross-artifact consistency result.
    pub consistency: ConsistencyResult,
    /// Payload validation result, if a payload was supplied.
    pub payload: Option<PayloadReport>,
}

/// What `validate` produced.
pub struct ValidateReport {
    /// Cross-artifact consistency result.
    pub consistency: ConsistencyResult,
    /// Structural findings from each per-artifact validator.
    pub findings: Vec<msgforge_validate::Finding>,
}

fn read_input(path: &Path) -> Result<Vec<u8>, MsgforgeError> {
    std::fs::read(path).map_err(|e| {
        MsgforgeError::new(ErrorCode::InputMissingFile, format!("failed to read `{}`", path.display())).with_source(e)
    })
}

/// Ingest and parse a spec document pair into an [`IntermediateTree`],
/// recording inputs on `audit` as they are read.
fn parse_tree(args: &ParseArgs, audit: &mut AuditLogger) -> Result<IntermediateTree, MsgforgeError> {
    audit.record_phase_started("parse");

    let main_bytes = read_input(&args.spec_path)?;
    audit.record_input(&args.spec_path, &main_bytes, args.config.audit.hash_outputs);
    let main_doc = ingest::load_spec_document(&args.spec_path)?;

    let shared_doc = match &args.shared_header_path {
        Some(path) => {
            let bytes = read_input(path)?;
            audit.record_input(path, &bytes, args.config.audit.hash_outputs);
            Some(ingest::load_spec_document(path)?)
        }
        None => None,
    };

    let ingested = ingest::ingest(&main_doc, shared_doc.as_ref());
    let rows_map = ingested.rows;

    let parse_input = ParseInput {
        workbook: ingested.workbook,
        source_file: args.spec_path.display().to_string(),
        shared_header_workbook: ingested.shared_header_workbook,
        shared_header_path: args.shared_header_path.as_ref().map(|p| p.display().to_string()),
        max_nesting_depth: Some(args.config.parser.max_nesting_depth),
    };

    let tree = msgforge_parser::parse_intermediate_tree(parse_input, |_grid, sheet| {
        rows_map.get(sheet).cloned().unwrap_or_default()
    })?;

    audit.record_phase_completed("parse", 0);
    Ok(tree)
}

fn default_java_package(operation_id: &str) -> String {
    let slug: String = operation_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("generated.{slug}")
}

fn map_split_strategy(option: msgforge_config::SplitStrategyOption) -> msgforge_openapi::SplitStrategy {
    match option {
        msgforge_config::SplitStrategyOption::None => msgforge_openapi::SplitStrategy::None,
        msgforge_config::SplitStrategyOption::ByMessage => msgforge_openapi::SplitStrategy::ByMessage,
        msgforge_config::SplitStrategyOption::ByObject => msgforge_openapi::SplitStrategy::ByObject,
    }
}

fn canonical_type_from_token(token: &str) -> Option<CanonicalType> {
    match token {
        "numeric" => Some(CanonicalType::Numeric),
        "textual" => Some(CanonicalType::Textual),
        "amount" => Some(CanonicalType::Amount),
        _ => None,
    }
}

fn type_mapping_rules(config: &RunConfig) -> TypeMappingRules {
    let mut rules = TypeMappingRules::built_in();
    for (token, canonical) in &config.validation.consistency.type_mapping_rules {
        if let Some(canonical) = canonical_type_from_token(canonical) {
            rules.insert(token.clone(), canonical);
        }
    }
    rules
}

fn java_class_path(package_name: &str, class_name: &str) -> String {
    let package_path = package_name.replace('.', "/");
    format!("java/{package_path}/{class_name}.java")
}

struct GeneratedArtifacts {
    outbound_xml: String,
    inbound_xml: Option<String>,
    request_java: std::collections::BTreeMap<String, String>,
    response_java: std::collections::BTreeMap<String, String>,
    java_package: String,
    openapi: msgforge_openapi::OpenApiOutput,
}

fn generate_artifacts(tree: &IntermediateTree, config: &RunConfig) -> Result<GeneratedArtifacts, MsgforgeError> {
    msgforge_config::require_xml_options(&config.xml)?;
    let xml_config = msgforge_xml::XmlConfig {
        namespace_inbound: config.xml.namespace_inbound.clone().unwrap_or_default(),
        namespace_outbound: config.xml.namespace_outbound.clone().unwrap_or_default(),
        group_id: config.xml.project_group_id.clone().unwrap_or_default(),
        artifact_id: config.xml.project_artifact_id.clone().unwrap_or_default(),
    };

    let outbound_xml = msgforge_xml::generate(tree, Direction::Outbound, &xml_config)?;
    let inbound_xml = if tree.response.is_empty() {
        None
    } else {
        Some(msgforge_xml::generate(tree, Direction::Inbound, &xml_config)?)
    };

    let java_package = config.java.package_name.clone().unwrap_or_else(|| default_java_package(&tree.metadata.operation_id));
    let java_config = msgforge_pojo::JavaConfig {
        package_name: java_package.clone(),
        use_lombok: config.java.use_lombok,
    };
    let request_java = msgforge_pojo::generate(tree, Direction::Outbound, &java_config)?;
    let response_java = if tree.response.is_empty() {
        std::collections::BTreeMap::new()
    } else {
        msgforge_pojo::generate(tree, Direction::Inbound, &java_config)?
    };

    let openapi_config = msgforge_openapi::OpenApiConfig {
        version: config.openapi.version.clone(),
        split_strategy: map_split_strategy(config.openapi.split_strategy),
    };
    let openapi = msgforge_openapi::generate(tree, &openapi_config)?;

    Ok(GeneratedArtifacts { outbound_xml, inbound_xml, request_java, response_java, java_package, openapi })
}

/// `PER_ARTIFACT_VALIDATE` is its own fatal phase ahead of `CONSISTENCY`
/// (spec §4.15): a non-empty structural finding list must abort the run
/// with [`ErrorCode::ValidationStructural`] before the consistency gate
/// (let alone output commit) ever runs.
fn check_structural_findings(findings: &[msgforge_validate::Finding]) -> Result<(), MsgforgeError> {
    if findings.is_empty() {
        return Ok(());
    }
    let first = &findings[0];
    Err(MsgforgeError::new(
        ErrorCode::ValidationStructural,
        format!("{} per-artifact structural finding(s); first: {first}", findings.len()),
    ))
}

fn run_consistency(tree: &IntermediateTree, config: &RunConfig) -> (ConsistencyResult, Vec<msgforge_validate::Finding>) {
    let (xml_map, mut findings) = validate_xml(tree, Direction::Outbound);
    let (pojo_map, pojo_findings) = validate_pojo(tree, Direction::Outbound);
    let (openapi_map, oa_findings) = validate_openapi(tree, Direction::Outbound);
    findings.extend(pojo_findings);
    findings.extend(oa_findings);

    let mapping = type_mapping_rules(config);
    let mode = if config.validation.consistency.strict_mode { ConsistencyMode::Strict } else { ConsistencyMode::Lenient };
    let ignore_fields: BTreeSet<String> = config.validation.consistency.ignore_fields.iter().cloned().collect();
    let consistency = check_consistency(&xml_map, &pojo_map, &openapi_map, &mapping, mode, &ignore_fields);
    (consistency, findings)
}

fn write_audit(output_root: &Path, audit: AuditLogger, exit_code: i32, success: bool) {
    let (json, text) = audit.finalize(exit_code, success);
    let audit_dir = output_root.join("audit");
    if std::fs::create_dir_all(&audit_dir).is_ok() {
        let _ = std::fs::write(audit_dir.join("audit-log.json"), &json);
        let _ = std::fs::write(audit_dir.join("audit-log.txt"), &text);
    }
}

/// Run the full `generate` pipeline: parse, generate all three artifacts,
/// validate (structural, then consistency, then optional payload),
/// commit to an atomic output transaction, and finalize the audit log.
///
/// # Errors
///
/// Returns any [`MsgforgeError`] raised by a phase; the audit log is
/// still written to `<output-root>/audit/` before this function returns,
/// whether it succeeds or fails.
pub fn run_generate(args: GenerateArgs) -> Result<GenerateReport, MsgforgeError> {
    let output_root = PathBuf::from(&args.parse.config.output.root_dir);
    let mut audit = AuditLogger::new(args.correlation_id.clone(), args.parse.config.audit.redact_file_paths);

    let result = run_generate_inner(&args, &mut audit);
    let (exit_code, success) = match &result {
        Ok(_) => (0, true),
        Err(e) => {
            audit.record_failure(e);
            (e.exit_code(), false)
        }
    };
    write_audit(&output_root, audit, exit_code, success);
    result
}

fn run_generate_inner(args: &GenerateArgs, audit: &mut AuditLogger) -> Result<GenerateReport, MsgforgeError> {
    let config = &args.parse.config;
    let tree = parse_tree(&args.parse, audit)?;

    audit.record_phase_started("generate");
    let artifacts = generate_artifacts(&tree, config)?;
    audit.record_phase_completed("generate", 0);

    audit.record_phase_started("validate");
    let (consistency, findings) = run_consistency(&tree, config);
    audit.record_phase_completed("validate", findings.len() + consistency.issues.len());
    check_structural_findings(&findings)?;
    let consistency_outcome = if consistency.passes() { PreconditionOutcome::Pass } else { PreconditionOutcome::Fail };

    let payload_report = match &args.payload_path {
        Some(path) => {
            audit.record_phase_started("payload");
            let bytes = read_input(path)?;
            audit.record_input(path, &bytes, config.audit.hash_outputs);
            let table = build_offset_table(&tree, Direction::Outbound)?;
            let report = validate_payload(&bytes, &table, config.validation.redact_payload);
            audit.record_phase_completed("payload", report.missing.len() + report.differences.len());
            Some(report)
        }
        None => None,
    };
    let payload_outcome = match &payload_report {
        Some(report) if !report.is_clean() => PreconditionOutcome::Fail,
        _ => PreconditionOutcome::Pass,
    };

    audit.record_phase_started("output_commit");
    let mut txn = Transaction::open(args.correlation_id.clone(), &config.output.root_dir)?;

    let tree_json = canonical_json(&tree).map_err(|e| {
        MsgforgeError::new(ErrorCode::Internal, "failed to serialize intermediate tree").with_source(e)
    })?;
    txn.add_output("intermediate/message-tree.json", tree_json.as_bytes())?;
    txn.add_output("xml/outbound-bean.xml", artifacts.outbound_xml.as_bytes())?;
    if let Some(inbound) = &artifacts.inbound_xml {
        txn.add_output("xml/inbound-bean.xml", inbound.as_bytes())?;
    }
    for (class_name, source) in &artifacts.request_java {
        txn.add_output(&java_class_path(&artifacts.java_package, class_name), source.as_bytes())?;
    }
    for (class_name, source) in &artifacts.response_java {
        txn.add_output(&java_class_path(&artifacts.java_package, class_name), source.as_bytes())?;
    }
    txn.add_output("openapi/api.yaml", artifacts.openapi.main.as_bytes())?;
    for (relative_path, content) in &artifacts.openapi.files {
        txn.add_output(&format!("openapi/{relative_path}"), content.as_bytes())?;
    }

    let consistency_json = serde_json::to_vec_pretty(&consistency).map_err(|e| {
        MsgforgeError::new(ErrorCode::Internal, "failed to serialize consistency report").with_source(e)
    })?;
    txn.add_output("validation/consistency-report.json", &consistency_json)?;
    txn.add_output("validation/consistency-report.md", render_consistency_md(&consistency).as_bytes())?;
    if let Some(report) = &payload_report {
        let payload_json = serde_json::to_vec_pretty(report).map_err(|e| {
            MsgforgeError::new(ErrorCode::Internal, "failed to serialize payload report").with_source(e)
        })?;
        txn.add_output("validation/payload-report.json", &payload_json)?;
    }
    let rename_table = msgforge_xml::rename_table(&tree);
    txn.add_output("diff.md", render_diff_md(&rename_table).as_bytes())?;

    audit.record_transaction_state("pending");
    if let Err(e) = txn.check_preconditions(consistency_outcome, payload_outcome) {
        let _ = txn.rollback();
        audit.record_transaction_state("rolled_back");
        return Err(e);
    }
    match txn.commit() {
        Ok(_manifest) => {
            audit.record_transaction_state("committed");
        }
        Err(e) => {
            audit.record_transaction_state("rolled_back");
            return Err(e);
        }
    }
    audit.record_phase_completed("output_commit", 0);

    Ok(GenerateReport {
        output_root: PathBuf::from(&config.output.root_dir),
        consistency,
        payload: payload_report,
    })
}

/// Run `parse` only: build the [`IntermediateTree`] and return it,
/// without generating any artifact or touching the output directory.
///
/// # Errors
///
/// Returns any [`MsgforgeError`] raised while reading or parsing the
/// spec document.
pub fn run_parse_only(args: ParseArgs) -> Result<IntermediateTree, MsgforgeError> {
    let mut audit = AuditLogger::new("parse-only", args.config.audit.redact_file_paths);
    parse_tree(&args, &mut audit)
}

/// Run `validate` only: parse, generate nothing, but run the same
/// per-artifact and cross-artifact consistency checks `generate` would,
/// without ever opening an output transaction.
///
/// # Errors
///
/// Returns any [`MsgforgeError`] raised while parsing or generating the
/// artifacts the validators project from.
pub fn run_validate_only(args: ParseArgs) -> Result<ValidateReport, MsgforgeError> {
    let mut audit = AuditLogger::new("validate-only", args.config.audit.redact_file_paths);
    let tree = parse_tree(&args, &mut audit)?;
    audit.record_phase_started("validate");
    let (consistency, findings) = run_consistency(&tree, &args.config);
    audit.record_phase_completed("validate", findings.len() + consistency.issues.len());
    check_structural_findings(&findings)?;
    Ok(ValidateReport { consistency, findings })
}
