#![deny(unsafe_code)]

mod ingest;
mod orchestrator;
mod report;

use clap::{Args, Parser, Subcommand, ValueEnum};
use msgforge_config::{CliOverrides, SplitStrategyOption, load_config_file, resolve, validate_advisory};
use msgforge_error::{ErrorCode, MsgforgeError};
use orchestrator::{GenerateArgs, ParseArgs};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code `clap` itself uses for a malformed command line, before any
/// phase runs. Distinct from the `CLI_*` error codes, which cover
/// argument combinations clap's own parser accepts but the orchestrator
/// rejects.
#[allow(dead_code)]
const EXIT_CLAP_USAGE_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "msgforge", version, about = "Tabular message-spec compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    debug: bool,

    /// Path to a `msgforge.toml` configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse, generate all artifacts, validate, and commit to the output
    /// directory.
    Generate {
        /// Path to the primary spec document (JSON `SpecDocument`).
        spec: PathBuf,

        /// Path to a separately supplied shared-header spec document.
        #[arg(long)]
        shared_header: Option<PathBuf>,

        /// Literal payload bytes to validate against the computed offset
        /// table.
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Correlation id stamped on the audit log and output manifest.
        /// Generated when omitted.
        #[arg(long)]
        correlation_id: Option<String>,

        #[command(flatten)]
        overrides: ConfigOverrideArgs,
    },

    /// Parse and run all validators without writing any output.
    Validate {
        /// Path to the primary spec document (JSON `SpecDocument`).
        spec: PathBuf,

        /// Path to a separately supplied shared-header spec document.
        #[arg(long)]
        shared_header: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrideArgs,
    },

    /// Parse a spec document into the canonical intermediate tree and
    /// print its JSON form, without generating or validating anything.
    Parse {
        /// Path to the primary spec document (JSON `SpecDocument`).
        spec: PathBuf,

        /// Path to a separately supplied shared-header spec document.
        #[arg(long)]
        shared_header: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrideArgs,
    },

    /// Print the resolved configuration and any advisory warnings.
    Version,

    /// Print the JSON Schema for a configuration or report type.
    Schema {
        /// Which schema to print.
        #[arg(value_enum)]
        kind: SchemaKindArg,
    },
}

#[derive(Args, Debug, Default)]
struct ConfigOverrideArgs {
    /// `--output-root-dir`.
    #[arg(long)]
    output_root_dir: Option<String>,
    /// `--max-nesting-depth`.
    #[arg(long)]
    max_nesting_depth: Option<u32>,
    /// `--xml-namespace-inbound`.
    #[arg(long)]
    xml_namespace_inbound: Option<String>,
    /// `--xml-namespace-outbound`.
    #[arg(long)]
    xml_namespace_outbound: Option<String>,
    /// `--xml-project-group-id`.
    #[arg(long)]
    xml_project_group_id: Option<String>,
    /// `--xml-project-artifact-id`.
    #[arg(long)]
    xml_project_artifact_id: Option<String>,
    /// `--java-package-name`.
    #[arg(long)]
    java_package_name: Option<String>,
    /// `--java-use-lombok`.
    #[arg(long)]
    java_use_lombok: Option<bool>,
    /// `--openapi-version`.
    #[arg(long)]
    openapi_version: Option<String>,
    /// `--openapi-split-strategy`.
    #[arg(long, value_enum)]
    openapi_split_strategy: Option<SplitStrategyArg>,
    /// `--audit-hash-outputs`.
    #[arg(long)]
    audit_hash_outputs: Option<bool>,
    /// `--audit-redact-file-paths`.
    #[arg(long)]
    audit_redact_file_paths: Option<bool>,
    /// `--validation-redact-payload`.
    #[arg(long)]
    validation_redact_payload: Option<bool>,
    /// `--validation-strict-mode`.
    #[arg(long)]
    validation_strict_mode: Option<bool>,
    /// `--validation-ignore-field` (repeatable).
    #[arg(long = "validation-ignore-field")]
    validation_ignore_fields: Vec<String>,
}

impl From<ConfigOverrideArgs> for CliOverrides {
    fn from(args: ConfigOverrideArgs) -> Self {
        Self {
            output_root_dir: args.output_root_dir,
            max_nesting_depth: args.max_nesting_depth,
            xml_namespace_inbound: args.xml_namespace_inbound,
            xml_namespace_outbound: args.xml_namespace_outbound,
            xml_project_group_id: args.xml_project_group_id,
            xml_project_artifact_id: args.xml_project_artifact_id,
            java_package_name: args.java_package_name,
            java_use_lombok: args.java_use_lombok,
            openapi_version: args.openapi_version,
            openapi_split_strategy: args.openapi_split_strategy.map(Into::into),
            audit_hash_outputs: args.audit_hash_outputs,
            audit_redact_file_paths: args.audit_redact_file_paths,
            validation_redact_payload: args.validation_redact_payload,
            validation_strict_mode: args.validation_strict_mode,
            validation_ignore_fields: if args.validation_ignore_fields.is_empty() { None } else { Some(args.validation_ignore_fields) },
            logging_level: None,
        }
    }
}

/// `openapi.split-strategy` as a `clap::ValueEnum`; mirrors
/// [`SplitStrategyOption`] one-for-one.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitStrategyArg {
    None,
    ByMessage,
    ByObject,
}

impl From<SplitStrategyArg> for SplitStrategyOption {
    fn from(arg: SplitStrategyArg) -> Self {
        match arg {
            SplitStrategyArg::None => Self::None,
            SplitStrategyArg::ByMessage => Self::ByMessage,
            SplitStrategyArg::ByObject => Self::ByObject,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaKindArg {
    Config,
    ConsistencyReport,
    PayloadReport,
}

fn init_tracing(debug: bool) {
    let filter = if debug { "msgforge=debug,info" } else { "msgforge=info,warn" };
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(filter)).init();
}

fn resolve_config(config_path: &Option<PathBuf>, debug: bool, mut overrides: CliOverrides) -> Result<msgforge_config::RunConfig, MsgforgeError> {
    if debug {
        overrides.logging_level = Some(msgforge_config::LoggingLevel::Debug);
    }
    let file = match config_path {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };
    let config = resolve(file, overrides);
    for warning in validate_advisory(&config) {
        tracing::warn!(field = %warning.field, "{}", warning.message);
    }
    Ok(config)
}

fn new_correlation_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("run-{nanos:x}")
}

fn schema_json(kind: SchemaKindArg) -> serde_json::Value {
    match kind {
        SchemaKindArg::Config => serde_json::to_value(schemars::schema_for!(msgforge_config::RunConfig)).unwrap_or_default(),
        SchemaKindArg::ConsistencyReport => serde_json::to_value(schemars::schema_for!(msgforge_validate::ConsistencyResult)).unwrap_or_default(),
        SchemaKindArg::PayloadReport => serde_json::to_value(schemars::schema_for!(msgforge_offset::PayloadReport)).unwrap_or_default(),
    }
}

fn cmd_generate(spec: PathBuf, shared_header: Option<PathBuf>, payload: Option<PathBuf>, correlation_id: Option<String>, config: msgforge_config::RunConfig) -> Result<i32, MsgforgeError> {
    let args = GenerateArgs {
        parse: ParseArgs { spec_path: spec, shared_header_path: shared_header, config },
        payload_path: payload,
        correlation_id: correlation_id.unwrap_or_else(new_correlation_id),
    };
    match orchestrator::run_generate(args) {
        Ok(report) => {
            println!("generated output under {}", report.output_root.display());
            if !report.consistency.passes() {
                println!("{} consistency issue(s) found; see validation/consistency-report.md", report.consistency.issues.len());
            }
            if let Some(payload) = &report.payload {
                if !payload.is_clean() {
                    println!("payload validation found {} difference(s)", payload.differences.len());
                }
            }
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

fn cmd_validate(spec: PathBuf, shared_header: Option<PathBuf>, config: msgforge_config::RunConfig) -> Result<i32, MsgforgeError> {
    let args = ParseArgs { spec_path: spec, shared_header_path: shared_header, config };
    let report = orchestrator::run_validate_only(args)?;
    println!("{} structural finding(s), {} consistency issue(s)", report.findings.len(), report.consistency.issues.len());
    if report.consistency.passes() {
        Ok(0)
    } else {
        Err(MsgforgeError::new(ErrorCode::ValidationConsistency, "cross-artifact consistency check failed"))
    }
}

fn cmd_parse(spec: PathBuf, shared_header: Option<PathBuf>, config: msgforge_config::RunConfig) -> Result<i32, MsgforgeError> {
    let args = ParseArgs { spec_path: spec, shared_header_path: shared_header, config };
    let tree = orchestrator::run_parse_only(args)?;
    let json = msgforge_core::canonical_json(&tree)
        .map_err(|e| MsgforgeError::new(ErrorCode::Internal, "failed to serialize intermediate tree").with_source(e))?;
    println!("{json}");
    Ok(0)
}

fn cmd_version(config: msgforge_config::RunConfig) -> Result<i32, MsgforgeError> {
    println!("msgforge {}", env!("CARGO_PKG_VERSION"));
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| MsgforgeError::new(ErrorCode::Internal, "failed to serialize configuration").with_source(e))?;
    println!("{json}");
    Ok(0)
}

fn cmd_schema(kind: SchemaKindArg) -> Result<i32, MsgforgeError> {
    let json = serde_json::to_string_pretty(&schema_json(kind))
        .map_err(|e| MsgforgeError::new(ErrorCode::Internal, "failed to serialize schema").with_source(e))?;
    println!("{json}");
    Ok(0)
}

fn run(cli: Cli) -> Result<i32, MsgforgeError> {
    let debug = cli.debug;
    match cli.command {
        Commands::Generate { spec, shared_header, payload, correlation_id, overrides } => {
            let config = resolve_config(&cli.config, debug, overrides.into())?;
            cmd_generate(spec, shared_header, payload, correlation_id, config)
        }
        Commands::Validate { spec, shared_header, overrides } => {
            let config = resolve_config(&cli.config, debug, overrides.into())?;
            cmd_validate(spec, shared_header, config)
        }
        Commands::Parse { spec, shared_header, overrides } => {
            let config = resolve_config(&cli.config, debug, overrides.into())?;
            cmd_parse(spec, shared_header, config)
        }
        Commands::Version => {
            let config = resolve_config(&cli.config, debug, CliOverrides::default())?;
            cmd_version(config)
        }
        Commands::Schema { kind } => cmd_schema(kind),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            tracing::error!(code = %e.code.as_str(), "{}", e.message);
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
