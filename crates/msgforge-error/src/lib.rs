//! Unified error taxonomy with stable error codes and exit-code mapping.
//!
//! Every `msgforge` error carries an [`ErrorCode`] (a machine-readable,
//! stable string tag), a human-readable message, an optional cause chain,
//! and arbitrary key-value context. Each code maps to exactly one process
//! exit code via [`ErrorCode::exit_code`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to, mirroring §7 of the
/// error-handling design: PARSE, GENERATION, VALIDATION, CONFIG, OUTPUT,
/// INPUT, CLI, INTERNAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input shape/hierarchy violations; carries sheet + row + field.
    Parse,
    /// Projection rule violation; carries generator + artifact.
    Generation,
    /// Structural, consistency, or payload validation failures.
    Validation,
    /// Missing/invalid configuration option.
    Config,
    /// Writability, space, commit, or rollback failures.
    Output,
    /// Missing file or malformed workbook shape.
    Input,
    /// CLI argument/dispatch errors.
    Cli,
    /// Catch-all for invariant violations that should never happen.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Generation => "generation",
            Self::Validation => "validation",
            Self::Config => "config",
            Self::Output => "output",
            Self::Input => "input",
            Self::Cli => "cli",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code. Each variant serializes to a
/// `SCREAMING_SNAKE_CASE` string and maps to exactly one exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Parse --
    /// Required `Request` sheet is absent.
    ParseMissingRequestSheet,
    /// Two siblings in the same group normalized to the same name.
    ParseDuplicateSibling,
    /// `min..max` occurrence literal is malformed or `min > max`.
    ParseInvalidOccurrence,
    /// A segment-level jump skipped more than one level.
    ParseLevelJump,
    /// Container nesting exceeded `parser.max-nesting-depth`.
    ParseMaxDepthExceeded,
    /// No source yielded a non-empty operation id.
    ParseMissingOperationId,

    // -- Generation --
    /// A generator produced output that violates its own projection rules.
    GenerationProjectionViolation,

    // -- Validation --
    /// Per-artifact structural validation failed.
    ValidationStructural,
    /// Cross-artifact consistency validation failed.
    ValidationConsistency,
    /// Payload validation against the offset table failed.
    ValidationPayload,

    // -- Config --
    /// A configuration value is present but invalid.
    ConfigInvalid,
    /// A required configuration option is missing.
    ConfigMissingOption,

    // -- Input --
    /// A referenced input file does not exist.
    InputMissingFile,
    /// The workbook does not have the expected shape.
    InputInvalidWorkbookShape,

    // -- Output --
    /// Target output directory is not writable.
    OutputNotWritable,
    /// Free disk space is less than the aggregate staged size.
    OutputInsufficientDiskSpace,
    /// Consistency precondition failed the commit gate.
    OutputConsistencyFailed,
    /// Payload precondition failed the commit gate.
    OutputMessageFailed,
    /// Commit failed mid-relocation.
    OutputAtomicCommitFailed,
    /// Rollback itself failed after a failed commit.
    OutputRollbackFailed,

    // -- CLI --
    /// No subcommand was given.
    CliMissingCommand,
    /// An unrecognized subcommand was given.
    CliUnknownCommand,
    /// Argument parsing failed.
    CliArgumentError,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::ParseMissingRequestSheet
            | Self::ParseDuplicateSibling
            | Self::ParseInvalidOccurrence
            | Self::ParseLevelJump
            | Self::ParseMaxDepthExceeded
            | Self::ParseMissingOperationId => ErrorCategory::Parse,

            Self::GenerationProjectionViolation => ErrorCategory::Generation,

            Self::ValidationStructural | Self::ValidationConsistency | Self::ValidationPayload => {
                ErrorCategory::Validation
            }

            Self::ConfigInvalid | Self::ConfigMissingOption => ErrorCategory::Config,

            Self::InputMissingFile | Self::InputInvalidWorkbookShape => ErrorCategory::Input,

            Self::OutputNotWritable
            | Self::OutputInsufficientDiskSpace
            | Self::OutputConsistencyFailed
            | Self::OutputMessageFailed
            | Self::OutputAtomicCommitFailed
            | Self::OutputRollbackFailed => ErrorCategory::Output,

            Self::CliMissingCommand | Self::CliUnknownCommand | Self::CliArgumentError => {
                ErrorCategory::Cli
            }

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// The authoritative process exit code for this error, per the
    /// exit-code table.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::ParseMissingRequestSheet
            | Self::ParseDuplicateSibling
            | Self::ParseInvalidOccurrence
            | Self::ParseLevelJump
            | Self::ParseMaxDepthExceeded
            | Self::ParseMissingOperationId => 10,

            Self::GenerationProjectionViolation => 20,

            Self::ValidationStructural => 30,
            Self::ValidationConsistency => 30,
            Self::ValidationPayload => 30,

            Self::ConfigInvalid | Self::ConfigMissingOption => 40,

            Self::InputMissingFile | Self::InputInvalidWorkbookShape => 50,

            Self::OutputNotWritable => 61,
            Self::OutputInsufficientDiskSpace => 62,
            Self::OutputConsistencyFailed => 63,
            Self::OutputMessageFailed => 64,
            Self::OutputAtomicCommitFailed => 65,
            Self::OutputRollbackFailed => 66,

            Self::CliMissingCommand => 70,
            Self::CliUnknownCommand => 71,
            Self::CliArgumentError => 72,

            Self::Internal => 99,
        }
    }

    /// Stable `&'static str` representation (e.g. `"PARSE_DUPLICATE_SIBLING"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseMissingRequestSheet => "PARSE_MISSING_REQUEST_SHEET",
            Self::ParseDuplicateSibling => "PARSE_DUPLICATE_SIBLING",
            Self::ParseInvalidOccurrence => "PARSE_INVALID_OCCURRENCE",
            Self::ParseLevelJump => "PARSE_LEVEL_JUMP",
            Self::ParseMaxDepthExceeded => "PARSE_MAX_DEPTH_EXCEEDED",
            Self::ParseMissingOperationId => "PARSE_MISSING_OPERATION_ID",
            Self::GenerationProjectionViolation => "GENERATION_PROJECTION_VIOLATION",
            Self::ValidationStructural => "VALIDATION_STRUCTURAL",
            Self::ValidationConsistency => "VALIDATION_CONSISTENCY",
            Self::ValidationPayload => "VALIDATION_PAYLOAD",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::ConfigMissingOption => "CONFIG_MISSING_OPTION",
            Self::InputMissingFile => "INPUT_MISSING_FILE",
            Self::InputInvalidWorkbookShape => "INPUT_INVALID_WORKBOOK_SHAPE",
            Self::OutputNotWritable => "OUTPUT_NOT_WRITABLE",
            Self::OutputInsufficientDiskSpace => "OUTPUT_INSUFFICIENT_DISK_SPACE",
            Self::OutputConsistencyFailed => "OUTPUT_CONSISTENCY_FAILED",
            Self::OutputMessageFailed => "OUTPUT_MESSAGE_FAILED",
            Self::OutputAtomicCommitFailed => "OUTPUT_ATOMIC_COMMIT_FAILED",
            Self::OutputRollbackFailed => "OUTPUT_ROLLBACK_FAILED",
            Self::CliMissingCommand => "CLI_MISSING_COMMAND",
            Self::CliUnknownCommand => "CLI_UNKNOWN_COMMAND",
            Self::CliArgumentError => "CLI_ARGUMENT_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MsgforgeError
// ---------------------------------------------------------------------------

/// Unified `msgforge` error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Examples
///
/// ```
/// use msgforge_error::{MsgforgeError, ErrorCode};
///
/// let err = MsgforgeError::new(ErrorCode::ParseDuplicateSibling, "duplicate field `name`")
///     .with_context("sheet", "Request")
///     .with_context("rows", vec![12, 17]);
/// assert_eq!(err.code.exit_code(), 10);
/// ```
pub struct MsgforgeError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics (sheet, row, field, ...).
    pub context: BTreeMap<String, serde_json::Value>,
}

impl MsgforgeError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if
    /// serialization fails the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Shorthand for `self.code.exit_code()`.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }
}

impl fmt::Debug for MsgforgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("MsgforgeError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for MsgforgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MsgforgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Exit-code fidelity ------------------------------------------

    #[test]
    fn parse_codes_exit_10() {
        assert_eq!(ErrorCode::ParseDuplicateSibling.exit_code(), 10);
        assert_eq!(ErrorCode::ParseMissingOperationId.exit_code(), 10);
    }

    #[test]
    fn output_subcodes_match_table() {
        assert_eq!(ErrorCode::OutputNotWritable.exit_code(), 61);
        assert_eq!(ErrorCode::OutputInsufficientDiskSpace.exit_code(), 62);
        assert_eq!(ErrorCode::OutputConsistencyFailed.exit_code(), 63);
        assert_eq!(ErrorCode::OutputMessageFailed.exit_code(), 64);
        assert_eq!(ErrorCode::OutputAtomicCommitFailed.exit_code(), 65);
        assert_eq!(ErrorCode::OutputRollbackFailed.exit_code(), 66);
    }

    #[test]
    fn cli_codes_match_table() {
        assert_eq!(ErrorCode::CliMissingCommand.exit_code(), 70);
        assert_eq!(ErrorCode::CliUnknownCommand.exit_code(), 71);
        assert_eq!(ErrorCode::CliArgumentError.exit_code(), 72);
    }

    #[test]
    fn internal_is_99() {
        assert_eq!(ErrorCode::Internal.exit_code(), 99);
    }

    // -- 2. Category grouping --------------------------------------------

    #[test]
    fn categories_group_consistently() {
        assert_eq!(ErrorCode::ParseLevelJump.category(), ErrorCategory::Parse);
        assert_eq!(
            ErrorCode::ValidationConsistency.category(),
            ErrorCategory::Validation
        );
        assert_eq!(ErrorCode::OutputRollbackFailed.category(), ErrorCategory::Output);
    }

    // -- 3. Display / context ---------------------------------------------

    #[test]
    fn display_without_context() {
        let err = MsgforgeError::new(ErrorCode::InputMissingFile, "spec.xlsx not found");
        assert_eq!(err.to_string(), "[INPUT_MISSING_FILE] spec.xlsx not found");
    }

    #[test]
    fn display_with_context_is_deterministic() {
        let err = MsgforgeError::new(ErrorCode::ParseInvalidOccurrence, "bad literal")
            .with_context("row", 12)
            .with_context("sheet", "Request");
        let s = err.to_string();
        assert!(s.contains("\"row\":12"));
        assert!(s.contains("\"sheet\":\"Request\""));
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let code = ErrorCode::ParseDuplicateSibling;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""PARSE_DUPLICATE_SIBLING""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
