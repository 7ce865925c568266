//! Structured, append-only audit log for a single compiler run.
//!
//! An [`AuditLogger`] is opened once per run with a fresh correlation id
//! and the list of input files, then accumulates events for the
//! lifecycle, each phase, transaction-state transitions, and the final
//! exit code. It is finalized to a machine-readable JSON document and a
//! human-readable text rendering, written even when the run rolls back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use msgforge_core::sha256_hex;
use msgforge_error::MsgforgeError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// One structured fact recorded during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The run began.
    RunStarted {
        /// Correlation id for this run.
        correlation_id: String,
    },
    /// An input file was read.
    InputRecorded {
        /// Path as given on the command line, possibly redacted.
        path: String,
        /// Hex-encoded SHA-256 digest, if hashing was requested.
        sha256: Option<String>,
        /// File size in bytes.
        size_bytes: u64,
    },
    /// A phase began.
    PhaseStarted {
        /// Phase name, e.g. `parse`, `generate`, `consistency`.
        phase: String,
    },
    /// A phase finished without aborting the run.
    PhaseCompleted {
        /// Phase name.
        phase: String,
        /// Number of findings/issues the phase produced.
        issue_count: usize,
    },
    /// The output transaction changed state.
    TransactionStateChanged {
        /// New state, e.g. `pending`, `committed`, `rolled_back`.
        state: String,
    },
    /// The run completed successfully.
    RunCompleted,
    /// The run failed.
    RunFailed {
        /// Stable error code of the failure, if available.
        error_code: Option<String>,
        /// Human-readable summary of the first failure.
        message: String,
    },
    /// The process is about to exit with this code.
    ExitCode {
        /// Process exit code.
        code: i32,
    },
}

/// A single timestamped [`AuditEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// UTC timestamp the event was recorded at.
    pub timestamp: DateTime<Utc>,
    /// The event itself.
    pub event: AuditEvent,
}

/// Document shape written to `audit/audit-log.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Correlation id for this run.
    pub correlation_id: String,
    /// Events in chronological order.
    pub entries: Vec<AuditEntry>,
}

/// Append-only recorder for a single run.
///
/// # Examples
///
/// ```
/// use msgforge_audit::AuditLogger;
///
/// let mut log = AuditLogger::new("run-1", false);
/// log.record_phase_started("parse");
/// log.record_phase_completed("parse", 0);
/// let (json, _text) = log.finalize(0, true);
/// assert!(json.contains("run-1"));
/// ```
pub struct AuditLogger {
    correlation_id: String,
    redact_file_paths: bool,
    entries: Vec<AuditEntry>,
}

impl AuditLogger {
    /// Open a new logger with a fresh correlation id, recording
    /// [`AuditEvent::RunStarted`] immediately.
    #[must_use]
    pub fn new(correlation_id: impl Into<String>, redact_file_paths: bool) -> Self {
        let mut logger = Self {
            correlation_id: correlation_id.into(),
            redact_file_paths,
            entries: Vec::new(),
        };
        let correlation_id = logger.correlation_id.clone();
        logger.push(AuditEvent::RunStarted { correlation_id });
        logger
    }

    fn push(&mut self, event: AuditEvent) {
        self.entries.push(AuditEntry {
            timestamp: Utc::now(),
            event,
        });
    }

    fn display_path(&self, path: &Path) -> String {
        if self.redact_file_paths {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "<redacted>".to_string())
        } else {
            path.display().to_string()
        }
    }

    /// Record that `path` was read as an input, optionally hashing its
    /// contents.
    ///
    /// # Errors
    ///
    /// Returns [`MsgforgeError`] (via the caller's own I/O error wrapping)
    /// only indirectly — this method itself does not read the file; pass
    /// the already-read `bytes`.
    pub fn record_input(&mut self, path: &Path, bytes: &[u8], hash_inputs: bool) {
        let sha256 = hash_inputs.then(|| sha256_hex(bytes));
        self.push(AuditEvent::InputRecorded {
            path: self.display_path(path),
            sha256,
            size_bytes: bytes.len() as u64,
        });
    }

    /// Record that a phase began.
    pub fn record_phase_started(&mut self, phase: impl Into<String>) {
        self.push(AuditEvent::PhaseStarted { phase: phase.into() });
    }

    /// Record that a phase completed with `issue_count` findings.
    pub fn record_phase_completed(&mut self, phase: impl Into<String>, issue_count: usize) {
        self.push(AuditEvent::PhaseCompleted {
            phase: phase.into(),
            issue_count,
        });
    }

    /// Record a transaction state transition (`pending`, `committed`,
    /// `rolled_back`).
    pub fn record_transaction_state(&mut self, state: impl Into<String>) {
        self.push(AuditEvent::TransactionStateChanged { state: state.into() });
    }

    /// Record a run failure from a [`MsgforgeError`].
    pub fn record_failure(&mut self, error: &MsgforgeError) {
        self.push(AuditEvent::RunFailed {
            error_code: Some(error.code.as_str().to_string()),
            message: error.message.clone(),
        });
    }

    /// Finalize the log: record [`AuditEvent::RunCompleted`] or
    /// [`AuditEvent::RunFailed`] (only if no failure has been recorded
    /// yet) plus [`AuditEvent::ExitCode`], and render both the JSON and
    /// text representations. Called whether the run committed or rolled
    /// back — the final two events distinguish the two outcomes.
    pub fn finalize(mut self, exit_code: i32, success: bool) -> (String, String) {
        if success {
            self.push(AuditEvent::RunCompleted);
        } else if !self.entries.iter().any(|e| matches!(e.event, AuditEvent::RunFailed { .. })) {
            self.push(AuditEvent::RunFailed {
                error_code: None,
                message: "run failed".to_string(),
            });
        }
        self.push(AuditEvent::ExitCode { code: exit_code });

        let log = AuditLog {
            correlation_id: self.correlation_id.clone(),
            entries: self.entries,
        };
        let json = serde_json::to_string_pretty(&log).unwrap_or_else(|_| "{}".to_string());
        let text = render_text(&log);
        (json, text)
    }
}

fn render_text(log: &AuditLog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "audit log for run {}", log.correlation_id);
    for entry in &log.entries {
        let line = match &entry.event {
            AuditEvent::RunStarted { correlation_id } => format!("run started ({correlation_id})"),
            AuditEvent::InputRecorded { path, sha256, size_bytes } => match sha256 {
                Some(hash) => format!("input `{path}` ({size_bytes} bytes, sha256 {hash})"),
                None => format!("input `{path}` ({size_bytes} bytes)"),
            },
            AuditEvent::PhaseStarted { phase } => format!("phase `{phase}` started"),
            AuditEvent::PhaseCompleted { phase, issue_count } => {
                format!("phase `{phase}` completed ({issue_count} issue(s))")
            }
            AuditEvent::TransactionStateChanged { state } => format!("transaction -> {state}"),
            AuditEvent::RunCompleted => "run completed".to_string(),
            AuditEvent::RunFailed { error_code, message } => match error_code {
                Some(code) => format!("run failed [{code}] {message}"),
                None => format!("run failed: {message}"),
            },
            AuditEvent::ExitCode { code } => format!("exit code {code}"),
        };
        let _ = writeln!(out, "[{}] {line}", entry.timestamp.to_rfc3339());
    }
    out
}
