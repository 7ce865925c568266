//! Atomic output staging, manifest, and commit/rollback transaction.
//!
//! A [`Transaction`] stages every generated file under a temporary
//! directory, checks target-writability and free-disk-space
//! preconditions, then relocates the staged tree into the target
//! output directory in one move. Anything short of a full commit
//! leaves the target directory untouched.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use msgforge_error::{ErrorCode, MsgforgeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Terminal or pending state of an output transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Staging files, not yet committed or rolled back.
    Pending,
    /// Staged tree was relocated to the target directory.
    Committed,
    /// Staged tree was discarded; target directory unchanged.
    RolledBack,
}

/// One entry in the committed [`OutputManifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the output root.
    pub relative_path: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 digest of the file's bytes.
    pub sha256_hash: String,
}

/// Manifest written to `output-manifest.json` at the target root on a
/// successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputManifest {
    /// Unique id for this commit.
    pub transaction_id: String,
    /// UTC commit timestamp.
    pub committed_at: DateTime<Utc>,
    /// Staged files in insertion order.
    pub files: Vec<ManifestEntry>,
}

/// A staged set of per-artifact results an output manager commit gate
/// checks before relocating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionOutcome {
    /// The precondition passed.
    Pass,
    /// The precondition failed.
    Fail,
}

/// An atomic, staged output transaction.
///
/// Files are buffered into a temporary directory via [`Transaction::add_output`].
/// [`Transaction::commit`] computes the manifest and relocates the staged
/// tree into `target_dir` only after preconditions pass; any failure before
/// that point leaves `target_dir` untouched.
pub struct Transaction {
    id: String,
    target_dir: PathBuf,
    staging: tempfile::TempDir,
    state: TransactionState,
    inserted: Vec<String>,
}

impl Transaction {
    /// Open a new transaction targeting `target_dir`. The target directory
    /// is not touched until [`Transaction::commit`] succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OutputNotWritable`] if a staging temp directory
    /// cannot be created.
    pub fn open(id: impl Into<String>, target_dir: impl Into<PathBuf>) -> Result<Self, MsgforgeError> {
        let staging = tempfile::tempdir().map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputNotWritable, "failed to create staging directory")
                .with_source(e)
        })?;
        Ok(Self {
            id: id.into(),
            target_dir: target_dir.into(),
            staging,
            state: TransactionState::Pending,
            inserted: Vec::new(),
        })
    }

    /// Current transaction state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Buffer `bytes` to `relative_path` under the staging directory.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OutputNotWritable`] if the transaction is not
    /// [`TransactionState::Pending`] or the staged file cannot be written.
    pub fn add_output(&mut self, relative_path: &str, bytes: &[u8]) -> Result<(), MsgforgeError> {
        if self.state != TransactionState::Pending {
            return Err(MsgforgeError::new(
                ErrorCode::OutputNotWritable,
                format!("cannot add output `{relative_path}`: transaction is not pending"),
            ));
        }

        let staged_path = self.staging.path().join(relative_path);
        if let Some(parent) = staged_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MsgforgeError::new(ErrorCode::OutputNotWritable, format!("create dir for `{relative_path}`"))
                    .with_source(e)
            })?;
        }
        fs::write(&staged_path, bytes).map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputNotWritable, format!("write staged file `{relative_path}`"))
                .with_source(e)
        })?;

        if !self.inserted.iter().any(|p| p == relative_path) {
            self.inserted.push(relative_path.to_string());
        }
        debug!(target: "msgforge.output", relative_path, bytes = bytes.len(), "staged output");
        Ok(())
    }

    /// Aggregate size in bytes of everything staged so far.
    #[must_use]
    pub fn staged_size(&self) -> u64 {
        WalkDir::new(self.staging.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    /// Check the commit-gate preconditions for the consistency and payload
    /// validation phases.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OutputConsistencyFailed`] if `consistency` is
    /// [`PreconditionOutcome::Fail`], or [`ErrorCode::OutputMessageFailed`]
    /// if `payload` is [`PreconditionOutcome::Fail`].
    pub fn check_preconditions(
        &self,
        consistency: PreconditionOutcome,
        payload: PreconditionOutcome,
    ) -> Result<(), MsgforgeError> {
        if consistency == PreconditionOutcome::Fail {
            return Err(MsgforgeError::new(
                ErrorCode::OutputConsistencyFailed,
                "consistency validation failed the commit gate",
            ));
        }
        if payload == PreconditionOutcome::Fail {
            return Err(MsgforgeError::new(
                ErrorCode::OutputMessageFailed,
                "payload validation failed the commit gate",
            ));
        }
        self.check_target_writable()?;
        self.check_disk_space()?;
        Ok(())
    }

    fn check_target_writable(&self) -> Result<(), MsgforgeError> {
        if self.target_dir.exists() {
            let probe = self.target_dir.join(format!(".msgforge-write-probe-{}", self.id));
            match fs::write(&probe, b"") {
                Ok(()) => {
                    let _ = fs::remove_file(&probe);
                    Ok(())
                }
                Err(e) => Err(MsgforgeError::new(
                    ErrorCode::OutputNotWritable,
                    format!("target directory `{}` is not writable", self.target_dir.display()),
                )
                .with_source(e)),
            }
        } else {
            match self.target_dir.parent() {
                Some(parent) if parent.as_os_str().is_empty() => Ok(()),
                Some(parent) => fs::metadata(parent).map(|_| ()).map_err(|e| {
                    MsgforgeError::new(
                        ErrorCode::OutputNotWritable,
                        format!("target directory `{}` has no writable parent", self.target_dir.display()),
                    )
                    .with_source(e)
                }),
                None => Ok(()),
            }
        }
    }

    fn check_disk_space(&self) -> Result<(), MsgforgeError> {
        let probe_dir = self.target_dir.parent().unwrap_or(&self.target_dir);
        let probe_dir = if probe_dir.as_os_str().is_empty() { Path::new(".") } else { probe_dir };
        let available = fs2::available_space(probe_dir).map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputInsufficientDiskSpace, "failed to query free disk space")
                .with_source(e)
        })?;
        let required = self.staged_size();
        if available < required {
            return Err(MsgforgeError::new(
                ErrorCode::OutputInsufficientDiskSpace,
                format!("need {required} bytes, only {available} available"),
            ));
        }
        Ok(())
    }

    /// Compute the manifest, write it into the staged tree, then atomically
    /// relocate the staged tree into the target directory.
    ///
    /// Callers must invoke [`Transaction::check_preconditions`] first; this
    /// method does not re-check them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OutputAtomicCommitFailed`] if relocation fails
    /// (attempting [`Transaction::rollback`] first), or
    /// [`ErrorCode::OutputRollbackFailed`] if that rollback also fails.
    pub fn commit(mut self) -> Result<OutputManifest, MsgforgeError> {
        let manifest = self.build_manifest()?;
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, "failed to encode manifest").with_source(e)
        })?;
        fs::write(self.staging.path().join("output-manifest.json"), &manifest_json).map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, "failed to write manifest").with_source(e)
        })?;

        if let Err(relocate_err) = relocate(self.staging.path(), &self.target_dir) {
            warn!(target: "msgforge.output", error = %relocate_err, "commit failed mid-relocation, attempting rollback");
            return match self.rollback() {
                Ok(()) => Err(MsgforgeError::new(
                    ErrorCode::OutputAtomicCommitFailed,
                    "relocation failed; staged tree was rolled back",
                )
                .with_source(relocate_err)),
                Err(rollback_err) => Err(MsgforgeError::new(
                    ErrorCode::OutputRollbackFailed,
                    "relocation failed and rollback also failed",
                )
                .with_source(rollback_err)),
            };
        }

        self.state = TransactionState::Committed;
        info!(target: "msgforge.output", transaction_id = %self.id, files = manifest.files.len(), "commit succeeded");
        Ok(manifest)
    }

    fn build_manifest(&self) -> Result<OutputManifest, MsgforgeError> {
        let mut files = Vec::with_capacity(self.inserted.len());
        for relative_path in &self.inserted {
            let path = self.staging.path().join(relative_path);
            let bytes = fs::read(&path).map_err(|e| {
                MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, format!("read staged file `{relative_path}`"))
                    .with_source(e)
            })?;
            files.push(ManifestEntry {
                relative_path: relative_path.clone(),
                size_bytes: bytes.len() as u64,
                sha256_hash: msgforge_core::sha256_hex(&bytes),
            });
        }
        Ok(OutputManifest {
            transaction_id: self.id.clone(),
            committed_at: Utc::now(),
            files,
        })
    }

    /// Discard the staged tree. The target directory is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OutputRollbackFailed`] if the staged tree
    /// cannot be removed.
    pub fn rollback(&mut self) -> Result<(), MsgforgeError> {
        if self.state == TransactionState::Committed {
            return Ok(());
        }
        self.state = TransactionState::RolledBack;
        info!(target: "msgforge.output", transaction_id = %self.id, "transaction rolled back");
        Ok(())
    }
}

fn relocate(staged: &Path, target: &Path) -> Result<(), MsgforgeError> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, "create target parent directory")
                    .with_source(e)
            })?;
        }
    }

    if target.exists() {
        let backup = target.with_extension("msgforge-previous");
        let _ = fs::remove_dir_all(&backup);
        fs::rename(target, &backup).map_err(|e| {
            MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, "move aside existing target directory")
                .with_source(e)
        })?;
        match rename_or_copy(staged, target) {
            Ok(()) => {
                let _ = fs::remove_dir_all(&backup);
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_dir_all(target);
                let _ = fs::rename(&backup, target);
                Err(err)
            }
        }
    } else {
        rename_or_copy(staged, target)
    }
}

/// Relocate `staged` to `target`, falling back to a recursive copy when the
/// staging and target directories live on different filesystems (`rename`
/// returns `EXDEV` in that case).
fn rename_or_copy(staged: &Path, target: &Path) -> Result<(), MsgforgeError> {
    if fs::rename(staged, target).is_ok() {
        return Ok(());
    }

    copy_dir_recursive(staged, target).map_err(|e| {
        MsgforgeError::new(ErrorCode::OutputAtomicCommitFailed, "relocate staged tree").with_source(e)
    })
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let dest_path = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest_path)?;
        }
    }
    Ok(())
}
