//! Error types for the upgrade verification harness.
//!
//! Every failure here is terminal for the run: the harness never retries an
//! external action, since a retry could mask a real regression in the
//! upgrade path.

use std::path::PathBuf;

use thiserror::Error;

use crate::backup::BackupMode;
use crate::smoke::RunRecord;

/// Malformed version token. Never downgraded to a default ordering.
#[derive(Debug, Clone, Error)]
#[error("malformed version token `{token}` (expected MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD] or `current`)")]
pub struct VersionParseError {
    pub token: String,
}

/// Environment or database failed to come up.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The external program could not be spawned at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A provisioning command ran but exited non-zero.
    #[error("provisioning step `{step}` exited with status {code:?}:\n{stderr}")]
    CommandFailed {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The harness could not reset one of its own state directories.
    #[error("failed to reset `{path}`: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A step of the smoke-test protocol failed. Tagged with the step name so
/// the failing stage is visible without rerunning.
#[derive(Debug, Error)]
#[error("smoke test step `{step}` failed: {detail}")]
pub struct SmokeTestError {
    pub step: String,
    pub detail: String,
}

/// Post-restore state diverged from the pre-backup snapshot.
///
/// Carries both run-history listings verbatim; the display output echoes
/// them in full so the first divergent line is diagnosable from the log.
#[derive(Debug)]
pub struct ConsistencyError {
    pub mode: BackupMode,
    pub before: RunRecord,
    pub after: RunRecord,
}

impl std::fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "run history diverged after {} backup/restore cycle\n\
             --- before backup ---\n{}\n\
             --- after restore ---\n{}",
            self.mode, self.before.listing, self.after.listing
        )
    }
}

impl std::error::Error for ConsistencyError {}

/// Umbrella error for the orchestrator and the binary.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Parse(#[from] VersionParseError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    SmokeTest(#[from] SmokeTestError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}
