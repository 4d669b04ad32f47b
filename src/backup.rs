//! Backup/restore consistency verification.
//!
//! A cycle is: drop any stale artifact, back up, restore from the same
//! artifact, recapture the run history, and require byte-for-byte
//! equality with the pre-backup snapshot. MySQL-compatible backends run
//! the cycle twice, once with the portable dump file and once with the
//! engine-native strategy, and both must pass independently. A mismatch
//! is fatal for the whole run and is never retried: restore is assumed
//! deterministic given identical input, so a second attempt could only
//! hide the regression.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use log::info;
use serde::Serialize;

use crate::app::{self, AppEnv};
use crate::command::CommandRunner;
use crate::config::HarnessConfig;
use crate::database::Backend;
use crate::error::{ConsistencyError, HarnessError, SmokeTestError};
use crate::smoke::{RunRecord, SmokeTestRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupMode {
    /// Portable single-file dump, works on every backend.
    FileDump,
    /// Engine-native copy into a sibling backup database.
    DatabaseNative,
}

impl BackupMode {
    pub fn strategy_flag(&self) -> &'static str {
        match self {
            BackupMode::FileDump => "dump-file",
            BackupMode::DatabaseNative => "database",
        }
    }
}

impl fmt::Display for BackupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy_flag())
    }
}

pub struct BackupRestoreVerifier<'a> {
    runner: &'a dyn CommandRunner,
    smoke: &'a SmokeTestRunner<'a>,
    config: &'a HarnessConfig,
}

impl<'a> BackupRestoreVerifier<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        smoke: &'a SmokeTestRunner<'a>,
        config: &'a HarnessConfig,
    ) -> Self {
        BackupRestoreVerifier { runner, smoke, config }
    }

    /// Run every backup mode the backend supports against the same
    /// pre-backup snapshot.
    pub fn verify_all(
        &self,
        before: &RunRecord,
        env: &AppEnv,
        backend: &Backend,
    ) -> Result<(), HarnessError> {
        self.verify(before, env, BackupMode::FileDump)?;
        if backend.is_mysql_compatible() {
            self.verify(before, env, BackupMode::DatabaseNative)?;
        }
        Ok(())
    }

    /// One backup/restore cycle in the given mode.
    pub fn verify(
        &self,
        before: &RunRecord,
        env: &AppEnv,
        mode: BackupMode,
    ) -> Result<(), HarnessError> {
        info!("backup/restore cycle ({}) for {}", mode, env.version);
        self.remove_stale_artifact(mode)?;

        let location = self.artifact_location(mode);
        self.command(
            env,
            "backup-database",
            &["backup-database", "--strategy", mode.strategy_flag(), "--location", &location],
        )?;
        self.command(
            env,
            "restore-database",
            &["restore-database", "--strategy", mode.strategy_flag(), "--location", &location],
        )?;

        let after = self.smoke.capture_history(env)?;
        if after != *before {
            return Err(ConsistencyError {
                mode,
                before: before.clone(),
                after,
            }
            .into());
        }
        Ok(())
    }

    /// Artifact naming: a dump file under the harness backups directory,
    /// or a backup database name for the engine-native strategy.
    fn artifact_location(&self, mode: BackupMode) -> String {
        match mode {
            BackupMode::FileDump => self.dump_file().display().to_string(),
            BackupMode::DatabaseNative => format!("{}-backup", app::APP_PACKAGE),
        }
    }

    fn dump_file(&self) -> PathBuf {
        self.config.backups_dir().join(format!("{}-backup.sql", app::APP_PACKAGE))
    }

    /// A stale dump from an earlier cycle must not satisfy the restore.
    fn remove_stale_artifact(&self, mode: BackupMode) -> Result<(), HarnessError> {
        if mode != BackupMode::FileDump {
            // The native strategy overwrites its backup database itself.
            return Ok(());
        }
        match fs::remove_file(self.dump_file()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SmokeTestError {
                step: "backup-database".to_string(),
                detail: format!("could not remove stale artifact: {}", err),
            }
            .into()),
        }
    }

    fn command(&self, env: &AppEnv, step: &str, args: &[&str]) -> Result<(), HarnessError> {
        let spec = env.app(step, args);
        let output = self.runner.run(&spec).map_err(|err| SmokeTestError {
            step: step.to_string(),
            detail: format!("failed to spawn `{}`: {}", spec.program, err),
        })?;
        if !output.success() {
            return Err(SmokeTestError {
                step: step.to_string(),
                detail: output.failure_detail(),
            }
            .into());
        }
        Ok(())
    }
}
