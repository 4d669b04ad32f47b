//! Top-level sequencing engine.
//!
//! For each backend: restart the database server, wipe the application
//! store once, then walk the version list oldest-to-newest so every
//! version upgrades the store its predecessor left behind. Each version
//! passes through Provisioning → SmokeTesting → (BackupVerifying) →
//! Teardown. Any failure halts the entire run, all backends included: a
//! broken upgrade path invalidates confidence in everything after it.

use chrono::{DateTime, Utc};
use colored::Colorize;
use log::{info, warn};
use serde::Serialize;

use crate::backup::BackupRestoreVerifier;
use crate::command::CommandRunner;
use crate::config::HarnessConfig;
use crate::database::{Backend, DatabaseLifecycleManager};
use crate::error::{HarnessError, ProvisionError, VersionParseError};
use crate::features::{self, FeatureGate};
use crate::provision::EnvironmentProvisioner;
use crate::smoke::SmokeTestRunner;
use crate::version::VersionToken;

/// Stage a version failed in, if it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    Provision,
    SmokeTest,
    BackupRestore,
}

/// Result of one (backend, version) cell. Appended in execution order;
/// the sequence is the run's final artifact.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub version: VersionToken,
    pub backend: Backend,
    pub passed: bool,
    pub failure_stage: Option<FailureStage>,
    pub message: String,
}

/// One backend with its support-filtered, `current`-terminated version
/// list. Built once per run and immutable afterwards.
#[derive(Debug, Clone)]
pub struct TestMatrixEntry {
    pub backend: Backend,
    pub versions: Vec<VersionToken>,
}

/// Aggregate result of a whole matrix run.
#[derive(Debug, Serialize)]
pub struct MatrixRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TestOutcome>,
}

impl MatrixRun {
    pub fn passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.passed)
    }
}

pub struct MigrationOrchestrator<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a HarnessConfig,
    gate: FeatureGate,
}

impl<'a> MigrationOrchestrator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a HarnessConfig) -> Self {
        MigrationOrchestrator {
            runner,
            config,
            gate: FeatureGate::with_defaults(),
        }
    }

    pub fn with_gate(mut self, gate: FeatureGate) -> Self {
        self.gate = gate;
        self
    }

    /// Parse the configured version list, append the `current` sentinel if
    /// absent, and filter per backend by its support capability.
    pub fn build_matrix(&self) -> Result<Vec<TestMatrixEntry>, VersionParseError> {
        let mut versions = Vec::with_capacity(self.config.versions.len() + 1);
        for token in &self.config.versions {
            versions.push(VersionToken::parse(token)?);
        }
        if !versions.contains(&VersionToken::Current) {
            versions.push(VersionToken::Current);
        }

        let matrix = self
            .config
            .backends()
            .into_iter()
            .map(|backend| {
                let supported = match backend.capability() {
                    Some(capability) => versions
                        .iter()
                        .filter(|v| self.gate.supports(capability, v))
                        .cloned()
                        .collect(),
                    None => versions.clone(),
                };
                TestMatrixEntry {
                    backend,
                    versions: supported,
                }
            })
            .collect();
        Ok(matrix)
    }

    /// Execute the whole matrix sequentially, halting on first failure.
    pub fn run(&self) -> Result<MatrixRun, VersionParseError> {
        let started_at = Utc::now();
        let matrix = self.build_matrix()?;
        let mut outcomes = Vec::new();

        'backends: for entry in &matrix {
            let lifecycle = DatabaseLifecycleManager::new(self.runner, self.config);
            let provisioner = EnvironmentProvisioner::new(self.runner, self.config);

            println!(
                "{}",
                format!("=== backend: {} ({} versions) ===", entry.backend.name(), entry.versions.len()).bold()
            );

            // Fresh server and empty store at the top of each backend run;
            // both then persist across this backend's versions.
            if let Err(err) = self.prepare_backend(&lifecycle, &provisioner, &entry.backend) {
                let version = entry
                    .versions
                    .first()
                    .cloned()
                    .unwrap_or(VersionToken::Current);
                outcomes.push(failure(version, entry.backend, FailureStage::Provision, &err));
                lifecycle.stop(&entry.backend);
                break 'backends;
            }

            for version in &entry.versions {
                println!("{}", format!("--- {} @ {} ---", entry.backend.name(), version).bold());
                match self.run_version(&lifecycle, &provisioner, &entry.backend, version) {
                    Ok(()) => {
                        println!("{} {} @ {}", "✅".green(), entry.backend.name(), version);
                        outcomes.push(TestOutcome {
                            version: version.clone(),
                            backend: entry.backend,
                            passed: true,
                            failure_stage: None,
                            message: "all stages passed".to_string(),
                        });
                    }
                    Err((stage, err)) => {
                        println!("{} {} @ {}", "❌".red(), entry.backend.name(), version);
                        outcomes.push(failure(version.clone(), entry.backend, stage, &err));
                        lifecycle.stop(&entry.backend);
                        break 'backends;
                    }
                }
            }

            lifecycle.stop(&entry.backend);
        }

        Ok(MatrixRun {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        })
    }

    fn prepare_backend(
        &self,
        lifecycle: &DatabaseLifecycleManager<'_>,
        provisioner: &EnvironmentProvisioner<'_>,
        backend: &Backend,
    ) -> Result<(), HarnessError> {
        provisioner.reset_app_state()?;
        lifecycle.start(backend)?;
        Ok(())
    }

    /// One version's full pass. Errors come back tagged with the stage
    /// they belong to; teardown runs on both exits and never raises.
    fn run_version(
        &self,
        lifecycle: &DatabaseLifecycleManager<'_>,
        provisioner: &EnvironmentProvisioner<'_>,
        backend: &Backend,
        version: &VersionToken,
    ) -> Result<(), (FailureStage, HarnessError)> {
        info!("stage: provisioning");
        let env = provisioner
            .provision(version)
            .map_err(|e| (FailureStage::Provision, e.into()))?;

        let verdict = (|| {
            if let Some(url) = lifecycle.connection_url(backend) {
                self.connect(&env, &url)
                    .map_err(|e| (FailureStage::Provision, e.into()))?;
            }

            info!("stage: smoke testing");
            let smoke = SmokeTestRunner::new(self.runner, &self.gate);
            let before = smoke
                .run(&env)
                .map_err(|e| (FailureStage::SmokeTest, e.into()))?;

            if self.gate.supports(features::BACKUP_RESTORE, version) {
                info!("stage: backup verification");
                let verifier = BackupRestoreVerifier::new(self.runner, &smoke, self.config);
                verifier
                    .verify_all(&before, &env, backend)
                    .map_err(|e| (FailureStage::BackupRestore, e))
            } else {
                info!("backup/restore not supported at {}, skipping", version);
                Ok(())
            }
        })();

        info!("stage: teardown");
        if lifecycle.connection_url(backend).is_some() {
            self.disconnect(&env);
        }
        provisioner.teardown(&env);

        verdict
    }

    fn connect(&self, env: &crate::app::AppEnv, url: &str) -> Result<(), ProvisionError> {
        let spec = env.app("connect", &["connect", "--url", url]);
        let output = self.runner.run(&spec).map_err(|source| ProvisionError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        if !output.success() {
            return Err(ProvisionError::CommandFailed {
                step: "connect".to_string(),
                code: output.status,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Best-effort; a failed disconnect must not mask the real verdict.
    fn disconnect(&self, env: &crate::app::AppEnv) {
        let spec = env.app("disconnect", &["disconnect"]);
        match self.runner.run(&spec) {
            Ok(output) if !output.success() => {
                warn!("disconnect failed: {}", output.stderr.trim());
            }
            Ok(_) => {}
            Err(err) => warn!("disconnect could not run: {}", err),
        }
    }
}

fn failure(
    version: VersionToken,
    backend: Backend,
    stage: FailureStage,
    err: &HarnessError,
) -> TestOutcome {
    TestOutcome {
        version,
        backend,
        passed: false,
        failure_stage: Some(stage),
        message: err.to_string(),
    }
}
