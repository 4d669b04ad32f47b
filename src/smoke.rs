//! Fixed smoke-test protocol for one installed version.
//!
//! Five steps, all required, in order: scaffold a project, install its
//! example integration dependencies, run the pipeline, confirm the
//! installed version reports itself, and capture the run-history listing.
//! The listing is the observable state snapshot everything downstream
//! compares against.

use chrono::{DateTime, Utc};
use log::info;

use crate::app::{self, AppEnv};
use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::SmokeTestError;
use crate::features::{self, FeatureGate};

/// Verbatim run-history listing captured at a point in time.
///
/// Compared only for exact textual equality, never parsed. Equality
/// ignores the capture timestamp.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub listing: String,
    pub captured_at: DateTime<Utc>,
}

impl PartialEq for RunRecord {
    fn eq(&self, other: &Self) -> bool {
        self.listing == other.listing
    }
}

impl Eq for RunRecord {}

pub struct SmokeTestRunner<'a> {
    runner: &'a dyn CommandRunner,
    gate: &'a FeatureGate,
}

impl<'a> SmokeTestRunner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, gate: &'a FeatureGate) -> Self {
        SmokeTestRunner { runner, gate }
    }

    /// Execute the full protocol. Any step's non-zero exit aborts the
    /// remaining steps; there is no partial continuation.
    pub fn run(&self, env: &AppEnv) -> Result<RunRecord, SmokeTestError> {
        self.init_project(env)?;
        self.install_integrations(env)?;
        self.run_pipeline(env)?;
        self.check_version(env)?;
        self.capture_history(env)
    }

    /// Step 1: obtain a clean scaffold. Releases new enough to ship an
    /// initializer template use it; older ones fall back to cloning the
    /// fixed external template.
    fn init_project(&self, env: &AppEnv) -> Result<(), SmokeTestError> {
        let spec = if self.gate.supports(features::TEMPLATED_INIT, &env.version) {
            env.app(
                "init-project",
                &[
                    "init",
                    "--template",
                    app::TEMPLATE_NAME,
                    "--template-with-defaults",
                ],
            )
        } else {
            info!("{} predates templated init, cloning fallback template", env.version);
            CommandSpec::new("init-project", "git")
                .args(["clone", "--depth", "1", app::FALLBACK_TEMPLATE_REPO, "."])
                .current_dir(&env.project_dir)
        };
        self.step(&spec).map(|_| ())
    }

    /// Step 2: the scaffold's declared example integration dependencies.
    fn install_integrations(&self, env: &AppEnv) -> Result<(), SmokeTestError> {
        let spec = env.app(
            "install-integrations",
            &["integration", "install", app::EXAMPLE_INTEGRATION, "-y"],
        );
        self.step(&spec).map(|_| ())
    }

    /// Step 3: run the scaffold's pipeline entry point, caching disabled.
    /// Releases with selectable sub-pipelines get both selectors.
    fn run_pipeline(&self, env: &AppEnv) -> Result<(), SmokeTestError> {
        let args: &[&str] = if self.gate.supports(features::PIPELINE_SELECTION, &env.version) {
            &[
                app::PIPELINE_ENTRY_POINT,
                "--feature-pipeline",
                "--training-pipeline",
                "--no-cache",
            ]
        } else {
            &[app::PIPELINE_ENTRY_POINT, "--no-cache"]
        };
        self.step(&env.python("run-pipeline", args)).map(|_| ())
    }

    /// Step 4: the installed application reports its own version. A wiring
    /// sanity check; a venv pointing at the wrong install dies here.
    fn check_version(&self, env: &AppEnv) -> Result<(), SmokeTestError> {
        self.step(&env.app("app-version", &["version"])).map(|_| ())
    }

    /// Step 5: run-history listing with elevated application verbosity,
    /// captured verbatim.
    pub fn capture_history(&self, env: &AppEnv) -> Result<RunRecord, SmokeTestError> {
        let spec = env
            .app("list-runs", &["pipeline", "runs", "list"])
            .env(app::ENV_LOGGING_VERBOSITY, "DEBUG");
        let output = self.step(&spec)?;
        Ok(RunRecord {
            listing: output.stdout,
            captured_at: Utc::now(),
        })
    }

    fn step(&self, spec: &CommandSpec) -> Result<CommandOutput, SmokeTestError> {
        info!("smoke step [{}]: {}", spec.label, spec.rendered());
        let output = self.runner.run(spec).map_err(|err| SmokeTestError {
            step: spec.label.clone(),
            detail: format!("failed to spawn `{}`: {}", spec.program, err),
        })?;
        if !output.success() {
            return Err(SmokeTestError {
                step: spec.label.clone(),
                detail: output.failure_detail(),
            });
        }
        Ok(output)
    }
}
