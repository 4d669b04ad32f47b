//! Command surface of the application under test.
//!
//! The pipeline application is a black box reached only through its CLI;
//! this module pins down the names, flags, and environment toggles that
//! contract consists of, and owns [`AppEnv`], the per-version installed
//! environment every command runs inside.

use std::path::PathBuf;

use crate::command::CommandSpec;
use crate::config::HarnessConfig;
use crate::version::VersionToken;

/// Package name resolved by the installer.
pub const APP_PACKAGE: &str = "mlpipe";
/// Entry point installed into the virtualenv bin directory.
pub const APP_BINARY: &str = "mlpipe";
/// Integration whose example dependencies the smoke scaffold declares.
pub const EXAMPLE_INTEGRATION: &str = "sklearn";
/// Template requested from the application's own initializer.
pub const TEMPLATE_NAME: &str = "starter";
/// Fallback scaffold source for releases predating templated init.
pub const FALLBACK_TEMPLATE_REPO: &str = "https://github.com/mlpipe-dev/template-starter.git";
/// Scaffold pipeline entry point.
pub const PIPELINE_ENTRY_POINT: &str = "run.py";
/// Auxiliary dependency pins installed alongside every release.
pub const AUX_REQUIREMENTS: &[&str] = &["pydantic<2.0", "sqlalchemy<2.0"];

pub const ENV_ANALYTICS_OPT_IN: &str = "MLPIPE_ANALYTICS_OPT_IN";
pub const ENV_DEBUG: &str = "MLPIPE_DEBUG";
pub const ENV_LOGGING_VERBOSITY: &str = "MLPIPE_LOGGING_VERBOSITY";
pub const ENV_CONFIG_PATH: &str = "MLPIPE_CONFIG_PATH";

/// One provisioned installation of the application.
///
/// Owns the scaffold project directory and the virtualenv, and carries the
/// base environment applied to every command: telemetry opt-out, verbose
/// internal logging, and the application config path. The config path
/// deliberately lives outside the per-version directories so the
/// application's store survives from one version to the next.
#[derive(Debug, Clone)]
pub struct AppEnv {
    pub version: VersionToken,
    pub project_dir: PathBuf,
    venv_bin: PathBuf,
    base_env: Vec<(String, String)>,
}

impl AppEnv {
    pub fn new(version: VersionToken, config: &HarnessConfig) -> Self {
        let mut base_env = vec![(
            ENV_CONFIG_PATH.to_string(),
            config.app_config_dir().display().to_string(),
        )];
        if config.disable_telemetry {
            base_env.push((ENV_ANALYTICS_OPT_IN.to_string(), "false".to_string()));
        }
        if config.verbose_app_logs {
            base_env.push((ENV_DEBUG.to_string(), "true".to_string()));
        }
        AppEnv {
            version,
            project_dir: config.project_dir(),
            venv_bin: config.venv_dir().join("bin"),
            base_env,
        }
    }

    fn tool(&self, name: &str) -> String {
        self.venv_bin.join(name).display().to_string()
    }

    /// An application CLI invocation, run from the scaffold directory.
    pub fn app(&self, label: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(label, self.tool(APP_BINARY))
            .args(args.iter().copied())
            .current_dir(&self.project_dir)
            .envs(self.base_env.iter().cloned())
    }

    /// The virtualenv's interpreter, run from the scaffold directory.
    pub fn python(&self, label: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(label, self.tool("python"))
            .args(args.iter().copied())
            .current_dir(&self.project_dir)
            .envs(self.base_env.iter().cloned())
    }

    /// The virtualenv's installer.
    pub fn pip(&self, label: &str, args: &[&str]) -> CommandSpec {
        CommandSpec::new(label, self.tool("pip")).args(args.iter().copied())
    }
}
