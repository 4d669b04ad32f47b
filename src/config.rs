//! Harness configuration.
//!
//! Loaded from an optional `migcheck.toml` plus `MIGCHECK`-prefixed
//! environment variables; CLI flags override both. No process-wide
//! environment mutation happens anywhere; the toggles below travel into
//! each spawned command explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::database::{Backend, MySqlEngine};

/// Backend selector accepted from config and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Embedded,
    Mysql,
    Mariadb,
}

impl DatabaseKind {
    pub fn backend(self) -> Backend {
        match self {
            DatabaseKind::Embedded => Backend::Embedded,
            DatabaseKind::Mysql => Backend::MySqlCompatible(MySqlEngine::MySql),
            DatabaseKind::Mariadb => Backend::MySqlCompatible(MySqlEngine::MariaDb),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// Restrict the run to one backend; unset means the full matrix.
    #[serde(default)]
    pub database: Option<DatabaseKind>,

    /// Root of all harness-owned state (project scaffold, virtualenv,
    /// application config, backup artifacts).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Ordered historical release list. The in-development build is always
    /// appended as the mandatory final pass.
    #[serde(default = "default_versions")]
    pub versions: Vec<String>,

    /// Fixed delay after starting a database container. There is no
    /// readiness polling; this trade-off is inherited, not accidental.
    #[serde(default = "default_startup_grace")]
    pub db_startup_grace_secs: u64,

    #[serde(default = "default_root_password")]
    pub db_root_password: String,

    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Telemetry opt-out for the application under test.
    #[serde(default = "default_true")]
    pub disable_telemetry: bool,

    /// Verbose internal logging for the application under test.
    #[serde(default = "default_true")]
    pub verbose_app_logs: bool,

    /// Source tree installed for the `current` pass.
    #[serde(default = "default_current_source")]
    pub current_source_dir: PathBuf,

    /// Optional JSON run-report destination.
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".migcheck-state")
}

fn default_versions() -> Vec<String> {
    [
        "0.44.3", "0.45.6", "0.47.0", "0.50.0", "0.52.0", "0.53.1", "0.55.2", "0.56.4", "0.57.1",
    ]
    .iter()
    .map(|v| v.to_string())
    .collect()
}

fn default_startup_grace() -> u64 {
    30
}

fn default_root_password() -> String {
    "password".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_true() -> bool {
    true
}

fn default_current_source() -> PathBuf {
    PathBuf::from(".")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            database: None,
            state_dir: default_state_dir(),
            versions: default_versions(),
            db_startup_grace_secs: default_startup_grace(),
            db_root_password: default_root_password(),
            db_port: default_db_port(),
            disable_telemetry: true,
            verbose_app_logs: true,
            current_source_dir: default_current_source(),
            report_path: None,
        }
    }
}

impl HarnessConfig {
    /// Load settings from `migcheck.toml` (optional unless a path was
    /// given explicitly) layered under `MIGCHECK__*` environment
    /// variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("migcheck").required(false),
        };
        let settings = Config::builder()
            .add_source(source)
            .add_source(Environment::with_prefix("MIGCHECK").separator("__"))
            .build()?;
        settings.try_deserialize()
    }

    /// Backends selected for this run, in fixed matrix order.
    pub fn backends(&self) -> Vec<Backend> {
        match self.database {
            Some(kind) => vec![kind.backend()],
            None => vec![
                Backend::Embedded,
                Backend::MySqlCompatible(MySqlEngine::MySql),
                Backend::MySqlCompatible(MySqlEngine::MariaDb),
            ],
        }
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.db_startup_grace_secs)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.state_dir.join("backups")
    }

    pub fn app_config_dir(&self) -> PathBuf {
        self.state_dir.join("app-config")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.state_dir.join("project")
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.state_dir.join("venv")
    }
}
