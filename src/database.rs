//! Database backend model and container lifecycle.

use std::thread;

use log::{info, warn};
use serde::Serialize;

use crate::command::{CommandRunner, CommandSpec};
use crate::config::HarnessConfig;
use crate::features;

/// Client/server engine flavor behind the MySQL wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MySqlEngine {
    MySql,
    MariaDb,
}

impl MySqlEngine {
    pub fn image(self) -> &'static str {
        match self {
            MySqlEngine::MySql => "mysql:8.0",
            MySqlEngine::MariaDb => "mariadb:10.6",
        }
    }

    pub fn container_name(self) -> &'static str {
        match self {
            MySqlEngine::MySql => "migcheck-mysql",
            MySqlEngine::MariaDb => "migcheck-mariadb",
        }
    }
}

/// The store under test: an embedded file-backed database or a
/// containerized MySQL-compatible server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Embedded,
    MySqlCompatible(MySqlEngine),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Embedded => "embedded",
            Backend::MySqlCompatible(MySqlEngine::MySql) => "mysql",
            Backend::MySqlCompatible(MySqlEngine::MariaDb) => "mariadb",
        }
    }

    /// Capability gating which releases this backend is exercised against.
    /// The embedded store has always existed, so it is unfiltered.
    pub fn capability(&self) -> Option<&'static str> {
        match self {
            Backend::Embedded => None,
            Backend::MySqlCompatible(MySqlEngine::MySql) => Some(features::MYSQL),
            Backend::MySqlCompatible(MySqlEngine::MariaDb) => Some(features::MARIADB),
        }
    }

    pub fn is_mysql_compatible(&self) -> bool {
        matches!(self, Backend::MySqlCompatible(_))
    }
}

impl Serialize for Backend {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Starts and stops the backing database process.
///
/// Embedded stores need no process, so both operations are no-ops there.
/// Container-backed stores get a fresh detached container with a
/// deterministic name, a fixed published port, and the root credential
/// from config, followed by a fixed startup grace period. There is no
/// readiness polling; the delay is the inherited trade-off.
pub struct DatabaseLifecycleManager<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a HarnessConfig,
}

impl<'a> DatabaseLifecycleManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a HarnessConfig) -> Self {
        DatabaseLifecycleManager { runner, config }
    }

    pub fn start(&self, backend: &Backend) -> Result<(), crate::error::ProvisionError> {
        let Backend::MySqlCompatible(engine) = backend else {
            return Ok(());
        };

        // A leftover container from an earlier run would collide on name
        // and port; removal is idempotent and absence is not an error.
        self.stop(backend);

        let spec = CommandSpec::new("db-start", "docker")
            .args(["run", "--detach", "--name"])
            .arg(engine.container_name())
            .arg("--publish")
            .arg(format!("{}:3306", self.config.db_port))
            .arg("--env")
            .arg(format!("MYSQL_ROOT_PASSWORD={}", self.config.db_root_password))
            .arg(engine.image());
        let output = self
            .runner
            .run(&spec)
            .map_err(|source| crate::error::ProvisionError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
        if !output.success() {
            return Err(crate::error::ProvisionError::CommandFailed {
                step: "db-start".to_string(),
                code: output.status,
                stderr: output.stderr,
            });
        }

        let grace = self.config.startup_grace();
        if !grace.is_zero() {
            info!(
                "waiting {}s for {} to become ready",
                grace.as_secs(),
                engine.container_name()
            );
            thread::sleep(grace);
        }
        Ok(())
    }

    /// Best-effort stop; never raises.
    pub fn stop(&self, backend: &Backend) {
        let Backend::MySqlCompatible(engine) = backend else {
            return;
        };
        let spec = CommandSpec::new("db-stop", "docker")
            .args(["rm", "--force"])
            .arg(engine.container_name());
        match self.runner.run(&spec) {
            Ok(output) if !output.success() => {
                // Usually just "no such container"; worth a trace, not a failure.
                warn!(
                    "could not remove container {}: {}",
                    engine.container_name(),
                    output.stderr.trim()
                );
            }
            Ok(_) => {}
            Err(err) => warn!("docker unavailable while stopping {}: {}", engine.container_name(), err),
        }
    }

    /// Connection URL handed to the application's `connect` command.
    pub fn connection_url(&self, backend: &Backend) -> Option<String> {
        match backend {
            Backend::Embedded => None,
            Backend::MySqlCompatible(_) => Some(format!(
                "mysql://root:{}@127.0.0.1:{}/{}",
                self.config.db_root_password,
                self.config.db_port,
                crate::app::APP_PACKAGE
            )),
        }
    }
}
