//! Per-version environment provisioning.
//!
//! Each version gets a fresh virtualenv and an empty scaffold directory;
//! the application config directory is left alone here since the store it
//! holds must carry over from version to version. Teardown is best-effort
//! and never raises, since it runs on the failure path too.

use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use crate::app::{self, AppEnv};
use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::config::HarnessConfig;
use crate::error::ProvisionError;
use crate::version::VersionToken;

pub struct EnvironmentProvisioner<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a HarnessConfig,
}

impl<'a> EnvironmentProvisioner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a HarnessConfig) -> Self {
        EnvironmentProvisioner { runner, config }
    }

    /// Install one version of the application into a clean environment.
    ///
    /// `current` installs the working copy instead of a pinned release.
    pub fn provision(&self, version: &VersionToken) -> Result<AppEnv, ProvisionError> {
        info!("provisioning environment for {}", version);
        reset_dir(&self.config.project_dir())?;
        remove_dir(&self.config.venv_dir())?;
        fs::create_dir_all(self.config.backups_dir()).map_err(|source| {
            ProvisionError::Workspace {
                path: self.config.backups_dir(),
                source,
            }
        })?;

        let venv = CommandSpec::new("create-venv", "python3")
            .args(["-m", "venv"])
            .arg(self.config.venv_dir().display().to_string());
        self.checked(&venv)?;

        let env = AppEnv::new(version.clone(), self.config);

        let install = match version {
            VersionToken::Current => env.pip(
                "install-app",
                &[
                    "install",
                    "--quiet",
                    "-e",
                    &self.config.current_source_dir.display().to_string(),
                ],
            ),
            VersionToken::Release(release) => env.pip(
                "install-app",
                &[
                    "install",
                    "--quiet",
                    &format!("{}=={}", app::APP_PACKAGE, release),
                ],
            ),
        };
        self.checked(&install)?;

        let mut aux_args = vec!["install", "--quiet"];
        aux_args.extend(app::AUX_REQUIREMENTS.iter().copied());
        self.checked(&env.pip("install-aux-deps", &aux_args))?;

        Ok(env)
    }

    /// Wipe the application's own config/store directory. Done once per
    /// backend run, before the oldest version starts; the store then
    /// persists across versions so each upgrade migrates real state.
    pub fn reset_app_state(&self) -> Result<(), ProvisionError> {
        reset_dir(&self.config.app_config_dir())
    }

    /// Best-effort removal of everything provision created.
    pub fn teardown(&self, env: &AppEnv) {
        for path in [&env.project_dir, &self.config.venv_dir()] {
            if let Err(err) = fs::remove_dir_all(path) {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("could not remove {}: {}", path.display(), err);
                }
            }
        }
    }

    fn checked(&self, spec: &CommandSpec) -> Result<CommandOutput, ProvisionError> {
        let output = self.runner.run(spec).map_err(|source| ProvisionError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        if !output.success() {
            return Err(ProvisionError::CommandFailed {
                step: spec.label.clone(),
                code: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

fn remove_dir(path: &Path) -> Result<(), ProvisionError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ProvisionError::Workspace {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn reset_dir(path: &Path) -> Result<(), ProvisionError> {
    remove_dir(path)?;
    fs::create_dir_all(path).map_err(|source| ProvisionError::Workspace {
        path: path.to_path_buf(),
        source,
    })
}
