//! Tests for the backup/restore consistency verifier

use migcheck::app::AppEnv;
use migcheck::backup::{BackupMode, BackupRestoreVerifier};
use migcheck::database::{Backend, MySqlEngine};
use migcheck::error::HarnessError;
use migcheck::features::FeatureGate;
use migcheck::smoke::SmokeTestRunner;
use migcheck::test_helpers::ScriptedRunner;
use migcheck::version::VersionToken;
use migcheck::HarnessConfig;

fn test_config(state_dir: &std::path::Path) -> HarnessConfig {
    HarnessConfig {
        state_dir: state_dir.to_path_buf(),
        ..HarnessConfig::default()
    }
}

fn app_env(config: &HarnessConfig) -> AppEnv {
    AppEnv::new(VersionToken::parse("0.56.4").unwrap(), config)
}

#[test]
fn test_unchanged_state_passes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1: training (completed)\n");

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    verifier
        .verify(&before, &env, BackupMode::FileDump)
        .unwrap();
    assert_eq!(runner.count("backup-database"), 1);
    assert_eq!(runner.count("restore-database"), 1);
}

#[test]
fn test_verify_is_idempotent_with_unchanged_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\n");

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    verifier.verify(&before, &env, BackupMode::FileDump).unwrap();
    verifier.verify(&before, &env, BackupMode::FileDump).unwrap();
}

#[test]
fn test_divergent_history_is_a_consistency_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\nrun 2\n");
    runner.stdout_for("list-runs", "run 1\n");

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();
    assert_eq!(before.listing, "run 1\nrun 2\n");

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    let err = verifier
        .verify(&before, &env, BackupMode::FileDump)
        .unwrap_err();
    match err {
        HarnessError::Consistency(consistency) => {
            assert_eq!(consistency.before.listing, "run 1\nrun 2\n");
            assert_eq!(consistency.after.listing, "run 1\n");
            // Both snapshots are echoed in the message for diagnosis.
            let message = consistency.to_string();
            assert!(message.contains("--- before backup ---"));
            assert!(message.contains("--- after restore ---"));
            assert!(message.contains("run 2"));
        }
        other => panic!("expected ConsistencyError, got {:?}", other),
    }
}

#[test]
fn test_mysql_compatible_backends_verify_both_modes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\n");

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    verifier
        .verify_all(&before, &env, &Backend::MySqlCompatible(MySqlEngine::MySql))
        .unwrap();

    assert_eq!(runner.count("backup-database"), 2);
    assert_eq!(runner.count("restore-database"), 2);
    let strategies: Vec<String> = runner
        .calls()
        .into_iter()
        .filter(|c| c.label == "backup-database")
        .map(|c| c.args[2].clone())
        .collect();
    assert_eq!(strategies, ["dump-file", "database"]);
}

#[test]
fn test_embedded_backend_verifies_dump_file_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\n");

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    verifier.verify_all(&before, &env, &Backend::Embedded).unwrap();

    assert_eq!(runner.count("backup-database"), 1);
}

#[test]
fn test_stale_dump_artifact_is_removed_before_backup() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(config.backups_dir()).unwrap();
    let stale = config.backups_dir().join("mlpipe-backup.sql");
    std::fs::write(&stale, "leftover dump").unwrap();

    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\n");
    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    verifier.verify(&before, &env, BackupMode::FileDump).unwrap();

    assert!(!stale.exists(), "stale artifact must not survive the cycle");
}

#[test]
fn test_failing_backup_command_reports_the_step() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new();
    runner.stdout_for("list-runs", "run 1\n");
    runner.fail_on("backup-database", 1);

    let gate = FeatureGate::with_defaults();
    let smoke = SmokeTestRunner::new(&runner, &gate);
    let env = app_env(&config);
    let before = smoke.capture_history(&env).unwrap();

    let verifier = BackupRestoreVerifier::new(&runner, &smoke, &config);
    let err = verifier
        .verify(&before, &env, BackupMode::FileDump)
        .unwrap_err();
    match err {
        HarnessError::SmokeTest(step_err) => {
            assert_eq!(step_err.step, "backup-database");
        }
        other => panic!("expected step failure, got {:?}", other),
    }
    // A failed backup never reaches the restore.
    assert_eq!(runner.count("restore-database"), 0);
}
