//! Tests for capability gating across the release history

use migcheck::features::{self, FeatureGate, FeatureThreshold};
use migcheck::version::{Version, VersionToken};

fn v(token: &str) -> VersionToken {
    VersionToken::parse(token).unwrap()
}

#[test]
fn test_backup_restore_threshold() {
    let gate = FeatureGate::with_defaults();
    assert!(!gate.supports(features::BACKUP_RESTORE, &v("0.56.3")));
    assert!(gate.supports(features::BACKUP_RESTORE, &v("0.56.4")));
    assert!(gate.supports(features::BACKUP_RESTORE, &v("0.57.1")));
    assert!(gate.supports(features::BACKUP_RESTORE, &VersionToken::Current));
}

#[test]
fn test_templated_init_threshold() {
    let gate = FeatureGate::with_defaults();
    assert!(!gate.supports(features::TEMPLATED_INIT, &v("0.42.1")));
    assert!(gate.supports(features::TEMPLATED_INIT, &v("0.43.0")));
    assert!(gate.supports(features::TEMPLATED_INIT, &VersionToken::Current));
}

#[test]
fn test_pipeline_selection_threshold() {
    let gate = FeatureGate::with_defaults();
    assert!(!gate.supports(features::PIPELINE_SELECTION, &v("0.50.0")));
    assert!(gate.supports(features::PIPELINE_SELECTION, &v("0.52.0")));
}

#[test]
fn test_backend_support_thresholds() {
    let gate = FeatureGate::with_defaults();
    assert!(gate.supports(features::MYSQL, &v("0.44.3")));
    assert!(!gate.supports(features::MARIADB, &v("0.56.4")));
    assert!(gate.supports(features::MARIADB, &v("0.57.0")));
    assert!(gate.supports(features::MARIADB, &VersionToken::Current));
}

#[test]
fn test_unknown_capability_is_unsupported() {
    let gate = FeatureGate::with_defaults();
    assert!(!gate.supports("supports-time-travel", &VersionToken::Current));
    assert!(!gate.supports("supports-time-travel", &v("99.0.0")));
}

#[test]
fn test_known_broken_range_is_excluded() {
    let mut gate = FeatureGate::empty();
    gate.register(
        "supports-flaky-feature",
        FeatureThreshold::introduced_at(Version::new(1, 0, 0)).broken_until(Version::new(1, 2, 0)),
    );
    // Introduced but broken until 1.2.0.
    assert!(!gate.supports("supports-flaky-feature", &v("0.9.0")));
    assert!(!gate.supports("supports-flaky-feature", &v("1.0.0")));
    assert!(!gate.supports("supports-flaky-feature", &v("1.1.9")));
    assert!(gate.supports("supports-flaky-feature", &v("1.2.0")));
    assert!(gate.supports("supports-flaky-feature", &VersionToken::Current));
}

#[test]
fn test_removed_in_current() {
    let mut gate = FeatureGate::empty();
    gate.register(
        "supports-legacy-export",
        FeatureThreshold::introduced_at(Version::new(0, 10, 0)).removed_in_current(),
    );
    assert!(gate.supports("supports-legacy-export", &v("0.10.0")));
    assert!(!gate.supports("supports-legacy-export", &VersionToken::Current));
}

#[test]
fn test_pre_release_sits_below_its_release_threshold() {
    let gate = FeatureGate::with_defaults();
    assert!(!gate.supports(features::BACKUP_RESTORE, &v("0.56.4-rc1")));
}
