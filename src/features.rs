//! Capability gating by version range.
//!
//! Each named capability maps to the release that introduced it, an
//! optional end of a known-broken window, and whether the capability has
//! been removed from the in-development build.

use std::collections::HashMap;

use log::warn;

use crate::version::{Version, VersionToken};

pub const TEMPLATED_INIT: &str = "supports-templated-init";
pub const PIPELINE_SELECTION: &str = "supports-pipeline-selection";
pub const BACKUP_RESTORE: &str = "supports-backup-restore";
pub const MYSQL: &str = "supports-mysql";
pub const MARIADB: &str = "supports-mariadb";

/// Availability window of one capability.
#[derive(Debug, Clone)]
pub struct FeatureThreshold {
    introduced: Version,
    /// Exclusive upper bound of a known-broken range starting at
    /// `introduced`; versions below it do not get the capability.
    broken_until: Option<Version>,
    removed_in_current: bool,
}

impl FeatureThreshold {
    pub fn introduced_at(introduced: Version) -> Self {
        FeatureThreshold {
            introduced,
            broken_until: None,
            removed_in_current: false,
        }
    }

    pub fn broken_until(mut self, fixed: Version) -> Self {
        self.broken_until = Some(fixed);
        self
    }

    pub fn removed_in_current(mut self) -> Self {
        self.removed_in_current = true;
        self
    }
}

/// Answers "is capability F available at version V?".
#[derive(Debug, Clone)]
pub struct FeatureGate {
    thresholds: HashMap<String, FeatureThreshold>,
}

impl FeatureGate {
    pub fn empty() -> Self {
        FeatureGate {
            thresholds: HashMap::new(),
        }
    }

    /// The capability table observed across the application's release
    /// history.
    pub fn with_defaults() -> Self {
        let mut gate = FeatureGate::empty();
        gate.register(
            TEMPLATED_INIT,
            FeatureThreshold::introduced_at(Version::new(0, 43, 0)),
        );
        gate.register(
            PIPELINE_SELECTION,
            FeatureThreshold::introduced_at(Version::new(0, 52, 0)),
        );
        gate.register(
            BACKUP_RESTORE,
            FeatureThreshold::introduced_at(Version::new(0, 56, 4)),
        );
        gate.register(MYSQL, FeatureThreshold::introduced_at(Version::new(0, 40, 0)));
        gate.register(
            MARIADB,
            FeatureThreshold::introduced_at(Version::new(0, 57, 0)),
        );
        gate
    }

    pub fn register(&mut self, capability: impl Into<String>, threshold: FeatureThreshold) {
        self.thresholds.insert(capability.into(), threshold);
    }

    /// Unknown capabilities are treated as unavailable so a typo cannot
    /// silently widen the test protocol.
    pub fn supports(&self, capability: &str, version: &VersionToken) -> bool {
        let Some(threshold) = self.thresholds.get(capability) else {
            warn!("unknown capability `{}`, treating as unsupported", capability);
            return false;
        };
        match version {
            VersionToken::Current => !threshold.removed_in_current,
            VersionToken::Release(v) => {
                if *v < threshold.introduced {
                    return false;
                }
                match &threshold.broken_until {
                    Some(fixed) => v >= fixed,
                    None => true,
                }
            }
        }
    }
}
