//! Version token parsing and ordering.
//!
//! The harness gates every version-dependent behavior on the total order
//! defined here. Two deliberate departures from full semver precedence are
//! kept from the behavior this harness replays:
//!
//! - pre-release identifiers compare as opaque strings, not as dotted
//!   identifier sequences (a documented approximation);
//! - build metadata is ignored entirely, including for equality.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::VersionParseError;

/// Spelling of the sentinel for the in-development build.
pub const CURRENT: &str = "current";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("version grammar regex")
});

/// A concrete released version.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre_release: None,
            build: None,
        }
    }

    pub fn parse(token: &str) -> Result<Self, VersionParseError> {
        let caps = VERSION_RE.captures(token).ok_or_else(|| VersionParseError {
            token: token.to_string(),
        })?;
        let number = |i: usize| -> Result<u64, VersionParseError> {
            caps.get(i)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .parse()
                .map_err(|_| VersionParseError {
                    token: token.to_string(),
                })
        };
        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre_release: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        // Build metadata does not participate in equality.
        self.major == other.major
            && self.minor == other.minor
            && self.patch == other.patch
            && self.pre_release == other.pre_release
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let numeric = (self.major, self.minor, self.patch).cmp(&(
            other.major,
            other.minor,
            other.patch,
        ));
        if numeric != Ordering::Equal {
            return numeric;
        }
        match (&self.pre_release, &other.pre_release) {
            (None, None) => Ordering::Equal,
            // A release outranks a pre-release of the same numeric version.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            // Opaque string comparison, kept as-is.
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// Either a concrete release or the `current` sentinel, which stands for
/// the in-development build and is newer than every release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionToken {
    Current,
    Release(Version),
}

impl VersionToken {
    pub fn parse(token: &str) -> Result<Self, VersionParseError> {
        if token.eq_ignore_ascii_case(CURRENT) {
            return Ok(VersionToken::Current);
        }
        Version::parse(token).map(VersionToken::Release)
    }

    pub fn is_current(&self) -> bool {
        matches!(self, VersionToken::Current)
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (VersionToken::Current, VersionToken::Current) => Ordering::Equal,
            (VersionToken::Current, VersionToken::Release(_)) => Ordering::Greater,
            (VersionToken::Release(_), VersionToken::Current) => Ordering::Less,
            (VersionToken::Release(a), VersionToken::Release(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for VersionToken {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionToken::parse(s)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionToken::Current => f.write_str(CURRENT),
            VersionToken::Release(v) => v.fmt(f),
        }
    }
}

impl Serialize for VersionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Parse both tokens and order them. Malformed input is a hard error,
/// never a silently-ordered value.
pub fn compare(a: &str, b: &str) -> Result<Ordering, VersionParseError> {
    Ok(VersionToken::parse(a)?.cmp(&VersionToken::parse(b)?))
}
