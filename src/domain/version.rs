//! Cloud assembly schema versions
//!
//! Format: `MAJOR.MINOR.PATCH` (e.g., `36.0.0`), with an optional pre-release
//! (`-rc.1`) and build metadata (`+abc`). Ordering follows semver precedence:
//! a pre-release sorts below its release and build metadata is dropped.
//!
//! Behaviour that depends on the schema version is resolved once into
//! [`AssemblyCapabilities`](super::AssemblyCapabilities) when an assembly is
//! loaded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VersionError {
    #[error("Invalid version: expected 'MAJOR.MINOR.PATCH', got '{0}'")]
    Invalid(String),
}

/// A semantic version as written in a cloud assembly manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    major: u64,
    minor: u64,
    patch: u64,
    /// Dot-separated pre-release identifiers; empty for a release
    pre: String,
}

impl SchemaVersion {
    /// Schema major version from which nested assemblies are part of selection
    pub const NESTED_ENUMERATION_MAJOR: u64 = 10;

    /// Schema version from which the framework writes its own metadata resource
    pub const FRAMEWORK_ANALYTICS: SchemaVersion = SchemaVersion::new(6, 0, 0);

    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: String::new(),
        }
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn pre_release(&self) -> Option<&str> {
        (!self.pre.is_empty()).then_some(self.pre.as_str())
    }

    /// Version of this toolkit
    pub fn toolkit() -> Self {
        env!("CARGO_PKG_VERSION")
            .parse()
            .unwrap_or(SchemaVersion::new(0, 0, 0))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare_pre_release(&self.pre, &other.pre),
            })
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identifier-wise precedence: numeric identifiers compare numerically and
/// sort below alphanumeric ones; a shorter list of equal prefix sorts first.
fn compare_pre_release(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(m), Ok(n)) => m.cmp(&n),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl FromStr for SchemaVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_build = trimmed.split_once('+').map_or(trimmed, |(v, _)| v);
        let (core, pre) = without_build.split_once('-').unwrap_or((without_build, ""));
        if without_build.contains('-') && pre.split('.').any(str::is_empty) {
            return Err(VersionError::Invalid(trimmed.to_string()));
        }

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::Invalid(trimmed.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| VersionError::Invalid(trimmed.to_string()))
        };

        Ok(Self {
            major: parse(parts[0])?,
            minor: parse(parts[1])?,
            patch: parse(parts[2])?,
            pre: pre.to_string(),
        })
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchemaVersion> for String {
    fn from(version: SchemaVersion) -> Self {
        version.to_string()
    }
}
