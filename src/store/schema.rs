//! Schema versioning for the target stores.
//!
//! Every store file records which release wrote it. Old files are patched
//! forward by an ordered list of idempotent migrations, each keyed by the
//! release that introduced it, then rewritten with current markers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A dotted release number, up to four parts, missing parts read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber([u16; 4]);

impl VersionNumber {
    pub const fn new(parts: [u16; 4]) -> Self {
        Self(parts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version number {0:?}")]
pub struct InvalidVersion(pub String);

impl FromStr for VersionNumber {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u16; 4];
        let mut count = 0;
        for piece in s.trim().split('.') {
            if count == 4 {
                return Err(InvalidVersion(s.to_string()));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| InvalidVersion(s.to_string()))?;
            count += 1;
        }
        if count == 0 {
            return Err(InvalidVersion(s.to_string()));
        }
        Ok(Self(parts))
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// A released application version that wrote store files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub codename: &'static str,
    pub number: VersionNumber,
}

/// Every release that ever wrote a target store, oldest first.
pub const RELEASES: &[Release] = &[
    Release { codename: "juniper", number: VersionNumber::new([0, 8, 0, 0]) },
    Release { codename: "juniper", number: VersionNumber::new([0, 8, 1, 0]) },
    Release { codename: "kestrel", number: VersionNumber::new([0, 9, 0, 0]) },
    Release { codename: "kestrel", number: VersionNumber::new([0, 9, 2, 0]) },
    Release { codename: "larkspur", number: VersionNumber::new([1, 0, 0, 0]) },
    Release { codename: "meridian", number: VersionNumber::new([1, 1, 0, 0]) },
];

/// The release this build writes into store roots.
pub const CURRENT: Release =
    Release { codename: "meridian", number: VersionNumber::new([1, 1, 0, 0]) };

/// Resolve a (codename, version) marker pair against the registry.
pub fn find_release(codename: &str, version: &str) -> Option<Release> {
    let number: VersionNumber = version.parse().ok()?;
    RELEASES
        .iter()
        .copied()
        .find(|release| release.codename == codename && release.number == number)
}

/// True when the detected marker is anything other than the current release,
/// including missing or unrecognized markers. Outdated files are rewritten
/// with current markers after a successful load.
pub fn is_outdated(codename: Option<&str>, version: Option<&str>) -> bool {
    match (codename, version) {
        (Some(codename), Some(version)) => {
            find_release(codename, version).map_or(true, |release| release != CURRENT)
        }
        _ => true,
    }
}

/// A forward patch for entities read from files older than `introduced_in`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub introduced_in: VersionNumber,
    pub step: MigrationStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    /// The per-target `active` flag first shipped in larkspur 1.0.0. Older
    /// files carry no opinion and absence must not read as "inactive".
    ForceActive,
}

/// All migrations, in introduction order. Adding a future schema change means
/// appending here, not branching in the loader.
pub const MIGRATIONS: &[Migration] = &[Migration {
    introduced_in: VersionNumber::new([1, 0, 0, 0]),
    step: MigrationStep::ForceActive,
}];

/// The steps a file written by `detected` still needs, in introduction order.
pub fn pending_migrations(detected: VersionNumber) -> Vec<MigrationStep> {
    MIGRATIONS
        .iter()
        .filter(|migration| detected < migration.introduced_in)
        .map(|migration| migration.step)
        .collect()
}
