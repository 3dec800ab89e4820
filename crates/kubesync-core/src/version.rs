//! Control-plane version model

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

static GIT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)\.(\d+)").expect("valid regex"));

/// API server version as (major, minor)
///
/// Patch levels are not modeled. Ordering is lexicographic on (major, minor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    /// Assumed when the server does not report a usable version
    pub const DEFAULT: ServerVersion = ServerVersion::new(1, 8);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the `major`/`minor` strings reported by the server
    ///
    /// Only the leading digits count, so providers that report `"27+"` still parse.
    pub fn parse(major: &str, minor: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidVersion {
            major: major.to_string(),
            minor: minor.to_string(),
        };

        let leading = |s: &str| -> Option<u32> {
            LEADING_DIGITS
                .captures(s.trim())
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        };

        let major_num = leading(major).ok_or_else(invalid)?;
        let minor_num = leading(minor).ok_or_else(invalid)?;
        Ok(Self::new(major_num, minor_num))
    }

    /// Parse a git version such as `v1.31.2-gke.1000`
    pub fn parse_git_version(git_version: &str) -> Result<Self> {
        let caps = GIT_VERSION
            .captures(git_version.trim())
            .ok_or_else(|| CoreError::InvalidVersion {
                major: git_version.to_string(),
                minor: String::new(),
            })?;

        let part = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };
        match (part(1), part(2)) {
            (Some(major), Some(minor)) => Ok(Self::new(major, minor)),
            _ => Err(CoreError::InvalidVersion {
                major: git_version.to_string(),
                minor: String::new(),
            }),
        }
    }

    /// Compare against a bare (major, minor) pair
    pub fn compare(&self, major: u32, minor: u32) -> Ordering {
        self.cmp(&Self::new(major, minor))
    }

    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        self.compare(major, minor) != Ordering::Less
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}
