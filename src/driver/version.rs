//! Npcap version parsing and the compatibility gate.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("version pattern is valid"));

/// A `major.minor` driver version. Ordering is major first, then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverVersion {
    pub major: u32,
    pub minor: u32,
}

impl DriverVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a version string whose first two dot-separated components are numeric,
    /// e.g. `1.60` or `1.79.0.0`. Returns `None` otherwise.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next()?.trim().parse().ok()?;
        Some(Self { major, minor })
    }

    /// Extract the first `digits.digits` pair found anywhere in `text`, such as the
    /// output of `reg query` or a file-version query.
    pub fn find_in(text: &str) -> Option<Self> {
        VERSION_PATTERN.captures_iter(text).find_map(|caps| {
            let major = caps[1].parse().ok()?;
            let minor = caps[2].parse().ok()?;
            Some(Self { major, minor })
        })
    }

    pub fn satisfies(&self, required: &DriverVersion) -> bool {
        self >= required
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// True iff `current` is at least `required`. Either string failing to parse into
/// two numeric components makes the pair incompatible.
pub fn is_compatible(current: &str, required: &str) -> bool {
    tracing::debug!("Checking version compatibility: current {current}, required {required}");
    let (Some(current), Some(required)) =
        (DriverVersion::parse(current), DriverVersion::parse(required))
    else {
        tracing::debug!("Invalid version format");
        return false;
    };
    let compatible = current.satisfies(&required);
    tracing::debug!("Version compatibility result: {compatible}");
    compatible
}
