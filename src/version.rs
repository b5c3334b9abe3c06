//! API descriptor format versions

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the descriptor format (`{"major": 1, "minor": 1}`).
///
/// Only current-format descriptors carry one; its absence marks the legacy
/// flat format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u64,
    pub minor: u64,
}

/// First format version whose types declare `apiStateKeys`
const API_STATE_KEYS_SINCE: Version = Version::new(1, 1, 0);

impl ApiVersion {
    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// The equivalent semver version (patch is always 0)
    pub fn to_semver(&self) -> Version {
        Version::new(self.major, self.minor, 0)
    }

    /// Whether types in this format declare `apiStateKeys`
    pub fn supports_api_state_keys(&self) -> bool {
        self.to_semver() >= API_STATE_KEYS_SINCE
    }
}

/// Whether an optionally-versioned API supports `apiStateKeys`.
/// Legacy APIs never do.
pub fn supports_api_state_keys(version: Option<&ApiVersion>) -> bool {
    version.is_some_and(ApiVersion::supports_api_state_keys)
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_semver().cmp(&other.to_semver())
    }
}
