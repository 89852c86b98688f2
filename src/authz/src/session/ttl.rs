//! Elevated-access TTL, validated when an operation declares it

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Freshness window for elevated access
///
/// Always within `[MIN, MAX]`; an out-of-range value is rejected when the
/// TTL is declared, so checks never see one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ElevatedTtl(Duration);

impl ElevatedTtl {
    pub const MIN: Duration = Duration::from_secs(1);
    pub const MAX: Duration = Duration::from_secs(60 * 60);
    pub const DEFAULT: ElevatedTtl = ElevatedTtl(Duration::from_secs(5 * 60));

    /// Validate a TTL
    pub fn new(ttl: Duration) -> Result<Self> {
        if ttl < Self::MIN || ttl > Self::MAX {
            return Err(AuthzError::InvalidTtl(format!(
                "{}ms is outside [{}s, {}s]",
                ttl.as_millis(),
                Self::MIN.as_secs(),
                Self::MAX.as_secs()
            )));
        }
        Ok(Self(ttl))
    }

    /// Validate a TTL given in whole seconds
    pub fn from_secs(secs: u64) -> Result<Self> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }

    /// Same window as a `chrono` duration
    pub fn as_chrono(&self) -> chrono::Duration {
        // bounded by MAX, no overflow
        chrono::Duration::milliseconds(self.0.as_millis() as i64)
    }
}

impl Default for ElevatedTtl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u64> for ElevatedTtl {
    type Error = AuthzError;

    fn try_from(secs: u64) -> Result<Self> {
        Self::from_secs(secs)
    }
}

impl From<ElevatedTtl> for u64 {
    fn from(ttl: ElevatedTtl) -> u64 {
        ttl.as_secs()
    }
}

impl fmt::Display for ElevatedTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{}s", self.0.as_secs()))
    }
}
