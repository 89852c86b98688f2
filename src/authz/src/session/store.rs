//! Elevated-access session store
//!
//! Keeps one "last verified at" timestamp per subject and answers freshness
//! questions against a TTL supplied per call.

use super::sweep;
use super::ttl::ElevatedTtl;
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthzError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Session store tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStoreConfig {
    /// Run a sweep every this many verifications
    pub sweep_interval: u64,

    /// Entries at least this old are swept; never below [`ElevatedTtl::MAX`]
    #[serde(with = "duration_secs")]
    pub retention: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: 100,
            retention: ElevatedTtl::MAX,
        }
    }
}

impl SessionStoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval == 0 {
            return Err(AuthzError::InvalidConfig(
                "session sweep_interval must be at least 1".to_string(),
            ));
        }
        if self.retention < ElevatedTtl::MAX {
            return Err(AuthzError::InvalidConfig(format!(
                "session retention {}s is shorter than the longest TTL ({}s)",
                self.retention.as_secs(),
                ElevatedTtl::MAX.as_secs()
            )));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Store counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Sessions currently held
    pub active_sessions: usize,
    /// Verifications recorded since creation
    pub verifications: u64,
    /// Sweeps run
    pub sweeps: u64,
    /// Entries removed by sweeps
    pub evicted: u64,
}

/// Per-subject verification timestamps
///
/// # Thread Safety
///
/// Entries live in a `DashMap`: a reader of one subject sees either the old
/// or the new timestamp, and subjects in other shards are never blocked.
/// The sweep removes entries one at a time under their shard lock and
/// re-checks age there, so an entry refreshed after the snapshot survives.
#[derive(Debug)]
pub struct ElevatedAccessStore {
    sessions: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
    config: SessionStoreConfig,
    writes: AtomicU64,
    sweeps: AtomicU64,
    evicted: AtomicU64,
}

impl ElevatedAccessStore {
    /// Store on the wall clock with default tuning
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            clock: Arc::new(SystemClock),
            config: SessionStoreConfig::default(),
            writes: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Store with explicit tuning and time source
    pub fn with_config(config: SessionStoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sessions: DashMap::new(),
            clock,
            config,
            writes: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        })
    }

    /// Store with default tuning on the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ..Self::new()
        }
    }

    /// Current time of the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record a successful re-verification, resetting the window
    pub fn record_verification(&self, subject_id: &str) -> DateTime<Utc> {
        let now = self.clock.now();
        self.sessions.insert(subject_id.to_string(), now);

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % self.config.sweep_interval == 0 {
            self.sweep_at(now);
        }

        now
    }

    /// Last verification of a subject
    pub fn verified_at(&self, subject_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(subject_id).map(|entry| *entry.value())
    }

    /// Whether the subject verified less than `ttl` ago
    pub fn is_fresh(&self, subject_id: &str, ttl: ElevatedTtl) -> bool {
        match self.verified_at(subject_id) {
            Some(verified_at) => self.clock.now() - verified_at < ttl.as_chrono(),
            None => false,
        }
    }

    /// Time left in the window, zero when stale or absent
    pub fn time_remaining(&self, subject_id: &str, ttl: ElevatedTtl) -> Duration {
        self.valid_until(subject_id, ttl)
            .and_then(|until| (until - self.clock.now()).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// End of the window, `None` without a session
    pub fn valid_until(&self, subject_id: &str, ttl: ElevatedTtl) -> Option<DateTime<Utc>> {
        self.verified_at(subject_id)
            .map(|verified_at| verified_at + ttl.as_chrono())
    }

    /// Forget one subject's verification (logout)
    pub fn clear_verification(&self, subject_id: &str) -> bool {
        self.sessions.remove(subject_id).is_some()
    }

    /// Forget every verification
    pub fn clear_all(&self) {
        self.sessions.clear();
    }

    /// Number of sessions held
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sweep expired entries at the current time
    pub fn sweep_now(&self) -> usize {
        self.sweep_at(self.clock.now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let snapshot: Vec<(String, DateTime<Utc>)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let expired = sweep::expired_subjects(
            snapshot.iter().map(|(k, v)| (k.as_str(), *v)),
            now,
            self.config.retention,
        );

        let retention = self.config.retention;
        let removed = expired
            .iter()
            .filter(|subject| {
                self.sessions
                    .remove_if(subject.as_str(), |_, verified_at| {
                        sweep::is_expired(*verified_at, now, retention)
                    })
                    .is_some()
            })
            .count();

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(removed as u64, Ordering::Relaxed);

        debug!(
            "Session sweep removed {} of {} entries",
            removed,
            snapshot.len()
        );
        removed
    }

    /// Counters
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_sessions: self.sessions.len(),
            verifications: self.writes.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for ElevatedAccessStore {
    fn default() -> Self {
        Self::new()
    }
}
