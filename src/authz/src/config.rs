//! Guard configuration loading and validation
//!
//! ```toml
//! [session]
//! sweep_interval = 100
//! retention_secs = 3600
//! default_ttl_secs = 300
//!
//! [audit]
//! enabled = true
//! sink = "channel"
//! channel_capacity = 1024
//!
//! [[constraint_overrides]]
//! role = "BOLTVEZETO"
//! permission = "rental:discount"
//! key = "discount_limit"
//! value = 25
//! ```
//!
//! Only constraint values are configurable; roles and permissions stay
//! compiled in.

use crate::clock::Clock;
use crate::engine::{
    spawn_audit_forwarder, AuditSink, AuthorizationGuard, ChannelAuditSink, MemoryAuditSink,
    TracingAuditSink,
};
use crate::error::{AuthzError, Result};
use crate::operations::OperationRegistry;
use crate::policy::{ConstraintOverride, Policy};
use crate::session::{ElevatedAccessStore, ElevatedTtl, SessionStoreConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Complete guard configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub audit: AuditSection,

    #[serde(default)]
    pub constraint_overrides: Vec<ConstraintOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Window applied to every reference operation that demands re-verification
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

/// Where audit entries go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// `tracing` events on the `audit` target
    #[default]
    Tracing,
    /// Bounded in-process buffer
    Memory,
    /// Bounded queue drained into `tracing` by a Tokio task
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuditSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub sink: AuditSinkKind,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            retention_secs: default_retention_secs(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sink: AuditSinkKind::default(),
            channel_capacity: default_channel_capacity(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_sweep_interval() -> u64 { 100 }
fn default_retention_secs() -> u64 { ElevatedTtl::MAX.as_secs() }
fn default_ttl_secs() -> u64 { ElevatedTtl::DEFAULT.as_secs() }
fn default_channel_capacity() -> usize { 1024 }
fn default_memory_capacity() -> usize { MemoryAuditSink::DEFAULT_CAPACITY }

impl GuardConfig {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: GuardConfig = contents.parse()?;
        info!("Loaded guard configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.session_store_config().validate()?;
        self.default_ttl()?;

        if self.audit.enabled {
            if self.audit.sink == AuditSinkKind::Channel && self.audit.channel_capacity == 0 {
                return Err(AuthzError::InvalidConfig(
                    "audit channel_capacity must be at least 1".to_string(),
                ));
            }
            if self.audit.sink == AuditSinkKind::Memory && self.audit.memory_capacity == 0 {
                return Err(AuthzError::InvalidConfig(
                    "audit memory_capacity must be at least 1".to_string(),
                ));
            }
        }

        // Applies and checks every override
        self.policy()?;
        Ok(())
    }

    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig {
            sweep_interval: self.session.sweep_interval,
            retention: Duration::from_secs(self.session.retention_secs),
        }
    }

    pub fn default_ttl(&self) -> Result<ElevatedTtl> {
        ElevatedTtl::from_secs(self.session.default_ttl_secs)
    }

    /// Reference policy with the configured overrides applied
    pub fn policy(&self) -> Result<Policy> {
        Policy::reference().with_overrides(&self.constraint_overrides)
    }

    /// Audit sink per the `[audit]` section, `None` when disabled
    ///
    /// The channel sink spawns its forwarder, so it needs a Tokio runtime.
    pub fn audit_sink(&self) -> Result<Option<Arc<dyn AuditSink>>> {
        if !self.audit.enabled {
            return Ok(None);
        }

        let sink: Arc<dyn AuditSink> = match self.audit.sink {
            AuditSinkKind::Tracing => Arc::new(TracingAuditSink),
            AuditSinkKind::Memory => Arc::new(MemoryAuditSink::with_capacity(self.audit.memory_capacity)),
            AuditSinkKind::Channel => {
                if tokio::runtime::Handle::try_current().is_err() {
                    return Err(AuthzError::InvalidConfig(
                        "channel audit sink requires a Tokio runtime".to_string(),
                    ));
                }
                let (sink, receiver) = ChannelAuditSink::new(self.audit.channel_capacity);
                spawn_audit_forwarder(receiver, Arc::new(TracingAuditSink));
                Arc::new(sink)
            }
        };
        Ok(Some(sink))
    }

    /// Validate and assemble a guard with the reference operations
    pub fn build_guard(&self, clock: Arc<dyn Clock>) -> Result<AuthorizationGuard> {
        self.validate()?;

        let sessions = Arc::new(ElevatedAccessStore::with_config(
            self.session_store_config(),
            clock,
        )?);

        let mut builder = AuthorizationGuard::builder(self.policy()?)
            .session_store(sessions)
            .operations(OperationRegistry::reference_with_ttl(self.default_ttl()?));

        if let Some(sink) = self.audit_sink()? {
            builder = builder.audit_sink(sink);
        }

        builder.build()
    }
}

impl FromStr for GuardConfig {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
