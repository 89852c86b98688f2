//! Audit sink for authorization events
//!
//! The guard emits an entry for every denial, every elevated-access grant or
//! revocation, and every refused role assignment. Sinks are external
//! collaborators: a failing sink is logged by the guard and never changes a
//! decision.
//!
//! Entries carry identifiers and structured denial detail only; credentials,
//! PINs and tokens never reach this module.

use super::decision::{Denial, DenialKind};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Audit failures; swallowed by the guard
#[derive(Debug, Error)]
pub enum AuditError {
    /// Receiving side of a channel sink is gone
    #[error("audit sink closed")]
    Closed,

    /// Channel sink is at capacity
    #[error("audit sink full, entry dropped")]
    Full,

    /// Backend-specific failure
    #[error("audit backend error: {0}")]
    Backend(String),
}

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    ElevatedAccessGranted,
    ElevatedAccessRevoked,
    PermissionDenied,
    ScopeDenied,
    ElevatedAccessRequired,
    ConstraintViolation,
    MissingSubject,
    PolicyError,
    RoleAssignmentDenied,
}

impl From<DenialKind> for AuditKind {
    fn from(kind: DenialKind) -> Self {
        match kind {
            DenialKind::PermissionDenied => AuditKind::PermissionDenied,
            DenialKind::InsufficientScope
            | DenialKind::TenantMismatch
            | DenialKind::LocationMismatch
            | DenialKind::CrossTenantWriteDenied => AuditKind::ScopeDenied,
            DenialKind::ElevatedAccessRequired => AuditKind::ElevatedAccessRequired,
            DenialKind::ConstraintExceeded => AuditKind::ConstraintViolation,
            DenialKind::MissingSubject => AuditKind::MissingSubject,
            DenialKind::UnknownRole => AuditKind::PolicyError,
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID
    pub id: String,

    pub kind: AuditKind,

    /// Absent only for `MissingSubject`
    pub subject_id: Option<String>,

    pub tenant_id: Option<String>,

    pub resource_type: Option<String>,

    pub resource_id: Option<String>,

    /// Structured detail (denial fields, TTLs, limits)
    pub details: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry with empty detail
    pub fn new(kind: AuditKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            subject_id: None,
            tenant_id: None,
            resource_type: None,
            resource_id: None,
            details: serde_json::Value::Null,
            timestamp,
        }
    }

    /// Entry describing a denial
    pub fn for_denial(denial: &Denial, timestamp: DateTime<Utc>) -> Self {
        let mut entry = Self::new(denial.kind().into(), timestamp);
        entry.details = serde_json::json!({
            "code": denial.code(),
            "message": denial.to_string(),
            "denial": denial,
        });
        entry
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_resource(mut self, resource_type: Option<String>, resource_id: Option<String>) -> Self {
        self.resource_type = resource_type;
        self.resource_id = resource_id;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Writes entries to the `tracing` pipeline under the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        info!(
            target: "audit",
            id = %entry.id,
            kind = ?entry.kind,
            subject = entry.subject_id.as_deref().unwrap_or("-"),
            tenant = entry.tenant_id.as_deref().unwrap_or("-"),
            resource_type = entry.resource_type.as_deref().unwrap_or("-"),
            resource_id = entry.resource_id.as_deref().unwrap_or("-"),
            details = %entry.details,
            "authorization audit event"
        );
        Ok(())
    }
}

/// Bounded in-memory buffer, oldest entries dropped first
#[derive(Debug)]
pub struct MemoryAuditSink {
    buffer: RwLock<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl MemoryAuditSink {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// All buffered entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer.read().iter().cloned().collect()
    }

    /// Entries for one subject
    pub fn by_subject(&self, subject_id: &str) -> Vec<AuditEntry> {
        self.buffer
            .read()
            .iter()
            .filter(|e| e.subject_id.as_deref() == Some(subject_id))
            .cloned()
            .collect()
    }

    /// Entries of one kind
    pub fn by_kind(&self, kind: AuditKind) -> Vec<AuditEntry> {
        self.buffer
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.read().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.write().clear();
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut buffer = self.buffer.write();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
        Ok(())
    }
}

/// Non-blocking sink that hands entries to a background task
///
/// `log` never waits: a full queue drops the entry with [`AuditError::Full`].
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEntry>,
}

impl ChannelAuditSink {
    /// Create the sink and the receiving end of its queue
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl AuditSink for ChannelAuditSink {
    fn log(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.sender.try_send(entry.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AuditError::Full,
            mpsc::error::TrySendError::Closed(_) => AuditError::Closed,
        })
    }
}

/// Drain a channel sink's queue into another sink on the Tokio runtime
///
/// The task ends when every [`ChannelAuditSink`] clone has been dropped.
pub fn spawn_audit_forwarder(
    mut receiver: mpsc::Receiver<AuditEntry>,
    target: Arc<dyn AuditSink>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut forwarded = 0u64;
        while let Some(entry) = receiver.recv().await {
            match target.log(&entry) {
                Ok(()) => forwarded += 1,
                Err(e) => warn!("Audit forwarder dropped entry {}: {}", entry.id, e),
            }
        }
        debug!("Audit forwarder stopped after {} entries", forwarded);
        forwarded
    })
}
