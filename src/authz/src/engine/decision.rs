//! Authorization request intent and decision types

use crate::hierarchy::{Role, ScopeLevel};
use crate::permissions::{ConstraintKey, Permission};
use crate::scope::ScopeRequirement;
use crate::session::ElevatedTtl;
use crate::types::{ResourceContext, Subject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// How multiple required permissions combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLogic {
    /// Every permission must be held
    #[default]
    All,
    /// At least one permission must be held
    Any,
}

/// Recent re-verification demanded by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatedAccessRequirement {
    /// Maximum age of the last verification
    pub ttl: ElevatedTtl,
}

/// Caller-supplied magnitude checked against a role's constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintCheck {
    pub permission: Permission,
    pub key: ConstraintKey,
    pub value: f64,

    /// Compare `|value|` instead of `value`
    #[serde(default)]
    pub use_absolute_value: bool,
}

/// Request intent evaluated by the guard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Authenticated caller; `None` when no identity was supplied
    #[serde(default)]
    pub subject: Option<Subject>,

    /// Resource being acted on
    #[serde(default)]
    pub resource: ResourceContext,

    #[serde(default)]
    pub required_permissions: Vec<Permission>,

    #[serde(default)]
    pub permission_logic: PermissionLogic,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeRequirement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevated_access: Option<ElevatedAccessRequirement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ConstraintCheck>,
}

impl AccessRequest {
    /// Start a request for an authenticated subject
    pub fn new(subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..Default::default()
        }
    }

    /// Set the target resource
    pub fn on(mut self, resource: ResourceContext) -> Self {
        self.resource = resource;
        self
    }

    /// Require one more permission
    pub fn require(mut self, permission: Permission) -> Self {
        self.required_permissions.push(permission);
        self
    }

    /// Accept any of the required permissions instead of all
    pub fn any_of(mut self) -> Self {
        self.permission_logic = PermissionLogic::Any;
        self
    }

    /// Declare a scope requirement
    pub fn with_scope(mut self, scope: ScopeRequirement) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Demand verification within `ttl`
    pub fn with_elevated_access(mut self, ttl: ElevatedTtl) -> Self {
        self.elevated_access = Some(ElevatedAccessRequirement { ttl });
        self
    }

    /// Check a magnitude against a constraint
    pub fn with_constraint(mut self, check: ConstraintCheck) -> Self {
        self.constraint = Some(check);
        self
    }
}

/// Machine-readable denial category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialKind {
    UnknownRole,
    PermissionDenied,
    InsufficientScope,
    TenantMismatch,
    LocationMismatch,
    CrossTenantWriteDenied,
    ElevatedAccessRequired,
    ConstraintExceeded,
    MissingSubject,
}

impl DenialKind {
    pub const ALL: [DenialKind; 9] = [
        DenialKind::UnknownRole,
        DenialKind::PermissionDenied,
        DenialKind::InsufficientScope,
        DenialKind::TenantMismatch,
        DenialKind::LocationMismatch,
        DenialKind::CrossTenantWriteDenied,
        DenialKind::ElevatedAccessRequired,
        DenialKind::ConstraintExceeded,
        DenialKind::MissingSubject,
    ];

    /// Stable code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            DenialKind::UnknownRole => "UNKNOWN_ROLE",
            DenialKind::PermissionDenied => "PERMISSION_DENIED",
            DenialKind::InsufficientScope => "INSUFFICIENT_SCOPE",
            DenialKind::TenantMismatch => "TENANT_MISMATCH",
            DenialKind::LocationMismatch => "LOCATION_MISMATCH",
            DenialKind::CrossTenantWriteDenied => "CROSS_TENANT_WRITE_DENIED",
            DenialKind::ElevatedAccessRequired => "ELEVATED_ACCESS_REQUIRED",
            DenialKind::ConstraintExceeded => "CONSTRAINT_EXCEEDED",
            DenialKind::MissingSubject => "MISSING_SUBJECT",
        }
    }

    /// Conventional HTTP status for this denial
    pub fn http_status(&self) -> u16 {
        match self {
            DenialKind::MissingSubject => 401,
            DenialKind::UnknownRole => 500,
            _ => 403,
        }
    }
}

impl fmt::Display for DenialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

/// Why a request was denied, with identifiers only (never secrets)
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Denial {
    #[error("role '{role}' is not defined in the policy")]
    UnknownRole { role: String },

    #[error("missing permissions ({logic:?}): {}", join(.missing))]
    PermissionDenied {
        missing: Vec<Permission>,
        logic: PermissionLogic,
    },

    #[error("role {role} has {actual} scope, {required} required")]
    InsufficientScope {
        role: Role,
        actual: ScopeLevel,
        required: ScopeLevel,
    },

    #[error("subject tenant '{subject_tenant}' does not match resource tenant '{resource_tenant}'")]
    TenantMismatch {
        subject_tenant: String,
        resource_tenant: String,
    },

    #[error(
        "subject location '{}' does not match resource location '{resource_location}'",
        .subject_location.as_deref().unwrap_or("<none>")
    )]
    LocationMismatch {
        subject_location: Option<String>,
        resource_location: String,
    },

    #[error("write from tenant '{subject_tenant}' into tenant '{resource_tenant}' needs an explicit global-write override")]
    CrossTenantWriteDenied {
        subject_tenant: String,
        resource_tenant: String,
    },

    #[error("elevated access required: re-verify within the last {required_ttl_secs}s")]
    ElevatedAccessRequired { required_ttl_secs: u64 },

    #[error("{key} for {permission} exceeded: {value} > {limit}")]
    ConstraintExceeded {
        permission: Permission,
        key: ConstraintKey,
        limit: f64,
        value: f64,
    },

    #[error("no authenticated subject")]
    MissingSubject,
}

fn join(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Denial {
    /// Category of this denial
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::UnknownRole { .. } => DenialKind::UnknownRole,
            Denial::PermissionDenied { .. } => DenialKind::PermissionDenied,
            Denial::InsufficientScope { .. } => DenialKind::InsufficientScope,
            Denial::TenantMismatch { .. } => DenialKind::TenantMismatch,
            Denial::LocationMismatch { .. } => DenialKind::LocationMismatch,
            Denial::CrossTenantWriteDenied { .. } => DenialKind::CrossTenantWriteDenied,
            Denial::ElevatedAccessRequired { .. } => DenialKind::ElevatedAccessRequired,
            Denial::ConstraintExceeded { .. } => DenialKind::ConstraintExceeded,
            Denial::MissingSubject => DenialKind::MissingSubject,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

/// Outcome of one evaluation: allow, or exactly one denial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    /// Unique decision identifier
    pub id: String,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Present iff `allowed` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denial: Option<Denial>,

    /// Evaluation time
    pub timestamp: DateTime<Utc>,
}

impl AuthorizationDecision {
    /// Allow decision
    pub fn allow(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed: true,
            denial: None,
            timestamp,
        }
    }

    /// Deny decision
    pub fn deny(denial: Denial, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed: false,
            denial: Some(denial),
            timestamp,
        }
    }

    /// Denial category, `None` when allowed
    pub fn denial_kind(&self) -> Option<DenialKind> {
        self.denial.as_ref().map(Denial::kind)
    }
}
