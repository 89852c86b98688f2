//! Core request-side types

use crate::hierarchy::Role;
use serde::{Deserialize, Serialize};

/// Subject identifier (user id as issued by the authentication layer)
pub type SubjectId = String;

/// Tenant identifier
pub type TenantId = String;

/// Location identifier
pub type LocationId = String;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Subject identifier
    pub id: SubjectId,

    /// Role carried by the authenticated identity
    pub role: Role,

    /// Tenant the subject belongs to
    pub tenant_id: TenantId,

    /// Home location, absent for tenant- and global-scoped roles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
}

impl Subject {
    /// Create a subject without a location
    pub fn new(id: impl Into<String>, role: Role, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            tenant_id: tenant_id.into(),
            location_id: None,
        }
    }

    /// Attach a home location
    pub fn at_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}

/// Resource being acted on
///
/// Tenant and location are optional: an absent tenant is implied by the
/// subject's context, an absent location means the resource is not bound to
/// a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContext {
    /// Resource type (rental, customer, invoice, ...), used for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Resource identifier, used for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Owning tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,

    /// Owning location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
}

impl ResourceContext {
    /// Create a typed resource reference
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            resource_id: Some(resource_id.into()),
            ..Default::default()
        }
    }

    /// Set the owning tenant
    pub fn in_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the owning location
    pub fn at_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}
