/// Tenant/location scope evaluation
///
/// Decides whether a subject may reach a resource given the role's scope,
/// the tenant and location identifiers on both sides, and the GLOBAL-scope
/// cross-tenant write restriction.

use super::types::ScopeRequirement;
use crate::engine::Denial;
use crate::hierarchy::{RoleHierarchy, ScopeLevel};
use crate::types::{ResourceContext, Subject};
use tracing::debug;

/// Evaluates scope requirements against subjects and resources
///
/// Stateless apart from the hierarchy it reads role scopes from, so the same
/// inputs always produce the same outcome.
#[derive(Debug, Clone)]
pub struct ScopeEvaluator {
    hierarchy: RoleHierarchy,
}

impl ScopeEvaluator {
    /// Create an evaluator over a role hierarchy
    pub fn new(hierarchy: RoleHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Evaluate a requirement
    ///
    /// Checks run in order and stop at the first failure:
    /// 1. minimum scope
    /// 2. tenant
    /// 3. location (LOCATION subjects only)
    /// 4. cross-tenant write (GLOBAL subjects only)
    pub fn evaluate(
        &self,
        subject: &Subject,
        resource: &ResourceContext,
        requirement: &ScopeRequirement,
    ) -> Result<(), Denial> {
        let scope = self
            .hierarchy
            .scope_of(subject.role)
            .map_err(|_| Denial::UnknownRole {
                role: subject.role.to_string(),
            })?;

        Self::check_minimum(subject, scope, requirement)?;
        Self::check_tenant(subject, scope, resource)?;
        Self::check_location(subject, scope, resource)?;
        Self::check_cross_tenant_write(subject, scope, resource, requirement)?;

        debug!(
            "Scope ok: subject={} role={} scope={} minimum={}",
            subject.id, subject.role, scope, requirement.minimum
        );
        Ok(())
    }

    fn check_minimum(
        subject: &Subject,
        scope: ScopeLevel,
        requirement: &ScopeRequirement,
    ) -> Result<(), Denial> {
        if scope.ordinal() >= requirement.minimum.ordinal() {
            return Ok(());
        }

        Err(Denial::InsufficientScope {
            role: subject.role,
            actual: scope,
            required: requirement.minimum,
        })
    }

    fn check_tenant(
        subject: &Subject,
        scope: ScopeLevel,
        resource: &ResourceContext,
    ) -> Result<(), Denial> {
        let Some(resource_tenant) = &resource.tenant_id else {
            return Ok(());
        };

        // Cross-tenant reads are open to GLOBAL; writes are handled in step 4
        if scope == ScopeLevel::Global || subject.tenant_id == *resource_tenant {
            return Ok(());
        }

        Err(Denial::TenantMismatch {
            subject_tenant: subject.tenant_id.clone(),
            resource_tenant: resource_tenant.clone(),
        })
    }

    fn check_location(
        subject: &Subject,
        scope: ScopeLevel,
        resource: &ResourceContext,
    ) -> Result<(), Denial> {
        if scope != ScopeLevel::Location {
            return Ok(());
        }

        let Some(resource_location) = &resource.location_id else {
            return Ok(());
        };

        if subject.location_id.as_ref() == Some(resource_location) {
            return Ok(());
        }

        Err(Denial::LocationMismatch {
            subject_location: subject.location_id.clone(),
            resource_location: resource_location.clone(),
        })
    }

    fn check_cross_tenant_write(
        subject: &Subject,
        scope: ScopeLevel,
        resource: &ResourceContext,
        requirement: &ScopeRequirement,
    ) -> Result<(), Denial> {
        if scope != ScopeLevel::Global || !requirement.is_write || requirement.allow_global_write {
            return Ok(());
        }

        match &resource.tenant_id {
            Some(resource_tenant) if *resource_tenant != subject.tenant_id => {
                Err(Denial::CrossTenantWriteDenied {
                    subject_tenant: subject.tenant_id.clone(),
                    resource_tenant: resource_tenant.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
