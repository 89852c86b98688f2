//! Policy bundle: role table plus permission catalog
//!
//! A [`Policy`] is plain data. It is validated when turned into a
//! [`RoleHierarchy`] / [`PermissionComposer`]; after that nothing mutates it.

pub mod reference;

use crate::error::{AuthzError, Result};
use crate::hierarchy::{Role, RoleDefinition, RoleHierarchy};
use crate::permissions::{ConstraintKey, Permission, PermissionCatalog, PermissionComposer};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Replacement value for one constraint row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintOverride {
    pub role: Role,
    pub permission: Permission,
    pub key: ConstraintKey,
    pub value: f64,
}

/// Role definitions and permission tables
#[derive(Debug, Clone)]
pub struct Policy {
    roles: Vec<RoleDefinition>,
    catalog: PermissionCatalog,
}

impl Policy {
    /// Assemble a policy from its tables
    pub fn new(roles: Vec<RoleDefinition>, catalog: PermissionCatalog) -> Self {
        Self { roles, catalog }
    }

    /// The compiled-in franchise policy
    pub fn reference() -> Self {
        Self::new(reference::role_definitions(), reference::catalog())
    }

    /// Role definitions
    pub fn roles(&self) -> &[RoleDefinition] {
        &self.roles
    }

    /// Permission catalog
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Replace constraint values before the engine is built
    ///
    /// Overrides may only name roles defined in the role table and must be
    /// finite and non-negative.
    pub fn with_overrides(mut self, overrides: &[ConstraintOverride]) -> Result<Self> {
        for o in overrides {
            if !self.roles.iter().any(|d| d.role == o.role) {
                return Err(AuthzError::UnknownRole(o.role.to_string()));
            }
            if !o.value.is_finite() || o.value < 0.0 {
                return Err(AuthzError::InvalidConfig(format!(
                    "constraint {} on {} for {} must be a non-negative number, got {}",
                    o.key, o.permission, o.role, o.value
                )));
            }

            info!(
                "Constraint override: {} {} {} = {}",
                o.role, o.permission, o.key, o.value
            );
            self.catalog.set_constraint(o.role, o.permission, o.key, o.value);
        }

        Ok(self)
    }

    /// Validate the role table and build the hierarchy resolver
    pub fn hierarchy(&self) -> Result<RoleHierarchy> {
        RoleHierarchy::new(&self.roles)
    }

    /// Validate everything and build the permission composer
    pub fn composer(&self) -> Result<PermissionComposer> {
        let hierarchy = self.hierarchy()?;

        for role in self.catalog.roles() {
            if !hierarchy.contains(role) {
                return Err(AuthzError::UnknownRole(format!(
                    "{} (has permissions but no role definition)",
                    role
                )));
            }
        }

        PermissionComposer::new(hierarchy, self.catalog.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_policy_is_valid() {
        let policy = Policy::reference();
        assert_eq!(policy.roles().len(), 8);
        assert!(policy.composer().is_ok());
    }

    #[test]
    fn test_override_replaces_value() {
        let policy = Policy::reference()
            .with_overrides(&[ConstraintOverride {
                role: Role::Boltvezeto,
                permission: Permission::RentalDiscount,
                key: ConstraintKey::DiscountLimit,
                value: 25.0,
            }])
            .unwrap();

        let composer = policy.composer().unwrap();
        assert_eq!(
            composer
                .resolve_constraint(Role::Boltvezeto, Permission::RentalDiscount, ConstraintKey::DiscountLimit)
                .unwrap(),
            Some(25.0)
        );
    }

    #[test]
    fn test_override_rejects_negative_value() {
        let result = Policy::reference().with_overrides(&[ConstraintOverride {
            role: Role::Operator,
            permission: Permission::RentalExtend,
            key: ConstraintKey::ExtensionDays,
            value: -1.0,
        }]);
        assert!(matches!(result, Err(AuthzError::InvalidConfig(_))));
    }

    #[test]
    fn test_catalog_role_without_definition() {
        let policy = Policy::new(
            vec![],
            PermissionCatalog::new().grant(Role::Operator, &[Permission::RentalView]),
        );
        assert!(matches!(policy.composer(), Err(AuthzError::UnknownRole(_))));
    }
}
