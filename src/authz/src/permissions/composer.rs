//! Permission composer
//!
//! Effective permissions are the union of a role's direct permissions and
//! those of every ancestor. Constraints resolve to the maximum value defined
//! anywhere along the chain, so an inheriting role is never more restricted
//! than an ancestor with a looser limit.

use super::catalog::{ConstraintKey, Permission, PermissionCatalog};
use crate::error::{AuthzError, Result};
use crate::hierarchy::{Role, RoleHierarchy};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Computes effective permissions and constraint limits
#[derive(Debug, Clone)]
pub struct PermissionComposer {
    hierarchy: RoleHierarchy,
    catalog: Arc<PermissionCatalog>,
    /// Effective permission sets, one per defined role
    effective: Arc<HashMap<Role, HashSet<Permission>>>,
}

impl PermissionComposer {
    /// Build a composer, precomputing every role's effective set
    pub fn new(hierarchy: RoleHierarchy, catalog: PermissionCatalog) -> Result<Self> {
        let mut effective = HashMap::new();

        for role in hierarchy.roles() {
            let set = Self::compose(&hierarchy, &catalog, role)?;
            debug!("Role {} holds {} effective permissions", role, set.len());
            effective.insert(role, set);
        }

        Ok(Self {
            hierarchy,
            catalog: Arc::new(catalog),
            effective: Arc::new(effective),
        })
    }

    fn compose(
        hierarchy: &RoleHierarchy,
        catalog: &PermissionCatalog,
        role: Role,
    ) -> Result<HashSet<Permission>> {
        let mut set: HashSet<Permission> = catalog.direct_permissions(role).clone();
        for ancestor in hierarchy.inherited_chain(role)? {
            set.extend(catalog.direct_permissions(*ancestor).iter().copied());
        }
        Ok(set)
    }

    /// The role hierarchy this composer resolves against
    pub fn hierarchy(&self) -> &RoleHierarchy {
        &self.hierarchy
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Permissions granted directly to `role`
    pub fn direct_permissions(&self, role: Role) -> &HashSet<Permission> {
        self.catalog.direct_permissions(role)
    }

    /// Direct plus inherited permissions of `role`
    pub fn all_permissions(&self, role: Role) -> Result<&HashSet<Permission>> {
        self.effective
            .get(&role)
            .ok_or_else(|| AuthzError::UnknownRole(role.to_string()))
    }

    /// Membership test on the effective set
    pub fn has_permission(&self, role: Role, permission: Permission) -> Result<bool> {
        Ok(self.all_permissions(role)?.contains(&permission))
    }

    /// Required permissions the role does not hold, in request order
    pub fn missing_permissions(&self, role: Role, required: &[Permission]) -> Result<Vec<Permission>> {
        let held = self.all_permissions(role)?;
        Ok(required
            .iter()
            .filter(|p| !held.contains(*p))
            .copied()
            .collect())
    }

    /// Effective limit for `(role, permission, key)`
    ///
    /// `None` both when the role lacks the permission and when no role in the
    /// chain defines the key; callers distinguish the two with
    /// [`has_permission`](Self::has_permission) first.
    pub fn resolve_constraint(
        &self,
        role: Role,
        permission: Permission,
        key: ConstraintKey,
    ) -> Result<Option<f64>> {
        if !self.has_permission(role, permission)? {
            return Ok(None);
        }

        let own = self.catalog.constraint(role, permission, key);
        let inherited = self
            .hierarchy
            .inherited_chain(role)?
            .iter()
            .filter_map(|ancestor| self.catalog.constraint(*ancestor, permission, key));

        Ok(own.into_iter().chain(inherited).reduce(f64::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{RoleDefinition, ScopeLevel};
    use crate::policy::Policy;

    fn composer() -> PermissionComposer {
        Policy::reference().composer().unwrap()
    }

    #[test]
    fn test_inherited_permissions() {
        let c = composer();
        assert!(c.has_permission(Role::Technician, Permission::RentalCreate).unwrap());
        assert!(!c.direct_permissions(Role::Technician).contains(&Permission::RentalCreate));
        assert!(c.has_permission(Role::PartnerOwner, Permission::RentalDiscount).unwrap());
    }

    #[test]
    fn test_operator_lacks_discount() {
        let c = composer();
        assert!(!c.has_permission(Role::Operator, Permission::RentalDiscount).unwrap());
        assert_eq!(
            c.resolve_constraint(Role::Operator, Permission::RentalDiscount, ConstraintKey::DiscountLimit)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_constraint_takes_max_over_chain() {
        let c = composer();
        assert_eq!(
            c.resolve_constraint(Role::Boltvezeto, Permission::RentalDiscount, ConstraintKey::DiscountLimit)
                .unwrap(),
            Some(20.0)
        );
        assert_eq!(
            c.resolve_constraint(Role::PartnerOwner, Permission::RentalDiscount, ConstraintKey::DiscountLimit)
                .unwrap(),
            Some(100.0)
        );
    }

    #[test]
    fn test_inherited_looser_limit_wins_over_own_tighter_limit() {
        let hierarchy = RoleHierarchy::new(&[
            RoleDefinition::new(Role::Boltvezeto, 3, ScopeLevel::Location),
            RoleDefinition::new(Role::PartnerOwner, 4, ScopeLevel::Tenant).inherits(Role::Boltvezeto),
        ])
        .unwrap();
        let catalog = PermissionCatalog::new()
            .grant(Role::Boltvezeto, &[Permission::FinanceRefund])
            .constrain(Role::Boltvezeto, Permission::FinanceRefund, ConstraintKey::RefundLimit, 500.0)
            .constrain(Role::PartnerOwner, Permission::FinanceRefund, ConstraintKey::RefundLimit, 50.0);
        let c = PermissionComposer::new(hierarchy, catalog).unwrap();

        assert_eq!(
            c.resolve_constraint(Role::PartnerOwner, Permission::FinanceRefund, ConstraintKey::RefundLimit)
                .unwrap(),
            Some(500.0)
        );
    }

    #[test]
    fn test_unconstrained_permission() {
        let c = composer();
        assert!(c.has_permission(Role::Boltvezeto, Permission::RentalCancel).unwrap());
        assert_eq!(
            c.resolve_constraint(Role::Boltvezeto, Permission::RentalCancel, ConstraintKey::DiscountLimit)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_permissions_keeps_order() {
        let c = composer();
        let missing = c
            .missing_permissions(
                Role::Operator,
                &[Permission::UserDelete, Permission::RentalView, Permission::AuditExport],
            )
            .unwrap();
        assert_eq!(missing, vec![Permission::UserDelete, Permission::AuditExport]);
    }

    #[test]
    fn test_unknown_role_in_composer() {
        let hierarchy =
            RoleHierarchy::new(&[RoleDefinition::new(Role::Operator, 1, ScopeLevel::Location)]).unwrap();
        let c = PermissionComposer::new(hierarchy, PermissionCatalog::new()).unwrap();

        assert!(matches!(
            c.has_permission(Role::SuperAdmin, Permission::RentalView),
            Err(AuthzError::UnknownRole(_))
        ));
    }
}
