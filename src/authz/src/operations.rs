//! Per-operation policy metadata
//!
//! Each sensitive operation of the host application declares what it needs
//! (permissions, scope, recent re-verification, a constraint on the amount
//! involved) in an [`OperationPolicy`]. Policies are registered by name in an
//! [`OperationRegistry`] and turned into [`AccessRequest`]s for the guard.
//!
//! # Example
//!
//! ```
//! use franchise_authz::hierarchy::ScopeLevel;
//! use franchise_authz::operations::OperationPolicy;
//! use franchise_authz::permissions::{ConstraintKey, Permission};
//!
//! let policy = OperationPolicy::new("rental.discount")
//!     .require(Permission::RentalDiscount)
//!     .minimum_scope(ScopeLevel::Location)
//!     .write()
//!     .constraint(Permission::RentalDiscount, ConstraintKey::DiscountLimit)
//!     .absolute();
//!
//! assert!(policy.scope().unwrap().is_write);
//! ```

use crate::engine::{AccessRequest, ConstraintCheck, ElevatedAccessRequirement, PermissionLogic};
use crate::error::{AuthzError, Result};
use crate::hierarchy::ScopeLevel;
use crate::permissions::{ConstraintKey, Permission};
use crate::scope::ScopeRequirement;
use crate::session::ElevatedTtl;
use crate::types::{ResourceContext, Subject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Which constraint an operation's amount is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub permission: Permission,
    pub key: ConstraintKey,
    #[serde(default)]
    pub use_absolute_value: bool,
}

/// Declared requirements of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPolicy {
    name: String,
    required_permissions: Vec<Permission>,
    #[serde(default)]
    permission_logic: PermissionLogic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<ScopeRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elevated_access: Option<ElevatedTtl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constraint: Option<ConstraintSpec>,
}

impl OperationPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_permissions: Vec::new(),
            permission_logic: PermissionLogic::All,
            scope: None,
            elevated_access: None,
            constraint: None,
        }
    }

    /// Require one more permission
    pub fn require(mut self, permission: Permission) -> Self {
        self.required_permissions.push(permission);
        self
    }

    /// Accept any of the required permissions
    pub fn any_of(mut self) -> Self {
        self.permission_logic = PermissionLogic::Any;
        self
    }

    /// Lowest scope allowed; keeps an earlier `write()`
    pub fn minimum_scope(mut self, minimum: ScopeLevel) -> Self {
        let mut scope = self.scope.unwrap_or_else(|| ScopeRequirement::read(minimum));
        scope.minimum = minimum;
        self.scope = Some(scope);
        self
    }

    /// Mark the operation as mutating
    ///
    /// Without a prior `minimum_scope` the requirement starts at LOCATION.
    pub fn write(mut self) -> Self {
        let mut scope = self
            .scope
            .unwrap_or_else(|| ScopeRequirement::read(ScopeLevel::Location));
        scope.is_write = true;
        self.scope = Some(scope);
        self
    }

    /// Let GLOBAL subjects write into other tenants
    pub fn allow_global_write(mut self) -> Self {
        let scope = self
            .scope
            .unwrap_or_else(|| ScopeRequirement::read(ScopeLevel::Location));
        self.scope = Some(scope.allowing_global_write());
        self
    }

    /// Demand re-verification within `ttl`
    pub fn elevated(mut self, ttl: ElevatedTtl) -> Self {
        self.elevated_access = Some(ttl);
        self
    }

    /// Check the operation's amount against a constraint
    pub fn constraint(mut self, permission: Permission, key: ConstraintKey) -> Self {
        self.constraint = Some(ConstraintSpec {
            permission,
            key,
            use_absolute_value: false,
        });
        self
    }

    /// Compare the amount's magnitude; no effect without `constraint`
    pub fn absolute(mut self) -> Self {
        if let Some(spec) = self.constraint.as_mut() {
            spec.use_absolute_value = true;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_permissions(&self) -> &[Permission] {
        &self.required_permissions
    }

    pub fn permission_logic(&self) -> PermissionLogic {
        self.permission_logic
    }

    pub fn scope(&self) -> Option<&ScopeRequirement> {
        self.scope.as_ref()
    }

    pub fn elevated_access(&self) -> Option<ElevatedTtl> {
        self.elevated_access
    }

    pub fn constraint_spec(&self) -> Option<&ConstraintSpec> {
        self.constraint.as_ref()
    }

    /// Request intent for one invocation
    ///
    /// The constraint check is attached only when `value` is given.
    pub fn to_request(
        &self,
        subject: Option<Subject>,
        resource: ResourceContext,
        value: Option<f64>,
    ) -> AccessRequest {
        let constraint = match (self.constraint, value) {
            (Some(spec), Some(value)) => Some(ConstraintCheck {
                permission: spec.permission,
                key: spec.key,
                value,
                use_absolute_value: spec.use_absolute_value,
            }),
            _ => None,
        };

        AccessRequest {
            subject,
            resource,
            required_permissions: self.required_permissions.clone(),
            permission_logic: self.permission_logic,
            scope: self.scope,
            elevated_access: self
                .elevated_access
                .map(|ttl| ElevatedAccessRequirement { ttl }),
            constraint,
        }
    }

    /// Same policy with its elevated-access TTL replaced
    fn with_default_ttl(mut self, ttl: ElevatedTtl) -> Self {
        if self.elevated_access.is_some() {
            self.elevated_access = Some(ttl);
        }
        self
    }
}

/// Operation policies keyed by name
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: BTreeMap<String, OperationPolicy>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy; names are unique
    pub fn register(&mut self, policy: OperationPolicy) -> Result<()> {
        if self.operations.contains_key(policy.name()) {
            return Err(AuthzError::DuplicateOperation(policy.name().to_string()));
        }
        debug!("Registered operation {}", policy.name());
        self.operations.insert(policy.name().to_string(), policy);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, policy: OperationPolicy) -> Result<Self> {
        self.register(policy)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&OperationPolicy> {
        self.operations
            .get(name)
            .ok_or_else(|| AuthzError::UnknownOperation(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Policies in name order
    pub fn iter(&self) -> impl Iterator<Item = &OperationPolicy> {
        self.operations.values()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Sensitive operations of the rental application
    pub fn reference() -> Self {
        Self::reference_with_ttl(ElevatedTtl::DEFAULT)
    }

    /// Reference operations with every elevated-access window set to `ttl`
    pub fn reference_with_ttl(ttl: ElevatedTtl) -> Self {
        let operations = reference_operations()
            .into_iter()
            .map(|policy| {
                let policy = policy.with_default_ttl(ttl);
                (policy.name().to_string(), policy)
            })
            .collect();
        Self { operations }
    }
}

fn reference_operations() -> Vec<OperationPolicy> {
    use ConstraintKey::*;
    use Permission::*;

    let elevated = ElevatedTtl::DEFAULT;

    vec![
        OperationPolicy::new("rental.view")
            .require(RentalView)
            .minimum_scope(ScopeLevel::Location),
        OperationPolicy::new("rental.create")
            .require(RentalCreate)
            .minimum_scope(ScopeLevel::Location)
            .write(),
        OperationPolicy::new("rental.extend")
            .require(RentalExtend)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .constraint(RentalExtend, ExtensionDays),
        OperationPolicy::new("rental.cancel")
            .require(RentalCancel)
            .minimum_scope(ScopeLevel::Location)
            .write(),
        OperationPolicy::new("rental.discount")
            .require(RentalDiscount)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .constraint(RentalDiscount, DiscountLimit)
            .absolute(),
        OperationPolicy::new("finance.refund")
            .require(FinanceRefund)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .elevated(elevated)
            .constraint(FinanceRefund, RefundLimit)
            .absolute(),
        OperationPolicy::new("inventory.write_off")
            .require(InventoryWriteOff)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .elevated(elevated)
            .constraint(InventoryWriteOff, WriteOffValue)
            .absolute(),
        OperationPolicy::new("invoice.void")
            .require(InvoiceVoid)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .elevated(elevated),
        OperationPolicy::new("user.assign_role")
            .require(UserAssignRole)
            .minimum_scope(ScopeLevel::Location)
            .write()
            .elevated(elevated),
        OperationPolicy::new("user.delete")
            .require(UserDelete)
            .minimum_scope(ScopeLevel::Tenant)
            .write()
            .elevated(elevated),
        OperationPolicy::new("report.export")
            .require(ReportExport)
            .require(AuditExport)
            .any_of()
            .minimum_scope(ScopeLevel::Tenant),
        OperationPolicy::new("tenant.manage")
            .require(TenantManage)
            .minimum_scope(ScopeLevel::Global)
            .write()
            .allow_global_write()
            .elevated(elevated),
        OperationPolicy::new("system.configure")
            .require(SystemConfigure)
            .minimum_scope(ScopeLevel::Global)
            .write()
            .allow_global_write()
            .elevated(elevated),
    ]
}
