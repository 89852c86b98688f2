//! Permission catalog
//!
//! The static set of `module:action` permissions plus the per-role direct
//! permission and constraint tables. Built once, never mutated afterwards.

use crate::error::{AuthzError, Result};
use crate::hierarchy::Role;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

macro_rules! permissions {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )+) => {
        /// Capability identified by a `module:action` pair
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $( $(#[$doc])* $variant, )+
        }

        impl Permission {
            /// Every permission in the catalog
            pub const ALL: &'static [Permission] = &[ $( Permission::$variant, )+ ];

            /// The `module:action` string
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Permission::$variant => $name, )+
                }
            }
        }
    };
}

permissions! {
    RentalView => "rental:view",
    RentalCreate => "rental:create",
    RentalReturn => "rental:return",
    RentalExtend => "rental:extend",
    RentalCancel => "rental:cancel",
    /// Price reduction on a rental, bounded by `discount_limit`
    RentalDiscount => "rental:discount",
    InventoryView => "inventory:view",
    InventoryUpdate => "inventory:update",
    InventoryTransfer => "inventory:transfer",
    /// Write-off of damaged stock, bounded by `write_off_value`
    InventoryWriteOff => "inventory:write_off",
    CustomerView => "customer:view",
    CustomerCreate => "customer:create",
    CustomerUpdate => "customer:update",
    CustomerDelete => "customer:delete",
    ServiceView => "service:view",
    ServiceCreate => "service:create",
    ServiceClose => "service:close",
    InvoiceView => "invoice:view",
    InvoiceCreate => "invoice:create",
    InvoiceVoid => "invoice:void",
    /// Cash refund, bounded by `refund_limit`
    FinanceRefund => "finance:refund",
    FinanceReport => "finance:report",
    ReportView => "report:view",
    ReportExport => "report:export",
    UserView => "user:view",
    UserCreate => "user:create",
    UserUpdate => "user:update",
    UserDelete => "user:delete",
    UserAssignRole => "user:assign_role",
    LocationView => "location:view",
    LocationManage => "location:manage",
    TenantView => "tenant:view",
    TenantManage => "tenant:manage",
    AuditView => "audit:view",
    AuditExport => "audit:export",
    SystemConfigure => "system:configure",
    SystemMaintenance => "system:maintenance",
}

impl Permission {
    /// Module half of the pair
    pub fn module(&self) -> &'static str {
        self.as_str().split_once(':').map(|(m, _)| m).unwrap_or_default()
    }

    /// Action half of the pair
    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map(|(_, a)| a).unwrap_or_default()
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| AuthzError::UnknownPermission(s.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Named numeric limit attached to a (role, permission) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKey {
    /// Maximum discount percentage
    DiscountLimit,
    /// Maximum refund amount
    RefundLimit,
    /// Maximum rental extension in days
    ExtensionDays,
    /// Maximum stock value written off at once
    WriteOffValue,
}

impl ConstraintKey {
    pub const ALL: [ConstraintKey; 4] = [
        ConstraintKey::DiscountLimit,
        ConstraintKey::RefundLimit,
        ConstraintKey::ExtensionDays,
        ConstraintKey::WriteOffValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKey::DiscountLimit => "discount_limit",
            ConstraintKey::RefundLimit => "refund_limit",
            ConstraintKey::ExtensionDays => "extension_days",
            ConstraintKey::WriteOffValue => "write_off_value",
        }
    }
}

impl FromStr for ConstraintKey {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "discount_limit" => Ok(ConstraintKey::DiscountLimit),
            "refund_limit" => Ok(ConstraintKey::RefundLimit),
            "extension_days" => Ok(ConstraintKey::ExtensionDays),
            "write_off_value" => Ok(ConstraintKey::WriteOffValue),
            other => Err(AuthzError::UnknownConstraintKey(other.to_string())),
        }
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-role direct permissions and constraint values
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    direct: HashMap<Role, HashSet<Permission>>,
    constraints: HashMap<(Role, Permission, ConstraintKey), f64>,
    empty: HashSet<Permission>,
}

impl PermissionCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant permissions directly to a role
    pub fn grant(mut self, role: Role, permissions: &[Permission]) -> Self {
        self.direct
            .entry(role)
            .or_default()
            .extend(permissions.iter().copied());
        self
    }

    /// Define a constraint value for a (role, permission) pair
    ///
    /// The role does not need to hold the permission directly; a value on a
    /// role that only inherits the permission still takes part in
    /// resolution.
    pub fn constrain(mut self, role: Role, permission: Permission, key: ConstraintKey, value: f64) -> Self {
        self.set_constraint(role, permission, key, value);
        self
    }

    /// Define or replace a constraint value in place
    pub fn set_constraint(&mut self, role: Role, permission: Permission, key: ConstraintKey, value: f64) {
        self.constraints.insert((role, permission, key), value);
    }

    /// Permissions granted directly to `role`
    pub fn direct_permissions(&self, role: Role) -> &HashSet<Permission> {
        self.direct.get(&role).unwrap_or(&self.empty)
    }

    /// Constraint value defined directly on `(role, permission, key)`
    pub fn constraint(&self, role: Role, permission: Permission, key: ConstraintKey) -> Option<f64> {
        self.constraints.get(&(role, permission, key)).copied()
    }

    /// Roles that have a row in the permission table
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.direct.keys().copied()
    }

    /// All defined constraint rows
    pub fn constraints(&self) -> impl Iterator<Item = (Role, Permission, ConstraintKey, f64)> + '_ {
        self.constraints
            .iter()
            .map(|((role, permission, key), value)| (*role, *permission, *key, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_strings() {
        assert_eq!(Permission::RentalCancel.as_str(), "rental:cancel");
        assert_eq!(Permission::RentalDiscount.module(), "rental");
        assert_eq!(Permission::RentalDiscount.action(), "discount");
        assert_eq!("inventory:write_off".parse::<Permission>().unwrap(), Permission::InventoryWriteOff);
        assert!(matches!(
            "rental:teleport".parse::<Permission>(),
            Err(AuthzError::UnknownPermission(_))
        ));
    }

    #[test]
    fn test_permission_names_are_unique() {
        let names: HashSet<&str> = Permission::ALL.iter().map(Permission::as_str).collect();
        assert_eq!(names.len(), Permission::ALL.len());
        assert!(Permission::ALL.iter().all(|p| p.as_str().contains(':')));
    }

    #[test]
    fn test_permission_serde_as_string() {
        let json = serde_json::to_string(&Permission::FinanceRefund).unwrap();
        assert_eq!(json, "\"finance:refund\"");

        let back: Permission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Permission::FinanceRefund);
    }

    #[test]
    fn test_constraint_key_parse() {
        assert_eq!("discount_limit".parse::<ConstraintKey>().unwrap(), ConstraintKey::DiscountLimit);
        assert!("speed_limit".parse::<ConstraintKey>().is_err());
    }

    #[test]
    fn test_catalog_lookups() {
        let catalog = PermissionCatalog::new()
            .grant(Role::Operator, &[Permission::RentalView, Permission::RentalCreate])
            .constrain(Role::Boltvezeto, Permission::RentalDiscount, ConstraintKey::DiscountLimit, 20.0);

        assert_eq!(catalog.direct_permissions(Role::Operator).len(), 2);
        assert!(catalog.direct_permissions(Role::SuperAdmin).is_empty());
        assert_eq!(
            catalog.constraint(Role::Boltvezeto, Permission::RentalDiscount, ConstraintKey::DiscountLimit),
            Some(20.0)
        );
        assert_eq!(
            catalog.constraint(Role::Boltvezeto, Permission::RentalDiscount, ConstraintKey::RefundLimit),
            None
        );
    }
}
