//! Role and scope type definitions

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization identity class
///
/// The variants are the roles of the reference franchise policy. Their
/// level, scope and parents live in the [`RoleTable`], not on the enum, so
/// a table that omits a role makes lookups fail with `UnknownRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Counter staff at a single location
    Operator,
    /// Workshop technician at a single location
    Technician,
    /// Store manager ("boltvezető") of a single location
    Boltvezeto,
    /// Tenant-wide bookkeeping
    Accountant,
    /// Franchise partner owning all locations of a tenant
    PartnerOwner,
    /// Franchisor head-office administrator
    CentralAdmin,
    /// Platform operations
    DevopsAdmin,
    /// Unrestricted platform administrator
    SuperAdmin,
}

impl Role {
    /// Every role variant, lowest reference level first
    pub const ALL: [Role; 8] = [
        Role::Operator,
        Role::Technician,
        Role::Boltvezeto,
        Role::Accountant,
        Role::PartnerOwner,
        Role::CentralAdmin,
        Role::DevopsAdmin,
        Role::SuperAdmin,
    ];

    /// Canonical name, as carried in tokens and audit entries
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operator => "OPERATOR",
            Role::Technician => "TECHNICIAN",
            Role::Boltvezeto => "BOLTVEZETO",
            Role::Accountant => "ACCOUNTANT",
            Role::PartnerOwner => "PARTNER_OWNER",
            Role::CentralAdmin => "CENTRAL_ADMIN",
            Role::DevopsAdmin => "DEVOPS_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Breadth of resource access a role is entitled to
///
/// Ordered: `Location < Tenant < Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeLevel {
    /// A single site
    Location,
    /// All sites of one organization
    Tenant,
    /// Cross-organization
    Global,
}

impl ScopeLevel {
    /// Numeric position in the scope order
    pub fn ordinal(&self) -> u8 {
        match self {
            ScopeLevel::Location => 0,
            ScopeLevel::Tenant => 1,
            ScopeLevel::Global => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeLevel::Location => "LOCATION",
            ScopeLevel::Tenant => "TENANT",
            ScopeLevel::Global => "GLOBAL",
        }
    }
}

impl FromStr for ScopeLevel {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => Ok(ScopeLevel::Location),
            "TENANT" => Ok(ScopeLevel::Tenant),
            "GLOBAL" => Ok(ScopeLevel::Global),
            other => Err(AuthzError::InvalidConfig(format!("unknown scope '{}'", other))),
        }
    }
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One row of the role table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// The role being defined
    pub role: Role,

    /// Hierarchical level, compared when granting roles
    pub level: u8,

    /// Access scope
    pub scope: ScopeLevel,

    /// Roles this role inherits permissions and constraints from
    #[serde(default)]
    pub parents: Vec<Role>,
}

impl RoleDefinition {
    /// Create a root role definition
    pub fn new(role: Role, level: u8, scope: ScopeLevel) -> Self {
        Self {
            role,
            level,
            scope,
            parents: Vec::new(),
        }
    }

    /// Add an inheritance parent
    pub fn inherits(mut self, parent: Role) -> Self {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
        self
    }

    /// Validate the definition in isolation
    pub fn validate(&self) -> Result<()> {
        if self.level == 0 {
            return Err(AuthzError::InvalidConfig(format!(
                "Role '{}' must have a positive level",
                self.role
            )));
        }

        if self.parents.contains(&self.role) {
            return Err(AuthzError::CircularInheritance(format!(
                "{} -> {}",
                self.role, self.role
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_roundtrip_names() {
        assert_eq!("BOLTVEZETO".parse::<Role>().unwrap(), Role::Boltvezeto);
        assert_eq!("partner_owner".parse::<Role>().unwrap(), Role::PartnerOwner);
        assert!(matches!(
            "JANITOR".parse::<Role>(),
            Err(AuthzError::UnknownRole(name)) if name == "JANITOR"
        ));
    }

    #[test]
    fn test_role_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
    }

    #[test]
    fn test_scope_order() {
        assert!(ScopeLevel::Location < ScopeLevel::Tenant);
        assert!(ScopeLevel::Tenant < ScopeLevel::Global);
        assert_eq!(ScopeLevel::Global.ordinal(), 2);
    }

    #[test]
    fn test_definition_validation() {
        let ok = RoleDefinition::new(Role::Technician, 2, ScopeLevel::Location)
            .inherits(Role::Operator);
        assert!(ok.validate().is_ok());

        let zero = RoleDefinition::new(Role::Operator, 0, ScopeLevel::Location);
        assert!(matches!(zero.validate(), Err(AuthzError::InvalidConfig(_))));

        let selfish = RoleDefinition::new(Role::Operator, 1, ScopeLevel::Location)
            .inherits(Role::Operator);
        assert!(matches!(
            selfish.validate(),
            Err(AuthzError::CircularInheritance(_))
        ));
    }

    #[test]
    fn test_inherits_deduplicates() {
        let def = RoleDefinition::new(Role::Boltvezeto, 3, ScopeLevel::Location)
            .inherits(Role::Technician)
            .inherits(Role::Technician);
        assert_eq!(def.parents, vec![Role::Technician]);
    }
}
