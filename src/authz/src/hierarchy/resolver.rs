//! Role hierarchy resolver
//!
//! Answers level, scope, grant and inheritance questions over a validated
//! role table. Chains are computed once at construction; every lookup after
//! that is a map read.

use super::graph::InheritanceGraph;
use super::types::{Role, RoleDefinition, ScopeLevel};
use crate::error::{AuthzError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Resolved attributes of one role
#[derive(Debug, Clone)]
struct ResolvedRole {
    level: u8,
    scope: ScopeLevel,
    /// Ancestors, nearest first
    chain: Vec<Role>,
}

/// Role hierarchy resolver
///
/// # Thread Safety
///
/// Immutable after construction and cheap to clone (`Arc` inside), so it can
/// be shared freely across request handlers.
#[derive(Debug, Clone)]
pub struct RoleHierarchy {
    roles: Arc<HashMap<Role, ResolvedRole>>,
    graph: Arc<InheritanceGraph>,
}

impl RoleHierarchy {
    /// Build a resolver from role definitions
    ///
    /// Cycles and undefined parents are rejected here, never per call.
    pub fn new(definitions: &[RoleDefinition]) -> Result<Self> {
        let graph = InheritanceGraph::build(definitions)?;

        let mut roles = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let chain = graph.ancestors(definition.role)?;
            roles.insert(
                definition.role,
                ResolvedRole {
                    level: definition.level,
                    scope: definition.scope,
                    chain,
                },
            );
        }

        debug!("Role hierarchy built with {} roles", roles.len());

        Ok(Self {
            roles: Arc::new(roles),
            graph: Arc::new(graph),
        })
    }

    fn resolved(&self, role: Role) -> Result<&ResolvedRole> {
        self.roles
            .get(&role)
            .ok_or_else(|| AuthzError::UnknownRole(role.to_string()))
    }

    /// Hierarchical level of a role
    pub fn level_of(&self, role: Role) -> Result<u8> {
        self.resolved(role).map(|r| r.level)
    }

    /// Access scope of a role
    pub fn scope_of(&self, role: Role) -> Result<ScopeLevel> {
        self.resolved(role).map(|r| r.scope)
    }

    /// Whether `grantor` may assign `target`
    ///
    /// Level comparison only: two roles on the same level may grant each
    /// other even when neither inherits from the other.
    pub fn can_grant(&self, grantor: Role, target: Role) -> Result<bool> {
        Ok(self.level_of(grantor)? >= self.level_of(target)?)
    }

    /// Ancestors of `role`, nearest first, excluding `role` itself
    pub fn inherited_chain(&self, role: Role) -> Result<&[Role]> {
        self.resolved(role).map(|r| r.chain.as_slice())
    }

    /// Whether `candidate` is an ancestor of `role`
    pub fn is_ancestor(&self, role: Role, candidate: Role) -> Result<bool> {
        Ok(self.inherited_chain(role)?.contains(&candidate))
    }

    /// Roles `grantor` may assign, highest level first
    pub fn assignable_roles(&self, grantor: Role) -> Result<Vec<Role>> {
        let level = self.level_of(grantor)?;

        let mut assignable: Vec<(u8, Role)> = self
            .roles
            .iter()
            .filter(|(_, resolved)| resolved.level <= level)
            .map(|(role, resolved)| (resolved.level, *role))
            .collect();

        assignable.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(assignable.into_iter().map(|(_, role)| role).collect())
    }

    /// Defined roles, parents before children
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.graph.order().iter().copied()
    }

    /// Whether the role has a row in the table
    pub fn contains(&self, role: Role) -> bool {
        self.roles.contains_key(&role)
    }
}
