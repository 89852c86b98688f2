//! Inheritance graph over role definitions
//!
//! Built once when the policy is loaded. Building:
//! 1. rejects duplicate role rows and parents that are not defined,
//! 2. detects circular inheritance with a DFS that reports the cycle path,
//! 3. computes a topological order (Kahn's algorithm) in which every parent
//!    precedes the roles inheriting from it.

use super::types::{Role, RoleDefinition};
use crate::error::{AuthzError, Result};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// DFS colouring used for cycle detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Validated, acyclic inheritance graph
#[derive(Debug, Clone)]
pub struct InheritanceGraph {
    /// role -> direct parents, in declaration order
    parents: HashMap<Role, Vec<Role>>,

    /// Parents before children
    order: Vec<Role>,
}

impl InheritanceGraph {
    /// Build the graph from role definitions
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if a role is defined twice or a definition is invalid
    /// - `UnknownRole` if a parent has no definition of its own
    /// - `CircularInheritance` with the offending path if a cycle exists
    pub fn build<'a>(definitions: impl IntoIterator<Item = &'a RoleDefinition>) -> Result<Self> {
        // BTreeMap keeps traversal deterministic across runs
        let mut parents: BTreeMap<Role, Vec<Role>> = BTreeMap::new();

        for definition in definitions {
            definition.validate()?;

            if parents.contains_key(&definition.role) {
                return Err(AuthzError::InvalidConfig(format!(
                    "Role '{}' is defined more than once",
                    definition.role
                )));
            }

            parents.insert(definition.role, definition.parents.clone());
        }

        for (role, role_parents) in &parents {
            for parent in role_parents {
                if !parents.contains_key(parent) {
                    return Err(AuthzError::UnknownRole(format!(
                        "{} (parent of {})",
                        parent, role
                    )));
                }
            }
        }

        Self::detect_cycle(&parents)?;
        let order = Self::topological_order(&parents)?;

        Ok(Self {
            parents: parents.into_iter().collect(),
            order,
        })
    }

    /// Direct parents of a role
    pub fn parents(&self, role: Role) -> Option<&[Role]> {
        self.parents.get(&role).map(Vec::as_slice)
    }

    /// Whether the role is defined
    pub fn contains(&self, role: Role) -> bool {
        self.parents.contains_key(&role)
    }

    /// Roles ordered so that every parent precedes its children
    pub fn order(&self) -> &[Role] {
        &self.order
    }

    /// Ancestors of `role`, nearest first, excluding `role`
    ///
    /// Breadth-first over the parent lists; a role reachable through two
    /// paths appears once, at its nearest distance.
    pub fn ancestors(&self, role: Role) -> Result<Vec<Role>> {
        let direct = self
            .parents
            .get(&role)
            .ok_or_else(|| AuthzError::UnknownRole(role.to_string()))?;

        let mut seen: HashSet<Role> = HashSet::new();
        seen.insert(role);

        let mut chain = Vec::new();
        let mut queue: VecDeque<Role> = direct.iter().copied().collect();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            chain.push(current);

            if let Some(next) = self.parents.get(&current) {
                queue.extend(next.iter().copied());
            }
        }

        Ok(chain)
    }

    fn detect_cycle(parents: &BTreeMap<Role, Vec<Role>>) -> Result<()> {
        let mut state: HashMap<Role, Visit> =
            parents.keys().map(|role| (*role, Visit::Unvisited)).collect();

        for start in parents.keys() {
            if state[start] == Visit::Unvisited {
                let mut path = Vec::new();
                Self::visit(*start, parents, &mut state, &mut path)?;
            }
        }

        Ok(())
    }

    fn visit(
        node: Role,
        parents: &BTreeMap<Role, Vec<Role>>,
        state: &mut HashMap<Role, Visit>,
        path: &mut Vec<Role>,
    ) -> Result<()> {
        match state.get(&node) {
            Some(Visit::InProgress) => {
                let start = path.iter().position(|r| *r == node).unwrap_or(0);
                let cycle: Vec<String> = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(Role::to_string)
                    .collect();
                return Err(AuthzError::CircularInheritance(cycle.join(" -> ")));
            }
            Some(Visit::Done) => return Ok(()),
            _ => {}
        }

        state.insert(node, Visit::InProgress);
        path.push(node);

        if let Some(next) = parents.get(&node) {
            for parent in next {
                Self::visit(*parent, parents, state, path)?;
            }
        }

        state.insert(node, Visit::Done);
        path.pop();

        Ok(())
    }

    fn topological_order(parents: &BTreeMap<Role, Vec<Role>>) -> Result<Vec<Role>> {
        let mut children: BTreeMap<Role, Vec<Role>> = BTreeMap::new();
        let mut in_degree: BTreeMap<Role, usize> = BTreeMap::new();

        for (role, role_parents) in parents {
            in_degree.insert(*role, role_parents.len());
            children.entry(*role).or_default();
            for parent in role_parents {
                children.entry(*parent).or_default().push(*role);
            }
        }

        let mut queue: VecDeque<Role> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(role, _)| *role)
            .collect();

        let mut sorted = Vec::with_capacity(parents.len());
        while let Some(current) = queue.pop_front() {
            sorted.push(current);

            for child in &children[&current] {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }

        if sorted.len() != parents.len() {
            return Err(AuthzError::CircularInheritance(
                "cycle detected during ordering".to_string(),
            ));
        }

        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::types::ScopeLevel;

    fn def(role: Role, level: u8, parents: &[Role]) -> RoleDefinition {
        parents.iter().fold(
            RoleDefinition::new(role, level, ScopeLevel::Location),
            |d, p| d.inherits(*p),
        )
    }

    #[test]
    fn test_empty_graph() {
        let graph = InheritanceGraph::build(&[]).unwrap();
        assert!(graph.order().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let defs = vec![
            def(Role::Operator, 1, &[]),
            def(Role::Technician, 2, &[Role::Operator]),
            def(Role::Boltvezeto, 3, &[Role::Technician]),
        ];
        let graph = InheritanceGraph::build(&defs).unwrap();

        assert_eq!(
            graph.ancestors(Role::Boltvezeto).unwrap(),
            vec![Role::Technician, Role::Operator]
        );
        assert!(graph.ancestors(Role::Operator).unwrap().is_empty());

        let idx = |r: Role| graph.order().iter().position(|x| *x == r).unwrap();
        assert!(idx(Role::Operator) < idx(Role::Technician));
        assert!(idx(Role::Technician) < idx(Role::Boltvezeto));
    }

    #[test]
    fn test_diamond_is_deduplicated() {
        // Operator <- Technician, Operator <- Accountant, both <- PartnerOwner
        let defs = vec![
            def(Role::Operator, 1, &[]),
            def(Role::Technician, 2, &[Role::Operator]),
            def(Role::Accountant, 2, &[Role::Operator]),
            def(Role::PartnerOwner, 4, &[Role::Technician, Role::Accountant]),
        ];
        let graph = InheritanceGraph::build(&defs).unwrap();

        let chain = graph.ancestors(Role::PartnerOwner).unwrap();
        assert_eq!(chain, vec![Role::Technician, Role::Accountant, Role::Operator]);
    }

    #[test]
    fn test_two_role_cycle() {
        let defs = vec![
            def(Role::Operator, 1, &[Role::Technician]),
            def(Role::Technician, 2, &[Role::Operator]),
        ];

        match InheritanceGraph::build(&defs) {
            Err(AuthzError::CircularInheritance(msg)) => {
                assert!(msg.contains("OPERATOR") && msg.contains("TECHNICIAN"));
            }
            other => panic!("Expected CircularInheritance, got {:?}", other),
        }
    }

    #[test]
    fn test_three_role_cycle() {
        let defs = vec![
            def(Role::Operator, 1, &[Role::Boltvezeto]),
            def(Role::Technician, 2, &[Role::Operator]),
            def(Role::Boltvezeto, 3, &[Role::Technician]),
        ];

        assert!(matches!(
            InheritanceGraph::build(&defs),
            Err(AuthzError::CircularInheritance(_))
        ));
    }

    #[test]
    fn test_undefined_parent() {
        let defs = vec![def(Role::Technician, 2, &[Role::Operator])];

        assert!(matches!(
            InheritanceGraph::build(&defs),
            Err(AuthzError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_duplicate_definition() {
        let defs = vec![def(Role::Operator, 1, &[]), def(Role::Operator, 2, &[])];

        assert!(matches!(
            InheritanceGraph::build(&defs),
            Err(AuthzError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_ancestors_of_unknown_role() {
        let graph = InheritanceGraph::build(&[def(Role::Operator, 1, &[])]).unwrap();
        assert!(matches!(
            graph.ancestors(Role::SuperAdmin),
            Err(AuthzError::UnknownRole(_))
        ));
    }
}
