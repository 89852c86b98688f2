//! Role hierarchy module
//!
//! Role levels, access scopes and inheritance chains.
//!
//! # Features
//!
//! - **Level comparison**: a role may grant roles at or below its own level
//! - **Generic inheritance**: parent lists walked breadth-first, deduplicated
//! - **Load-time cycle detection**: DFS with complete path reporting
//!
//! # Example
//!
//! ```rust
//! use franchise_authz::hierarchy::{Role, RoleDefinition, RoleHierarchy, ScopeLevel};
//!
//! let hierarchy = RoleHierarchy::new(&[
//!     RoleDefinition::new(Role::Operator, 1, ScopeLevel::Location),
//!     RoleDefinition::new(Role::Technician, 2, ScopeLevel::Location).inherits(Role::Operator),
//! ])
//! .unwrap();
//!
//! assert_eq!(hierarchy.inherited_chain(Role::Technician).unwrap(), &[Role::Operator]);
//! assert!(hierarchy.can_grant(Role::Technician, Role::Operator).unwrap());
//! ```

pub mod graph;
pub mod resolver;
pub mod types;

pub use graph::InheritanceGraph;
pub use resolver::RoleHierarchy;
pub use types::{Role, RoleDefinition, ScopeLevel};
