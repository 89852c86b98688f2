//! Permission catalog and composition
//!
//! The catalog holds what each role is granted directly; the composer folds
//! in everything inherited through the role hierarchy and resolves numeric
//! constraints across the chain.

pub mod catalog;
pub mod composer;

pub use catalog::{ConstraintKey, Permission, PermissionCatalog};
pub use composer::PermissionComposer;
