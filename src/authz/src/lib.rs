//! # Franchise Authorization Engine
//!
//! Role-based access control for a multi-tenant franchise rental
//! application.
//!
//! ## Features
//!
//! - **Role hierarchy** with levels, LOCATION/TENANT/GLOBAL scopes and
//!   generic inheritance (cycle-checked at load)
//! - **Permission composition**: direct plus inherited permissions, numeric
//!   constraints resolved as the maximum along the inheritance chain
//! - **Scope evaluation** with tenant/location checks and a GLOBAL
//!   read/write asymmetry across tenants
//! - **Elevated access**: time-boxed re-verification sessions in a
//!   concurrent store with amortized sweeping
//! - **Audit sinks** (tracing, in-memory, Tokio channel) and metrics
//!
//! ## Example
//!
//! ```rust
//! use franchise_authz::{AccessRequest, AuthorizationGuard, ConstraintCheck, Policy};
//! use franchise_authz::hierarchy::Role;
//! use franchise_authz::permissions::{ConstraintKey, Permission};
//! use franchise_authz::session::ElevatedAccessStore;
//! use franchise_authz::types::Subject;
//! use std::sync::Arc;
//!
//! let guard = AuthorizationGuard::new(Policy::reference(), Arc::new(ElevatedAccessStore::new()))?;
//!
//! let request = AccessRequest::new(Subject::new("u-17", Role::Boltvezeto, "tenant-a"))
//!     .require(Permission::RentalDiscount)
//!     .with_constraint(ConstraintCheck {
//!         permission: Permission::RentalDiscount,
//!         key: ConstraintKey::DiscountLimit,
//!         value: 20.0,
//!         use_absolute_value: true,
//!     });
//!
//! let decision = guard.authorize(&request);
//! assert!(decision.allowed);
//! # Ok::<(), franchise_authz::AuthzError>(())
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod operations;
pub mod permissions;
pub mod policy;
pub mod scope;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::GuardConfig;
pub use engine::{
    AccessRequest, AuditEntry, AuditKind, AuditSink, AuthorizationDecision, AuthorizationGuard,
    ConstraintCheck, Denial, DenialKind, GuardBuilder, PermissionLogic,
};
pub use error::{AuthzError, Result};
pub use operations::{OperationPolicy, OperationRegistry};
pub use policy::Policy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
