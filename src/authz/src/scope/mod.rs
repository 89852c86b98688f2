//! Tenant/location scope module
//!
//! Evaluates whether a subject's role scope, tenant and location reach a
//! resource, including the GLOBAL-scope asymmetry: cross-tenant reads are
//! open, cross-tenant writes need an explicit override.
//!
//! # Examples
//!
//! ```
//! use franchise_authz::policy::Policy;
//! use franchise_authz::scope::{ScopeEvaluator, ScopeRequirement};
//! use franchise_authz::hierarchy::{Role, ScopeLevel};
//! use franchise_authz::types::{ResourceContext, Subject};
//!
//! let evaluator = ScopeEvaluator::new(Policy::reference().hierarchy().unwrap());
//! let subject = Subject::new("u1", Role::Operator, "t1").at_location("loc-1");
//! let resource = ResourceContext::new("rental", "R-1").in_tenant("t1").at_location("loc-1");
//!
//! assert!(evaluator
//!     .evaluate(&subject, &resource, &ScopeRequirement::read(ScopeLevel::Location))
//!     .is_ok());
//! ```

mod evaluator;
mod types;

#[cfg(test)]
mod tests;

pub use evaluator::ScopeEvaluator;
pub use types::ScopeRequirement;
