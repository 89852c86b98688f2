/// Scope requirement declared by an operation

use crate::hierarchy::ScopeLevel;
use serde::{Deserialize, Serialize};

/// Verbs treated as writes when a host classifies requests by HTTP method
const WRITE_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

/// What an operation demands of the caller's scope
///
/// `is_write` is supplied by the caller rather than inferred from a
/// transport verb; [`ScopeRequirement::is_write_method`] is available for
/// hosts that classify by HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequirement {
    /// Lowest scope that may perform the operation
    pub minimum: ScopeLevel,

    /// Operation mutates the resource
    #[serde(default)]
    pub is_write: bool,

    /// Lets a GLOBAL subject write into another tenant
    #[serde(default)]
    pub allow_global_write: bool,
}

impl ScopeRequirement {
    /// Read operation requiring at least `minimum`
    pub fn read(minimum: ScopeLevel) -> Self {
        Self {
            minimum,
            is_write: false,
            allow_global_write: false,
        }
    }

    /// Write operation requiring at least `minimum`
    pub fn write(minimum: ScopeLevel) -> Self {
        Self {
            minimum,
            is_write: true,
            allow_global_write: false,
        }
    }

    /// Permit cross-tenant writes by GLOBAL subjects for this operation
    pub fn allowing_global_write(mut self) -> Self {
        self.allow_global_write = true;
        self
    }

    /// Whether an HTTP method is a write (non-idempotent or mutating verb)
    pub fn is_write_method(method: &str) -> bool {
        WRITE_METHODS
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.trim()))
    }

    /// Requirement for an HTTP method
    pub fn for_method(minimum: ScopeLevel, method: &str) -> Self {
        Self {
            minimum,
            is_write: Self::is_write_method(method),
            allow_global_write: false,
        }
    }
}
