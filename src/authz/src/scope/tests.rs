/// Scope evaluator tests

use super::*;
use crate::engine::{Denial, DenialKind};
use crate::hierarchy::{Role, ScopeLevel};
use crate::policy::Policy;
use crate::types::{ResourceContext, Subject};

fn evaluator() -> ScopeEvaluator {
    ScopeEvaluator::new(Policy::reference().hierarchy().unwrap())
}

fn rental(tenant: &str, location: &str) -> ResourceContext {
    ResourceContext::new("rental", "R-1").in_tenant(tenant).at_location(location)
}

fn kind(result: Result<(), Denial>) -> Option<DenialKind> {
    result.err().map(|d| d.kind())
}

#[test]
fn test_location_subject_same_site() {
    let subject = Subject::new("u1", Role::Operator, "t1").at_location("loc-1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::write(ScopeLevel::Location),
    );
    assert!(result.is_ok());
}

#[test]
fn test_insufficient_scope() {
    let subject = Subject::new("u1", Role::Boltvezeto, "t1").at_location("loc-1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::read(ScopeLevel::Tenant),
    );

    match result {
        Err(Denial::InsufficientScope { actual, required, .. }) => {
            assert_eq!(actual, ScopeLevel::Location);
            assert_eq!(required, ScopeLevel::Tenant);
        }
        other => panic!("Expected InsufficientScope, got {:?}", other),
    }
}

#[test]
fn test_minimum_scope_checked_before_tenant() {
    let subject = Subject::new("u1", Role::Operator, "t1").at_location("loc-1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t2", "loc-9"),
        &ScopeRequirement::read(ScopeLevel::Global),
    );
    assert_eq!(kind(result), Some(DenialKind::InsufficientScope));
}

#[test]
fn test_tenant_mismatch() {
    let subject = Subject::new("u1", Role::Accountant, "t1");
    let result = evaluator().evaluate(
        &subject,
        &ResourceContext::new("invoice", "I-1").in_tenant("t2"),
        &ScopeRequirement::read(ScopeLevel::Location),
    );

    match result {
        Err(Denial::TenantMismatch { subject_tenant, resource_tenant }) => {
            assert_eq!(subject_tenant, "t1");
            assert_eq!(resource_tenant, "t2");
        }
        other => panic!("Expected TenantMismatch, got {:?}", other),
    }
}

#[test]
fn test_absent_resource_tenant_passes() {
    let subject = Subject::new("u1", Role::Accountant, "t1");
    let result = evaluator().evaluate(
        &subject,
        &ResourceContext::new("report", "monthly"),
        &ScopeRequirement::read(ScopeLevel::Tenant),
    );
    assert!(result.is_ok());
}

#[test]
fn test_location_mismatch() {
    let subject = Subject::new("u1", Role::Technician, "t1").at_location("loc-1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-2"),
        &ScopeRequirement::read(ScopeLevel::Location),
    );
    assert_eq!(kind(result), Some(DenialKind::LocationMismatch));
}

#[test]
fn test_location_subject_without_location() {
    let subject = Subject::new("u1", Role::Operator, "t1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::read(ScopeLevel::Location),
    );

    match result {
        Err(Denial::LocationMismatch { subject_location, resource_location }) => {
            assert!(subject_location.is_none());
            assert_eq!(resource_location, "loc-1");
        }
        other => panic!("Expected LocationMismatch, got {:?}", other),
    }
}

#[test]
fn test_location_subject_resource_without_location() {
    let subject = Subject::new("u1", Role::Operator, "t1");
    let result = evaluator().evaluate(
        &subject,
        &ResourceContext::new("customer", "C-1").in_tenant("t1"),
        &ScopeRequirement::read(ScopeLevel::Location),
    );
    assert!(result.is_ok());
}

#[test]
fn test_tenant_subject_crosses_locations() {
    let subject = Subject::new("u1", Role::PartnerOwner, "t1");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-7"),
        &ScopeRequirement::write(ScopeLevel::Tenant),
    );
    assert!(result.is_ok());
}

#[test]
fn test_global_cross_tenant_read() {
    let subject = Subject::new("admin", Role::SuperAdmin, "hq");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::read(ScopeLevel::Global),
    );
    assert!(result.is_ok());
}

#[test]
fn test_global_cross_tenant_write_denied() {
    let subject = Subject::new("admin", Role::SuperAdmin, "hq");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::write(ScopeLevel::Location),
    );

    match result {
        Err(Denial::CrossTenantWriteDenied { subject_tenant, resource_tenant }) => {
            assert_eq!(subject_tenant, "hq");
            assert_eq!(resource_tenant, "t1");
        }
        other => panic!("Expected CrossTenantWriteDenied, got {:?}", other),
    }
}

#[test]
fn test_global_cross_tenant_write_with_override() {
    let subject = Subject::new("admin", Role::SuperAdmin, "hq");
    let result = evaluator().evaluate(
        &subject,
        &rental("t1", "loc-1"),
        &ScopeRequirement::write(ScopeLevel::Location).allowing_global_write(),
    );
    assert!(result.is_ok());
}

#[test]
fn test_global_same_tenant_write_needs_no_override() {
    let subject = Subject::new("admin", Role::CentralAdmin, "hq");
    let result = evaluator().evaluate(
        &subject,
        &ResourceContext::new("tenant", "hq").in_tenant("hq"),
        &ScopeRequirement::write(ScopeLevel::Global),
    );
    assert!(result.is_ok());
}

#[test]
fn test_global_write_without_resource_tenant() {
    let subject = Subject::new("admin", Role::DevopsAdmin, "hq");
    let result = evaluator().evaluate(
        &subject,
        &ResourceContext::new("system", "maintenance"),
        &ScopeRequirement::write(ScopeLevel::Global),
    );
    assert!(result.is_ok());
}

#[test]
fn test_unknown_role_in_partial_policy() {
    let hierarchy = crate::hierarchy::RoleHierarchy::new(&[crate::hierarchy::RoleDefinition::new(
        Role::Operator,
        1,
        ScopeLevel::Location,
    )])
    .unwrap();
    let evaluator = ScopeEvaluator::new(hierarchy);

    let result = evaluator.evaluate(
        &Subject::new("u1", Role::Accountant, "t1"),
        &ResourceContext::default(),
        &ScopeRequirement::read(ScopeLevel::Location),
    );
    assert_eq!(kind(result), Some(DenialKind::UnknownRole));
}

#[test]
fn test_evaluation_is_idempotent() {
    let evaluator = evaluator();
    let subject = Subject::new("u1", Role::Boltvezeto, "t1").at_location("loc-1");
    let resource = rental("t1", "loc-2");
    let requirement = ScopeRequirement::read(ScopeLevel::Location);

    let first = evaluator.evaluate(&subject, &resource, &requirement);
    let second = evaluator.evaluate(&subject, &resource, &requirement);
    assert_eq!(first, second);
}
