//! Authorization guard
//!
//! Orchestrates permission composition, scope evaluation, elevated-access
//! freshness and constraint validation for one request intent, with audit
//! logging and metrics.

pub mod audit;
pub mod decision;
pub mod metrics;

pub use audit::{
    spawn_audit_forwarder, AuditEntry, AuditError, AuditKind, AuditSink, ChannelAuditSink,
    MemoryAuditSink, TracingAuditSink,
};
pub use decision::{
    AccessRequest, AuthorizationDecision, ConstraintCheck, Denial, DenialKind,
    ElevatedAccessRequirement, PermissionLogic,
};
pub use metrics::{GuardMetrics, MetricsCollector};

use crate::error::{AuthzError, Result};
use crate::hierarchy::{Role, RoleHierarchy};
use crate::operations::OperationRegistry;
use crate::permissions::PermissionComposer;
use crate::policy::Policy;
use crate::scope::ScopeEvaluator;
use crate::session::ElevatedAccessStore;
use crate::types::{ResourceContext, Subject};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Composition root of the decision engine
///
/// # Pipeline
///
/// ```text
/// Request → subject → permissions → scope → elevated access → constraint → Decision
///                                                                             ↓
///                                                           [Audit (denials)] [Metrics]
/// ```
///
/// The first failing stage decides. Evaluation does no I/O apart from the
/// audit call, whose failures are logged and never change the outcome.
pub struct AuthorizationGuard {
    /// Effective permissions and constraint limits
    composer: PermissionComposer,

    /// Tenant/location checks
    scope: ScopeEvaluator,

    /// Elevated-access sessions, shared with whoever records verifications
    sessions: Arc<ElevatedAccessStore>,

    /// Optional audit destination
    audit: Option<Arc<dyn AuditSink>>,

    /// Named operation policies
    operations: OperationRegistry,

    metrics: MetricsCollector,
}

impl std::fmt::Debug for AuthorizationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGuard")
            .field("roles", &self.composer.hierarchy().roles().count())
            .field("operations", &self.operations.len())
            .field("audit", &self.audit.is_some())
            .finish()
    }
}

/// Assembles an [`AuthorizationGuard`]
pub struct GuardBuilder {
    policy: Policy,
    sessions: Option<Arc<ElevatedAccessStore>>,
    audit: Option<Arc<dyn AuditSink>>,
    operations: OperationRegistry,
}

impl GuardBuilder {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            sessions: None,
            audit: None,
            operations: OperationRegistry::new(),
        }
    }

    /// Share an existing session store
    pub fn session_store(mut self, sessions: Arc<ElevatedAccessStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn operations(mut self, operations: OperationRegistry) -> Self {
        self.operations = operations;
        self
    }

    /// Validate the policy and build the guard
    ///
    /// Policy defects (cycles, undefined parents, catalog roles without a
    /// definition) fail here rather than per request.
    pub fn build(self) -> Result<AuthorizationGuard> {
        let composer = self.policy.composer()?;
        let scope = ScopeEvaluator::new(composer.hierarchy().clone());
        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(ElevatedAccessStore::new()));

        info!(
            "AuthorizationGuard initialized with {} roles, {} operations, audit={}",
            composer.hierarchy().roles().count(),
            self.operations.len(),
            self.audit.is_some()
        );

        Ok(AuthorizationGuard {
            composer,
            scope,
            sessions,
            audit: self.audit,
            operations: self.operations,
            metrics: MetricsCollector::new(),
        })
    }
}

impl AuthorizationGuard {
    /// Guard over `policy` sharing `sessions`, without audit or operations
    pub fn new(policy: Policy, sessions: Arc<ElevatedAccessStore>) -> Result<Self> {
        GuardBuilder::new(policy).session_store(sessions).build()
    }

    pub fn builder(policy: Policy) -> GuardBuilder {
        GuardBuilder::new(policy)
    }

    /// Evaluate a request intent
    ///
    /// Always returns exactly one decision. Every denial is audited.
    pub fn authorize(&self, request: &AccessRequest) -> AuthorizationDecision {
        let start = Instant::now();
        let now = self.sessions.now();

        let decision = match self.evaluate(request) {
            Ok(()) => AuthorizationDecision::allow(now),
            Err(denial) => {
                self.audit_denial(request, &denial, now);
                AuthorizationDecision::deny(denial, now)
            }
        };

        self.metrics
            .record_decision(decision.denial_kind(), start.elapsed());
        decision
    }

    /// Evaluate a registered operation
    ///
    /// Only an unregistered `name` is an error; everything else is a decision.
    pub fn authorize_operation(
        &self,
        name: &str,
        subject: Option<Subject>,
        resource: ResourceContext,
        value: Option<f64>,
    ) -> Result<AuthorizationDecision> {
        let policy = self.operations.get(name)?;
        debug!("Authorizing operation {}", name);
        Ok(self.authorize(&policy.to_request(subject, resource, value)))
    }

    fn evaluate(&self, request: &AccessRequest) -> std::result::Result<(), Denial> {
        // Step 0: subject
        let subject = request.subject.as_ref().ok_or(Denial::MissingSubject)?;
        if !self.composer.hierarchy().contains(subject.role) {
            error!(
                "Role {} of subject {} is not defined in the policy",
                subject.role, subject.id
            );
            return Err(Denial::UnknownRole {
                role: subject.role.to_string(),
            });
        }

        debug!(
            "Authorization request: subject={}, role={}, permissions={:?}",
            subject.id, subject.role, request.required_permissions
        );

        // Step 1: permissions
        self.check_permissions(subject, request)?;

        // Step 2: scope
        if let Some(requirement) = &request.scope {
            self.scope.evaluate(subject, &request.resource, requirement)?;
        }

        // Step 3: elevated access
        if let Some(elevated) = &request.elevated_access {
            if !self.sessions.is_fresh(&subject.id, elevated.ttl) {
                debug!("Subject {} needs re-verification within {}", subject.id, elevated.ttl);
                return Err(Denial::ElevatedAccessRequired {
                    required_ttl_secs: elevated.ttl.as_secs(),
                });
            }
        }

        // Step 4: constraint
        if let Some(check) = &request.constraint {
            self.check_constraint(subject, check)?;
        }

        Ok(())
    }

    fn check_permissions(
        &self,
        subject: &Subject,
        request: &AccessRequest,
    ) -> std::result::Result<(), Denial> {
        let required = &request.required_permissions;
        if required.is_empty() {
            return Ok(());
        }

        let missing = self
            .composer
            .missing_permissions(subject.role, required)
            .map_err(|_| Denial::UnknownRole {
                role: subject.role.to_string(),
            })?;

        let satisfied = match request.permission_logic {
            PermissionLogic::All => missing.is_empty(),
            PermissionLogic::Any => missing.len() < required.len(),
        };

        if satisfied {
            return Ok(());
        }

        Err(Denial::PermissionDenied {
            missing,
            logic: request.permission_logic,
        })
    }

    fn check_constraint(
        &self,
        subject: &Subject,
        check: &ConstraintCheck,
    ) -> std::result::Result<(), Denial> {
        let held = self
            .composer
            .has_permission(subject.role, check.permission)
            .map_err(|_| Denial::UnknownRole {
                role: subject.role.to_string(),
            })?;

        // an unheld permission has no limit to skip
        if !held {
            return Err(Denial::PermissionDenied {
                missing: vec![check.permission],
                logic: PermissionLogic::All,
            });
        }

        let limit = self
            .composer
            .resolve_constraint(subject.role, check.permission, check.key)
            .map_err(|_| Denial::UnknownRole {
                role: subject.role.to_string(),
            })?;

        let Some(limit) = limit else {
            debug!(
                "No {} constraint on {} for role {}, skipping",
                check.key, check.permission, subject.role
            );
            return Ok(());
        };

        let value = if check.use_absolute_value {
            check.value.abs()
        } else {
            check.value
        };

        // NaN never passes a limit
        if value.is_finite() && value <= limit {
            return Ok(());
        }

        Err(Denial::ConstraintExceeded {
            permission: check.permission,
            key: check.key,
            limit,
            value,
        })
    }

    /// Record a successful re-verification for `subject`
    ///
    /// Credential checking happens before this call, outside the engine.
    pub fn grant_elevated_access(&self, subject: &Subject) -> DateTime<Utc> {
        let verified_at = self.sessions.record_verification(&subject.id);
        self.metrics.record_elevated_grant();

        info!("Elevated access granted to subject {}", subject.id);

        self.emit(
            AuditEntry::new(AuditKind::ElevatedAccessGranted, verified_at)
                .with_subject(subject.id.as_str(), subject.tenant_id.as_str())
                .with_details(serde_json::json!({
                    "role": subject.role,
                    "verified_at": verified_at,
                })),
        );

        verified_at
    }

    /// Drop `subject`'s elevated-access session (logout)
    pub fn revoke_elevated_access(&self, subject: &Subject) -> bool {
        let removed = self.sessions.clear_verification(&subject.id);
        if removed {
            info!("Elevated access revoked for subject {}", subject.id);
            self.emit(
                AuditEntry::new(AuditKind::ElevatedAccessRevoked, self.sessions.now())
                    .with_subject(subject.id.as_str(), subject.tenant_id.as_str()),
            );
        }
        removed
    }

    /// Whether `grantor` may assign `target`; refusals are audited
    pub fn check_role_assignment(&self, grantor: &Subject, target: Role) -> Result<bool> {
        let allowed = self.composer.hierarchy().can_grant(grantor.role, target)?;

        if !allowed {
            warn!(
                "Subject {} ({}) may not assign role {}",
                grantor.id, grantor.role, target
            );
            let hierarchy = self.composer.hierarchy();
            self.emit(
                AuditEntry::new(AuditKind::RoleAssignmentDenied, self.sessions.now())
                    .with_subject(grantor.id.as_str(), grantor.tenant_id.as_str())
                    .with_details(serde_json::json!({
                        "grantor_role": grantor.role,
                        "grantor_level": hierarchy.level_of(grantor.role)?,
                        "target_role": target,
                        "target_level": hierarchy.level_of(target)?,
                    })),
            );
        }

        Ok(allowed)
    }

    fn audit_denial(&self, request: &AccessRequest, denial: &Denial, now: DateTime<Utc>) {
        let mut entry = AuditEntry::for_denial(denial, now).with_resource(
            request.resource.resource_type.clone(),
            request.resource.resource_id.clone(),
        );
        if let Some(subject) = &request.subject {
            entry = entry.with_subject(subject.id.as_str(), subject.tenant_id.as_str());
        }

        debug!("Denied: {}", denial);
        self.emit(entry);
    }

    fn emit(&self, entry: AuditEntry) {
        let Some(sink) = &self.audit else {
            return;
        };

        if let Err(e) = sink.log(&entry) {
            self.metrics.record_audit_failure();
            warn!("Audit entry {} ({:?}) dropped: {}", entry.id, entry.kind, e);
        }
    }

    pub fn hierarchy(&self) -> &RoleHierarchy {
        self.composer.hierarchy()
    }

    pub fn composer(&self) -> &PermissionComposer {
        &self.composer
    }

    pub fn session_store(&self) -> &Arc<ElevatedAccessStore> {
        &self.sessions
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> GuardMetrics {
        self.metrics.snapshot()
    }

    /// Metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        self.metrics.export_prometheus()
    }
}

impl TryFrom<Policy> for AuthorizationGuard {
    type Error = AuthzError;

    fn try_from(policy: Policy) -> Result<Self> {
        GuardBuilder::new(policy).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hierarchy::ScopeLevel;
    use crate::permissions::{ConstraintKey, Permission};
    use crate::scope::ScopeRequirement;
    use crate::session::ElevatedTtl;
    use std::time::Duration;

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn log(&self, _entry: &AuditEntry) -> std::result::Result<(), AuditError> {
            Err(AuditError::Backend("unavailable".to_string()))
        }
    }

    fn guard_with(sink: Arc<dyn AuditSink>) -> (AuthorizationGuard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let sessions = Arc::new(ElevatedAccessStore::with_clock(clock.clone()));
        let guard = AuthorizationGuard::builder(Policy::reference())
            .session_store(sessions)
            .audit_sink(sink)
            .operations(OperationRegistry::reference())
            .build()
            .unwrap();
        (guard, clock)
    }

    fn boltvezeto() -> Subject {
        Subject::new("u-bv", Role::Boltvezeto, "t1").at_location("loc-1")
    }

    #[test]
    fn test_guard_creation() {
        let guard = AuthorizationGuard::try_from(Policy::reference()).unwrap();
        assert_eq!(guard.hierarchy().roles().count(), 8);
        assert!(guard.operations().is_empty());
        assert_eq!(guard.metrics().total_requests, 0);
    }

    #[test]
    fn test_missing_subject() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        let decision = guard.authorize(&AccessRequest::default());

        assert!(!decision.allowed);
        assert_eq!(decision.denial_kind(), Some(DenialKind::MissingSubject));
    }

    #[test]
    fn test_empty_requirements_allow() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        let decision = guard.authorize(&AccessRequest::new(boltvezeto()));
        assert!(decision.allowed);
    }

    #[test]
    fn test_any_logic() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        let operator = Subject::new("u-op", Role::Operator, "t1");

        let any = AccessRequest::new(operator.clone())
            .require(Permission::UserDelete)
            .require(Permission::RentalView)
            .any_of();
        assert!(guard.authorize(&any).allowed);

        let all = AccessRequest::new(operator)
            .require(Permission::UserDelete)
            .require(Permission::RentalView);
        let decision = guard.authorize(&all);
        assert_eq!(
            decision.denial,
            Some(Denial::PermissionDenied {
                missing: vec![Permission::UserDelete],
                logic: PermissionLogic::All,
            })
        );
    }

    #[test]
    fn test_stages_short_circuit_in_order() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));

        // lacks the permission and the scope; permission is reported
        let request = AccessRequest::new(Subject::new("u-op", Role::Operator, "t1"))
            .require(Permission::TenantManage)
            .with_scope(ScopeRequirement::write(ScopeLevel::Global))
            .with_elevated_access(ElevatedTtl::DEFAULT);
        assert_eq!(
            guard.authorize(&request).denial_kind(),
            Some(DenialKind::PermissionDenied)
        );

        // scope fails before elevated access is consulted
        let request = AccessRequest::new(boltvezeto())
            .require(Permission::FinanceRefund)
            .on(ResourceContext::new("refund", "r1").in_tenant("t2"))
            .with_scope(ScopeRequirement::write(ScopeLevel::Location))
            .with_elevated_access(ElevatedTtl::DEFAULT);
        assert_eq!(
            guard.authorize(&request).denial_kind(),
            Some(DenialKind::TenantMismatch)
        );
    }

    #[test]
    fn test_elevated_access_window() {
        let (guard, clock) = guard_with(Arc::new(MemoryAuditSink::new()));
        let subject = boltvezeto();
        let request = AccessRequest::new(subject.clone())
            .require(Permission::InventoryWriteOff)
            .with_elevated_access(ElevatedTtl::DEFAULT);

        assert_eq!(
            guard.authorize(&request).denial,
            Some(Denial::ElevatedAccessRequired { required_ttl_secs: 300 })
        );

        guard.grant_elevated_access(&subject);
        assert!(guard.authorize(&request).allowed);

        clock.advance(Duration::from_secs(301));
        assert!(!guard.authorize(&request).allowed);

        guard.grant_elevated_access(&subject);
        assert!(guard.revoke_elevated_access(&subject));
        assert!(!guard.authorize(&request).allowed);
    }

    #[test]
    fn test_constraint_boundary() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        let request = |value: f64, absolute: bool| {
            AccessRequest::new(boltvezeto())
                .require(Permission::RentalDiscount)
                .with_constraint(ConstraintCheck {
                    permission: Permission::RentalDiscount,
                    key: ConstraintKey::DiscountLimit,
                    value,
                    use_absolute_value: absolute,
                })
        };

        assert!(guard.authorize(&request(20.0, false)).allowed);
        assert!(!guard.authorize(&request(21.0, false)).allowed);
        assert!(guard.authorize(&request(-25.0, false)).allowed);
        assert!(!guard.authorize(&request(-25.0, true)).allowed);
        assert!(!guard.authorize(&request(f64::NAN, false)).allowed);
    }

    #[test]
    fn test_undefined_constraint_is_skipped() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        let request = AccessRequest::new(Subject::new("u-acc", Role::Accountant, "t1"))
            .require(Permission::InvoiceVoid)
            .with_constraint(ConstraintCheck {
                permission: Permission::InvoiceVoid,
                key: ConstraintKey::RefundLimit,
                value: 1e12,
                use_absolute_value: false,
            });
        assert!(guard.authorize(&request).allowed);
    }

    #[test]
    fn test_denials_and_grants_are_audited() {
        let sink = Arc::new(MemoryAuditSink::new());
        let (guard, _) = guard_with(sink.clone());
        let subject = boltvezeto();

        let request = AccessRequest::new(subject.clone())
            .require(Permission::SystemConfigure)
            .on(ResourceContext::new("config", "c1"));
        guard.authorize(&request);
        guard.grant_elevated_access(&subject);
        guard.authorize(&AccessRequest::new(subject.clone()));

        let entries = sink.by_subject(&subject.id);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, AuditKind::PermissionDenied);
        assert_eq!(entries[0].resource_type.as_deref(), Some("config"));
        assert_eq!(entries[0].tenant_id.as_deref(), Some("t1"));
        assert_eq!(entries[1].kind, AuditKind::ElevatedAccessGranted);
    }

    #[test]
    fn test_audit_failure_does_not_change_outcome() {
        let (guard, _) = guard_with(Arc::new(FailingSink));

        let denied = guard.authorize(
            &AccessRequest::new(Subject::new("u-op", Role::Operator, "t1"))
                .require(Permission::RentalDiscount),
        );
        assert_eq!(denied.denial_kind(), Some(DenialKind::PermissionDenied));

        let allowed = guard.authorize(&AccessRequest::new(boltvezeto()).require(Permission::RentalDiscount));
        assert!(allowed.allowed);

        assert_eq!(guard.metrics().audit_failures, 1);
    }

    #[test]
    fn test_role_assignment() {
        let sink = Arc::new(MemoryAuditSink::new());
        let (guard, _) = guard_with(sink.clone());
        let accountant = Subject::new("u-acc", Role::Accountant, "t1");

        assert!(guard.check_role_assignment(&accountant, Role::Boltvezeto).unwrap());
        assert!(!guard.check_role_assignment(&accountant, Role::PartnerOwner).unwrap());

        let denied = sink.by_kind(AuditKind::RoleAssignmentDenied);
        assert_eq!(denied.len(), 1);
        assert_eq!(denied[0].details["target_role"], "PARTNER_OWNER");
    }

    #[test]
    fn test_authorize_operation() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));

        let decision = guard
            .authorize_operation("rental.discount", Some(boltvezeto()), ResourceContext::default(), Some(20.0))
            .unwrap();
        assert!(decision.allowed);

        assert!(matches!(
            guard.authorize_operation("nope", Some(boltvezeto()), ResourceContext::default(), None),
            Err(AuthzError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_metrics_count_outcomes() {
        let (guard, _) = guard_with(Arc::new(MemoryAuditSink::new()));
        guard.authorize(&AccessRequest::default());
        guard.authorize(&AccessRequest::new(boltvezeto()));

        let metrics = guard.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.allowed_decisions, 1);
        assert_eq!(metrics.denials(DenialKind::MissingSubject), 1);
        assert!(guard.export_prometheus().contains("authz_requests_total 2"));
    }
}
