//! Guard metrics with Prometheus text export

use super::decision::DenialKind;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time guard counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuardMetrics {
    /// Total number of evaluations
    pub total_requests: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Denials broken down by kind
    pub denials_by_kind: HashMap<DenialKind, u64>,

    /// Elevated-access grants recorded
    pub elevated_grants: u64,

    /// Audit calls that failed and were dropped
    pub audit_failures: u64,

    /// Latency percentiles over recent evaluations
    pub latency_p50_us: f64,
    pub latency_p99_us: f64,

    /// Average latency
    pub avg_latency_us: f64,
}

impl GuardMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }

    /// Denials of one kind
    pub fn denials(&self, kind: DenialKind) -> u64 {
        self.denials_by_kind.get(&kind).copied().unwrap_or(0)
    }
}

/// Lock-free counters plus a bounded latency window
#[derive(Debug)]
pub struct MetricsCollector {
    total: AtomicU64,
    allowed: AtomicU64,
    denied: [AtomicU64; DenialKind::ALL.len()],
    elevated_grants: AtomicU64,
    audit_failures: AtomicU64,

    /// Recent latencies in microseconds (ring buffer)
    latency_samples: Mutex<VecDeque<f64>>,

    /// Maximum samples to keep
    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_max_samples(10_000)
    }

    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            total: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            denied: Default::default(),
            elevated_grants: AtomicU64::new(0),
            audit_failures: AtomicU64::new(0),
            latency_samples: Mutex::new(VecDeque::with_capacity(max_samples.min(10_000))),
            max_samples: max_samples.max(1),
        }
    }

    fn slot(kind: DenialKind) -> usize {
        DenialKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }

    /// Record one evaluation outcome
    pub fn record_decision(&self, denial: Option<DenialKind>, latency: Duration) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match denial {
            None => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
            }
            Some(kind) => {
                self.denied[Self::slot(kind)].fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut samples = self.latency_samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(latency.as_secs_f64() * 1_000_000.0);
    }

    pub fn record_elevated_grant(&self) {
        self.elevated_grants.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Current metrics snapshot
    pub fn snapshot(&self) -> GuardMetrics {
        let denials_by_kind: HashMap<DenialKind, u64> = DenialKind::ALL
            .iter()
            .map(|kind| (*kind, self.denied[Self::slot(*kind)].load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        let mut sorted: Vec<f64> = self.latency_samples.lock().iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let avg = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        GuardMetrics {
            total_requests: self.total.load(Ordering::Relaxed),
            allowed_decisions: self.allowed.load(Ordering::Relaxed),
            denied_decisions: denials_by_kind.values().sum(),
            denials_by_kind,
            elevated_grants: self.elevated_grants.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
            latency_p50_us: Self::percentile(&sorted, 0.50),
            latency_p99_us: Self::percentile(&sorted, 0.99),
            avg_latency_us: avg,
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        for counter in &self.denied {
            counter.store(0, Ordering::Relaxed);
        }
        self.elevated_grants.store(0, Ordering::Relaxed);
        self.audit_failures.store(0, Ordering::Relaxed);
        self.latency_samples.lock().clear();
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.snapshot();

        let mut out = format!(
            r#"# HELP authz_requests_total Total number of authorization requests
# TYPE authz_requests_total counter
authz_requests_total {}

# HELP authz_allowed_total Number of allowed decisions
# TYPE authz_allowed_total counter
authz_allowed_total {}

# HELP authz_elevated_grants_total Elevated-access grants
# TYPE authz_elevated_grants_total counter
authz_elevated_grants_total {}

# HELP authz_audit_failures_total Audit entries dropped
# TYPE authz_audit_failures_total counter
authz_audit_failures_total {}

# HELP authz_latency_seconds Evaluation latency percentiles
# TYPE authz_latency_seconds summary
authz_latency_seconds{{quantile="0.5"}} {}
authz_latency_seconds{{quantile="0.99"}} {}

# HELP authz_denied_total Denied decisions by kind
# TYPE authz_denied_total counter
"#,
            metrics.total_requests,
            metrics.allowed_decisions,
            metrics.elevated_grants,
            metrics.audit_failures,
            metrics.latency_p50_us / 1_000_000.0,
            metrics.latency_p99_us / 1_000_000.0,
        );

        for kind in DenialKind::ALL {
            out.push_str(&format!(
                "authz_denied_total{{kind=\"{}\"}} {}\n",
                kind.code(),
                metrics.denials(kind)
            ));
        }
        out
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
