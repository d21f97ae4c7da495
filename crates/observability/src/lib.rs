use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Process-wide counters for the turn pipeline. Observability only:
/// no decision branches on these.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    turns_total: AtomicU64,
    refusals_total: AtomicU64,
    soft_refusals_total: AtomicU64,
    support_routes_total: AtomicU64,
    rewrites_total: AtomicU64,
    violations_total: AtomicU64,
    total_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub turns_total: u64,
    pub refusals_total: u64,
    pub soft_refusals_total: u64,
    pub support_routes_total: u64,
    pub rewrites_total: u64,
    pub violations_total: u64,
    pub avg_latency_micros: f64,
}

impl EngineMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_refusal(&self) {
        self.refusals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_soft_refusal(&self) {
        self.soft_refusals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_support_route(&self) {
        self.support_routes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rewrites(&self, count: u64) {
        self.rewrites_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_violations(&self, count: u64) {
        self.violations_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let turns = self.turns_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            turns_total: turns,
            refusals_total: self.refusals_total.load(Ordering::Relaxed),
            soft_refusals_total: self.soft_refusals_total.load(Ordering::Relaxed),
            support_routes_total: self.support_routes_total.load(Ordering::Relaxed),
            rewrites_total: self.rewrites_total.load(Ordering::Relaxed),
            violations_total: self.violations_total.load(Ordering::Relaxed),
            avg_latency_micros: if turns == 0 {
                0.0
            } else {
                latency as f64 / turns as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,maru_engine=info,maru_core=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = EngineMetrics::default();
        metrics.inc_turn();
        metrics.inc_turn();
        metrics.inc_refusal();
        metrics.add_rewrites(3);
        metrics.observe_latency(Duration::from_micros(200));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.turns_total, 2);
        assert_eq!(snapshot.refusals_total, 1);
        assert_eq!(snapshot.rewrites_total, 3);
        assert!((snapshot.avg_latency_micros - 100.0).abs() < 1e-9);
    }
}
