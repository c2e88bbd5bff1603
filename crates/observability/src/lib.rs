use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    turns_total: AtomicU64,
    classifier_inference_total: AtomicU64,
    airline_lookups_total: AtomicU64,
    airline_matches_total: AtomicU64,
    recommendations_total: AtomicU64,
    fallback_total: AtomicU64,
    turn_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub turns_total: u64,
    pub classifier_inference_total: u64,
    pub airline_lookups_total: u64,
    pub airline_matches_total: u64,
    pub recommendations_total: u64,
    pub fallback_total: u64,
    pub turn_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_classifier_inference(&self) {
        self.classifier_inference_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_airline_lookup(&self, matched: bool) {
        self.airline_lookups_total.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.airline_matches_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_recommendation(&self) {
        self.recommendations_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fallback(&self) {
        self.fallback_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_turn_failure(&self) {
        self.turn_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let turns = self.turns_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            turns_total: turns,
            classifier_inference_total: self.classifier_inference_total.load(Ordering::Relaxed),
            airline_lookups_total: self.airline_lookups_total.load(Ordering::Relaxed),
            airline_matches_total: self.airline_matches_total.load(Ordering::Relaxed),
            recommendations_total: self.recommendations_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            turn_failures_total: self.turn_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if turns == 0 {
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
                "{}=info,aero_api=info,aero_agents=info,aero_ml=info",
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
