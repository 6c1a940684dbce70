//! Delivery metrics
//!
//! Every event is counted twice: in process (for the monitoring endpoint)
//! and through the `metrics` facade (Prometheus when a recorder is installed).

use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Lifetime counters shared by the dispatcher and its workers
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    accepted: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    active_workers: AtomicU32,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self, queue_depth: usize) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        counter!("relay_jobs_accepted_total").increment(1);
        gauge!("relay_queue_depth").set(queue_depth as f64);
    }

    pub fn record_rejected(&self, reason: &'static str) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        counter!("relay_jobs_rejected_total", "reason" => reason).increment(1);
    }

    pub fn record_delivered(&self, session: &str, duration: Duration) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        counter!(
            "relay_deliveries_total",
            "outcome" => "success",
            "session" => session.to_string()
        )
        .increment(1);
        histogram!("relay_delivery_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn record_failed(&self, session: &str, duration: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        counter!(
            "relay_deliveries_total",
            "outcome" => "failure",
            "session" => session.to_string()
        )
        .increment(1);
        histogram!("relay_delivery_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn worker_busy(&self) {
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("relay_active_workers").set(active as f64);
    }

    pub fn worker_idle(&self) {
        let active = self.active_workers.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        gauge!("relay_active_workers").set(active as f64);
    }

    pub fn set_queue_depth(&self, depth: usize) {
        gauge!("relay_queue_depth").set(depth as f64);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> u32 {
        self.active_workers.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = DispatchMetrics::new();
        m.record_accepted(1);
        m.record_accepted(2);
        m.record_rejected("queue_full");
        m.record_delivered("A", Duration::from_millis(5));
        m.record_failed("B", Duration::from_millis(5));

        assert_eq!(m.accepted(), 2);
        assert_eq!(m.rejected(), 1);
        assert_eq!(m.delivered(), 1);
        assert_eq!(m.failed(), 1);
    }

    #[test]
    fn test_active_workers_gauge() {
        let m = DispatchMetrics::new();
        m.worker_busy();
        m.worker_busy();
        m.worker_idle();
        assert_eq!(m.active_workers(), 1);
    }
}
