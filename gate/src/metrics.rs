//! Prometheus metrics for the join gate.
//!
//! [`GateMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct GateMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Join requests received from the chat platform.
    pub join_requests: IntCounter,
    /// Verification records created.
    pub records_created: IntCounter,
    /// Verification prompts delivered to members.
    pub prompts_sent: IntCounter,
    /// Verification prompts that could not be delivered.
    pub prompts_failed: IntCounter,
    /// Proof sessions opened.
    pub sessions_started: IntCounter,
    /// Records flipped to verified.
    pub completions: IntCounter,
    /// Completion attempts refused (unknown, already verified, bad proof).
    pub completion_rejections: IntCounter,
    /// Join approvals that failed after every retry.
    pub approval_failures: IntCounter,
    pub polls_started: IntCounter,
    pub polls_finished: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Status polls currently running.
    pub active_polls: IntGauge,
}

impl GateMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| {
            register_int_counter_with_registry!(Opts::new(name, help), registry)
                .expect("failed to register gate counter")
        };

        let join_requests = counter("reval_join_requests_total", "Join requests received");
        let records_created =
            counter("reval_records_created_total", "Verification records created");
        let prompts_sent = counter("reval_prompts_sent_total", "Verification prompts delivered");
        let prompts_failed = counter(
            "reval_prompts_failed_total",
            "Verification prompts that could not be delivered",
        );
        let sessions_started = counter("reval_sessions_started_total", "Proof sessions opened");
        let completions = counter("reval_completions_total", "Records marked verified");
        let completion_rejections = counter(
            "reval_completion_rejections_total",
            "Completion attempts refused",
        );
        let approval_failures = counter(
            "reval_approval_failures_total",
            "Join approvals that failed after all retries",
        );
        let polls_started = counter("reval_polls_started_total", "Status polls started");
        let polls_finished = counter("reval_polls_finished_total", "Status polls finished");

        let active_polls = register_int_gauge_with_registry!(
            Opts::new("reval_active_polls", "Status polls currently running"),
            registry
        )
        .expect("failed to register active_polls gauge");

        Self {
            registry,
            join_requests,
            records_created,
            prompts_sent,
            prompts_failed,
            sessions_started,
            completions,
            completion_rejections,
            approval_failures,
            polls_started,
            polls_finished,
            active_polls,
        }
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_counters() {
        let metrics = GateMetrics::new();
        metrics.completions.inc();
        let text = metrics.encode();
        assert!(text.contains("reval_completions_total 1"));
        assert!(text.contains("reval_active_polls 0"));
    }

    #[test]
    fn registries_are_independent() {
        let a = GateMetrics::new();
        let b = GateMetrics::new();
        a.join_requests.inc();
        assert_eq!(b.join_requests.get(), 0);
    }
}
