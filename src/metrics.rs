use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// A recorder that is not installed globally; renders an empty exposition.
    /// Lets routers be built in tests without fighting over the global slot.
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self {
            handle: recorder.handle(),
        }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("briefing_runs_total", "Briefing pipeline runs started.");
        describe_counter!(
            "briefing_failures_total",
            "Runs that ended in a hard failure (headlines or render)."
        );
        describe_counter!(
            "briefing_task_failures_total",
            "In-wave tasks that failed or timed out, by task."
        );
        describe_gauge!(
            "briefing_discovered_entities",
            "Entities discovered in the last run."
        );
        describe_histogram!("briefing_run_ms", "Pipeline run time in milliseconds.");
    });
}
