use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Attempt lifecycle events: `started`, `resumed`, `preview`, `draft_saved`,
/// `submitted`, `expired`.
pub(crate) fn record_attempt_event(event: &'static str) {
    metrics::counter!("kambaz_quiz_attempt_events_total", "event" => event).increment(1);
}

pub(crate) fn record_attempt_score(score: f64, total_points: f64) {
    if total_points > 0.0 {
        metrics::histogram!("kambaz_quiz_attempt_score_ratio").record(score / total_points);
    }
}
