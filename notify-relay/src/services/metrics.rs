//! Metrics collection for notify-relay.
//!
//! One Prometheus recorder backs both the HTTP middleware metrics and the
//! relay counters below.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))?;

    // A concurrent caller may have won; its handle is equivalent.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record one push attempt. `trigger` is the endpoint that caused it.
pub fn record_dispatch(trigger: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("relay_dispatch_total", "trigger" => trigger, "status" => status).increment(1);
}

/// Record one follow-event registration attempt.
pub fn record_registration(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("relay_registrations_total", "status" => status).increment(1);
}

pub fn record_weather_fetch(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("relay_weather_fetch_total", "status" => status).increment(1);
}
