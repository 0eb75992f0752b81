use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Safe to call more than once,
/// including concurrently: only the caller that stores the handle installs
/// its recorder.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    if METRICS_HANDLE.set(recorder.handle()).is_err() {
        return Ok(());
    }

    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow::anyhow!("Failed to install Prometheus recorder: one is already set"))
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count an authentication event (`login`, `refresh`, `register`, `logout`)
/// by outcome.
pub fn record_auth_event(event: &'static str, outcome: &'static str) {
    counter!("auth_events_total", "event" => event, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());

        record_auth_event("login", "success");
        assert!(get_metrics().contains("auth_events_total"));
    }

    #[test]
    fn test_concurrent_init_all_succeed() {
        let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(init_metrics)).collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert!(METRICS_HANDLE.get().is_some());
    }
}
