use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus metrics recorder")
});

/// Process-wide Prometheus handle; the recorder is installed on first use.
pub fn prometheus_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE.clone()
}
