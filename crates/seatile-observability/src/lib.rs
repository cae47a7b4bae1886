use metrics_exporter_prometheus::PrometheusBuilder;
use seatile_config::ServiceConfig;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// What `init` managed to install.
#[derive(Debug, Clone)]
pub struct ObservabilityHandle {
    pub service_name: String,
    pub environment: String,
    pub metrics_listener: Option<SocketAddr>,
}

impl ObservabilityHandle {
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_listener.is_some()
    }
}

/// Installs the global log subscriber and, when an address is configured,
/// the Prometheus listener. Failures degrade to logging only.
pub fn init(config: &ServiceConfig) -> ObservabilityHandle {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.log_level))
        .with_target(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let environment = config.environment.to_string();
    let metrics_listener = config
        .metrics_addr
        .as_deref()
        .and_then(|raw| metrics_listener(raw, &config.service_name))
        .filter(|addr| install_exporter(*addr, &config.service_name, &environment));

    ObservabilityHandle {
        service_name: config.service_name.clone(),
        environment,
        metrics_listener,
    }
}

pub fn log_startup(handle: &ObservabilityHandle) {
    tracing::info!(
        service = %handle.service_name,
        environment = %handle.environment,
        metrics_listener = ?handle.metrics_listener,
        "seatile service starting"
    );
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn metrics_listener(raw: &str, service: &str) -> Option<SocketAddr> {
    match raw.trim().parse() {
        Ok(addr) => Some(addr),
        Err(err) => {
            tracing::warn!(
                service = %service,
                value = %raw,
                error = %err,
                "Invalid SEATILE_METRICS_ADDR value, metrics disabled"
            );
            None
        }
    }
}

fn install_exporter(addr: SocketAddr, service: &str, environment: &str) -> bool {
    let installed = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", service)
        .add_global_label("environment", environment)
        .install();
    if let Err(err) = installed {
        tracing::warn!(
            service = %service,
            %addr,
            error = %err,
            "Prometheus exporter not started"
        );
        return false;
    }
    true
}
