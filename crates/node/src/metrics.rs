//! Prometheus text exposition over HTTP.

use std::{
    io,
    sync::{Arc, Mutex},
};

use axum::{extract::State, routing::get, Router};
use prometheus_client::{encoding::text::encode, registry::Registry};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

/// Registry shared between the subsystems that register metrics and the
/// exposition endpoint.
pub type SharedRegistry = Arc<Mutex<Registry>>;

#[tracing::instrument(name = "metrics", skip_all)]
pub async fn serve(listen_addr: impl ToSocketAddrs, registry: SharedRegistry) {
    if let Err(e) = inner(listen_addr, registry).await {
        error!("Metrics server failed: {e}");
    }
}

async fn inner(listen_addr: impl ToSocketAddrs, registry: SharedRegistry) -> io::Result<()> {
    let app = Router::new().route("/metrics", get(get_metrics)).with_state(registry);
    let listener = TcpListener::bind(listen_addr).await?;
    let local_addr = listener.local_addr()?;

    info!(address = %local_addr, "Serving metrics");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_metrics(State(registry): State<SharedRegistry>) -> String {
    render(&registry)
}

/// Encode the registry into the Prometheus text format.
pub fn render(registry: &SharedRegistry) -> String {
    let mut buf = String::new();
    let registry = registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Err(e) = encode(&mut buf, &registry) {
        error!("Failed to encode metrics: {e}");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::metrics::counter::Counter;

    #[test]
    fn rendered_output_carries_registered_metrics() {
        let registry: SharedRegistry = Arc::new(Mutex::new(Registry::default()));
        let counter = Counter::<u64>::default();
        registry.lock().unwrap().register("blocks_built", "Blocks assembled", counter.clone());
        counter.inc();

        let body = render(&registry);
        assert!(body.contains("blocks_built_total 1"));
    }
}
