//! Gateway server startup

use crate::routes::{router, GatewayState};
use daimon_heartbeat::config::GatewayConfig;
use daimon_heartbeat::RiskClassifier;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub async fn start_gateway(config: &GatewayConfig, classifier: RiskClassifier) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {}:{}: {}", config.bind, config.port, e))?;

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Daimon gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    serve(listener, classifier).await
}

/// Serve on an already-bound listener until the process ends.
pub async fn serve(listener: TcpListener, classifier: RiskClassifier) -> anyhow::Result<()> {
    let state = Arc::new(GatewayState { classifier });
    let app = router(state).layer(TraceLayer::new_for_http());
    axum::serve(listener, app).await?;
    Ok(())
}
