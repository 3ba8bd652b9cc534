//! HTTP front end for the stock advisor

pub mod routes;

use crate::error::Result;
use crate::pipeline::StockAdvisor;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

pub use routes::{ANALYZE_PATH, create_router};

/// State shared by all request handlers
pub struct AppState {
    pub advisor: StockAdvisor,
}

impl AppState {
    pub fn new(advisor: StockAdvisor) -> Arc<Self> {
        Arc::new(Self { advisor })
    }
}

/// Bind `host:port` and serve until Ctrl-C
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C signal, starting graceful shutdown");
    }
}
