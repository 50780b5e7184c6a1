//! HTTP server implementation.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::bot::Bot;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
        }
    }
}

impl ServerConfig {
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

/// Serve the status endpoint until the bot's shutdown token fires.
pub async fn serve(config: ServerConfig, bot: Arc<Bot>) -> anyhow::Result<()> {
    let shutdown = bot.shutdown_token();
    let app = routes(bot);

    let listener = TcpListener::bind(config.addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Starting status server on {}", actual_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Status server shutdown complete");
    Ok(())
}
