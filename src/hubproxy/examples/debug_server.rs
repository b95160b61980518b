//! Local hubproxy in debug mode
//!
//! Routes are served under `*.localhost` over plain HTTP, and any host without a route
//! is sent to Docker Hub.
//!
//! Run with:
//! ```bash
//! cargo run --example debug_server
//! docker pull docker.localhost:5050/busybox
//! ```

use hubproxy::{start_server, Config};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("hubproxy=debug")
        .init();

    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.port = 5050;
    config.proxy.domain = "localhost".to_string();
    config.proxy.debug = true;

    tracing::info!("Starting hubproxy in debug mode...");
    tracing::info!("  Port: {}", config.server.port);
    tracing::info!("  Press Ctrl+C to stop");

    let _server_handle = start_server(config).await?;

    signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    Ok(())
}
