pub mod config;
pub mod error;
pub mod registry;
pub mod responses;
pub mod routes;
pub mod server;

pub use config::{Config, ProxyConfig, RouteConfig};
pub use error::{ProxyError, Result};
pub use routes::RouteTable;
pub use server::{build_router, AppState, RequestKind};

/// Start the registry proxy with the given configuration
pub async fn start_server(config: Config) -> Result<tokio::task::JoinHandle<()>> {
    server::start_server(config).await
}
