use clap::Parser;
use hubproxy::{start_server, Config};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hubproxy", version, about = "Hostname-routed container registry proxy")]
struct Args {
    /// TOML configuration file (compiled-in defaults when omitted)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "bind")]
    bind_address: Option<String>,

    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Domain suffix routes are served under, e.g. `example.com` -> `docker.example.com`
    #[arg(long = "domain")]
    domain: Option<String>,

    /// Debug mode: http realm, unmapped hosts go to --target-upstream
    #[arg(long = "debug")]
    debug: bool,

    #[arg(long = "target-upstream")]
    target_upstream: Option<String>,
}

impl Args {
    fn into_config(self) -> hubproxy::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(bind_address) = self.bind_address {
            config.server.bind_address = bind_address;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(domain) = self.domain {
            config.proxy.domain = domain;
        }
        if self.debug {
            config.proxy.debug = true;
        }
        if let Some(target) = self.target_upstream {
            config.proxy.target_upstream = Some(target);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Default to info level if RUST_LOG not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let source = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "compile-time defaults".to_string());

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting hubproxy (configuration: {})", source);
    tracing::info!("Domain: {}", config.proxy.domain);

    let handle = match start_server(config).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                tracing::error!("Server task failed: {:?}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
    }
}
