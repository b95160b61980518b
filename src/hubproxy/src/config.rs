use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

// Constants for hardcoded values
/// Primary registry (Docker Hub). Unqualified names there live under the default namespace.
pub const DEFAULT_PRIMARY_UPSTREAM: &str = "https://registry-1.docker.io";

/// Namespace Docker Hub implies for official images (`busybox` -> `library/busybox`)
pub const DEFAULT_NAMESPACE: &str = "library";

/// Service name advertised in the proxy's own `WWW-Authenticate` challenge
pub const DEFAULT_SERVICE_NAME: &str = "hubproxy";

/// Project URL reported by the welcome page unless `proxy.repository_url` is set
pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/ciiiii/cloudflare-docker-proxy";

/// Parsed default configuration (built once at first access)
static DEFAULT_CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

/// Routing and auth-rewrite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Domain suffix; every route is served at `<label>.<domain>`
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Debug mode: plain-http realm and fallback routing to `target_upstream`
    #[serde(default)]
    pub debug: bool,
    /// Upstream used for unmapped hosts, only in debug mode
    #[serde(default = "default_target_upstream")]
    pub target_upstream: Option<String>,
    #[serde(default = "default_primary_upstream")]
    pub primary_upstream: String,
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
    #[serde(default = "default_repository_url")]
    pub repository_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            debug: false,
            target_upstream: default_target_upstream(),
            primary_upstream: default_primary_upstream(),
            default_namespace: default_namespace(),
            service_name: default_service_name(),
            routes: default_routes(),
            repository_url: default_repository_url(),
        }
    }
}

/// One subdomain label and the registry it fronts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub label: String,
    pub upstream: String,
}

impl RouteConfig {
    pub fn new(label: &str, upstream: &str) -> Self {
        Self {
            label: label.to_string(),
            upstream: upstream.to_string(),
        }
    }
}

fn default_domain() -> String {
    "example.com".to_string()
}

fn default_target_upstream() -> Option<String> {
    Some(DEFAULT_PRIMARY_UPSTREAM.to_string())
}

fn default_primary_upstream() -> String {
    DEFAULT_PRIMARY_UPSTREAM.to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_repository_url() -> String {
    DEFAULT_REPOSITORY_URL.to_string()
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("docker", DEFAULT_PRIMARY_UPSTREAM),
        RouteConfig::new("quay", "https://quay.io"),
        RouteConfig::new("gcr", "https://gcr.io"),
        RouteConfig::new("k8s-gcr", "https://k8s.gcr.io"),
        RouteConfig::new("k8s", "https://registry.k8s.io"),
        RouteConfig::new("ghcr", "https://ghcr.io"),
        RouteConfig::new("cloudsmith", "https://docker.cloudsmith.io"),
        RouteConfig::new("ecr", "https://public.ecr.aws"),
        // staging route for testing
        RouteConfig::new("docker-staging", DEFAULT_PRIMARY_UPSTREAM),
    ]
}

/// Outbound client settings. Timeouts are the only ones the proxy applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub insecure: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            insecure: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    300 // large blobs stream through the same client
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

impl Config {
    fn build_default() -> Config {
        Config {
            server: ServerConfig::default(),
            proxy: ProxyConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }

    /// Get the default configuration (built in Rust code, cached in OnceLock)
    pub(crate) fn default_parsed() -> &'static Config {
        DEFAULT_CONFIG.get_or_init(Self::build_default)
    }

    /// Load a TOML config file. Missing sections and fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.proxy.domain.trim().is_empty() {
            return Err(ProxyError::Config("proxy.domain must not be empty".to_string()));
        }
        if self.proxy.routes.is_empty() {
            return Err(ProxyError::Config(
                "proxy.routes must contain at least one route".to_string(),
            ));
        }
        for route in &self.proxy.routes {
            if route.label.is_empty() {
                return Err(ProxyError::Config(format!(
                    "route for {} has an empty label",
                    route.upstream
                )));
            }
            url::Url::parse(&route.upstream).map_err(|e| {
                ProxyError::Config(format!(
                    "route {} has invalid upstream {}: {}",
                    route.label, route.upstream, e
                ))
            })?;
        }
        url::Url::parse(&self.proxy.primary_upstream).map_err(|e| {
            ProxyError::Config(format!(
                "invalid primary_upstream {}: {}",
                self.proxy.primary_upstream, e
            ))
        })?;
        if let Some(target) = &self.proxy.target_upstream {
            url::Url::parse(target).map_err(|e| {
                ProxyError::Config(format!("invalid target_upstream {}: {}", target, e))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_parsed().clone()
    }
}
