//! Hostname to upstream registry routing.
//!
//! The table is built once from [`ProxyConfig`] and never mutated afterwards, so request
//! tasks share it through an `Arc` without any locking.

use crate::config::ProxyConfig;
use std::collections::HashMap;

/// Immutable hostname -> upstream base URL mapping
#[derive(Debug, Clone)]
pub struct RouteTable {
    /// Hostnames in configuration order (reported to clients)
    hostnames: Vec<String>,
    routes: HashMap<String, String>,
    fallback: Option<String>,
    primary: String,
}

impl RouteTable {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let mut hostnames = Vec::with_capacity(config.routes.len());
        let mut routes = HashMap::with_capacity(config.routes.len());

        for route in &config.routes {
            let hostname = format!("{}.{}", route.label, config.domain);
            // A repeated label keeps its first position but takes the later upstream
            if routes
                .insert(hostname.clone(), route.upstream.clone())
                .is_none()
            {
                hostnames.push(hostname);
            }
        }

        // The fallback exists only in debug mode
        let fallback = if config.debug {
            config.target_upstream.clone()
        } else {
            None
        };

        tracing::debug!(
            routes = hostnames.len(),
            fallback = ?fallback,
            "Built route table"
        );

        Self {
            hostnames,
            routes,
            fallback,
            primary: config.primary_upstream.clone(),
        }
    }

    /// Resolve the upstream for a hostname, falling back to the debug upstream if configured.
    pub fn lookup(&self, hostname: &str) -> Option<&str> {
        self.routes
            .get(hostname)
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }

    /// Exact match only, ignoring the debug fallback
    pub fn contains(&self, hostname: &str) -> bool {
        self.routes.contains_key(hostname)
    }

    pub fn hostnames(&self) -> &[String] {
        &self.hostnames
    }

    /// Whether `upstream` is the registry that needs default-namespace normalization
    pub fn is_primary(&self, upstream: &str) -> bool {
        upstream == self.primary
    }
}
