use crate::config::UpstreamConfig;
use crate::error::{ProxyError, Result};
use axum::http::{HeaderMap, HeaderValue, Method};
use reqwest::{redirect, Body, Client, Response};
use std::time::Duration;
use url::Url;

/// Outbound HTTP client for upstream registries.
///
/// Holds one pooled client that follows redirects and one that returns them to the
/// caller; Docker Hub blob redirects must be re-fetched without registry headers.
pub struct UpstreamClient {
    follow: Client,
    manual: Client,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let follow = Self::builder(config)
            .redirect(redirect::Policy::limited(10))
            .build()
            .map_err(ProxyError::Http)?;
        let manual = Self::builder(config)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(ProxyError::Http)?;

        Ok(Self { follow, manual })
    }

    fn builder(config: &UpstreamConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            // Connection pool configuration
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
    }

    fn client(&self, follow_redirects: bool) -> &Client {
        if follow_redirects {
            &self.follow
        } else {
            &self.manual
        }
    }

    /// `GET` with an optional `Authorization` header, redirects followed.
    pub async fn get(&self, url: Url, authorization: Option<&HeaderValue>) -> Result<Response> {
        let mut request = self.follow.get(url);
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth.clone());
        }
        Ok(request.send().await?)
    }

    /// Relay a client request as is.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Body>,
        follow_redirects: bool,
    ) -> Result<Response> {
        let mut request = self
            .client(follow_redirects)
            .request(method, url)
            .headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }
}
