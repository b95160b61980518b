use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::registry::{PathRewriter, ProxyForwarder, ProxyRequest, UpstreamClient};
use crate::responses;
use crate::routes::RouteTable;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, uri::Authority},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tracing::error;

/// Read-only state shared by every request task
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub rewriter: Arc<PathRewriter>,
    pub upstream: Arc<UpstreamClient>,
    /// Scheme clients use to reach the proxy
    pub scheme: &'static str,
    pub service_name: Arc<str>,
    /// Project URL on the welcome page
    pub repository_url: Arc<str>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            routes: Arc::new(RouteTable::from_config(&config.proxy)),
            rewriter: Arc::new(PathRewriter::new(config.proxy.default_namespace.clone())),
            upstream: Arc::new(UpstreamClient::new(&config.upstream)?),
            scheme: responses::public_scheme(config.proxy.debug),
            service_name: Arc::from(config.proxy.service_name.as_str()),
            repository_url: Arc::from(config.proxy.repository_url.as_str()),
        })
    }

    fn forwarder(&self) -> ProxyForwarder<'_> {
        ProxyForwarder::new(&self.upstream, &self.rewriter, self.scheme, &self.service_name)
    }

    /// Attach the upstream for `hostname`, or fail with the list of known routes.
    fn bind(
        &self,
        hostname: &str,
        authority: String,
        parts: Parts,
        body: Body,
    ) -> Result<ProxyRequest> {
        let upstream = self
            .routes
            .lookup(hostname)
            .ok_or_else(|| ProxyError::RouteNotFound {
                host: hostname.to_string(),
                routes: self.routes.hostnames().to_vec(),
            })?;

        Ok(ProxyRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            authority,
            is_primary: self.routes.is_primary(upstream),
            upstream: upstream.to_string(),
        })
    }
}

/// What an inbound request asks for, decided once from its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `/`
    Root,
    /// `/v2/`
    ApiRoot,
    /// `.../v2/auth` or `.../token`
    Token,
    /// Everything else
    Data,
}

impl RequestKind {
    pub fn classify(path: &str) -> Self {
        match path {
            "/" => RequestKind::Root,
            "/v2/" => RequestKind::ApiRoot,
            p if p.ends_with("/v2/auth") || p.ends_with("/token") => RequestKind::Token,
            _ => RequestKind::Data,
        }
    }
}

/// `host[:port]` exactly as the client sent it. Forwarding headers are not consulted.
fn request_authority(parts: &Parts) -> String {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default()
}

/// Host part of `host[:port]`
fn hostname(authority: &str) -> String {
    authority
        .parse::<Authority>()
        .map(|a| a.host().to_string())
        .unwrap_or_else(|_| authority.to_string())
}

pub fn build_router(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let authority = request_authority(&parts);
    let kind = RequestKind::classify(parts.uri.path());

    tracing::debug!(
        method = %parts.method,
        host = %authority,
        path = %parts.uri.path(),
        kind = ?kind,
        "[hubproxy] HTTP request"
    );

    match dispatch(&state, kind, authority, parts, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn dispatch(
    state: &AppState,
    kind: RequestKind,
    authority: String,
    parts: Parts,
    body: Body,
) -> Result<Response> {
    let hostname = hostname(&authority);
    let forwarder = state.forwarder();

    match kind {
        RequestKind::Root => {
            if state.routes.contains(&hostname) {
                responses::moved_permanently(&format!("{}://{}/v2/", state.scheme, authority))
            } else {
                Ok(responses::welcome(
                    state.routes.hostnames(),
                    &state.repository_url,
                ))
            }
        }
        RequestKind::ApiRoot => {
            forwarder
                .probe_api_root(state.bind(&hostname, authority, parts, body)?)
                .await
        }
        RequestKind::Token => {
            forwarder
                .token(state.bind(&hostname, authority, parts, body)?)
                .await
        }
        RequestKind::Data => {
            forwarder
                .forward(state.bind(&hostname, authority, parts, body)?)
                .await
        }
    }
}

/// Bind the listener and serve until the task is aborted or the listener fails.
pub async fn start_server(config: Config) -> Result<tokio::task::JoinHandle<()>> {
    config.validate()?;
    let state = AppState::new(&config)?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ProxyError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!(
        "Serving {} route(s) on {} (debug={})",
        state.routes.hostnames().len(),
        addr,
        config.proxy.debug
    );
    for host in state.routes.hostnames() {
        tracing::info!("  {} -> {}", host, state.routes.lookup(host).unwrap_or("?"));
    }

    let app = build_router(state);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error after startup: {}", e);
        } else {
            tracing::info!("HTTP server stopped");
        }
    });

    Ok(handle)
}
