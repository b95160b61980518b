use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Route not found for host: {host}")]
    RouteNotFound { host: String, routes: Vec<String> },

    #[error("invalid Www-Authenticate Header: {0}")]
    ChallengeParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::RouteNotFound { host, routes } => {
                tracing::debug!(host = %host, "No route for host");
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({
                        "message": "Route not found for this hostname. Please check your configuration.",
                        "routes": routes,
                    })),
                )
                    .into_response()
            }
            // Upstream broke the registry contract or could not be reached.
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "message": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
