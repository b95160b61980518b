//! Responses the proxy answers itself, and conversion of upstream responses.

use crate::error::Result;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Connection-scoped headers that must not cross the proxy
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Copy of `headers` without hop-by-hop headers and without `Host`
pub fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == header::HOST {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers describing the original request body, which a bodiless follow-up GET must not carry
const ENTITY_HEADERS: &[HeaderName] = &[
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
    header::CONTENT_ENCODING,
];

pub fn without_entity_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = headers.clone();
    for name in ENTITY_HEADERS {
        out.remove(name);
    }
    out
}

/// Scheme clients use to reach the proxy. TLS is terminated in front of it outside debug mode.
pub fn public_scheme(debug: bool) -> &'static str {
    if debug {
        "http"
    } else {
        "https"
    }
}

/// 401 whose challenge sends the client to this proxy's own token endpoint.
pub fn unauthorized(scheme: &str, authority: &str, service: &str) -> Result<Response> {
    let challenge = format!(
        r#"Bearer realm="{}://{}/v2/auth",service="{}""#,
        scheme, authority, service
    );
    let challenge = HeaderValue::from_str(&challenge)?;

    Ok((
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
        Json(json!({ "message": "UNAUTHORIZED" })),
    )
        .into_response())
}

/// 301 to `location`
pub fn moved_permanently(location: &str) -> Result<Response> {
    let location = HeaderValue::from_str(location)?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}

/// Welcome page for hosts without a route
pub fn welcome(routes: &[String], repository_url: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Welcome to hubproxy!",
            "routes": routes,
            "repository": repository_url,
        })),
    )
        .into_response()
}

/// Pass an upstream response through: status, end-to-end headers and a streamed body.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::with_capacity(upstream.headers().len());
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
