//! Phases of the token exchange and forwarding state machines, and the guards that
//! move a request from one phase to the next.

use axum::http::{header, HeaderMap, StatusCode};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Unauthenticated request to the upstream API root
    Probing,
    /// Upstream answered 401 with a bearer challenge
    ChallengeReceived,
    /// Token request sent to the upstream's realm
    TokenRequested,
    /// Client request relayed to the upstream
    Forwarding,
    /// Following an upstream blob redirect
    Redirecting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Probing => "probing",
            Phase::ChallengeReceived => "challenge_received",
            Phase::TokenRequested => "token_requested",
            Phase::Forwarding => "forwarding",
            Phase::Redirecting => "redirecting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

pub fn is_unauthorized(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
}

/// The challenge header, if present and readable
pub fn challenge_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
}

/// Target of a 3xx response, resolved against the URL that produced it.
pub fn redirect_location(status: StatusCode, headers: &HeaderMap, base: &Url) -> Option<Url> {
    if !status.is_redirection() {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    if location.is_empty() {
        return None;
    }
    match base.join(location) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(location = %location, error = %e, "Ignoring unparsable Location header");
            None
        }
    }
}
