use crate::error::Result;
use crate::registry::challenge::AuthChallenge;
use crate::registry::flow::{challenge_header, is_unauthorized, Phase};
use crate::registry::rewrite::PathRewriter;
use crate::registry::upstream::UpstreamClient;
use axum::http::HeaderValue;
use reqwest::Response;
use url::Url;

/// Relays the bearer-token handshake to the identity realm an upstream advertises.
///
/// The client asks the proxy for a token; the proxy probes the upstream, learns its
/// challenge and forwards the token request there. The token response goes back to the
/// client untouched.
pub struct AuthRelay<'a> {
    client: &'a UpstreamClient,
    rewriter: &'a PathRewriter,
}

enum Exchange {
    Probing,
    ChallengeReceived(AuthChallenge),
    TokenRequested(Url),
    Done(Response),
}

impl Exchange {
    fn phase(&self) -> Phase {
        match self {
            Exchange::Probing => Phase::Probing,
            Exchange::ChallengeReceived(_) => Phase::ChallengeReceived,
            Exchange::TokenRequested(_) => Phase::TokenRequested,
            Exchange::Done(_) => Phase::Done,
        }
    }
}

impl<'a> AuthRelay<'a> {
    pub fn new(client: &'a UpstreamClient, rewriter: &'a PathRewriter) -> Self {
        Self { client, rewriter }
    }

    pub async fn exchange_token(
        &self,
        upstream: &str,
        scope: Option<&str>,
        authorization: Option<&HeaderValue>,
        is_primary: bool,
    ) -> Result<Response> {
        let mut state = Exchange::Probing;
        loop {
            tracing::debug!(upstream = %upstream, phase = %state.phase(), "Token exchange");
            state = match state {
                Exchange::Probing => {
                    let probe = self.client.get(api_root(upstream)?, None).await?;
                    if !is_unauthorized(probe.status()) {
                        // Registry does not require auth here
                        Exchange::Done(probe)
                    } else {
                        let parsed = challenge_header(probe.headers()).map(AuthChallenge::parse);
                        match parsed {
                            Some(challenge) => Exchange::ChallengeReceived(challenge?),
                            None => {
                                tracing::warn!(
                                    upstream = %upstream,
                                    "No WWW-Authenticate header in 401 response"
                                );
                                Exchange::Done(probe)
                            }
                        }
                    }
                }
                Exchange::ChallengeReceived(challenge) => {
                    let scope = match scope {
                        Some(scope) if is_primary => Some(self.rewriter.rewrite_scope(scope)),
                        other => other.map(str::to_string),
                    };
                    tracing::debug!(
                        realm = %challenge.realm,
                        service = %challenge.service,
                        scope = ?scope,
                        "Requesting token from upstream realm"
                    );
                    Exchange::TokenRequested(token_url(&challenge, scope.as_deref())?)
                }
                Exchange::TokenRequested(url) => {
                    Exchange::Done(self.client.get(url, authorization).await?)
                }
                Exchange::Done(response) => return Ok(response),
            };
        }
    }
}

/// `<upstream>/v2/`
pub(crate) fn api_root(upstream: &str) -> Result<Url> {
    Ok(Url::parse(&format!("{}/v2/", upstream.trim_end_matches('/')))?)
}

/// Realm URL with `service` and `scope` set. Other realm query parameters are kept.
pub fn token_url(challenge: &AuthChallenge, scope: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&challenge.realm)?;

    let mut params: Vec<(&str, &str)> = Vec::with_capacity(2);
    if !challenge.service.is_empty() {
        params.push(("service", &challenge.service));
    }
    if let Some(scope) = scope {
        params.push(("scope", scope));
    }
    if params.is_empty() {
        return Ok(url);
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| params.iter().all(|(name, _)| key != name))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(params);
    Ok(url)
}
