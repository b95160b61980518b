use crate::error::Result;
use crate::registry::auth::{api_root, AuthRelay};
use crate::registry::flow::{is_unauthorized, redirect_location, Phase};
use crate::registry::rewrite::PathRewriter;
use crate::registry::upstream::UpstreamClient;
use crate::responses;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Uri},
    response::Response,
};
use url::Url;

/// One inbound request bound to its upstream. Owned by the request's task.
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
    /// `host[:port]` the client used to reach the proxy
    pub authority: String,
    pub upstream: String,
    pub is_primary: bool,
}

impl ProxyRequest {
    fn query_suffix(&self) -> String {
        self.uri
            .query()
            .map(|q| format!("?{}", q))
            .unwrap_or_default()
    }

    fn upstream_url(&self) -> Result<Url> {
        let path_and_query = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Ok(Url::parse(&format!(
            "{}{}",
            self.upstream.trim_end_matches('/'),
            path_and_query
        ))?)
    }

    /// Only requests that announce a body get one upstream; an empty stream would turn a
    /// plain GET into a chunked upload.
    fn has_body(&self) -> bool {
        if self.headers.contains_key(header::TRANSFER_ENCODING) {
            return true;
        }
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .is_some_and(|len| len > 0)
    }
}

enum Step {
    Forwarding,
    Redirecting(Url),
    Done(Response),
}

impl Step {
    fn phase(&self) -> Phase {
        match self {
            Step::Forwarding => Phase::Forwarding,
            Step::Redirecting(_) => Phase::Redirecting,
            Step::Done(_) => Phase::Done,
        }
    }
}

pub struct ProxyForwarder<'a> {
    client: &'a UpstreamClient,
    rewriter: &'a PathRewriter,
    scheme: &'static str,
    service: &'a str,
}

impl<'a> ProxyForwarder<'a> {
    pub fn new(
        client: &'a UpstreamClient,
        rewriter: &'a PathRewriter,
        scheme: &'static str,
        service: &'a str,
    ) -> Self {
        Self {
            client,
            rewriter,
            scheme,
            service,
        }
    }

    fn unauthorized(&self, request: &ProxyRequest) -> Result<Response> {
        responses::unauthorized(self.scheme, &request.authority, self.service)
    }

    /// `GET /v2/`: ask the upstream whether the client's credentials are good enough.
    /// A 401 is answered with the proxy's own challenge so the token flow comes back here.
    pub async fn probe_api_root(&self, request: ProxyRequest) -> Result<Response> {
        let authorization = request.headers.get(header::AUTHORIZATION);
        let probe = self
            .client
            .get(api_root(&request.upstream)?, authorization)
            .await?;

        tracing::debug!(
            upstream = %request.upstream,
            status = %probe.status(),
            "API root probe"
        );

        if is_unauthorized(probe.status()) {
            return self.unauthorized(&request);
        }
        Ok(responses::relay(probe))
    }

    /// `/v2/auth` or `/token`: relay the token request to the upstream's realm.
    pub async fn token(&self, request: ProxyRequest) -> Result<Response> {
        let scope = request.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "scope")
                .map(|(_, value)| value.into_owned())
                .filter(|value| !value.is_empty())
        });

        let response = AuthRelay::new(self.client, self.rewriter)
            .exchange_token(
                &request.upstream,
                scope.as_deref(),
                request.headers.get(header::AUTHORIZATION),
                request.is_primary,
            )
            .await?;
        Ok(responses::relay(response))
    }

    /// Data plane: manifests, blobs, tags and anything else under `/v2/`.
    pub async fn forward(&self, mut request: ProxyRequest) -> Result<Response> {
        if request.is_primary {
            if let Some(path) = self.rewriter.namespace_redirect(request.uri.path()) {
                let location = format!(
                    "{}://{}{}{}",
                    self.scheme,
                    request.authority,
                    path,
                    request.query_suffix()
                );
                tracing::debug!(
                    from = %request.uri.path(),
                    to = %location,
                    "Redirecting to namespaced path"
                );
                return responses::moved_permanently(&location);
            }
        }

        let target = request.upstream_url()?;
        let headers = responses::end_to_end_headers(&request.headers);
        let mut body = if request.has_body() {
            let body = std::mem::take(&mut request.body);
            Some(reqwest::Body::wrap_stream(body.into_data_stream()))
        } else {
            None
        };

        let mut step = Step::Forwarding;
        loop {
            tracing::debug!(
                method = %request.method,
                upstream = %request.upstream,
                path = %request.uri.path(),
                phase = %step.phase(),
                "Forwarding request"
            );
            step = match step {
                Step::Forwarding => {
                    // Docker Hub answers blob requests with a redirect to external
                    // storage; that one is followed by hand below.
                    let response = self
                        .client
                        .send(
                            request.method.clone(),
                            target.clone(),
                            headers.clone(),
                            body.take(),
                            !request.is_primary,
                        )
                        .await?;

                    if is_unauthorized(response.status()) {
                        Step::Done(self.unauthorized(&request)?)
                    } else if request.is_primary {
                        let location =
                            redirect_location(response.status(), response.headers(), &target);
                        match location {
                            Some(location) => Step::Redirecting(location),
                            None => Step::Done(responses::relay(response)),
                        }
                    } else {
                        Step::Done(responses::relay(response))
                    }
                }
                Step::Redirecting(location) => {
                    let response = self
                        .client
                        .send(
                            Method::GET,
                            location,
                            responses::without_entity_headers(&headers),
                            None,
                            true,
                        )
                        .await?;
                    Step::Done(responses::relay(response))
                }
                Step::Done(response) => return Ok(response),
            };
        }
    }
}
