/// Default-namespace normalization for the primary registry.
///
/// Docker Hub serves official images under an implicit namespace, so `busybox` is really
/// `library/busybox`. Clients that talk to the proxy with unqualified names are normalized
/// at two points: the token scope and the data-plane path.
#[derive(Debug, Clone)]
pub struct PathRewriter {
    namespace: String,
}

impl PathRewriter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `repository:busybox:pull` -> `repository:library/busybox:pull`.
    ///
    /// Only a single `type:name:action` scope with an unqualified name is touched;
    /// anything else (qualified names, multi-resource scopes) is returned as is.
    pub fn rewrite_scope(&self, scope: &str) -> String {
        let mut parts: Vec<&str> = scope.split(':').collect();
        if parts.len() != 3 || parts[1].contains('/') {
            return scope.to_string();
        }

        let qualified = format!("{}/{}", self.namespace, parts[1]);
        parts[1] = &qualified;
        parts.join(":")
    }

    /// Path the client should be redirected to, if its image name lacks the namespace.
    ///
    /// `/v2/busybox/manifests/latest` -> `/v2/library/busybox/manifests/latest`.
    /// Only paths with exactly five `/`-separated segments qualify.
    pub fn namespace_redirect(&self, path: &str) -> Option<String> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != 5
            || !segments[0].is_empty()
            || segments[1] != "v2"
            || segments[2].contains(self.namespace.as_str())
        {
            return None;
        }

        let rest = path.strip_prefix("/v2/")?;
        Some(format!("/v2/{}/{}", self.namespace, rest))
    }
}
