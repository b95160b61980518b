use crate::error::{ProxyError, Result};

/// Bearer challenge taken from an upstream `WWW-Authenticate` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub realm: String,
    /// Empty when the registry does not advertise a service
    pub service: String,
}

impl AuthChallenge {
    /// Parse `Bearer realm="...",service="..."`.
    ///
    /// Quoted attribute values are taken in order of appearance, so realm must come
    /// before service. Other attributes (scope, error) may follow and are ignored.
    pub fn parse(header: &str) -> Result<Self> {
        let mut values = quoted_values(header).into_iter();
        match (values.next(), values.next()) {
            (Some(realm), service) => Ok(Self {
                realm,
                service: service.unwrap_or_default(),
            }),
            (None, _) => Err(ProxyError::ChallengeParse(header.to_string())),
        }
    }
}

/// Every value introduced by `="` and closed by an unescaped `"`.
/// Escape sequences are kept verbatim.
fn quoted_values(header: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = header;

    while let Some(start) = rest.find("=\"") {
        let body = &rest[start + 2..];
        let mut escaped = false;
        let mut end = None;
        for (idx, ch) in body.char_indices() {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(idx);
                    break;
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                values.push(body[..end].to_string());
                rest = &body[end + 1..];
            }
            // Unterminated value
            None => break,
        }
    }

    values
}
