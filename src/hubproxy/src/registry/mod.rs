pub mod auth;
pub mod challenge;
pub mod flow;
pub mod forward;
pub mod rewrite;
pub mod upstream;

pub use auth::AuthRelay;
pub use challenge::AuthChallenge;
pub use flow::Phase;
pub use forward::{ProxyForwarder, ProxyRequest};
pub use rewrite::PathRewriter;
pub use upstream::UpstreamClient;
