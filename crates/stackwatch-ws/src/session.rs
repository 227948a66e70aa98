//! The authenticated handle the connector works through.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue, AUTHORIZATION};

use stackwatch_core::StreamError;

/// A server-advertised permission to use an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Schema name, e.g. `"subscribe"`.
    pub name: String,
    /// The capability's collection link.
    pub collection: String,
}

/// An already-authenticated API handle.
///
/// Authentication itself happens elsewhere; the connector only asks for
/// capability links and for the credentials to put on the upgrade request.
#[async_trait]
pub trait Session: Send + Sync {
    /// Look up a capability by schema name. `None` if this session may not use it.
    async fn capability(&self, name: &str) -> Option<Capability>;

    /// Attach credentials to the upgrade request.
    fn authorize(&self, request: &mut Request) -> Result<(), StreamError>;
}

/// A [`Session`] backed by a fixed capability table and header list.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    capabilities: HashMap<String, Capability>,
    headers: Vec<(String, String)>,
}

impl StaticSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise `name` with the given collection link.
    pub fn with_capability(mut self, name: impl Into<String>, collection: impl Into<String>) -> Self {
        let name = name.into();
        self.capabilities.insert(
            name.clone(),
            Capability {
                name,
                collection: collection.into(),
            },
        );
        self
    }

    /// Add a header to every upgrade request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Shorthand for `Authorization: Bearer <token>`.
    pub fn with_bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.with_header(AUTHORIZATION.as_str(), value)
    }
}

#[async_trait]
impl Session for StaticSession {
    async fn capability(&self, name: &str) -> Option<Capability> {
        self.capabilities.get(name).cloned()
    }

    fn authorize(&self, request: &mut Request) -> Result<(), StreamError> {
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StreamError::Transport(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| StreamError::Transport(format!("invalid value for header '{name}': {e}")))?;
            request.headers_mut().append(name, value);
        }
        Ok(())
    }
}
