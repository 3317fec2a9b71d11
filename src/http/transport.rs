//! Transport abstraction: one HTTP exchange, body read deferred.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use http::StatusCode;

use crate::error::ConfigError;

/// An outgoing HTTP request, fully built by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response body that has not been read yet.
#[async_trait]
pub trait ResponseBody: Send {
    async fn text(self: Box<Self>) -> Result<String>;
}

#[async_trait]
impl ResponseBody for String {
    async fn text(self: Box<Self>) -> Result<String> {
        Ok(*self)
    }
}

/// Status line of a received response plus its unread body.
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    body: Box<dyn ResponseBody>,
}

impl HttpResponse {
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        body: impl ResponseBody + 'static,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: Box::new(body),
        }
    }

    /// Builds a response with an in-memory body and the canonical status text.
    pub fn from_text(status: u16, body: impl Into<String>) -> Self {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default();
        Self::new(status, status_text, body.into())
    }

    /// Consumes the response and reads the whole body as text.
    pub async fn text(self) -> Result<String> {
        self.body.text().await
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// Performs a single HTTP exchange.
///
/// Returning `Err` means no response was received at all (DNS failure,
/// connection refused, timeout enforced by the implementation, ...). Any
/// received response, whatever its status, is returned as `Ok`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Resolves the platform-standard transport.
pub fn default_transport() -> std::result::Result<Arc<dyn Transport>, ConfigError> {
    #[cfg(feature = "reqwest-transport")]
    {
        super::ReqwestTransport::with_timeout(None)
            .map(|t| Arc::new(t) as Arc<dyn Transport>)
            .map_err(|e| ConfigError::NoTransport(format!("{:#}", e)))
    }

    #[cfg(not(feature = "reqwest-transport"))]
    {
        Err(ConfigError::NoTransport(
            "built without the reqwest-transport feature".to_string(),
        ))
    }
}
