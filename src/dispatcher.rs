//! Forwards [`OdooRequest`]s to the proxy and validates what comes back.
//!
//! # Example
//!
//! ```no_run
//! use odoo_relay::Dispatcher;
//! use odoo_relay::rpc::{OdooAction, OdooRequest, TargetInstance};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::builder("https://proxy.example.com/", "proxy-key").build()?;
//!
//! let instance = TargetInstance {
//!     url: "https://erp.example.com".to_string(),
//!     db: "prod".to_string(),
//!     user_id: 2,
//!     api_key: "odoo-key".to_string(),
//! };
//! let request = OdooRequest::new("req-1", OdooAction::SearchCount, "res.partner", instance);
//!
//! match dispatcher.forward(&request).await?.into_result() {
//!     Ok(result) => println!("{:?}", result),
//!     Err(business_error) => eprintln!("{}", business_error),
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::config::ConnectionSettings;
use crate::error::{ConfigError, ForwardError, RawResponse};
use crate::http::{HttpRequest, HttpResponse, Transport, default_transport};
use crate::rpc::{OdooRequest, RpcEnvelope};

/// Path appended to the endpoint root.
pub const FORWARD_PATH: &str = "/api/odoo";

/// Header carrying the proxy API key.
pub const API_KEY_HEADER: &str = "apikey";

/// Statuses for which the proxy answers with a JSON-RPC envelope.
pub const EXPECTED_STATUSES: [u16; 6] = [200, 400, 401, 500, 502, 504];

/// Maximum number of body characters kept on out-of-contract responses.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Client for the Odoo proxy.
///
/// Holds only immutable settings and a shared transport, so one instance can
/// serve concurrent calls; cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    settings: Arc<ConnectionSettings>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Creates a dispatcher, resolving the platform transport when none is given.
    #[tracing::instrument(skip(transport))]
    pub fn new(
        settings: ConnectionSettings,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Self, ConfigError> {
        let transport = match transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        debug!(
            "Dispatcher ready for {} (apikey {})",
            settings.endpoint_root(),
            settings.masked_credential()
        );

        Ok(Self {
            settings: Arc::new(settings),
            transport,
        })
    }

    pub fn builder(
        endpoint_root: impl Into<String>,
        credential: impl Into<String>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            endpoint_root: endpoint_root.into(),
            credential: credential.into(),
            transport: None,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Full URL requests are posted to.
    pub fn forward_url(&self) -> String {
        format!("{}{}", self.settings.endpoint_root(), FORWARD_PATH)
    }

    /// Sends one request to the proxy.
    ///
    /// Returns the envelope even when it carries a business `error`. Fails with
    /// [`ForwardError::Transport`] when no response arrives or the status is
    /// not one of [`EXPECTED_STATUSES`], and with [`ForwardError::Format`] when
    /// the body is not a valid JSON-RPC envelope. Exactly one HTTP call is made.
    #[tracing::instrument(skip(self, request), fields(id = %request.id, action = %request.action, model = %request.model_id))]
    pub async fn forward(&self, request: &OdooRequest) -> Result<RpcEnvelope, ForwardError> {
        let url = self.forward_url();

        let body = serde_json::to_string(request)
            .map_err(|e| ForwardError::format(format!("failed to serialize request: {}", e)))?;

        let http_request = HttpRequest::post(&url, body)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header(API_KEY_HEADER, self.settings.credential());

        debug!(
            "Forwarding {} on {} (request {}) to {}...",
            request.action, request.model_id, request.id, url
        );

        let response = self.transport.send(http_request).await.map_err(|e| {
            warn!("Request to {} failed: {:#}", url, e);
            ForwardError::transport(format!("request to {} failed: {:#}", url, e))
        })?;

        if !EXPECTED_STATUSES.contains(&response.status) {
            return Err(unexpected_status(response).await);
        }

        let status = response.status;
        let status_text = response.status_text.clone();
        let text = response.text().await.map_err(|e| ForwardError::Transport {
            message: format!("failed to read response body: {:#}", e),
            status: Some(status),
            status_text: Some(status_text),
            response: None,
        })?;

        let envelope = parse_envelope(&text)?;

        debug!(
            "Request {} answered {} ({})",
            request.id,
            status,
            if envelope.is_error() {
                "business error"
            } else {
                "ok"
            }
        );

        Ok(envelope)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    endpoint_root: String,
    credential: String,
    transport: Option<Arc<dyn Transport>>,
}

impl DispatcherBuilder {
    /// Uses `transport` instead of the platform default.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let settings = ConnectionSettings::new(self.endpoint_root, self.credential)?;
        Dispatcher::new(settings, self.transport)
    }
}

async fn unexpected_status(response: HttpResponse) -> ForwardError {
    let status = response.status;
    let status_text = response.status_text.clone();

    // Diagnostics only: a body that cannot be read is ignored.
    let body_excerpt = match response.text().await {
        Ok(text) => Some(text.chars().take(BODY_EXCERPT_CHARS).collect::<String>()),
        Err(e) => {
            debug!("Could not read body of HTTP {} response: {:#}", status, e);
            None
        }
    };

    let mut message = format!("unexpected HTTP status {} {}", status, status_text);
    if let Some(excerpt) = body_excerpt.as_deref().filter(|s| !s.is_empty()) {
        message.push_str(": ");
        message.push_str(excerpt);
    }
    warn!("{}", message);

    ForwardError::Transport {
        message,
        status: Some(status),
        status_text: Some(status_text.clone()),
        response: Some(RawResponse {
            status,
            status_text,
            body_excerpt,
        }),
    }
}

fn parse_envelope(text: &str) -> Result<RpcEnvelope, ForwardError> {
    if text.is_empty() {
        return Err(ForwardError::format("empty response body"));
    }

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ForwardError::format(format!("invalid JSON in response body: {}", e)))?;

    RpcEnvelope::from_value(value)
        .map_err(|reason| ForwardError::format(format!("invalid JSON-RPC envelope: {}", reason)))
}
