//! Transport backed by a reqwest `Client`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, Response};

use super::transport::{HttpRequest, HttpResponse, ResponseBody, Transport};

/// Platform-standard [`Transport`] wrapping a reqwest `Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client with the crate user agent and an optional request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

struct ReqwestBody(Response);

#[async_trait]
impl ResponseBody for ReqwestBody {
    async fn text(self: Box<Self>) -> Result<String> {
        self.0.text().await.context("Failed to read response body")
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}...", request.method, request.url);

        let method = Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", request.method))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", request.url))?;

        let status = response.status();
        debug!("{} answered {}", request.url, status);

        Ok(HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            ReqwestBody(response),
        ))
    }
}
