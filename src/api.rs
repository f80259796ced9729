//! HTTP access to a deployed gem service

use crate::errors::{Result, ThumbnailError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};

/// Anything that can fetch a body from a path relative to a service
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn get(&self, path: &str) -> Result<String>;
}

/// Attaches authorization to outgoing requests
pub trait CredentialsProvider: Send + Sync {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Sends requests without credentials
#[derive(Debug, Clone, Default)]
pub struct Anonymous;

impl CredentialsProvider for Anonymous {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

#[derive(Clone)]
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken").field("token", &"<redacted>").finish()
    }
}

impl CredentialsProvider for BearerToken {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }
}

/// One completed (or failed) request
#[derive(Debug, Clone)]
pub struct ApiEvent {
    pub identifier: String,
    pub path: String,
    pub status: Option<u16>,
    pub success: bool,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Receives an event for every request the handler issues
pub trait MetricSink: Send + Sync {
    fn record(&self, event: ApiEvent);
}

/// Writes api events to the tracing subscriber
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn record(&self, event: ApiEvent) {
        info!(
            identifier = %event.identifier,
            path = %event.path,
            status = ?event.status,
            success = event.success,
            elapsed_ms = event.elapsed.as_millis() as u64,
            "api request"
        );
    }
}

/// Collaborators the handler is built with
#[derive(Clone)]
pub struct HandlerOptions {
    pub http_timeout: Option<Duration>,
    pub credentials: Arc<dyn CredentialsProvider>,
    pub metrics: Arc<dyn MetricSink>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            http_timeout: None,
            credentials: Arc::new(Anonymous),
            metrics: Arc::new(TracingSink),
        }
    }
}

/// Client bound to one deployed service and gem identifier
pub struct ApiHandler {
    client: Client,
    service_url: String,
    identifier: String,
    timeout: Option<Duration>,
    credentials: Arc<dyn CredentialsProvider>,
    metrics: Arc<dyn MetricSink>,
}

impl ApiHandler {
    pub fn new(
        service_url: impl Into<String>,
        identifier: impl Into<String>,
        options: HandlerOptions,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("survey_thumbnail/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ThumbnailError::Http)?;

        Ok(Self::with_client(client, service_url, identifier, options))
    }

    /// Build a handler around an existing `reqwest` client
    pub fn with_client(
        client: Client,
        service_url: impl Into<String>,
        identifier: impl Into<String>,
        options: HandlerOptions,
    ) -> Self {
        Self {
            client,
            service_url: service_url.into(),
            identifier: identifier.into(),
            timeout: options.http_timeout,
            credentials: options.credentials,
            metrics: options.metrics,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Absolute URL for a path relative to the service
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.service_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch(&self, path: &str) -> (Option<u16>, Result<String>) {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let request = self.credentials.authorize(self.client.get(&url)).send();
        let response = match self.timeout {
            Some(limit) => match timeout(limit, request).await {
                Ok(response) => response,
                Err(_) => return (None, Err(ThumbnailError::Timeout(path.to_string()))),
            },
            None => request.await,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => return (None, Err(ThumbnailError::Http(e))),
        };

        let status = response.status();
        if !status.is_success() {
            return (
                Some(status.as_u16()),
                Err(ThumbnailError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                }),
            );
        }

        let body = response.text().await.map_err(ThumbnailError::Http);
        (Some(status.as_u16()), body)
    }
}

#[async_trait]
impl ServiceClient for ApiHandler {
    async fn get(&self, path: &str) -> Result<String> {
        let start_time = Instant::now();
        let (status, result) = self.fetch(path).await;

        self.metrics.record(ApiEvent {
            identifier: self.identifier.clone(),
            path: path.to_string(),
            status,
            success: result.is_ok(),
            elapsed: start_time.elapsed(),
            timestamp: Utc::now(),
        });

        result
    }
}
