//! Configuration for the survey thumbnail

use crate::api::{Anonymous, BearerToken, CredentialsProvider, HandlerOptions, TracingSink};
use crate::model::Context;
use crate::thumbnail::ThumbnailInputs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DISPLAY_NAME: &str = "In Game Survey";
pub const DEFAULT_SRC_ICON: &str = "https://m.media-amazon.com/images/G/01/cloudcanvas/images/In_Game_Survey_Optimized._V518452895_.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the deployed survey service
    pub service_url: String,

    /// Cloud resource/stack identifier of the gem
    pub identifier: String,

    /// Title shown on the thumbnail
    pub display_name: String,

    /// Icon URL shown on the thumbnail
    pub src_icon: String,

    /// Optional HTTP timeout; `None` leaves the transport default in place
    pub http_timeout: Option<Duration>,

    /// Bearer token attached to every request, if any
    pub bearer_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: String::new(),
            identifier: String::new(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            src_icon: DEFAULT_SRC_ICON.to_string(),
            http_timeout: None,
            bearer_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(service_url) = lookup("SERVICE_URL") {
            config.service_url = service_url;
        }

        if let Some(identifier) = lookup("GEM_IDENTIFIER") {
            config.identifier = identifier;
        }

        if let Some(display_name) = lookup("DISPLAY_NAME") {
            config.display_name = display_name;
        }

        if let Some(src_icon) = lookup("SRC_ICON") {
            config.src_icon = src_icon;
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Some(Duration::from_secs(seconds));
            }
        }

        if let Some(token) = lookup("BEARER_TOKEN") {
            if !token.is_empty() {
                config.bearer_token = Some(token);
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.service_url.is_empty() {
            return Err("service_url cannot be empty".to_string());
        }

        if let Err(e) = Url::parse(&self.service_url) {
            return Err(format!("service_url is not a valid URL: {}", e));
        }

        if self.identifier.is_empty() {
            return Err("identifier cannot be empty".to_string());
        }

        if self.http_timeout == Some(Duration::ZERO) {
            return Err("http_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Widget inputs described by this configuration
    pub fn inputs(&self) -> ThumbnailInputs {
        ThumbnailInputs {
            context: Context {
                service_url: self.service_url.clone(),
                identifier: self.identifier.clone(),
            },
            display_name: self.display_name.clone(),
            src_icon: self.src_icon.clone(),
        }
    }

    /// Collaborators for the API handler described by this configuration
    pub fn handler_options(&self) -> HandlerOptions {
        let credentials: Arc<dyn CredentialsProvider> = match &self.bearer_token {
            Some(token) => Arc::new(BearerToken::new(token.clone())),
            None => Arc::new(Anonymous),
        };

        HandlerOptions {
            http_timeout: self.http_timeout,
            credentials,
            metrics: Arc::new(TracingSink),
        }
    }
}
