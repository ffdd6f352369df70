//! Marketplace environment configuration.
//!
//! The marketplace exposes two environments: production and a sandbox for
//! dry-running tasks without paying real workers. Configuration is an
//! explicit struct handed to the client constructor; there is no
//! process-wide singleton.

use std::env;

use crate::error::MarketplaceError;

/// Production requester endpoint.
pub const PRODUCTION_ENDPOINT: &str = "https://requester.crowd-marketplace.com/v1";
/// Production worker-facing preview URL.
pub const PRODUCTION_PREVIEW_URL: &str = "https://www.crowd-marketplace.com/preview";
/// Sandbox requester endpoint.
pub const SANDBOX_ENDPOINT: &str = "https://requester-sandbox.crowd-marketplace.com/v1";
/// Sandbox worker-facing preview URL.
pub const SANDBOX_PREVIEW_URL: &str = "https://worker-sandbox.crowd-marketplace.com/preview";

/// Configuration for the marketplace client.
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// Base URL of the requester API.
    pub endpoint: String,
    /// Worker-facing preview URL for launched HITs.
    pub preview_url: String,
    /// Bearer token for API authentication.
    pub api_token: String,
    /// Whether this configuration targets the sandbox environment.
    ///
    /// Sandbox launches relax qualification thresholds so test workers
    /// can accept the HITs.
    pub sandbox: bool,
}

impl MarketplaceConfig {
    /// Create a production configuration with the given API token.
    pub fn production(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: PRODUCTION_ENDPOINT.to_string(),
            preview_url: PRODUCTION_PREVIEW_URL.to_string(),
            api_token: api_token.into(),
            sandbox: false,
        }
    }

    /// Create a sandbox configuration with the given API token.
    pub fn sandbox(api_token: impl Into<String>) -> Self {
        Self {
            endpoint: SANDBOX_ENDPOINT.to_string(),
            preview_url: SANDBOX_PREVIEW_URL.to_string(),
            api_token: api_token.into(),
            sandbox: true,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `CROWDFORGE_API_TOKEN`: bearer token (required)
    /// - `CROWDFORGE_SANDBOX`: "1"/"true" selects the sandbox environment
    /// - `CROWDFORGE_ENDPOINT`: optional endpoint override (self-hosted or test servers)
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::MissingApiToken`] if `CROWDFORGE_API_TOKEN`
    /// is not set.
    pub fn from_env() -> Result<Self, MarketplaceError> {
        let api_token =
            env::var("CROWDFORGE_API_TOKEN").map_err(|_| MarketplaceError::MissingApiToken)?;
        let sandbox = env::var("CROWDFORGE_SANDBOX")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let mut config = if sandbox {
            Self::sandbox(api_token)
        } else {
            Self::production(api_token)
        };
        if let Ok(endpoint) = env::var("CROWDFORGE_ENDPOINT") {
            config.endpoint = endpoint;
        }
        Ok(config)
    }

    /// Override the requester endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}
