//! Tunables for agents and the access service.
//!
//! Both structs deserialize from JSON with every field optional; missing
//! fields take their [`Default`] values. Durations are whole seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] serde_json::Error);

/// Agent side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Seconds between `access/claim` polls while waiting for a
    /// confirmation.
    pub poll_interval: u64,
    /// Lifetime of delegations issued by the agent. `None` never expires.
    pub default_expiration: Option<u64>,
    /// Lifetime of invocations issued by the agent.
    pub invocation_ttl: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval: 1,
            default_expiration: None,
            invocation_ttl: 30,
        }
    }
}

impl AgentConfig {
    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the polling interval
    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.poll_interval = seconds;
        self
    }

    /// Set the lifetime of issued delegations
    pub fn with_default_expiration(mut self, seconds: Option<u64>) -> Self {
        self.default_expiration = seconds;
        self
    }

    /// [`Self::poll_interval`] as a [`Duration`]; never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }
}

/// Access service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Public base URL; confirmation links point at `<url>/validate-email`.
    pub url: Url,
    /// Lifetime of an emailed confirmation link.
    pub confirmation_ttl: u64,
    /// Lifetime of the session delegations issued on confirmation. `None`
    /// never expires.
    pub session_expiration: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            #[allow(clippy::expect_used)]
            url: Url::parse("http://localhost:8787").expect("valid default URL"),
            confirmation_ttl: 15 * 60,
            session_expiration: None,
        }
    }
}

impl ServiceConfig {
    /// Configuration served from `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the confirmation link lifetime
    pub fn with_confirmation_ttl(mut self, seconds: u64) -> Self {
        self.confirmation_ttl = seconds;
        self
    }

    /// Set the session lifetime
    pub fn with_session_expiration(mut self, seconds: Option<u64>) -> Self {
        self.session_expiration = seconds;
        self
    }

    /// Where a confirmation link for the encoded delegation points.
    pub fn confirmation_url(&self, ucan: &str) -> Url {
        let mut url = self.url.clone();
        url.set_path("validate-email");
        url.query_pairs_mut()
            .append_pair("ucan", ucan)
            .append_pair("mode", "authorize");
        url
    }
}
