//! Client for the external text-generation API.
//!
//! One blocking request per call: no retries, no streaming. Callers run it off
//! the UI thread and disable the trigger while a request is in flight.

mod prompt;
mod wire;

pub use prompt::AiRequest;
pub use wire::interpret_response;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

impl AiSettings {
    /// The API key, if one is set and non-blank
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("AI API key is missing. Set GEMINI_API_KEY or [ai] api_key in the config file and restart.")]
    Configuration,

    #[error("AI service is busy. Please try again shortly.")]
    RateLimit,

    #[error("Request blocked by content safety filters.")]
    ContentFilter,

    #[error("Unexpected AI response format.")]
    Format,

    #[error("{0}")]
    Upstream(String),
}

#[derive(Clone)]
pub struct AiClient {
    http: reqwest::blocking::Client,
    settings: AiSettings,
}

impl AiClient {
    pub fn new(settings: AiSettings) -> Result<Self, AiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AiError::Upstream(format!("Could not start HTTP client: {}", err)))?;
        Ok(Self { http, settings })
    }

    pub fn is_configured(&self) -> bool {
        self.settings.key().is_some()
    }

    /// Send a single user-turn prompt and return the generated text.
    pub fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let key = self.settings.key().ok_or(AiError::Configuration)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        );

        // The key travels in a header so it never ends up in error messages or logs.
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(&wire::GenerateRequest::user_prompt(prompt))
            .send()
            .map_err(|err| AiError::Upstream(format!("Could not reach AI service: {}", err.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| AiError::Upstream(format!("Could not read AI response: {}", err.without_url())))?;

        let outcome = interpret_response(status, &body);
        match &outcome {
            Ok(text) => info!("event=ai_response status={} chars={}", status, text.chars().count()),
            Err(err) => warn!("event=ai_error status={} error={:?}", status, err),
        }
        outcome
    }
}

impl std::fmt::Debug for AiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClient")
            .field("model", &self.settings.model)
            .field("endpoint", &self.settings.endpoint)
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_before_any_request() {
        let settings = AiSettings {
            // Nothing listens here; reaching the network would surface as Upstream.
            endpoint: "http://127.0.0.1:9".to_string(),
            ..AiSettings::default()
        };
        let client = AiClient::new(settings).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.generate("hello"), Err(AiError::Configuration));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let settings = AiSettings {
            api_key: Some("   ".to_string()),
            ..AiSettings::default()
        };
        assert_eq!(settings.key(), None);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let client = AiClient::new(AiSettings {
            api_key: Some("secret-key".to_string()),
            ..AiSettings::default()
        })
        .unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }

    #[test]
    fn test_settings_defaults_from_toml_like_input() {
        let settings: AiSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.api_key, None);
    }
}
