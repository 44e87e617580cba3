//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::gemini::{GeminiBackend, DEFAULT_BASE_URL};
use crate::backend::traits::BackendError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback key variable used by older deployments.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Overrides the API base URL (proxies, tests).
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Model used for each kind of request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRoster {
    /// Roadmaps and other schema-constrained output
    pub structured: String,
    /// Everyday mentor chat
    pub chat: String,
    /// Mentor chat with extended reasoning
    pub reasoning: String,
    /// Text to speech
    pub speech: String,
    /// Image generation
    pub image: String,
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            structured: "gemini-3-pro-preview".to_string(),
            chat: "gemini-3-flash-preview".to_string(),
            reasoning: "gemini-3-pro-preview".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
        }
    }
}

/// Configuration for the AI gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// API key; empty means not configured
    #[serde(skip_serializing)]
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Models per use case
    pub models: ModelRoster,
    /// Prebuilt voice for speech synthesis
    pub voice: String,
    /// Thinking budget for deep-reasoning mentor replies
    pub thinking_budget: u32,
    /// Per-request timeout (ms)
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: ModelRoster::default(),
            voice: "Kore".to_string(),
            thinking_budget: 32_768,
            request_timeout_ms: 120_000,
        }
    }
}

impl GatewayConfig {
    /// Create a config with an API key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML. The API key is never written out.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Defaults plus the API key and base URL from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|name| std::env::var(name).ok())
    }

    /// Overlay values from an environment lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV).or_else(|| non_empty(LEGACY_API_KEY_ENV)) {
            self.api_key = key;
        }
        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.base_url = url;
        }
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Build the Gemini backend this config describes.
    pub fn build_backend(&self) -> Result<GeminiBackend, BackendError> {
        GeminiBackend::new(
            self.base_url.clone(),
            self.api_key.clone(),
            Some(self.request_timeout()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.models.structured, "gemini-3-pro-preview");
        assert_eq!(config.models.chat, "gemini-3-flash-preview");
        assert_eq!(config.voice, "Kore");
        assert!(!config.has_api_key());
        assert!(config.build_backend().is_err());
    }

    #[test]
    fn test_env_overlay_prefers_gemini_key() {
        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", "primary"), ("API_KEY", "legacy")].into();
        let config = GatewayConfig::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key, "primary");

        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", ""), ("API_KEY", "legacy")].into();
        let config = GatewayConfig::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key, "legacy");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_yaml_partial_and_key_not_serialized() {
        let config = GatewayConfig::from_yaml(
            "api_key: secret\nmodels:\n  chat: gemini-custom\nrequest_timeout_ms: 5000\n",
        )
        .unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.models.chat, "gemini-custom");
        assert_eq!(config.models.structured, "gemini-3-pro-preview");
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));

        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("secret"));
        assert!(config.build_backend().is_ok());
    }
}
