//! Gemini configuration

use mythos_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Gemini client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_url: String,
    pub embed_model: String,
    pub generation_model: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .map_err(|_| {
                Error::Configuration(
                    "GEMINI_API_KEY or GOOGLE_API_KEY environment variable not found".to_string(),
                )
            })?;

        let api_url = env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let embed_model =
            env::var("GEMINI_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());

        let generation_model = env::var("GEMINI_GENERATION_MODEL")
            .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string());

        let timeout_secs = match env::var("GEMINI_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!("GEMINI_TIMEOUT_SECS is not a number: '{}'", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            api_key,
            api_url,
            embed_model: normalize_model_id(&embed_model),
            generation_model: normalize_model_id(&generation_model),
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_embed_model(mut self, model: &str) -> Self {
        self.embed_model = normalize_model_id(model);
        self
    }

    pub fn with_generation_model(mut self, model: &str) -> Self {
        self.generation_model = normalize_model_id(model);
        self
    }

    /// Check that the values can actually be used to reach the service
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration("Gemini API key is empty".to_string()));
        }

        let url = Url::parse(&self.api_url).map_err(|e| {
            Error::Configuration(format!("invalid Gemini API URL '{}': {}", self.api_url, e))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(Error::Configuration(format!(
                "Gemini API URL must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if self.embed_model.is_empty() || self.generation_model.is_empty() {
            return Err(Error::Configuration("model id is empty".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

/// Strip the optional `models/` resource prefix from a model id
pub fn normalize_model_id(model: &str) -> String {
    let trimmed = model.trim();
    trimmed
        .strip_prefix("models/")
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model_id() {
        assert_eq!(normalize_model_id("models/gemini-2.5-flash"), "gemini-2.5-flash");
        assert_eq!(normalize_model_id("text-embedding-004"), "text-embedding-004");
        assert_eq!(normalize_model_id("  models/x "), "x");
    }

    #[test]
    fn test_validate() {
        assert!(GeminiConfig::new("key".to_string()).validate().is_ok());

        let empty_key = GeminiConfig::new("  ".to_string());
        assert!(matches!(empty_key.validate(), Err(Error::Configuration(_))));

        let bad_url = GeminiConfig::new("key".to_string()).with_api_url("not a url");
        assert!(matches!(bad_url.validate(), Err(Error::Configuration(_))));

        let ftp = GeminiConfig::new("key".to_string()).with_api_url("ftp://example.com");
        assert!(matches!(ftp.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_builder_methods_normalize() {
        let config = GeminiConfig::new("key".to_string())
            .with_generation_model("models/gemini-1.5-pro")
            .with_embed_model("models/text-embedding-004");
        assert_eq!(config.generation_model, "gemini-1.5-pro");
        assert_eq!(config.embed_model, "text-embedding-004");
    }
}
