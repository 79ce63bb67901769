use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Settings for the historical-insight text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Validation(String),
}

impl InsightConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "model must not be empty".to_string(),
            ));
        }
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The API key, if insights are enabled and a non-blank key is configured.
    pub fn usable_api_key(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(InsightConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_blank_model_bad_endpoint_and_zero_timeout() {
        let config = InsightConfig {
            model: "  ".to_string(),
            ..InsightConfig::default()
        };
        assert!(config.validate().is_err());

        let config = InsightConfig {
            endpoint: "generativelanguage.googleapis.com".to_string(),
            ..InsightConfig::default()
        };
        assert!(config.validate().is_err());

        let config = InsightConfig {
            timeout: Duration::ZERO,
            ..InsightConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_string()
            ))
        );
    }

    #[test]
    fn api_key_is_unusable_when_blank_or_disabled() {
        let mut config = InsightConfig {
            api_key: Some("  ".to_string()),
            ..InsightConfig::default()
        };
        assert_eq!(config.usable_api_key(), None);

        config.api_key = Some("secret".to_string());
        assert_eq!(config.usable_api_key(), Some("secret"));

        config.enabled = false;
        assert_eq!(config.usable_api_key(), None);
    }
}
