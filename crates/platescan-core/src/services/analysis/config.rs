//! Analysis configuration
//!
//! Connection settings for the networked providers plus orchestrator
//! tuning. Values come from defaults, `PLATESCAN_*` environment variables,
//! or direct construction in tests.

use serde::{Deserialize, Serialize};

use super::types::ProviderId;

// ============================================================================
// Constants
// ============================================================================

/// Default chat-completion API base
pub const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision-capable model
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

/// Default food classification endpoint
pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/nateraw/food";

/// Default per-attempt request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum accepted request timeout in seconds
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;

/// How long a liveness probe result stays fresh, in seconds
pub const DEFAULT_HEALTH_TTL_SECS: i64 = 300;

/// Minimum accepted health TTL in seconds
pub const MIN_HEALTH_TTL_SECS: i64 = 30;

// ============================================================================
// Config Types
// ============================================================================

/// Vision provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// API base, without the `/chat/completions` suffix
    pub base_url: String,
    /// Model name sent with every request
    pub model: String,
    /// Bearer token; the provider reports itself unavailable without one
    pub api_key: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VISION_BASE_URL.to_string(),
            model: DEFAULT_VISION_MODEL.to_string(),
            api_key: None,
        }
    }
}

/// Classifier provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Full endpoint URL that accepts raw image bytes via POST
    pub endpoint: String,
    /// Optional bearer token
    pub api_key: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CLASSIFIER_URL.to_string(),
            api_key: None,
        }
    }
}

/// Top-level analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub vision: VisionConfig,
    pub classifier: ClassifierConfig,
    /// Per-attempt network timeout in seconds
    pub request_timeout_secs: u64,
    /// Seconds a liveness probe result stays fresh
    pub health_ttl_secs: i64,
    /// Provider tried first
    pub preferred: ProviderId,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            vision: VisionConfig::default(),
            classifier: ClassifierConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            health_ttl_secs: DEFAULT_HEALTH_TTL_SECS,
            preferred: ProviderId::Vision,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from `PLATESCAN_*` environment variables
    ///
    /// Unset or empty variables leave the defaults in place. Recognized:
    /// `PLATESCAN_VISION_API_KEY`, `PLATESCAN_VISION_BASE_URL`,
    /// `PLATESCAN_VISION_MODEL`, `PLATESCAN_CLASSIFIER_URL`,
    /// `PLATESCAN_CLASSIFIER_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("PLATESCAN_VISION_API_KEY") {
            if !key.is_empty() {
                config.vision.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("PLATESCAN_VISION_BASE_URL") {
            if !url.is_empty() {
                config.vision.base_url = url;
            }
        }
        if let Ok(model) = std::env::var("PLATESCAN_VISION_MODEL") {
            if !model.is_empty() {
                config.vision.model = model;
            }
        }
        if let Ok(url) = std::env::var("PLATESCAN_CLASSIFIER_URL") {
            if !url.is_empty() {
                config.classifier.endpoint = url;
            }
        }
        if let Ok(key) = std::env::var("PLATESCAN_CLASSIFIER_API_KEY") {
            if !key.is_empty() {
                config.classifier.api_key = Some(key);
            }
        }

        config.validate()
    }

    /// Validate the configuration, normalizing out-of-range values
    pub fn validate(&self) -> Self {
        let mut normalized = self.clone();

        if normalized.request_timeout_secs < MIN_REQUEST_TIMEOUT_SECS {
            log::warn!(
                "[analysis:config] Request timeout {}s below minimum, using {}s",
                normalized.request_timeout_secs,
                MIN_REQUEST_TIMEOUT_SECS
            );
            normalized.request_timeout_secs = MIN_REQUEST_TIMEOUT_SECS;
        }

        if normalized.health_ttl_secs < MIN_HEALTH_TTL_SECS {
            log::warn!(
                "[analysis:config] Health TTL {}s below minimum, using {}s",
                normalized.health_ttl_secs,
                MIN_HEALTH_TTL_SECS
            );
            normalized.health_ttl_secs = MIN_HEALTH_TTL_SECS;
        }

        // A trailing slash would produce "//chat/completions"
        normalized.vision.base_url = normalized.vision.base_url.trim_end_matches('/').to_string();

        normalized
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Env var tests must not interleave
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.vision.base_url, "https://api.openai.com/v1");
        assert_eq!(config.vision.model, "gpt-4o-mini");
        assert!(config.vision.api_key.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.health_ttl_secs, 300);
        assert_eq!(config.preferred, ProviderId::Vision);
    }

    #[test]
    fn test_validate_raises_low_values() {
        let config = AnalysisConfig {
            request_timeout_secs: 1,
            health_ttl_secs: 2,
            ..Default::default()
        };

        let normalized = config.validate();
        assert_eq!(normalized.request_timeout_secs, MIN_REQUEST_TIMEOUT_SECS);
        assert_eq!(normalized.health_ttl_secs, MIN_HEALTH_TTL_SECS);
    }

    #[test]
    fn test_validate_trims_trailing_slash() {
        let config = AnalysisConfig {
            vision: VisionConfig {
                base_url: "https://llm.internal/v1/".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(config.validate().vision.base_url, "https://llm.internal/v1");
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::remove_var("PLATESCAN_VISION_BASE_URL");
        std::env::remove_var("PLATESCAN_CLASSIFIER_API_KEY");
        std::env::set_var("PLATESCAN_VISION_API_KEY", "sk-test-123");
        std::env::set_var("PLATESCAN_VISION_MODEL", "gpt-4o");
        std::env::set_var("PLATESCAN_CLASSIFIER_URL", "http://localhost:9000/classify");

        let config = AnalysisConfig::from_env();

        std::env::remove_var("PLATESCAN_VISION_API_KEY");
        std::env::remove_var("PLATESCAN_VISION_MODEL");
        std::env::remove_var("PLATESCAN_CLASSIFIER_URL");

        assert_eq!(config.vision.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(config.vision.model, "gpt-4o");
        assert_eq!(config.classifier.endpoint, "http://localhost:9000/classify");
        // Untouched values keep their defaults
        assert_eq!(config.vision.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_from_env_ignores_empty_values() {
        let _guard = ENV_MUTEX.lock().unwrap();

        std::env::set_var("PLATESCAN_VISION_API_KEY", "");
        let config = AnalysisConfig::from_env();
        std::env::remove_var("PLATESCAN_VISION_API_KEY");

        assert!(config.vision.api_key.is_none());
    }
}
