//! Vision LLM nutrition provider
//!
//! Sends the meal photo inline as a base64 data URL to an OpenAI-compatible
//! chat-completion endpoint, with a prompt demanding a bare JSON object, and
//! parses the reply into an estimate. Liveness is probed against the models
//! endpoint so a dead key or host is discovered without burning an analysis.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::VisionConfig;
use super::provider::{NutritionProvider, ProviderError};
use super::types::{MealImage, NutritionEstimate, ProviderId};

// ============================================================================
// Constants
// ============================================================================

/// Reply length cap; the expected JSON object is small
const MAX_COMPLETION_TOKENS: u32 = 500;

/// Sampling temperature; estimates should be stable across retries
const TEMPERATURE: f32 = 0.2;

/// Phrases that mark a refusal rather than an analysis
const REFUSAL_PATTERNS: &[&str] = &[
    "i'm sorry",
    "i am sorry",
    "i can't",
    "i cannot",
    "i'm unable",
    "i am unable",
    "unable to assist",
    "as an ai",
];

/// Prompt sent with every image
const ANALYSIS_PROMPT: &str = r#"Analyze the meal in this photo and estimate its nutritional content.

Respond with ONLY a JSON object in exactly this shape, no prose and no code fences:
{"calories": <integer kcal>, "protein": <grams>, "carbs": <grams>, "fats": <grams>, "confidence": <0.1 to 1.0>, "detectedLabels": ["<food>", "..."], "note": "<one short sentence>"}"#;

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

/// Multimodal message part, tagged the way OpenAI expects
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

// ============================================================================
// Vision Provider
// ============================================================================

/// Provider backed by a vision-capable chat-completion model
pub struct VisionProvider {
    config: VisionConfig,
    client: Client,
}

impl VisionProvider {
    pub fn new(config: VisionConfig, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Whether an API key is configured
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn build_prompt(hint: Option<&str>) -> String {
        match hint {
            Some(h) if !h.trim().is_empty() => {
                format!("{}\n\nThe diner describes the meal as: {}", ANALYSIS_PROMPT, h)
            }
            _ => ANALYSIS_PROMPT.to_string(),
        }
    }

    fn encode_data_url(image: &MealImage) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        format!("data:{};base64,{}", image.mime_type, encoded)
    }

    /// Run the chat completion and return the raw message content
    async fn request_completion(
        &self,
        image: &MealImage,
        hint: Option<&str>,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Unavailable("Vision API key not configured".to_string()))?;

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: Self::build_prompt(hint),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: Self::encode_data_url(image),
                        },
                    },
                ],
            }],
            max_completion_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Vision API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Unexpected completion payload: {}. Raw: {}",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })?;

        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Completion contained no message content".to_string(),
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl NutritionProvider for VisionProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Vision
    }

    async fn analyze(
        &self,
        image: &MealImage,
        hint: Option<&str>,
    ) -> Result<NutritionEstimate, ProviderError> {
        log::debug!(
            "[analysis:vision] Requesting estimate for {} bytes via {}",
            image.bytes.len(),
            self.config.model
        );

        let content = self.request_completion(image, hint).await?;
        parse_estimate(&content)
    }

    fn needs_liveness_check(&self) -> bool {
        true
    }

    /// Probe the models endpoint; HTTP 200 means the key and host are usable
    async fn check_liveness(&self) -> bool {
        let Some(ref api_key) = self.config.api_key else {
            log::debug!("[analysis:vision] No API key, liveness probe fails fast");
            return false;
        };

        let result = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await;

        match result {
            Ok(response) => {
                let usable = response.status().as_u16() == 200;
                if !usable {
                    log::warn!(
                        "[analysis:vision] Liveness probe got HTTP {}",
                        response.status()
                    );
                }
                usable
            }
            Err(e) => {
                log::warn!("[analysis:vision] Liveness probe failed: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// Reply Parsing
// ============================================================================

/// Strip a Markdown code fence wrapper, if present
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    rest.strip_suffix("```").map(str::trim).unwrap_or_else(|| rest.trim())
}

/// Whether the reply reads as a refusal rather than an analysis
fn is_refusal(text: &str) -> bool {
    let lower = text.to_lowercase();
    REFUSAL_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Parse the model reply into an estimate
///
/// Refusals are detected before parsing so they fail as `Refused` rather
/// than as a generic parse error.
fn parse_estimate(content: &str) -> Result<NutritionEstimate, ProviderError> {
    if is_refusal(content) {
        return Err(ProviderError::Refused(
            content.chars().take(120).collect::<String>(),
        ));
    }

    let json = strip_code_fences(content);
    serde_json::from_str(json).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Model reply was not the expected JSON object: {}. Raw: {}",
            e,
            json.chars().take(200).collect::<String>()
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_REPLY: &str = r#"{"calories": 540, "protein": 25.0, "carbs": 40.0, "fats": 29.0, "confidence": 0.85, "detectedLabels": ["burger", "fries"], "note": "Large portion"}"#;

    fn provider_without_key() -> VisionProvider {
        VisionProvider::new(VisionConfig::default(), 30)
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_is_refusal() {
        assert!(is_refusal("I'm sorry, but I can't help with that image."));
        assert!(is_refusal("I CANNOT analyze this picture."));
        assert!(is_refusal("As an AI, I am unable to identify the contents."));
        assert!(!is_refusal(VALID_REPLY));
    }

    #[test]
    fn test_parse_estimate_plain_json() {
        let estimate = parse_estimate(VALID_REPLY).unwrap();
        assert_eq!(estimate.calories, 540);
        assert_eq!(estimate.detected_labels, vec!["burger", "fries"]);
    }

    #[test]
    fn test_parse_estimate_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID_REPLY);
        let estimate = parse_estimate(&fenced).unwrap();
        assert_eq!(estimate.calories, 540);
    }

    #[test]
    fn test_parse_estimate_refusal() {
        let result = parse_estimate("I'm sorry, I can't identify food in this image.");
        assert!(matches!(result, Err(ProviderError::Refused(_))));
    }

    #[test]
    fn test_parse_estimate_malformed_json() {
        let result = parse_estimate("The meal looks like roughly 500 calories.");
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_estimate_missing_field() {
        let result = parse_estimate(r#"{"calories": 540, "protein": 25.0}"#);
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_build_prompt_appends_hint() {
        let with_hint = VisionProvider::build_prompt(Some("leftover curry"));
        assert!(with_hint.contains("leftover curry"));
        assert!(with_hint.starts_with(ANALYSIS_PROMPT));

        let without = VisionProvider::build_prompt(None);
        assert_eq!(without, ANALYSIS_PROMPT);
        assert_eq!(VisionProvider::build_prompt(Some("  ")), ANALYSIS_PROMPT);
    }

    #[test]
    fn test_encode_data_url() {
        let image = MealImage::from_bytes(vec![0xFF, 0xD8, 0xFF], "image/jpeg");
        let url = VisionProvider::encode_data_url(&image);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.ends_with("/9j/"));
    }

    #[test]
    fn test_request_serializes_multimodal_parts() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: "prompt".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AAAA".to_string(),
                        },
                    },
                ],
            }],
            max_completion_tokens: 500,
            temperature: 0.2,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert_eq!(value["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            value["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
    }

    #[tokio::test]
    async fn test_analyze_without_key_is_unavailable() {
        let provider = provider_without_key();
        let image = MealImage::from_bytes(vec![1, 2, 3], "image/png");

        let result = provider.analyze(&image, None).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_liveness_without_key_is_false() {
        let provider = provider_without_key();
        assert!(!provider.check_liveness().await);
        assert!(!provider.is_configured());
    }
}
