//! Label-classifier nutrition provider
//!
//! POSTs raw image bytes to an image classification endpoint and maps the
//! ranked labels onto the static food table. This is the fallback target
//! when the vision provider is down; it has no liveness probe of its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::config::ClassifierConfig;
use super::lookup::{food_profile, FoodProfile};
use super::provider::{NutritionProvider, ProviderError};
use super::types::{MealImage, NutritionEstimate, ProviderId};

// ============================================================================
// Constants
// ============================================================================

/// Weights applied to the top-ranked labels, best first
const RANK_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];

/// Substituted when no label matches the food table
const GENERIC_PROFILE: FoodProfile = FoodProfile {
    calories: 300.0,
    protein: 15.0,
    carbs: 40.0,
    fats: 10.0,
};

// ============================================================================
// API Response Types
// ============================================================================

/// One ranked classification from the endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifiedLabel {
    pub label: String,
    pub score: f64,
}

// ============================================================================
// Classifier Provider
// ============================================================================

/// Provider backed by an image classification endpoint
pub struct ClassifierProvider {
    config: ClassifierConfig,
    client: Client,
}

impl ClassifierProvider {
    pub fn new(config: ClassifierConfig, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// POST the image bytes and parse the ranked label list
    async fn fetch_labels(&self, image: &MealImage) -> Result<Vec<ClassifiedLabel>, ProviderError> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", image.mime_type.clone())
            .body(image.bytes.clone());

        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Classifier API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        let labels: Vec<ClassifiedLabel> = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Unexpected classifier payload: {}. Raw: {}",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })?;

        Ok(labels)
    }
}

#[async_trait]
impl NutritionProvider for ClassifierProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Classifier
    }

    async fn analyze(
        &self,
        image: &MealImage,
        _hint: Option<&str>,
    ) -> Result<NutritionEstimate, ProviderError> {
        log::debug!(
            "[analysis:classifier] Classifying {} bytes ({})",
            image.bytes.len(),
            image.mime_type
        );

        let labels = self.fetch_labels(image).await?;
        log::debug!("[analysis:classifier] Received {} labels", labels.len());

        Ok(estimate_from_labels(&labels))
    }
}

// ============================================================================
// Label Math
// ============================================================================

/// Blend the top-ranked labels into a weighted estimate
///
/// The best label contributes 60% of its profile, the second 30%, the third
/// 10%. Labels with no food profile contribute nothing. Confidence is the
/// mean score across the labels actually present in the top three.
fn estimate_from_labels(labels: &[ClassifiedLabel]) -> NutritionEstimate {
    let top = &labels[..labels.len().min(RANK_WEIGHTS.len())];

    let mut calories = 0.0;
    let mut protein = 0.0;
    let mut carbs = 0.0;
    let mut fats = 0.0;

    for (rank, classified) in top.iter().enumerate() {
        match food_profile(&classified.label) {
            Some(profile) => {
                let weight = RANK_WEIGHTS[rank];
                calories += profile.calories * weight;
                protein += profile.protein * weight;
                carbs += profile.carbs * weight;
                fats += profile.fats * weight;
            }
            None => {
                log::debug!(
                    "[analysis:classifier] No food profile for label: {}",
                    classified.label
                );
            }
        }
    }

    let confidence = if top.is_empty() {
        0.0
    } else {
        top.iter().map(|c| c.score).sum::<f64>() / top.len() as f64
    };

    let detected_labels: Vec<String> = top.iter().map(|c| c.label.clone()).collect();

    if calories == 0.0 {
        log::debug!("[analysis:classifier] No label matched the food table, using generic profile");
        return NutritionEstimate {
            calories: GENERIC_PROFILE.calories as i32,
            protein: GENERIC_PROFILE.protein,
            carbs: GENERIC_PROFILE.carbs,
            fats: GENERIC_PROFILE.fats,
            confidence,
            detected_labels,
            note: Some("Generic estimate; labels did not match known foods".to_string()),
        };
    }

    NutritionEstimate {
        calories: calories.round() as i32,
        protein,
        carbs,
        fats,
        confidence,
        detected_labels,
        note: None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str, score: f64) -> ClassifiedLabel {
        ClassifiedLabel {
            label: name.to_string(),
            score,
        }
    }

    #[test]
    fn test_weighted_blend_of_two_labels() {
        let labels = vec![label("pizza", 0.9), label("rice", 0.05)];
        let estimate = estimate_from_labels(&labels);

        // 266 * 0.6 + 130 * 0.3 = 198.6, rounded to 199
        assert_eq!(estimate.calories, 199);
        // (0.9 + 0.05) / 2
        assert!((estimate.confidence - 0.475).abs() < 1e-9);
        assert_eq!(estimate.detected_labels, vec!["pizza", "rice"]);
        assert!(estimate.note.is_none());
    }

    #[test]
    fn test_single_label_uses_top_weight_only() {
        let estimate = estimate_from_labels(&[label("pizza", 0.9)]);

        assert_eq!(estimate.calories, 160); // 266 * 0.6 = 159.6
        assert!((estimate.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_middle_label_contributes_nothing() {
        let labels = vec![
            label("pizza", 0.8),
            label("tablecloth", 0.1),
            label("rice", 0.05),
        ];
        let estimate = estimate_from_labels(&labels);

        // 266 * 0.6 + 0 + 130 * 0.1 = 172.6
        assert_eq!(estimate.calories, 173);
        // Mean over all three present scores
        let expected = (0.8 + 0.1 + 0.05) / 3.0;
        assert!((estimate.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fourth_label_is_ignored() {
        let labels = vec![
            label("pizza", 0.7),
            label("rice", 0.1),
            label("salad", 0.1),
            label("burger", 0.05),
        ];
        let estimate = estimate_from_labels(&labels);

        // burger never contributes and its score is excluded from the mean
        assert_eq!(estimate.detected_labels.len(), 3);
        let expected = (0.7 + 0.1 + 0.1) / 3.0;
        assert!((estimate.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_matches_substitutes_generic_profile() {
        let labels = vec![label("fork", 0.6), label("napkin", 0.3)];
        let estimate = estimate_from_labels(&labels);

        assert_eq!(estimate.calories, 300);
        assert_eq!(estimate.protein, 15.0);
        assert_eq!(estimate.carbs, 40.0);
        assert_eq!(estimate.fats, 10.0);
        assert!(estimate.note.is_some());
        // Labels are still reported even though none matched
        assert_eq!(estimate.detected_labels, vec!["fork", "napkin"]);
    }

    #[test]
    fn test_empty_label_list() {
        let estimate = estimate_from_labels(&[]);
        assert_eq!(estimate.calories, 300);
        assert_eq!(estimate.confidence, 0.0);
        assert!(estimate.detected_labels.is_empty());
    }

    #[test]
    fn test_response_payload_parses() {
        let body = r#"[
            {"label": "pizza", "score": 0.9231},
            {"label": "lasagna", "score": 0.0412}
        ]"#;

        let labels: Vec<ClassifiedLabel> = serde_json::from_str(body).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, "pizza");
        assert!((labels[1].score - 0.0412).abs() < 1e-9);
    }
}
