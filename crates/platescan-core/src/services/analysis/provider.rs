//! Nutrition provider abstraction
//!
//! Every analysis strategy that can fail sits behind [`NutritionProvider`];
//! the orchestrator walks them in preference order and treats any error as
//! a signal to try the next one.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{MealImage, NutritionEstimate, ProviderId};

// ============================================================================
// Error Types
// ============================================================================

/// Errors a single provider attempt can produce
///
/// None of these reach the caller; the orchestrator logs them and moves on
/// to the next provider in the chain.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network failure, missing credentials, or a non-success HTTP status
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The request exceeded its configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The response arrived but did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The model declined to analyze the image
    #[error("Model refused: {0}")]
    Refused(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Unavailable("Connection failed".to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(err.to_string())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Trait implemented by each nutrition analysis strategy
#[async_trait]
pub trait NutritionProvider: Send + Sync {
    /// Identifier used for selection, health records, and logging
    fn id(&self) -> ProviderId;

    /// Estimate nutrition for a meal photo, with an optional text hint
    async fn analyze(
        &self,
        image: &MealImage,
        hint: Option<&str>,
    ) -> Result<NutritionEstimate, ProviderError>;

    /// Whether this provider has a liveness probe worth running
    ///
    /// Providers without one are assumed reachable until an attempt fails.
    fn needs_liveness_check(&self) -> bool {
        false
    }

    /// Cheap availability probe that validates credentials and connectivity
    /// without doing real analysis work
    async fn check_liveness(&self) -> bool {
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
