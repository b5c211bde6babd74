//! Nutrition analysis types
//!
//! Shared types for providers, the orchestrator, and caller surfaces.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::services::quota::QuotaRecord;

// ============================================================================
// Provider Identity
// ============================================================================

/// Identifier for one of the interchangeable analysis strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Vision-LLM chat completion over the photo (primary)
    Vision,
    /// Image classification endpoint plus the food table (fallback target)
    Classifier,
    /// Keyword heuristics over the text hint, never fails
    Offline,
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderId::Vision => write!(f, "vision"),
            ProviderId::Classifier => write!(f, "classifier"),
            ProviderId::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vision" | "llm" => Ok(ProviderId::Vision),
            "classifier" | "label" => Ok(ProviderId::Classifier),
            "offline" | "local" => Ok(ProviderId::Offline),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

// ============================================================================
// Nutrition Estimate
// ============================================================================

/// A structured nutrition estimate for one meal
///
/// Field names mirror the JSON shape the vision model is instructed to
/// return, so a model reply parses directly into this struct. Estimates are
/// immutable once produced; the orchestrator clamps a copy before caching
/// or returning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    /// Estimated energy in kcal
    pub calories: i32,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fats: f64,
    /// Provider's confidence in the estimate, 0.0 - 1.0
    pub confidence: f64,
    /// Foods the provider recognized, most prominent first
    #[serde(rename = "detectedLabels", default)]
    pub detected_labels: Vec<String>,
    /// Optional short remark from the provider
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Meal Image
// ============================================================================

/// A meal photo as raw bytes plus its mime type
#[derive(Debug, Clone)]
pub struct MealImage {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Mime type used for transport headers and data URLs
    pub mime_type: String,
}

impl MealImage {
    /// Wrap raw bytes with an explicit mime type
    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, inferring the mime type from the extension
    pub fn from_path(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let mime_type = mime_from_extension(path);
        Ok(Self { bytes, mime_type })
    }

    /// Hex SHA-256 digest of the image bytes
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// Mime type for common image extensions
fn mime_from_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
    .to_string()
}

// ============================================================================
// Provider Health
// ============================================================================

/// Cached liveness probe result for a networked provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Provider this record describes
    pub provider_id: ProviderId,
    /// When the probe last ran
    pub validated_at: DateTime<Utc>,
    /// Probe outcome
    pub is_usable: bool,
}

impl ProviderHealth {
    /// Record a probe result taken now
    pub fn new(provider_id: ProviderId, is_usable: bool) -> Self {
        Self {
            provider_id,
            validated_at: Utc::now(),
            is_usable,
        }
    }

    /// Whether the record is older than `ttl_secs`
    pub fn is_stale(&self, ttl_secs: i64) -> bool {
        (Utc::now() - self.validated_at).num_seconds() >= ttl_secs
    }
}

// ============================================================================
// Analysis Error
// ============================================================================

/// The only analysis failure surfaced to callers
///
/// Provider and storage failures are absorbed by the fallback chain; quota
/// exhaustion is the one condition the user must act on.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Daily analysis limit reached ({}/{})", .usage.count, .usage.limit)]
    QuotaExceeded {
        /// Usage record at the moment of refusal
        usage: QuotaRecord,
    },
}

// ============================================================================
// Tests
// ============================================================================
