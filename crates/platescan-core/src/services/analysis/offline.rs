//! Offline nutrition estimator
//!
//! Deterministic terminal fallback for the provider chain. Resolves the
//! free-text meal hint against four independent keyword tables, one per
//! macro, and never fails.

use super::lookup::MacroTable;
use super::types::NutritionEstimate;

// ============================================================================
// Constants
// ============================================================================

/// Hint substituted when the caller provides none
pub const DEFAULT_HINT: &str = "home-cooked meal";

/// Confidence reported for keyword-based estimates
pub const OFFLINE_CONFIDENCE: f64 = 0.6;

/// Calorie estimates per meal keyword (kcal)
const CALORIE_TABLE: MacroTable = MacroTable::new(
    &[
        ("salad", 180.0),
        ("soup", 170.0),
        ("sandwich", 360.0),
        ("burger", 550.0),
        ("pizza", 285.0),
        ("pasta", 420.0),
        ("noodle", 400.0),
        ("rice", 320.0),
        ("steak", 480.0),
        ("fish", 330.0),
        ("breakfast", 420.0),
        ("dessert", 350.0),
    ],
    300.0,
);

/// Protein estimates per keyword (grams)
const PROTEIN_TABLE: MacroTable = MacroTable::new(
    &[
        ("steak", 42.0),
        ("chicken", 35.0),
        ("fish", 28.0),
        ("egg", 14.0),
        ("tofu", 16.0),
        ("beans", 13.0),
        ("burger", 25.0),
    ],
    12.0,
);

/// Carbohydrate estimates per keyword (grams)
const CARB_TABLE: MacroTable = MacroTable::new(
    &[
        ("pasta", 52.0),
        ("noodle", 50.0),
        ("rice", 45.0),
        ("bread", 36.0),
        ("potato", 38.0),
        ("pizza", 36.0),
        ("salad", 12.0),
    ],
    30.0,
);

/// Fat estimates per keyword (grams)
const FAT_TABLE: MacroTable = MacroTable::new(
    &[
        ("fried", 26.0),
        ("burger", 29.0),
        ("cheese", 21.0),
        ("avocado", 18.0),
        ("steak", 22.0),
        ("salad", 9.0),
    ],
    8.0,
);

// ============================================================================
// Offline Estimator
// ============================================================================

/// Keyword-driven estimator used when every networked provider fails
#[derive(Debug, Clone, Default)]
pub struct OfflineEstimator;

impl OfflineEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate nutrition from the hint text alone
    ///
    /// Each macro table is consulted independently, so "chicken salad" takes
    /// its calories from "salad" and its protein from "chicken". Unmatched
    /// tables fall back to their defaults.
    pub fn estimate(&self, hint: Option<&str>) -> NutritionEstimate {
        let text = match hint {
            Some(h) if !h.trim().is_empty() => h,
            _ => DEFAULT_HINT,
        };

        log::debug!("[analysis:offline] Estimating from description: {}", text);

        let mut detected_labels: Vec<String> = Vec::new();
        for table in [&CALORIE_TABLE, &PROTEIN_TABLE, &CARB_TABLE, &FAT_TABLE] {
            if let Some(keyword) = table.matched_keyword(text) {
                if !detected_labels.iter().any(|label| label == keyword) {
                    detected_labels.push(keyword.to_string());
                }
            }
        }

        NutritionEstimate {
            calories: CALORIE_TABLE.lookup(text).round() as i32,
            protein: PROTEIN_TABLE.lookup(text),
            carbs: CARB_TABLE.lookup(text),
            fats: FAT_TABLE.lookup(text),
            confidence: OFFLINE_CONFIDENCE,
            detected_labels,
            note: Some(format!("Estimated offline from \"{}\"", text)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hint_uses_defaults() {
        let estimator = OfflineEstimator::new();
        let estimate = estimator.estimate(None);

        // "home-cooked meal" matches no table, so every default applies
        assert_eq!(estimate.calories, 300);
        assert_eq!(estimate.protein, 12.0);
        assert_eq!(estimate.carbs, 30.0);
        assert_eq!(estimate.fats, 8.0);
        assert_eq!(estimate.confidence, OFFLINE_CONFIDENCE);
        assert!(estimate.detected_labels.is_empty());
        assert_eq!(
            estimate.note.as_deref(),
            Some("Estimated offline from \"home-cooked meal\"")
        );
    }

    #[test]
    fn test_blank_hint_treated_as_absent() {
        let estimator = OfflineEstimator::new();
        let estimate = estimator.estimate(Some("   "));
        assert_eq!(estimate.calories, 300);
    }

    #[test]
    fn test_tables_resolve_independently() {
        let estimator = OfflineEstimator::new();
        let estimate = estimator.estimate(Some("grilled chicken salad"));

        // Calories and carbs from "salad", protein from "chicken", fats from "salad"
        assert_eq!(estimate.calories, 180);
        assert_eq!(estimate.protein, 35.0);
        assert_eq!(estimate.carbs, 12.0);
        assert_eq!(estimate.fats, 9.0);
        assert_eq!(estimate.detected_labels, vec!["salad", "chicken"]);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let estimator = OfflineEstimator::new();
        let estimate = estimator.estimate(Some("PIZZA Night"));
        assert_eq!(estimate.calories, 285);
        assert_eq!(estimate.carbs, 36.0);
    }

    #[test]
    fn test_first_keyword_in_declared_order_wins() {
        let estimator = OfflineEstimator::new();
        let estimate = estimator.estimate(Some("steak and fish"));

        // Protein table declares "steak" before "fish"
        assert_eq!(estimate.protein, 42.0);
        assert_eq!(estimate.calories, 480);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let estimator = OfflineEstimator::new();
        let a = estimator.estimate(Some("ramen with egg"));
        let b = estimator.estimate(Some("ramen with egg"));
        assert_eq!(a, b);
    }
}
