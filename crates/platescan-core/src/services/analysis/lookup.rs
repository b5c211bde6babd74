//! Static nutrition lookup tables
//!
//! Both the classifier provider and the offline estimator resolve free text
//! against fixed tables rather than calling out for nutrition data. Matching
//! is case-insensitive substring containment, and the first matching entry
//! in declared order wins, so more specific labels sit above the shorter
//! labels they contain ("cheesecake" above "cake").
//!
//! Values are per typical serving, rounded from USDA FoodData Central
//! entries for common prepared dishes.

// ============================================================================
// Types
// ============================================================================

/// Macro profile for one food class, per typical serving
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodProfile {
    /// Energy in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fats: f64,
}

/// Ordered keyword table with a default for unmatched text
///
/// Declared order is the tiebreak when several keywords are contained in
/// the same text.
#[derive(Debug, Clone, Copy)]
pub struct MacroTable {
    entries: &'static [(&'static str, f64)],
    default: f64,
}

impl MacroTable {
    pub const fn new(entries: &'static [(&'static str, f64)], default: f64) -> Self {
        Self { entries, default }
    }

    /// Value for the first keyword contained in `text`, else the default
    pub fn lookup(&self, text: &str) -> f64 {
        let needle = text.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| needle.contains(keyword))
            .map(|(_, value)| *value)
            .unwrap_or(self.default)
    }

    /// The keyword that `lookup` would match for `text`, if any
    pub fn matched_keyword(&self, text: &str) -> Option<&'static str> {
        let needle = text.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| needle.contains(keyword))
            .map(|(keyword, _)| *keyword)
    }

    /// Value returned when nothing matches
    pub fn default_value(&self) -> f64 {
        self.default
    }
}

// ============================================================================
// Food Profile Table
// ============================================================================

/// Food label -> macro profile mapping used by the classifier provider
///
/// Keys are single words where possible so they match classifier labels in
/// both "ice_cream" and "ice cream" form. "pie" precedes "apple" so that
/// "apple_pie" resolves to pie; "cheesecake" precedes "cake" for the same
/// reason.
pub const FOOD_PROFILES: &[(&str, FoodProfile)] = &[
    ("pizza", FoodProfile { calories: 266.0, protein: 11.0, carbs: 33.0, fats: 10.0 }),
    ("burger", FoodProfile { calories: 540.0, protein: 25.0, carbs: 40.0, fats: 29.0 }),
    ("sushi", FoodProfile { calories: 350.0, protein: 15.0, carbs: 60.0, fats: 5.0 }),
    ("ramen", FoodProfile { calories: 440.0, protein: 18.0, carbs: 60.0, fats: 14.0 }),
    ("spaghetti", FoodProfile { calories: 370.0, protein: 13.0, carbs: 52.0, fats: 10.0 }),
    ("pasta", FoodProfile { calories: 380.0, protein: 13.0, carbs: 55.0, fats: 11.0 }),
    ("lasagna", FoodProfile { calories: 410.0, protein: 22.0, carbs: 38.0, fats: 18.0 }),
    ("rice", FoodProfile { calories: 130.0, protein: 2.7, carbs: 28.0, fats: 0.3 }),
    ("noodle", FoodProfile { calories: 380.0, protein: 12.0, carbs: 58.0, fats: 10.0 }),
    ("steak", FoodProfile { calories: 450.0, protein: 40.0, carbs: 0.0, fats: 30.0 }),
    ("chicken", FoodProfile { calories: 335.0, protein: 38.0, carbs: 0.0, fats: 19.0 }),
    ("fish", FoodProfile { calories: 305.0, protein: 22.0, carbs: 15.0, fats: 17.0 }),
    ("salad", FoodProfile { calories: 150.0, protein: 5.0, carbs: 10.0, fats: 9.0 }),
    ("soup", FoodProfile { calories: 170.0, protein: 8.0, carbs: 18.0, fats: 7.0 }),
    ("sandwich", FoodProfile { calories: 350.0, protein: 15.0, carbs: 40.0, fats: 14.0 }),
    ("taco", FoodProfile { calories: 210.0, protein: 9.0, carbs: 21.0, fats: 10.0 }),
    ("burrito", FoodProfile { calories: 450.0, protein: 18.0, carbs: 58.0, fats: 16.0 }),
    ("curry", FoodProfile { calories: 400.0, protein: 15.0, carbs: 40.0, fats: 20.0 }),
    ("fries", FoodProfile { calories: 365.0, protein: 4.0, carbs: 48.0, fats: 17.0 }),
    ("omelette", FoodProfile { calories: 310.0, protein: 20.0, carbs: 3.0, fats: 24.0 }),
    ("eggplant", FoodProfile { calories: 132.0, protein: 2.0, carbs: 13.0, fats: 8.0 }),
    ("egg", FoodProfile { calories: 155.0, protein: 13.0, carbs: 1.1, fats: 11.0 }),
    ("pancake", FoodProfile { calories: 230.0, protein: 6.0, carbs: 38.0, fats: 6.0 }),
    ("waffle", FoodProfile { calories: 290.0, protein: 7.0, carbs: 33.0, fats: 14.0 }),
    ("bread", FoodProfile { calories: 80.0, protein: 3.0, carbs: 15.0, fats: 1.0 }),
    ("donut", FoodProfile { calories: 250.0, protein: 4.0, carbs: 30.0, fats: 14.0 }),
    ("cheesecake", FoodProfile { calories: 400.0, protein: 7.0, carbs: 32.0, fats: 28.0 }),
    ("cake", FoodProfile { calories: 350.0, protein: 4.0, carbs: 50.0, fats: 15.0 }),
    ("pie", FoodProfile { calories: 320.0, protein: 3.0, carbs: 45.0, fats: 15.0 }),
    ("apple", FoodProfile { calories: 95.0, protein: 0.5, carbs: 25.0, fats: 0.3 }),
    ("banana", FoodProfile { calories: 105.0, protein: 1.3, carbs: 27.0, fats: 0.4 }),
];

/// Profile for the first table entry contained in `label`
pub fn food_profile(label: &str) -> Option<FoodProfile> {
    let needle = label.to_lowercase();
    FOOD_PROFILES
        .iter()
        .find(|(keyword, _)| needle.contains(keyword))
        .map(|(_, profile)| *profile)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_profile_exact_label() {
        let pizza = food_profile("pizza").unwrap();
        assert_eq!(pizza.calories, 266.0);

        let rice = food_profile("rice").unwrap();
        assert_eq!(rice.calories, 130.0);
        assert_eq!(rice.protein, 2.7);
    }

    #[test]
    fn test_food_profile_substring_and_case() {
        assert_eq!(
            food_profile("Cheese Pizza").map(|p| p.calories),
            Some(266.0)
        );
        assert_eq!(food_profile("fried_rice").map(|p| p.calories), Some(130.0));
        assert!(food_profile("mystery substance").is_none());
    }

    #[test]
    fn test_food_profile_declared_order_wins() {
        // "apple_pie" contains both "pie" and "apple"; "pie" is declared first
        assert_eq!(food_profile("apple_pie").map(|p| p.calories), Some(320.0));
        assert_eq!(food_profile("apple").map(|p| p.calories), Some(95.0));

        // Same for "cheesecake" over "cake" and "eggplant" over "egg"
        assert_eq!(food_profile("cheesecake").map(|p| p.calories), Some(400.0));
        assert_eq!(food_profile("carrot cake").map(|p| p.calories), Some(350.0));
        assert_eq!(food_profile("eggplant parmesan").map(|p| p.calories), Some(132.0));
    }

    #[test]
    fn test_macro_table_lookup() {
        const TABLE: MacroTable = MacroTable::new(&[("steak", 42.0), ("fish", 28.0)], 12.0);

        assert_eq!(TABLE.lookup("Grilled Steak"), 42.0);
        assert_eq!(TABLE.lookup("fish tacos"), 28.0);
        assert_eq!(TABLE.lookup("fruit bowl"), 12.0);
        assert_eq!(TABLE.default_value(), 12.0);
    }

    #[test]
    fn test_macro_table_first_match_in_declared_order() {
        const TABLE: MacroTable = MacroTable::new(&[("steak", 42.0), ("fish", 28.0)], 12.0);

        // Both keywords present; the earlier entry wins
        assert_eq!(TABLE.lookup("steak and fish platter"), 42.0);
        assert_eq!(TABLE.matched_keyword("steak and fish platter"), Some("steak"));
        assert_eq!(TABLE.matched_keyword("fruit bowl"), None);
    }
}
