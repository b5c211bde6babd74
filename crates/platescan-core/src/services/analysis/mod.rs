//! Meal nutrition analysis
//!
//! Turns a meal photo into a structured nutrition estimate, behind a daily
//! quota. Estimation strategies are interchangeable providers; the
//! orchestrator owns ordering, health, caching, and validation.
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        MealAnalyzer                          |
//! |  analyze_meal() . set_provider() . clear_cache() . stats     |
//! +-----+--------------------+--------------------+--------------+
//!       |                    |                    |
//!       v                    v                    v
//! +------------+   +------------------+   +--------------+
//! | QuotaStore |   | provider chain   |   | ResultCache  |
//! | (gate +    |   |  VisionProvider  |   | (content     |
//! |  counter)  |   |  ClassifierProv. |   |  hash + day) |
//! +------------+   |  OfflineEstim.   |   +--------------+
//!                  +------------------+
//! ```
//!
//! The offline estimator sits outside the provider list as the terminal
//! fallback, which is what makes `analyze_meal` infallible once the quota
//! gate has passed.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod lookup;
pub mod offline;
pub mod orchestrator;
pub mod provider;
pub mod types;
pub mod vision;

pub use cache::{Fingerprint, ResultCache};
pub use classifier::ClassifierProvider;
pub use config::{AnalysisConfig, ClassifierConfig, VisionConfig};
pub use offline::OfflineEstimator;
pub use orchestrator::MealAnalyzer;
pub use provider::{NutritionProvider, ProviderError};
pub use types::{AnalysisError, MealImage, NutritionEstimate, ProviderHealth, ProviderId};
pub use vision::VisionProvider;
