//! Services module

pub mod analysis;
pub mod quota;
pub mod session;

pub use analysis::{
    AnalysisConfig, AnalysisError, ClassifierConfig, ClassifierProvider, Fingerprint,
    MealAnalyzer, MealImage, NutritionEstimate, NutritionProvider, OfflineEstimator,
    ProviderError, ProviderHealth, ProviderId, ResultCache, VisionConfig, VisionProvider,
};
pub use quota::{
    QuotaCheck, QuotaRecord, QuotaStore, UsageStats, DEFAULT_DAILY_LIMIT,
};
pub use session::{SessionStore, UserProfile, MAX_SESSION_AGE_DAYS};
