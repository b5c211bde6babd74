//! Meal analysis orchestrator
//!
//! Runs one analysis request end to end:
//!
//! ```text
//! analyze_meal(image, hint)
//!   |
//!   | 1. quota gate ------------------ QuotaExceeded{usage} --> caller
//!   | 2. lazy health revalidation of the preferred provider
//!   | 3. fingerprint + cache lookup -- hit --> return, no quota spent
//!   | 4. providers in order, offline estimator as terminal fallback
//!   | 5. clamp the estimate into valid ranges
//!   | 6. increment quota (offline results count too)
//!   | 7. cache the result for the rest of the day
//!   | 8. return
//! ```
//!
//! Failures after the quota gate never surface; they degrade to a
//! best-effort offline estimate. `QuotaExceeded` is the only error callers
//! ever see.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Error;
use crate::services::quota::{QuotaCheck, QuotaStore, UsageStats};
use crate::storage::KeyValueStore;

use super::cache::{Fingerprint, ResultCache};
use super::classifier::ClassifierProvider;
use super::config::AnalysisConfig;
use super::offline::OfflineEstimator;
use super::provider::NutritionProvider;
use super::types::{AnalysisError, MealImage, NutritionEstimate, ProviderHealth, ProviderId};
use super::vision::VisionProvider;

// ============================================================================
// Validation Bounds
// ============================================================================

/// Upper clamp for estimated calories
const MAX_CALORIES: i32 = 2000;

/// Upper clamp for each macro, in grams
const MAX_MACRO_GRAMS: f64 = 100.0;

// ============================================================================
// Meal Analyzer
// ============================================================================

/// Mutable orchestrator state behind one async lock
///
/// A single lock both serializes whole analyses, so two concurrent calls
/// cannot slip through the quota gate together, and guards the cache and
/// health records.
struct AnalyzerState {
    preferred: ProviderId,
    health: HashMap<ProviderId, ProviderHealth>,
    cache: ResultCache,
}

/// Coordinates quota, provider selection, caching, and validation
pub struct MealAnalyzer {
    quota: QuotaStore,
    providers: Vec<Arc<dyn NutritionProvider>>,
    offline: OfflineEstimator,
    config: AnalysisConfig,
    state: Mutex<AnalyzerState>,
}

impl MealAnalyzer {
    /// Create an analyzer wired to the real networked providers
    pub fn new(store: Arc<dyn KeyValueStore>, config: AnalysisConfig) -> Self {
        let config = config.validate();
        let providers: Vec<Arc<dyn NutritionProvider>> = vec![
            Arc::new(VisionProvider::new(
                config.vision.clone(),
                config.request_timeout_secs,
            )),
            Arc::new(ClassifierProvider::new(
                config.classifier.clone(),
                config.request_timeout_secs,
            )),
        ];

        Self::with_providers(store, config, providers)
    }

    /// Create an analyzer over explicit providers
    ///
    /// Tests inject scripted providers here; `new` is this plus the real
    /// network-backed set.
    pub fn with_providers(
        store: Arc<dyn KeyValueStore>,
        config: AnalysisConfig,
        providers: Vec<Arc<dyn NutritionProvider>>,
    ) -> Self {
        let config = config.validate();
        let preferred = config.preferred;

        Self {
            quota: QuotaStore::new(store),
            providers,
            offline: OfflineEstimator::new(),
            config,
            state: Mutex::new(AnalyzerState {
                preferred,
                health: HashMap::new(),
                cache: ResultCache::new(),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Main entry point
    // ------------------------------------------------------------------

    /// Analyze a meal photo
    ///
    /// The only error is [`AnalysisError::QuotaExceeded`]; every other
    /// failure degrades to an offline estimate that still consumes quota.
    pub async fn analyze_meal(
        &self,
        image: &MealImage,
        hint: Option<&str>,
    ) -> Result<NutritionEstimate, AnalysisError> {
        let mut state = self.state.lock().await;

        // Gate before any provider work or cache lookup
        let check = self.quota.can_perform_analysis().await;
        if !check.allowed {
            log::info!(
                "[analysis:orchestrator] Daily limit reached ({}/{})",
                check.usage.count,
                check.usage.limit
            );
            return Err(AnalysisError::QuotaExceeded { usage: check.usage });
        }

        match self.run_pipeline(&mut state, image, hint).await {
            Ok(estimate) => Ok(estimate),
            Err(e) => {
                log::error!(
                    "[analysis:orchestrator] Pipeline failed after quota gate, degrading to offline estimate: {}",
                    e
                );
                Ok(self.offline_fallback(&mut state, image, hint).await)
            }
        }
    }

    /// Steps 2 through 8, with storage errors propagated to the caller's
    /// degradation path
    async fn run_pipeline(
        &self,
        state: &mut AnalyzerState,
        image: &MealImage,
        hint: Option<&str>,
    ) -> Result<NutritionEstimate, Error> {
        self.revalidate_health(state).await;

        let fingerprint = Fingerprint::for_image(image);
        if let Some(cached) = state.cache.get(&fingerprint) {
            log::debug!("[analysis:orchestrator] Cache hit for {}", fingerprint);
            return Ok(cached);
        }

        let raw = self.attempt_providers(state, image, hint).await;
        let estimate = validate_estimate(raw);

        self.quota.increment_usage().await?;
        state.cache.put(fingerprint, estimate.clone());

        Ok(estimate)
    }

    /// Best-effort result when the pipeline fails after the quota gate
    async fn offline_fallback(
        &self,
        state: &mut AnalyzerState,
        image: &MealImage,
        hint: Option<&str>,
    ) -> NutritionEstimate {
        let estimate = validate_estimate(self.offline.estimate(hint));

        if let Err(e) = self.quota.increment_usage().await {
            log::warn!(
                "[analysis:orchestrator] Could not record usage for the fallback estimate: {}",
                e
            );
        }

        state.cache.put(Fingerprint::for_image(image), estimate.clone());
        estimate
    }

    // ------------------------------------------------------------------
    // Provider selection
    // ------------------------------------------------------------------

    /// Re-run the preferred provider's liveness probe when its record has
    /// gone stale
    async fn revalidate_health(&self, state: &mut AnalyzerState) {
        let Some(provider) = self.provider_by_id(state.preferred) else {
            // Offline preference, or a provider that was never registered
            return;
        };

        if !provider.needs_liveness_check() {
            return;
        }

        let fresh = state
            .health
            .get(&provider.id())
            .map(|h| !h.is_stale(self.config.health_ttl_secs))
            .unwrap_or(false);
        if fresh {
            return;
        }

        log::debug!(
            "[analysis:orchestrator] Revalidating {} provider health",
            provider.id()
        );
        let usable = provider.check_liveness().await;
        state
            .health
            .insert(provider.id(), ProviderHealth::new(provider.id(), usable));

        if !usable {
            log::warn!(
                "[analysis:orchestrator] {} provider failed its liveness probe",
                provider.id()
            );
        }
    }

    /// Networked providers in attempt order for this request
    ///
    /// The preferred provider leads unless a probe marked it unusable, in
    /// which case it drops behind the others but stays in the chain. An
    /// offline preference empties the list entirely.
    fn effective_order(&self, state: &AnalyzerState) -> Vec<Arc<dyn NutritionProvider>> {
        if state.preferred == ProviderId::Offline {
            return Vec::new();
        }

        let mut ordered: Vec<Arc<dyn NutritionProvider>> =
            Vec::with_capacity(self.providers.len());
        let mut demoted: Vec<Arc<dyn NutritionProvider>> = Vec::new();

        for provider in &self.providers {
            if provider.id() == state.preferred {
                if self.is_usable(state, provider.as_ref()) {
                    ordered.insert(0, provider.clone());
                } else {
                    demoted.push(provider.clone());
                }
            } else {
                ordered.push(provider.clone());
            }
        }

        ordered.extend(demoted);
        ordered
    }

    fn is_usable(&self, state: &AnalyzerState, provider: &dyn NutritionProvider) -> bool {
        if !provider.needs_liveness_check() {
            return true;
        }

        state
            .health
            .get(&provider.id())
            .map(|h| h.is_usable)
            .unwrap_or(true)
    }

    /// Walk the provider chain; the offline estimator terminates it and
    /// makes this step infallible
    async fn attempt_providers(
        &self,
        state: &AnalyzerState,
        image: &MealImage,
        hint: Option<&str>,
    ) -> NutritionEstimate {
        for provider in self.effective_order(state) {
            log::debug!("[analysis:orchestrator] Trying {} provider", provider.id());
            match provider.analyze(image, hint).await {
                Ok(estimate) => {
                    log::info!(
                        "[analysis:orchestrator] {} provider returned an estimate ({} kcal)",
                        provider.id(),
                        estimate.calories
                    );
                    return estimate;
                }
                Err(e) => {
                    log::warn!(
                        "[analysis:orchestrator] {} provider failed: {}",
                        provider.id(),
                        e
                    );
                }
            }
        }

        log::info!("[analysis:orchestrator] Falling back to the offline estimator");
        self.offline.estimate(hint)
    }

    fn provider_by_id(&self, id: ProviderId) -> Option<&Arc<dyn NutritionProvider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    // ------------------------------------------------------------------
    // Caller surface
    // ------------------------------------------------------------------

    /// Choose the provider tried first
    ///
    /// Dropping the provider's health record forces a fresh probe on the
    /// next analysis.
    pub async fn set_provider(&self, id: ProviderId) {
        let mut state = self.state.lock().await;
        state.preferred = id;
        state.health.remove(&id);
        log::info!("[analysis:orchestrator] Preferred provider set to {}", id);
    }

    /// Provider currently tried first
    pub async fn preferred_provider(&self) -> ProviderId {
        self.state.lock().await.preferred
    }

    /// Drop all cached estimates
    pub async fn clear_cache(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
        log::info!("[analysis:orchestrator] Result cache cleared");
    }

    /// Number of estimates currently cached
    pub async fn cached_estimates(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    /// Usage statistics from the quota store
    pub async fn usage_stats(&self) -> UsageStats {
        self.quota.usage_stats().await
    }

    /// Today's pre-analysis quota check
    pub async fn quota_check(&self) -> QuotaCheck {
        self.quota.can_perform_analysis().await
    }

    /// Set the daily analysis limit
    pub async fn set_daily_limit(&self, limit: u32) -> Result<(), Error> {
        self.quota.set_limit(limit).await
    }

    /// Reset today's usage counter
    pub async fn reset_today(&self) -> Result<(), Error> {
        self.quota.reset_today().await
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Clamp an estimate into the ranges promised to callers
fn validate_estimate(estimate: NutritionEstimate) -> NutritionEstimate {
    NutritionEstimate {
        calories: estimate.calories.clamp(0, MAX_CALORIES),
        protein: clamp_macro(estimate.protein),
        carbs: clamp_macro(estimate.carbs),
        fats: clamp_macro(estimate.fats),
        confidence: clamp_unit(estimate.confidence),
        detected_labels: estimate.detected_labels,
        note: estimate.note,
    }
}

/// Clamp grams into [0, MAX_MACRO_GRAMS]; non-finite values become 0
fn clamp_macro(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_MACRO_GRAMS)
    } else {
        0.0
    }
}

/// Clamp into [0, 1]; non-finite values become 0
fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
