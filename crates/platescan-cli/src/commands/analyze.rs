//! Analyze command
//!
//! Runs meal photos through the analyzer and prints one result row per
//! image. Repeated paths in a single invocation share the result cache, so
//! they cost one quota unit.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use platescan_core::{
    AnalysisConfig, AnalysisError, MealAnalyzer, MealImage, NutritionEstimate, ProviderId,
};

use super::Context;
use crate::output::{print_error, print_info, print_output};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Image files to analyze
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Short description of the meal, passed to providers as a hint
    #[arg(long)]
    pub hint: Option<String>,

    /// Provider to try first: vision, classifier, or offline
    #[arg(long)]
    pub provider: Option<ProviderId>,
}

/// Estimate row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct EstimateRow {
    #[tabled(rename = "Image")]
    pub image: String,
    #[tabled(rename = "Calories")]
    pub calories: i32,
    #[tabled(rename = "Protein (g)")]
    pub protein: String,
    #[tabled(rename = "Carbs (g)")]
    pub carbs: String,
    #[tabled(rename = "Fats (g)")]
    pub fats: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    #[tabled(rename = "Detected")]
    pub detected: String,
}

impl EstimateRow {
    fn new(path: &Path, estimate: &NutritionEstimate) -> Self {
        let image = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            image,
            calories: estimate.calories,
            protein: format!("{:.1}", estimate.protein),
            carbs: format!("{:.1}", estimate.carbs),
            fats: format!("{:.1}", estimate.fats),
            confidence: format_confidence(estimate.confidence),
            detected: if estimate.detected_labels.is_empty() {
                "-".to_string()
            } else {
                estimate.detected_labels.join(", ")
            },
        }
    }
}

pub async fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let analyzer = MealAnalyzer::new(ctx.kv_store(), AnalysisConfig::from_env());

    if let Some(provider) = args.provider {
        analyzer.set_provider(provider).await;
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut quota_error = None;

    for path in &args.images {
        let image = match MealImage::from_path(path) {
            Ok(image) => image,
            Err(e) => {
                print_error(&format!("Cannot read {}: {}", path.display(), e));
                skipped += 1;
                continue;
            }
        };
        print_info(&format!("Analyzing {}...", path.display()), ctx.quiet);

        match analyzer.analyze_meal(&image, args.hint.as_deref()).await {
            Ok(estimate) => rows.push(EstimateRow::new(path, &estimate)),
            Err(e @ AnalysisError::QuotaExceeded { .. }) => {
                quota_error = Some(e);
                break;
            }
        }
    }

    if !rows.is_empty() {
        print_output(&rows, ctx.format)?;
    }

    let check = analyzer.quota_check().await;
    print_info(
        &format!("Analyses remaining today: {}", check.remaining),
        ctx.quiet,
    );

    if let Some(e) = quota_error {
        let stats = analyzer.usage_stats().await;
        print_info(
            &format!(
                "The counter resets at {}",
                stats.next_reset.format("%Y-%m-%d %H:%M")
            ),
            ctx.quiet,
        );
        return Err(e.into());
    }
    if skipped > 0 && rows.is_empty() {
        anyhow::bail!("No images could be analyzed");
    }

    Ok(())
}

fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}
