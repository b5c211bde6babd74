//! Quota commands
//!
//! Commands for inspecting and adjusting the daily analysis quota.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use platescan_core::{QuotaStore, UsageStats};

use super::Context;
use crate::output::{print_single, print_success, print_warning};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show today's usage and limit
    Show,

    /// Set the daily analysis limit
    SetLimit {
        /// New limit, must be at least 1
        limit: u32,
    },

    /// Reset today's usage counter
    Reset,
}

/// Quota row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct QuotaRow {
    #[tabled(rename = "Day")]
    pub day: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Remaining")]
    pub remaining: u32,
}

/// Stats row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct StatsRow {
    #[tabled(rename = "Day")]
    pub day: String,
    #[tabled(rename = "Analyses")]
    pub analyses: u32,
    #[tabled(rename = "Limit")]
    pub limit: u32,
    #[tabled(rename = "Usage")]
    pub usage: String,
    #[tabled(rename = "Resets At")]
    pub resets_at: String,
}

impl StatsRow {
    fn new(stats: &UsageStats) -> Self {
        Self {
            day: stats.current.day.to_string(),
            analyses: stats.current.count,
            limit: stats.current.limit,
            usage: format_percentage(stats.percentage),
            resets_at: stats.next_reset.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: QuotaAction) -> Result<()> {
    let quota = QuotaStore::new(ctx.kv_store());

    match action {
        QuotaAction::Show => show(ctx, &quota).await,
        QuotaAction::SetLimit { limit } => set_limit(ctx, &quota, limit).await,
        QuotaAction::Reset => reset(ctx, &quota).await,
    }
}

/// Top-level `stats` command
pub async fn execute_stats(ctx: &Context) -> Result<()> {
    let quota = QuotaStore::new(ctx.kv_store());
    let stats = quota.usage_stats().await;

    print_single(&StatsRow::new(&stats), ctx.format)?;

    if stats.is_over_limit {
        print_warning("Daily limit reached. The counter resets at local midnight.", ctx.quiet);
    }

    Ok(())
}

async fn show(ctx: &Context, quota: &QuotaStore) -> Result<()> {
    let check = quota.can_perform_analysis().await;

    let row = QuotaRow {
        day: check.usage.day.to_string(),
        used: format!("{} / {}", check.usage.count, check.usage.limit),
        remaining: check.remaining,
    };
    print_single(&row, ctx.format)?;

    if !check.allowed {
        print_warning("Daily limit reached. The counter resets at local midnight.", ctx.quiet);
    }

    Ok(())
}

async fn set_limit(ctx: &Context, quota: &QuotaStore, limit: u32) -> Result<()> {
    quota.set_limit(limit).await?;
    print_success(&format!("Daily analysis limit set to {}", limit), ctx.quiet);
    Ok(())
}

async fn reset(ctx: &Context, quota: &QuotaStore) -> Result<()> {
    quota.reset_today().await?;
    print_success("Today's usage counter reset", ctx.quiet);
    Ok(())
}

fn format_percentage(percentage: f64) -> String {
    format!("{:.1}%", percentage)
}
