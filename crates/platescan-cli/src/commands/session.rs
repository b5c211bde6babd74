//! Session commands
//!
//! Commands for the locally stored user profile.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use platescan_core::{SessionStore, UserProfile};

use super::Context;
use crate::output::{print_info, print_single, print_success};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show the stored profile
    Show,

    /// Create or update the stored profile
    Set {
        /// Display name
        #[arg(long)]
        name: String,

        /// Daily calorie target
        #[arg(long)]
        calorie_target: Option<i32>,

        /// Free-form dietary notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove the stored profile
    Clear,
}

/// Profile row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ProfileRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Calorie Target")]
    pub calorie_target: String,
    #[tabled(rename = "Dietary Notes")]
    pub dietary_notes: String,
    #[tabled(rename = "Id")]
    pub id: String,
}

impl ProfileRow {
    fn new(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            calorie_target: profile
                .daily_calorie_target
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            dietary_notes: profile.dietary_notes.clone().unwrap_or_else(|| "-".to_string()),
            id: profile.id.to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: SessionAction) -> Result<()> {
    let sessions = SessionStore::new(ctx.kv_store());

    match action {
        SessionAction::Show => show(ctx, &sessions).await,
        SessionAction::Set {
            name,
            calorie_target,
            notes,
        } => set(ctx, &sessions, name, calorie_target, notes).await,
        SessionAction::Clear => clear(ctx, &sessions).await,
    }
}

async fn show(ctx: &Context, sessions: &SessionStore) -> Result<()> {
    match sessions.load().await? {
        Some(profile) => print_single(&ProfileRow::new(&profile), ctx.format)?,
        None => print_info("No stored session.", ctx.quiet),
    }
    Ok(())
}

async fn set(
    ctx: &Context,
    sessions: &SessionStore,
    name: String,
    calorie_target: Option<i32>,
    notes: Option<String>,
) -> Result<()> {
    // Update in place when a profile exists, keeping its id
    let mut profile = match sessions.load().await? {
        Some(existing) => existing,
        None => UserProfile::new(name.clone()),
    };

    profile.name = name;
    if calorie_target.is_some() {
        profile.daily_calorie_target = calorie_target;
    }
    if notes.is_some() {
        profile.dietary_notes = notes;
    }

    sessions.save(&profile).await?;
    print_success(&format!("Saved profile for {}", profile.name), ctx.quiet);
    Ok(())
}

async fn clear(ctx: &Context, sessions: &SessionStore) -> Result<()> {
    sessions.clear().await?;
    print_success("Session cleared", ctx.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_row_fills_missing_fields() {
        let profile = UserProfile::new("Dana");
        let row = ProfileRow::new(&profile);

        assert_eq!(row.name, "Dana");
        assert_eq!(row.calorie_target, "-");
        assert_eq!(row.dietary_notes, "-");
        assert!(!row.id.is_empty());
    }

    #[test]
    fn test_profile_row_with_all_fields() {
        let profile = UserProfile::new("Dana")
            .with_calorie_target(2200)
            .with_dietary_notes("vegetarian");
        let row = ProfileRow::new(&profile);

        assert_eq!(row.calorie_target, "2200");
        assert_eq!(row.dietary_notes, "vegetarian");
    }
}
