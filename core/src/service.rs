use std::path::Path;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::backup;
use crate::collections::{Collections, new_id};
use crate::db::Database;
use crate::energy::{self, Recalculation, SkipReason};
use crate::memory::MemoryStore;
use crate::models::{
    DailyStats, DailySummary, FoodEstimate, FoodEstimateRequest, FoodLogItem, ImportSummary,
    Macros, UserProfile, WorkoutLogItem, WorkoutSuggestion, validate_daily_stats, validate_food_log,
    validate_profile,
};
use crate::session::Session;
use crate::store::EntityStore;

/// External generative estimator for meals and workouts.
///
/// Every error is treated as recoverable: the service logs it and hands the
/// caller nothing, so the caller falls back to manual entry.
pub trait EstimationProvider: Send + Sync {
    fn estimate_food(&self, request: &FoodEstimateRequest) -> Result<FoodEstimate>;
    fn estimate_workout(&self, description: &str) -> Result<Vec<WorkoutSuggestion>>;
}

pub struct TrackerService {
    store: Box<dyn EntityStore>,
}

impl TrackerService {
    pub fn open(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self::with_store(Box::new(db)))
    }

    /// Open the durable store, or fall back to memory if it is unavailable.
    /// Check [`TrackerService::is_durable`] to tell the user.
    #[must_use]
    pub fn open_or_degrade(db_path: &Path) -> Self {
        match Database::open(db_path) {
            Ok(db) => Self::with_store(Box::new(db)),
            Err(e) => {
                warn!(error = %e, "entity store unavailable, changes will not be saved");
                Self::with_store(Box::new(MemoryStore::new()))
            }
        }
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::with_store(Box::new(Database::open_in_memory()?)))
    }

    #[must_use]
    pub fn with_store(store: Box<dyn EntityStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.store.is_durable()
    }

    #[must_use]
    pub fn collections(&self) -> Collections<'_> {
        Collections::new(self.store.as_ref())
    }

    // --- Profiles ---

    /// Validate, derive `tdee`/`target_calories` from the profile's own
    /// fields, and store it.
    pub fn save_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        validate_profile(&profile)?;
        let profile = energy::derive_targets(profile);
        self.collections().put_profile(&profile)?;
        Ok(profile)
    }

    pub fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        self.collections().list_profiles()
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<UserProfile>> {
        self.collections().get_profile(id)
    }

    pub fn delete_profile(&self, id: &str) -> Result<()> {
        self.collections().delete_profile(id)
    }

    /// The profile to auto-resume, if the session names one that still exists.
    pub fn resume_session(&self, session: &Session) -> Result<Option<UserProfile>> {
        let Some(user_id) = session.current_user_id.as_deref() else {
            return Ok(None);
        };
        let profile = self.get_profile(user_id)?;
        if profile.is_none() {
            warn!(user_id, "session points at a missing profile");
        }
        Ok(profile)
    }

    // --- Food logs ---

    pub fn log_food(&self, user_id: &str, item: &FoodLogItem) -> Result<()> {
        validate_food_log(item)?;
        self.collections().add_food_log(user_id, item)
    }

    pub fn update_food_log(&self, user_id: &str, item: &FoodLogItem) -> Result<()> {
        validate_food_log(item)?;
        self.collections().update_food_log(user_id, item)
    }

    // --- Daily stats ---

    /// Store the day's stats, then move the live profile if a new weight was
    /// logged for `today`.
    ///
    /// The two writes are separate; if the second fails the stats are kept
    /// and the profile is stale until the next save.
    pub fn save_daily_stats(
        &self,
        user_id: &str,
        stats: &DailyStats,
        today: NaiveDate,
    ) -> Result<(DailyStats, Recalculation)> {
        validate_daily_stats(stats)?;
        let api = self.collections();
        let stored = api.put_daily_stats(user_id, stats)?;

        let Some(profile) = api.get_profile(user_id)? else {
            return Ok((stored, Recalculation::Skipped(SkipReason::ProfileMissing)));
        };
        let outcome = energy::recalculate_for_stats(&profile, &stored, today);
        if let Recalculation::Updated(updated) = &outcome {
            api.put_profile(updated)?;
            info!(
                user_id,
                weight = updated.weight,
                tdee = updated.tdee,
                target_calories = updated.target_calories,
                "recalculated energy targets"
            );
        }
        Ok((stored, outcome))
    }

    pub fn save_daily_stats_today(
        &self,
        user_id: &str,
        stats: &DailyStats,
    ) -> Result<(DailyStats, Recalculation)> {
        self.save_daily_stats(user_id, stats, Local::now().date_naive())
    }

    // --- Dashboard ---

    pub fn daily_summary(&self, user_id: &str, date: NaiveDate) -> Result<DailySummary> {
        let api = self.collections();
        let Some(profile) = api.get_profile(user_id)? else {
            bail!("Profile not found: {user_id}");
        };
        let food_logs = api.list_food_logs_for_date(user_id, date)?;
        let workouts = api.list_workouts_for_date(user_id, date)?;
        let stats = api.get_daily_stats(user_id, date)?;

        let consumed = Macros::sum(food_logs.iter().map(|l| &l.macros));
        #[allow(clippy::cast_precision_loss)]
        let remaining_calories = profile.target_calories as f64 - consumed.calories;
        Ok(DailySummary {
            date,
            consumed,
            target_calories: profile.target_calories,
            remaining_calories,
            food_logs,
            workouts,
            stats,
        })
    }

    // --- Estimation ---

    /// Ask the estimator for a food log draft. Nothing is stored; `None` means
    /// the estimator failed and the caller should ask for manual entry.
    #[allow(clippy::unused_self)]
    pub fn estimate_food_log(
        &self,
        provider: &dyn EstimationProvider,
        request: &FoodEstimateRequest,
        date: NaiveDate,
    ) -> Option<FoodLogItem> {
        let estimate = match provider.estimate_food(request) {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "food estimation failed");
                return None;
            }
        };
        let ingredients = (!estimate.ingredients.is_empty()).then_some(estimate.ingredients);
        let draft = FoodLogItem {
            id: new_id(),
            name: estimate.name,
            macros: estimate.macros,
            timestamp: Utc::now().timestamp_millis(),
            date,
            image: request.image.clone(),
            ingredients,
        }
        .totals_from_ingredients();
        Some(draft)
    }

    /// Workout drafts for `date`, or `None` if the estimator failed.
    #[allow(clippy::unused_self)]
    pub fn estimate_workouts(
        &self,
        provider: &dyn EstimationProvider,
        description: &str,
        date: NaiveDate,
    ) -> Option<Vec<WorkoutLogItem>> {
        match provider.estimate_workout(description) {
            Ok(suggestions) => Some(
                suggestions
                    .into_iter()
                    .map(|s| WorkoutLogItem {
                        id: new_id(),
                        exercise: s.exercise,
                        sets: s.sets,
                        reps: s.reps,
                        weight: s.weight,
                        date,
                        tags: s.tags,
                        timestamp: Utc::now().timestamp_millis(),
                    })
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "workout estimation failed");
                None
            }
        }
    }

    // --- Backup ---

    pub fn export_json(&self) -> Result<String> {
        backup::export_json(self.store.as_ref())
    }

    pub fn restore_json(&self, text: &str) -> Result<ImportSummary> {
        backup::restore_json(self.store.as_ref(), text)
    }
}
