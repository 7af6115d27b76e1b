//! Typed, per-user access to the entity store.
//!
//! Writes attach the owning `userId` to each record and reads strip it again;
//! the only other rule here is the composite key for daily stats and the
//! merge-on-name behaviour of the saved-food cache.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    BodyCheckItem, DailyStats, FoodLogItem, NewSavedFood, SavedFoodItem, UserProfile,
    WorkoutLogItem,
};
use crate::store::{Collection, EntityStore, IndexQuery, record_key};

pub const USER_ID_FIELD: &str = "userId";

#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serialize `item` and stamp it with its owner.
pub fn attach_user<T: Serialize>(item: &T, user_id: &str) -> Result<Value> {
    let mut value = serde_json::to_value(item)?;
    let Value::Object(map) = &mut value else {
        anyhow::bail!("record did not serialize to a JSON object");
    };
    map.insert(USER_ID_FIELD.to_string(), Value::String(user_id.to_string()));
    Ok(value)
}

/// Remove the owner stamp and decode.
pub fn detach_user<T: DeserializeOwned>(mut value: Value) -> Result<T> {
    if let Value::Object(map) = &mut value {
        map.remove(USER_ID_FIELD);
    }
    Ok(serde_json::from_value(value)?)
}

pub struct Collections<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> Collections<'a> {
    #[must_use]
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    fn list_owned<T: DeserializeOwned>(&self, collection: Collection, user_id: &str) -> Result<Vec<T>> {
        self.store
            .get_all(collection, Some(IndexQuery::user(user_id)))
            .with_context(|| format!("Failed to read {collection} for user {user_id}"))?
            .into_iter()
            .map(detach_user)
            .collect()
    }

    /// Records of one user on one day, read through the date index.
    fn list_owned_on<T: DeserializeOwned>(
        &self,
        collection: Collection,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<T>> {
        let day = date.format("%Y-%m-%d").to_string();
        self.store
            .get_all(collection, Some(IndexQuery::date(&day)))
            .with_context(|| format!("Failed to read {collection} for {day}"))?
            .into_iter()
            .filter(|r| r.get(USER_ID_FIELD).and_then(Value::as_str) == Some(user_id))
            .map(detach_user)
            .collect()
    }

    fn put_owned<T: Serialize>(&self, collection: Collection, user_id: &str, item: &T) -> Result<()> {
        let record = attach_user(item, user_id)?;
        self.store
            .put(collection, &record)
            .with_context(|| format!("Failed to write to {collection}"))?;
        Ok(())
    }

    fn delete_key(&self, collection: Collection, key: &str) -> Result<()> {
        self.store
            .delete(collection, key)
            .with_context(|| format!("Failed to delete from {collection}"))?;
        Ok(())
    }

    /// Delete `id` only if it belongs to `user_id`; otherwise a no-op.
    fn delete_owned(&self, collection: Collection, user_id: &str, id: &str) -> Result<()> {
        let owned = self
            .store
            .get_all(collection, Some(IndexQuery::user(user_id)))
            .with_context(|| format!("Failed to read {collection} for user {user_id}"))?
            .iter()
            .any(|r| record_key(collection, r).is_ok_and(|key| key == id));
        if !owned {
            return Ok(());
        }
        self.delete_key(collection, id)
    }

    // --- Profiles ---

    pub fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        self.store
            .get_all(Collection::Users, None)
            .context("Failed to read profiles")?
            .into_iter()
            .map(|v| Ok(serde_json::from_value(v)?))
            .collect()
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<UserProfile>> {
        Ok(self.list_profiles()?.into_iter().find(|p| p.id == id))
    }

    pub fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        let record = serde_json::to_value(profile)?;
        self.store
            .put(Collection::Users, &record)
            .context("Failed to save profile")?;
        Ok(())
    }

    /// Removes the profile only; the user's logs stay behind.
    pub fn delete_profile(&self, id: &str) -> Result<()> {
        self.delete_key(Collection::Users, id)
    }

    // --- Food logs ---

    pub fn list_food_logs(&self, user_id: &str) -> Result<Vec<FoodLogItem>> {
        self.list_owned(Collection::Logs, user_id)
    }

    pub fn list_food_logs_for_date(&self, user_id: &str, date: NaiveDate) -> Result<Vec<FoodLogItem>> {
        self.list_owned_on(Collection::Logs, user_id, date)
    }

    pub fn add_food_log(&self, user_id: &str, item: &FoodLogItem) -> Result<()> {
        self.put_owned(Collection::Logs, user_id, item)
    }

    pub fn update_food_log(&self, user_id: &str, item: &FoodLogItem) -> Result<()> {
        self.put_owned(Collection::Logs, user_id, item)
    }

    pub fn delete_food_log(&self, user_id: &str, id: &str) -> Result<()> {
        self.delete_owned(Collection::Logs, user_id, id)
    }

    // --- Workouts ---

    pub fn list_workouts(&self, user_id: &str) -> Result<Vec<WorkoutLogItem>> {
        self.list_owned(Collection::Workouts, user_id)
    }

    pub fn list_workouts_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<WorkoutLogItem>> {
        self.list_owned_on(Collection::Workouts, user_id, date)
    }

    pub fn add_workout(&self, user_id: &str, item: &WorkoutLogItem) -> Result<()> {
        self.put_owned(Collection::Workouts, user_id, item)
    }

    pub fn update_workout(&self, user_id: &str, item: &WorkoutLogItem) -> Result<()> {
        self.put_owned(Collection::Workouts, user_id, item)
    }

    pub fn delete_workout(&self, user_id: &str, id: &str) -> Result<()> {
        self.delete_owned(Collection::Workouts, user_id, id)
    }

    // --- Body checks ---

    pub fn list_body_checks(&self, user_id: &str) -> Result<Vec<BodyCheckItem>> {
        self.list_owned(Collection::BodyChecks, user_id)
    }

    pub fn add_body_check(&self, user_id: &str, item: &BodyCheckItem) -> Result<()> {
        self.put_owned(Collection::BodyChecks, user_id, item)
    }

    pub fn delete_body_check(&self, user_id: &str, id: &str) -> Result<()> {
        self.delete_owned(Collection::BodyChecks, user_id, id)
    }

    // --- Saved foods ---

    /// Most-used first.
    pub fn list_saved_foods(&self, user_id: &str) -> Result<Vec<SavedFoodItem>> {
        let mut foods: Vec<SavedFoodItem> = self.list_owned(Collection::SavedFoods, user_id)?;
        foods.sort_by(|a, b| b.times_used.cmp(&a.times_used));
        Ok(foods)
    }

    /// Remember a food. A case-insensitive name match takes the new macros and
    /// one more use; otherwise a new entry starts at one use.
    pub fn save_food(&self, user_id: &str, food: &NewSavedFood) -> Result<SavedFoodItem> {
        let wanted = food.name.to_lowercase();
        let existing = self
            .list_owned::<SavedFoodItem>(Collection::SavedFoods, user_id)?
            .into_iter()
            .find(|f| f.name.to_lowercase() == wanted);

        let item = match existing {
            Some(found) => SavedFoodItem {
                id: found.id,
                name: food.name.clone(),
                macros: food.macros,
                times_used: found.times_used.saturating_add(1),
            },
            None => SavedFoodItem {
                id: new_id(),
                name: food.name.clone(),
                macros: food.macros,
                times_used: 1,
            },
        };
        self.put_owned(Collection::SavedFoods, user_id, &item)?;
        Ok(item)
    }

    pub fn delete_saved_food(&self, user_id: &str, id: &str) -> Result<()> {
        self.delete_owned(Collection::SavedFoods, user_id, id)
    }

    // --- Daily stats ---

    pub fn list_daily_stats(&self, user_id: &str) -> Result<Vec<DailyStats>> {
        self.list_owned(Collection::DailyStats, user_id)
    }

    pub fn get_daily_stats(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyStats>> {
        let id = DailyStats::composite_id(user_id, date);
        Ok(self
            .list_daily_stats(user_id)?
            .into_iter()
            .find(|s| s.id == id))
    }

    /// Upsert the single stats record for (user, date). The id is always
    /// rebuilt from the pair, whatever the caller passed.
    pub fn put_daily_stats(&self, user_id: &str, stats: &DailyStats) -> Result<DailyStats> {
        let stats = DailyStats {
            id: DailyStats::composite_id(user_id, stats.date),
            ..stats.clone()
        };
        self.put_owned(Collection::DailyStats, user_id, &stats)?;
        Ok(stats)
    }

    pub fn delete_daily_stats(&self, user_id: &str, date: NaiveDate) -> Result<()> {
        self.delete_key(
            Collection::DailyStats,
            &DailyStats::composite_id(user_id, date),
        )
    }
}
