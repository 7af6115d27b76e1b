//! Whole-store snapshot export and restore.
//!
//! A snapshot is one JSON document: a `version`, the flat `users` list, and
//! for every other collection a map of user id to that user's records (with
//! `userId` stripped). Older snapshots are upgraded by replaying
//! [`MIGRATIONS`] before decoding.
//!
//! | version | shape |
//! |---------|-------|
//! | 1 | key-value era; optional collections may be missing, no `dailyStats` |
//! | 2 | adds `dailyStats`, whose records may lack their composite `id` |
//! | 3 | current; every grouped collection present, daily stats keyed |

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::collections::{USER_ID_FIELD, attach_user, detach_user};
use crate::error::StoreError;
use crate::models::{
    BodyCheckItem, DailyStats, FoodLogItem, ImportSummary, SavedFoodItem, UserProfile,
    WorkoutLogItem,
};
use crate::store::{Collection, EntityStore};

pub const BACKUP_VERSION: u32 = 3;

/// Snapshot keys of the per-user grouped collections.
pub const GROUPED_KEYS: [(&str, Collection); 5] = [
    ("logs", Collection::Logs),
    ("workouts", Collection::Workouts),
    ("bodyChecks", Collection::BodyChecks),
    ("savedFoods", Collection::SavedFoods),
    ("dailyStats", Collection::DailyStats),
];

type Grouped<T> = BTreeMap<String, Vec<T>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
    pub users: Vec<UserProfile>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Grouped<FoodLogItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub workouts: Grouped<WorkoutLogItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_checks: Grouped<BodyCheckItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saved_foods: Grouped<SavedFoodItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_stats: Grouped<DailyStats>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Export ---

fn group_by_user<T: serde::de::DeserializeOwned>(
    store: &dyn EntityStore,
    collection: Collection,
) -> Result<Grouped<T>> {
    let mut grouped: Grouped<T> = BTreeMap::new();
    let records = store
        .get_all(collection, None)
        .with_context(|| format!("Failed to read {collection} for export"))?;
    for record in records {
        let Some(user_id) = record.get(USER_ID_FIELD).and_then(Value::as_str) else {
            warn!(%collection, id = ?record.get("id"), "skipping record without owner");
            continue;
        };
        let user_id = user_id.to_string();
        let item = detach_user(record)
            .with_context(|| format!("Failed to decode {collection} record for export"))?;
        grouped.entry(user_id).or_default().push(item);
    }
    Ok(grouped)
}

pub fn export_snapshot(store: &dyn EntityStore) -> Result<Backup> {
    let users = store
        .get_all(Collection::Users, None)
        .context("Failed to read profiles for export")?
        .into_iter()
        .map(|v| Ok(serde_json::from_value(v)?))
        .collect::<Result<Vec<UserProfile>>>()?;

    let backup = Backup {
        version: BACKUP_VERSION,
        exported_at: Some(Local::now().to_rfc3339()),
        users,
        logs: group_by_user(store, Collection::Logs)?,
        workouts: group_by_user(store, Collection::Workouts)?,
        body_checks: group_by_user(store, Collection::BodyChecks)?,
        saved_foods: group_by_user(store, Collection::SavedFoods)?,
        daily_stats: group_by_user(store, Collection::DailyStats)?,
    };
    info!(users = backup.users.len(), "exported snapshot");
    Ok(backup)
}

/// Export the whole store as a pretty-printed JSON document.
pub fn export_json(store: &dyn EntityStore) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export_snapshot(store)?)?)
}

// --- Migrations ---

type Migration = fn(Map<String, Value>) -> Result<Map<String, Value>, StoreError>;

/// `(from_version, step)`; each step yields the shape of `from_version + 1`.
pub const MIGRATIONS: &[(u32, Migration)] = &[(1, v1_to_v2), (2, v2_to_v3)];

/// Give every grouped collection a map, even if the old snapshot had none.
pub fn v1_to_v2(mut doc: Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    for (key, _) in GROUPED_KEYS {
        match doc.get(key) {
            None | Some(Value::Null) => {
                doc.insert(key.to_string(), Value::Object(Map::new()));
            }
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(StoreError::invalid_backup(format!(
                    "'{key}' must be an object keyed by user id"
                )));
            }
        }
    }
    Ok(doc)
}

/// Fill in composite ids for daily stats written before they were keyed.
pub fn v2_to_v3(mut doc: Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    let Some(Value::Object(by_user)) = doc.get_mut("dailyStats") else {
        return Ok(doc);
    };
    for (user_id, records) in by_user.iter_mut() {
        let Value::Array(records) = records else {
            return Err(StoreError::invalid_backup(format!(
                "dailyStats for '{user_id}' must be a list"
            )));
        };
        for record in records {
            let Value::Object(fields) = record else {
                continue;
            };
            let has_id = fields
                .get("id")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if has_id {
                continue;
            }
            if let Some(date) = fields.get("date").and_then(Value::as_str) {
                let id = format!("{user_id}_{date}");
                fields.insert("id".to_string(), Value::String(id));
            }
        }
    }
    Ok(doc)
}

/// Check the envelope and replay migrations up to [`BACKUP_VERSION`].
///
/// Returns the migrated document and the version it started at.
pub fn migrate(raw: Value) -> Result<(Value, u32), StoreError> {
    let Value::Object(mut doc) = raw else {
        return Err(StoreError::invalid_backup("top level must be a JSON object"));
    };
    if !doc.get("users").is_some_and(Value::is_array) {
        return Err(StoreError::invalid_backup("missing 'users' list"));
    }

    let source_version = match doc.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| StoreError::invalid_backup(format!("unrecognized version {v}")))?,
    };
    if source_version > BACKUP_VERSION {
        return Err(StoreError::invalid_backup(format!(
            "version {source_version} is newer than supported version {BACKUP_VERSION}"
        )));
    }

    let mut version = source_version;
    for (from, step) in MIGRATIONS {
        if version == *from {
            doc = step(doc)?;
            version += 1;
        }
    }
    doc.insert("version".to_string(), Value::from(version));
    Ok((Value::Object(doc), source_version))
}

// --- Restore ---

fn attach_grouped<T: Serialize>(grouped: &Grouped<T>) -> Result<Vec<Value>> {
    let mut records = Vec::new();
    for (user_id, items) in grouped {
        for item in items {
            records.push(attach_user(item, user_id)?);
        }
    }
    Ok(records)
}

/// Decode a snapshot into the records each collection should hold.
pub fn decode(text: &str) -> Result<(Vec<(Collection, Vec<Value>)>, ImportSummary)> {
    let raw: Value = serde_json::from_str(text)
        .map_err(|e| StoreError::invalid_backup(format!("not valid JSON: {e}")))?;
    let (migrated, source_version) = migrate(raw)?;
    let mut backup: Backup = serde_json::from_value(migrated)
        .map_err(|e| StoreError::invalid_backup(e.to_string()))?;

    for (user_id, stats) in &mut backup.daily_stats {
        for s in stats.iter_mut().filter(|s| s.id.is_empty()) {
            s.id = DailyStats::composite_id(user_id, s.date);
        }
    }

    let summary = ImportSummary {
        users_imported: backup.users.len(),
        food_logs_imported: backup.logs.values().map(Vec::len).sum(),
        workouts_imported: backup.workouts.values().map(Vec::len).sum(),
        body_checks_imported: backup.body_checks.values().map(Vec::len).sum(),
        saved_foods_imported: backup.saved_foods.values().map(Vec::len).sum(),
        daily_stats_imported: backup.daily_stats.values().map(Vec::len).sum(),
        source_version,
    };

    let users = backup
        .users
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    let contents = vec![
        (Collection::Users, users),
        (Collection::Logs, attach_grouped(&backup.logs)?),
        (Collection::Workouts, attach_grouped(&backup.workouts)?),
        (Collection::BodyChecks, attach_grouped(&backup.body_checks)?),
        (Collection::SavedFoods, attach_grouped(&backup.saved_foods)?),
        (Collection::DailyStats, attach_grouped(&backup.daily_stats)?),
    ];
    Ok((contents, summary))
}

/// Replace the whole store with the snapshot in `text`.
///
/// Everything is decoded before the store is touched, and the replacement is
/// a single [`EntityStore::replace_all`], so a failed restore leaves the
/// previous contents in place.
pub fn restore_json(store: &dyn EntityStore, text: &str) -> Result<ImportSummary> {
    let (contents, summary) = decode(text)?;
    store
        .replace_all(&contents)
        .context("Failed to write restored records")?;
    info!(
        users = summary.users_imported,
        logs = summary.food_logs_imported,
        source_version = summary.source_version,
        "restored snapshot"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Collections;
    use crate::db::Database;
    use crate::memory::MemoryStore;
    use crate::models::{ActivityLevel, Gender, Goal, Macros, NewSavedFood};
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: format!("User {id}"),
            avatar: None,
            height: 175.0,
            weight: 72.5,
            age: 33,
            gender: Gender::Male,
            activity_level: ActivityLevel::Light,
            goal: Goal::Bulk,
            tdee: 2400,
            target_calories: 2700,
        }
    }

    fn populate(store: &dyn EntityStore) {
        let api = Collections::new(store);
        for user in ["u1", "u2"] {
            api.put_profile(&profile(user)).unwrap();
            api.add_food_log(
                user,
                &FoodLogItem {
                    id: format!("{user}-log"),
                    name: "Porridge".to_string(),
                    macros: Macros {
                        calories: 300.0,
                        protein: 10.0,
                        carbs: 50.0,
                        fat: 6.0,
                    },
                    timestamp: 1_718_409_600_000,
                    date: date("2024-06-15"),
                    image: Some("data:image/jpeg;base64,AAAA".to_string()),
                    ingredients: None,
                },
            )
            .unwrap();
            api.add_workout(
                user,
                &WorkoutLogItem {
                    id: format!("{user}-w"),
                    exercise: "Bench".to_string(),
                    sets: 3,
                    reps: 8,
                    weight: 60.0,
                    date: date("2024-06-15"),
                    tags: vec!["chest".to_string()],
                    timestamp: 0,
                },
            )
            .unwrap();
            api.add_body_check(
                user,
                &BodyCheckItem {
                    id: format!("{user}-b"),
                    date: date("2024-06-15"),
                    image: "data:image/jpeg;base64,BBBB".to_string(),
                    note: None,
                    timestamp: 0,
                },
            )
            .unwrap();
            api.save_food(
                user,
                &NewSavedFood {
                    name: "Porridge".to_string(),
                    macros: Macros::default(),
                },
            )
            .unwrap();
            api.put_daily_stats(
                user,
                &DailyStats {
                    id: String::new(),
                    date: date("2024-06-15"),
                    weight: Some(72.5),
                    body_fat: Some(18.0),
                    note: None,
                },
            )
            .unwrap();
        }
    }

    fn snapshot_without_timestamp(store: &dyn EntityStore) -> Backup {
        Backup {
            exported_at: None,
            ..export_snapshot(store).unwrap()
        }
    }

    fn invalid_backup(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidBackup(_))
        )
    }

    #[test]
    fn test_export_empty_store() {
        let db = Database::open_in_memory().unwrap();
        let text = export_json(&db).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], BACKUP_VERSION);
        assert_eq!(value["users"], json!([]));
        assert_eq!(value["dailyStats"], json!({}));
        assert_eq!(value["bodyChecks"], json!({}));
    }

    #[test]
    fn test_export_groups_by_user_and_strips_owner() {
        let db = Database::open_in_memory().unwrap();
        populate(&db);
        let value: Value = serde_json::from_str(&export_json(&db).unwrap()).unwrap();
        assert_eq!(value["users"].as_array().unwrap().len(), 2);
        let u1_logs = value["logs"]["u1"].as_array().unwrap();
        assert_eq!(u1_logs.len(), 1);
        assert_eq!(u1_logs[0]["id"], "u1-log");
        assert!(u1_logs[0].get("userId").is_none());
        assert_eq!(value["dailyStats"]["u2"][0]["id"], "u2_2024-06-15");
    }

    #[test]
    fn test_roundtrip_into_empty_store() {
        let source = Database::open_in_memory().unwrap();
        populate(&source);
        let text = export_json(&source).unwrap();

        let target = Database::open_in_memory().unwrap();
        let summary = restore_json(&target, &text).unwrap();
        assert_eq!(summary.users_imported, 2);
        assert_eq!(summary.food_logs_imported, 2);
        assert_eq!(summary.daily_stats_imported, 2);
        assert_eq!(summary.source_version, BACKUP_VERSION);

        assert_eq!(
            snapshot_without_timestamp(&source),
            snapshot_without_timestamp(&target)
        );
        let api = Collections::new(&target);
        assert_eq!(api.list_food_logs("u1").unwrap()[0].id, "u1-log");
    }

    #[test]
    fn test_roundtrip_replaces_populated_store() {
        let source = Database::open_in_memory().unwrap();
        populate(&source);
        let text = export_json(&source).unwrap();

        let target = MemoryStore::new();
        let api = Collections::new(&target);
        api.put_profile(&profile("stale")).unwrap();
        api.add_food_log(
            "stale",
            &FoodLogItem {
                id: "stale-log".to_string(),
                name: "Old".to_string(),
                macros: Macros::default(),
                timestamp: 0,
                date: date("2020-01-01"),
                image: None,
                ingredients: None,
            },
        )
        .unwrap();

        restore_json(&target, &text).unwrap();
        assert!(api.get_profile("stale").unwrap().is_none());
        assert!(api.list_food_logs("stale").unwrap().is_empty());
        assert_eq!(
            snapshot_without_timestamp(&source),
            snapshot_without_timestamp(&target)
        );
    }

    #[test]
    fn test_restore_requires_users() {
        let db = Database::open_in_memory().unwrap();
        let err = restore_json(&db, r#"{ "version": 3, "logs": {} }"#).unwrap_err();
        assert!(invalid_backup(&err));
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let db = Database::open_in_memory().unwrap();
        assert!(invalid_backup(&restore_json(&db, "not json").unwrap_err()));
        assert!(invalid_backup(&restore_json(&db, "[1, 2]").unwrap_err()));
        assert!(invalid_backup(
            &restore_json(&db, r#"{ "version": "x", "users": [] }"#).unwrap_err()
        ));
    }

    #[test]
    fn test_restore_rejects_newer_version() {
        let db = Database::open_in_memory().unwrap();
        let err = restore_json(&db, r#"{ "version": 99, "users": [] }"#).unwrap_err();
        assert!(invalid_backup(&err));
    }

    #[test]
    fn test_restore_without_daily_stats_key() {
        let db = Database::open_in_memory().unwrap();
        populate(&db);
        let doc = json!({
            "version": 2,
            "users": [profile("u1")],
            "logs": {},
            "workouts": {},
            "bodyChecks": {},
            "savedFoods": {}
        });
        restore_json(&db, &doc.to_string()).unwrap();
        let api = Collections::new(&db);
        assert!(api.list_daily_stats("u1").unwrap().is_empty());
        assert!(api.list_daily_stats("u2").unwrap().is_empty());
    }

    #[test]
    fn test_restore_v1_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let doc = json!({
            "users": [profile("u1")],
            "logs": {
                "u1": [{
                    "id": "abc1234",
                    "name": "Toast",
                    "calories": 120,
                    "protein": 4,
                    "carbs": 20,
                    "fat": 2,
                    "timestamp": 1_700_000_000_000_i64,
                    "date": "2023-11-14"
                }]
            },
            "workouts": null
        });
        let summary = restore_json(&db, &doc.to_string()).unwrap();
        assert_eq!(summary.source_version, 1);
        assert_eq!(summary.food_logs_imported, 1);

        let api = Collections::new(&db);
        let logs = api.list_food_logs("u1").unwrap();
        assert_eq!(logs[0].name, "Toast");
        assert!((logs[0].macros.calories - 120.0).abs() < 0.01);
        assert!(api.list_workouts("u1").unwrap().is_empty());
        assert!(api.list_daily_stats("u1").unwrap().is_empty());
    }

    #[test]
    fn test_restore_v2_regenerates_daily_stats_ids() {
        let db = Database::open_in_memory().unwrap();
        let doc = json!({
            "version": 2,
            "users": [profile("u1")],
            "logs": {},
            "dailyStats": {
                "u1": [
                    { "date": "2024-06-14", "weight": 73.0 },
                    { "id": "", "date": "2024-06-15", "note": "rest day" }
                ]
            }
        });
        restore_json(&db, &doc.to_string()).unwrap();
        let stats = Collections::new(&db).list_daily_stats("u1").unwrap();
        let ids: Vec<&str> = stats.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["u1_2024-06-14", "u1_2024-06-15"]);
    }

    #[test]
    fn test_restore_tolerates_empty_collections() {
        let db = Database::open_in_memory().unwrap();
        let doc = json!({
            "version": 3,
            "users": [],
            "logs": {},
            "workouts": {},
            "bodyChecks": {},
            "savedFoods": {},
            "dailyStats": null
        });
        let summary = restore_json(&db, &doc.to_string()).unwrap();
        assert_eq!(summary, ImportSummary {
            source_version: 3,
            ..ImportSummary::default()
        });
    }

    #[test]
    fn test_failed_restore_keeps_existing_data() {
        let db = Database::open_in_memory().unwrap();
        populate(&db);
        let before = snapshot_without_timestamp(&db);

        // The log is missing its date, so decoding fails after users parse fine.
        let doc = json!({
            "version": 3,
            "users": [profile("new")],
            "logs": { "new": [{ "id": "x", "name": "Bad", "calories": 1,
                                "protein": 0, "carbs": 0, "fat": 0 }] }
        });
        let err = restore_json(&db, &doc.to_string()).unwrap_err();
        assert!(invalid_backup(&err));
        assert_eq!(before, snapshot_without_timestamp(&db));
    }

    #[test]
    fn test_v1_to_v2_adds_missing_collections() {
        let Value::Object(doc) = json!({ "users": [], "logs": { "u1": [] } }) else {
            unreachable!()
        };
        let upgraded = v1_to_v2(doc).unwrap();
        for (key, _) in GROUPED_KEYS {
            assert!(upgraded[key].is_object(), "{key} should be an object");
        }
        assert_eq!(upgraded["logs"], json!({ "u1": [] }));
    }

    #[test]
    fn test_v1_to_v2_rejects_wrong_shape() {
        let Value::Object(doc) = json!({ "users": [], "logs": [] }) else {
            unreachable!()
        };
        assert!(matches!(v1_to_v2(doc), Err(StoreError::InvalidBackup(_))));
    }

    #[test]
    fn test_migrate_reports_source_version() {
        let (doc, from) = migrate(json!({ "version": 1, "users": [] })).unwrap();
        assert_eq!(from, 1);
        assert_eq!(doc["version"], BACKUP_VERSION);
        assert_eq!(doc["dailyStats"], json!({}));
    }
}
