//! Generic keyed-record storage.
//!
//! Records are JSON objects keyed by their `id` field. Each [`Collection`] is
//! declared up front with the secondary indices it supports; lookups on any
//! other field are rejected rather than silently scanned.

use std::fmt;

use serde_json::Value;

use crate::error::StoreError;

/// Field every record is keyed by.
pub const KEY_PATH: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Logs,
    Workouts,
    BodyChecks,
    SavedFoods,
    DailyStats,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Logs,
        Collection::Workouts,
        Collection::BodyChecks,
        Collection::SavedFoods,
        Collection::DailyStats,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Logs => "logs",
            Collection::Workouts => "workouts",
            Collection::BodyChecks => "body_checks",
            Collection::SavedFoods => "saved_foods",
            Collection::DailyStats => "daily_stats",
        }
    }

    /// Secondary indices declared for this collection.
    #[must_use]
    pub fn indices(self) -> &'static [Index] {
        match self {
            Collection::Users => &[],
            Collection::Logs | Collection::Workouts | Collection::BodyChecks => {
                &[Index::UserId, Index::Date]
            }
            Collection::SavedFoods | Collection::DailyStats => &[Index::UserId],
        }
    }

    #[must_use]
    pub fn has_index(self, index: Index) -> bool {
        self.indices().contains(&index)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    UserId,
    Date,
}

impl Index {
    /// Record field the index is built over.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Index::UserId => "userId",
            Index::Date => "date",
        }
    }
}

/// Equality lookup on a declared secondary index.
#[derive(Debug, Clone, Copy)]
pub struct IndexQuery<'a> {
    pub index: Index,
    pub value: &'a str,
}

impl<'a> IndexQuery<'a> {
    #[must_use]
    pub fn user(user_id: &'a str) -> Self {
        Self {
            index: Index::UserId,
            value: user_id,
        }
    }

    #[must_use]
    pub fn date(date: &'a str) -> Self {
        Self {
            index: Index::Date,
            value: date,
        }
    }
}

/// Keyed-record persistence shared by the durable and in-memory backends.
///
/// Every mutating call is atomic on its own. No ordering or atomicity is
/// promised across calls, except inside [`EntityStore::replace_all`].
pub trait EntityStore: Send + Sync {
    /// All records in `collection`, or only those matching `index`, in
    /// insertion order. Overwriting a record keeps its original position.
    fn get_all(
        &self,
        collection: Collection,
        index: Option<IndexQuery<'_>>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert or overwrite `record` by its `id`.
    fn put(&self, collection: Collection, record: &Value) -> Result<(), StoreError>;

    /// Remove the record with `key`. Missing keys are not an error.
    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    fn clear(&self, collection: Collection) -> Result<(), StoreError>;

    /// Clear each listed collection and write its records, all or nothing.
    fn replace_all(&self, contents: &[(Collection, Vec<Value>)]) -> Result<(), StoreError>;

    /// Whether writes survive the process.
    fn is_durable(&self) -> bool;
}

pub(crate) fn record_key(collection: Collection, record: &Value) -> Result<&str, StoreError> {
    record
        .get(KEY_PATH)
        .and_then(Value::as_str)
        .ok_or(StoreError::MissingKey {
            collection: collection.name(),
        })
}

pub(crate) fn check_index(collection: Collection, index: Index) -> Result<(), StoreError> {
    if collection.has_index(index) {
        Ok(())
    } else {
        Err(StoreError::UnknownIndex {
            collection: collection.name(),
            index: index.field(),
        })
    }
}

/// Whether `record`'s indexed field equals `value`. Records lacking the field
/// are not part of the index.
pub(crate) fn index_matches(record: &Value, query: IndexQuery<'_>) -> bool {
    record.get(query.index.field()).and_then(Value::as_str) == Some(query.value)
}
