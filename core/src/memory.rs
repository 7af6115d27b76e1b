use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::error::StoreError;
use crate::store::{Collection, EntityStore, IndexQuery, check_index, index_matches, record_key};

/// Non-durable [`EntityStore`] used when the database cannot be opened.
///
/// Each collection is a vector in insertion order; lookups are linear scans.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Collection, Vec<Value>>>, StoreError> {
        self.collections.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn upsert(records: &mut Vec<Value>, key: &str, record: &Value) {
        let existing = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(key));
        match existing {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
    }
}

impl EntityStore for MemoryStore {
    fn get_all(
        &self,
        collection: Collection,
        index: Option<IndexQuery<'_>>,
    ) -> Result<Vec<Value>, StoreError> {
        if let Some(query) = index {
            check_index(collection, query.index)?;
        }
        let collections = self.lock()?;
        let Some(records) = collections.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .filter(|r| index.is_none_or(|q| index_matches(r, q)))
            .cloned()
            .collect())
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let key = record_key(collection, record)?;
        let mut collections = self.lock()?;
        Self::upsert(collections.entry(collection).or_default(), key, record);
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        if let Some(records) = collections.get_mut(&collection) {
            records.retain(|r| r.get("id").and_then(Value::as_str) != Some(key));
        }
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.lock()?.remove(&collection);
        Ok(())
    }

    fn replace_all(&self, contents: &[(Collection, Vec<Value>)]) -> Result<(), StoreError> {
        // Build every replacement first so a bad record leaves the store untouched.
        let mut staged = Vec::with_capacity(contents.len());
        for (collection, records) in contents {
            let mut fresh = Vec::with_capacity(records.len());
            for record in records {
                let key = record_key(*collection, record)?;
                Self::upsert(&mut fresh, key, record);
            }
            staged.push((*collection, fresh));
        }

        let mut collections = self.lock()?;
        for (collection, fresh) in staged {
            collections.insert(collection, fresh);
        }
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
