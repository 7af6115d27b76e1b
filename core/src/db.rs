use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, params};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{Collection, EntityStore, IndexQuery, check_index, record_key};

/// Storage schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`EntityStore`].
///
/// All collections share one `records` table holding each record as a JSON
/// body. Declared secondary indices are partial expression indexes over
/// `json_extract(body, '$.<field>')`, one per (collection, field).
pub struct Database {
    conn: Mutex<Connection>,
    durable: bool,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let unavailable = |source| StoreError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(unavailable)?;
        Self::migrate(&conn).map_err(|e| match e {
            StoreError::Sqlite(source) => unavailable(source),
            other => other,
        })?;
        debug!(path = %path.display(), "opened entity store");
        Ok(Database {
            conn: Mutex::new(conn),
            durable: true,
        })
    }

    /// A fresh SQLite database that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Database {
            conn: Mutex::new(conn),
            durable: false,
        })
    }

    fn migrate(conn: &Connection) -> Result<(), StoreError> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(StoreError::VersionConflict {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        if version < 1 {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS records (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    seq INTEGER NOT NULL,
                    PRIMARY KEY (collection, id)
                );

                CREATE INDEX IF NOT EXISTS idx_records_seq ON records(collection, seq);",
            )?;
            for collection in Collection::ALL {
                for index in collection.indices() {
                    let name = collection.name();
                    let field = index.field();
                    tx.execute_batch(&format!(
                        "CREATE INDEX IF NOT EXISTS idx_{name}_{field}
                         ON records(json_extract(body, '$.{field}'))
                         WHERE collection = '{name}';"
                    ))?;
                }
            }
            tx.execute_batch("PRAGMA user_version = 1;")?;
            tx.commit()?;
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // New records go to the end of their collection; an overwrite keeps the
    // original seq. Sequences are per collection so `idx_records_seq` serves MAX.
    fn upsert(conn: &Connection, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let key = record_key(collection, record)?;
        let body = serde_json::to_string(record)?;
        conn.execute(
            "INSERT INTO records (collection, id, body, seq)
             VALUES (?1, ?2, ?3,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM records WHERE collection = ?1))
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
            params![collection.name(), key, body],
        )?;
        Ok(())
    }

    fn decode_bodies(bodies: Vec<String>) -> Result<Vec<Value>, StoreError> {
        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StoreError::from))
            .collect()
    }
}

impl EntityStore for Database {
    fn get_all(
        &self,
        collection: Collection,
        index: Option<IndexQuery<'_>>,
    ) -> Result<Vec<Value>, StoreError> {
        let conn = self.lock()?;
        let bodies: Vec<String> = if let Some(query) = index {
            check_index(collection, query.index)?;
            // Literal collection name and expression so the partial index applies.
            let sql = format!(
                "SELECT body FROM records
                 WHERE collection = '{name}' AND json_extract(body, '$.{field}') = ?1
                 ORDER BY seq",
                name = collection.name(),
                field = query.index.field(),
            );
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params![query.value], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt =
                conn.prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY seq")?;
            stmt.query_map(params![collection.name()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        drop(conn);
        Self::decode_bodies(bodies)
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::upsert(&tx, collection, record)?;
        tx.commit()?;
        debug!(%collection, "put record");
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection.name(), key],
        )?;
        tx.commit()?;
        debug!(%collection, key, removed = rows > 0, "delete record");
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM records WHERE collection = ?1",
            params![collection.name()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn replace_all(&self, contents: &[(Collection, Vec<Value>)]) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for (collection, records) in contents {
            tx.execute(
                "DELETE FROM records WHERE collection = ?1",
                params![collection.name()],
            )?;
            for record in records {
                Self::upsert(&tx, *collection, record)?;
            }
        }
        // Dropping `tx` on an early return rolls everything back.
        tx.commit()?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        self.durable
    }
}
