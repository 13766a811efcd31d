use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info};

use crate::{DocPath, DocumentStore, MAX_TXN_ATTEMPTS, StoreError, TxnSnapshot, TxnVerdict};

/// Local document store backend: one row per document with a version
/// counter, conditional writes via `UPDATE ... WHERE version = ?`.
///
/// Within one process the connection mutex serializes commits; the version
/// check is what keeps separate processes sharing the file honest.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(&conn)?;
        info!("Document store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                path    TEXT PRIMARY KEY,
                body    TEXT NOT NULL,
                version INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Backend("connection lock poisoned".into()))?;
        f(&conn)
    }

    fn read_row(&self, path: &DocPath) -> Result<Option<(u64, Value)>, StoreError> {
        self.with_conn(|conn| {
            let row: Option<(u64, String)> = conn
                .query_row(
                    "SELECT version, body FROM documents WHERE path = ?1",
                    [path.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match row {
                Some((version, body)) => Ok(Some((version, serde_json::from_str(&body)?))),
                None => Ok(None),
            }
        })
    }

    /// Compare-and-set commit. Returns false when the document moved on
    /// from `seen_version` and the attempt must be retried.
    fn try_commit(
        &self,
        path: &DocPath,
        seen_version: Option<u64>,
        next: &Value,
    ) -> Result<bool, StoreError> {
        let body = serde_json::to_string(next)?;
        self.with_conn(|conn| {
            let changed = match seen_version {
                Some(version) => conn.execute(
                    "UPDATE documents SET body = ?1, version = version + 1
                     WHERE path = ?2 AND version = ?3",
                    params![body, path.as_str(), version],
                )?,
                None => conn.execute(
                    "INSERT INTO documents (path, body, version) VALUES (?1, ?2, 1)
                     ON CONFLICT(path) DO NOTHING",
                    params![path.as_str(), body],
                )?,
            };
            Ok(changed == 1)
        })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl DocumentStore for SqliteStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        Ok(self.read_row(path)?.map(|(_, body)| body))
    }

    async fn run_atomic<A, F>(&self, path: &DocPath, mut apply: F) -> Result<Option<A>, StoreError>
    where
        A: Send,
        F: FnMut(TxnSnapshot) -> TxnVerdict<A> + Send,
    {
        for attempt in 1..=MAX_TXN_ATTEMPTS {
            let row = self.read_row(path)?;
            let (seen_version, doc) = match row {
                Some((version, body)) => (Some(version), Some(body)),
                None => (None, None),
            };
            let verdict = apply(TxnSnapshot {
                doc,
                server_time: Utc::now(),
            });
            match verdict {
                TxnVerdict::Abort(reason) => return Ok(Some(reason)),
                TxnVerdict::Commit(next) => {
                    if self.try_commit(path, seen_version, &next)? {
                        return Ok(None);
                    }
                    debug!(path = %path, attempt, "conditional write lost the race, retrying");
                }
            }
        }
        Err(StoreError::Contention {
            attempts: MAX_TXN_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> DocPath {
        DocPath::new("grids", "g1")
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let outcome: Option<()> = store
            .run_atomic(&path(), |snap| {
                assert!(snap.doc.is_none());
                TxnVerdict::Commit(json!({"teamA": "Chiefs"}))
            })
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            store.get(&path()).await.unwrap(),
            Some(json!({"teamA": "Chiefs"}))
        );
    }

    #[tokio::test]
    async fn test_update_sees_previous_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        for _ in 0..3 {
            let _: Option<()> = store
                .run_atomic(&path(), |snap| {
                    let n = snap.doc.as_ref().and_then(|d| d["n"].as_i64()).unwrap_or(0);
                    TxnVerdict::Commit(json!({"n": n + 1}))
                })
                .await
                .unwrap();
        }
        assert_eq!(store.get(&path()).await.unwrap(), Some(json!({"n": 3})));
    }

    #[tokio::test]
    async fn test_abort_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let outcome = store
            .run_atomic(&path(), |_| TxnVerdict::Abort::<&str>("locked"))
            .await
            .unwrap();
        assert_eq!(outcome, Some("locked"));
        assert!(store.get(&path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_column_tracks_commits() {
        let store = SqliteStore::open_in_memory().unwrap();
        for _ in 0..2 {
            let _: Option<()> = store
                .run_atomic(&path(), |_| TxnVerdict::Commit(json!({})))
                .await
                .unwrap();
        }
        let version = store.read_row(&path()).unwrap().map(|(v, _)| v);
        assert_eq!(version, Some(2));
    }
}
