use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::{DocPath, DocumentStore, MAX_TXN_ATTEMPTS, StoreError, TxnSnapshot, TxnVerdict};

struct Versioned {
    version: u64,
    body: Value,
}

/// In-process document store with the same conditional-write contract as
/// the remote one: commits compare the version seen at snapshot time and
/// lose cleanly to anything written in between.
///
/// The lock is NOT held while the transaction function runs, so two
/// writers racing for the same document genuinely conflict and retry.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocPath, Versioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a document unconditionally, bumping its version. Mainly for
    /// seeding state in tests and for simulating a concurrent writer.
    pub fn put(&self, path: &DocPath, body: Value) {
        let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        let version = docs.get(path).map_or(0, |v| v.version) + 1;
        docs.insert(path.clone(), Versioned { version, body });
    }

    fn snapshot(&self, path: &DocPath) -> (Option<u64>, Option<Value>) {
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        match docs.get(path) {
            Some(v) => (Some(v.version), Some(v.body.clone())),
            None => (None, None),
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        Ok(self.snapshot(path).1)
    }

    async fn run_atomic<A, F>(&self, path: &DocPath, mut apply: F) -> Result<Option<A>, StoreError>
    where
        A: Send,
        F: FnMut(TxnSnapshot) -> TxnVerdict<A> + Send,
    {
        for attempt in 1..=MAX_TXN_ATTEMPTS {
            let (seen_version, body) = self.snapshot(path);
            let verdict = apply(TxnSnapshot {
                doc: body,
                server_time: Utc::now(),
            });
            match verdict {
                TxnVerdict::Abort(reason) => return Ok(Some(reason)),
                TxnVerdict::Commit(next) => {
                    let mut docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
                    let current_version = docs.get(path).map(|v| v.version);
                    if current_version != seen_version {
                        debug!(path = %path, attempt, "conditional write lost the race, retrying");
                        continue;
                    }
                    docs.insert(
                        path.clone(),
                        Versioned {
                            version: seen_version.unwrap_or(0) + 1,
                            body: next,
                        },
                    );
                    return Ok(None);
                }
            }
        }
        Err(StoreError::Contention {
            attempts: MAX_TXN_ATTEMPTS,
        })
    }
}
