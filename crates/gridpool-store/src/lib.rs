pub mod memory;
pub mod sqlite;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// `"collection/docid"`-style document path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    pub fn new(collection: &str, doc_id: &str) -> Self {
        Self(format!("{collection}/{doc_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-class failures. Contention outcomes (a claim losing its race)
/// are NOT errors here; they travel through `TxnVerdict::Abort`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional write kept losing to concurrent writers until the
    /// attempt cap ran out. Callers decide whether to retry.
    #[error("transaction gave up after {attempts} conflicting attempts")]
    Contention { attempts: u32 },
    #[error("storage backend: {0}")]
    Backend(String),
    #[error("document serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a transaction function sees on each attempt: the document as of
/// that attempt (or `None` if it does not exist) and the store-assigned
/// commit timestamp.
#[derive(Debug, Clone)]
pub struct TxnSnapshot {
    pub doc: Option<Value>,
    pub server_time: DateTime<Utc>,
}

/// Decision returned by a transaction function.
#[derive(Debug)]
pub enum TxnVerdict<A> {
    /// Replace the whole document with this value.
    Commit(Value),
    /// Leave the document untouched and surface this reason to the caller.
    Abort(A),
}

/// The document store collaborator: whole-document reads plus an atomic
/// read-modify-write primitive with retry-on-conflict semantics.
///
/// `run_atomic` re-invokes `apply` with a fresh snapshot whenever the
/// document changed between snapshot and commit, so `apply` must be pure
/// with respect to its snapshot: safe to call any number of times with
/// different states. `Ok(None)` means the commit landed; `Ok(Some(a))`
/// means `apply` aborted with `a` and nothing was written.
pub trait DocumentStore: Send + Sync {
    fn get(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn run_atomic<A, F>(
        &self,
        path: &DocPath,
        apply: F,
    ) -> impl Future<Output = Result<Option<A>, StoreError>> + Send
    where
        A: Send,
        F: FnMut(TxnSnapshot) -> TxnVerdict<A> + Send;
}

impl<'a, S: DocumentStore> DocumentStore for &'a S {
    fn get(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send {
        (**self).get(path)
    }

    fn run_atomic<A, F>(
        &self,
        path: &DocPath,
        apply: F,
    ) -> impl Future<Output = Result<Option<A>, StoreError>> + Send
    where
        A: Send,
        F: FnMut(TxnSnapshot) -> TxnVerdict<A> + Send,
    {
        (**self).run_atomic(path, apply)
    }
}

impl<S: DocumentStore> DocumentStore for Arc<S> {
    fn get(
        &self,
        path: &DocPath,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send {
        (**self).get(path)
    }

    fn run_atomic<A, F>(
        &self,
        path: &DocPath,
        apply: F,
    ) -> impl Future<Output = Result<Option<A>, StoreError>> + Send
    where
        A: Send,
        F: FnMut(TxnSnapshot) -> TxnVerdict<A> + Send,
    {
        (**self).run_atomic(path, apply)
    }
}

/// Upper bound on CAS retries before reporting `StoreError::Contention`.
pub(crate) const MAX_TXN_ATTEMPTS: u32 = 32;
