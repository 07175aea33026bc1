use crate::model::QuoteId;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from the durable key/value backing of the engagement sets.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing database rejected the read or write
    #[error("Persistence failed: {0}")]
    Database(String),
}

/// The two fixed keys under which engagement sets are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetName {
    Liked,
    Disliked,
}

impl SetName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetName::Liked => "liked",
            SetName::Disliked => "disliked",
        }
    }
}

/// Durable storage for named id sets.
///
/// `persist_pair` writes both sets as one unit; backends that can do so
/// atomically (SQLite) override it, the default writes them in turn.
pub trait SetPersistence: Send + Sync {
    fn load_set(
        &self,
        name: SetName,
    ) -> impl Future<Output = Result<BTreeSet<QuoteId>, PersistenceError>> + Send;

    fn persist_set(
        &self,
        name: SetName,
        ids: &BTreeSet<QuoteId>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn persist_pair(
        &self,
        liked: &BTreeSet<QuoteId>,
        disliked: &BTreeSet<QuoteId>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        async move {
            self.persist_set(SetName::Liked, liked).await?;
            self.persist_set(SetName::Disliked, disliked).await
        }
    }
}

/// In-process backend. Clones share the same underlying map, so a test or a
/// second store can observe what was "persisted".
#[derive(Debug, Clone, Default)]
pub struct MemorySets {
    sets: Arc<Mutex<HashMap<SetName, BTreeSet<QuoteId>>>>,
}

impl MemorySets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what is currently stored under `name`.
    pub fn stored(&self, name: SetName) -> BTreeSet<QuoteId> {
        self.sets
            .lock()
            .map(|sets| sets.get(&name).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl SetPersistence for MemorySets {
    async fn load_set(&self, name: SetName) -> Result<BTreeSet<QuoteId>, PersistenceError> {
        let sets = self
            .sets
            .lock()
            .map_err(|e| PersistenceError::Database(e.to_string()))?;
        Ok(sets.get(&name).cloned().unwrap_or_default())
    }

    async fn persist_set(
        &self,
        name: SetName,
        ids: &BTreeSet<QuoteId>,
    ) -> Result<(), PersistenceError> {
        let mut sets = self
            .sets
            .lock()
            .map_err(|e| PersistenceError::Database(e.to_string()))?;
        sets.insert(name, ids.clone());
        Ok(())
    }
}
