use super::persistence::{PersistenceError, SetName, SetPersistence};
use crate::model::{Engagement, QuoteId};
use std::collections::BTreeSet;

/// In-memory liked/disliked membership. `liked ∩ disliked` is always empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EngagementSets {
    liked: BTreeSet<QuoteId>,
    disliked: BTreeSet<QuoteId>,
}

impl EngagementSets {
    /// Build from persisted sets, repairing any id stored on both sides.
    /// Liked wins, matching the last action the user most likely saw.
    fn from_persisted(liked: BTreeSet<QuoteId>, mut disliked: BTreeSet<QuoteId>) -> Self {
        let overlap: Vec<QuoteId> = liked.intersection(&disliked).copied().collect();
        if !overlap.is_empty() {
            tracing::warn!(
                count = overlap.len(),
                "Quotes stored as both liked and disliked, keeping liked"
            );
            for id in &overlap {
                disliked.remove(id);
            }
        }
        Self { liked, disliked }
    }
}

/// Persisted record of which quotes the user liked or disliked.
///
/// Sets are loaded lazily on first use and every mutation writes both sets
/// through the backend before returning. A failed write is reported to the
/// caller but the in-memory change stands.
pub struct EngagementStore<P> {
    backend: P,
    sets: Option<EngagementSets>,
}

impl<P: SetPersistence> EngagementStore<P> {
    pub fn new(backend: P) -> Self {
        Self {
            backend,
            sets: None,
        }
    }

    pub fn backend(&self) -> &P {
        &self.backend
    }

    pub fn is_loaded(&self) -> bool {
        self.sets.is_some()
    }

    /// Load both sets from the backend if that has not happened yet.
    ///
    /// On failure the store stays unloaded, so reads see empty sets and the
    /// next access retries.
    pub async fn ensure_loaded(&mut self) -> Result<(), PersistenceError> {
        if self.sets.is_some() {
            return Ok(());
        }
        let liked = self.backend.load_set(SetName::Liked).await?;
        let disliked = self.backend.load_set(SetName::Disliked).await?;
        tracing::debug!(
            liked = liked.len(),
            disliked = disliked.len(),
            "Loaded engagement sets"
        );
        self.sets = Some(EngagementSets::from_persisted(liked, disliked));
        Ok(())
    }

    pub fn is_liked(&self, id: QuoteId) -> bool {
        self.sets.as_ref().is_some_and(|s| s.liked.contains(&id))
    }

    pub fn is_disliked(&self, id: QuoteId) -> bool {
        self.sets.as_ref().is_some_and(|s| s.disliked.contains(&id))
    }

    /// Engagement state implied by set membership.
    pub fn engagement(&self, id: QuoteId) -> Engagement {
        if self.is_liked(id) {
            Engagement::Liked
        } else if self.is_disliked(id) {
            Engagement::Disliked
        } else {
            Engagement::None
        }
    }

    pub fn liked_ids(&self) -> BTreeSet<QuoteId> {
        self.sets
            .as_ref()
            .map(|s| s.liked.clone())
            .unwrap_or_default()
    }

    pub fn liked_count(&self) -> usize {
        self.sets.as_ref().map_or(0, |s| s.liked.len())
    }

    pub fn disliked_count(&self) -> usize {
        self.sets.as_ref().map_or(0, |s| s.disliked.len())
    }

    /// Mark `id` liked, evicting it from the disliked set. Idempotent.
    pub async fn set_liked(&mut self, id: QuoteId) -> Result<(), PersistenceError> {
        self.mutate(id, Engagement::Liked).await
    }

    /// Mark `id` disliked, evicting it from the liked set. Idempotent.
    pub async fn set_disliked(&mut self, id: QuoteId) -> Result<(), PersistenceError> {
        self.mutate(id, Engagement::Disliked).await
    }

    /// Remove `id` from both sets.
    pub async fn clear(&mut self, id: QuoteId) -> Result<(), PersistenceError> {
        self.mutate(id, Engagement::None).await
    }

    /// Put `id` back into whichever set `state` names.
    pub async fn restore(&mut self, id: QuoteId, state: Engagement) -> Result<(), PersistenceError> {
        self.mutate(id, state).await
    }

    async fn mutate(&mut self, id: QuoteId, state: Engagement) -> Result<(), PersistenceError> {
        // Never persist on top of sets that failed to load; that would wipe them.
        self.ensure_loaded().await?;
        let sets = self.sets.get_or_insert_with(EngagementSets::default);

        // Both sides change in one step, so no reader sees the id in neither or both.
        match state {
            Engagement::Liked => {
                sets.disliked.remove(&id);
                sets.liked.insert(id);
            }
            Engagement::Disliked => {
                sets.liked.remove(&id);
                sets.disliked.insert(id);
            }
            Engagement::None => {
                sets.liked.remove(&id);
                sets.disliked.remove(&id);
            }
        }

        if let Err(e) = self.backend.persist_pair(&sets.liked, &sets.disliked).await {
            tracing::warn!(quote_id = id, state = ?state, error = %e, "Failed to persist engagement sets");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::MemorySets;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FlakyBackend {
        inner: MemorySets,
        fail_writes: Arc<AtomicBool>,
        fail_loads: Arc<AtomicBool>,
    }

    impl SetPersistence for FlakyBackend {
        async fn load_set(&self, name: SetName) -> Result<BTreeSet<QuoteId>, PersistenceError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(PersistenceError::Database("disk unavailable".into()));
            }
            self.inner.load_set(name).await
        }

        async fn persist_set(
            &self,
            name: SetName,
            ids: &BTreeSet<QuoteId>,
        ) -> Result<(), PersistenceError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PersistenceError::Database("disk full".into()));
            }
            self.inner.persist_set(name, ids).await
        }
    }

    #[tokio::test]
    async fn test_set_liked_evicts_disliked() {
        let backend = MemorySets::new();
        let mut store = EngagementStore::new(backend.clone());

        store.set_disliked(4).await.unwrap();
        assert!(store.is_disliked(4));

        store.set_liked(4).await.unwrap();
        assert!(store.is_liked(4));
        assert!(!store.is_disliked(4));
        assert!(backend.stored(SetName::Liked).contains(&4));
        assert!(!backend.stored(SetName::Disliked).contains(&4));
    }

    #[tokio::test]
    async fn test_set_liked_idempotent() {
        let backend = MemorySets::new();
        let mut store = EngagementStore::new(backend.clone());

        store.set_liked(9).await.unwrap();
        store.set_liked(9).await.unwrap();
        assert_eq!(store.liked_count(), 1);
        assert_eq!(backend.stored(SetName::Liked).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_from_both() {
        let mut store = EngagementStore::new(MemorySets::new());
        store.set_liked(1).await.unwrap();
        store.clear(1).await.unwrap();
        assert_eq!(store.engagement(1), Engagement::None);
    }

    #[tokio::test]
    async fn test_survives_reload() {
        let backend = MemorySets::new();
        {
            let mut store = EngagementStore::new(backend.clone());
            store.set_liked(1).await.unwrap();
            store.set_disliked(2).await.unwrap();
        }

        let mut reopened = EngagementStore::new(backend);
        assert!(!reopened.is_loaded());
        reopened.ensure_loaded().await.unwrap();
        assert_eq!(reopened.engagement(1), Engagement::Liked);
        assert_eq!(reopened.engagement(2), Engagement::Disliked);
    }

    #[tokio::test]
    async fn test_overlap_repaired_on_load() {
        let backend = MemorySets::new();
        backend
            .persist_set(SetName::Liked, &[5].into_iter().collect())
            .await
            .unwrap();
        backend
            .persist_set(SetName::Disliked, &[5, 6].into_iter().collect())
            .await
            .unwrap();

        let mut store = EngagementStore::new(backend);
        store.ensure_loaded().await.unwrap();
        assert!(store.is_liked(5));
        assert!(!store.is_disliked(5));
        assert!(store.is_disliked(6));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_change() {
        let backend = FlakyBackend::default();
        let mut store = EngagementStore::new(backend.clone());
        store.ensure_loaded().await.unwrap();

        backend.fail_writes.store(true, Ordering::SeqCst);
        let result = store.set_liked(3).await;

        assert!(matches!(result, Err(PersistenceError::Database(_))));
        assert!(store.is_liked(3));
        assert!(backend.inner.stored(SetName::Liked).is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_blocks_mutation() {
        let backend = FlakyBackend::default();
        backend
            .inner
            .persist_set(SetName::Liked, &[1, 2].into_iter().collect())
            .await
            .unwrap();
        backend.fail_loads.store(true, Ordering::SeqCst);

        let mut store = EngagementStore::new(backend.clone());
        assert!(store.set_disliked(7).await.is_err());
        assert!(!store.is_loaded());
        assert!(!store.is_disliked(7));
        // Persisted likes were not overwritten
        assert_eq!(backend.inner.stored(SetName::Liked).len(), 2);

        backend.fail_loads.store(false, Ordering::SeqCst);
        store.set_disliked(7).await.unwrap();
        assert_eq!(store.liked_count(), 2);
        assert!(store.is_disliked(7));
    }
}
