//! Optimistic like/dislike application and rollback.
//!
//! `like` and `dislike` mutate the quote and the store immediately and hand
//! back a [`PendingEngagement`] describing the remote call still owed. When
//! that call fails, [`rollback`] restores the exact pre-action state.

use super::persistence::{PersistenceError, SetPersistence};
use super::store::EngagementStore;
use crate::model::{EngageKind, Engagement, Quote, QuoteId, SharePayload};

/// Quote state captured before an optimistic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementSnapshot {
    pub engagement: Engagement,
    pub like_count: u32,
    pub dislike_count: u32,
}

impl EngagementSnapshot {
    pub fn of(quote: &Quote) -> Self {
        Self {
            engagement: quote.engagement,
            like_count: quote.like_count,
            dislike_count: quote.dislike_count,
        }
    }
}

/// An applied optimistic action awaiting remote confirmation.
#[derive(Debug)]
pub struct PendingEngagement {
    pub quote_id: QuoteId,
    pub kind: EngageKind,
    pub previous: EngagementSnapshot,
    /// Outcome of the synchronous store write; the local change stands either way.
    pub persisted: Result<(), PersistenceError>,
}

/// Like a quote. Returns `None` when it is already liked.
pub async fn like<P: SetPersistence>(
    quote: &mut Quote,
    store: &mut EngagementStore<P>,
) -> Option<PendingEngagement> {
    apply(quote, store, EngageKind::Like).await
}

/// Dislike a quote. Returns `None` when it is already disliked.
pub async fn dislike<P: SetPersistence>(
    quote: &mut Quote,
    store: &mut EngagementStore<P>,
) -> Option<PendingEngagement> {
    apply(quote, store, EngageKind::Dislike).await
}

async fn apply<P: SetPersistence>(
    quote: &mut Quote,
    store: &mut EngagementStore<P>,
    kind: EngageKind,
) -> Option<PendingEngagement> {
    let target = kind.target();
    if quote.engagement == target {
        return None;
    }

    let previous = EngagementSnapshot::of(quote);
    match kind {
        EngageKind::Like => {
            quote.like_count = quote.like_count.saturating_add(1);
            if previous.engagement == Engagement::Disliked {
                quote.dislike_count = quote.dislike_count.saturating_sub(1);
            }
        }
        EngageKind::Dislike => {
            quote.dislike_count = quote.dislike_count.saturating_add(1);
            if previous.engagement == Engagement::Liked {
                quote.like_count = quote.like_count.saturating_sub(1);
            }
        }
    }
    quote.engagement = target;

    let persisted = match kind {
        EngageKind::Like => store.set_liked(quote.id).await,
        EngageKind::Dislike => store.set_disliked(quote.id).await,
    };

    tracing::debug!(
        quote_id = quote.id,
        kind = %kind,
        previous = ?previous.engagement,
        likes = quote.like_count,
        dislikes = quote.dislike_count,
        "Applied optimistic engagement"
    );

    Some(PendingEngagement {
        quote_id: quote.id,
        kind,
        previous,
        persisted,
    })
}

/// Undo an optimistic action after its remote call failed.
///
/// The store is always restored. The quote is restored only when it is still
/// displayed; it may have been removed or the feed restarted meanwhile.
pub async fn rollback<P: SetPersistence>(
    quote: Option<&mut Quote>,
    store: &mut EngagementStore<P>,
    pending: &PendingEngagement,
) -> Result<(), PersistenceError> {
    if let Some(quote) = quote {
        quote.engagement = pending.previous.engagement;
        quote.like_count = pending.previous.like_count;
        quote.dislike_count = pending.previous.dislike_count;
    }
    tracing::debug!(
        quote_id = pending.quote_id,
        kind = %pending.kind,
        restored = ?pending.previous.engagement,
        "Rolled back engagement"
    );
    store
        .restore(pending.quote_id, pending.previous.engagement)
        .await
}

/// Hand off a stable content reference for sharing. Not an engagement mutation.
pub fn share(quote: &Quote) -> SharePayload {
    SharePayload::from(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::MemorySets;
    use crate::model::QuoteContent;

    fn quote(id: QuoteId, likes: u32, dislikes: u32) -> Quote {
        Quote::new(id, QuoteContent::default(), likes, dislikes)
    }

    async fn loaded_store() -> EngagementStore<MemorySets> {
        let mut store = EngagementStore::new(MemorySets::new());
        store.ensure_loaded().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_like_from_none() {
        let mut store = loaded_store().await;
        let mut q = quote(1, 3, 1);

        let pending = like(&mut q, &mut store).await.unwrap();
        assert_eq!(q.engagement, Engagement::Liked);
        assert_eq!(q.like_count, 4);
        assert_eq!(q.dislike_count, 1);
        assert!(store.is_liked(1));
        assert!(pending.persisted.is_ok());
        assert_eq!(pending.previous.engagement, Engagement::None);
    }

    #[tokio::test]
    async fn test_like_twice_is_noop() {
        let mut store = loaded_store().await;
        let mut q = quote(1, 3, 1);

        assert!(like(&mut q, &mut store).await.is_some());
        let after_first = q.clone();
        assert!(like(&mut q, &mut store).await.is_none());
        assert_eq!(q, after_first);
        assert_eq!(store.liked_count(), 1);
    }

    #[tokio::test]
    async fn test_dislike_from_liked_moves_counts_and_sets() {
        let mut store = loaded_store().await;
        let mut q = quote(2, 5, 0);
        like(&mut q, &mut store).await.unwrap();
        assert_eq!(q.like_count, 6);

        dislike(&mut q, &mut store).await.unwrap();
        assert_eq!(q.engagement, Engagement::Disliked);
        assert_eq!(q.like_count, 5);
        assert_eq!(q.dislike_count, 1);
        assert!(!store.is_liked(2));
        assert!(store.is_disliked(2));
    }

    #[tokio::test]
    async fn test_dislike_rollback_restores_exactly() {
        let mut store = loaded_store().await;
        let mut q = quote(3, 3, 1);

        let pending = dislike(&mut q, &mut store).await.unwrap();
        assert_eq!(q.dislike_count, 2);
        assert_eq!(q.engagement, Engagement::Disliked);

        rollback(Some(&mut q), &mut store, &pending).await.unwrap();
        assert_eq!(q.like_count, 3);
        assert_eq!(q.dislike_count, 1);
        assert_eq!(q.engagement, Engagement::None);
        assert_eq!(store.engagement(3), Engagement::None);
    }

    #[tokio::test]
    async fn test_like_rollback_restores_previous_dislike() {
        let mut store = loaded_store().await;
        let mut q = quote(4, 2, 2);
        dislike(&mut q, &mut store).await.unwrap();
        let before = q.clone();

        let pending = like(&mut q, &mut store).await.unwrap();
        rollback(Some(&mut q), &mut store, &pending).await.unwrap();

        assert_eq!(q, before);
        assert!(store.is_disliked(4));
        assert!(!store.is_liked(4));
    }

    #[tokio::test]
    async fn test_rollback_without_quote_still_restores_store() {
        let mut store = loaded_store().await;
        let mut q = quote(5, 0, 0);
        let pending = like(&mut q, &mut store).await.unwrap();

        rollback(None, &mut store, &pending).await.unwrap();
        assert_eq!(store.engagement(5), Engagement::None);
    }

    #[test]
    fn test_share_payload() {
        let q = Quote::new(
            8,
            QuoteContent {
                message: Some("Be here now".into()),
                author: Some("Ram Dass".into()),
                image: Some("aGVsbG8=".into()),
            },
            0,
            0,
        );
        let payload = share(&q);
        assert_eq!(payload.quote_id, 8);
        assert_eq!(payload.image.as_deref(), Some("aGVsbG8="));
    }
}
