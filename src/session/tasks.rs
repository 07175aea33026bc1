//! Spawned network work. Each task sends exactly one [`AppEvent`] back.

use super::events::AppEvent;
use crate::engagement::PendingEngagement;
use crate::feed::{EngageError, EngagementRemote, FeedSource, PageQuery};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Wraps a future to catch panics and convert them to errors.
///
/// Lets a panicking task still report back instead of silently vanishing,
/// so the session can release its loading state.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

pub(super) fn spawn_fetch<S: FeedSource>(
    source: S,
    epoch: u64,
    query: PageQuery,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let page = query.page;
        match catch_task_panic(source.fetch_page(query)).await {
            Ok(result) => {
                if let Err(e) = tx.send(AppEvent::PageLoaded { epoch, page, result }).await {
                    tracing::warn!(error = %e, event = "PageLoaded", "Channel send failed (receiver dropped)");
                }
            }
            Err(panic_msg) => {
                tracing::error!(task = "fetch_page", page, error = %panic_msg, "Background task panicked");
                let _ = tx
                    .send(AppEvent::FetchPanicked {
                        epoch,
                        page,
                        error: panic_msg,
                    })
                    .await;
            }
        }
    })
}

/// A panic resolves the action as failed so the optimistic change is undone.
pub(super) fn spawn_engage<R: EngagementRemote>(
    remote: R,
    epoch: u64,
    pending: PendingEngagement,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let quote_id = pending.quote_id;
        let result = match catch_task_panic(remote.engage(quote_id, pending.kind)).await {
            Ok(result) => result,
            Err(panic_msg) => {
                tracing::error!(task = "engage", quote_id, error = %panic_msg, "Background task panicked");
                Err(EngageError::TaskPanicked(panic_msg))
            }
        };
        let event = AppEvent::EngageResolved {
            epoch,
            pending,
            result,
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(error = %e, event = "EngageResolved", "Channel send failed (receiver dropped)");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }
}
