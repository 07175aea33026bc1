use crate::engagement::{PendingEngagement, PersistenceError};
use crate::feed::{EngageError, FeedChange, FetchError};
use crate::model::{EngageKind, Quote, QuoteId};

/// Completions sent back from spawned network tasks.
pub(crate) enum AppEvent {
    /// A page request finished.
    ///
    /// Fields:
    /// - `epoch`: feed epoch at spawn time (for stale result detection)
    /// - `page`: the page that was requested
    /// - `result`: the quotes or the fetch error
    PageLoaded {
        epoch: u64,
        page: u32,
        result: Result<Vec<Quote>, FetchError>,
    },
    /// The remote confirmation for an optimistic action finished. `epoch` is
    /// the feed epoch when the action was applied.
    EngageResolved {
        epoch: u64,
        pending: PendingEngagement,
        result: Result<(), EngageError>,
    },
    /// A page fetch panicked. Its loading state still has to be released.
    FetchPanicked {
        epoch: u64,
        page: u32,
        error: String,
    },
}

/// What the view layer is told after each operation or completion.
#[derive(Debug)]
pub enum SessionEvent {
    FeedChanged(FeedChange),
    /// The placeholder was removed and the cursor left on `page`; the next
    /// scroll trigger retries it.
    FetchFailed { page: u32, error: FetchError },
    /// An empty page arrived; no more pages will be requested.
    Exhausted,
    EngageConfirmed { quote_id: QuoteId, kind: EngageKind },
    /// The remote call failed and the optimistic change was rolled back.
    EngageFailed {
        quote_id: QuoteId,
        kind: EngageKind,
        error: EngageError,
    },
    /// A durable write failed. The in-memory state still reflects the change.
    PersistenceFailed { error: PersistenceError },
    /// Number of liked quotes, for the liked-feed header.
    LikedCountChanged(usize),
    TaskPanicked { task: &'static str, error: String },
}
