//! Feed session: the single sequence that owns a feed and applies every
//! scroll, tap, and network completion to it.
//!
//! Network calls run in spawned tasks and report back over a channel. Their
//! results are only applied by [`FeedSession::handle_next_completion`], so
//! feed, quote, and store mutations never happen concurrently. Dropping the
//! session aborts any task still outstanding.

mod events;
mod tasks;

pub use events::SessionEvent;

use crate::engagement::{controller, EngagementStore, PendingEngagement, SetPersistence};
use crate::feed::{
    EngageError, EngagementRemote, EngagementSource, FeedSource, FetchError, PageOutcome,
    PageQuery, PageRequest, PagedFeed,
};
use crate::model::{EngageKind, FeedEntry, FeedFilter, Quote, QuoteId, SharePayload};
use events::AppEvent;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Which feed a session displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Every quote, engagement taken from the store.
    All,
    /// Only liked quotes. Disliking one removes it from the feed.
    Liked,
}

pub struct FeedSession<S, R, P> {
    kind: FeedKind,
    feed: PagedFeed,
    store: EngagementStore<P>,
    source: S,
    remote: R,
    language: String,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: mpsc::Receiver<AppEvent>,
    /// Spawned tasks whose completion has not been received yet.
    outstanding: usize,
    handles: Vec<JoinHandle<()>>,
    events: VecDeque<SessionEvent>,
}

impl<S, R, P> FeedSession<S, R, P>
where
    S: FeedSource,
    R: EngagementRemote,
    P: SetPersistence,
{
    pub fn new(
        kind: FeedKind,
        source: S,
        remote: R,
        store: EngagementStore<P>,
        language: impl Into<String>,
    ) -> Self {
        let marking = match kind {
            FeedKind::All => EngagementSource::Store,
            FeedKind::Liked => EngagementSource::AllLiked,
        };
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            kind,
            feed: PagedFeed::new(marking),
            store,
            source,
            remote,
            language: language.into(),
            event_tx,
            event_rx,
            outstanding: 0,
            handles: Vec::new(),
            events: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Rows in display order, including a trailing placeholder while loading.
    pub fn entries(&self) -> &[FeedEntry] {
        self.feed.entries()
    }

    pub fn feed(&self) -> &PagedFeed {
        &self.feed
    }

    pub fn store(&self) -> &EngagementStore<P> {
        &self.store
    }

    /// True while a spawned fetch or engagement call has not reported back.
    pub fn has_outstanding(&self) -> bool {
        self.outstanding > 0
    }

    /// Drain the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // ========================================================================
    // Entry Points
    // ========================================================================

    /// Reset the feed to `filter` and request the first page.
    pub async fn start(&mut self, filter: FeedFilter) {
        self.load_store().await;
        let request = self.feed.start(filter);
        self.flush_changes();
        if let Some(request) = request {
            self.spawn_fetch(request);
        }
    }

    /// Re-seed the feed. A liked feed recomputes its filter from the store.
    pub async fn refresh(&mut self) {
        let filter = match self.kind {
            FeedKind::All => self.feed.filter().clone(),
            FeedKind::Liked => {
                self.load_store().await;
                self.events
                    .push_back(SessionEvent::LikedCountChanged(self.store.liked_count()));
                FeedFilter::Ids(self.store.liked_ids())
            }
        };
        self.start(filter).await;
    }

    /// Scroll notification from the view. Requests the next page when the
    /// last visible row is near the end.
    pub fn on_scroll_position_changed(&mut self, last_visible: usize, total_count: usize) {
        if total_count != self.feed.len() {
            tracing::debug!(
                total_count,
                feed_len = self.feed.len(),
                "View row count differs from feed"
            );
        }
        let request = self.feed.maybe_load_more(last_visible);
        self.flush_changes();
        if let Some(request) = request {
            self.spawn_fetch(request);
        }
    }

    /// Returns `false` when the quote is not displayed or already liked.
    pub async fn on_like_tapped(&mut self, quote_id: QuoteId) -> bool {
        self.engage(quote_id, EngageKind::Like).await
    }

    /// Returns `false` when the quote is not displayed or already disliked.
    pub async fn on_dislike_tapped(&mut self, quote_id: QuoteId) -> bool {
        self.engage(quote_id, EngageKind::Dislike).await
    }

    pub fn on_share_tapped(&self, quote_id: QuoteId) -> Option<SharePayload> {
        self.feed.quote(quote_id).map(controller::share)
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Wait for one outstanding task to report back and apply its result.
    /// Returns `false` immediately when nothing is outstanding.
    pub async fn handle_next_completion(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }
        let Some(event) = self.event_rx.recv().await else {
            return false;
        };
        self.outstanding -= 1;
        self.apply(event).await;
        true
    }

    /// Apply completions until nothing is outstanding.
    pub async fn settle(&mut self) {
        while self.handle_next_completion().await {}
    }

    async fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::PageLoaded {
                epoch,
                page,
                result,
            } => self.handle_page_loaded(epoch, page, result),
            AppEvent::EngageResolved {
                epoch,
                pending,
                result,
            } => {
                if let Err(EngageError::TaskPanicked(error)) = &result {
                    self.events.push_back(SessionEvent::TaskPanicked {
                        task: "engage",
                        error: error.clone(),
                    });
                }
                self.handle_engage_resolved(epoch, pending, result).await
            }
            AppEvent::FetchPanicked { epoch, page, error } => {
                tracing::error!(task = "fetch_page", page, error = %error, "Background task panicked");
                self.feed.apply_failure(epoch, page);
                self.events.push_back(SessionEvent::TaskPanicked {
                    task: "fetch_page",
                    error,
                });
            }
        }
        self.flush_changes();
    }

    fn handle_page_loaded(
        &mut self,
        epoch: u64,
        page: u32,
        result: Result<Vec<Quote>, FetchError>,
    ) {
        match result {
            Ok(quotes) => {
                let store = &self.store;
                let outcome = self
                    .feed
                    .apply_page(epoch, page, quotes, |id| store.engagement(id));
                if outcome == PageOutcome::Exhausted {
                    self.flush_changes();
                    self.events.push_back(SessionEvent::Exhausted);
                }
            }
            Err(error) => {
                if self.feed.apply_failure(epoch, page) {
                    tracing::warn!(page, error = %error, "Feed page failed to load");
                    self.flush_changes();
                    self.events
                        .push_back(SessionEvent::FetchFailed { page, error });
                }
            }
        }
    }

    async fn handle_engage_resolved(
        &mut self,
        epoch: u64,
        pending: PendingEngagement,
        result: Result<(), EngageError>,
    ) {
        let quote_id = pending.quote_id;
        let kind = pending.kind;
        match result {
            Ok(()) => {
                tracing::debug!(quote_id, kind = %kind, "Engagement confirmed");
                self.events
                    .push_back(SessionEvent::EngageConfirmed { quote_id, kind });
                if kind == EngageKind::Dislike && self.kind == FeedKind::Liked {
                    self.feed.remove_quote(quote_id);
                    self.flush_changes();
                    self.events
                        .push_back(SessionEvent::LikedCountChanged(self.store.liked_count()));
                }
            }
            Err(error) => {
                tracing::warn!(quote_id, kind = %kind, error = %error, "Engagement rejected, rolling back");
                // After a restart the row is a fresh copy with server counts;
                // only its engagement mark follows the store back.
                let quote = if epoch == self.feed.epoch() {
                    self.feed.quote_mut(quote_id)
                } else {
                    if let Some(quote) = self.feed.quote_mut(quote_id) {
                        quote.engagement = pending.previous.engagement;
                    }
                    None
                };
                if let Err(e) = controller::rollback(quote, &mut self.store, &pending).await {
                    self.events
                        .push_back(SessionEvent::PersistenceFailed { error: e });
                }
                self.flush_changes();
                self.events.push_back(SessionEvent::EngageFailed {
                    quote_id,
                    kind,
                    error,
                });
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn load_store(&mut self) {
        if let Err(error) = self.store.ensure_loaded().await {
            tracing::warn!(error = %error, "Failed to load engagement sets");
            self.events
                .push_back(SessionEvent::PersistenceFailed { error });
        }
    }

    async fn engage(&mut self, quote_id: QuoteId, kind: EngageKind) -> bool {
        self.load_store().await;
        let Some(quote) = self.feed.quote_mut(quote_id) else {
            tracing::debug!(quote_id, kind = %kind, "Tap on quote not in feed");
            return false;
        };
        let applied = match kind {
            EngageKind::Like => controller::like(quote, &mut self.store).await,
            EngageKind::Dislike => controller::dislike(quote, &mut self.store).await,
        };
        let Some(mut pending) = applied else {
            return false;
        };
        self.flush_changes();
        if let Err(error) = std::mem::replace(&mut pending.persisted, Ok(())) {
            self.events
                .push_back(SessionEvent::PersistenceFailed { error });
        }
        self.spawn_engage(pending);
        true
    }

    fn flush_changes(&mut self) {
        self.events.extend(
            self.feed
                .take_changes()
                .into_iter()
                .map(SessionEvent::FeedChanged),
        );
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
        self.outstanding += 1;
    }

    fn spawn_fetch(&mut self, request: PageRequest) {
        let query = PageQuery {
            page: request.page,
            filter: request.filter,
            language: self.language.clone(),
        };
        let handle = tasks::spawn_fetch(
            self.source.clone(),
            request.epoch,
            query,
            self.event_tx.clone(),
        );
        self.track(handle);
    }

    fn spawn_engage(&mut self, pending: PendingEngagement) {
        let handle = tasks::spawn_engage(
            self.remote.clone(),
            self.feed.epoch(),
            pending,
            self.event_tx.clone(),
        );
        self.track(handle);
    }
}

impl<S, R, P> FeedSession<S, R, P> {
    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        self.outstanding = 0;
    }
}

/// Abort every in-flight task so no result is applied after teardown.
impl<S, R, P> Drop for FeedSession<S, R, P> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!(tasks = self.handles.len(), "Aborting session tasks on drop");
        }
        self.abort_all();
    }
}
