use crate::model::{Engagement, FeedEntry, FeedFilter, Quote, QuoteId};

/// Load more once the last visible row is within this many rows of the end.
pub const VISIBLE_THRESHOLD: usize = 1;

/// Scroll-triggered loads need more than this many rows, so a nearly empty
/// first page does not immediately chain into a second request.
pub const MIN_ROWS_FOR_LOAD_MORE: usize = 2;

/// A page request issued by [`PagedFeed`]. Carries the epoch it was issued
/// under so a result from before a restart is recognised as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub epoch: u64,
    pub page: u32,
    pub filter: FeedFilter,
}

/// Change notification for the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedChange {
    /// Everything was cleared.
    Reset,
    Inserted { start: usize, len: usize },
    Removed { start: usize, len: usize },
    Updated { index: usize },
}

/// Result of applying a page response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended(usize),
    /// The page was empty; no further requests will be issued.
    Exhausted,
    /// The response belongs to an earlier epoch or page and was dropped.
    Stale,
}

/// How fetched quotes get their engagement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementSource {
    /// Cross-reference the engagement store.
    Store,
    /// Every quote is liked by construction (the liked-quotes feed).
    AllLiked,
}

/// Ordered feed rows plus the pagination cursor.
///
/// States: idle, loading (one request in flight), and exhausted. At most one
/// placeholder exists and it is always the last row.
#[derive(Debug)]
pub struct PagedFeed {
    entries: Vec<FeedEntry>,
    cursor: u32,
    exhausted: bool,
    in_flight: Option<u32>,
    epoch: u64,
    filter: FeedFilter,
    marking: EngagementSource,
    changes: Vec<FeedChange>,
}

impl PagedFeed {
    pub fn new(marking: EngagementSource) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 1,
            exhausted: false,
            in_flight: None,
            epoch: 0,
            filter: FeedFilter::All,
            marking,
            changes: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.entries.iter().filter_map(FeedEntry::as_quote)
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Drain change notifications accumulated since the last call.
    pub fn take_changes(&mut self) -> Vec<FeedChange> {
        std::mem::take(&mut self.changes)
    }

    /// Reset to an empty feed scoped to `filter` and request page 1.
    ///
    /// Returns `None` when the filter is an empty id set: the feed stays empty
    /// and nothing is fetched.
    pub fn start(&mut self, filter: FeedFilter) -> Option<PageRequest> {
        self.entries.clear();
        self.cursor = 1;
        self.exhausted = false;
        self.in_flight = None;
        self.epoch += 1;
        self.filter = filter;
        self.changes.push(FeedChange::Reset);

        if self.filter.is_empty() {
            tracing::debug!(epoch = self.epoch, "Empty filter, feed stays empty");
            return None;
        }
        Some(self.issue())
    }

    /// Request the next page if the user scrolled near the end.
    pub fn maybe_load_more(&mut self, last_visible: usize) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.exhausted {
            return None;
        }
        let len = self.entries.len();
        if len <= MIN_ROWS_FOR_LOAD_MORE || len > last_visible + VISIBLE_THRESHOLD {
            return None;
        }

        self.entries.push(FeedEntry::Placeholder);
        self.changes.push(FeedChange::Inserted { start: len, len: 1 });
        Some(self.issue())
    }

    fn issue(&mut self) -> PageRequest {
        let page = self.cursor;
        self.cursor += 1;
        self.in_flight = Some(page);
        tracing::debug!(epoch = self.epoch, page, "Requesting feed page");
        PageRequest {
            epoch: self.epoch,
            page,
            filter: self.filter.clone(),
        }
    }

    fn is_current(&self, epoch: u64, page: u32) -> bool {
        epoch == self.epoch && self.in_flight == Some(page)
    }

    fn remove_placeholder(&mut self) {
        if self.entries.last().is_some_and(FeedEntry::is_placeholder) {
            self.entries.pop();
            self.changes.push(FeedChange::Removed {
                start: self.entries.len(),
                len: 1,
            });
        }
    }

    /// Splice a successful page response in place of the placeholder.
    ///
    /// `engagement_of` is consulted per quote unless this feed marks every
    /// quote liked.
    pub fn apply_page<F>(
        &mut self,
        epoch: u64,
        page: u32,
        quotes: Vec<Quote>,
        engagement_of: F,
    ) -> PageOutcome
    where
        F: Fn(QuoteId) -> Engagement,
    {
        if !self.is_current(epoch, page) {
            tracing::debug!(
                epoch,
                page,
                current_epoch = self.epoch,
                in_flight = ?self.in_flight,
                "Ignoring stale page result"
            );
            return PageOutcome::Stale;
        }

        self.remove_placeholder();
        self.in_flight = None;

        if quotes.is_empty() {
            self.exhausted = true;
            tracing::debug!(epoch, page, "Feed exhausted");
            return PageOutcome::Exhausted;
        }

        let start = self.entries.len();
        let count = quotes.len();
        let marking = self.marking;
        self.entries.extend(quotes.into_iter().map(|mut quote| {
            quote.engagement = match marking {
                EngagementSource::AllLiked => Engagement::Liked,
                EngagementSource::Store => engagement_of(quote.id),
            };
            FeedEntry::Quote(quote)
        }));
        self.changes.push(FeedChange::Inserted { start, len: count });
        tracing::debug!(epoch, page, count, total = self.entries.len(), "Appended page");
        PageOutcome::Appended(count)
    }

    /// Record a failed page load. The cursor rolls back so the same page is
    /// requested by the next scroll trigger. Returns `false` if stale.
    pub fn apply_failure(&mut self, epoch: u64, page: u32) -> bool {
        if !self.is_current(epoch, page) {
            tracing::debug!(epoch, page, "Ignoring stale page failure");
            return false;
        }
        self.remove_placeholder();
        self.in_flight = None;
        self.cursor = page;
        true
    }

    pub fn position_of(&self, id: QuoteId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_quote().is_some_and(|q| q.id == id))
    }

    pub fn quote(&self, id: QuoteId) -> Option<&Quote> {
        self.position_of(id)
            .and_then(|index| self.entries[index].as_quote())
    }

    /// Mutable access to a quote; records an `Updated` change for its row.
    pub fn quote_mut(&mut self, id: QuoteId) -> Option<&mut Quote> {
        let index = self.position_of(id)?;
        self.changes.push(FeedChange::Updated { index });
        self.entries[index].as_quote_mut()
    }

    /// Remove a quote from the displayed rows.
    pub fn remove_quote(&mut self, id: QuoteId) -> Option<Quote> {
        let index = self.position_of(id)?;
        let removed = self.entries.remove(index);
        self.changes.push(FeedChange::Removed {
            start: index,
            len: 1,
        });
        match removed {
            FeedEntry::Quote(quote) => Some(quote),
            FeedEntry::Placeholder => None,
        }
    }
}
