//! Core data types shared by the feed, engagement, and session layers.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Stable server-assigned quote identifier. Never reused.
pub type QuoteId = i64;

// ============================================================================
// Engagement
// ============================================================================

/// A user's relationship to one quote. Exactly one variant holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Engagement {
    #[default]
    None,
    Liked,
    Disliked,
}

/// The kind of remote engagement call issued for a tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngageKind {
    Like,
    Dislike,
}

impl EngageKind {
    /// Path segment used by the remote API.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngageKind::Like => "like",
            EngageKind::Dislike => "dislike",
        }
    }

    /// Engagement state this action moves a quote into.
    pub fn target(&self) -> Engagement {
        match self {
            EngageKind::Like => Engagement::Liked,
            EngageKind::Dislike => Engagement::Disliked,
        }
    }
}

impl fmt::Display for EngageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Quote
// ============================================================================

/// Display content of a quote card. Opaque to the feed and engagement logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuoteContent {
    pub message: Option<String>,
    pub author: Option<String>,
    /// Base64 encoded card image as served by the API.
    pub image: Option<String>,
}

/// One quote card in a feed.
///
/// `like_count` and `dislike_count` are server-authoritative; `engagement`
/// mirrors the local store's membership for `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub id: QuoteId,
    pub content: QuoteContent,
    pub like_count: u32,
    pub dislike_count: u32,
    pub engagement: Engagement,
}

impl Quote {
    pub fn new(id: QuoteId, content: QuoteContent, like_count: u32, dislike_count: u32) -> Self {
        Self {
            id,
            content,
            like_count,
            dislike_count,
            engagement: Engagement::None,
        }
    }

    pub fn is_liked(&self) -> bool {
        self.engagement == Engagement::Liked
    }

    pub fn is_disliked(&self) -> bool {
        self.engagement == Engagement::Disliked
    }
}

// ============================================================================
// Feed Entries
// ============================================================================

/// One row of a paged feed: a real quote, or the marker for a page request in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    Quote(Quote),
    Placeholder,
}

impl FeedEntry {
    pub fn as_quote(&self) -> Option<&Quote> {
        match self {
            FeedEntry::Quote(q) => Some(q),
            FeedEntry::Placeholder => None,
        }
    }

    pub fn as_quote_mut(&mut self) -> Option<&mut Quote> {
        match self {
            FeedEntry::Quote(q) => Some(q),
            FeedEntry::Placeholder => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, FeedEntry::Placeholder)
    }
}

/// Which quotes a feed is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    /// Unfiltered feed of every quote.
    All,
    /// Only the listed ids. An empty set means the feed is empty.
    Ids(BTreeSet<QuoteId>),
}

impl FeedFilter {
    /// True when the filter can never match anything, so no fetch should be issued.
    pub fn is_empty(&self) -> bool {
        matches!(self, FeedFilter::Ids(ids) if ids.is_empty())
    }

    /// Comma-joined id list for the `ids` query parameter, `None` when unfiltered.
    pub fn to_query_value(&self) -> Option<String> {
        match self {
            FeedFilter::All => None,
            FeedFilter::Ids(ids) => Some(
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

// ============================================================================
// Sharing
// ============================================================================

/// Stable content reference handed to the external sharing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharePayload {
    pub quote_id: QuoteId,
    pub message: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
}

impl From<&Quote> for SharePayload {
    fn from(quote: &Quote) -> Self {
        Self {
            quote_id: quote.id,
            message: quote.content.message.clone(),
            author: quote.content.author.clone(),
            image: quote.content.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_value() {
        assert_eq!(FeedFilter::All.to_query_value(), None);
        let filter = FeedFilter::Ids([3, 1, 2].into_iter().collect());
        assert_eq!(filter.to_query_value().as_deref(), Some("1,2,3"));
    }

    #[test]
    fn test_empty_filter() {
        assert!(FeedFilter::Ids(BTreeSet::new()).is_empty());
        assert!(!FeedFilter::All.is_empty());
        assert!(!FeedFilter::Ids([7].into_iter().collect()).is_empty());
    }

    #[test]
    fn test_engage_kind_target() {
        assert_eq!(EngageKind::Like.target(), Engagement::Liked);
        assert_eq!(EngageKind::Dislike.target(), Engagement::Disliked);
        assert_eq!(EngageKind::Dislike.to_string(), "dislike");
    }
}
