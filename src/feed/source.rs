use crate::model::{EngageKind, FeedFilter, Quote, QuoteId};
use std::future::Future;
use thiserror::Error;

/// Errors from loading one feed page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(String),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Body was not a list of quote records
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Errors from the remote like/dislike confirmation.
#[derive(Debug, Error)]
pub enum EngageError {
    #[error("Request failed: {0}")]
    Network(String),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// The task sending the request panicked before it resolved
    #[error("Engagement task panicked: {0}")]
    TaskPanicked(String),
}

/// One page fetch as handed to a [`FeedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page index
    pub page: u32,
    pub filter: FeedFilter,
    /// Language code the quote text should be returned in (e.g. `EN`, `PT-BR`)
    pub language: String,
}

/// Paginated quote data source. An empty page signals the end of the feed.
pub trait FeedSource: Clone + Send + Sync + 'static {
    fn fetch_page(
        &self,
        query: PageQuery,
    ) -> impl Future<Output = Result<Vec<Quote>, FetchError>> + Send;
}

/// Remote confirmation of a like or dislike.
pub trait EngagementRemote: Clone + Send + Sync + 'static {
    fn engage(
        &self,
        quote_id: QuoteId,
        kind: EngageKind,
    ) -> impl Future<Output = Result<(), EngageError>> + Send;
}
