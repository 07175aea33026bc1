//! Incremental feed loading.
//!
//! - [`paged`] - the `PagedFeed` state machine: rows, placeholder, cursor, exhaustion
//! - [`source`] - the data-source and remote-engagement seams plus their errors

mod paged;
mod source;

pub use paged::{
    EngagementSource, FeedChange, PageOutcome, PageRequest, PagedFeed, MIN_ROWS_FOR_LOAD_MORE,
    VISIBLE_THRESHOLD,
};
pub use source::{EngageError, EngagementRemote, FeedSource, FetchError, PageQuery};
