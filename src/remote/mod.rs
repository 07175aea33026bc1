//! HTTP transport for the quote API.
//!
//! [`QuoteApi`] implements both [`crate::feed::FeedSource`] and
//! [`crate::feed::EngagementRemote`] over reqwest.

mod client;
mod wire;

pub use client::QuoteApi;
