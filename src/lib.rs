//! Infinite quote-card feed with optimistic like/dislike reconciliation.
//!
//! - [`feed`] - paged loading with a tail placeholder while a request is in flight
//! - [`engagement`] - persisted liked/disliked sets and optimistic apply/rollback
//! - [`session`] - the single sequence tying scrolls, taps, and network results together
//! - [`remote`] - HTTP client for the quote API
//! - [`storage`] - SQLite persistence for engagement sets and preferences

pub mod config;
pub mod engagement;
pub mod feed;
pub mod model;
pub mod remote;
pub mod session;
pub mod storage;
