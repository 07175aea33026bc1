//! Local like/dislike bookkeeping.
//!
//! - [`store`] - the persisted two-set record with mutual exclusivity
//! - [`persistence`] - the injectable key/value seam and an in-memory backend
//! - [`controller`] - optimistic apply and rollback of a single action

pub mod controller;
mod persistence;
mod store;

pub use controller::{EngagementSnapshot, PendingEngagement};
pub use persistence::{MemorySets, PersistenceError, SetName, SetPersistence};
pub use store::EngagementStore;
