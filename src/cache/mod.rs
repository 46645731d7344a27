//! Client-side cache of server documents.
//!
//! - [`key`]: hierarchical keys and the [`keys`] constructors
//! - [`store`]: the document store and cross-document entity patching
//! - [`snapshot`]: capture and rollback for optimistic mutations

pub mod key;
pub mod snapshot;
pub mod store;

pub use key::{CacheKey, InvalidationScope, keys};
pub use snapshot::Snapshot;
pub use store::{CacheEntry, CacheStore};
