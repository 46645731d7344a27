//! # tasklane
//!
//! The optimistic mutation and cache reconciliation engine of a personal task
//! manager client.
//!
//! ## Overview
//!
//! A client holds an in-memory cache of server documents (views such as
//! "today" and "inbox", project and area documents, task lists and details).
//! That cache changes from four directions at once:
//!
//! - **User mutations**: edit, complete, delete, drag-reorder, drag-reassign
//! - **Server responses** to those mutations
//! - **Push events** from other sessions
//! - **Transient UI state** (an open detail panel, a departure animation) that
//!   must hold back refreshes
//!
//! This crate keeps the cache consistent under all four:
//!
//! - [`position`]: fractional ordering keys for drag-and-drop
//! - [`cache`]: keyed document store, cross-document entity patching, snapshots
//! - [`query`]: the fetch layer over an external [`query::Transport`]
//! - [`gate`]: deferral of invalidations while the UI must stay frozen
//! - [`mutation`]: snapshot, optimistic patch, remote call, reconcile or roll back
//! - [`events`]: push-event to invalidation-scope mapping
//! - [`drag`]: collision resolution and drag gesture dispatch
//!
//! ## Example
//!
//! ```rust
//! use tasklane::position::compute_position;
//!
//! // Moving an item to the end of `[2048.0]` leaves headroom for appends.
//! assert_eq!(compute_position(&[2048.0], 1), 3072.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the types most embedding applications touch.
///
/// # Usage
///
/// ```rust
/// use tasklane::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{CacheKey, CacheStore, InvalidationScope, Snapshot, keys};
    pub use crate::config::SyncConfig;
    pub use crate::domain::*;
    pub use crate::drag::{
        DragController, DragGeometry, DragSubject, DropCandidate, DropTarget, ListOwner,
        ListRegistry,
    };
    pub use crate::error::{ConflictError, MutationError, TransportError};
    pub use crate::events::{EventInvalidator, PushChannel, PushEvent};
    pub use crate::gate::InvalidationGate;
    pub use crate::mutation::{MutationCoordinator, MutationPlan};
    pub use crate::position::compute_position;
    pub use crate::query::{QueryClient, Transport};
}

pub mod cache;
pub mod config;
pub mod domain;
pub mod drag;
pub mod error;
pub mod events;
pub mod gate;
pub mod mutation;
pub mod position;
pub mod preferences;
pub mod query;
pub mod telemetry;
