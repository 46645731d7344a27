//! Deferred invalidation.
//!
//! Refreshing a list while the user has one of its items open, or while an
//! item is animating out, makes rows jump or vanish early. The
//! [`InvalidationGate`] holds such refreshes back: while any blocking
//! condition is active, requested scopes are parked in a pending set, and the
//! set is flushed once when the last condition clears.
//!
//! # Blocking conditions
//!
//! - a task detail panel is expanded ([`InvalidationGate::expand_task`])
//! - at least one departure is held ([`InvalidationGate::hold_departure`])
//!
//! Optimistic cache patches are never gated; only refetches are.
//!
//! # Closing a panel
//!
//! When closing a panel is what unblocks the gate and scopes are pending, the
//! flush is animated: the closed task is marked departing and held for
//! [`SyncConfig::flush_animation`], the pending scopes are then invalidated,
//! and the marker is cleared [`SyncConfig::marker_clear_buffer`] later.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::cache::InvalidationScope;
use crate::config::SyncConfig;
use crate::domain::TaskId;
use crate::query::{InvalidationReport, QueryClient};

#[derive(Debug, Default)]
struct GateState {
    expanded: Option<TaskId>,
    departing: BTreeSet<TaskId>,
    holds: usize,
    pending: BTreeSet<InvalidationScope>,
}

impl GateState {
    const fn is_blocked(&self) -> bool {
        self.expanded.is_some() || self.holds > 0
    }
}

// =============================================================================
// InvalidationGate
// =============================================================================

/// Process-wide gate in front of every cache invalidation.
///
/// Shared through `Arc`; the methods that may start background work take
/// `self: &Arc<Self>`.
#[derive(Debug)]
pub struct InvalidationGate {
    client: Arc<QueryClient>,
    config: SyncConfig,
    state: Mutex<GateState>,
}

impl InvalidationGate {
    /// Creates an unblocked gate in front of `client`.
    #[must_use]
    pub fn new(client: Arc<QueryClient>, config: SyncConfig) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(GateState::default()),
        }
    }

    /// The client invalidations are forwarded to.
    #[must_use]
    pub const fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }

    /// The timing configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns `true` while any blocking condition is active.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.state.lock().is_blocked()
    }

    /// Invalidates `scopes` now, or parks them if the gate is blocked.
    ///
    /// Returns the handle of the background invalidation when one was started.
    pub fn request_invalidation(
        self: &Arc<Self>,
        scopes: impl IntoIterator<Item = InvalidationScope>,
    ) -> Option<JoinHandle<InvalidationReport>> {
        let mut state = self.state.lock();
        if state.is_blocked() {
            let before = state.pending.len();
            state.pending.extend(scopes);
            tracing::debug!(
                added = state.pending.len() - before,
                pending = state.pending.len(),
                "deferred invalidation"
            );
            return None;
        }
        drop(state);
        let scopes: Vec<InvalidationScope> = scopes.into_iter().collect();
        if scopes.is_empty() {
            return None;
        }
        self.spawn_invalidation(scopes)
    }

    /// Runs every pending invalidation once, if the gate is unblocked.
    ///
    /// Scopes covered by another pending scope are folded into it. Flushing
    /// an empty set does nothing.
    pub fn flush_pending(self: &Arc<Self>) -> Option<JoinHandle<InvalidationReport>> {
        let mut state = self.state.lock();
        if state.is_blocked() || state.pending.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut state.pending);
        drop(state);

        let scopes = collapse(&pending);
        tracing::debug!(scopes = scopes.len(), "flushing deferred invalidations");
        self.spawn_invalidation(scopes)
    }

    /// Scopes currently parked.
    #[must_use]
    pub fn pending_scopes(&self) -> Vec<InvalidationScope> {
        self.state.lock().pending.iter().cloned().collect()
    }

    // =========================================================================
    // Detail panel
    // =========================================================================

    /// Opens the detail panel for `task`, or closes it with `None`.
    pub fn expand_task(self: &Arc<Self>, task: Option<TaskId>) {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut state.expanded, task);
        let closing = previous.filter(|_| task.is_none());
        let animate = closing.is_some() && state.holds == 0 && !state.pending.is_empty();
        drop(state);

        tracing::debug!(?previous, ?task, "detail panel changed");
        if let (Some(closed), true) = (closing, animate) {
            self.spawn_animated_flush(closed);
        }
    }

    /// The task whose detail panel is open.
    #[must_use]
    pub fn expanded_task(&self) -> Option<TaskId> {
        self.state.lock().expanded
    }

    // =========================================================================
    // Departures
    // =========================================================================

    /// Marks `task` as animating out of its lists.
    pub fn mark_departing(&self, task: TaskId) {
        self.state.lock().departing.insert(task);
    }

    /// Removes the departing marker of `task`.
    pub fn clear_departing(&self, task: TaskId) {
        self.state.lock().departing.remove(&task);
    }

    /// Returns `true` if `task` is marked departing.
    #[must_use]
    pub fn is_departing(&self, task: TaskId) -> bool {
        self.state.lock().departing.contains(&task)
    }

    /// Every task currently marked departing.
    #[must_use]
    pub fn departing(&self) -> Vec<TaskId> {
        self.state.lock().departing.iter().copied().collect()
    }

    /// Marks `task` departing and blocks the gate until the returned hold is
    /// released or dropped.
    ///
    /// Releasing the last blocking condition flushes pending scopes. The
    /// departing marker outlives the hold; clear it with
    /// [`Self::clear_departing`].
    #[must_use = "dropping the hold releases it immediately"]
    pub fn hold_departure(self: &Arc<Self>, task: TaskId) -> DepartureHold {
        let mut state = self.state.lock();
        state.departing.insert(task);
        state.holds += 1;
        drop(state);
        DepartureHold {
            gate: Arc::clone(self),
            task,
            released: false,
        }
    }

    fn release_hold(self: &Arc<Self>, task: TaskId) {
        let mut state = self.state.lock();
        state.holds = state.holds.saturating_sub(1);
        let unblocked = !state.is_blocked();
        drop(state);
        tracing::debug!(%task, unblocked, "released departure hold");
        if unblocked {
            self.flush_pending();
        }
    }

    // =========================================================================
    // Background work
    // =========================================================================

    fn spawn_invalidation(
        self: &Arc<Self>,
        scopes: Vec<InvalidationScope>,
    ) -> Option<JoinHandle<InvalidationReport>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                scopes = scopes.len(),
                "no async runtime; keeping invalidations pending"
            );
            self.state.lock().pending.extend(scopes);
            return None;
        };
        let client = Arc::clone(&self.client);
        Some(runtime.spawn(async move { client.invalidate(&scopes).await }))
    }

    fn spawn_animated_flush(self: &Arc<Self>, closed: TaskId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.flush_pending();
            return;
        };
        let hold = self.hold_departure(closed);
        let gate = Arc::clone(self);
        runtime.spawn(async move {
            tokio::time::sleep(gate.config.flush_animation()).await;
            hold.release();
            tokio::time::sleep(gate.config.marker_clear_buffer()).await;
            gate.clear_departing(closed);
        });
    }
}

/// Drops scopes another scope in the set already covers.
fn collapse(scopes: &BTreeSet<InvalidationScope>) -> Vec<InvalidationScope> {
    scopes
        .iter()
        .filter(|scope| {
            !scopes
                .iter()
                .any(|other| other != *scope && other.covers(scope))
        })
        .cloned()
        .collect()
}

// =============================================================================
// DepartureHold
// =============================================================================

/// Keeps the gate blocked while a departure animation runs.
///
/// Released by [`DepartureHold::release`] or on drop.
#[derive(Debug)]
pub struct DepartureHold {
    gate: Arc<InvalidationGate>,
    task: TaskId,
    released: bool,
}

impl DepartureHold {
    /// The departing task.
    #[must_use]
    pub const fn task(&self) -> TaskId {
        self.task
    }

    /// Releases the hold now.
    pub fn release(mut self) {
        self.released = true;
        self.gate.release_hold(self.task);
    }
}

impl Drop for DepartureHold {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.gate.release_hold(self.task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;
    use rstest::rstest;

    #[rstest]
    fn test_collapse_keeps_only_outermost_scopes() {
        let id = TaskId::generate();
        let scopes: BTreeSet<_> = [
            InvalidationScope::Invalidate(keys::tasks::detail(id)),
            InvalidationScope::Invalidate(keys::tasks::all()),
            InvalidationScope::Remove(keys::tasks::detail(id)),
            InvalidationScope::Invalidate(keys::views::inbox()),
            InvalidationScope::Invalidate(keys::views::root()),
        ]
        .into_iter()
        .collect();

        let collapsed = collapse(&scopes);

        assert_eq!(
            collapsed,
            vec![
                InvalidationScope::Invalidate(keys::tasks::all()),
                InvalidationScope::Invalidate(keys::views::root()),
                InvalidationScope::Remove(keys::tasks::detail(id)),
            ]
        );
    }
}
