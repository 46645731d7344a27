//! Optimistic mutations.
//!
//! Every mutation walks the same state machine:
//!
//! ```text
//! Idle ──► OptimisticallyApplied ──► Confirmed ──┐
//!                    │                           ├──► Settled
//!                    └─────────────► RolledBack ─┘
//! ```
//!
//! 1. Abandon in-flight fetches that could overwrite the optimistic value.
//! 2. Capture the affected cache subset, then patch the cache to look as if
//!    the write already succeeded.
//! 3. Send the remote request.
//! 4. On success merge the server's copy (it wins over the guess); on failure
//!    restore the capture verbatim.
//! 5. Either way, ask the [`InvalidationGate`] to refresh what the server may
//!    have changed beyond the patch.
//!
//! Terminal transitions (complete, cancel, won't do, delete) keep the task
//! marked departing and hold the gate while the removal animation runs, so
//! nothing refetches the task out of its list early.

pub mod plan;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

pub use plan::{CacheWrite, MutationPlan, plans};

use crate::cache::{CacheStore, keys};
use crate::config::SyncConfig;
use crate::domain::{
    AreaId, AreaUpdate, CreateAreaRequest, CreateProjectRequest, CreateTagRequest,
    CreateTaskRequest, Document, EntityPatch, ProjectId, ProjectUpdate, SortField, TagId,
    TagUpdate, TaskId, TaskPatch, TaskUpdate,
};
use crate::error::MutationError;
use crate::gate::InvalidationGate;
use crate::query::{QueryClient, RemoteResponse};

/// The phases of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationPhase {
    /// Not started.
    Idle,
    /// Optimistic writes applied, request in flight.
    OptimisticallyApplied,
    /// Server accepted the write; its copy was merged.
    Confirmed,
    /// Server rejected the write; the capture was restored.
    RolledBack,
    /// Follow-up invalidation requested.
    Settled,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::OptimisticallyApplied => "optimistically_applied",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
            Self::Settled => "settled",
        };
        formatter.write_str(name)
    }
}

/// Clears a task's departing marker when dropped, so an abandoned mutation
/// never leaves the task hidden.
struct DepartingMarker {
    gate: Arc<InvalidationGate>,
    task: TaskId,
}

impl Drop for DepartingMarker {
    fn drop(&mut self) {
        self.gate.clear_departing(self.task);
    }
}

// =============================================================================
// MutationCoordinator
// =============================================================================

/// Runs [`MutationPlan`]s against the cache, the transport and the gate.
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    client: Arc<QueryClient>,
    gate: Arc<InvalidationGate>,
    config: SyncConfig,
}

impl MutationCoordinator {
    /// Creates a coordinator sharing the gate's client and configuration.
    #[must_use]
    pub fn new(gate: Arc<InvalidationGate>) -> Self {
        Self {
            client: Arc::clone(gate.client()),
            config: *gate.config(),
            gate,
        }
    }

    /// The gate settle invalidations go through.
    #[must_use]
    pub const fn gate(&self) -> &Arc<InvalidationGate> {
        &self.gate
    }

    fn store(&self) -> &CacheStore {
        self.client.store()
    }

    /// Runs `plan` to completion.
    ///
    /// Returns once the mutation has settled; for terminal transitions that
    /// includes the departure delay.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, with uniqueness conflicts split out as
    /// [`MutationError::Conflict`]. The cache has already been restored when
    /// the error is returned.
    pub async fn execute(&self, plan: MutationPlan) -> Result<RemoteResponse, MutationError> {
        let MutationPlan {
            label,
            snapshot_prefixes,
            cancel_prefixes,
            optimistic,
            request,
            departing,
            settle,
        } = plan;
        log_phase(label, MutationPhase::Idle);

        for prefix in &cancel_prefixes {
            self.client.cancel(prefix);
        }
        let snapshot = (!optimistic.is_empty()).then(|| self.store().snapshot(&snapshot_prefixes));
        for write in &optimistic {
            self.apply(write);
        }
        let mut marker = departing.map(|task| DepartingMarker {
            gate: Arc::clone(&self.gate),
            task,
        });
        let hold = departing.map(|task| self.gate.hold_departure(task));
        log_phase(label, MutationPhase::OptimisticallyApplied);

        let outcome = self.client.transport().execute(request).await;

        match &outcome {
            Ok(response) => {
                self.reconcile(response);
                log_phase(label, MutationPhase::Confirmed);
            }
            Err(error) => {
                if let Some(snapshot) = snapshot {
                    self.store().rollback(snapshot);
                }
                drop(marker.take());
                tracing::debug!(mutation = label, error = %error, "mutation failed");
                log_phase(label, MutationPhase::RolledBack);
            }
        }

        match (hold, departing, outcome.is_ok()) {
            (Some(hold), Some(task), true) => {
                tokio::time::sleep(self.config.departure_delay()).await;
                self.gate.request_invalidation(settle);
                if self.gate.expanded_task() == Some(task) {
                    self.gate.expand_task(None);
                }
                hold.release();
                tokio::time::sleep(self.config.marker_clear_buffer()).await;
                drop(marker);
            }
            (hold, _, _) => {
                drop(hold);
                self.gate.request_invalidation(settle);
            }
        }
        log_phase(label, MutationPhase::Settled);

        outcome.map_err(MutationError::from)
    }

    fn apply(&self, write: &CacheWrite) {
        let store = self.store();
        match write {
            CacheWrite::Patch(patch) => {
                store.patch_entity_everywhere(patch);
            }
            CacheWrite::ReorderTask {
                id,
                field,
                position,
            } => {
                store.reorder_task_everywhere(*id, *field, *position);
            }
            CacheWrite::ReorderProject { id, position } => {
                store.reorder_projects_everywhere(*id, *position);
            }
            CacheWrite::ReorderArea { id, position } => {
                store.reorder_areas_everywhere(*id, *position);
            }
        }
    }

    fn reconcile(&self, response: &RemoteResponse) {
        let store = self.store();
        match response {
            RemoteResponse::Task(task) => {
                store.patch_entity_everywhere(&EntityPatch::ReplaceTask(task.clone()));
            }
            RemoteResponse::TaskDetail(detail) => {
                store.write(
                    keys::tasks::detail(detail.task.id),
                    Document::TaskDetail(detail.clone()),
                );
                store.patch_entity_everywhere(&EntityPatch::ReplaceTask(detail.task.clone()));
            }
            RemoteResponse::Project(project) => {
                store.patch_entity_everywhere(&EntityPatch::ReplaceProject(project.clone()));
            }
            RemoteResponse::Area(area) => {
                store.patch_entity_everywhere(&EntityPatch::ReplaceArea(area.clone()));
            }
            RemoteResponse::Tag(tag) => {
                store.patch_entity_everywhere(&EntityPatch::ReplaceTag(tag.clone()));
            }
            RemoteResponse::Empty => {}
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn create_task(
        &self,
        request: CreateTaskRequest,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::create_task(request)).await
    }

    /// Updates task fields.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn update_task(
        &self,
        id: TaskId,
        update: TaskUpdate,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::update_task(id, update)).await
    }

    /// Reassigns a task; `patch` may carry denormalized names.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn move_task(
        &self,
        id: TaskId,
        update: TaskUpdate,
        patch: TaskPatch,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::move_task(id, update, patch)).await
    }

    /// Completes a task.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn complete_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::complete_task(id, Utc::now())).await
    }

    /// Cancels a task.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn cancel_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::cancel_task(id, Utc::now())).await
    }

    /// Dismisses a task as won't do.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn wont_do_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::wont_do_task(id, Utc::now())).await
    }

    /// Moves a task to the trash.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn delete_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::delete_task(id, Utc::now())).await
    }

    /// Reopens a task.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn reopen_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::reopen_task(id)).await
    }

    /// Restores a task from the trash.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn restore_task(&self, id: TaskId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::restore_task(id)).await
    }

    /// Gives a task a new position key.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn reorder_task(
        &self,
        id: TaskId,
        field: SortField,
        position: f64,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::reorder_task(id, field, position)).await
    }

    // =========================================================================
    // Projects, areas, tags
    // =========================================================================

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn create_project(
        &self,
        request: CreateProjectRequest,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::create_project(request)).await
    }

    /// Updates a project, naming a new area from the cached area list.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn update_project(
        &self,
        id: ProjectId,
        update: ProjectUpdate,
    ) -> Result<RemoteResponse, MutationError> {
        let area_title = update
            .area_id
            .flatten()
            .and_then(|area_id| self.store().find_area(area_id))
            .map(|area| area.title);
        self.execute(plans::update_project(id, update, area_title))
            .await
    }

    /// Deletes a project.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn delete_project(&self, id: ProjectId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::delete_project(id)).await
    }

    /// Gives a project a new position key.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn reorder_project(
        &self,
        id: ProjectId,
        position: f64,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::reorder_project(id, position)).await
    }

    /// Creates an area.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn create_area(
        &self,
        request: CreateAreaRequest,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::create_area(request)).await
    }

    /// Updates an area.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn update_area(
        &self,
        id: AreaId,
        update: AreaUpdate,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::update_area(id, update)).await
    }

    /// Deletes an area.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn delete_area(&self, id: AreaId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::delete_area(id)).await
    }

    /// Gives an area a new position key.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn reorder_area(
        &self,
        id: AreaId,
        position: f64,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::reorder_area(id, position)).await
    }

    /// Creates a tag.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn create_tag(
        &self,
        request: CreateTagRequest,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::create_tag(request)).await
    }

    /// Updates a tag.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn update_tag(
        &self,
        id: TagId,
        update: TagUpdate,
    ) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::update_tag(id, update)).await
    }

    /// Deletes a tag.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`].
    pub async fn delete_tag(&self, id: TagId) -> Result<RemoteResponse, MutationError> {
        self.execute(plans::delete_tag(id)).await
    }
}

fn log_phase(label: &'static str, phase: MutationPhase) {
    tracing::debug!(mutation = label, phase = %phase, "mutation phase");
}
