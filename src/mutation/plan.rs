//! Declarative descriptions of mutations.
//!
//! A [`MutationPlan`] lists everything the coordinator does around one
//! remote write: which fetches to abandon, which cache subset to capture,
//! which optimistic writes to apply, which task departs, and which scopes to
//! refresh once the write settles. The [`plans`] module builds the plan for
//! every mutation the application issues.

use chrono::{DateTime, Utc};

use crate::cache::{CacheKey, InvalidationScope, keys};
use crate::domain::{AreaId, EntityPatch, ProjectId, SortField, TaskId};
use crate::query::RemoteRequest;

/// One optimistic cache write.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheWrite {
    /// Patch every embedded copy of an entity.
    Patch(EntityPatch),
    /// Set a task's position key and re-sort the view lists holding it.
    ReorderTask {
        /// Moved task.
        id: TaskId,
        /// Position key being set.
        field: SortField,
        /// New position.
        position: f64,
    },
    /// Set a project's position key and re-sort project lists.
    ReorderProject {
        /// Moved project.
        id: ProjectId,
        /// New position.
        position: f64,
    },
    /// Set an area's position key and re-sort area lists.
    ReorderArea {
        /// Moved area.
        id: AreaId,
        /// New position.
        position: f64,
    },
}

/// Everything the coordinator needs to run one mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPlan {
    /// Operation name used in logs.
    pub label: &'static str,
    /// Prefixes captured before the optimistic writes.
    pub snapshot_prefixes: Vec<CacheKey>,
    /// Prefixes whose in-flight fetches are abandoned first.
    pub cancel_prefixes: Vec<CacheKey>,
    /// Optimistic writes, applied in order.
    pub optimistic: Vec<CacheWrite>,
    /// The remote write.
    pub request: RemoteRequest,
    /// Task animated out of its lists, for terminal transitions.
    pub departing: Option<TaskId>,
    /// Scopes refreshed once the write settles.
    pub settle: Vec<InvalidationScope>,
}

impl MutationPlan {
    /// Creates a plan that only sends `request`.
    #[must_use]
    pub fn new(request: RemoteRequest) -> Self {
        Self {
            label: request.label(),
            snapshot_prefixes: Vec::new(),
            cancel_prefixes: Vec::new(),
            optimistic: Vec::new(),
            request,
            departing: None,
            settle: Vec::new(),
        }
    }

    /// Adds an optimistic write; the entity roots are captured beforehand.
    #[must_use]
    pub fn with_write(mut self, write: CacheWrite) -> Self {
        if self.snapshot_prefixes.is_empty() {
            self.snapshot_prefixes = keys::entity_roots().to_vec();
        }
        self.optimistic.push(write);
        self
    }

    /// Abandons in-flight fetches under `prefix` before writing.
    #[must_use]
    pub fn with_cancel(mut self, prefix: CacheKey) -> Self {
        self.cancel_prefixes.push(prefix);
        self
    }

    /// Marks `task` as departing for the duration of the mutation.
    #[must_use]
    pub const fn with_departing(mut self, task: TaskId) -> Self {
        self.departing = Some(task);
        self
    }

    /// Invalidates each of `prefixes` on settle.
    #[must_use]
    pub fn with_settle<I>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = CacheKey>,
    {
        self.settle
            .extend(prefixes.into_iter().map(InvalidationScope::Invalidate));
        self
    }

    /// Returns `true` if the plan writes to the cache before the request.
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        !self.optimistic.is_empty()
    }
}

/// Plan constructors for every mutation the application issues.
///
/// Timestamps for optimistic status changes are passed in so plans stay
/// deterministic.
pub mod plans {
    use super::{CacheWrite, DateTime, MutationPlan, Utc, keys};
    use crate::domain::{
        AreaId, AreaUpdate, CreateAreaRequest, CreateProjectRequest, CreateTagRequest,
        CreateTaskRequest, EntityPatch, ProjectId, ProjectUpdate, ReorderItem,
        SimpleReorderItem, SortField, TagId, TagUpdate, TaskId, TaskPatch, TaskStatus,
        TaskUpdate,
    };
    use crate::query::RemoteRequest;

    fn task_settle(plan: MutationPlan) -> MutationPlan {
        plan.with_settle([
            keys::views::root(),
            keys::tasks::all(),
            keys::projects::all(),
            keys::areas::all(),
        ])
    }

    fn terminal(id: TaskId, request: RemoteRequest, patch: TaskPatch) -> MutationPlan {
        task_settle(
            MutationPlan::new(request)
                .with_cancel(keys::views::root())
                .with_write(CacheWrite::Patch(EntityPatch::Task(id, patch)))
                .with_departing(id),
        )
    }

    // -------------------------------------------------------------------------
    // Tasks
    // -------------------------------------------------------------------------

    /// Creates a task. Nothing is written before the server answers.
    #[must_use]
    pub fn create_task(request: CreateTaskRequest) -> MutationPlan {
        task_settle(MutationPlan::new(RemoteRequest::CreateTask(request)))
            .with_settle([keys::tags::all()])
    }

    /// Updates task fields.
    #[must_use]
    pub fn update_task(id: TaskId, update: TaskUpdate) -> MutationPlan {
        let patch = update.to_patch();
        task_settle(
            MutationPlan::new(RemoteRequest::UpdateTask(id, update))
                .with_cancel(keys::views::root())
                .with_cancel(keys::tasks::detail(id))
                .with_write(CacheWrite::Patch(EntityPatch::Task(id, patch))),
        )
        .with_settle([keys::tags::all()])
    }

    /// Moves a task to another project, area or schedule.
    ///
    /// `patch` is the optimistic patch, which may carry denormalized names the
    /// request itself does not.
    #[must_use]
    pub fn move_task(id: TaskId, update: TaskUpdate, patch: TaskPatch) -> MutationPlan {
        MutationPlan {
            label: "move_task",
            ..task_settle(
                MutationPlan::new(RemoteRequest::UpdateTask(id, update))
                    .with_cancel(keys::views::root())
                    .with_cancel(keys::tasks::all())
                    .with_write(CacheWrite::Patch(EntityPatch::Task(id, patch))),
            )
        }
    }

    /// Completes a task.
    #[must_use]
    pub fn complete_task(id: TaskId, now: DateTime<Utc>) -> MutationPlan {
        terminal(
            id,
            RemoteRequest::CompleteTask(id),
            TaskPatch::new()
                .with_status(TaskStatus::Completed)
                .with_completed_at(Some(now)),
        )
    }

    /// Cancels a task.
    #[must_use]
    pub fn cancel_task(id: TaskId, now: DateTime<Utc>) -> MutationPlan {
        terminal(
            id,
            RemoteRequest::CancelTask(id),
            TaskPatch::new()
                .with_status(TaskStatus::Canceled)
                .with_canceled_at(Some(now)),
        )
    }

    /// Dismisses a task as won't do.
    #[must_use]
    pub fn wont_do_task(id: TaskId, now: DateTime<Utc>) -> MutationPlan {
        terminal(
            id,
            RemoteRequest::WontDoTask(id),
            TaskPatch::new()
                .with_status(TaskStatus::WontDo)
                .with_canceled_at(Some(now)),
        )
    }

    /// Moves a task to the trash.
    #[must_use]
    pub fn delete_task(id: TaskId, now: DateTime<Utc>) -> MutationPlan {
        terminal(
            id,
            RemoteRequest::DeleteTask(id),
            TaskPatch::new().with_deleted_at(Some(now)),
        )
    }

    /// Reopens a completed, canceled or dismissed task.
    #[must_use]
    pub fn reopen_task(id: TaskId) -> MutationPlan {
        task_settle(
            MutationPlan::new(RemoteRequest::ReopenTask(id))
                .with_cancel(keys::views::root())
                .with_write(CacheWrite::Patch(EntityPatch::Task(
                    id,
                    TaskPatch::new()
                        .with_status(TaskStatus::Open)
                        .with_completed_at(None)
                        .with_canceled_at(None),
                ))),
        )
    }

    /// Restores a task from the trash. Nothing is written before the server
    /// answers.
    #[must_use]
    pub fn restore_task(id: TaskId) -> MutationPlan {
        task_settle(MutationPlan::new(RemoteRequest::RestoreTask(id)))
    }

    /// Gives a task a new position key within lists ordered by `field`.
    #[must_use]
    pub fn reorder_task(id: TaskId, field: SortField, position: f64) -> MutationPlan {
        MutationPlan::new(RemoteRequest::ReorderTasks(vec![ReorderItem {
            id,
            sort_field: field,
            sort_order: position,
        }]))
        .with_cancel(keys::views::root())
        .with_write(CacheWrite::ReorderTask {
            id,
            field,
            position,
        })
        .with_settle([keys::views::root()])
    }

    // -------------------------------------------------------------------------
    // Projects
    // -------------------------------------------------------------------------

    /// Creates a project.
    #[must_use]
    pub fn create_project(request: CreateProjectRequest) -> MutationPlan {
        MutationPlan::new(RemoteRequest::CreateProject(request))
            .with_settle([keys::projects::all(), keys::areas::all()])
    }

    /// Updates project fields; `area_title` names the new area when known.
    #[must_use]
    pub fn update_project(
        id: ProjectId,
        update: ProjectUpdate,
        area_title: Option<String>,
    ) -> MutationPlan {
        let patch = update.to_patch(area_title);
        let reassigning = update.area_id.is_some();
        let plan = MutationPlan::new(RemoteRequest::UpdateProject(id, update))
            .with_write(CacheWrite::Patch(EntityPatch::Project(id, patch)))
            .with_settle([
                keys::projects::all(),
                keys::areas::all(),
                keys::views::root(),
            ]);
        if reassigning {
            plan.with_cancel(keys::projects::all())
                .with_cancel(keys::areas::all())
        } else {
            plan
        }
    }

    /// Deletes a project.
    #[must_use]
    pub fn delete_project(id: ProjectId) -> MutationPlan {
        MutationPlan::new(RemoteRequest::DeleteProject(id)).with_settle([
            keys::projects::all(),
            keys::areas::all(),
            keys::views::root(),
        ])
    }

    /// Gives a project a new position key.
    #[must_use]
    pub fn reorder_project(id: ProjectId, position: f64) -> MutationPlan {
        MutationPlan::new(RemoteRequest::ReorderProjects(vec![SimpleReorderItem {
            id,
            sort_order: position,
        }]))
        .with_cancel(keys::projects::all())
        .with_write(CacheWrite::ReorderProject { id, position })
        .with_settle([keys::projects::all(), keys::areas::all()])
    }

    // -------------------------------------------------------------------------
    // Areas
    // -------------------------------------------------------------------------

    /// Creates an area.
    #[must_use]
    pub fn create_area(request: CreateAreaRequest) -> MutationPlan {
        MutationPlan::new(RemoteRequest::CreateArea(request)).with_settle([keys::areas::all()])
    }

    /// Updates area fields.
    #[must_use]
    pub fn update_area(id: AreaId, update: AreaUpdate) -> MutationPlan {
        let patch = update.to_patch();
        MutationPlan::new(RemoteRequest::UpdateArea(id, update))
            .with_write(CacheWrite::Patch(EntityPatch::Area(id, patch)))
            .with_settle([keys::areas::all()])
    }

    /// Deletes an area.
    #[must_use]
    pub fn delete_area(id: AreaId) -> MutationPlan {
        MutationPlan::new(RemoteRequest::DeleteArea(id)).with_settle([
            keys::areas::all(),
            keys::projects::all(),
            keys::views::root(),
        ])
    }

    /// Gives an area a new position key.
    #[must_use]
    pub fn reorder_area(id: AreaId, position: f64) -> MutationPlan {
        MutationPlan::new(RemoteRequest::ReorderAreas(vec![SimpleReorderItem {
            id,
            sort_order: position,
        }]))
        .with_cancel(keys::areas::all())
        .with_write(CacheWrite::ReorderArea { id, position })
        .with_settle([keys::areas::all()])
    }

    // -------------------------------------------------------------------------
    // Tags
    // -------------------------------------------------------------------------

    /// Creates a tag.
    #[must_use]
    pub fn create_tag(request: CreateTagRequest) -> MutationPlan {
        MutationPlan::new(RemoteRequest::CreateTag(request))
            .with_settle([keys::tags::all(), keys::views::root()])
    }

    /// Updates tag fields.
    #[must_use]
    pub fn update_tag(id: TagId, update: TagUpdate) -> MutationPlan {
        let patch = update.to_patch();
        MutationPlan::new(RemoteRequest::UpdateTag(id, update))
            .with_write(CacheWrite::Patch(EntityPatch::Tag(id, patch)))
            .with_settle([keys::tags::all(), keys::views::root()])
    }

    /// Deletes a tag.
    #[must_use]
    pub fn delete_tag(id: TagId) -> MutationPlan {
        MutationPlan::new(RemoteRequest::DeleteTag(id))
            .with_settle([keys::tags::all(), keys::views::root()])
    }
}
