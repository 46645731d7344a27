//! The drag gesture controller.
//!
//! A gesture starts with [`DragController::start`], reports hovering through
//! [`DragController::hover`] and finishes with [`DragController::end`], which
//! resolves the drop target and turns the gesture into at most one kind of
//! mutation:
//!
//! | Dragged | Dropped on | Effect |
//! |---|---|---|
//! | task | row of the same list | new position key |
//! | task | row of another list | reassignment to that list's owner, then a position there |
//! | task | sidebar inbox / today / anytime / someday | schedule or unfile |
//! | task | sidebar project / area | reassignment |
//! | task | sidebar logbook / trash | completion / deletion |
//! | project | sidebar area, project row, project slot | area reassignment or reorder |
//! | area | area slot | reorder |
//!
//! Anything else, including dropping an item onto itself, is a no-op.
//!
//! A project's slot lies inside its area's sidebar row. Rows that would only
//! put a project back into the area it already belongs to are not drop
//! targets for it, so hovering its own group reorders.
//!
//! Dropping a task on a row of another list issues two mutations, the
//! reassignment and then the reorder. They are not atomic: if the reorder
//! fails, it alone is rolled back and the task stays in the new list at its
//! previous position key.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;

use crate::cache::{CacheStore, keys};
use crate::domain::{
    AreaId, Document, HeadingId, Project, ProjectId, ProjectUpdate, SortField, Task, TaskId,
    TaskPatch, TaskStatus, TaskUpdate,
};
use crate::error::MutationError;
use crate::mutation::MutationCoordinator;
use crate::position::compute_position_by;

use super::collision::{DragGeometry, DragSubject, DropCandidate, DropTarget, resolve_collision};
use super::registry::{ListOwner, ListRegistry};

/// The `when_date` value that files a task under "someday".
pub const SOMEDAY: &str = "someday";

/// The gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// What is being dragged.
    pub subject: DragSubject,
    /// The dragged task, for the overlay.
    pub task: Option<Task>,
    /// The dragged project, for the overlay.
    pub project: Option<Project>,
    /// The target currently hovered.
    pub over: Option<DropTarget>,
}

/// The mutation a finished gesture issued.
#[derive(Debug, Clone, PartialEq)]
pub enum DragAction {
    /// A task got a new position in its list.
    ReorderTask {
        /// Moved task.
        id: TaskId,
        /// The position key set.
        field: SortField,
        /// New position key.
        position: f64,
    },
    /// A task was rescheduled or reassigned.
    MoveTask {
        /// Moved task.
        id: TaskId,
        /// Fields sent to the server.
        update: TaskUpdate,
        /// The task was reopened first.
        reopened: bool,
        /// Position taken in the target list.
        placed: Option<(SortField, f64)>,
    },
    /// A task was completed.
    CompleteTask(TaskId),
    /// A task was moved to the trash.
    DeleteTask(TaskId),
    /// A project moved to another area, or out of all areas.
    ReassignProject {
        /// Moved project.
        id: ProjectId,
        /// New area.
        area: Option<AreaId>,
    },
    /// A project got a new position in its group.
    ReorderProject {
        /// Moved project.
        id: ProjectId,
        /// New position key.
        position: f64,
    },
    /// An area got a new position.
    ReorderArea {
        /// Moved area.
        id: AreaId,
        /// New position key.
        position: f64,
    },
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Nothing was changed.
    NoOp,
    /// One mutation was issued and settled.
    Applied(DragAction),
}

struct TaskMove {
    update: TaskUpdate,
    patch: TaskPatch,
}

// =============================================================================
// DragController
// =============================================================================

/// Turns drag gestures into mutations.
#[derive(Debug)]
pub struct DragController {
    coordinator: MutationCoordinator,
    registry: Arc<ListRegistry>,
    session: Mutex<Option<DragSession>>,
    today: Option<NaiveDate>,
}

impl DragController {
    /// Creates a controller issuing mutations through `coordinator`.
    #[must_use]
    pub fn new(coordinator: MutationCoordinator, registry: Arc<ListRegistry>) -> Self {
        Self {
            coordinator,
            registry,
            session: Mutex::new(None),
            today: None,
        }
    }

    /// Pins the date used for "today" drops instead of reading the clock.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The list registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ListRegistry> {
        &self.registry
    }

    /// The gesture in progress.
    #[must_use]
    pub fn session(&self) -> Option<DragSession> {
        self.session.lock().clone()
    }

    fn store(&self) -> &CacheStore {
        self.coordinator.gate().client().store()
    }

    /// Starts a gesture for the draggable identified by `active_id`.
    ///
    /// Returns `None`, leaving no session, if the id is not understood.
    pub fn start(&self, active_id: &str) -> Option<DragSubject> {
        let subject: DragSubject = match active_id.parse() {
            Ok(subject) => subject,
            Err(error) => {
                tracing::debug!(active_id, error = %error, "ignored unknown draggable");
                return None;
            }
        };
        let (task, project) = match subject {
            DragSubject::Task(id) => (self.registry.find_task(id), None),
            DragSubject::Project(id) => (None, self.store().find_project(id)),
            DragSubject::Area(_) => (None, None),
        };
        *self.session.lock() = Some(DragSession {
            subject,
            task,
            project,
            over: None,
        });
        Some(subject)
    }

    /// Records the target currently under the dragged item.
    pub fn hover(
        &self,
        geometry: &DragGeometry,
        candidates: &[DropCandidate],
    ) -> Option<DropTarget> {
        let subject = self.session.lock().as_ref()?.subject;
        let candidates = self.effective_candidates(subject, candidates);
        let over = resolve_collision(&subject, geometry, &candidates);
        if let Some(session) = self.session.lock().as_mut() {
            session.over = over;
        }
        over
    }

    /// Abandons the gesture.
    pub fn cancel(&self) {
        self.session.lock().take();
    }

    /// Finishes the gesture at `geometry` and applies its effect.
    ///
    /// # Errors
    ///
    /// Returns the failure of the issued mutation, after its rollback.
    pub async fn end(
        &self,
        geometry: &DragGeometry,
        candidates: &[DropCandidate],
    ) -> Result<DragOutcome, MutationError> {
        let Some(session) = self.session.lock().take() else {
            return Ok(DragOutcome::NoOp);
        };
        let candidates = self.effective_candidates(session.subject, candidates);
        let target = resolve_collision(&session.subject, geometry, &candidates);
        tracing::debug!(subject = %session.subject, target = ?target, "drag ended");
        let Some(target) = target else {
            return Ok(DragOutcome::NoOp);
        };
        match session.subject {
            DragSubject::Task(id) => self.drop_task(id, session.task, target).await,
            DragSubject::Project(id) => self.drop_project(id, target).await,
            DragSubject::Area(id) => self.drop_area(id, target).await,
        }
    }

    /// Filters out sidebar rows that would leave a dragged project in the area
    /// it already belongs to, so its slots underneath can take the drop.
    fn effective_candidates(
        &self,
        subject: DragSubject,
        candidates: &[DropCandidate],
    ) -> Vec<DropCandidate> {
        let DragSubject::Project(id) = subject else {
            return candidates.to_vec();
        };
        let current_area = self.store().find_project(id).and_then(|project| project.area_id);
        candidates
            .iter()
            .filter(|candidate| match candidate.target {
                DropTarget::SidebarArea(area) => Some(area) != current_area,
                DropTarget::SidebarProject(other) if other == id => false,
                DropTarget::SidebarProject(other) => self
                    .store()
                    .find_project(other)
                    .is_none_or(|other| other.area_id != current_area),
                _ => true,
            })
            .copied()
            .collect()
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    async fn drop_task(
        &self,
        id: TaskId,
        task: Option<Task>,
        target: DropTarget,
    ) -> Result<DragOutcome, MutationError> {
        let status = task.as_ref().map(|task| task.status);
        match target {
            DropTarget::ListItem(over) => self.drop_task_on_item(id, over).await,
            DropTarget::Trash => {
                self.coordinator.delete_task(id).await?;
                Ok(DragOutcome::Applied(DragAction::DeleteTask(id)))
            }
            DropTarget::Logbook if status == Some(TaskStatus::Completed) => Ok(DragOutcome::NoOp),
            DropTarget::Logbook => {
                self.coordinator.complete_task(id).await?;
                Ok(DragOutcome::Applied(DragAction::CompleteTask(id)))
            }
            DropTarget::ProjectSlot(_) | DropTarget::AreaSlot(_) => Ok(DragOutcome::NoOp),
            sidebar => {
                let Some(task_move) = self.sidebar_move(sidebar) else {
                    return Ok(DragOutcome::NoOp);
                };
                let reopen = status.is_some_and(TaskStatus::is_terminal);
                if !reopen && task.is_some_and(|task| !changes(&task_move.patch, &task)) {
                    return Ok(DragOutcome::NoOp);
                }
                if reopen {
                    self.coordinator.reopen_task(id).await?;
                }
                self.coordinator
                    .move_task(id, task_move.update.clone(), task_move.patch)
                    .await?;
                Ok(DragOutcome::Applied(DragAction::MoveTask {
                    id,
                    update: task_move.update,
                    reopened: reopen,
                    placed: None,
                }))
            }
        }
    }

    async fn drop_task_on_item(
        &self,
        id: TaskId,
        over: TaskId,
    ) -> Result<DragOutcome, MutationError> {
        if id == over {
            return Ok(DragOutcome::NoOp);
        }
        let (Some(source), Some(target)) = (
            self.registry.list_for_task(id),
            self.registry.list_for_task(over),
        ) else {
            return Ok(DragOutcome::NoOp);
        };
        let Some(index) = target.index_of(over) else {
            return Ok(DragOutcome::NoOp);
        };
        let field = target.sort_field;

        if source.list_id == target.list_id {
            let others: Vec<&Task> = source.tasks.iter().filter(|task| task.id != id).collect();
            let position = compute_position_by(&others, index, |task| task.sort_order(field));
            self.coordinator.reorder_task(id, field, position).await?;
            return Ok(DragOutcome::Applied(DragAction::ReorderTask {
                id,
                field,
                position,
            }));
        }

        let Some(task_move) = self.owner_move(target.owner) else {
            return Ok(DragOutcome::NoOp);
        };
        let position = compute_position_by(&target.tasks, index, |task| task.sort_order(field));
        self.coordinator
            .move_task(id, task_move.update.clone(), task_move.patch)
            .await?;
        self.coordinator.reorder_task(id, field, position).await?;
        Ok(DragOutcome::Applied(DragAction::MoveTask {
            id,
            update: task_move.update,
            reopened: false,
            placed: Some((field, position)),
        }))
    }

    fn sidebar_move(&self, target: DropTarget) -> Option<TaskMove> {
        match target {
            DropTarget::Inbox => self.owner_move(ListOwner::Inbox),
            DropTarget::Today => self.owner_move(ListOwner::Today),
            DropTarget::Anytime => Some(schedule(None)),
            DropTarget::Someday => Some(schedule(Some(SOMEDAY.to_string()))),
            DropTarget::SidebarProject(project) => Some(self.project_move(project, None)),
            DropTarget::SidebarArea(area) => Some(self.area_move(area)),
            DropTarget::Logbook
            | DropTarget::Trash
            | DropTarget::ProjectSlot(_)
            | DropTarget::AreaSlot(_)
            | DropTarget::ListItem(_) => None,
        }
    }

    fn owner_move(&self, owner: ListOwner) -> Option<TaskMove> {
        match owner {
            ListOwner::Inbox => Some(TaskMove {
                update: TaskUpdate {
                    project_id: Some(None),
                    area_id: Some(None),
                    when_date: Some(None),
                    ..TaskUpdate::default()
                },
                patch: TaskPatch::new()
                    .with_project(None, None)
                    .with_area(None, None)
                    .with_when_date(None),
            }),
            ListOwner::Today => {
                let today = self
                    .today
                    .unwrap_or_else(|| Utc::now().date_naive())
                    .format("%Y-%m-%d")
                    .to_string();
                Some(schedule(Some(today)))
            }
            ListOwner::Project(project) => Some(self.project_move(project, None)),
            ListOwner::Heading { project, heading } => {
                Some(self.project_move(project, Some(heading)))
            }
            ListOwner::Area(area) => Some(self.area_move(area)),
            ListOwner::Other => None,
        }
    }

    fn project_move(&self, project_id: ProjectId, heading: Option<HeadingId>) -> TaskMove {
        let project = self.store().find_project(project_id);
        let area_id = project.as_ref().and_then(|project| project.area_id);
        let area_title = area_id
            .and_then(|area_id| self.store().find_area(area_id))
            .map(|area| area.title);
        TaskMove {
            update: TaskUpdate {
                project_id: Some(Some(project_id)),
                area_id: Some(area_id),
                heading_id: Some(heading),
                ..TaskUpdate::default()
            },
            patch: TaskPatch::new()
                .with_project(Some(project_id), project.map(|project| project.title))
                .with_area(area_id, area_title)
                .with_heading(heading),
        }
    }

    fn area_move(&self, area_id: AreaId) -> TaskMove {
        let area_title = self.store().find_area(area_id).map(|area| area.title);
        TaskMove {
            update: TaskUpdate {
                project_id: Some(None),
                area_id: Some(Some(area_id)),
                heading_id: Some(None),
                ..TaskUpdate::default()
            },
            patch: TaskPatch::new()
                .with_project(None, None)
                .with_area(Some(area_id), area_title)
                .with_heading(None),
        }
    }

    // =========================================================================
    // Projects and areas
    // =========================================================================

    async fn drop_project(
        &self,
        id: ProjectId,
        target: DropTarget,
    ) -> Result<DragOutcome, MutationError> {
        let current_area = self.store().find_project(id).and_then(|project| project.area_id);
        match target {
            DropTarget::SidebarArea(area) => self.reassign_project(id, current_area, Some(area)).await,
            DropTarget::SidebarProject(other) if other != id => {
                let Some(other) = self.store().find_project(other) else {
                    return Ok(DragOutcome::NoOp);
                };
                self.reassign_project(id, current_area, other.area_id).await
            }
            DropTarget::ProjectSlot(other) if other != id => {
                let projects = self.cached_projects();
                let Some(other) = projects.iter().find(|project| project.id == other) else {
                    return Ok(DragOutcome::NoOp);
                };
                if other.area_id != current_area {
                    return self.reassign_project(id, current_area, other.area_id).await;
                }
                let group: Vec<&Project> = projects
                    .iter()
                    .filter(|project| project.area_id == current_area)
                    .collect();
                let Some(index) = group.iter().position(|project| project.id == other.id) else {
                    return Ok(DragOutcome::NoOp);
                };
                let others: Vec<&Project> =
                    group.into_iter().filter(|project| project.id != id).collect();
                let position = compute_position_by(&others, index, |project| project.sort_order);
                self.coordinator.reorder_project(id, position).await?;
                Ok(DragOutcome::Applied(DragAction::ReorderProject { id, position }))
            }
            _ => Ok(DragOutcome::NoOp),
        }
    }

    async fn reassign_project(
        &self,
        id: ProjectId,
        current: Option<AreaId>,
        area: Option<AreaId>,
    ) -> Result<DragOutcome, MutationError> {
        if current == area {
            return Ok(DragOutcome::NoOp);
        }
        let update = ProjectUpdate {
            area_id: Some(area),
            ..ProjectUpdate::default()
        };
        self.coordinator.update_project(id, update).await?;
        Ok(DragOutcome::Applied(DragAction::ReassignProject { id, area }))
    }

    async fn drop_area(&self, id: AreaId, target: DropTarget) -> Result<DragOutcome, MutationError> {
        let DropTarget::AreaSlot(other) = target else {
            return Ok(DragOutcome::NoOp);
        };
        if other == id {
            return Ok(DragOutcome::NoOp);
        }
        let mut areas = match self.store().read(&keys::areas::all()) {
            Some(Document::AreaList(list)) => list.areas,
            _ => return Ok(DragOutcome::NoOp),
        };
        areas.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        let Some(index) = areas.iter().position(|area| area.id == other) else {
            return Ok(DragOutcome::NoOp);
        };
        areas.retain(|area| area.id != id);
        let position = compute_position_by(&areas, index, |area| area.sort_order);
        self.coordinator.reorder_area(id, position).await?;
        Ok(DragOutcome::Applied(DragAction::ReorderArea { id, position }))
    }

    /// The cached project list in position order.
    fn cached_projects(&self) -> Vec<Project> {
        let mut projects = match self.store().read(&keys::projects::all()) {
            Some(Document::ProjectList(list)) => list.projects,
            _ => Vec::new(),
        };
        projects.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        projects
    }
}

fn schedule(when_date: Option<String>) -> TaskMove {
    TaskMove {
        update: TaskUpdate {
            when_date: Some(when_date.clone()),
            ..TaskUpdate::default()
        },
        patch: TaskPatch::new().with_when_date(when_date),
    }
}

/// Returns `true` if applying `patch` would change `task`.
fn changes(patch: &TaskPatch, task: &Task) -> bool {
    let mut patched = task.clone();
    patch.apply(&mut patched);
    patched != *task
}
