//! Partial field updates applied to embedded entity copies.
//!
//! A patch names only the fields it changes. Nullable fields use
//! `Option<Option<T>>`: the outer `None` means "leave alone", `Some(None)`
//! means "clear".

use chrono::{DateTime, Utc};

use super::ids::{AreaId, EntityRef, HeadingId, ProjectId, TagId, TaskId};
use super::organize::{Area, Project, ProjectStatus, Tag};
use super::task::{NamedRef, Task, TaskStatus};

// =============================================================================
// TaskPatch
// =============================================================================

/// Partial update of a [`Task`].
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::option_option)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New notes.
    pub notes: Option<String>,
    /// New status.
    pub status: Option<TaskStatus>,
    /// New scheduled date.
    pub when_date: Option<Option<String>>,
    /// New evening flag.
    pub when_evening: Option<bool>,
    /// New priority flag.
    pub high_priority: Option<bool>,
    /// New deadline.
    pub deadline: Option<Option<String>>,
    /// New project.
    pub project_id: Option<Option<ProjectId>>,
    /// New denormalized project title.
    pub project_name: Option<Option<String>>,
    /// New area.
    pub area_id: Option<Option<AreaId>>,
    /// New denormalized area title.
    pub area_name: Option<Option<String>>,
    /// New heading.
    pub heading_id: Option<Option<HeadingId>>,
    /// New completion timestamp.
    pub completed_at: Option<Option<DateTime<Utc>>>,
    /// New cancellation timestamp.
    pub canceled_at: Option<Option<DateTime<Utc>>>,
    /// New deletion timestamp.
    pub deleted_at: Option<Option<DateTime<Utc>>>,
    /// New notes flag.
    pub has_notes: Option<bool>,
    /// New links flag.
    pub has_links: Option<bool>,
    /// New files flag.
    pub has_files: Option<bool>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets or clears the completion timestamp.
    #[must_use]
    pub const fn with_completed_at(mut self, completed_at: Option<DateTime<Utc>>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    /// Sets or clears the cancellation timestamp.
    #[must_use]
    pub const fn with_canceled_at(mut self, canceled_at: Option<DateTime<Utc>>) -> Self {
        self.canceled_at = Some(canceled_at);
        self
    }

    /// Sets or clears the deletion timestamp.
    #[must_use]
    pub const fn with_deleted_at(mut self, deleted_at: Option<DateTime<Utc>>) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    /// Sets or clears the scheduled date.
    #[must_use]
    pub fn with_when_date(mut self, when_date: Option<String>) -> Self {
        self.when_date = Some(when_date);
        self
    }

    /// Sets or clears the project along with its denormalized title.
    #[must_use]
    pub fn with_project(mut self, project_id: Option<ProjectId>, title: Option<String>) -> Self {
        self.project_id = Some(project_id);
        self.project_name = Some(title);
        self
    }

    /// Sets or clears the area along with its denormalized title.
    #[must_use]
    pub fn with_area(mut self, area_id: Option<AreaId>, title: Option<String>) -> Self {
        self.area_id = Some(area_id);
        self.area_name = Some(title);
        self
    }

    /// Sets or clears the heading.
    #[must_use]
    pub const fn with_heading(mut self, heading_id: Option<HeadingId>) -> Self {
        self.heading_id = Some(heading_id);
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Merges the patch into `task`, touching only the named fields.
    pub fn apply(&self, task: &mut Task) {
        fn assign<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        assign(&mut task.title, self.title.as_ref());
        assign(&mut task.notes, self.notes.as_ref());
        assign(&mut task.status, self.status.as_ref());
        assign(&mut task.when_date, self.when_date.as_ref());
        assign(&mut task.when_evening, self.when_evening.as_ref());
        assign(&mut task.high_priority, self.high_priority.as_ref());
        assign(&mut task.deadline, self.deadline.as_ref());
        assign(&mut task.project_id, self.project_id.as_ref());
        assign(&mut task.project_name, self.project_name.as_ref());
        assign(&mut task.area_id, self.area_id.as_ref());
        assign(&mut task.area_name, self.area_name.as_ref());
        assign(&mut task.heading_id, self.heading_id.as_ref());
        assign(&mut task.completed_at, self.completed_at.as_ref());
        assign(&mut task.canceled_at, self.canceled_at.as_ref());
        assign(&mut task.deleted_at, self.deleted_at.as_ref());
        assign(&mut task.has_notes, self.has_notes.as_ref());
        assign(&mut task.has_links, self.has_links.as_ref());
        assign(&mut task.has_files, self.has_files.as_ref());
    }
}

// =============================================================================
// Organizer patches
// =============================================================================

/// Partial update of a [`Project`].
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::option_option)]
pub struct ProjectPatch {
    /// New title.
    pub title: Option<String>,
    /// New notes.
    pub notes: Option<String>,
    /// New status.
    pub status: Option<ProjectStatus>,
    /// New area, with its reference.
    pub area: Option<Option<NamedRef<AreaId>>>,
    /// New area id when the area title is unknown.
    pub area_id: Option<Option<AreaId>>,
    /// New position key.
    pub sort_order: Option<f64>,
}

impl ProjectPatch {
    /// Moves the project into `area_id`; `title` fills the embedded reference
    /// when known.
    #[must_use]
    pub fn reassign(area_id: Option<AreaId>, title: Option<String>) -> Self {
        let area = match (area_id, title) {
            (Some(id), Some(title)) => Some(NamedRef { id, title }),
            _ => None,
        };
        Self {
            area_id: Some(area_id),
            area: Some(area),
            ..Self::default()
        }
    }

    /// Merges the patch into `project`.
    pub fn apply(&self, project: &mut Project) {
        if let Some(title) = &self.title {
            project.title.clone_from(title);
        }
        if let Some(notes) = &self.notes {
            project.notes.clone_from(notes);
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(area_id) = self.area_id {
            project.area_id = area_id;
        }
        if let Some(area) = &self.area {
            project.area.clone_from(area);
        }
        if let Some(sort_order) = self.sort_order {
            project.sort_order = sort_order;
        }
    }
}

/// Partial update of an [`Area`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaPatch {
    /// New title.
    pub title: Option<String>,
    /// New position key.
    pub sort_order: Option<f64>,
}

impl AreaPatch {
    /// Merges the patch into `area`.
    pub fn apply(&self, area: &mut Area) {
        if let Some(title) = &self.title {
            area.title.clone_from(title);
        }
        if let Some(sort_order) = self.sort_order {
            area.sort_order = sort_order;
        }
    }
}

/// Partial update of a [`Tag`].
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::option_option)]
pub struct TagPatch {
    /// New title.
    pub title: Option<String>,
    /// New color.
    pub color: Option<Option<String>>,
    /// New parent.
    pub parent_tag_id: Option<Option<TagId>>,
    /// New position key.
    pub sort_order: Option<f64>,
}

impl TagPatch {
    /// Merges the patch into `tag`.
    pub fn apply(&self, tag: &mut Tag) {
        if let Some(title) = &self.title {
            tag.title.clone_from(title);
        }
        if let Some(color) = &self.color {
            tag.color.clone_from(color);
        }
        if let Some(parent) = self.parent_tag_id {
            tag.parent_tag_id = parent;
        }
        if let Some(sort_order) = self.sort_order {
            tag.sort_order = sort_order;
        }
    }
}

// =============================================================================
// EntityPatch
// =============================================================================

/// A patch addressed to one entity identity.
///
/// The `Replace*` variants carry a full authoritative copy returned by the
/// server; they overwrite every embedded copy wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPatch {
    /// Partial task update.
    Task(TaskId, TaskPatch),
    /// Authoritative task.
    ReplaceTask(Task),
    /// Partial project update.
    Project(ProjectId, ProjectPatch),
    /// Authoritative project.
    ReplaceProject(Project),
    /// Partial area update.
    Area(AreaId, AreaPatch),
    /// Authoritative area.
    ReplaceArea(Area),
    /// Partial tag update.
    Tag(TagId, TagPatch),
    /// Authoritative tag.
    ReplaceTag(Tag),
}

impl EntityPatch {
    /// The entity this patch is addressed to.
    #[must_use]
    pub const fn target(&self) -> EntityRef {
        match self {
            Self::Task(id, _) => EntityRef::Task(*id),
            Self::ReplaceTask(task) => EntityRef::Task(task.id),
            Self::Project(id, _) => EntityRef::Project(*id),
            Self::ReplaceProject(project) => EntityRef::Project(project.id),
            Self::Area(id, _) => EntityRef::Area(*id),
            Self::ReplaceArea(area) => EntityRef::Area(area.id),
            Self::Tag(id, _) => EntityRef::Tag(*id),
            Self::ReplaceTag(tag) => EntityRef::Tag(tag.id),
        }
    }
}
