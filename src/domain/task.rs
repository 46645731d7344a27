//! Task domain model.
//!
//! Tasks are the entity that appears most redundantly across the cache: the
//! same task may be embedded in the "today" view, in its project document, in
//! a tag's task list and in its own detail record at the same time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AreaId, HeadingId, ProjectId, TagId, TaskId};

// =============================================================================
// Enums
// =============================================================================

/// The status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is still to be done.
    #[default]
    Open,
    /// Task has been completed.
    Completed,
    /// Task has been canceled.
    Canceled,
    /// Task was dismissed as "won't do".
    WontDo,
}

impl TaskStatus {
    /// Returns `true` if the status removes the task from active lists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(formatter, "open"),
            Self::Completed => write!(formatter, "completed"),
            Self::Canceled => write!(formatter, "canceled"),
            Self::WontDo => write!(formatter, "wont_do"),
        }
    }
}

/// Which of a task's position keys orders a given list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    /// Ordering within the "today" list.
    #[serde(rename = "sort_order_today")]
    Today,
    /// Ordering within a project.
    #[serde(rename = "sort_order_project")]
    Project,
    /// Ordering within a heading.
    #[serde(rename = "sort_order_heading")]
    Heading,
}

// =============================================================================
// Embedded references
// =============================================================================

/// A tag as embedded inside tasks and projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag identity.
    pub id: TagId,
    /// Tag title.
    pub title: String,
    /// Optional display color.
    #[serde(default)]
    pub color: Option<String>,
}

/// A lightweight `{id, title}` reference.
///
/// These carry an id but are not entity instances: cross-document patching
/// never touches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef<Id> {
    /// Referenced identity.
    pub id: Id,
    /// Referenced title.
    pub title: String,
}

// =============================================================================
// Task
// =============================================================================

/// A task as returned by every list and view endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identity.
    pub id: TaskId,
    /// Title.
    pub title: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Status discriminator.
    pub status: TaskStatus,
    /// Scheduled date (`YYYY-MM-DD`) or the literal `"someday"`.
    #[serde(default)]
    pub when_date: Option<String>,
    /// Scheduled for this evening.
    #[serde(default)]
    pub when_evening: bool,
    /// Flagged as high priority.
    #[serde(default)]
    pub high_priority: bool,
    /// Deadline date.
    #[serde(default)]
    pub deadline: Option<String>,
    /// Owning project.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Owning area.
    #[serde(default)]
    pub area_id: Option<AreaId>,
    /// Heading inside the owning project.
    #[serde(default)]
    pub heading_id: Option<HeadingId>,
    /// Position key in the "today" list.
    #[serde(default)]
    pub sort_order_today: f64,
    /// Position key in the project list.
    #[serde(default)]
    pub sort_order_project: f64,
    /// Position key in the heading list.
    #[serde(default)]
    pub sort_order_heading: f64,
    /// Completion timestamp.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Cancellation timestamp (also set for "won't do").
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    /// Soft-deletion timestamp.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Attached tags.
    #[serde(default)]
    pub tags: Vec<TagRef>,
    /// Number of checklist items.
    #[serde(default)]
    pub checklist_count: u32,
    /// Number of completed checklist items.
    #[serde(default)]
    pub checklist_done: u32,
    /// Whether notes are non-empty.
    #[serde(default)]
    pub has_notes: bool,
    /// Whether link attachments exist.
    #[serde(default)]
    pub has_links: bool,
    /// Whether file attachments exist.
    #[serde(default)]
    pub has_files: bool,
    /// Whether a repeat rule exists.
    #[serde(default)]
    pub has_repeat_rule: bool,
    /// Denormalized project title.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Denormalized area title.
    #[serde(default)]
    pub area_name: Option<String>,
}

impl Task {
    /// Creates an open task with default positions and no relations.
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            notes: String::new(),
            status: TaskStatus::Open,
            when_date: None,
            when_evening: false,
            high_priority: false,
            deadline: None,
            project_id: None,
            area_id: None,
            heading_id: None,
            sort_order_today: 0.0,
            sort_order_project: 0.0,
            sort_order_heading: 0.0,
            completed_at: None,
            canceled_at: None,
            deleted_at: None,
            created_at: timestamp,
            updated_at: timestamp,
            tags: Vec::new(),
            checklist_count: 0,
            checklist_done: 0,
            has_notes: false,
            has_links: false,
            has_files: false,
            has_repeat_rule: false,
            project_name: None,
            area_name: None,
        }
    }

    /// Returns a new task with the given status.
    #[must_use]
    pub fn with_status(self, status: TaskStatus) -> Self {
        Self { status, ..self }
    }

    /// Returns a new task with the given project.
    #[must_use]
    pub fn with_project(self, project_id: ProjectId) -> Self {
        Self {
            project_id: Some(project_id),
            ..self
        }
    }

    /// Returns a new task with the given area.
    #[must_use]
    pub fn with_area(self, area_id: AreaId) -> Self {
        Self {
            area_id: Some(area_id),
            ..self
        }
    }

    /// Returns a new task with the position key for `field` set.
    #[must_use]
    pub fn with_sort_order(mut self, field: SortField, position: f64) -> Self {
        self.set_sort_order(field, position);
        self
    }

    /// Reads the position key that orders lists sorted by `field`.
    #[must_use]
    pub const fn sort_order(&self, field: SortField) -> f64 {
        match field {
            SortField::Today => self.sort_order_today,
            SortField::Project => self.sort_order_project,
            SortField::Heading => self.sort_order_heading,
        }
    }

    /// Writes the position key that orders lists sorted by `field`.
    pub const fn set_sort_order(&mut self, field: SortField, position: f64) {
        match field {
            SortField::Today => self.sort_order_today = position,
            SortField::Project => self.sort_order_project = position,
            SortField::Heading => self.sort_order_heading = position,
        }
    }
}

// =============================================================================
// Task detail
// =============================================================================

/// A checklist item inside a task detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Item identity.
    pub id: uuid::Uuid,
    /// Item text.
    pub title: String,
    /// Whether the item is checked.
    pub completed: bool,
    /// Position key.
    pub sort_order: f64,
}

/// The detail record of a single task.
///
/// Repeat rules and attachments are carried as raw JSON: nothing in this crate
/// reconciles them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    /// The embedded task fields.
    #[serde(flatten)]
    pub task: Task,
    /// Owning project reference.
    #[serde(default)]
    pub project: Option<NamedRef<ProjectId>>,
    /// Owning area reference.
    #[serde(default)]
    pub area: Option<NamedRef<AreaId>>,
    /// Owning heading reference.
    #[serde(default)]
    pub heading: Option<NamedRef<HeadingId>>,
    /// Checklist items.
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
    /// Repeat rule.
    #[serde(default)]
    pub repeat_rule: Option<serde_json::Value>,
}

impl TaskDetail {
    /// Wraps a task in a detail record with no extra relations.
    #[must_use]
    pub const fn from_task(task: Task) -> Self {
        Self {
            task,
            project: None,
            area: None,
            heading: None,
            checklist: Vec::new(),
            attachments: Vec::new(),
            repeat_rule: None,
        }
    }
}
