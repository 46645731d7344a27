//! Projects, areas and tags: the entities tasks are organized under.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AreaId, ProjectId, TagId};
use super::task::{NamedRef, TagRef};

/// The status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Project is active.
    #[default]
    Open,
    /// Project has been completed.
    Completed,
    /// Project has been canceled.
    Canceled,
}

/// A project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identity.
    pub id: ProjectId,
    /// Title.
    pub title: String,
    /// Notes.
    #[serde(default)]
    pub notes: String,
    /// Owning area.
    #[serde(default)]
    pub area_id: Option<AreaId>,
    /// Owning area reference (denormalized).
    #[serde(default)]
    pub area: Option<NamedRef<AreaId>>,
    /// Status discriminator.
    pub status: ProjectStatus,
    /// Scheduled date.
    #[serde(default)]
    pub when_date: Option<String>,
    /// Deadline date.
    #[serde(default)]
    pub deadline: Option<String>,
    /// Position key among sibling projects.
    #[serde(default)]
    pub sort_order: f64,
    /// Number of open tasks.
    #[serde(default)]
    pub task_count: u32,
    /// Number of completed tasks.
    #[serde(default)]
    pub completed_task_count: u32,
    /// Attached tags.
    #[serde(default)]
    pub tags: Vec<TagRef>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates an open project without an area.
    #[must_use]
    pub fn new(id: ProjectId, title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            notes: String::new(),
            area_id: None,
            area: None,
            status: ProjectStatus::Open,
            when_date: None,
            deadline: None,
            sort_order: 0.0,
            task_count: 0,
            completed_task_count: 0,
            tags: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns a new project placed in the given area.
    #[must_use]
    pub fn with_area(self, area_id: AreaId) -> Self {
        Self {
            area_id: Some(area_id),
            ..self
        }
    }

    /// Returns a new project with the given position key.
    #[must_use]
    pub fn with_sort_order(self, sort_order: f64) -> Self {
        Self { sort_order, ..self }
    }
}

/// An area of responsibility grouping projects and loose tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Stable identity.
    pub id: AreaId,
    /// Title.
    pub title: String,
    /// Position key among sibling areas.
    #[serde(default)]
    pub sort_order: f64,
    /// Number of projects.
    #[serde(default)]
    pub project_count: u32,
    /// Number of tasks.
    #[serde(default)]
    pub task_count: u32,
    /// Number of tasks not inside a project.
    #[serde(default)]
    pub standalone_task_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Area {
    /// Creates an empty area.
    #[must_use]
    pub fn new(id: AreaId, title: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            sort_order: 0.0,
            project_count: 0,
            task_count: 0,
            standalone_task_count: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns a new area with the given position key.
    #[must_use]
    pub fn with_sort_order(self, sort_order: f64) -> Self {
        Self { sort_order, ..self }
    }
}

/// A tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Stable identity.
    pub id: TagId,
    /// Title.
    pub title: String,
    /// Display color.
    #[serde(default)]
    pub color: Option<String>,
    /// Parent tag for nested tags.
    #[serde(default)]
    pub parent_tag_id: Option<TagId>,
    /// Position key among sibling tags.
    #[serde(default)]
    pub sort_order: f64,
    /// Number of tagged tasks.
    #[serde(default)]
    pub task_count: u32,
}

impl Tag {
    /// Creates an uncolored top-level tag.
    #[must_use]
    pub fn new(id: TagId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            color: None,
            parent_tag_id: None,
            sort_order: 0.0,
            task_count: 0,
        }
    }
}
