//! Request bodies sent to the server by mutations.
//!
//! Update requests use `Option<Option<T>>` for nullable fields so that
//! "leave alone" (field omitted) and "clear" (`null`) stay distinct on the
//! wire.

use serde::Serialize;

use super::ids::{AreaId, HeadingId, ProjectId, TagId, TaskId};
use super::patch::{AreaPatch, ProjectPatch, TagPatch, TaskPatch};
use super::task::SortField;

// =============================================================================
// Tasks
// =============================================================================

/// Body of a task creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateTaskRequest {
    /// Title.
    pub title: String,
    /// Notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Scheduled date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_date: Option<String>,
    /// Owning project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// Owning area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<AreaId>,
    /// Heading inside the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<HeadingId>,
    /// Tags to attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<TagId>,
}

impl CreateTaskRequest {
    /// Creates a request for a bare inbox task.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Body of a task update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(clippy::option_option)]
pub struct TaskUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// New scheduled date; `Some(None)` unschedules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_date: Option<Option<String>>,
    /// New evening flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when_evening: Option<bool>,
    /// New priority flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_priority: Option<bool>,
    /// New deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<String>>,
    /// New project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<ProjectId>>,
    /// New area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Option<AreaId>>,
    /// New heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<Option<HeadingId>>,
    /// Full replacement tag set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl TaskUpdate {
    /// The optimistic patch implied by this update.
    ///
    /// `has_notes` is derived from the new notes. Tag changes are left to the
    /// server response since the request carries ids only.
    #[must_use]
    pub fn to_patch(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.clone(),
            notes: self.notes.clone(),
            has_notes: self.notes.as_ref().map(|notes| !notes.trim().is_empty()),
            when_date: self.when_date.clone(),
            when_evening: self.when_evening,
            high_priority: self.high_priority,
            deadline: self.deadline.clone(),
            project_id: self.project_id,
            area_id: self.area_id,
            heading_id: self.heading_id,
            ..TaskPatch::default()
        }
    }
}

/// One entry of a task reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReorderItem {
    /// Moved task.
    pub id: TaskId,
    /// Which position key is being set.
    pub sort_field: SortField,
    /// New position key.
    pub sort_order: f64,
}

// =============================================================================
// Organizers
// =============================================================================

/// One entry of a project or area reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimpleReorderItem<Id> {
    /// Moved entity.
    pub id: Id,
    /// New position key.
    pub sort_order: f64,
}

/// Body of a project creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateProjectRequest {
    /// Title.
    pub title: String,
    /// Owning area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<AreaId>,
}

/// Body of a project update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(clippy::option_option)]
pub struct ProjectUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// New area; `Some(None)` detaches the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<Option<AreaId>>,
}

impl ProjectUpdate {
    /// The optimistic patch implied by this update.
    ///
    /// `area_title` fills the embedded area reference when the caller knows it.
    #[must_use]
    pub fn to_patch(&self, area_title: Option<String>) -> ProjectPatch {
        let mut patch = self
            .area_id
            .map_or_else(ProjectPatch::default, |area_id| {
                ProjectPatch::reassign(area_id, area_title)
            });
        patch.title.clone_from(&self.title);
        patch.notes.clone_from(&self.notes);
        patch
    }
}

/// Body of an area creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateAreaRequest {
    /// Title.
    pub title: String,
}

/// Body of an area update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreaUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AreaUpdate {
    /// The optimistic patch implied by this update.
    #[must_use]
    pub fn to_patch(&self) -> AreaPatch {
        AreaPatch {
            title: self.title.clone(),
            sort_order: None,
        }
    }
}

/// Body of a tag creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateTagRequest {
    /// Title.
    pub title: String,
    /// Display color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body of a tag update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(clippy::option_option)]
pub struct TagUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    /// New parent tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tag_id: Option<Option<TagId>>,
}

impl TagUpdate {
    /// The optimistic patch implied by this update.
    #[must_use]
    pub fn to_patch(&self) -> TagPatch {
        TagPatch {
            title: self.title.clone(),
            color: self.color.clone(),
            parent_tag_id: self.parent_tag_id,
            sort_order: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("meet at 5"), Some(true))]
    #[case(Some("   "), Some(false))]
    #[case(None, None)]
    fn test_task_update_derives_has_notes(
        #[case] notes: Option<&str>,
        #[case] expected: Option<bool>,
    ) {
        let update = TaskUpdate {
            notes: notes.map(str::to_string),
            ..TaskUpdate::default()
        };
        assert_eq!(update.to_patch().has_notes, expected);
    }

    #[rstest]
    fn test_task_update_distinguishes_clear_from_omit() {
        let update = TaskUpdate {
            when_date: Some(None),
            ..TaskUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json["when_date"].is_null());
        assert!(json.get("title").is_none());
    }

    #[rstest]
    fn test_reorder_item_uses_wire_field_names() {
        let item = ReorderItem {
            id: TaskId::generate(),
            sort_field: SortField::Today,
            sort_order: 512.0,
        };
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["sort_field"], "sort_order_today");
    }
}
