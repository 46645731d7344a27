//! Registry of the sortable task lists currently on screen.
//!
//! Each rendered list registers its ordered tasks, the position key that
//! orders it and the container that owns it. When a drag ends, the
//! controller asks which list holds the dragged task and which holds the
//! hovered one.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::domain::{AreaId, HeadingId, ProjectId, SortField, Task, TaskId};

/// The container a sortable list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOwner {
    /// The inbox.
    Inbox,
    /// The "today" view.
    Today,
    /// A project's tasks without a heading.
    Project(ProjectId),
    /// The tasks under one heading of a project.
    Heading {
        /// Owning project.
        project: ProjectId,
        /// The heading.
        heading: HeadingId,
    },
    /// An area's loose tasks.
    Area(AreaId),
    /// A list tasks cannot be moved into, e.g. search results.
    Other,
}

/// One registered list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    /// Registration id.
    pub list_id: String,
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// The position key ordering the list.
    pub sort_field: SortField,
    /// The owning container.
    pub owner: ListOwner,
}

impl ListEntry {
    /// Index of `task` in the list.
    #[must_use]
    pub fn index_of(&self, task: TaskId) -> Option<usize> {
        self.tasks.iter().position(|candidate| candidate.id == task)
    }
}

/// The sortable lists currently on screen.
#[derive(Debug, Default)]
pub struct ListRegistry {
    lists: RwLock<BTreeMap<String, ListEntry>>,
}

impl ListRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `list_id`, replacing a previous registration.
    pub fn register(
        &self,
        list_id: impl Into<String>,
        tasks: Vec<Task>,
        sort_field: SortField,
        owner: ListOwner,
    ) {
        let list_id = list_id.into();
        self.lists.write().insert(
            list_id.clone(),
            ListEntry {
                list_id,
                tasks,
                sort_field,
                owner,
            },
        );
    }

    /// Forgets `list_id`.
    pub fn unregister(&self, list_id: &str) {
        self.lists.write().remove(list_id);
    }

    /// The first list containing `task`.
    #[must_use]
    pub fn list_for_task(&self, task: TaskId) -> Option<ListEntry> {
        self.lists
            .read()
            .values()
            .find(|entry| entry.index_of(task).is_some())
            .cloned()
    }

    /// The registered copy of `task`.
    #[must_use]
    pub fn find_task(&self, task: TaskId) -> Option<Task> {
        self.lists
            .read()
            .values()
            .flat_map(|entry| entry.tasks.iter())
            .find(|candidate| candidate.id == task)
            .cloned()
    }

    /// Number of registered lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.read().len()
    }

    /// Returns `true` if no list is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    fn test_list_for_task_and_unregister() {
        let registry = ListRegistry::new();
        let task = Task::new(TaskId::generate(), "write", Utc::now());
        let id = task.id;
        registry.register("today", vec![task], SortField::Today, ListOwner::Today);

        let entry = registry.list_for_task(id).unwrap();
        assert_eq!(entry.list_id, "today");
        assert_eq!(entry.index_of(id), Some(0));

        registry.unregister("today");
        assert!(registry.list_for_task(id).is_none());
        assert!(registry.is_empty());
    }
}
