//! The in-memory document store.
//!
//! [`CacheStore`] maps [`CacheKey`]s to [`Document`]s. It performs no I/O:
//! fetching and refetching is the query layer's job. Every method takes the
//! internal lock for the duration of one synchronous call and never across an
//! await point, so each call is atomic to every other caller.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::key::{CacheKey, keys};
use crate::domain::{
    Area, AreaId, Document, EntityPatch, EntityVisitor, Project, ProjectId, SortField, Tag, Task,
    TaskId,
};

// =============================================================================
// CacheEntry
// =============================================================================

/// A cached document together with its freshness flag.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The cached document.
    pub document: Document,
    /// Set when the entry was invalidated and awaits a refetch.
    pub stale: bool,
}

impl CacheEntry {
    /// Wraps a freshly fetched document.
    #[must_use]
    pub const fn fresh(document: Document) -> Self {
        Self {
            document,
            stale: false,
        }
    }
}

// =============================================================================
// CacheStore
// =============================================================================

/// Keyed store of cached server documents.
///
/// Construct one per application session and share it through `Arc`.
#[derive(Debug, Default)]
pub struct CacheStore {
    pub(super) entries: RwLock<BTreeMap<CacheKey, CacheEntry>>,
}

impl CacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the document cached under `key`.
    #[must_use]
    pub fn read(&self, key: &CacheKey) -> Option<Document> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.document.clone())
    }

    /// Returns a copy of the entry cached under `key`, stale flag included.
    #[must_use]
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `document` under `key` as fresh, replacing any previous entry.
    pub fn write(&self, key: CacheKey, document: Document) {
        self.entries.write().insert(key, CacheEntry::fresh(document));
    }

    /// Applies `updater` to every document whose key starts with `prefix`.
    ///
    /// Stale flags are preserved. Returns the number of documents visited.
    pub fn write_many<F>(&self, prefix: &CacheKey, mut updater: F) -> usize
    where
        F: FnMut(&CacheKey, &mut Document),
    {
        let mut entries = self.entries.write();
        let mut visited = 0;
        for (key, entry) in range_under_mut(&mut entries, prefix) {
            updater(key, &mut entry.document);
            visited += 1;
        }
        visited
    }

    /// Merges `patch` into every embedded copy of its target entity.
    ///
    /// Walks every document under the entity roots (views, tasks, projects,
    /// areas, tags, search). Only objects whose identity matches are touched.
    /// Returns the number of documents that contained the entity.
    pub fn patch_entity_everywhere(&self, patch: &EntityPatch) -> usize {
        let mut visitor = PatchVisitor { patch, hits: 0 };
        let touched = self.visit_entity_roots(&mut visitor, |visitor| {
            std::mem::take(&mut visitor.hits) > 0
        });
        tracing::trace!(entity = %patch.target(), documents = touched, "patched entity");
        touched
    }

    /// Sets the `field` position key of task `id` everywhere, then re-sorts
    /// every view task list that contains the task.
    ///
    /// Lists outside views are not re-sorted: their ordering field is not
    /// known to be `field`.
    pub fn reorder_task_everywhere(&self, id: TaskId, field: SortField, position: f64) -> usize {
        let mut entries = self.entries.write();
        let views = keys::views::root();
        let mut touched = 0;
        for (key, entry) in range_multi_mut(&mut entries, &keys::entity_roots()) {
            let mut visitor = TaskReorderVisitor {
                id,
                field,
                position,
                resort: key.starts_with(&views),
                hits: 0,
            };
            entry.document.accept(&mut visitor);
            if visitor.hits > 0 {
                touched += 1;
            }
        }
        touched
    }

    /// Sets the position key of project `id` everywhere and re-sorts every
    /// project list that contains it.
    pub fn reorder_projects_everywhere(&self, id: ProjectId, position: f64) -> usize {
        let mut visitor = ProjectReorderVisitor {
            id,
            position,
            hits: 0,
        };
        self.visit_entity_roots(&mut visitor, |visitor| {
            std::mem::take(&mut visitor.hits) > 0
        })
    }

    /// Sets the position key of area `id` everywhere and re-sorts every area
    /// list that contains it.
    pub fn reorder_areas_everywhere(&self, id: AreaId, position: f64) -> usize {
        let mut visitor = AreaReorderVisitor {
            id,
            position,
            hits: 0,
        };
        self.visit_entity_roots(&mut visitor, |visitor| {
            std::mem::take(&mut visitor.hits) > 0
        })
    }

    /// Finds a cached copy of project `id` in any project list or detail.
    ///
    /// Cached lists may lag behind deletions, so callers treat `None` as
    /// "unknown" rather than as an error.
    #[must_use]
    pub fn find_project(&self, id: ProjectId) -> Option<Project> {
        let entries = self.entries.read();
        entries.values().find_map(|entry| match &entry.document {
            Document::ProjectList(list) => {
                list.projects.iter().find(|project| project.id == id).cloned()
            }
            Document::ProjectDetail(detail) if detail.project.id == id => {
                Some(detail.project.clone())
            }
            Document::AreaDetail(detail) => {
                detail.projects.iter().find(|project| project.id == id).cloned()
            }
            _ => None,
        })
    }

    /// Finds a cached copy of area `id` in the area list or an area detail.
    #[must_use]
    pub fn find_area(&self, id: AreaId) -> Option<Area> {
        let entries = self.entries.read();
        entries.values().find_map(|entry| match &entry.document {
            Document::AreaList(list) => list.areas.iter().find(|area| area.id == id).cloned(),
            Document::AreaDetail(detail) if detail.area.id == id => Some(detail.area.clone()),
            _ => None,
        })
    }

    /// Marks every entry under `prefix` stale and returns their keys.
    pub fn mark_stale(&self, prefix: &CacheKey) -> Vec<CacheKey> {
        let mut entries = self.entries.write();
        range_under_mut(&mut entries, prefix)
            .map(|(key, entry)| {
                entry.stale = true;
                key.clone()
            })
            .collect()
    }

    /// Evicts every entry under `prefix`. Returns how many were removed.
    pub fn remove(&self, prefix: &CacheKey) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Keys of every entry under `prefix`, in key order.
    #[must_use]
    pub fn keys_under(&self, prefix: &CacheKey) -> Vec<CacheKey> {
        let entries = self.entries.read();
        entries
            .range::<CacheKey, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Runs `visitor` over every document under the entity roots and counts
    /// the documents for which `matched` reports a hit.
    fn visit_entity_roots<V, M>(&self, visitor: &mut V, mut matched: M) -> usize
    where
        V: EntityVisitor,
        M: FnMut(&mut V) -> bool,
    {
        let mut entries = self.entries.write();
        let mut touched = 0;
        for (_, entry) in range_multi_mut(&mut entries, &keys::entity_roots()) {
            entry.document.accept(&mut *visitor);
            if matched(&mut *visitor) {
                touched += 1;
            }
        }
        touched
    }
}

fn range_under_mut<'a>(
    entries: &'a mut BTreeMap<CacheKey, CacheEntry>,
    prefix: &'a CacheKey,
) -> impl Iterator<Item = (&'a CacheKey, &'a mut CacheEntry)> {
    entries
        .range_mut::<CacheKey, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
}

/// Entries under any of `prefixes`. Disjoint roots are assumed.
fn range_multi_mut<'a>(
    entries: &'a mut BTreeMap<CacheKey, CacheEntry>,
    prefixes: &'a [CacheKey],
) -> impl Iterator<Item = (&'a CacheKey, &'a mut CacheEntry)> {
    entries
        .iter_mut()
        .filter(move |(key, _)| prefixes.iter().any(|prefix| key.starts_with(prefix)))
}

// =============================================================================
// Visitors
// =============================================================================

struct PatchVisitor<'a> {
    patch: &'a EntityPatch,
    hits: usize,
}

impl EntityVisitor for PatchVisitor<'_> {
    fn visit_task(&mut self, task: &mut Task) {
        match self.patch {
            EntityPatch::Task(id, patch) if task.id == *id => {
                patch.apply(task);
                self.hits += 1;
            }
            EntityPatch::ReplaceTask(replacement) if task.id == replacement.id => {
                task.clone_from(replacement);
                self.hits += 1;
            }
            _ => {}
        }
    }

    fn visit_project(&mut self, project: &mut Project) {
        match self.patch {
            EntityPatch::Project(id, patch) if project.id == *id => {
                patch.apply(project);
                self.hits += 1;
            }
            EntityPatch::ReplaceProject(replacement) if project.id == replacement.id => {
                project.clone_from(replacement);
                self.hits += 1;
            }
            _ => {}
        }
    }

    fn visit_area(&mut self, area: &mut Area) {
        match self.patch {
            EntityPatch::Area(id, patch) if area.id == *id => {
                patch.apply(area);
                self.hits += 1;
            }
            EntityPatch::ReplaceArea(replacement) if area.id == replacement.id => {
                area.clone_from(replacement);
                self.hits += 1;
            }
            _ => {}
        }
    }

    fn visit_tag(&mut self, tag: &mut Tag) {
        match self.patch {
            EntityPatch::Tag(id, patch) if tag.id == *id => {
                patch.apply(tag);
                self.hits += 1;
            }
            EntityPatch::ReplaceTag(replacement) if tag.id == replacement.id => {
                tag.clone_from(replacement);
                self.hits += 1;
            }
            _ => {}
        }
    }
}

struct TaskReorderVisitor {
    id: TaskId,
    field: SortField,
    position: f64,
    resort: bool,
    hits: usize,
}

impl EntityVisitor for TaskReorderVisitor {
    fn visit_task(&mut self, task: &mut Task) {
        if task.id == self.id {
            task.set_sort_order(self.field, self.position);
            self.hits += 1;
        }
    }

    fn visit_task_list(&mut self, tasks: &mut Vec<Task>) {
        if self.resort && tasks.iter().any(|task| task.id == self.id) {
            let field = self.field;
            tasks.sort_by(|left, right| left.sort_order(field).total_cmp(&right.sort_order(field)));
        }
    }
}

struct ProjectReorderVisitor {
    id: ProjectId,
    position: f64,
    hits: usize,
}

impl EntityVisitor for ProjectReorderVisitor {
    fn visit_project(&mut self, project: &mut Project) {
        if project.id == self.id {
            project.sort_order = self.position;
            self.hits += 1;
        }
    }

    fn visit_project_list(&mut self, projects: &mut Vec<Project>) {
        if projects.iter().any(|project| project.id == self.id) {
            projects.sort_by(|left, right| left.sort_order.total_cmp(&right.sort_order));
        }
    }
}

struct AreaReorderVisitor {
    id: AreaId,
    position: f64,
    hits: usize,
}

impl EntityVisitor for AreaReorderVisitor {
    fn visit_area(&mut self, area: &mut Area) {
        if area.id == self.id {
            area.sort_order = self.position;
            self.hits += 1;
        }
    }

    fn visit_area_list(&mut self, areas: &mut Vec<Area>) {
        if areas.iter().any(|area| area.id == self.id) {
            areas.sort_by(|left, right| left.sort_order.total_cmp(&right.sort_order));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::TaskList;
    use chrono::Utc;
    use rstest::rstest;

    fn list_of(tasks: Vec<Task>) -> Document {
        Document::TaskList(TaskList { tasks })
    }

    #[rstest]
    fn test_write_then_read() {
        let store = CacheStore::new();
        store.write(keys::tasks::list(None), list_of(Vec::new()));
        assert_eq!(store.read(&keys::tasks::list(None)), Some(list_of(Vec::new())));
        assert_eq!(store.len(), 1);
    }

    #[rstest]
    fn test_mark_stale_reports_only_keys_under_prefix() {
        let store = CacheStore::new();
        store.write(keys::views::inbox(), Document::Raw(serde_json::Value::Null));
        store.write(keys::views::today(), Document::Raw(serde_json::Value::Null));
        store.write(keys::areas::all(), Document::Raw(serde_json::Value::Null));

        let stale = store.mark_stale(&keys::views::root());

        assert_eq!(stale, vec![keys::views::inbox(), keys::views::today()]);
        assert!(store.entry(&keys::views::inbox()).unwrap().stale);
        assert!(!store.entry(&keys::areas::all()).unwrap().stale);
    }

    #[rstest]
    fn test_remove_evicts_sub_resources() {
        let id = TaskId::generate();
        let store = CacheStore::new();
        store.write(keys::tasks::detail(id), Document::Raw(serde_json::Value::Null));
        store.write(keys::tasks::checklist(id), Document::Raw(serde_json::Value::Null));
        store.write(keys::tasks::list(None), list_of(Vec::new()));

        assert_eq!(store.remove(&keys::tasks::detail(id)), 2);
        assert_eq!(store.keys_under(&keys::tasks::all()), vec![keys::tasks::list(None)]);
    }

    #[rstest]
    fn test_reorder_task_resorts_view_lists_only() {
        let now = Utc::now();
        let first = Task::new(TaskId::generate(), "first", now).with_sort_order(SortField::Today, 1.0);
        let second =
            Task::new(TaskId::generate(), "second", now).with_sort_order(SortField::Today, 2.0);
        let store = CacheStore::new();
        let inbox = Document::Inbox(crate::domain::document::InboxView {
            tasks: vec![first.clone(), second.clone()],
            review: Vec::new(),
        });
        store.write(keys::views::inbox(), inbox);
        store.write(keys::tasks::list(None), list_of(vec![first.clone(), second.clone()]));

        let touched = store.reorder_task_everywhere(first.id, SortField::Today, 3.0);

        assert_eq!(touched, 2);
        let Some(Document::Inbox(view)) = store.read(&keys::views::inbox()) else {
            panic!("inbox missing");
        };
        assert_eq!(view.tasks[0].id, second.id);
        let Some(Document::TaskList(list)) = store.read(&keys::tasks::list(None)) else {
            panic!("list missing");
        };
        assert_eq!(list.tasks[0].id, first.id);
        assert!((list.tasks[0].sort_order_today - 3.0).abs() < f64::EPSILON);
    }
}
