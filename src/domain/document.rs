//! The closed set of cached document shapes.
//!
//! Every cache entry holds a [`Document`]. Each variant is a known server
//! response shape, so cross-document traversal can pattern-match on explicit
//! entity kinds instead of guessing from field names.
//!
//! # Traversal
//!
//! [`Document::accept`] drives an [`EntityVisitor`] over every embedded
//! [`Task`], [`Project`], [`Area`] and [`Tag`], and over every task, project
//! and area *list* (after its elements were visited). Lightweight `{id, title}`
//! references such as a today-group's project header are [`NamedRef`]s and are
//! never visited.
//!
//! # Decoding
//!
//! Documents are not self-describing on the wire: the endpoint determines the
//! shape. [`Document::decode`] takes the expected [`DocumentKind`] alongside
//! the JSON body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{AreaId, HeadingId, ProjectId};
use super::organize::{Area, Project, Tag};
use super::task::{NamedRef, Task, TaskDetail};

// =============================================================================
// View shapes
// =============================================================================

/// The inbox view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboxView {
    /// Unfiled tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Tasks due for review.
    #[serde(default)]
    pub review: Vec<Task>,
}

/// A group of today tasks sharing a project header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayGroup {
    /// Project header, if any.
    #[serde(default)]
    pub project: Option<NamedRef<ProjectId>>,
    /// Tasks in the group.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A titled section of the today view ("Today", "This Evening").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodaySection {
    /// Section title.
    pub title: String,
    /// Groups in the section.
    #[serde(default)]
    pub groups: Vec<TodayGroup>,
}

/// The today view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayView {
    /// Sections.
    #[serde(default)]
    pub sections: Vec<TodaySection>,
    /// Overdue tasks.
    #[serde(default)]
    pub overdue: Vec<Task>,
    /// Tasks scheduled earlier and still open.
    #[serde(default)]
    pub earlier: Vec<Task>,
    /// Tasks completed today.
    #[serde(default)]
    pub completed: Vec<Task>,
}

/// One date bucket of the upcoming view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedTasks {
    /// Date (`YYYY-MM-DD`).
    pub date: String,
    /// Tasks on that date.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// The upcoming view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpcomingView {
    /// Overdue tasks.
    #[serde(default)]
    pub overdue: Vec<Task>,
    /// Date buckets.
    #[serde(default)]
    pub dates: Vec<DatedTasks>,
    /// Tasks scheduled earlier and still open.
    #[serde(default)]
    pub earlier: Vec<Task>,
}

/// Tasks of one project inside an anytime/someday area group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGroup {
    /// Project header.
    pub project: NamedRef<ProjectId>,
    /// Tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One area of the anytime/someday view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaGroup {
    /// Area header.
    pub area: NamedRef<AreaId>,
    /// Project groups.
    #[serde(default)]
    pub projects: Vec<ProjectGroup>,
    /// Tasks in the area but not in a project.
    #[serde(default)]
    pub standalone_tasks: Vec<Task>,
}

/// The catch-all group for items without an area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoAreaGroup {
    /// Project groups.
    #[serde(default)]
    pub projects: Vec<ProjectGroup>,
    /// Loose tasks.
    #[serde(default)]
    pub standalone_tasks: Vec<Task>,
}

/// The anytime and someday views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedView {
    /// Area groups.
    #[serde(default)]
    pub areas: Vec<AreaGroup>,
    /// Items without an area.
    #[serde(default)]
    pub no_area: NoAreaGroup,
}

/// The logbook and trash views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogbookView {
    /// Date buckets.
    #[serde(default)]
    pub groups: Vec<DatedTasks>,
    /// Total number of entries on the server.
    #[serde(default)]
    pub total: u64,
}

// =============================================================================
// List and detail shapes
// =============================================================================

/// A `{tasks: [...]}` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    /// Tasks.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A `{projects: [...]}` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
    /// Projects.
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// An `{areas: [...]}` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaList {
    /// Areas.
    #[serde(default)]
    pub areas: Vec<Area>,
}

/// A `{tags: [...]}` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagList {
    /// Tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A heading with its tasks, inside a project detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingWithTasks {
    /// Heading identity.
    pub id: HeadingId,
    /// Heading title.
    pub title: String,
    /// Owning project.
    pub project_id: ProjectId,
    /// Position key among headings.
    #[serde(default)]
    pub sort_order: f64,
    /// Tasks under the heading.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// The detail document of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetail {
    /// The project itself.
    #[serde(flatten)]
    pub project: Project,
    /// Headings.
    #[serde(default)]
    pub headings: Vec<HeadingWithTasks>,
    /// Tasks not under a heading.
    #[serde(default)]
    pub tasks_without_heading: Vec<Task>,
    /// Completed tasks.
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
}

/// The detail document of an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDetail {
    /// The area itself.
    #[serde(flatten)]
    pub area: Area,
    /// Projects in the area.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Open tasks in the area.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Completed tasks.
    #[serde(default)]
    pub completed_tasks: Vec<Task>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Matching task.
    pub task: Task,
    /// Highlighted title.
    #[serde(default)]
    pub title_snippet: String,
    /// Highlighted notes.
    #[serde(default)]
    pub notes_snippet: String,
    /// Relevance.
    #[serde(default)]
    pub rank: f64,
}

/// A `{results: [...]}` search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits, ordered by rank.
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

// =============================================================================
// Document
// =============================================================================

/// Shape tag used to decode a JSON body into a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// [`Document::Inbox`]
    Inbox,
    /// [`Document::Today`]
    Today,
    /// [`Document::Upcoming`]
    Upcoming,
    /// [`Document::Anytime`]
    Anytime,
    /// [`Document::Someday`]
    Someday,
    /// [`Document::Logbook`]
    Logbook,
    /// [`Document::Trash`]
    Trash,
    /// [`Document::TaskList`]
    TaskList,
    /// [`Document::TaskDetail`]
    TaskDetail,
    /// [`Document::ProjectList`]
    ProjectList,
    /// [`Document::ProjectDetail`]
    ProjectDetail,
    /// [`Document::AreaList`]
    AreaList,
    /// [`Document::AreaDetail`]
    AreaDetail,
    /// [`Document::TagList`]
    TagList,
    /// [`Document::TagTasks`]
    TagTasks,
    /// [`Document::Search`]
    Search,
    /// [`Document::Raw`]
    Raw,
}

/// A cached server document.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Inbox view.
    Inbox(InboxView),
    /// Today view.
    Today(TodayView),
    /// Upcoming view.
    Upcoming(UpcomingView),
    /// Anytime view.
    Anytime(GroupedView),
    /// Someday view.
    Someday(GroupedView),
    /// Logbook view.
    Logbook(LogbookView),
    /// Trash view.
    Trash(LogbookView),
    /// Filtered task list.
    TaskList(TaskList),
    /// Task detail.
    TaskDetail(Box<TaskDetail>),
    /// Project list.
    ProjectList(ProjectList),
    /// Project detail.
    ProjectDetail(Box<ProjectDetail>),
    /// Area list.
    AreaList(AreaList),
    /// Area detail.
    AreaDetail(Box<AreaDetail>),
    /// Tag list.
    TagList(TagList),
    /// Tasks carrying one tag.
    TagTasks(TaskList),
    /// Search results.
    Search(SearchResults),
    /// A resource whose contents are never patched (checklists, attachments,
    /// saved filters, counts).
    Raw(Value),
}

impl Document {
    /// Decodes a JSON body of the given shape.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body does not match the shape.
    pub fn decode(kind: DocumentKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            DocumentKind::Inbox => Self::Inbox(serde_json::from_value(value)?),
            DocumentKind::Today => Self::Today(serde_json::from_value(value)?),
            DocumentKind::Upcoming => Self::Upcoming(serde_json::from_value(value)?),
            DocumentKind::Anytime => Self::Anytime(serde_json::from_value(value)?),
            DocumentKind::Someday => Self::Someday(serde_json::from_value(value)?),
            DocumentKind::Logbook => Self::Logbook(serde_json::from_value(value)?),
            DocumentKind::Trash => Self::Trash(serde_json::from_value(value)?),
            DocumentKind::TaskList => Self::TaskList(serde_json::from_value(value)?),
            DocumentKind::TaskDetail => Self::TaskDetail(serde_json::from_value(value)?),
            DocumentKind::ProjectList => Self::ProjectList(serde_json::from_value(value)?),
            DocumentKind::ProjectDetail => Self::ProjectDetail(serde_json::from_value(value)?),
            DocumentKind::AreaList => Self::AreaList(serde_json::from_value(value)?),
            DocumentKind::AreaDetail => Self::AreaDetail(serde_json::from_value(value)?),
            DocumentKind::TagList => Self::TagList(serde_json::from_value(value)?),
            DocumentKind::TagTasks => Self::TagTasks(serde_json::from_value(value)?),
            DocumentKind::Search => Self::Search(serde_json::from_value(value)?),
            DocumentKind::Raw => Self::Raw(value),
        })
    }

    /// The shape tag of this document.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        match self {
            Self::Inbox(_) => DocumentKind::Inbox,
            Self::Today(_) => DocumentKind::Today,
            Self::Upcoming(_) => DocumentKind::Upcoming,
            Self::Anytime(_) => DocumentKind::Anytime,
            Self::Someday(_) => DocumentKind::Someday,
            Self::Logbook(_) => DocumentKind::Logbook,
            Self::Trash(_) => DocumentKind::Trash,
            Self::TaskList(_) => DocumentKind::TaskList,
            Self::TaskDetail(_) => DocumentKind::TaskDetail,
            Self::ProjectList(_) => DocumentKind::ProjectList,
            Self::ProjectDetail(_) => DocumentKind::ProjectDetail,
            Self::AreaList(_) => DocumentKind::AreaList,
            Self::AreaDetail(_) => DocumentKind::AreaDetail,
            Self::TagList(_) => DocumentKind::TagList,
            Self::TagTasks(_) => DocumentKind::TagTasks,
            Self::Search(_) => DocumentKind::Search,
            Self::Raw(_) => DocumentKind::Raw,
        }
    }

    /// Walks every embedded entity and entity list with `visitor`.
    pub fn accept<V: EntityVisitor + ?Sized>(&mut self, visitor: &mut V) {
        match self {
            Self::Inbox(view) => {
                walk_tasks(&mut view.tasks, visitor);
                walk_tasks(&mut view.review, visitor);
            }
            Self::Today(view) => {
                for section in &mut view.sections {
                    for group in &mut section.groups {
                        walk_tasks(&mut group.tasks, visitor);
                    }
                }
                walk_tasks(&mut view.overdue, visitor);
                walk_tasks(&mut view.earlier, visitor);
                walk_tasks(&mut view.completed, visitor);
            }
            Self::Upcoming(view) => {
                walk_tasks(&mut view.overdue, visitor);
                for bucket in &mut view.dates {
                    walk_tasks(&mut bucket.tasks, visitor);
                }
                walk_tasks(&mut view.earlier, visitor);
            }
            Self::Anytime(view) | Self::Someday(view) => {
                for area in &mut view.areas {
                    for group in &mut area.projects {
                        walk_tasks(&mut group.tasks, visitor);
                    }
                    walk_tasks(&mut area.standalone_tasks, visitor);
                }
                for group in &mut view.no_area.projects {
                    walk_tasks(&mut group.tasks, visitor);
                }
                walk_tasks(&mut view.no_area.standalone_tasks, visitor);
            }
            Self::Logbook(view) | Self::Trash(view) => {
                for bucket in &mut view.groups {
                    walk_tasks(&mut bucket.tasks, visitor);
                }
            }
            Self::TaskList(list) | Self::TagTasks(list) => walk_tasks(&mut list.tasks, visitor),
            Self::TaskDetail(detail) => visitor.visit_task(&mut detail.task),
            Self::ProjectList(list) => walk_projects(&mut list.projects, visitor),
            Self::ProjectDetail(detail) => {
                visitor.visit_project(&mut detail.project);
                for heading in &mut detail.headings {
                    walk_tasks(&mut heading.tasks, visitor);
                }
                walk_tasks(&mut detail.tasks_without_heading, visitor);
                walk_tasks(&mut detail.completed_tasks, visitor);
            }
            Self::AreaList(list) => walk_areas(&mut list.areas, visitor),
            Self::AreaDetail(detail) => {
                visitor.visit_area(&mut detail.area);
                walk_projects(&mut detail.projects, visitor);
                walk_tasks(&mut detail.tasks, visitor);
                walk_tasks(&mut detail.completed_tasks, visitor);
            }
            Self::TagList(list) => {
                for tag in &mut list.tags {
                    visitor.visit_tag(tag);
                }
            }
            Self::Search(results) => {
                for hit in &mut results.results {
                    visitor.visit_task(&mut hit.task);
                }
            }
            Self::Raw(_) => {}
        }
    }
}

fn walk_tasks<V: EntityVisitor + ?Sized>(tasks: &mut Vec<Task>, visitor: &mut V) {
    for task in tasks.iter_mut() {
        visitor.visit_task(task);
    }
    visitor.visit_task_list(tasks);
}

fn walk_projects<V: EntityVisitor + ?Sized>(projects: &mut Vec<Project>, visitor: &mut V) {
    for project in projects.iter_mut() {
        visitor.visit_project(project);
    }
    visitor.visit_project_list(projects);
}

fn walk_areas<V: EntityVisitor + ?Sized>(areas: &mut Vec<Area>, visitor: &mut V) {
    for area in areas.iter_mut() {
        visitor.visit_area(area);
    }
    visitor.visit_area_list(areas);
}

// =============================================================================
// EntityVisitor
// =============================================================================

/// A typed visitor over the entities embedded in a [`Document`].
///
/// All methods default to doing nothing, so implementors override only the
/// kinds they care about. List callbacks run after every element of the list
/// has been visited.
pub trait EntityVisitor {
    /// Called for every embedded task.
    fn visit_task(&mut self, _task: &mut Task) {}

    /// Called for every embedded project.
    fn visit_project(&mut self, _project: &mut Project) {}

    /// Called for every embedded area.
    fn visit_area(&mut self, _area: &mut Area) {}

    /// Called for every embedded tag.
    fn visit_tag(&mut self, _tag: &mut Tag) {}

    /// Called for every ordered task list.
    fn visit_task_list(&mut self, _tasks: &mut Vec<Task>) {}

    /// Called for every ordered project list.
    fn visit_project_list(&mut self, _projects: &mut Vec<Project>) {}

    /// Called for every ordered area list.
    fn visit_area_list(&mut self, _areas: &mut Vec<Area>) {}
}
