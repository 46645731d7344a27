//! Domain model: entities, identities, cached document shapes, patches and
//! request bodies.

pub mod document;
mod ids;
mod organize;
mod patch;
mod request;
mod task;

pub use document::{Document, DocumentKind, EntityVisitor};
pub use ids::{AreaId, EntityRef, HeadingId, ProjectId, TagId, TaskId};
pub use organize::{Area, Project, ProjectStatus, Tag};
pub use patch::{AreaPatch, EntityPatch, ProjectPatch, TagPatch, TaskPatch};
pub use request::{
    AreaUpdate, CreateAreaRequest, CreateProjectRequest, CreateTagRequest, CreateTaskRequest,
    ProjectUpdate, ReorderItem, SimpleReorderItem, TagUpdate, TaskUpdate,
};
pub use task::{ChecklistItem, NamedRef, SortField, TagRef, Task, TaskDetail, TaskStatus};
