//! The data-fetching layer.
//!
//! [`QueryClient`] sits between the [`CacheStore`] and the external
//! [`Transport`]. It serves reads from the cache, refetches invalidated
//! entries, and lets mutations abandon fetches that would overwrite a fresher
//! optimistic value.
//!
//! # Abandoning fetches
//!
//! Every key with a fetch in flight carries a generation counter. A fetch
//! records the generation when it starts and only writes its result back if
//! the counter is unchanged when it finishes. [`QueryClient::cancel`] bumps
//! the counters under a prefix. A key leaves the table when its last fetch
//! finishes or is dropped.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::cache::{CacheKey, CacheStore, InvalidationScope};
use crate::domain::{
    Area, AreaId, AreaUpdate, CreateAreaRequest, CreateProjectRequest, CreateTagRequest,
    CreateTaskRequest, Document, Project, ProjectId, ProjectUpdate, ReorderItem,
    SimpleReorderItem, Tag, TagId, TagUpdate, Task, TaskDetail, TaskId, TaskUpdate,
};
use crate::error::TransportError;

// =============================================================================
// Remote requests
// =============================================================================

/// A write the server is asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRequest {
    /// Create a task.
    CreateTask(CreateTaskRequest),
    /// Update task fields.
    UpdateTask(TaskId, TaskUpdate),
    /// Soft-delete a task.
    DeleteTask(TaskId),
    /// Complete a task.
    CompleteTask(TaskId),
    /// Cancel a task.
    CancelTask(TaskId),
    /// Mark a task as won't do.
    WontDoTask(TaskId),
    /// Reopen a task.
    ReopenTask(TaskId),
    /// Restore a task from the trash.
    RestoreTask(TaskId),
    /// Move tasks within their lists.
    ReorderTasks(Vec<ReorderItem>),
    /// Create a project.
    CreateProject(CreateProjectRequest),
    /// Update project fields.
    UpdateProject(ProjectId, ProjectUpdate),
    /// Delete a project.
    DeleteProject(ProjectId),
    /// Move projects within their list.
    ReorderProjects(Vec<SimpleReorderItem<ProjectId>>),
    /// Create an area.
    CreateArea(CreateAreaRequest),
    /// Update area fields.
    UpdateArea(AreaId, AreaUpdate),
    /// Delete an area.
    DeleteArea(AreaId),
    /// Move areas within their list.
    ReorderAreas(Vec<SimpleReorderItem<AreaId>>),
    /// Create a tag.
    CreateTag(CreateTagRequest),
    /// Update tag fields.
    UpdateTag(TagId, TagUpdate),
    /// Delete a tag.
    DeleteTag(TagId),
}

impl RemoteRequest {
    /// Short operation name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CreateTask(_) => "create_task",
            Self::UpdateTask(..) => "update_task",
            Self::DeleteTask(_) => "delete_task",
            Self::CompleteTask(_) => "complete_task",
            Self::CancelTask(_) => "cancel_task",
            Self::WontDoTask(_) => "wont_do_task",
            Self::ReopenTask(_) => "reopen_task",
            Self::RestoreTask(_) => "restore_task",
            Self::ReorderTasks(_) => "reorder_tasks",
            Self::CreateProject(_) => "create_project",
            Self::UpdateProject(..) => "update_project",
            Self::DeleteProject(_) => "delete_project",
            Self::ReorderProjects(_) => "reorder_projects",
            Self::CreateArea(_) => "create_area",
            Self::UpdateArea(..) => "update_area",
            Self::DeleteArea(_) => "delete_area",
            Self::ReorderAreas(_) => "reorder_areas",
            Self::CreateTag(_) => "create_tag",
            Self::UpdateTag(..) => "update_tag",
            Self::DeleteTag(_) => "delete_tag",
        }
    }
}

/// The authoritative result of a [`RemoteRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResponse {
    /// A task record.
    Task(Task),
    /// A task detail record.
    TaskDetail(Box<TaskDetail>),
    /// A project record.
    Project(Project),
    /// An area record.
    Area(Area),
    /// A tag record.
    Tag(Tag),
    /// No body.
    Empty,
}

// =============================================================================
// Transport
// =============================================================================

/// The external request collaborator.
///
/// Implementations own HTTP, authentication and timeouts.
pub trait Transport: Send + Sync {
    /// Fetches the document served under `key`.
    fn fetch<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Document, TransportError>>;

    /// Performs a write.
    fn execute(&self, request: RemoteRequest)
    -> BoxFuture<'_, Result<RemoteResponse, TransportError>>;
}

/// Decodes a JSON body fetched for `key` into the document shape that key
/// serves. A helper for [`Transport`] implementations.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the body does not match.
pub fn decode_document(key: &CacheKey, body: Value) -> Result<Document, TransportError> {
    Ok(Document::decode(key.document_kind(), body)?)
}

// =============================================================================
// QueryClient
// =============================================================================

/// What one [`QueryClient::invalidate`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Entries evicted by removal scopes.
    pub removed: usize,
    /// Entries refetched successfully.
    pub refetched: usize,
    /// Entries whose refetch was abandoned by [`QueryClient::cancel`]; the
    /// result was discarded.
    pub abandoned: usize,
    /// Entries whose refetch failed; they stay stale.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct InFlight {
    generation: u64,
    fetches: usize,
}

/// Read-through access to the cache, backed by a [`Transport`].
pub struct QueryClient {
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<FxHashMap<CacheKey, InFlight>>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QueryClient")
            .field("entries", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    /// Creates a client over `store` and `transport`.
    #[must_use]
    pub fn new(store: Arc<CacheStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            in_flight: Mutex::new(FxHashMap::default()),
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Returns the cached document for `key`, fetching it when absent or stale.
    ///
    /// # Errors
    ///
    /// Returns the transport error if a fetch was needed and failed.
    pub async fn fetch(&self, key: &CacheKey) -> Result<Document, TransportError> {
        if let Some(entry) = self.store.entry(key)
            && !entry.stale
        {
            return Ok(entry.document);
        }
        self.load(key).await.map(|loaded| loaded.document)
    }

    /// Applies `scopes`: removals evict, invalidations mark stale and refetch.
    ///
    /// Every cached key is refetched at most once per call, however many
    /// scopes cover it. Refetches run concurrently.
    pub async fn invalidate(&self, scopes: &[InvalidationScope]) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        for scope in scopes {
            if let InvalidationScope::Remove(prefix) = scope {
                report.removed += self.store.remove(prefix);
            }
        }

        let stale: BTreeSet<CacheKey> = scopes
            .iter()
            .filter_map(|scope| match scope {
                InvalidationScope::Invalidate(prefix) => Some(prefix),
                InvalidationScope::Remove(_) => None,
            })
            .flat_map(|prefix| self.store.mark_stale(prefix))
            .collect();

        let outcomes = join_all(stale.iter().map(|key| self.load(key))).await;
        for outcome in outcomes {
            match outcome {
                Ok(Loaded {
                    abandoned: false, ..
                }) => report.refetched += 1,
                Ok(_) => report.abandoned += 1,
                Err(_) => report.failed += 1,
            }
        }
        tracing::debug!(
            removed = report.removed,
            refetched = report.refetched,
            abandoned = report.abandoned,
            failed = report.failed,
            "invalidated cache scopes"
        );
        report
    }

    /// Abandons every in-flight fetch under `prefix`.
    ///
    /// Their results are discarded instead of written to the cache.
    pub fn cancel(&self, prefix: &CacheKey) {
        let mut in_flight = self.in_flight.lock();
        let mut abandoned = 0_usize;
        for (key, entry) in in_flight.iter_mut() {
            if key.starts_with(prefix) {
                entry.generation += 1;
                abandoned += 1;
            }
        }
        drop(in_flight);
        tracing::debug!(prefix = %prefix, keys = abandoned, "cancelled in-flight fetches");
    }

    /// Number of keys with at least one fetch in flight.
    #[must_use]
    pub fn in_flight_keys(&self) -> usize {
        self.in_flight.lock().len()
    }

    async fn load(&self, key: &CacheKey) -> Result<Loaded, TransportError> {
        let ticket = FetchTicket::register(self, key);
        match self.transport.fetch(key).await {
            Ok(document) => {
                let abandoned = !ticket.is_current();
                if abandoned {
                    tracing::debug!(key = %key, "discarded abandoned fetch");
                } else {
                    self.store.write(key.clone(), document.clone());
                }
                Ok(Loaded {
                    document,
                    abandoned,
                })
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "refetch failed; entry stays stale");
                Err(error)
            }
        }
    }
}

struct Loaded {
    document: Document,
    abandoned: bool,
}

/// One fetch's place in the in-flight table. Dropping it, on completion or
/// when the fetch future is dropped, removes the key once no fetch is left.
struct FetchTicket<'a> {
    client: &'a QueryClient,
    key: &'a CacheKey,
    generation: u64,
}

impl<'a> FetchTicket<'a> {
    fn register(client: &'a QueryClient, key: &'a CacheKey) -> Self {
        let mut in_flight = client.in_flight.lock();
        let entry = in_flight.entry(key.clone()).or_default();
        entry.fetches += 1;
        let generation = entry.generation;
        drop(in_flight);
        Self {
            client,
            key,
            generation,
        }
    }

    fn is_current(&self) -> bool {
        self.client
            .in_flight
            .lock()
            .get(self.key)
            .is_some_and(|entry| entry.generation == self.generation)
    }
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.client.in_flight.lock();
        if let Some(entry) = in_flight.get_mut(self.key) {
            entry.fetches = entry.fetches.saturating_sub(1);
            if entry.fetches == 0 {
                in_flight.remove(self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn test_decode_document_uses_key_shape() {
        let document = decode_document(&keys::areas::all(), json!({"areas": []})).unwrap();
        assert_eq!(document, Document::AreaList(crate::domain::document::AreaList::default()));
    }

    #[rstest]
    fn test_decode_document_maps_shape_errors() {
        let error = decode_document(&keys::views::inbox(), json!([1, 2])).unwrap_err();
        assert!(matches!(error, TransportError::Decode(_)));
    }

    #[rstest]
    fn test_request_labels_are_snake_case() {
        assert_eq!(RemoteRequest::WontDoTask(TaskId::generate()).label(), "wont_do_task");
    }
}
