//! Shared fakes and fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;

use tasklane::cache::{CacheKey, CacheStore};
use tasklane::config::SyncConfig;
use tasklane::domain::document::{
    AreaList, InboxView, ProjectDetail, ProjectList, TodayGroup, TodaySection, TodayView,
};
use tasklane::domain::{Area, AreaId, Document, Project, ProjectId, Task, TaskId};
use tasklane::error::TransportError;
use tasklane::events::{PushChannel, PushStream, RawPushEvent};
use tasklane::gate::InvalidationGate;
use tasklane::mutation::MutationCoordinator;
use tasklane::query::{QueryClient, RemoteRequest, RemoteResponse, Transport};

// =============================================================================
// FakeTransport
// =============================================================================

/// A scripted server.
///
/// Fetches answer with whatever was [`FakeTransport::serve`]d for the key
/// when the fetch started.
/// Writes answer with the next scripted response, or `Empty`.
#[derive(Default)]
pub struct FakeTransport {
    documents: Mutex<HashMap<CacheKey, Document>>,
    responses: Mutex<VecDeque<Result<RemoteResponse, TransportError>>>,
    fetches: Mutex<Vec<CacheKey>>,
    requests: Mutex<Vec<RemoteRequest>>,
    execute_delay: Mutex<Option<Duration>>,
    fetch_delay: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, key: CacheKey, document: Document) {
        self.documents.lock().insert(key, document);
    }

    pub fn respond(&self, response: Result<RemoteResponse, TransportError>) {
        self.responses.lock().push_back(response);
    }

    pub fn delay_execute(&self, delay: Duration) {
        *self.execute_delay.lock() = Some(delay);
    }

    pub fn delay_fetch(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    pub fn fetches(&self) -> Vec<CacheKey> {
        self.fetches.lock().clone()
    }

    pub fn fetch_count(&self, key: &CacheKey) -> usize {
        self.fetches.lock().iter().filter(|fetched| *fetched == key).count()
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for FakeTransport {
    fn fetch<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Document, TransportError>> {
        Box::pin(async move {
            self.fetches.lock().push(key.clone());
            let served = self.documents.lock().get(key).cloned();
            let delay = *self.fetch_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            served.ok_or_else(|| TransportError::Status {
                status: 404,
                code: "not_found".to_string(),
                message: format!("nothing served for {key}"),
            })
        })
    }

    fn execute(
        &self,
        request: RemoteRequest,
    ) -> BoxFuture<'_, Result<RemoteResponse, TransportError>> {
        Box::pin(async move {
            self.requests.lock().push(request);
            let delay = *self.execute_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Ok(RemoteResponse::Empty))
        })
    }
}

// =============================================================================
// FakePushChannel
// =============================================================================

/// A push channel whose connections are scripted one by one.
///
/// Each scripted connection delivers its events and then ends. Once the
/// script runs out, connecting fails.
#[derive(Default)]
pub struct FakePushChannel {
    connections: Mutex<VecDeque<Result<Vec<RawPushEvent>, TransportError>>>,
    attempts: Mutex<usize>,
}

impl FakePushChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, connection: Result<Vec<RawPushEvent>, TransportError>) {
        self.connections.lock().push_back(connection);
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl PushChannel for FakePushChannel {
    fn connect(&self) -> BoxFuture<'_, Result<PushStream, TransportError>> {
        Box::pin(async move {
            *self.attempts.lock() += 1;
            let next = self.connections.lock().pop_front();
            match next {
                Some(Ok(events)) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
                Some(Err(error)) => Err(error),
                None => Err(TransportError::Network("connection refused".to_string())),
            }
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Store, client, gate and coordinator wired to one [`FakeTransport`].
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub store: Arc<CacheStore>,
    pub client: Arc<QueryClient>,
    pub gate: Arc<InvalidationGate>,
    pub coordinator: MutationCoordinator,
}

impl Harness {
    pub fn new(config: SyncConfig) -> Self {
        let transport = FakeTransport::new();
        let store = Arc::new(CacheStore::new());
        let client = Arc::new(QueryClient::new(
            Arc::clone(&store),
            Arc::clone(&transport) as Arc<dyn Transport>,
        ));
        let gate = Arc::new(InvalidationGate::new(Arc::clone(&client), config));
        let coordinator = MutationCoordinator::new(Arc::clone(&gate));
        Self {
            transport,
            store,
            client,
            gate,
            coordinator,
        }
    }

    /// Caches `document` under `key` and serves the same value for refetches.
    pub fn seed(&self, key: CacheKey, document: Document) {
        self.transport.serve(key.clone(), document.clone());
        self.store.write(key, document);
    }
}

/// Lets spawned background work run to completion under a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

pub fn task(title: &str) -> Task {
    Task::new(TaskId::generate(), title, timestamp())
}

pub fn project(title: &str) -> Project {
    Project::new(ProjectId::generate(), title, timestamp())
}

pub fn area(title: &str) -> Area {
    Area::new(AreaId::generate(), title, timestamp())
}

pub fn inbox(tasks: Vec<Task>) -> Document {
    Document::Inbox(InboxView {
        tasks,
        review: Vec::new(),
    })
}

pub fn today(tasks: Vec<Task>) -> Document {
    Document::Today(TodayView {
        sections: vec![TodaySection {
            title: "Today".to_string(),
            groups: vec![TodayGroup {
                project: None,
                tasks,
            }],
        }],
        ..TodayView::default()
    })
}

pub fn today_tasks(document: &Document) -> Vec<Task> {
    match document {
        Document::Today(view) => view
            .sections
            .iter()
            .flat_map(|section| section.groups.iter())
            .flat_map(|group| group.tasks.iter().cloned())
            .collect(),
        other => panic!("expected a today view, got {:?}", other.kind()),
    }
}

pub fn project_detail(project: Project, tasks: Vec<Task>) -> Document {
    Document::ProjectDetail(Box::new(ProjectDetail {
        project,
        headings: Vec::new(),
        tasks_without_heading: tasks,
        completed_tasks: Vec::new(),
    }))
}

pub fn project_list(projects: Vec<Project>) -> Document {
    Document::ProjectList(ProjectList { projects })
}

pub fn area_list(areas: Vec<Area>) -> Document {
    Document::AreaList(AreaList { areas })
}
