//! End-to-end behaviour of optimistic mutations against a scripted server.

mod common;

use std::time::Duration;

use rstest::rstest;

use tasklane::cache::keys;
use tasklane::config::SyncConfig;
use tasklane::domain::{CreateTagRequest, TaskStatus, TaskUpdate};
use tasklane::error::{ConflictError, MutationError, TransportError};
use tasklane::query::{RemoteRequest, RemoteResponse};

use common::{Harness, inbox, project, project_detail, settle, task, today, today_tasks};

fn network_down() -> TransportError {
    TransportError::Network("connection reset".to_string())
}

// =============================================================================
// Terminal transitions
// =============================================================================

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_completion_restores_the_task_and_clears_the_marker() {
    let harness = Harness::new(SyncConfig::default());
    let errand = task("file taxes");
    harness.seed(keys::views::today(), today(vec![errand.clone()]));
    harness.transport.delay_execute(Duration::from_millis(50));
    harness.transport.respond(Err(network_down()));

    let coordinator = harness.coordinator.clone();
    let id = errand.id;
    let mutation = tokio::spawn(async move { coordinator.complete_task(id).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    let optimistic = today_tasks(&harness.store.read(&keys::views::today()).unwrap());
    assert_eq!(optimistic[0].status, TaskStatus::Completed);
    assert!(optimistic[0].completed_at.is_some());
    assert!(harness.gate.is_departing(id));

    let result = mutation.await.unwrap();

    assert_eq!(result, Err(MutationError::Failed(network_down())));
    assert_eq!(
        harness.store.read(&keys::views::today()),
        Some(today(vec![errand]))
    );
    assert!(!harness.gate.is_departing(id));
    assert!(!harness.gate.is_blocked());

    settle().await;
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn successful_completion_waits_for_the_departure_before_refetching() {
    let harness = Harness::new(SyncConfig::default());
    let errand = task("file taxes");
    let staying = task("water plants");
    harness.seed(
        keys::views::today(),
        today(vec![errand.clone(), staying.clone()]),
    );
    harness
        .transport
        .serve(keys::views::today(), today(vec![staying.clone()]));

    let coordinator = harness.coordinator.clone();
    let id = errand.id;
    let mutation = tokio::spawn(async move { coordinator.complete_task(id).await });

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(harness.gate.is_departing(id));
    assert!(harness.gate.is_blocked());
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 0);
    assert_eq!(
        today_tasks(&harness.store.read(&keys::views::today()).unwrap()).len(),
        2
    );

    assert_eq!(mutation.await.unwrap(), Ok(RemoteResponse::Empty));

    assert!(!harness.gate.is_departing(id));
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
    assert_eq!(
        harness.store.read(&keys::views::today()),
        Some(today(vec![staying]))
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn completion_collapses_the_panel_showing_the_task() {
    let harness = Harness::new(SyncConfig::default());
    let errand = task("file taxes");
    harness.seed(keys::views::today(), today(vec![errand.clone()]));
    harness.gate.expand_task(Some(errand.id));

    harness.coordinator.complete_task(errand.id).await.unwrap();

    assert_eq!(harness.gate.expanded_task(), None);
    assert!(!harness.gate.is_blocked());
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn abandoned_completion_clears_the_marker_and_the_hold() {
    let harness = Harness::new(SyncConfig::default());
    let errand = task("file taxes");
    harness.seed(keys::views::today(), today(vec![errand.clone()]));
    harness.transport.delay_execute(Duration::from_millis(50));

    let coordinator = harness.coordinator.clone();
    let id = errand.id;
    let mutation = tokio::spawn(async move { coordinator.complete_task(id).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(harness.gate.is_departing(id));
    assert!(harness.gate.is_blocked());

    mutation.abort();
    assert!(mutation.await.unwrap_err().is_cancelled());

    assert!(!harness.gate.is_departing(id));
    assert!(!harness.gate.is_blocked());
}

// =============================================================================
// Field updates
// =============================================================================

#[rstest]
#[tokio::test(start_paused = true)]
async fn server_copy_replaces_the_optimistic_guess() {
    let harness = Harness::new(SyncConfig::immediate());
    let errand = task("draft");
    harness.seed(keys::views::inbox(), inbox(vec![errand.clone()]));

    let mut confirmed = errand.clone();
    confirmed.title = "Draft".to_string();
    confirmed.notes = "outline first".to_string();
    confirmed.has_notes = true;
    harness
        .transport
        .serve(keys::views::inbox(), inbox(vec![confirmed.clone()]));
    harness
        .transport
        .respond(Ok(RemoteResponse::Task(confirmed.clone())));
    harness.transport.delay_execute(Duration::from_millis(50));

    let coordinator = harness.coordinator.clone();
    let id = errand.id;
    let mutation = tokio::spawn(async move {
        coordinator
            .update_task(
                id,
                TaskUpdate {
                    title: Some("draft v2".to_string()),
                    notes: Some("outline first".to_string()),
                    ..TaskUpdate::default()
                },
            )
            .await
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    let Some(tasklane::domain::Document::Inbox(view)) =
        harness.store.read(&keys::views::inbox())
    else {
        panic!("inbox missing");
    };
    assert_eq!(view.tasks[0].title, "draft v2");
    assert!(view.tasks[0].has_notes);

    mutation.await.unwrap().unwrap();
    settle().await;

    assert_eq!(
        harness.store.read(&keys::views::inbox()),
        Some(inbox(vec![confirmed]))
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_update_rolls_back_every_copy() {
    let harness = Harness::new(SyncConfig::immediate());
    let home = project("home");
    let mut errand = task("fix shelf");
    errand.project_id = Some(home.id);
    let detail_key = keys::projects::detail(home.id);
    harness.seed(keys::views::today(), today(vec![errand.clone()]));
    harness.seed(detail_key.clone(), project_detail(home, vec![errand.clone()]));
    let before_today = harness.store.read(&keys::views::today());
    let before_detail = harness.store.read(&detail_key);
    harness.transport.respond(Err(network_down()));

    let result = harness
        .coordinator
        .update_task(
            errand.id,
            TaskUpdate {
                title: Some("fix the shelf".to_string()),
                high_priority: Some(true),
                ..TaskUpdate::default()
            },
        )
        .await;

    assert!(matches!(result, Err(MutationError::Failed(_))));
    assert_eq!(harness.store.read(&keys::views::today()), before_today);
    assert_eq!(harness.store.read(&detail_key), before_detail);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fetch_started_before_a_mutation_cannot_overwrite_it() {
    let harness = Harness::new(SyncConfig::immediate());
    let errand = task("old title");
    harness.seed(keys::views::today(), today(vec![errand.clone()]));
    harness.store.mark_stale(&keys::views::root());
    harness.transport.delay_fetch(Duration::from_millis(100));

    let client = std::sync::Arc::clone(&harness.client);
    let stale_fetch = tokio::spawn(async move { client.fetch(&keys::views::today()).await });
    settle().await;

    let mut renamed = errand.clone();
    renamed.title = "new title".to_string();
    harness
        .transport
        .serve(keys::views::today(), today(vec![renamed.clone()]));
    harness
        .coordinator
        .update_task(
            errand.id,
            TaskUpdate {
                title: Some("new title".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();

    let fetched = stale_fetch.await.unwrap().unwrap();
    assert_eq!(today_tasks(&fetched)[0].title, "old title");
    assert_eq!(
        today_tasks(&harness.store.read(&keys::views::today()).unwrap())[0].title,
        "new title"
    );
}

// =============================================================================
// Conflicts and non-optimistic writes
// =============================================================================

#[rstest]
#[tokio::test(start_paused = true)]
async fn duplicate_tag_surfaces_a_structured_conflict() {
    let harness = Harness::new(SyncConfig::immediate());
    harness.transport.respond(Err(TransportError::Conflict {
        code: "duplicate_title".to_string(),
        message: "a tag named errands already exists".to_string(),
    }));

    let result = harness
        .coordinator
        .create_tag(CreateTagRequest {
            title: "errands".to_string(),
            color: None,
        })
        .await;

    assert_eq!(
        result,
        Err(MutationError::Conflict(ConflictError {
            code: "duplicate_title".to_string(),
            message: "a tag named errands already exists".to_string(),
        }))
    );
    assert!(harness.store.is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn restore_writes_nothing_before_the_server_answers() {
    let harness = Harness::new(SyncConfig::immediate());
    let errand = task("old receipt");
    let before = today(vec![errand.clone()]);
    harness.seed(keys::views::today(), before.clone());
    harness.transport.delay_execute(Duration::from_millis(50));

    let coordinator = harness.coordinator.clone();
    let id = errand.id;
    let mutation = tokio::spawn(async move { coordinator.restore_task(id).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(harness.store.read(&keys::views::today()), Some(before));
    mutation.await.unwrap().unwrap();
    assert_eq!(
        harness.transport.requests(),
        vec![RemoteRequest::RestoreTask(id)]
    );
}
