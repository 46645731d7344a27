//! Push events feeding the invalidation gate.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use tasklane::cache::{InvalidationScope, keys};
use tasklane::config::SyncConfig;
use tasklane::domain::{ProjectId, TaskId};
use tasklane::error::TransportError;
use tasklane::events::{EventInvalidator, PushChannel, PushEvent, RawPushEvent};

use common::{FakePushChannel, Harness, project, project_detail, settle, task, today};

fn invalidator(harness: &Harness, channel: &Arc<FakePushChannel>) -> Arc<EventInvalidator> {
    Arc::new(EventInvalidator::new(
        Arc::clone(&harness.gate),
        Arc::clone(channel) as Arc<dyn PushChannel>,
    ))
}

#[rstest]
#[case(
    RawPushEvent::new("task_created", r#"{"type":"task_created"}"#),
    vec![
        InvalidationScope::Invalidate(keys::views::root()),
        InvalidationScope::Invalidate(keys::tasks::all()),
    ]
)]
#[case(
    RawPushEvent::new("tag_updated", ""),
    vec![
        InvalidationScope::Invalidate(keys::tags::all()),
        InvalidationScope::Invalidate(keys::views::root()),
    ]
)]
#[case(
    RawPushEvent::new("saved_filter_changed", r#"{"view":"today"}"#),
    vec![InvalidationScope::Invalidate(keys::saved_filters::view("today"))]
)]
fn events_map_to_scopes(#[case] raw: RawPushEvent, #[case] expected: Vec<InvalidationScope>) {
    assert_eq!(PushEvent::try_from(&raw).unwrap().scopes(), expected);
}

#[rstest]
fn project_update_refreshes_its_detail_first() {
    let id = ProjectId::generate();
    let raw = RawPushEvent::new("project_updated", format!(r#"{{"id":"{id}"}}"#));
    assert_eq!(
        PushEvent::try_from(&raw).unwrap(),
        PushEvent::ProjectUpdated { id: Some(id) }
    );
    assert_eq!(
        PushEvent::ProjectUpdated { id: Some(id) }.scopes(),
        vec![
            InvalidationScope::Invalidate(keys::projects::detail(id)),
            InvalidationScope::Invalidate(keys::projects::all()),
            InvalidationScope::Invalidate(keys::views::root()),
        ]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn event_refetches_only_affected_documents() {
    let harness = Harness::new(SyncConfig::default());
    let home = project("home");
    harness.seed(keys::views::today(), today(vec![task("a")]));
    harness.seed(keys::projects::detail(home.id), project_detail(home.clone(), vec![]));
    let channel = FakePushChannel::new();
    let invalidator = invalidator(&harness, &channel);

    let id = TaskId::generate();
    let handled = invalidator.handle_raw(&RawPushEvent::new(
        "task_updated",
        format!(r#"{{"type":"task_updated","id":"{id}"}}"#),
    ));
    settle().await;

    assert_eq!(handled, Some(PushEvent::TaskUpdated { id: Some(id) }));
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
    assert_eq!(
        harness.transport.fetch_count(&keys::projects::detail(home.id)),
        0
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn malformed_event_is_dropped() {
    let harness = Harness::new(SyncConfig::default());
    harness.seed(keys::views::today(), today(vec![]));
    let channel = FakePushChannel::new();
    let invalidator = invalidator(&harness, &channel);

    assert_eq!(
        invalidator.handle_raw(&RawPushEvent::new("task_updated", "{oops")),
        None
    );
    assert_eq!(
        invalidator.handle_raw(&RawPushEvent::new("heartbeat", "")),
        None
    );
    settle().await;

    assert!(harness.transport.fetches().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn events_wait_behind_an_open_panel() {
    let harness = Harness::new(SyncConfig::default());
    let open = task("open in panel");
    harness.seed(keys::views::today(), today(vec![open.clone()]));
    harness.gate.expand_task(Some(open.id));
    let channel = FakePushChannel::new();
    let invalidator = invalidator(&harness, &channel);

    invalidator.handle(&PushEvent::BulkChange);
    settle().await;

    assert!(harness.transport.fetches().is_empty());
    assert_eq!(harness.gate.pending_scopes().len(), 5);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn reconnect_backs_off_and_catches_up_once_per_reconnection() {
    let harness = Harness::new(SyncConfig::default());
    harness.seed(keys::views::today(), today(vec![]));
    let channel = FakePushChannel::new();
    channel.script(Ok(vec![RawPushEvent::new("task_created", "")]));
    channel.script(Ok(vec![]));
    let handle = invalidator(&harness, &channel).spawn();

    settle().await;
    assert_eq!(channel.attempts(), 1);
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);

    // t = 1000ms: second connection, triggers the catch-up.
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    settle().await;
    assert_eq!(channel.attempts(), 2);
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 2);

    // t = 2000ms fails, the next attempt waits 2000ms more.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(channel.attempts(), 3);
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 2);

    handle.abort();
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_first_connection_does_not_trigger_catch_up() {
    let harness = Harness::new(SyncConfig::default().with_reconnect_delays_ms(10, 40));
    harness.seed(keys::views::today(), today(vec![]));
    let channel = FakePushChannel::new();
    channel.script(Err(TransportError::Network("offline".to_string())));
    channel.script(Ok(vec![]));
    let handle = invalidator(&harness, &channel).spawn();

    tokio::time::sleep(Duration::from_millis(15)).await;

    assert_eq!(channel.attempts(), 2);
    assert!(harness.transport.fetches().is_empty());
    handle.abort();
}
