//! Deferral and flushing of invalidations.

mod common;

use std::time::Duration;

use rstest::rstest;

use tasklane::cache::{InvalidationScope, keys};
use tasklane::config::SyncConfig;

use common::{Harness, inbox, settle, task, today};

fn refresh_views() -> Vec<InvalidationScope> {
    vec![InvalidationScope::Invalidate(keys::views::root())]
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn unblocked_gate_invalidates_immediately() {
    let harness = Harness::new(SyncConfig::default());
    harness.seed(keys::views::today(), today(vec![task("a")]));

    let handle = harness.gate.request_invalidation(refresh_views()).unwrap();
    let report = handle.await.unwrap();

    assert_eq!(report.refetched, 1);
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn open_panel_defers_until_closed_then_refetches_once() {
    let harness = Harness::new(SyncConfig::default());
    let open = task("being edited");
    harness.seed(keys::views::today(), today(vec![open.clone()]));
    harness.seed(keys::views::inbox(), inbox(vec![]));
    harness.gate.expand_task(Some(open.id));

    for _ in 0..3 {
        assert!(harness.gate.request_invalidation(refresh_views()).is_none());
    }
    assert!(
        harness
            .gate
            .request_invalidation([InvalidationScope::Invalidate(keys::views::inbox())])
            .is_none()
    );
    settle().await;
    assert!(harness.transport.fetches().is_empty());
    assert_eq!(harness.gate.pending_scopes().len(), 2);

    harness.gate.expand_task(None);
    assert!(harness.gate.is_departing(open.id));

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
    assert_eq!(harness.transport.fetch_count(&keys::views::inbox()), 1);
    assert!(harness.gate.pending_scopes().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!harness.gate.is_departing(open.id));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn closing_panel_with_nothing_pending_is_quiet() {
    let harness = Harness::new(SyncConfig::default());
    let open = task("read only");
    harness.seed(keys::views::today(), today(vec![open.clone()]));

    harness.gate.expand_task(Some(open.id));
    harness.gate.expand_task(None);
    settle().await;

    assert!(!harness.gate.is_departing(open.id));
    assert!(harness.gate.flush_pending().is_none());
    assert!(harness.transport.fetches().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn switching_panels_keeps_the_gate_blocked() {
    let harness = Harness::new(SyncConfig::default());
    harness.seed(keys::views::today(), today(vec![]));
    harness.gate.expand_task(Some(task("first").id));
    harness.gate.request_invalidation(refresh_views());

    harness.gate.expand_task(Some(task("second").id));
    settle().await;

    assert!(harness.gate.is_blocked());
    assert!(harness.transport.fetches().is_empty());
    assert_eq!(harness.gate.pending_scopes(), refresh_views());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn releasing_the_last_hold_flushes() {
    let harness = Harness::new(SyncConfig::default());
    harness.seed(keys::views::today(), today(vec![]));
    let first = task("first").id;
    let second = task("second").id;

    let hold_first = harness.gate.hold_departure(first);
    let hold_second = harness.gate.hold_departure(second);
    harness.gate.request_invalidation(refresh_views());

    hold_first.release();
    settle().await;
    assert!(harness.transport.fetches().is_empty());

    drop(hold_second);
    settle().await;
    assert_eq!(harness.transport.fetch_count(&keys::views::today()), 1);
    assert!(harness.gate.is_departing(first));
    assert!(harness.gate.is_departing(second));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn removal_scopes_evict_before_refetching() {
    let harness = Harness::new(SyncConfig::default());
    let gone = task("deleted elsewhere");
    harness.seed(
        keys::tasks::detail(gone.id),
        tasklane::domain::Document::TaskDetail(Box::new(
            tasklane::domain::TaskDetail::from_task(gone.clone()),
        )),
    );
    harness.seed(keys::views::today(), today(vec![gone.clone()]));

    let report = harness
        .gate
        .request_invalidation([
            InvalidationScope::Remove(keys::tasks::detail(gone.id)),
            InvalidationScope::Invalidate(keys::views::root()),
        ])
        .unwrap()
        .await
        .unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.refetched, 1);
    assert!(harness.store.read(&keys::tasks::detail(gone.id)).is_none());
    assert_eq!(harness.transport.fetch_count(&keys::tasks::detail(gone.id)), 0);
}
