//! Fetch bookkeeping of the query client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use tasklane::cache::{InvalidationScope, keys};
use tasklane::config::SyncConfig;
use tasklane::query::InvalidationReport;

use common::{Harness, inbox, settle, task, today};

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelled_refetch_is_reported_as_abandoned() {
    let harness = Harness::new(SyncConfig::immediate());
    harness.seed(keys::views::today(), today(vec![task("a")]));
    harness.transport.delay_fetch(Duration::from_millis(100));

    let client = Arc::clone(&harness.client);
    let refresh = tokio::spawn(async move {
        client
            .invalidate(&[InvalidationScope::Invalidate(keys::views::root())])
            .await
    });
    settle().await;
    assert_eq!(harness.client.in_flight_keys(), 1);

    harness.client.cancel(&keys::views::root());
    let report = refresh.await.unwrap();

    assert_eq!(
        report,
        InvalidationReport {
            removed: 0,
            refetched: 0,
            abandoned: 1,
            failed: 0,
        }
    );
    assert!(harness.store.entry(&keys::views::today()).unwrap().stale);
    assert_eq!(harness.client.in_flight_keys(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn finished_and_dropped_fetches_leave_no_bookkeeping() {
    let harness = Harness::new(SyncConfig::immediate());
    harness.seed(keys::views::today(), today(vec![]));
    harness.seed(keys::views::inbox(), inbox(vec![]));
    harness.store.mark_stale(&keys::views::root());

    harness.client.fetch(&keys::views::today()).await.unwrap();
    assert_eq!(harness.client.in_flight_keys(), 0);

    harness.transport.delay_fetch(Duration::from_millis(100));
    let client = Arc::clone(&harness.client);
    let pending = tokio::spawn(async move { client.fetch(&keys::views::inbox()).await });
    settle().await;
    assert_eq!(harness.client.in_flight_keys(), 1);

    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());
    assert_eq!(harness.client.in_flight_keys(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn uncancelled_refetch_counts_as_refetched() {
    let harness = Harness::new(SyncConfig::immediate());
    harness.seed(keys::views::today(), today(vec![task("a")]));
    harness.seed(keys::views::inbox(), inbox(vec![]));

    let report = harness
        .client
        .invalidate(&[InvalidationScope::Invalidate(keys::views::root())])
        .await;

    assert_eq!(report.refetched, 2);
    assert_eq!(report.abandoned, 0);
    assert!(!harness.store.entry(&keys::views::today()).unwrap().stale);
}
