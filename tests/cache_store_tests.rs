//! Cross-document consistency of the entity cache and exactness of rollback.

mod common;

use proptest::prelude::*;
use rstest::rstest;

use tasklane::cache::{CacheStore, keys};
use tasklane::domain::document::TaskList;
use tasklane::domain::{Document, EntityPatch, SortField, Task, TaskPatch, TaskStatus};

use common::{inbox, project, project_detail, task, today, today_tasks};

// =============================================================================
// Cross-document patching
// =============================================================================

#[rstest]
fn patch_reaches_every_embedded_copy() {
    let store = CacheStore::new();
    let errand = task("buy stamps");
    let other = task("call bank");
    let groceries = project("groceries");
    let mut filed = errand.clone();
    filed.project_id = Some(groceries.id);

    store.write(keys::views::today(), today(vec![errand.clone(), other.clone()]));
    store.write(
        keys::projects::detail(groceries.id),
        project_detail(groceries.clone(), vec![filed]),
    );
    store.write(
        keys::tasks::list(Some("stamps")),
        Document::TaskList(TaskList {
            tasks: vec![errand.clone()],
        }),
    );

    let touched = store.patch_entity_everywhere(&EntityPatch::Task(
        errand.id,
        TaskPatch::new().with_title("buy stamps and envelopes"),
    ));

    assert_eq!(touched, 3);
    let in_today = today_tasks(&store.read(&keys::views::today()).unwrap());
    assert_eq!(in_today[0].title, "buy stamps and envelopes");
    assert_eq!(in_today[1], other);

    let Some(Document::ProjectDetail(detail)) = store.read(&keys::projects::detail(groceries.id))
    else {
        panic!("project detail missing");
    };
    assert_eq!(detail.tasks_without_heading[0].title, "buy stamps and envelopes");
    assert_eq!(detail.tasks_without_heading[0].project_id, Some(groceries.id));
}

#[rstest]
fn patch_for_unknown_entity_touches_nothing() {
    let store = CacheStore::new();
    let before = today(vec![task("a"), task("b")]);
    store.write(keys::views::today(), before.clone());

    let touched = store.patch_entity_everywhere(&EntityPatch::Task(
        task("ghost").id,
        TaskPatch::new().with_status(TaskStatus::Completed),
    ));

    assert_eq!(touched, 0);
    assert_eq!(store.read(&keys::views::today()), Some(before));
}

#[rstest]
fn reorder_resorts_view_lists_only() {
    let store = CacheStore::new();
    let first = task("first").with_sort_order(SortField::Today, 1024.0);
    let second = task("second").with_sort_order(SortField::Today, 2048.0);
    let third = task("third").with_sort_order(SortField::Today, 3072.0);
    let list = vec![first.clone(), second.clone(), third.clone()];
    store.write(keys::views::today(), today(list.clone()));
    store.write(
        keys::tasks::list(None),
        Document::TaskList(TaskList { tasks: list }),
    );

    store.reorder_task_everywhere(third.id, SortField::Today, 512.0);

    let order: Vec<_> = today_tasks(&store.read(&keys::views::today()).unwrap())
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(order, ["third", "first", "second"]);

    let Some(Document::TaskList(unsorted)) = store.read(&keys::tasks::list(None)) else {
        panic!("task list missing");
    };
    assert_eq!(unsorted.tasks[2].id, third.id);
    assert_eq!(unsorted.tasks[2].sort_order_today, 512.0);
}

#[rstest]
fn stale_flag_survives_patching() {
    let store = CacheStore::new();
    let errand = task("errand");
    store.write(keys::views::inbox(), inbox(vec![errand.clone()]));
    store.mark_stale(&keys::views::root());

    store.patch_entity_everywhere(&EntityPatch::Task(
        errand.id,
        TaskPatch::new().with_title("renamed"),
    ));

    assert!(store.entry(&keys::views::inbox()).unwrap().stale);
}

// =============================================================================
// Snapshot and rollback
// =============================================================================

#[rstest]
fn rollback_restores_evicted_keys_and_leaves_others_alone() {
    let store = CacheStore::new();
    let errand = task("errand");
    store.write(keys::views::inbox(), inbox(vec![errand.clone()]));
    let snapshot = store.snapshot(&[keys::views::root()]);

    store.remove(&keys::views::root());
    store.write(keys::tags::all(), Document::Raw(serde_json::json!({"tags": []})));
    store.rollback(snapshot);

    assert_eq!(store.read(&keys::views::inbox()), Some(inbox(vec![errand])));
    assert!(store.read(&keys::tags::all()).is_some());
}

fn arbitrary_patch() -> impl Strategy<Value = TaskPatch> {
    (
        proptest::option::of("[a-z ]{1,12}"),
        proptest::option::of(prop_oneof![
            Just(TaskStatus::Open),
            Just(TaskStatus::Completed),
            Just(TaskStatus::Canceled),
            Just(TaskStatus::WontDo),
        ]),
        proptest::option::of(proptest::option::of("2026-0[1-9]-1[0-9]")),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(title, status, when_date, high_priority)| TaskPatch {
            title,
            status,
            when_date,
            high_priority,
            ..TaskPatch::default()
        })
}

proptest! {
    /// Whatever sequence of patches lands after a capture, rollback restores
    /// the captured documents exactly.
    #[test]
    fn rollback_is_exact(
        titles in prop::collection::vec("[a-z]{1,8}", 1..6),
        patches in prop::collection::vec((any::<prop::sample::Index>(), arbitrary_patch()), 0..8),
    ) {
        let store = CacheStore::new();
        let tasks: Vec<Task> = titles.iter().map(|title| task(title)).collect();
        store.write(keys::views::today(), today(tasks.clone()));
        store.write(keys::views::inbox(), inbox(tasks.clone()));
        let before_today = store.read(&keys::views::today());
        let before_inbox = store.read(&keys::views::inbox());

        let snapshot = store.snapshot(&keys::entity_roots());
        for (index, patch) in patches {
            let target = index.get(&tasks).id;
            store.patch_entity_everywhere(&EntityPatch::Task(target, patch));
        }
        store.rollback(snapshot);

        prop_assert_eq!(store.read(&keys::views::today()), before_today);
        prop_assert_eq!(store.read(&keys::views::inbox()), before_inbox);
    }
}
