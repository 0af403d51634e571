//! Scheduled task store integration tests against SQLite.

mod common;

use chrono::{Duration, Utc};
use common::TestContext;
use concord_core::TaskStatus;
use concord_jobs::{cron_expressions, DistributedLockExt, ScheduledTaskDescriptor, TaskDescriptorStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ImportCursor {
    last_seen: u64,
    source: String,
}

fn import_task(id: &str) -> ScheduledTaskDescriptor<ImportCursor> {
    ScheduledTaskDescriptor::new(id, "import")
        .with_group("nightly")
        .with_description("Import partner feed")
        .with_state(ImportCursor {
            last_seen: 41,
            source: "partner-a".to_string(),
        })
}

#[tokio::test]
async fn test_save_twice_keeps_one_identical_row() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();

    let now = Utc::now();
    let mut task = import_task("import-partner-a").with_next_execution(now);
    task.mark_running("worker-1", now);
    task.set_progress(0.5);

    store.save(&task).await.unwrap();
    let first = store.get_by_id("import-partner-a").await.unwrap().unwrap();
    store.save(&task).await.unwrap();
    let second = store.get_by_id("import-partner-a").await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(second, task);
    assert_eq!(store.list_due(now + Duration::days(365), 100).await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_save_overwrites_every_field() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();
    let now = Utc::now();

    let mut task = import_task("import-partner-b");
    task.mark_running("worker-1", now);
    store.save(&task).await.unwrap();

    task.mark_faulted("feed returned 503", Some(now + Duration::minutes(5)));
    task.state = None;
    store.save(&task).await.unwrap();

    let stored = store.get_by_id("import-partner-b").await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Faulted);
    assert_eq!(stored.errors, vec!["feed returned 503".to_string()]);
    assert!(stored.state.is_none());
    assert_eq!(stored.next_execution, Some(now + Duration::minutes(5)));
}

#[tokio::test]
async fn test_missing_task_is_none() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();
    assert!(store.get_by_id("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_due_skips_running_and_future_tasks() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();
    let now = Utc::now();

    let overdue = import_task("overdue").with_next_execution(now - Duration::minutes(10));
    let due = import_task("due").with_next_execution(now - Duration::minutes(1));
    let future = import_task("future").with_next_execution(now + Duration::minutes(10));
    let mut running = import_task("running").with_next_execution(now - Duration::minutes(5));
    running.mark_running("worker-1", now);
    let mut recurring = import_task("recurring");
    recurring.mark_completed(Some(now - Duration::minutes(2)));

    for task in [&overdue, &due, &future, &running, &recurring] {
        store.save(task).await.unwrap();
    }

    let ids: Vec<String> = store
        .list_due(now, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(ids, vec!["overdue", "recurring", "due"]);

    let limited = store.list_due(now, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, "overdue");
}

#[tokio::test]
async fn test_delete_task() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();
    store.save(&import_task("temporary")).await.unwrap();

    assert!(store.delete("temporary").await.unwrap());
    assert!(!store.delete("temporary").await.unwrap());
    assert!(store.get_by_id("temporary").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recurring_run_under_lock() {
    let ctx = TestContext::new().await;
    let store: TaskDescriptorStore<ImportCursor> = ctx.tasks();
    let locks = ctx.locks();
    let schedule = cron_expressions::parse(cron_expressions::EVERY_HOUR).unwrap();
    let now = Utc::now();

    store
        .save(&import_task("hourly-import").with_next_execution(now))
        .await
        .unwrap();

    for mut task in store.list_due(now, 10).await.unwrap() {
        let store = store.clone();
        let schedule = schedule.clone();
        locks
            .with_lock(&task.id.clone(), None, |_lease| async move {
                task.mark_running("worker-1", now);
                store.save(&task).await?;
                task.schedule_next(&schedule, now);
                let next = task.next_execution;
                task.mark_completed(next);
                store.save(&task).await
            })
            .await
            .unwrap();
    }

    let stored = store.get_by_id("hourly-import").await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.execution_count, 1);
    assert!(stored.next_execution.is_some_and(|next| next > now));
    assert!(store.list_due(now, 10).await.unwrap().is_empty());
}
