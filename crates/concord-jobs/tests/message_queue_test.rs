//! Message queue integration tests against SQLite.

mod common;

use common::TestContext;
use concord_core::{ConcordError, MessageId};
use concord_jobs::{MessageQueue, RetryOutcome};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SendEmail {
    to: String,
    template: String,
}

fn email(to: &str) -> SendEmail {
    SendEmail {
        to: to.to_string(),
        template: "welcome".to_string(),
    }
}

#[tokio::test]
async fn test_fifo_order() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");

    for to in ["a@example.com", "b@example.com", "c@example.com"] {
        queue.enqueue(&email(to), None, false).await.unwrap();
    }

    let mut seen = Vec::new();
    while let Some(message) = queue.dequeue().await.unwrap() {
        assert_eq!(message.dequeue_count, 1);
        seen.push(message.item.to);
    }
    assert_eq!(seen, vec!["a@example.com", "b@example.com", "c@example.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_claim_each_message_once() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");

    let mut enqueued = HashSet::new();
    for i in 0..5 {
        let id = queue
            .enqueue(&email(&format!("user{i}@example.com")), None, false)
            .await
            .unwrap();
        enqueued.insert(id);
    }

    let consumers = (0..12).map(|_| {
        let queue = queue.clone();
        tokio::spawn(async move { queue.dequeue().await })
    });
    let results: Vec<_> = join_all(consumers)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").unwrap())
        .collect();

    let claimed: Vec<MessageId> = results.iter().flatten().map(|m| m.id).collect();
    let unique: HashSet<MessageId> = claimed.iter().copied().collect();

    assert_eq!(claimed.len(), 5);
    assert_eq!(unique, enqueued);
    assert_eq!(results.iter().filter(|r| r.is_none()).count(), 7);
    assert_eq!(queue.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_poison_round_trip() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    let poison = queue.poison_queue();

    queue.enqueue(&email("x@example.com"), None, false).await.unwrap();
    let message = queue.dequeue().await.unwrap().unwrap();

    let id = queue
        .enqueue(&message.item, Some(message.id), true)
        .await
        .unwrap();
    assert_eq!(id, message.id);

    assert_eq!(queue.count().await.unwrap(), 0);
    assert!(queue.dequeue().await.unwrap().is_none());

    assert_eq!(poison.count().await.unwrap(), 1);
    let dead = poison.dequeue().await.unwrap().unwrap();
    assert_eq!(dead.id, message.id);
    assert_eq!(dead.queue_name, "emails-poison");
    assert_eq!(dead.dequeue_count, 3);
    assert!(poison.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn test_retry_or_poison_moves_after_max_dequeue_count() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    queue.enqueue(&email("flaky@example.com"), None, false).await.unwrap();

    let first = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(first.dequeue_count, 1);
    assert_eq!(queue.retry_or_poison(&first, 3).await.unwrap(), RetryOutcome::Retried);

    let second = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.dequeue_count, 3);
    assert_eq!(queue.retry_or_poison(&second, 3).await.unwrap(), RetryOutcome::Poisoned);

    assert!(queue.dequeue().await.unwrap().is_none());
    let poison = queue.poison_queue();
    assert_eq!(poison.count().await.unwrap(), 1);
    assert_eq!(poison.dequeue().await.unwrap().unwrap().dequeue_count, 5);
}

#[tokio::test]
async fn test_reenqueue_increments_dequeue_count() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    queue.enqueue(&email("again@example.com"), None, false).await.unwrap();

    let claimed = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(claimed.dequeue_count, 1);
    queue
        .enqueue(&claimed.item, Some(claimed.id), false)
        .await
        .unwrap();

    assert_eq!(queue.count().await.unwrap(), 1);
    let again = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(again.id, claimed.id);
    assert_eq!(again.dequeue_count, 3);
}

#[tokio::test]
async fn test_retried_message_goes_to_the_tail() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");

    for _ in 0..20 {
        queue.enqueue(&email("first@example.com"), None, false).await.unwrap();
        let first = queue.dequeue().await.unwrap().unwrap();
        queue.enqueue(&email("second@example.com"), None, false).await.unwrap();

        queue.enqueue(&first.item, Some(first.id), false).await.unwrap();

        let next = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(next.item.to, "second@example.com");
        let last = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(last.id, first.id);
        assert!(queue.dequeue().await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_peek_does_not_claim() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    assert!(queue.peek().await.unwrap().is_none());

    queue.enqueue(&email("peek@example.com"), None, false).await.unwrap();

    assert_eq!(queue.peek().await.unwrap(), Some(email("peek@example.com")));
    assert_eq!(queue.peek().await.unwrap(), Some(email("peek@example.com")));
    assert_eq!(queue.count().await.unwrap(), 1);

    let message = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(message.dequeue_count, 1);
}

#[tokio::test]
async fn test_queues_are_isolated_by_name() {
    let ctx = TestContext::new().await;
    let emails: MessageQueue<SendEmail> = ctx.queue("emails");
    let reports: MessageQueue<SendEmail> = ctx.queue("reports");

    emails.enqueue(&email("a@example.com"), None, false).await.unwrap();

    assert_eq!(reports.count().await.unwrap(), 0);
    assert!(reports.dequeue().await.unwrap().is_none());
    assert_eq!(emails.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_acknowledge_deletes_claimed_message() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    queue.enqueue(&email("ack@example.com"), None, false).await.unwrap();

    let message = queue.dequeue().await.unwrap().unwrap();
    assert!(queue.acknowledge(message.id).await.unwrap());
    assert!(!queue.acknowledge(message.id).await.unwrap());
}

#[tokio::test]
async fn test_undeserializable_message_can_be_quarantined() {
    let ctx = TestContext::new().await;
    let raw: MessageQueue<String> = ctx.queue("emails");
    let typed: MessageQueue<SendEmail> = ctx.queue("emails");

    let bad = raw.enqueue(&"not an email".to_string(), None, false).await.unwrap();
    typed.enqueue(&email("good@example.com"), None, false).await.unwrap();

    let err = typed.dequeue().await.unwrap_err();
    match err {
        ConcordError::Serialization { id, .. } => assert_eq!(id, Some(bad.to_string())),
        other => panic!("Expected Serialization error, got {other:?}"),
    }
    assert_eq!(typed.count().await.unwrap(), 2);

    assert!(typed.quarantine(bad).await.unwrap());

    let message = typed.dequeue().await.unwrap().unwrap();
    assert_eq!(message.item.to, "good@example.com");
    assert_eq!(raw.poison_queue().peek().await.unwrap().as_deref(), Some("not an email"));
}

#[tokio::test]
async fn test_purge_dequeued_keeps_recent_claims() {
    let ctx = TestContext::new().await;
    let queue: MessageQueue<SendEmail> = ctx.queue("emails");
    queue.enqueue(&email("old@example.com"), None, false).await.unwrap();
    queue.dequeue().await.unwrap().unwrap();

    assert_eq!(queue.purge_dequeued(Duration::from_secs(3600)).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(queue.purge_dequeued(Duration::from_millis(1)).await.unwrap(), 1);
}
