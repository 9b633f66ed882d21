//! Background ingest worker — drains queued provider events through the
//! processor with bounded retries.
//!
//! Webhook and sync collaborators enqueue raw events via the store; the
//! worker runs on a timer, decodes each due event, and hands it to
//! `EmailProcessor::process`. Failures retry on a fixed backoff schedule
//! (30s, 5m, 30m); after `max_attempts` the event is marked failed and
//! surfaced in the log, never silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RetryConfig;
use crate::payload::EmailPayload;
use crate::pipeline::processor::EmailProcessor;
use crate::store::EmailStore;

/// Max events drained per tick.
const DRAIN_BATCH_SIZE: usize = 50;

/// Spawn the ingest worker loop.
///
/// Returns a `JoinHandle` and a shutdown flag. Set the flag to stop the
/// worker at its next tick.
pub fn spawn_ingest_worker(
    store: Arc<dyn EmailStore>,
    processor: Arc<EmailProcessor>,
    retry: RetryConfig,
    interval_secs: u64,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("ingest worker started, draining every {interval_secs}s");

        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("ingest worker shutting down");
                return;
            }

            drain_due_events(&store, &processor, &retry).await;
        }
    });

    (handle, shutdown_flag)
}

/// Drain one batch of due events. Returns the number of events handled.
pub async fn drain_due_events(
    store: &Arc<dyn EmailStore>,
    processor: &Arc<EmailProcessor>,
    retry: &RetryConfig,
) -> usize {
    let due = match store.due_events(Utc::now(), DRAIN_BATCH_SIZE).await {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "failed to fetch due events");
            return 0;
        }
    };

    if due.is_empty() {
        return 0;
    }

    debug!(count = due.len(), "draining due events");

    let mut handled = 0;
    for event in due {
        let payload = match serde_json::from_value::<EmailPayload>(event.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                // Undecodable events can never succeed, no point retrying
                error!(event_id = %event.id, error = %e, "event payload undecodable, marking failed");
                if let Err(e) = store
                    .mark_event_failed(event.id, &format!("undecodable payload: {e}"))
                    .await
                {
                    error!(event_id = %event.id, error = %e, "failed to mark event failed");
                }
                handled += 1;
                continue;
            }
        };

        match processor.process(payload).await {
            Ok(outcome) => {
                debug!(
                    event_id = %event.id,
                    email_id = %outcome.email_id(),
                    outcome = outcome.label(),
                    "event processed"
                );
                if let Err(e) = store.mark_event_done(event.id).await {
                    error!(event_id = %event.id, error = %e, "failed to mark event done");
                }
            }
            Err(e) => {
                let attempts = event.attempts + 1;
                if attempts >= retry.max_attempts {
                    error!(
                        event_id = %event.id,
                        attempts,
                        error = %e,
                        "event failed permanently, retries exhausted"
                    );
                    if let Err(e) = store.mark_event_failed(event.id, &e.to_string()).await {
                        error!(event_id = %event.id, error = %e, "failed to mark event failed");
                    }
                } else {
                    let delay = retry.delay_for(event.attempts);
                    let next = Utc::now()
                        + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::seconds(30));
                    warn!(
                        event_id = %event.id,
                        attempts,
                        retry_in_secs = delay.as_secs(),
                        error = %e,
                        "event failed, scheduling retry"
                    );
                    if let Err(e) = store
                        .reschedule_event(event.id, next, &e.to_string())
                        .await
                    {
                        error!(event_id = %event.id, error = %e, "failed to reschedule event");
                    }
                }
            }
        }
        handled += 1;
    }

    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadingConfig;
    use crate::store::records::EventStatus;
    use crate::store::MemoryStore;

    fn setup() -> (Arc<dyn EmailStore>, Arc<MemoryStore>, Arc<EmailProcessor>) {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn EmailStore> = memory.clone();
        let processor = Arc::new(EmailProcessor::new(
            store.clone(),
            ThreadingConfig::default(),
        ));
        (store, memory, processor)
    }

    #[tokio::test]
    async fn drains_and_processes_queued_events() {
        let (store, memory, processor) = setup();
        let id = store
            .enqueue_event(serde_json::json!({
                "id": "m1",
                "subject": "GST Return for GSTR-1",
                "from": {"emailAddress": {"address": "client@example.com"}}
            }))
            .await
            .unwrap();

        let handled = drain_due_events(&store, &processor, &RetryConfig::default()).await;
        assert_eq!(handled, 1);
        assert_eq!(memory.event(id).await.unwrap().status, EventStatus::Done);
        assert_eq!(memory.email_count().await, 1);
    }

    #[tokio::test]
    async fn undecodable_event_fails_immediately() {
        let (store, memory, processor) = setup();
        // `toRecipients` must be an array — this can never deserialize
        let id = store
            .enqueue_event(serde_json::json!({"id": "m1", "toRecipients": 42}))
            .await
            .unwrap();

        drain_due_events(&store, &processor, &RetryConfig::default()).await;

        let event = memory.event(id).await.unwrap();
        assert_eq!(event.status, EventStatus::Failed);
        assert!(event.last_error.as_deref().unwrap().contains("undecodable"));
        assert_eq!(memory.email_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_payload_retries_then_fails() {
        let (store, memory, processor) = setup();
        // Decodes fine but has no provider id — processing errors each time
        let id = store
            .enqueue_event(serde_json::json!({"subject": "no id"}))
            .await
            .unwrap();

        let retry = RetryConfig {
            delays: vec![Duration::ZERO, Duration::ZERO, Duration::ZERO],
            max_attempts: 3,
        };

        // Attempt 1 → reschedule
        drain_due_events(&store, &processor, &retry).await;
        let event = memory.event(id).await.unwrap();
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.attempts, 1);
        assert!(event.last_error.is_some());

        // Attempt 2 → reschedule
        drain_due_events(&store, &processor, &retry).await;
        assert_eq!(memory.event(id).await.unwrap().attempts, 2);

        // Attempt 3 → retries exhausted
        drain_due_events(&store, &processor, &retry).await;
        let event = memory.event(id).await.unwrap();
        assert_eq!(event.status, EventStatus::Failed);
    }

    #[tokio::test]
    async fn duplicate_redelivery_drains_quietly() {
        let (store, memory, processor) = setup();
        let event = serde_json::json!({"id": "m1", "subject": "Hello"});
        store.enqueue_event(event.clone()).await.unwrap();
        store.enqueue_event(event).await.unwrap();

        let handled = drain_due_events(&store, &processor, &RetryConfig::default()).await;
        assert_eq!(handled, 2);
        assert_eq!(memory.email_count().await, 1);
        assert_eq!(store.pending_event_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn worker_loop_drains_and_shuts_down() {
        let (store, memory, processor) = setup();
        store
            .enqueue_event(serde_json::json!({"id": "m1", "subject": "Hi"}))
            .await
            .unwrap();

        let (handle, shutdown) = spawn_ingest_worker(
            store.clone(),
            processor,
            RetryConfig::default(),
            1,
        );

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(memory.email_count().await, 1);

        shutdown.store(true, Ordering::Relaxed);
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("worker should stop after shutdown flag")
            .unwrap();
    }
}
