//! In-memory store backend.
//!
//! Reference implementation of [`EmailStore`] used by the binary and the
//! test suite. All indexes live under one `RwLock`, so the fingerprint
//! check-then-insert in `create_thread` is atomic — two concurrent creators
//! of the same conversation get one winner.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::ThreadingConfig;
use crate::error::StoreError;
use crate::store::records::{EmailRecord, EventStatus, PendingEvent, ThreadRecord};
use crate::store::traits::EmailStore;
use crate::threading::{participant_overlap, ThreadLookup};

#[derive(Default)]
struct Inner {
    /// provider message id → email
    emails: HashMap<String, EmailRecord>,
    /// canonical Message-ID → provider message id
    emails_by_message_id: HashMap<String, String>,
    /// thread id → thread
    threads: HashMap<String, ThreadRecord>,
    /// provider conversation id → thread id
    threads_by_conversation: HashMap<String, String>,
    /// fingerprint → thread id
    threads_by_fingerprint: HashMap<String, String>,
    /// queued ingest events
    events: HashMap<Uuid, PendingEvent>,
}

/// In-memory `EmailStore` backend.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    config: ThreadingConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(ThreadingConfig::default())
    }

    /// Build a store whose heuristic lookup uses the given tunables.
    pub fn with_config(config: ThreadingConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// Number of stored emails. Test and introspection helper.
    pub async fn email_count(&self) -> usize {
        self.inner.read().await.emails.len()
    }

    /// Number of stored threads. Test and introspection helper.
    pub async fn thread_count(&self) -> usize {
        self.inner.read().await.threads.len()
    }

    /// Fetch a thread by id. Test and introspection helper.
    pub async fn thread(&self, thread_id: &str) -> Option<ThreadRecord> {
        self.inner.read().await.threads.get(thread_id).cloned()
    }

    /// Fetch an event by id. Test and introspection helper.
    pub async fn event(&self, event_id: Uuid) -> Option<PendingEvent> {
        self.inner.read().await.events.get(&event_id).cloned()
    }
}

#[async_trait]
impl ThreadLookup for MemoryStore {
    async fn find_thread_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .threads_by_conversation
            .get(conversation_id)
            .and_then(|thread_id| inner.threads.get(thread_id))
            .cloned())
    }

    async fn find_email_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<EmailRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails_by_message_id
            .get(message_id)
            .and_then(|provider_id| inner.emails.get(provider_id))
            .cloned())
    }

    async fn find_recent_thread_by_subject(
        &self,
        normalized_subject: &str,
        participants: &BTreeSet<String>,
        window_days: u32,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        let cutoff = Utc::now() - Duration::days(window_days as i64);
        let inner = self.inner.read().await;
        Ok(inner
            .threads
            .values()
            .filter(|t| t.normalized_subject == normalized_subject)
            .filter(|t| t.last_activity_at >= cutoff)
            .filter(|t| {
                participant_overlap(participants, &t.participants)
                    >= self.config.min_participant_overlap
            })
            .max_by_key(|t| t.last_activity_at)
            .cloned())
    }
}

#[async_trait]
impl EmailStore for MemoryStore {
    async fn find_email_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<EmailRecord>, StoreError> {
        Ok(self.inner.read().await.emails.get(provider_id).cloned())
    }

    async fn insert_email(&self, email: EmailRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&email.id) {
            return Err(StoreError::Constraint(format!(
                "email {} already exists",
                email.id
            )));
        }
        if !email.internet_message_id.is_empty() {
            inner
                .emails_by_message_id
                .insert(email.internet_message_id.clone(), email.id.clone());
        }
        inner.emails.insert(email.id.clone(), email);
        Ok(())
    }

    async fn create_thread(&self, thread: ThreadRecord) -> Result<ThreadRecord, StoreError> {
        let fingerprint = thread.fingerprint();
        let mut inner = self.inner.write().await;

        if let Some(existing_id) = inner.threads_by_fingerprint.get(&fingerprint)
            && let Some(existing) = inner.threads.get(existing_id)
        {
            debug!(
                thread_id = %existing.id,
                "thread fingerprint already taken, redirecting to winner"
            );
            return Ok(existing.clone());
        }

        inner
            .threads_by_fingerprint
            .insert(fingerprint, thread.id.clone());
        if let Some(ref conversation_id) = thread.conversation_id {
            inner
                .threads_by_conversation
                .insert(conversation_id.clone(), thread.id.clone());
        }
        inner.threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    async fn touch_thread(
        &self,
        thread_id: &str,
        at: DateTime<Utc>,
        participants: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let thread = inner.threads.get_mut(thread_id).ok_or_else(|| {
            StoreError::NotFound {
                entity: "thread".into(),
                id: thread_id.into(),
            }
        })?;
        if at > thread.last_activity_at {
            thread.last_activity_at = at;
        }
        thread.participants.extend(participants.iter().cloned());
        Ok(())
    }

    async fn enqueue_event(&self, payload: serde_json::Value) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let event = PendingEvent {
            id: Uuid::new_v4(),
            payload,
            attempts: 0,
            next_attempt_at: now,
            status: EventStatus::Pending,
            last_error: None,
            enqueued_at: now,
        };
        let id = event.id;
        self.inner.write().await.events.insert(id, event);
        Ok(id)
    }

    async fn due_events(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PendingEvent>, StoreError> {
        let inner = self.inner.read().await;
        let mut due: Vec<PendingEvent> = inner
            .events
            .values()
            .filter(|e| e.status == EventStatus::Pending && e.next_attempt_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.enqueued_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn pending_event_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .events
            .values()
            .filter(|e| e.status == EventStatus::Pending)
            .count())
    }

    async fn mark_event_done(&self, event_id: Uuid) -> Result<(), StoreError> {
        self.update_event(event_id, |event| {
            event.status = EventStatus::Done;
        })
        .await
    }

    async fn reschedule_event(
        &self,
        event_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError> {
        self.update_event(event_id, |event| {
            event.attempts += 1;
            event.next_attempt_at = next_attempt_at;
            event.last_error = Some(error.to_string());
        })
        .await
    }

    async fn mark_event_failed(&self, event_id: Uuid, error: &str) -> Result<(), StoreError> {
        self.update_event(event_id, |event| {
            event.status = EventStatus::Failed;
            event.last_error = Some(error.to_string());
        })
        .await
    }
}

impl MemoryStore {
    async fn update_event<F>(&self, event_id: Uuid, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut PendingEvent),
    {
        let mut inner = self.inner.write().await;
        let event = inner.events.get_mut(&event_id).ok_or_else(|| {
            StoreError::NotFound {
                entity: "event".into(),
                id: event_id.to_string(),
            }
        })?;
        apply(event);
        Ok(())
    }
}
