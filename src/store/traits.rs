//! Unified `EmailStore` trait — single async interface for all persistence.
//!
//! The pipeline writes emails, threads, and the ingest queue through this
//! trait; the thread resolver reads through its [`ThreadLookup`] supertrait.
//! Concrete backends live behind it so the engines never see one.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::records::{EmailRecord, PendingEvent, ThreadRecord};
use crate::threading::ThreadLookup;

/// Backend-agnostic persistence trait covering emails, threads, and the
/// ingest event queue.
#[async_trait]
pub trait EmailStore: ThreadLookup {
    // ── Emails ──────────────────────────────────────────────────────

    /// Look up an email by its provider message id. Dedup primitive.
    async fn find_email_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<EmailRecord>, StoreError>;

    /// Insert a processed email row.
    async fn insert_email(&self, email: EmailRecord) -> Result<(), StoreError>;

    // ── Threads ─────────────────────────────────────────────────────

    /// Idempotent thread creation keyed on the record's fingerprint.
    ///
    /// When a thread with the same fingerprint already exists, the existing
    /// record is returned unchanged — a losing concurrent writer is
    /// redirected to the winner's thread instead of duplicating the
    /// conversation. This is where the create race closes; the resolver
    /// never handles it.
    async fn create_thread(&self, thread: ThreadRecord) -> Result<ThreadRecord, StoreError>;

    /// Refresh a thread's `last_activity_at` and merge newly seen
    /// participants.
    async fn touch_thread(
        &self,
        thread_id: &str,
        at: DateTime<Utc>,
        participants: &BTreeSet<String>,
    ) -> Result<(), StoreError>;

    // ── Ingest queue ────────────────────────────────────────────────

    /// Queue a raw provider event for the ingest worker. Called by the
    /// webhook and sync collaborators.
    async fn enqueue_event(&self, payload: serde_json::Value) -> Result<Uuid, StoreError>;

    /// Pending events whose `next_attempt_at` has passed, oldest first.
    async fn due_events(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<PendingEvent>, StoreError>;

    /// Number of events still pending (including ones parked for retry).
    async fn pending_event_count(&self) -> Result<usize, StoreError>;

    /// Mark an event fully processed.
    async fn mark_event_done(&self, event_id: Uuid) -> Result<(), StoreError>;

    /// Park an event for a later retry, recording the failure.
    async fn reschedule_event(
        &self,
        event_id: Uuid,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Mark an event permanently failed, recording the final error.
    async fn mark_event_failed(&self, event_id: Uuid, error: &str) -> Result<(), StoreError>;
}
