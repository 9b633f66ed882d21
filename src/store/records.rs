//! Persisted record types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::EmailCategory;
use crate::threading::lookup::MatchMethod;

/// A persisted conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    /// Provider conversation id, when the first email of the thread had one.
    pub conversation_id: Option<String>,
    /// Subject of the thread's first email, as received.
    pub subject: String,
    pub normalized_subject: String,
    /// Every address seen on the thread so far (senders and recipients).
    pub participants: BTreeSet<String>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ThreadRecord {
    /// Uniqueness key for idempotent thread creation. Two concurrent writers
    /// producing the same fingerprint must end up with one thread.
    pub fn fingerprint(&self) -> String {
        thread_fingerprint(&self.normalized_subject, &self.participants)
    }
}

/// Fingerprint over the same signal the heuristic matching layer uses:
/// normalized subject plus the ordered participant set.
pub fn thread_fingerprint(normalized_subject: &str, participants: &BTreeSet<String>) -> String {
    let mut key = String::with_capacity(normalized_subject.len() + 16 * participants.len());
    key.push_str(normalized_subject);
    for address in participants {
        key.push('|');
        key.push_str(address);
    }
    key
}

/// A persisted email row carrying both engine results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Provider message id.
    pub id: String,
    /// Canonicalized RFC 5322 Message-ID (angle brackets removed).
    pub internet_message_id: String,
    pub thread_id: String,
    /// Prior email this one replies to, when the reference chain resolved it.
    pub parent_id: Option<String>,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub from_address: String,
    pub recipients: BTreeSet<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub category: EmailCategory,
    pub classification_confidence: f32,
    pub classification_matches: usize,
    pub threading_method: MatchMethod,
    pub threading_confidence: f32,
}

/// Status of a queued ingest event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Awaiting processing (or a retry slot).
    Pending,
    /// Fully processed.
    Done,
    /// Retries exhausted or event undecodable; surfaced, kept for audit.
    Failed,
}

/// A raw provider event queued for the ingest worker.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub id: Uuid,
    /// Raw payload JSON as the webhook/sync collaborator delivered it.
    pub payload: serde_json::Value,
    /// Processing attempts made so far.
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub status: EventStatus,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}
