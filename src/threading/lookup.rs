//! Lookup collaborator interface consumed by the thread resolver.
//!
//! The resolver never touches a concrete store — it reads prior state
//! through this trait, so the matching layers are testable with a mock and
//! the engine stays free of persistence concerns.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::records::{EmailRecord, ThreadRecord};

/// Which matching layer produced a thread assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ConversationId,
    RfcInReplyTo,
    SubjectParticipantHeuristic,
    NewThread,
}

impl MatchMethod {
    /// Wire tag, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConversationId => "conversation_id",
            Self::RfcInReplyTo => "rfc_in_reply_to",
            Self::SubjectParticipantHeuristic => "subject_participant_heuristic",
            Self::NewThread => "new_thread",
        }
    }
}

/// A successful match from one layer, before it becomes a `ThreadingResult`.
#[derive(Debug, Clone)]
pub struct ThreadMatch {
    pub thread_id: String,
    pub confidence: f32,
    pub method: MatchMethod,
    /// The specific prior email this one replies to, when resolvable.
    pub parent_id: Option<String>,
}

/// Read capability over prior threads and emails.
///
/// Implementations must treat every method as a point read — no writes, no
/// side effects. A failing lookup degrades the corresponding matching layer
/// to "no match"; it never aborts resolution.
#[async_trait]
pub trait ThreadLookup: Send + Sync {
    /// Thread previously recorded under the provider's conversation id.
    async fn find_thread_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError>;

    /// Prior email whose canonicalized Message-ID equals `message_id`.
    async fn find_email_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<EmailRecord>, StoreError>;

    /// Most recently active thread with the given normalized subject whose
    /// participant set overlaps `participants` above the store's floor,
    /// restricted to activity within the last `window_days`.
    async fn find_recent_thread_by_subject(
        &self,
        normalized_subject: &str,
        participants: &BTreeSet<String>,
        window_days: u32,
    ) -> Result<Option<ThreadRecord>, StoreError>;
}
