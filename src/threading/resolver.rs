//! Thread resolution engine — an ordered chain of matching layers.
//!
//! Higher-confidence, more-specific layers run first; the first success
//! wins. No layer is skipped based on payload shape — each returns no match
//! when its precondition is absent. When nothing matches, a fresh thread id
//! is synthesized.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::ThreadingConfig;
use crate::payload::EmailPayload;
use crate::threading::layers;
use crate::threading::lookup::{MatchMethod, ThreadLookup, ThreadMatch};

/// Outcome of thread resolution for one email.
///
/// Invariant: `is_new == true` ⇔ `confidence == 0.0` ⇔ `method == NewThread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadingResult {
    pub thread_id: String,
    pub confidence: f32,
    pub method: MatchMethod,
    pub is_new: bool,
    pub parent_id: Option<String>,
}

impl ThreadingResult {
    fn matched(m: ThreadMatch) -> Self {
        Self {
            thread_id: m.thread_id,
            confidence: m.confidence,
            method: m.method,
            is_new: false,
            parent_id: m.parent_id,
        }
    }

    fn new_thread(thread_id: String) -> Self {
        Self {
            thread_id,
            confidence: 0.0,
            method: MatchMethod::NewThread,
            is_new: true,
            parent_id: None,
        }
    }
}

/// Resolves each incoming email to a conversation thread.
///
/// Holds no state beyond its tunables; safe to share and call concurrently.
pub struct ThreadResolver {
    config: ThreadingConfig,
}

impl ThreadResolver {
    pub fn new(config: ThreadingConfig) -> Self {
        Self { config }
    }

    /// Run the matching layers in order and return the first hit, or a
    /// fresh thread when none match. Never fails: lookup errors degrade the
    /// affected layer to no-match.
    pub async fn resolve(
        &self,
        payload: &EmailPayload,
        lookup: &dyn ThreadLookup,
    ) -> ThreadingResult {
        if let Some(m) = layers::match_conversation_id(payload, lookup).await {
            debug!(id = %payload.id, thread_id = %m.thread_id, "matched by conversation id");
            return ThreadingResult::matched(m);
        }

        if let Some(m) = layers::match_reference_chain(payload, lookup).await {
            debug!(id = %payload.id, thread_id = %m.thread_id, "matched by reference chain");
            return ThreadingResult::matched(m);
        }

        if let Some(m) = layers::match_subject_participants(payload, lookup, &self.config).await {
            debug!(
                id = %payload.id,
                thread_id = %m.thread_id,
                confidence = m.confidence,
                "matched by subject/participant heuristic"
            );
            return ThreadingResult::matched(m);
        }

        let thread_id = new_thread_id();
        debug!(id = %payload.id, thread_id = %thread_id, "no layer matched, new thread");
        ThreadingResult::new_thread(thread_id)
    }
}

/// Globally unique opaque thread identifier.
pub(crate) fn new_thread_id() -> String {
    format!("thread_{}", Uuid::new_v4().simple())
}
