//! The individual matching layers of the thread resolver.
//!
//! Each layer is an independent, side-effect-free function over
//! `(payload, lookup)` returning `Some(ThreadMatch)` on success. A layer
//! whose precondition is absent simply returns `None`; a failing lookup is
//! logged and also treated as no-match, so resolution degrades to the next
//! layer instead of aborting.

use tracing::warn;

use crate::config::ThreadingConfig;
use crate::payload::EmailPayload;
use crate::threading::lookup::{MatchMethod, ThreadLookup, ThreadMatch};
use crate::threading::participants::{participant_overlap, participant_set};
use crate::threading::subject::{clean_message_id, normalize_subject};

/// Confidence of a provider conversation-id match. Authoritative.
pub const CONVERSATION_ID_CONFIDENCE: f32 = 1.0;

/// Confidence of an RFC 5322 reference-chain match.
pub const REFERENCE_CHAIN_CONFIDENCE: f32 = 0.99;

/// Bounds of the heuristic layer's confidence band. Stays strictly below
/// the reference-chain layer for any overlap/recency combination.
pub const HEURISTIC_MIN_CONFIDENCE: f32 = 0.5;
pub const HEURISTIC_MAX_CONFIDENCE: f32 = 0.85;

/// Layer 1: the provider's own conversation grouping signal.
pub(crate) async fn match_conversation_id(
    payload: &EmailPayload,
    lookup: &dyn ThreadLookup,
) -> Option<ThreadMatch> {
    let conversation_id = payload
        .conversation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    match lookup.find_thread_by_conversation_id(conversation_id).await {
        Ok(Some(thread)) => Some(ThreadMatch {
            thread_id: thread.id,
            confidence: CONVERSATION_ID_CONFIDENCE,
            method: MatchMethod::ConversationId,
            parent_id: None,
        }),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "conversation-id lookup failed, treating as no match");
            None
        }
    }
}

/// Layer 2: RFC 5322 reference chain.
///
/// Canonicalizes `In-Reply-To`, falling back to the last `References` entry,
/// and inherits the thread of the prior email that id resolves to. Anchors
/// threading to mail semantics even when forwarding or relays rewrite the
/// provider's conversation ids.
pub(crate) async fn match_reference_chain(
    payload: &EmailPayload,
    lookup: &dyn ThreadLookup,
) -> Option<ThreadMatch> {
    let target = payload
        .in_reply_to()
        .map(clean_message_id)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            payload
                .references()
                .last()
                .map(|r| clean_message_id(r))
                .filter(|id| !id.is_empty())
        })?;

    match lookup.find_email_by_message_id(&target).await {
        Ok(Some(parent)) => Some(ThreadMatch {
            thread_id: parent.thread_id,
            confidence: REFERENCE_CHAIN_CONFIDENCE,
            method: MatchMethod::RfcInReplyTo,
            parent_id: Some(parent.id),
        }),
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "message-id lookup failed, treating as no match");
            None
        }
    }
}

/// Layer 3: normalized subject + participant overlap within a recency window.
///
/// Confidence scales with the Jaccard overlap of the participant sets and
/// with how recently the candidate thread was active, clamped to the
/// heuristic band.
pub(crate) async fn match_subject_participants(
    payload: &EmailPayload,
    lookup: &dyn ThreadLookup,
    config: &ThreadingConfig,
) -> Option<ThreadMatch> {
    let normalized = normalize_subject(payload.subject_text());
    if normalized.is_empty() {
        return None;
    }

    let participants = participant_set(payload);
    if participants.is_empty() {
        return None;
    }

    let thread = match lookup
        .find_recent_thread_by_subject(&normalized, &participants, config.window_days)
        .await
    {
        Ok(Some(thread)) => thread,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "subject/participant lookup failed, treating as no match");
            return None;
        }
    };

    let overlap = participant_overlap(&participants, &thread.participants);
    if overlap < config.min_participant_overlap {
        return None;
    }

    let received = payload
        .received_date_time
        .unwrap_or_else(chrono::Utc::now);
    let age_days = (received - thread.last_activity_at).num_seconds().max(0) as f32 / 86_400.0;
    let window = config.window_days.max(1) as f32;
    let recency = (1.0 - age_days / window).clamp(0.0, 1.0);

    let confidence = (HEURISTIC_MIN_CONFIDENCE + 0.35 * overlap + 0.1 * recency)
        .clamp(HEURISTIC_MIN_CONFIDENCE, HEURISTIC_MAX_CONFIDENCE);

    Some(ThreadMatch {
        thread_id: thread.id,
        confidence,
        method: MatchMethod::SubjectParticipantHeuristic,
        parent_id: None,
    })
}
