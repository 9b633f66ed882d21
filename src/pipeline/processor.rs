//! Email processor — runs one provider event through the full pipeline.
//!
//! Flow:
//! 1. Dedup by provider message id (delivery is at-least-once)
//! 2. Thread resolution (ordered matching layers)
//! 3. Thread bookkeeping — idempotent create for new threads, activity
//!    touch for existing ones
//! 4. Classification (confidence mode)
//! 5. Persist the email row carrying both results

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::classify::EmailClassifier;
use crate::config::ThreadingConfig;
use crate::error::PipelineError;
use crate::payload::EmailPayload;
use crate::pipeline::types::IngestOutcome;
use crate::store::records::{EmailRecord, ThreadRecord};
use crate::store::EmailStore;
use crate::threading::{
    clean_message_id, normalize_subject, participant_set, ThreadLookup, ThreadResolver,
};

/// Ties the two engines to a store and drives emails through them.
pub struct EmailProcessor {
    store: Arc<dyn EmailStore>,
    resolver: ThreadResolver,
    classifier: EmailClassifier,
}

impl EmailProcessor {
    pub fn new(store: Arc<dyn EmailStore>, config: ThreadingConfig) -> Self {
        Self {
            store,
            resolver: ThreadResolver::new(config),
            classifier: EmailClassifier::new(),
        }
    }

    /// Process a single provider event end to end.
    ///
    /// Safe to call twice with the same payload: the second call returns
    /// `Duplicate` without touching the engines or the store.
    pub async fn process(&self, payload: EmailPayload) -> Result<IngestOutcome, PipelineError> {
        if payload.id.trim().is_empty() {
            return Err(PipelineError::InvalidPayload(
                "payload has no provider message id".into(),
            ));
        }

        // Step 1: dedup
        if self
            .store
            .find_email_by_provider_id(&payload.id)
            .await?
            .is_some()
        {
            debug!(id = %payload.id, "provider message id already stored, skipping");
            return Ok(IngestOutcome::Duplicate {
                email_id: payload.id,
            });
        }

        // Step 2: thread resolution
        let lookup: &dyn ThreadLookup = self.store.as_ref();
        let mut thread = self.resolver.resolve(&payload, lookup).await;

        // Step 3: thread bookkeeping
        let received = payload.received_date_time.unwrap_or_else(Utc::now);
        let participants = participant_set(&payload);

        if thread.is_new {
            let record = ThreadRecord {
                id: thread.thread_id.clone(),
                conversation_id: payload
                    .conversation_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
                subject: payload.subject_text().to_string(),
                normalized_subject: normalize_subject(payload.subject_text()),
                participants: participants.clone(),
                last_activity_at: received,
                created_at: received,
            };
            let winner = self.store.create_thread(record).await?;
            if winner.id != thread.thread_id {
                debug!(
                    id = %payload.id,
                    thread_id = %winner.id,
                    "concurrent thread creation, redirected to winner"
                );
                thread.thread_id = winner.id;
            }
        } else {
            self.store
                .touch_thread(&thread.thread_id, received, &participants)
                .await?;
        }

        // Step 4: classification
        let classification = self
            .classifier
            .classify_with_confidence(payload.subject_text(), Some(payload.body_text()));

        // Step 5: persist
        let record = EmailRecord {
            id: payload.id.clone(),
            internet_message_id: clean_message_id(&payload.internet_message_id),
            thread_id: thread.thread_id.clone(),
            parent_id: thread.parent_id.clone(),
            subject: payload.subject.clone(),
            body_preview: payload.body_preview.clone(),
            from_address: crate::threading::participants::from_address(&payload),
            recipients: participants,
            received_at: payload.received_date_time,
            category: classification.category,
            classification_confidence: classification.confidence,
            classification_matches: classification.matches,
            threading_method: thread.method,
            threading_confidence: thread.confidence,
        };
        self.store.insert_email(record).await?;

        info!(
            id = %payload.id,
            thread_id = %thread.thread_id,
            method = thread.method.as_str(),
            category = classification.category.as_str(),
            "email processed"
        );

        Ok(IngestOutcome::Processed {
            email_id: payload.id,
            thread,
            classification,
            processed_at: Utc::now(),
        })
    }

    /// Process a batch of payloads (e.g. from a manual sync).
    ///
    /// Each payload is processed independently; individual failures are
    /// logged and skipped without failing the batch.
    pub async fn process_batch(&self, payloads: Vec<EmailPayload>) -> Vec<IngestOutcome> {
        let count = payloads.len();
        info!(count, "processing payload batch");

        let mut outcomes = Vec::with_capacity(count);
        for payload in payloads {
            let id = payload.id.clone();
            match self.process(payload).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(id = %id, error = %e, "failed to process payload in batch");
                }
            }
        }

        info!(
            processed = outcomes.len(),
            total = count,
            "batch processing complete"
        );
        outcomes
    }
}
