//! Shared types for the ingestion pipeline.

use chrono::{DateTime, Utc};

use crate::classify::ClassificationResult;
use crate::threading::ThreadingResult;

/// Result of pushing one provider event through the pipeline.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The email was resolved, classified, and persisted.
    Processed {
        email_id: String,
        thread: ThreadingResult,
        classification: ClassificationResult,
        processed_at: DateTime<Utc>,
    },
    /// The provider message id was already stored — redelivery or an
    /// overlapping sync. Nothing was written.
    Duplicate { email_id: String },
}

impl IngestOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::Duplicate { .. } => "duplicate",
        }
    }

    /// Provider message id this outcome refers to.
    pub fn email_id(&self) -> &str {
        match self {
            Self::Processed { email_id, .. } => email_id,
            Self::Duplicate { email_id } => email_id,
        }
    }
}
