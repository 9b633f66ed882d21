//! Business categories assigned to emails for tax-compliance workflows.

use serde::{Deserialize, Serialize};

/// Closed set of email categories.
///
/// Wire values are the SCREAMING_SNAKE_CASE tags downstream consumers
/// (persistence, search indexer, audit log) already expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailCategory {
    NilFiling,
    VatFiling,
    GstFiling,
    ItrSubmission,
    DocRequest,
    ComplianceNotice,
    RtiSubmission,
    General,
}

impl EmailCategory {
    /// Human-readable label for UI and audit output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NilFiling => "NIL Filing Confirmation",
            Self::VatFiling => "VAT Filing Confirmation",
            Self::GstFiling => "GST Filing Confirmation",
            Self::ItrSubmission => "ITR Submission Status",
            Self::DocRequest => "Document Request",
            Self::ComplianceNotice => "Compliance Notice",
            Self::RtiSubmission => "RTI File Submission",
            Self::General => "General",
        }
    }

    /// Wire tag, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NilFiling => "NIL_FILING",
            Self::VatFiling => "VAT_FILING",
            Self::GstFiling => "GST_FILING",
            Self::ItrSubmission => "ITR_SUBMISSION",
            Self::DocRequest => "DOC_REQUEST",
            Self::ComplianceNotice => "COMPLIANCE_NOTICE",
            Self::RtiSubmission => "RTI_SUBMISSION",
            Self::General => "GENERAL",
        }
    }
}
