//! Rule-based email classifier.
//!
//! A fixed table maps each category to a set of case-insensitive regex
//! patterns. Two orderings govern the two entry points:
//!
//! - `classify` walks an explicit **priority order** and returns the first
//!   category with any pattern hit, so an urgent notice about a GST filing
//!   is tagged `COMPLIANCE_NOTICE`, not `GST_FILING`.
//! - `classify_with_confidence` scores every category by match count in
//!   **table order** and keeps the highest count (earliest table entry on
//!   ties). The two entry points can disagree on ambiguous text; that is a
//!   compatibility guarantee, not a bug.
//!
//! Both are total — no input ever produces an error.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::category::EmailCategory;

/// Classification outcome with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub category: EmailCategory,
    pub confidence: f32,
    /// Number of patterns of the winning category that matched.
    pub matches: usize,
}

/// Priority order for `classify` — urgent notices pre-empt routine filings.
const PRIORITY_ORDER: [EmailCategory; 7] = [
    EmailCategory::ComplianceNotice,
    EmailCategory::RtiSubmission,
    EmailCategory::NilFiling,
    EmailCategory::VatFiling,
    EmailCategory::GstFiling,
    EmailCategory::ItrSubmission,
    EmailCategory::DocRequest,
];

/// One category's compiled pattern set.
struct CategoryRule {
    category: EmailCategory,
    patterns: Vec<Regex>,
}

/// Rule-based classifier with patterns compiled once at construction.
pub struct EmailClassifier {
    rules: Vec<CategoryRule>,
}

impl Default for EmailClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmailClassifier {
    /// Build the classifier with the standard category pattern table.
    pub fn new() -> Self {
        let table: [(EmailCategory, &[&str]); 7] = [
            (
                EmailCategory::NilFiling,
                &[
                    r"nil\s+filing",
                    r"nil\s+return",
                    r"no\s+income",
                    r"nil\s+profit",
                    r"zero\s+return",
                ],
            ),
            (
                EmailCategory::VatFiling,
                &[
                    r"vat\s+filing",
                    r"vat\s+return",
                    r"vat\s+submission",
                    r"value\s+added\s+tax",
                    r"vat-\d+",
                ],
            ),
            (
                EmailCategory::GstFiling,
                &[
                    r"gst\s+filing",
                    r"gst\s+return",
                    r"gst\s+submission",
                    r"goods\s+and\s+services\s+tax",
                    r"gstr-\d+",
                    r"gstin",
                ],
            ),
            (
                EmailCategory::ItrSubmission,
                &[
                    r"itr\s+submission",
                    r"income\s+tax\s+return",
                    r"itr\s+filed",
                    r"itr\s+status",
                    r"itr-\d+",
                    r"tax\s+return",
                    r"assessment\s+year",
                ],
            ),
            (
                EmailCategory::DocRequest,
                &[
                    r"please\s+provide",
                    r"please\s+submit",
                    r"document\s+required",
                    r"documentation\s+needed",
                    r"waiting\s+for",
                    r"awaiting",
                    r"kindly\s+send",
                    r"request\s+for\s+documents?",
                    r"pending\s+documents?",
                ],
            ),
            (
                EmailCategory::ComplianceNotice,
                &[
                    r"compliance\s+notice",
                    r"urgent\s+notice",
                    r"important\s+notice",
                    r"action\s+required",
                    r"immediate\s+attention",
                    r"penalty\s+notice",
                    r"show\s+cause",
                    r"scrutiny\s+notice",
                ],
            ),
            (
                EmailCategory::RtiSubmission,
                &[
                    r"rti\s+file",
                    r"rti\s+submission",
                    r"return\s+of\s+tax\s+information",
                    r"rti\s+generated",
                    r"rti\s+attached",
                ],
            ),
        ];

        let rules = table
            .into_iter()
            .map(|(category, patterns)| CategoryRule {
                category,
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                    .collect(),
            })
            .collect();

        Self { rules }
    }

    /// Classify by priority order: first category with any pattern hit wins,
    /// `GENERAL` when nothing matches.
    pub fn classify(&self, subject: &str, body: Option<&str>) -> EmailCategory {
        let text = Self::text_blob(subject, body);

        for category in PRIORITY_ORDER {
            if let Some(rule) = self.rules.iter().find(|r| r.category == category)
                && rule.patterns.iter().any(|p| p.is_match(&text))
            {
                return category;
            }
        }

        EmailCategory::General
    }

    /// Classify by match count across all categories.
    ///
    /// Confidence is `min(0.95, 0.6 + 0.1 × matches)`; no hits at all yields
    /// `GENERAL` at 0.5 with zero matches. Ties keep the earliest table
    /// entry — deliberately not the priority order `classify` uses.
    pub fn classify_with_confidence(
        &self,
        subject: &str,
        body: Option<&str>,
    ) -> ClassificationResult {
        let text = Self::text_blob(subject, body);

        let mut best: Option<(EmailCategory, usize)> = None;
        for rule in &self.rules {
            let count = rule.patterns.iter().filter(|p| p.is_match(&text)).count();
            if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((rule.category, count));
            }
        }

        match best {
            Some((category, matches)) => ClassificationResult {
                category,
                confidence: (0.6 + 0.1 * matches as f32).min(0.95),
                matches,
            },
            None => ClassificationResult {
                category: EmailCategory::General,
                confidence: 0.5,
                matches: 0,
            },
        }
    }

    fn text_blob(subject: &str, body: Option<&str>) -> String {
        format!("{} {}", subject, body.unwrap_or("")).to_lowercase()
    }
}
