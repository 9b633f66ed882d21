//! Provider-shaped email payload.
//!
//! The mail provider delivers messages as camelCase JSON. Webhook and sync
//! collaborators hand them to the pipeline verbatim; every field is optional
//! at the wire level and absence always deserializes to an empty value,
//! never an error. The engines only ever read this struct — they never
//! mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized inbound/outbound email event from the mail provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailPayload {
    /// Provider-assigned message id. Dedup key for the whole pipeline.
    pub id: String,
    /// RFC 5322 Message-ID, usually still wrapped in angle brackets.
    pub internet_message_id: String,
    /// Provider-assigned conversation grouping id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<EmailBody>,
    pub body_preview: Option<String>,
    pub from: Option<Recipient>,
    pub to_recipients: Vec<Recipient>,
    pub cc_recipients: Vec<Recipient>,
    pub received_date_time: Option<DateTime<Utc>>,
    pub internet_message_headers: Vec<MessageHeader>,
}

/// A single recipient entry (`{"emailAddress": {"name": ..., "address": ...}}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Message body with its content type (`text` or `html`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailBody {
    pub content_type: Option<String>,
    pub content: Option<String>,
}

/// One entry of the raw header bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

impl EmailPayload {
    /// Case-insensitive lookup in the raw header bag. First match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.internet_message_headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// The `In-Reply-To` header value, if present.
    pub fn in_reply_to(&self) -> Option<&str> {
        self.header("In-Reply-To").map(str::trim).filter(|v| !v.is_empty())
    }

    /// The `References` header split into individual message ids,
    /// oldest ancestor first.
    pub fn references(&self) -> Vec<&str> {
        self.header("References")
            .map(|v| v.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Body text for classification: full body content, falling back to the
    /// provider's preview, falling back to empty.
    pub fn body_text(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.content.as_deref())
            .or(self.body_preview.as_deref())
            .unwrap_or("")
    }

    /// Subject as a plain `&str`, empty when absent.
    pub fn subject_text(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_payload() {
        let payload: EmailPayload = serde_json::from_str(r#"{"id": "msg-1"}"#).unwrap();
        assert_eq!(payload.id, "msg-1");
        assert!(payload.conversation_id.is_none());
        assert!(payload.to_recipients.is_empty());
        assert_eq!(payload.body_text(), "");
        assert_eq!(payload.subject_text(), "");
    }

    #[test]
    fn deserializes_empty_object() {
        let payload: EmailPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.id.is_empty());
        assert!(payload.in_reply_to().is_none());
        assert!(payload.references().is_empty());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let payload: EmailPayload = serde_json::from_str(
            r#"{
                "id": "msg-2",
                "internetMessageHeaders": [
                    {"name": "in-reply-to", "value": "<parent@example.com>"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.in_reply_to(), Some("<parent@example.com>"));
        assert_eq!(payload.header("IN-REPLY-TO"), Some("<parent@example.com>"));
    }

    #[test]
    fn references_split_on_whitespace() {
        let payload: EmailPayload = serde_json::from_str(
            r#"{
                "id": "msg-3",
                "internetMessageHeaders": [
                    {"name": "References", "value": "<a@x.com>  <b@x.com>\n <c@x.com>"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            payload.references(),
            vec!["<a@x.com>", "<b@x.com>", "<c@x.com>"]
        );
    }

    #[test]
    fn body_falls_back_to_preview() {
        let payload: EmailPayload = serde_json::from_str(
            r#"{"id": "msg-4", "bodyPreview": "Please provide the documents"}"#,
        )
        .unwrap();
        assert_eq!(payload.body_text(), "Please provide the documents");

        let payload: EmailPayload = serde_json::from_str(
            r#"{
                "id": "msg-5",
                "body": {"contentType": "text", "content": "Full body"},
                "bodyPreview": "Full"
            }"#,
        )
        .unwrap();
        assert_eq!(payload.body_text(), "Full body");
    }

    #[test]
    fn blank_in_reply_to_is_none() {
        let payload: EmailPayload = serde_json::from_str(
            r#"{
                "id": "msg-6",
                "internetMessageHeaders": [{"name": "In-Reply-To", "value": "   "}]
            }"#,
        )
        .unwrap();
        assert!(payload.in_reply_to().is_none());
    }

    #[test]
    fn graph_shaped_recipients_parse() {
        let payload: EmailPayload = serde_json::from_str(
            r#"{
                "id": "msg-7",
                "from": {"emailAddress": {"name": "Asha", "address": "asha@firm.example"}},
                "toRecipients": [
                    {"emailAddress": {"address": "client@example.com"}},
                    {"emailAddress": {}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            payload
                .from
                .as_ref()
                .and_then(|r| r.email_address.as_ref())
                .and_then(|a| a.address.as_deref()),
            Some("asha@firm.example")
        );
        assert_eq!(payload.to_recipients.len(), 2);
    }
}
