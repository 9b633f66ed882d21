//! Participant extraction — normalized addresses out of a payload.
//!
//! Missing or malformed substructures are treated as empty; nothing here
//! ever fails.

use std::collections::BTreeSet;

use crate::payload::{EmailPayload, Recipient};

/// Which recipient list to extract from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientField {
    To,
    Cc,
}

/// The sender address, lowercased and trimmed. Empty when absent.
pub fn from_address(payload: &EmailPayload) -> String {
    payload
        .from
        .as_ref()
        .and_then(|r| r.email_address.as_ref())
        .and_then(|a| a.address.as_deref())
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_default()
}

/// Lowercased, trimmed addresses from the named recipient list.
pub fn recipients(payload: &EmailPayload, field: RecipientField) -> BTreeSet<String> {
    let list = match field {
        RecipientField::To => &payload.to_recipients,
        RecipientField::Cc => &payload.cc_recipients,
    };
    addresses(list)
}

/// The full participant set of an email: sender ∪ to ∪ cc.
pub fn participant_set(payload: &EmailPayload) -> BTreeSet<String> {
    let mut set = addresses(&payload.to_recipients);
    set.extend(addresses(&payload.cc_recipients));
    let sender = from_address(payload);
    if !sender.is_empty() {
        set.insert(sender);
    }
    set
}

/// Jaccard overlap between two participant sets, in [0, 1].
///
/// Zero when either set is empty.
pub fn participant_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}

fn addresses(list: &[Recipient]) -> BTreeSet<String> {
    list.iter()
        .filter_map(|r| r.email_address.as_ref())
        .filter_map(|a| a.address.as_deref())
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect()
}
