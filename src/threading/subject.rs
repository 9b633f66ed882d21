//! Subject normalization and message-id canonicalization.
//!
//! Threading compares subjects after stripping reply/forward markers and
//! bracketed tags, and compares message ids after removing RFC 5322 angle
//! brackets. Both functions are pure and idempotent.

/// Normalize an email subject for threading comparison.
///
/// Repeatedly strips leading `Re:`, `Fwd:`, `Fw:` markers and one
/// `[bracketed tag]` until no more can be removed, so arbitrarily stacked
/// prefixes like `"Re: Fwd: Re: X"` all reduce to `"x"`. Internal whitespace
/// runs collapse to a single space; the result is trimmed and lowercased.
///
/// ```
/// # use taxmail::threading::normalize_subject;
/// assert_eq!(normalize_subject("Re: Re: Re: GST Filing"), "gst filing");
/// assert_eq!(normalize_subject("[URGENT] Tax Filing"), "tax filing");
/// ```
pub fn normalize_subject(subject: &str) -> String {
    let mut normalized = subject.trim().to_lowercase();

    // Keep removing prefixes until none match
    loop {
        let before = normalized.clone();

        for prefix in &["re:", "fwd:", "fw:"] {
            if normalized.starts_with(prefix) {
                normalized = normalized[prefix.len()..].trim_start().to_string();
            }
        }

        // Bracketed tags like [URGENT], [REMINDER]
        if normalized.starts_with('[') {
            if let Some(end_bracket) = normalized.find(']') {
                normalized = normalized[end_bracket + 1..].trim_start().to_string();
            }
        }

        if before == normalized {
            break;
        }
    }

    // Collapse whitespace runs into single spaces
    let words: Vec<&str> = normalized.split_whitespace().collect();
    words.join(" ")
}

/// Strip one pair of surrounding angle brackets from a message id.
///
/// `"<a@b>"` becomes `"a@b"`; ids without brackets pass through unchanged;
/// empty input yields `""`.
pub fn clean_message_id(message_id: &str) -> String {
    let trimmed = message_id.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_re_prefix() {
        assert_eq!(normalize_subject("Re: GST Filing"), "gst filing");
    }

    #[test]
    fn removes_multiple_re_prefixes() {
        assert_eq!(normalize_subject("Re: Re: Re: GST Filing"), "gst filing");
    }

    #[test]
    fn removes_fwd_and_fw_prefixes() {
        assert_eq!(normalize_subject("Fwd: Tax Return"), "tax return");
        assert_eq!(normalize_subject("Fw: Tax Return"), "tax return");
    }

    #[test]
    fn removes_mixed_prefixes() {
        assert_eq!(normalize_subject("Re: Fwd: Re: Tax Filing"), "tax filing");
    }

    #[test]
    fn removes_bracketed_tags() {
        assert_eq!(normalize_subject("[URGENT] Tax Filing"), "tax filing");
        assert_eq!(
            normalize_subject("Re: [REMINDER] Fwd: ITR Documents"),
            "itr documents"
        );
    }

    #[test]
    fn lowercases_subject() {
        assert_eq!(
            normalize_subject("GST FILING CONFIRMATION"),
            "gst filing confirmation"
        );
    }

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(
            normalize_subject("GST   Filing    Confirmation"),
            "gst filing confirmation"
        );
        assert_eq!(normalize_subject("  Re:   GST  Filing  "), "gst filing");
    }

    #[test]
    fn handles_empty_subject() {
        assert_eq!(normalize_subject(""), "");
        assert_eq!(normalize_subject("   "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in [
            "Re: Fwd: [URGENT] GST Filing",
            "plain subject",
            "",
            "[tag only]",
            "RE: re: Re: nested",
        ] {
            let once = normalize_subject(s);
            assert_eq!(normalize_subject(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn cleans_angle_brackets() {
        assert_eq!(
            clean_message_id("<abc123@example.com>"),
            "abc123@example.com"
        );
    }

    #[test]
    fn leaves_bare_id_unchanged() {
        assert_eq!(clean_message_id("abc123@example.com"), "abc123@example.com");
    }

    #[test]
    fn handles_empty_id() {
        assert_eq!(clean_message_id(""), "");
        assert_eq!(clean_message_id("  "), "");
    }

    #[test]
    fn unbalanced_brackets_pass_through() {
        assert_eq!(clean_message_id("<abc@example.com"), "<abc@example.com");
        assert_eq!(clean_message_id("abc@example.com>"), "abc@example.com>");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_message_id("<abc@example.com>");
        assert_eq!(clean_message_id(&once), once);
    }
}
