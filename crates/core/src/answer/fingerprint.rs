use serde_json::json;
use sha2::{Digest, Sha256};

use crate::answer::request::AnswerContext;

/// Cache key for a normalized question and context. Requests that normalize to the same
/// pair share a key.
pub fn request_fingerprint(normalized_question: &str, context: Option<&AnswerContext>) -> String {
    let payload = json!({ "question": normalized_question, "context": context });
    let digest = Sha256::digest(payload.to_string().as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::request_fingerprint;
    use crate::answer::normalize::{normalize_context, normalize_question};
    use crate::answer::request::{AnswerContext, PartContext};

    #[test]
    fn fingerprint_is_hex_sha256() {
        let key = request_fingerprint("alternator", None);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn equivalent_requests_share_a_fingerprint() {
        let padded = AnswerContext {
            part: Some(PartContext { name: Some(" starter ".to_owned()), oem_part_number: None }),
            ..AnswerContext::default()
        };
        let clean = AnswerContext {
            part: Some(PartContext { name: Some("starter".to_owned()), oem_part_number: None }),
            ..AnswerContext::default()
        };

        let first = request_fingerprint(
            &normalize_question("  starter   in stock? "),
            normalize_context(Some(&padded)).as_ref(),
        );
        let second = request_fingerprint(
            &normalize_question("starter in stock?"),
            normalize_context(Some(&clean)).as_ref(),
        );
        assert_eq!(first, second);
        assert_ne!(first, request_fingerprint("starter in stock?", None));
    }
}
