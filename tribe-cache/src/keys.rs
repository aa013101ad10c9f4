//! Cache key derivation
//!
//! Layout: `{namespace}:{subject}:{target_type}:...`. Every key of a subject
//! shares the `{namespace}:{subject}:` prefix so the whole subject can be
//! invalidated by prefix deletion. Identifiers are escaped so a `:` inside
//! an id cannot spill into a neighbouring segment.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

use tribe_core::{FactorWeights, TargetType};

/// Escape `%` and `:` in an identifier
pub fn escape(id: &str) -> Cow<'_, str> {
    if id.contains(['%', ':']) {
        Cow::Owned(id.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(id)
    }
}

/// Prefix shared by every entry of `subject`
pub fn subject_prefix(namespace: &str, subject: &str) -> String {
    format!("{}:{}:", namespace, escape(subject))
}

/// Key for a single (subject, target) pair
pub fn target_key(
    namespace: &str,
    subject: &str,
    target_type: TargetType,
    target_id: &str,
    fingerprint: &str,
) -> String {
    format!(
        "{}{}:{}:{}",
        subject_prefix(namespace, subject),
        target_type,
        escape(target_id),
        fingerprint
    )
}

/// Order-independent digest of a list of target ids
pub fn ids_digest(target_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = target_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Key for a multi-target request (`kind` is e.g. "batch" or "top")
pub fn pool_key(
    namespace: &str,
    subject: &str,
    target_type: TargetType,
    kind: &str,
    target_ids: &[String],
    fingerprint: &str,
) -> String {
    format!(
        "{}{}:{}:{}:{}",
        subject_prefix(namespace, subject),
        target_type,
        kind,
        ids_digest(target_ids),
        fingerprint
    )
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    weights: &'a FactorWeights,
    include_details: bool,
    extra: &'a [(&'a str, String)],
}

/// Short digest of the request parameters that change a result
pub fn fingerprint(
    weights: &FactorWeights,
    include_details: bool,
    extra: &[(&str, String)],
) -> String {
    let input = FingerprintInput {
        weights,
        include_details,
        extra,
    };
    let json = serde_json::to_string(&input).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}
