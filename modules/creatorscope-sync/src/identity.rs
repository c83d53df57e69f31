//! Canonical identity derivation for creator records.
//!
//! Batches arrive in whatever shape the platform scraper produced, and the
//! same creator resurfaces across pages and handle expansions. Everything
//! downstream (dedup, metrics) keys on the string this module derives.

use creatorscope_common::Platform;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Fields that can stand in for a username when the record carries an id
/// instead (numeric profile ids, video ids, platform-specific opaque ids).
const ID_FIELDS: &[&str] = &[
    "id", "userId", "user_id", "videoId", "video_id", "secUid", "channelId",
];

/// Derive the canonical identity key for a raw creator record.
///
/// Total: any input — `null`, `{}`, deeply malformed — yields a non-empty,
/// deterministic key. Preference order: username (lowercased, leading `@`
/// stripped), then a platform-qualified id composite, then a fingerprint of
/// the whole record.
pub fn identity_key(record: &Value, platform: Platform) -> String {
    if let Some(username) = username_of(record) {
        return username;
    }
    if let Some(id) = fallback_id(record) {
        return format!("{}:{}", platform.as_str(), id);
    }
    fingerprint(record, platform)
}

fn username_of(record: &Value) -> Option<String> {
    let candidates = [record.pointer("/creator/username"), record.get("username")];
    for value in candidates.into_iter().flatten() {
        if let Some(raw) = value.as_str() {
            let normalized = raw.trim().trim_start_matches('@').to_lowercase();
            if !normalized.is_empty() {
                return Some(normalized);
            }
        }
    }
    None
}

fn fallback_id(record: &Value) -> Option<String> {
    for field in ID_FIELDS {
        let candidates = [
            record.pointer(&format!("/creator/{field}")),
            record.get(*field),
        ];
        for value in candidates.into_iter().flatten() {
            if let Some(n) = value.as_i64() {
                return Some(n.to_string());
            }
            if let Some(n) = value.as_u64() {
                return Some(n.to_string());
            }
            if let Some(s) = value.as_str() {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// Last resort: hash the serialized record. serde_json keeps object keys
/// sorted, so structurally identical records serialize — and hash — the same.
fn fingerprint(record: &Value, platform: Platform) -> String {
    let mut hasher = Sha256::new();
    hasher.update(platform.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(record.to_string().as_bytes());
    format!("anon:{:x}", hasher.finalize())
}
