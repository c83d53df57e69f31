//! Deduplicating merge of incoming creator batches into a session buffer.
//!
//! The backend re-sends overlapping data freely: poll ticks repeat the first
//! page, handle expansions re-surface creators found earlier, and a manual
//! page load can race a tick. Merging is therefore content-idempotent, and
//! first-seen ordering is preserved across every merge.

use std::collections::HashMap;

use creatorscope_common::Platform;
use scraper_client::RawCreator;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::identity::identity_key;

/// A creator record plus its derived identity key. Within one session
/// buffer, keys are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalCreator {
    pub identity_key: String,
    pub record: Value,
}

/// Counters from one merge pass, mirrored into handle metrics and logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub new_creators: usize,
    pub duplicate_creators: usize,
    pub skipped_malformed: usize,
}

/// Fold `incoming` into `existing`.
///
/// `append = true` keeps the buffer and appends unseen records in arrival
/// order; records already present are field-merged in place, never moved.
///
/// `append = false` is the page-1 refresh: a non-empty batch rebuilds the
/// working set from `incoming` (self-deduplicated, prior field data carried
/// forward), while an empty batch returns `existing` untouched — same
/// allocation, so downstream comparisons stay cheap.
pub fn merge(
    existing: Vec<CanonicalCreator>,
    incoming: &[RawCreator],
    platform: Platform,
    append: bool,
) -> (Vec<CanonicalCreator>, MergeStats) {
    let mut stats = MergeStats::default();

    if !append {
        if incoming.is_empty() {
            return (existing, stats);
        }
        let prior: HashMap<String, Value> = existing
            .into_iter()
            .map(|c| (c.identity_key, c.record))
            .collect();
        let mut rebuilt = fold_into(Vec::new(), incoming, platform, &mut stats);
        for creator in &mut rebuilt {
            if let Some(old) = prior.get(&creator.identity_key) {
                fill_missing_fields(&mut creator.record, old);
            }
        }
        return (rebuilt, stats);
    }

    let merged = fold_into(existing, incoming, platform, &mut stats);
    (merged, stats)
}

fn fold_into(
    mut buffer: Vec<CanonicalCreator>,
    incoming: &[RawCreator],
    platform: Platform,
    stats: &mut MergeStats,
) -> Vec<CanonicalCreator> {
    let mut index: HashMap<String, usize> = buffer
        .iter()
        .enumerate()
        .map(|(i, c)| (c.identity_key.clone(), i))
        .collect();

    for raw in incoming {
        if !raw.is_object() {
            stats.skipped_malformed += 1;
            debug!("Skipping non-object creator record");
            continue;
        }
        let key = identity_key(raw, platform);
        match index.get(&key).copied() {
            Some(i) => {
                stats.duplicate_creators += 1;
                fill_missing_fields(&mut buffer[i].record, raw);
            }
            None => {
                stats.new_creators += 1;
                index.insert(key.clone(), buffer.len());
                buffer.push(CanonicalCreator {
                    identity_key: key,
                    record: raw.clone(),
                });
            }
        }
    }

    buffer
}

/// Copy `source` fields that `target` lacks or holds as null. Stored non-null
/// scalars always win; nested objects merge recursively by the same rule.
fn fill_missing_fields(target: &mut Value, source: &Value) {
    let (Some(target_map), Some(source_map)) = (target.as_object_mut(), source.as_object()) else {
        return;
    };
    for (key, value) in source_map {
        if value.is_null() {
            continue;
        }
        match target_map.get_mut(key) {
            None => {
                target_map.insert(key.clone(), value.clone());
            }
            Some(existing) if existing.is_null() => {
                *existing = value.clone();
            }
            Some(existing) if existing.is_object() && value.is_object() => {
                fill_missing_fields(existing, value);
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(buffer: &[CanonicalCreator]) -> Vec<&str> {
        buffer.iter().map(|c| c.identity_key.as_str()).collect()
    }

    #[test]
    fn page_one_refresh_rebuilds_without_duplicates() {
        let (existing, _) = merge(
            Vec::new(),
            &[json!({"username": "tt_alice"})],
            Platform::TikTok,
            false,
        );
        let (result, stats) = merge(
            existing,
            &[json!({"username": "tt_alice"}), json!({"username": "tt_bob"})],
            Platform::TikTok,
            false,
        );
        assert_eq!(keys(&result), vec!["tt_alice", "tt_bob"]);
        assert_eq!(stats.new_creators, 2);
    }

    #[test]
    fn append_keeps_first_seen_order() {
        let (existing, _) = merge(
            Vec::new(),
            &[json!({"username": "a"}), json!({"username": "b"})],
            Platform::TikTok,
            true,
        );
        let (result, stats) = merge(
            existing,
            &[json!({"username": "b"}), json!({"username": "c"})],
            Platform::TikTok,
            true,
        );
        assert_eq!(keys(&result), vec!["a", "b", "c"]);
        assert_eq!(stats.new_creators, 1);
        assert_eq!(stats.duplicate_creators, 1);
    }

    #[test]
    fn append_merge_is_idempotent() {
        let batch = [
            json!({"username": "a", "followers": 10}),
            json!({"username": "b"}),
        ];
        let (once, _) = merge(Vec::new(), &batch, Platform::TikTok, true);
        let (twice, _) = merge(once.clone(), &batch, Platform::TikTok, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_non_append_batch_is_allocation_stable() {
        let (existing, _) = merge(
            Vec::new(),
            &[json!({"username": "a"})],
            Platform::TikTok,
            true,
        );
        let before = existing.as_ptr();
        let (result, _) = merge(existing, &[], Platform::TikTok, false);
        assert_eq!(result.as_ptr(), before);
        assert_eq!(keys(&result), vec!["a"]);
    }

    #[test]
    fn duplicates_fill_missing_fields_without_reordering() {
        let (existing, _) = merge(
            Vec::new(),
            &[
                json!({"username": "a", "bio": null, "stats": {"views": 5}}),
                json!({"username": "b"}),
            ],
            Platform::TikTok,
            true,
        );
        let (result, _) = merge(
            existing,
            &[json!({"username": "a", "bio": "hello", "stats": {"views": 9, "likes": 3}})],
            Platform::TikTok,
            true,
        );

        assert_eq!(keys(&result), vec!["a", "b"]);
        assert_eq!(result[0].record["bio"], "hello");
        // Stored non-null value wins; only the missing nested field fills in.
        assert_eq!(result[0].record["stats"]["views"], 5);
        assert_eq!(result[0].record["stats"]["likes"], 3);
    }

    #[test]
    fn page_one_refresh_carries_forward_prior_enrichment() {
        let (existing, _) = merge(
            Vec::new(),
            &[json!({"username": "a", "email": "a@example.com"})],
            Platform::TikTok,
            true,
        );
        let (result, _) = merge(
            existing,
            &[json!({"username": "a"}), json!({"username": "b"})],
            Platform::TikTok,
            false,
        );
        assert_eq!(result[0].record["email"], "a@example.com");
    }

    #[test]
    fn malformed_records_are_skipped_silently() {
        let (result, stats) = merge(
            Vec::new(),
            &[
                json!(null),
                json!("bare string"),
                json!([1, 2]),
                json!({"username": "ok"}),
            ],
            Platform::TikTok,
            true,
        );
        assert_eq!(keys(&result), vec!["ok"]);
        assert_eq!(stats.skipped_malformed, 3);
    }
}
