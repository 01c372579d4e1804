use std::collections::{BTreeMap, HashMap};

use crate::config::{DuplicatePolicy, JoinConfig};
use crate::model::{ClassificationRecord, DuplicateKey, JoinOutput, JoinStats, JoinedRecord, SourceId};

/// Inner-join classifier A (left) and classifier B (right) on comment text.
///
/// Output follows left row order; for a left row with several right
/// partners, the partners follow right row order. One-sided rows are
/// dropped and only counted in the stats.
pub fn join_records(
    left: &[ClassificationRecord],
    right: &[ClassificationRecord],
    config: &JoinConfig,
) -> JoinOutput {
    let left_keys: Vec<String> = left.iter().map(|r| config.key.apply(&r.comment_text)).collect();
    let right_keys: Vec<String> = right.iter().map(|r| config.key.apply(&r.comment_text)).collect();

    let mut right_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, key) in right_keys.iter().enumerate() {
        right_index.entry(key.as_str()).or_default().push(i);
    }

    let mut records = Vec::new();
    let mut right_used = vec![false; right.len()];
    let mut left_only = 0;
    let mut left_seen: HashMap<&str, usize> = HashMap::new();

    for (li, left_rec) in left.iter().enumerate() {
        let key = left_keys[li].as_str();
        let rank = {
            let seen = left_seen.entry(key).or_insert(0);
            *seen += 1;
            *seen - 1
        };

        let partners: &[usize] = match (right_index.get(key), config.duplicates) {
            (None, _) => &[],
            (Some(all), DuplicatePolicy::CrossProduct) => all,
            (Some(all), DuplicatePolicy::ByOccurrence) => all.get(rank..=rank).unwrap_or(&[]),
        };

        if partners.is_empty() {
            left_only += 1;
            continue;
        }

        for &ri in partners {
            right_used[ri] = true;
            let right_rec = &right[ri];
            records.push(JoinedRecord {
                comment_text: left_rec.comment_text.clone(),
                numeric_score_a: left_rec.numeric_score,
                category_a: left_rec.category,
                numeric_score_b: right_rec.numeric_score,
                category_b: right_rec.category,
                rating: left_rec.rating.or(right_rec.rating),
                row_a: left_rec.row_index,
                row_b: right_rec.row_index,
            });
        }
    }

    let mut duplicate_keys = duplicates(SourceId::ClassifierA, &left_keys);
    duplicate_keys.extend(duplicates(SourceId::ClassifierB, &right_keys));

    let stats = JoinStats {
        left_rows: left.len(),
        right_rows: right.len(),
        matched: records.len(),
        left_only,
        right_only: right_used.iter().filter(|used| !**used).count(),
        duplicate_keys,
    };

    if !stats.duplicate_keys.is_empty() {
        log::debug!(
            "join: {} repeated comment key(s), policy {:?}",
            stats.duplicate_keys.len(),
            config.duplicates
        );
    }

    JoinOutput { records, stats }
}

/// Keys occurring more than once on one side, in key order.
fn duplicates(source: SourceId, keys: &[String]) -> Vec<DuplicateKey> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, count)| DuplicateKey {
            source,
            key: key.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyTransform;
    use crate::model::Category;

    fn rec(source: SourceId, row: usize, text: &str, category: Category) -> ClassificationRecord {
        ClassificationRecord {
            source,
            row_index: row,
            comment_text: text.into(),
            numeric_score: if category == Category::Positive { 0.9 } else { 0.1 },
            category,
            rating: None,
        }
    }

    fn a(row: usize, text: &str, category: Category) -> ClassificationRecord {
        rec(SourceId::ClassifierA, row, text, category)
    }

    fn b(row: usize, text: &str, category: Category) -> ClassificationRecord {
        rec(SourceId::ClassifierB, row, text, category)
    }

    #[test]
    fn single_overlapping_comment() {
        let left = vec![a(0, "nice place", Category::Positive)];
        let right = vec![b(0, "nice place", Category::Positive)];
        let out = join_records(&left, &right, &JoinConfig::default());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].category_a, Category::Positive);
        assert_eq!(out.records[0].category_b, Category::Positive);
        assert_eq!(out.stats.matched, 1);
        assert_eq!(out.stats.left_only, 0);
        assert_eq!(out.stats.right_only, 0);
    }

    #[test]
    fn disjoint_comments_join_to_nothing() {
        let left = vec![a(0, "bad", Category::Negative)];
        let right = vec![b(0, "good", Category::Positive)];
        let out = join_records(&left, &right, &JoinConfig::default());
        assert!(out.records.is_empty());
        assert_eq!(out.stats.left_only, 1);
        assert_eq!(out.stats.right_only, 1);
    }

    #[test]
    fn output_follows_left_order() {
        let left = vec![
            a(0, "c", Category::Positive),
            a(1, "a", Category::Negative),
            a(2, "b", Category::Positive),
        ];
        let right = vec![
            b(0, "a", Category::Negative),
            b(1, "b", Category::Negative),
            b(2, "c", Category::Positive),
        ];
        let out = join_records(&left, &right, &JoinConfig::default());
        let texts: Vec<&str> = out.records.iter().map(|r| r.comment_text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
        assert_eq!(out.records[0].row_b, 2);
    }

    #[test]
    fn cross_product_amplifies_duplicates() {
        let left = vec![a(0, "ok", Category::Positive), a(1, "ok", Category::Negative)];
        let right = vec![
            b(0, "ok", Category::Positive),
            b(1, "other", Category::Positive),
            b(2, "ok", Category::Positive),
        ];
        let out = join_records(&left, &right, &JoinConfig::default());
        assert_eq!(out.records.len(), 4);
        let pairs: Vec<(usize, usize)> = out.records.iter().map(|r| (r.row_a, r.row_b)).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 2), (1, 0), (1, 2)]);
        assert_eq!(out.stats.right_only, 1);
        assert_eq!(out.stats.duplicate_keys.len(), 2);
        assert_eq!(out.stats.duplicate_keys[0].source, SourceId::ClassifierA);
        assert_eq!(out.stats.duplicate_keys[0].count, 2);
    }

    #[test]
    fn by_occurrence_pairs_rank_for_rank() {
        let left = vec![
            a(0, "ok", Category::Positive),
            a(1, "ok", Category::Negative),
            a(2, "ok", Category::Negative),
        ];
        let right = vec![b(0, "ok", Category::Positive), b(1, "ok", Category::Negative)];
        let config = JoinConfig {
            key: KeyTransform::Exact,
            duplicates: DuplicatePolicy::ByOccurrence,
        };
        let out = join_records(&left, &right, &config);
        let pairs: Vec<(usize, usize)> = out.records.iter().map(|r| (r.row_a, r.row_b)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
        assert_eq!(out.stats.left_only, 1);
        assert_eq!(out.stats.right_only, 0);
    }

    #[test]
    fn trim_key_transform() {
        let left = vec![a(0, "  nice ", Category::Positive)];
        let right = vec![b(0, "nice", Category::Positive)];

        let exact = join_records(&left, &right, &JoinConfig::default());
        assert!(exact.records.is_empty());

        let config = JoinConfig {
            key: KeyTransform::Trim,
            duplicates: DuplicatePolicy::CrossProduct,
        };
        let trimmed = join_records(&left, &right, &config);
        assert_eq!(trimmed.records.len(), 1);
        assert_eq!(trimmed.records[0].comment_text, "  nice ", "left text is kept verbatim");
    }

    #[test]
    fn empty_comments_join_like_any_other_text() {
        let left = vec![a(0, "", Category::Positive)];
        let right = vec![b(0, "", Category::Negative)];
        let out = join_records(&left, &right, &JoinConfig::default());
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn every_joined_text_exists_on_both_sides() {
        let left = vec![
            a(0, "x", Category::Positive),
            a(1, "y", Category::Negative),
            a(2, "z", Category::Positive),
        ];
        let right = vec![b(0, "y", Category::Positive), b(1, "z", Category::Positive), b(2, "w", Category::Negative)];
        let out = join_records(&left, &right, &JoinConfig::default());
        for r in &out.records {
            assert!(left.iter().any(|l| l.comment_text == r.comment_text));
            assert!(right.iter().any(|x| x.comment_text == r.comment_text));
        }
        assert_eq!(out.records.len(), 2);
    }
}
