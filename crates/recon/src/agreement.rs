use std::collections::BTreeMap;

use crate::model::{AgreementStats, Category, ConfusionCell, JoinedRecord};

/// Fraction of joined records where both classifiers agree. 0 on an empty
/// join.
pub fn agreement_rate(records: &[JoinedRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let agreed = records.iter().filter(|r| r.category_a == r.category_b).count();
    agreed as f64 / records.len() as f64
}

/// Agreement rate plus confusion table and mean score gap.
pub fn analyze(records: &[JoinedRecord]) -> AgreementStats {
    if records.is_empty() {
        return AgreementStats::default();
    }

    let mut confusion: BTreeMap<(Category, Category), usize> = BTreeMap::new();
    let mut agreed = 0;
    let mut delta_sum = 0.0;

    for r in records {
        *confusion.entry((r.category_a, r.category_b)).or_insert(0) += 1;
        if r.category_a == r.category_b {
            agreed += 1;
        }
        delta_sum += (r.numeric_score_a - r.numeric_score_b).abs();
    }

    let total = records.len();
    AgreementStats {
        total,
        agreed,
        rate: agreed as f64 / total as f64,
        mean_abs_score_delta: delta_sum / total as f64,
        confusion: confusion
            .into_iter()
            .map(|((category_a, category_b), count)| ConfusionCell {
                category_a,
                category_b,
                count,
            })
            .collect(),
    }
}
