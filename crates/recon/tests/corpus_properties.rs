// Property tests for the corpus roll-up.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;

use dualsent_recon::corpus::{self, CorpusAccumulator};
use dualsent_recon::model::{AgreementStats, JoinStats};
use dualsent_recon::{Category, CategoryCounts, CorpusSummary, LocationSummary};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// (ordinal, summary, texts) for one summarized location.
type Contribution = (usize, LocationSummary, Vec<String>);

fn summary(ordinal: usize, a: (usize, usize), b: (usize, usize), comments: usize) -> LocationSummary {
    let counts = |(pos, neg): (usize, usize)| -> CategoryCounts {
        [(Category::Positive, pos), (Category::Negative, neg)].into_iter().collect()
    };
    LocationSummary {
        location: format!("loc{ordinal}"),
        category_counts_a: counts(a),
        category_counts_b: counts(b),
        agreement_rate: 0.0,
        comment_count: comments,
        rows_a: comments,
        rows_b: comments,
        coverage: None,
        join: JoinStats::default(),
        agreement: AgreementStats::default(),
        top_terms: Vec::new(),
    }
}

fn arb_contributions() -> impl Strategy<Value = Vec<Contribution>> {
    prop::collection::vec(
        (0usize..20, 0usize..20, 0usize..20, prop::collection::vec("[a-z]{1,6}", 0..4)),
        0..12,
    )
    .prop_map(|parts| {
        parts
            .into_iter()
            .enumerate()
            .map(|(ordinal, (a_pos, a_neg, b_pos, texts))| {
                let comments = a_pos + a_neg;
                // B labels the same comments, split differently
                let b_pos = b_pos.min(comments);
                let s = summary(ordinal, (a_pos, a_neg), (b_pos, comments - b_pos), comments);
                (ordinal, s, texts)
            })
            .collect()
    })
}

fn fold_in_order(parts: &[Contribution]) -> CorpusSummary {
    let mut acc = CorpusAccumulator::new();
    for (ordinal, s, texts) in parts {
        acc.add_location(*ordinal, s, texts.clone());
    }
    acc.finalize()
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn corpus_independent_of_processing_order(
        (parts, shuffled) in arb_contributions().prop_flat_map(|parts| {
            let shuffled = Just(parts.clone()).prop_shuffle();
            (Just(parts), shuffled)
        })
    ) {
        let expected = fold_in_order(&parts);

        let sequential = fold_in_order(&shuffled);
        prop_assert_eq!(&sequential, &expected);

        let parallel = corpus::reduce(
            shuffled
                .iter()
                .map(|(ordinal, s, texts)| CorpusAccumulator::from_location(*ordinal, s, texts.clone()))
                .collect::<Vec<_>>(),
        )
        .finalize();
        prop_assert_eq!(&parallel, &expected);
    }

    #[test]
    fn corpus_counts_equal_sum_of_parts(parts in arb_contributions()) {
        let corpus = fold_in_order(&parts);

        let comments: usize = parts.iter().map(|(_, s, _)| s.comment_count).sum();
        prop_assert_eq!(corpus.comment_count, comments);
        prop_assert_eq!(corpus.locations_summarized, parts.len());
        prop_assert_eq!(corpus.total_category_counts_a.total(), comments);
        prop_assert_eq!(corpus.total_category_counts_b.total(), comments);

        let text_count: usize = parts.iter().map(|(_, _, t)| t.len()).sum();
        prop_assert_eq!(corpus.all_comment_texts.len(), text_count);
    }
}
