//! Corpus-wide roll-up of per-location results.
//!
//! Each summarized location becomes one [`CorpusAccumulator`]; accumulators
//! combine with [`CorpusAccumulator::merge`], which is associative and
//! commutative, so the reduction can run in any order or in parallel.
//! Comment texts are keyed by catalog ordinal and flattened in catalog order
//! on [`CorpusAccumulator::finalize`].

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::model::{CategoryCounts, CorpusSummary, LocationSummary};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusAccumulator {
    counts_a: CategoryCounts,
    counts_b: CategoryCounts,
    comments: usize,
    locations: usize,
    texts: BTreeMap<usize, Vec<String>>,
}

impl CorpusAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribution of a single location at catalog position `ordinal`.
    pub fn from_location(ordinal: usize, summary: &LocationSummary, texts: Vec<String>) -> Self {
        let mut acc = Self::new();
        acc.add_location(ordinal, summary, texts);
        acc
    }

    pub fn add_location(&mut self, ordinal: usize, summary: &LocationSummary, texts: Vec<String>) {
        self.counts_a.merge(&summary.category_counts_a);
        self.counts_b.merge(&summary.category_counts_b);
        self.comments += summary.comment_count;
        self.locations += 1;
        self.texts.entry(ordinal).or_default().extend(texts);
    }

    pub fn merge(mut self, other: CorpusAccumulator) -> CorpusAccumulator {
        self.counts_a.merge(&other.counts_a);
        self.counts_b.merge(&other.counts_b);
        self.comments += other.comments;
        self.locations += other.locations;
        for (ordinal, texts) in other.texts {
            self.texts.entry(ordinal).or_default().extend(texts);
        }
        self
    }

    pub fn locations(&self) -> usize {
        self.locations
    }

    pub fn finalize(self) -> CorpusSummary {
        CorpusSummary {
            total_category_counts_a: self.counts_a,
            total_category_counts_b: self.counts_b,
            comment_count: self.comments,
            locations_summarized: self.locations,
            all_comment_texts: self.texts.into_values().flatten().collect(),
        }
    }
}

/// Parallel map-union reduction of per-location contributions.
pub fn reduce<I>(parts: I) -> CorpusAccumulator
where
    I: IntoParallelIterator<Item = CorpusAccumulator>,
{
    parts
        .into_par_iter()
        .reduce(CorpusAccumulator::new, CorpusAccumulator::merge)
}
