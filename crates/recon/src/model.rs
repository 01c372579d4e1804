use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Shared sentiment vocabulary. Each source's labels are normalized onto it
/// at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Positive,
    Negative,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Positive, Category::Negative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    ClassifierA,
    ClassifierB,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifierA => "classifier_a",
            Self::ClassifierB => "classifier_b",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One catalog entry. `name` is the unique key used to locate result tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationDescriptor {
    pub name: String,
    pub address: String,
    pub declared_size: u64,
}

/// A single normalized row from either classifier's result table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    pub source: SourceId,
    /// 0-based data row in the source table (header excluded).
    pub row_index: usize,
    pub comment_text: String,
    pub numeric_score: f64,
    pub category: Category,
    /// Reviewer's own rating, when the source table carries one.
    pub rating: Option<f64>,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub comment_text: String,
    pub numeric_score_a: f64,
    pub category_a: Category,
    pub numeric_score_b: f64,
    pub category_b: Category,
    pub rating: Option<f64>,
    pub row_a: usize,
    pub row_b: usize,
}

/// A join key that occurs more than once on one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub source: SourceId,
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub duplicate_keys: Vec<DuplicateKey>,
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutput {
    pub records: Vec<JoinedRecord>,
    pub stats: JoinStats,
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Category → count. Only categories that actually occur are present unless
/// the caller unions against a known set with [`CategoryCounts::with_known`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryCounts(BTreeMap<Category, usize>);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: Category, n: usize) {
        *self.0.entry(category).or_insert(0) += n;
    }

    pub fn get(&self, category: Category) -> usize {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }

    /// Map-union with count addition. New keys are inserted.
    pub fn merge(&mut self, other: &CategoryCounts) {
        for (category, n) in other.iter() {
            self.add(category, n);
        }
    }

    /// Copy with an explicit zero for every known category that is absent.
    pub fn with_known(&self, known: &[Category]) -> CategoryCounts {
        let mut out = self.clone();
        for category in known {
            out.0.entry(*category).or_insert(0);
        }
        out
    }
}

impl FromIterator<(Category, usize)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (Category, usize)>>(iter: I) -> Self {
        let mut counts = CategoryCounts::new();
        for (category, n) in iter {
            counts.add(category, n);
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Agreement + lexicon
// ---------------------------------------------------------------------------

/// One cell of the A×B confusion table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionCell {
    pub category_a: Category,
    pub category_b: Category,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgreementStats {
    pub total: usize,
    pub agreed: usize,
    pub rate: f64,
    pub mean_abs_score_delta: f64,
    pub confusion: Vec<ConfusionCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    pub location: String,
    pub category_counts_a: CategoryCounts,
    pub category_counts_b: CategoryCounts,
    pub agreement_rate: f64,
    pub comment_count: usize,
    pub rows_a: usize,
    pub rows_b: usize,
    /// `comment_count / declared_size`; `None` when the catalog declares 0.
    pub coverage: Option<f64>,
    pub join: JoinStats,
    pub agreement: AgreementStats,
    pub top_terms: Vec<TermCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub total_category_counts_a: CategoryCounts,
    pub total_category_counts_b: CategoryCounts,
    pub comment_count: usize,
    pub locations_summarized: usize,
    /// Pooled comment texts in catalog order, for corpus-wide lexical analysis.
    #[serde(skip)]
    pub all_comment_texts: Vec<String>,
}
