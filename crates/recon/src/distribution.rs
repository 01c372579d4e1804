use crate::model::{Category, CategoryCounts, JoinedRecord, SourceId};

/// Count categories. Only categories that occur get a key; no input means
/// an empty mapping.
pub fn count_categories<I>(categories: I) -> CategoryCounts
where
    I: IntoIterator<Item = Category>,
{
    categories.into_iter().map(|c| (c, 1)).collect()
}

/// Category distribution of one classifier over a location's joined records.
pub fn joined_distribution(records: &[JoinedRecord], source: SourceId) -> CategoryCounts {
    count_categories(records.iter().map(|r| match source {
        SourceId::ClassifierA => r.category_a,
        SourceId::ClassifierB => r.category_b,
    }))
}

/// Share of each category in `counts`, in category order. Empty on no data.
pub fn proportions(counts: &CategoryCounts) -> Vec<(Category, f64)> {
    let total = counts.total();
    if total == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .map(|(category, n)| (category, n as f64 / total as f64))
        .collect()
}
