//! Loads both classifiers' result tables for one location.
//!
//! Schema is checked once against the header row; rows are then read by
//! resolved column index.

use std::path::{Path, PathBuf};

use crate::config::{ColumnMapping, SourceConfig, SourcesConfig};
use crate::error::ReconError;
use crate::model::{ClassificationRecord, LocationDescriptor, SourceId};

/// Both result sets for one location, normalized to the shared vocabulary.
#[derive(Debug, Clone, Default)]
pub struct ResultPair {
    pub a: Vec<ClassificationRecord>,
    pub b: Vec<ClassificationRecord>,
}

#[derive(Debug)]
pub enum PairLoad {
    Available(ResultPair),
    /// At least one table is absent. Expected for incomplete locations.
    Unavailable { missing: Vec<(SourceId, PathBuf)> },
}

impl PairLoad {
    /// The first missing table as an error value, for status reporting.
    pub fn unavailable_reason(&self) -> Option<ReconError> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { missing } => missing.first().map(|(source, path)| {
                ReconError::MissingResultTable {
                    source: *source,
                    path: path.clone(),
                }
            }),
        }
    }
}

pub fn load_result_pair(
    location: &LocationDescriptor,
    sources: &SourcesConfig,
) -> Result<PairLoad, ReconError> {
    let path_a = sources.a.table_path(&location.name);
    let path_b = sources.b.table_path(&location.name);

    let missing: Vec<(SourceId, PathBuf)> = [
        (SourceId::ClassifierA, &path_a),
        (SourceId::ClassifierB, &path_b),
    ]
    .into_iter()
    .filter(|(_, path)| !path.is_file())
    .map(|(source, path)| (source, path.clone()))
    .collect();

    if !missing.is_empty() {
        return Ok(PairLoad::Unavailable { missing });
    }

    let a = load_table(SourceId::ClassifierA, &path_a, &sources.a)?;
    let b = load_table(SourceId::ClassifierB, &path_b, &sources.b)?;
    Ok(PairLoad::Available(ResultPair { a, b }))
}

fn load_table(
    source: SourceId,
    path: &Path,
    config: &SourceConfig,
) -> Result<Vec<ClassificationRecord>, ReconError> {
    let csv_data = std::fs::read(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse_result_table(source, path, &csv_data, config)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Header indices for the canonical columns of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedColumns {
    rating: Option<usize>,
    category: usize,
    confidence: usize,
    comment: usize,
}

fn resolve_columns(
    source: SourceId,
    path: &Path,
    headers: &[String],
    mapping: &ColumnMapping,
) -> Result<ResolvedColumns, ReconError> {
    let find = |candidates: &[String]| -> Option<usize> {
        candidates
            .iter()
            .find_map(|c| headers.iter().position(|h| h == c))
    };

    let mut missing = Vec::new();
    let mut require = |name: &str, candidates: &[String]| -> usize {
        find(candidates).unwrap_or_else(|| {
            missing.push(format!("{name} ({})", candidates.join("|")));
            0
        })
    };

    let category = require("category", &mapping.category);
    let confidence = require("confidence", &mapping.confidence);
    let comment = require("comment", &mapping.comment);
    let rating = if mapping.rating.is_empty() {
        None
    } else {
        Some(require("rating", &mapping.rating))
    };

    if !missing.is_empty() {
        return Err(ReconError::IncompatibleSchema {
            source,
            path: path.to_path_buf(),
            missing,
        });
    }

    Ok(ResolvedColumns {
        rating,
        category,
        confidence,
        comment,
    })
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Parse one classifier result table. `path` is only used in error values.
/// Bytes that are not UTF-8 fail as [`ReconError::Csv`].
pub fn parse_result_table(
    source: SourceId,
    path: &Path,
    csv_data: &[u8],
    config: &SourceConfig,
) -> Result<Vec<ClassificationRecord>, ReconError> {
    let csv_err = |e: csv::Error| ReconError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let cols = resolve_columns(source, path, &headers, &config.columns)?;

    let mut records = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let row = row_index + 1;

        let category_raw = record.get(cols.category).unwrap_or("");
        let category = config.labels.categorize(category_raw).ok_or_else(|| {
            ReconError::UnknownCategory {
                source,
                path: path.to_path_buf(),
                row,
                value: category_raw.to_string(),
            }
        })?;

        let confidence_raw = record.get(cols.confidence).unwrap_or("").trim();
        let numeric_score: f64 = confidence_raw.parse().map_err(|_| ReconError::InvalidValue {
            source,
            path: path.to_path_buf(),
            row,
            column: headers[cols.confidence].clone(),
            value: confidence_raw.to_string(),
        })?;

        let rating = cols
            .rating
            .and_then(|i| record.get(i))
            .and_then(|v| v.trim().parse::<f64>().ok());

        records.push(ClassificationRecord {
            source,
            row_index,
            comment_text: record.get(cols.comment).unwrap_or("").to_string(),
            numeric_score,
            category,
            rating,
        });
    }

    log::debug!("{source}: {} row(s) from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelVocabulary;
    use crate::model::Category;

    fn source_config(rating: &[&str]) -> SourceConfig {
        SourceConfig {
            label: "test".into(),
            dir: PathBuf::from("."),
            file_pattern: "result_{location}.csv".into(),
            columns: ColumnMapping {
                rating: rating.iter().map(|s| s.to_string()).collect(),
                ..ColumnMapping::default()
            },
            labels: LabelVocabulary::default(),
        }
    }

    fn parse(csv: &str, config: &SourceConfig) -> Result<Vec<ClassificationRecord>, ReconError> {
        parse_result_table(SourceId::ClassifierA, Path::new("result_x.csv"), csv.as_bytes(), config)
    }

    #[test]
    fn parse_snownlp_layout() {
        let csv = "\
score,sentiment_category,sentiment_score,comment
5,pos,0.97,风景很美
2,neg,0.12,人太多了
";
        let rows = parse(csv, &source_config(&["score", "评分"])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].comment_text, "风景很美");
        assert_eq!(rows[0].category, Category::Positive);
        assert_eq!(rows[0].rating, Some(5.0));
        assert_eq!(rows[0].row_index, 0);
        assert_eq!(rows[1].category, Category::Negative);
        assert!((rows[1].numeric_score - 0.12).abs() < 1e-12);
        assert_eq!(rows[1].row_index, 1);
    }

    #[test]
    fn column_variants_are_normalized() {
        let csv = "\
\u{feff}label,probability,comments
POSITIVE,0.8,nice place
NEGATIVE,0.3,bad
";
        let rows = parse(csv, &source_config(&[])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].comment_text, "nice place");
        assert_eq!(rows[0].rating, None);
        assert_eq!(rows[1].category, Category::Negative);
    }

    #[test]
    fn missing_comment_becomes_empty_string() {
        let csv = "\
sentiment_category,sentiment_score,comment
pos,0.9,
neg,0.1
";
        let rows = parse(csv, &source_config(&[])).unwrap();
        assert_eq!(rows.len(), 2, "rows with empty text are retained");
        assert_eq!(rows[0].comment_text, "");
        assert_eq!(rows[1].comment_text, "");
    }

    #[test]
    fn missing_columns_are_incompatible_schema() {
        let csv = "score,sentiment_category,text_body\n5,pos,hello\n";
        let err = parse(csv, &source_config(&["score"])).unwrap_err();
        match err {
            ReconError::IncompatibleSchema { missing, .. } => {
                assert_eq!(missing.len(), 2);
                assert!(missing[0].starts_with("confidence"));
                assert!(missing[1].starts_with("comment"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configured_rating_column_is_required() {
        let csv = "sentiment_category,sentiment_score,comment\npos,0.9,ok\n";
        let err = parse(csv, &source_config(&["score"])).unwrap_err();
        assert!(err.to_string().contains("rating (score)"));
    }

    #[test]
    fn unknown_label_fails_with_row() {
        let csv = "sentiment_category,sentiment_score,comment\npos,0.9,a\nneutral,0.5,b\n";
        match parse(csv, &source_config(&[])).unwrap_err() {
            ReconError::UnknownCategory { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "neutral");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparsable_confidence_is_invalid_value() {
        let csv = "sentiment_category,sentiment_score,comment\npos,high,a\n";
        let err = parse(csv, &source_config(&[])).unwrap_err();
        assert!(matches!(err, ReconError::InvalidValue { ref column, .. } if column == "sentiment_score"));
    }

    #[test]
    fn non_utf8_table_is_malformed() {
        // "好" in GBK
        let mut csv = b"sentiment_category,sentiment_score,comment\npos,0.9,".to_vec();
        csv.extend_from_slice(&[0xBA, 0xC3, b'\n']);
        let err = parse_result_table(SourceId::ClassifierA, Path::new("result_x.csv"), &csv, &source_config(&[]))
            .unwrap_err();
        assert!(matches!(err, ReconError::Csv { .. }), "{err}");
        assert_eq!(err.failure_kind(), crate::error::FailureKind::MalformedTable);
    }

    #[test]
    fn unparsable_rating_is_none() {
        let csv = "score,sentiment_category,sentiment_score,comment\n,pos,0.9,a\nfive,neg,0.2,b\n";
        let rows = parse(csv, &source_config(&["score"])).unwrap();
        assert_eq!(rows[0].rating, None);
        assert_eq!(rows[1].rating, None);
    }

    #[test]
    fn absent_table_is_unavailable_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = source_config(&[]);
        a.dir = dir.path().to_path_buf();
        let mut b = source_config(&[]);
        b.dir = dir.path().to_path_buf();
        b.file_pattern = "sentiment_{location}.csv".into();

        std::fs::write(
            dir.path().join("result_C.csv"),
            "sentiment_category,sentiment_score,comment\npos,0.9,hi\n",
        )
        .unwrap();

        let location = LocationDescriptor {
            name: "C".into(),
            address: "".into(),
            declared_size: 1,
        };
        let sources = SourcesConfig { a, b };
        let load = load_result_pair(&location, &sources).unwrap();
        match &load {
            PairLoad::Unavailable { missing } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].0, SourceId::ClassifierB);
            }
            PairLoad::Available(_) => panic!("expected unavailable"),
        }
        let reason = load.unavailable_reason().unwrap();
        assert!(matches!(reason, ReconError::MissingResultTable { source: SourceId::ClassifierB, .. }));
    }
}
