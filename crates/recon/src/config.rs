use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Category, SourceId};

/// Placeholder substituted with the location name in `file_pattern`.
pub const LOCATION_PLACEHOLDER: &str = "{location}";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Location manifest, one `name: .., address: .., size: ..` line per location.
    pub catalog: PathBuf,
    #[serde(default)]
    pub catalog_keys: CatalogKeys,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Catalog keys
// ---------------------------------------------------------------------------

/// Accepted keys for the three catalog fields, matched case-insensitively.
/// Manifests written with localized keys list them here.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogKeys {
    #[serde(default = "default_name_keys")]
    pub name: Vec<String>,
    #[serde(default = "default_address_keys")]
    pub address: Vec<String>,
    #[serde(default = "default_size_keys")]
    pub size: Vec<String>,
}

impl Default for CatalogKeys {
    fn default() -> Self {
        Self {
            name: default_name_keys(),
            address: default_address_keys(),
            size: default_size_keys(),
        }
    }
}

fn default_name_keys() -> Vec<String> {
    vec!["name".into()]
}

fn default_address_keys() -> Vec<String> {
    vec!["address".into()]
}

fn default_size_keys() -> Vec<String> {
    vec!["size".into()]
}

impl CatalogKeys {
    pub fn is_name(&self, key: &str) -> bool {
        matches_key(&self.name, key)
    }

    pub fn is_address(&self, key: &str) -> bool {
        matches_key(&self.address, key)
    }

    pub fn is_size(&self, key: &str) -> bool {
        matches_key(&self.size, key)
    }
}

fn matches_key(accepted: &[String], key: &str) -> bool {
    let key = key.trim().to_lowercase();
    accepted.iter().any(|k| k.trim().to_lowercase() == key)
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub a: SourceConfig,
    pub b: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: SourceId) -> &SourceConfig {
        match source {
            SourceId::ClassifierA => &self.a,
            SourceId::ClassifierB => &self.b,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Display name, e.g. the classifier's model name.
    pub label: String,
    pub dir: PathBuf,
    /// File name template, must contain `{location}`.
    pub file_pattern: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub labels: LabelVocabulary,
}

impl SourceConfig {
    /// Result table path for one location.
    pub fn table_path(&self, location: &str) -> PathBuf {
        self.dir
            .join(self.file_pattern.replace(LOCATION_PLACEHOLDER, location))
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Candidate header names per canonical column. The first candidate present
/// in a table's header row wins.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    /// Reviewer rating. Empty = the source has no rating column.
    #[serde(default)]
    pub rating: Vec<String>,
    #[serde(default = "default_category_columns")]
    pub category: Vec<String>,
    #[serde(default = "default_confidence_columns")]
    pub confidence: Vec<String>,
    #[serde(default = "default_comment_columns")]
    pub comment: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            rating: Vec::new(),
            category: default_category_columns(),
            confidence: default_confidence_columns(),
            comment: default_comment_columns(),
        }
    }
}

fn default_category_columns() -> Vec<String> {
    vec!["sentiment_category".into(), "sentiment".into(), "label".into()]
}

fn default_confidence_columns() -> Vec<String> {
    vec!["sentiment_score".into(), "probability".into(), "confidence".into()]
}

fn default_comment_columns() -> Vec<String> {
    vec!["comment".into(), "comments".into(), "text".into()]
}

// ---------------------------------------------------------------------------
// Label vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LabelVocabulary {
    #[serde(default = "default_positive_labels")]
    pub positive: Vec<String>,
    #[serde(default = "default_negative_labels")]
    pub negative: Vec<String>,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            positive: default_positive_labels(),
            negative: default_negative_labels(),
        }
    }
}

fn default_positive_labels() -> Vec<String> {
    vec!["pos".into(), "positive".into()]
}

fn default_negative_labels() -> Vec<String> {
    vec!["neg".into(), "negative".into()]
}

impl LabelVocabulary {
    /// Case-insensitive, whitespace-trimmed label lookup.
    pub fn categorize(&self, raw: &str) -> Option<Category> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let hit = |labels: &[String]| labels.iter().any(|l| l.trim().to_lowercase() == needle);
        if hit(&self.positive) {
            Some(Category::Positive)
        } else if hit(&self.negative) {
            Some(Category::Negative)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub key: KeyTransform,
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

/// Normalization applied to comment text before it is used as a join key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTransform {
    #[default]
    Exact,
    Trim,
}

impl KeyTransform {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Self::Exact => raw.to_string(),
            Self::Trim => raw.trim().to_string(),
        }
    }
}

/// How repeated comment text within one side is paired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every left occurrence pairs with every right occurrence.
    #[default]
    CrossProduct,
    /// The k-th left occurrence pairs only with the k-th right occurrence.
    ByOccurrence,
}

// ---------------------------------------------------------------------------
// Run + Lexicon + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// Worker threads. 0 = one per available core.
    #[serde(default)]
    pub workers: usize,
    /// Write `joined_<location>.csv` for each summarized location.
    #[serde(default)]
    pub export_joined: bool,
}

/// Text segmentation used for term counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Dictionary segmentation; handles Chinese as well as space-separated text.
    #[default]
    Jieba,
    /// Unicode word boundaries. CJK text falls apart into single ideographs.
    UnicodeWords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LexiconConfig {
    #[serde(default)]
    pub tokenizer: TokenizerKind,
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default = "default_true")]
    pub default_stop_words: bool,
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::default(),
            stop_words: Vec::new(),
            default_stop_words: true,
            min_token_chars: default_min_token_chars(),
            top_n: default_top_n(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_token_chars() -> usize {
    2
}

fn default_top_n() -> usize {
    50
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file, resolving its relative paths
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
        let mut config = Self::from_toml(&input)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base_dir);
        Ok(config)
    }

    /// Make every relative path absolute-to-`base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        resolve(&mut self.catalog);
        resolve(&mut self.sources.a.dir);
        resolve(&mut self.sources.b.dir);
        if let Some(dir) = self.output.dir.as_mut() {
            resolve(dir);
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let keys = &self.catalog_keys;
        for (field, accepted) in [("name", &keys.name), ("address", &keys.address), ("size", &keys.size)] {
            if accepted.iter().all(|k| k.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "catalog_keys.{field} needs at least one key"
                )));
            }
        }

        for source in [SourceId::ClassifierA, SourceId::ClassifierB] {
            validate_source(source, self.sources.get(source))?;
        }

        if self.lexicon.top_n == 0 {
            return Err(ReconError::ConfigValidation(
                "lexicon.top_n must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

fn validate_source(source: SourceId, config: &SourceConfig) -> Result<(), ReconError> {
    if !config.file_pattern.contains(LOCATION_PLACEHOLDER) {
        return Err(ReconError::ConfigValidation(format!(
            "sources.{}: file_pattern '{}' must contain {LOCATION_PLACEHOLDER}",
            short_name(source),
            config.file_pattern
        )));
    }

    let cols = &config.columns;
    for (name, candidates) in [
        ("category", &cols.category),
        ("confidence", &cols.confidence),
        ("comment", &cols.comment),
    ] {
        if candidates.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "sources.{}: columns.{name} needs at least one header name",
                short_name(source)
            )));
        }
    }

    let labels = &config.labels;
    if labels.positive.is_empty() || labels.negative.is_empty() {
        return Err(ReconError::ConfigValidation(format!(
            "sources.{}: labels.positive and labels.negative must both be non-empty",
            short_name(source)
        )));
    }
    for pos in &labels.positive {
        let pos_norm = pos.trim().to_lowercase();
        if labels
            .negative
            .iter()
            .any(|neg| neg.trim().to_lowercase() == pos_norm)
        {
            return Err(ReconError::ConfigValidation(format!(
                "sources.{}: label '{pos}' is both positive and negative",
                short_name(source)
            )));
        }
    }

    Ok(())
}

fn short_name(source: SourceId) -> &'static str {
    match source {
        SourceId::ClassifierA => "a",
        SourceId::ClassifierB => "b",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
