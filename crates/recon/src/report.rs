//! Final run report and flat tabular exports for downstream renderers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::{FailureKind, ReconError};
use crate::model::{
    Category, CategoryCounts, CorpusSummary, JoinedRecord, LocationDescriptor, LocationSummary,
    TermCount,
};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Summarized,
    Skipped,
    Failed,
}

impl LocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarized => "summarized",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReason {
    pub kind: FailureKind,
    pub message: String,
}

impl StatusReason {
    pub fn from_error(err: &ReconError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub name: String,
    pub address: String,
    pub declared_size: u64,
    pub status: LocationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LocationSummary>,
}

impl LocationReport {
    pub fn summarized(location: &LocationDescriptor, summary: LocationSummary) -> Self {
        Self::new(location, LocationStatus::Summarized, None, Some(summary))
    }

    pub fn skipped(location: &LocationDescriptor, reason: StatusReason) -> Self {
        Self::new(location, LocationStatus::Skipped, Some(reason), None)
    }

    pub fn failed(location: &LocationDescriptor, reason: StatusReason) -> Self {
        Self::new(location, LocationStatus::Failed, Some(reason), None)
    }

    fn new(
        location: &LocationDescriptor,
        status: LocationStatus,
        reason: Option<StatusReason>,
        summary: Option<LocationSummary>,
    ) -> Self {
        Self {
            name: location.name.clone(),
            address: location.address.clone(),
            declared_size: location.declared_size,
            status,
            reason,
            summary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub locations: usize,
    pub summarized: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunTotals {
    pub fn from_locations(locations: &[LocationReport]) -> Self {
        let count = |status: LocationStatus| locations.iter().filter(|l| l.status == status).count();
        Self {
            locations: locations.len(),
            summarized: count(LocationStatus::Summarized),
            skipped: count(LocationStatus::Skipped),
            failed: count(LocationStatus::Failed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub classifier_a: String,
    pub classifier_b: String,
    pub engine_version: String,
    pub run_at: String,
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub totals: RunTotals,
    pub locations: Vec<LocationReport>,
    pub corpus: CorpusSummary,
    pub corpus_terms: Vec<TermCount>,
}

impl RunReport {
    pub fn new(
        config: &PipelineConfig,
        workers: usize,
        locations: Vec<LocationReport>,
        corpus: CorpusSummary,
        corpus_terms: Vec<TermCount>,
    ) -> Self {
        Self {
            meta: RunMeta {
                config_name: config.name.clone(),
                classifier_a: config.sources.a.label.clone(),
                classifier_b: config.sources.b.label.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                workers,
            },
            totals: RunTotals::from_locations(&locations),
            locations,
            corpus,
            corpus_terms,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0
    }

    pub fn location(&self, name: &str) -> Option<&LocationReport> {
        self.locations.iter().find(|l| l.name == name)
    }
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

pub const LOCATIONS_FILE: &str = "locations.csv";
pub const CORPUS_DISTRIBUTION_FILE: &str = "corpus_distribution.csv";
pub const CORPUS_TERMS_FILE: &str = "corpus_terms.csv";

#[derive(Serialize)]
struct LocationRow<'a> {
    name: &'a str,
    address: &'a str,
    declared_size: u64,
    status: &'static str,
    reason: String,
    comment_count: Option<usize>,
    a_positive: Option<usize>,
    a_negative: Option<usize>,
    b_positive: Option<usize>,
    b_negative: Option<usize>,
    agreement_rate: Option<f64>,
}

#[derive(Serialize)]
struct DistributionRow<'a> {
    source: &'a str,
    category: Category,
    count: usize,
}

/// Write the flat tables into `dir`. `joined` holds per-location joined
/// records to export as `joined_<location>.csv`; names that sanitize to
/// the same file get a `_2`, `_3`, ... suffix. Returns written paths.
pub fn write_exports(
    dir: &Path,
    report: &RunReport,
    joined: &[(String, Vec<JoinedRecord>)],
) -> Result<Vec<PathBuf>, ReconError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let mut written = Vec::new();

    let path = dir.join(LOCATIONS_FILE);
    write_csv(&path, report.locations.iter().map(location_row))?;
    written.push(path);

    let path = dir.join(CORPUS_DISTRIBUTION_FILE);
    let corpus = &report.corpus;
    let rows = distribution_rows(&report.meta.classifier_a, &corpus.total_category_counts_a)
        .chain(distribution_rows(&report.meta.classifier_b, &corpus.total_category_counts_b));
    write_csv(&path, rows)?;
    written.push(path);

    let path = dir.join(CORPUS_TERMS_FILE);
    write_csv(&path, report.corpus_terms.iter())?;
    written.push(path);

    let names = joined_file_names(joined.iter().map(|(location, _)| location.as_str()));
    for ((_, records), name) in joined.iter().zip(names) {
        let path = dir.join(name);
        write_csv(&path, records.iter())?;
        written.push(path);
    }

    log::info!("wrote {} export file(s) to {}", written.len(), dir.display());
    Ok(written)
}

fn location_row(l: &LocationReport) -> LocationRow<'_> {
    let s = l.summary.as_ref();
    let count = |f: fn(&LocationSummary) -> usize| s.map(f);
    LocationRow {
        name: &l.name,
        address: &l.address,
        declared_size: l.declared_size,
        status: l.status.as_str(),
        reason: l.reason.as_ref().map(|r| r.kind.to_string()).unwrap_or_default(),
        comment_count: count(|s| s.comment_count),
        a_positive: count(|s| s.category_counts_a.get(Category::Positive)),
        a_negative: count(|s| s.category_counts_a.get(Category::Negative)),
        b_positive: count(|s| s.category_counts_b.get(Category::Positive)),
        b_negative: count(|s| s.category_counts_b.get(Category::Negative)),
        agreement_rate: s.map(|s| s.agreement_rate),
    }
}

fn distribution_rows<'a>(
    source: &'a str,
    counts: &CategoryCounts,
) -> impl Iterator<Item = DistributionRow<'a>> {
    counts
        .with_known(&Category::ALL)
        .iter()
        .map(move |(category, count)| DistributionRow { source, category, count })
        .collect::<Vec<_>>()
        .into_iter()
}

fn write_csv<T, I>(path: &Path, rows: I) -> Result<(), ReconError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let csv_err = |e: csv::Error| ReconError::Csv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", path.display())))
}

/// Location name made safe for use in a file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect()
}

/// One distinct `joined_<stem>.csv` per location, in input order.
/// Compared case-insensitively so no two files clash on any filesystem.
fn joined_file_names<'a>(locations: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    locations
        .into_iter()
        .map(|location| {
            let stem = file_stem(location);
            let mut name = format!("joined_{stem}.csv");
            let mut n = 2;
            while !used.insert(name.to_lowercase()) {
                name = format!("joined_{stem}_{n}.csv");
                n += 1;
            }
            if n > 2 {
                log::warn!("export for '{location}' renamed to {name}: file name already taken");
            }
            name
        })
        .collect()
}
