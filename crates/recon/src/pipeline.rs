//! Per-location processing and the parallel run over a whole catalog.
//!
//! Each location moves `Pending → Loaded → Joined → Summarized`, or ends
//! early as skipped (a result table is absent, or the run was cancelled
//! before it started) or failed (a table is unreadable or mismatched).
//! Per-location errors stop at this boundary; only catalog and config
//! errors abort the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::agreement;
use crate::catalog::load_catalog;
use crate::config::PipelineConfig;
use crate::corpus::{self, CorpusAccumulator};
use crate::distribution::joined_distribution;
use crate::error::{FailureKind, ReconError};
use crate::join::join_records;
use crate::lexicon::Lexicon;
use crate::loader::{load_result_pair, PairLoad, ResultPair};
use crate::model::{JoinOutput, JoinedRecord, LocationDescriptor, LocationSummary, SourceId};
use crate::report::{self, LocationReport, RunReport, StatusReason};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared stop flag. Once set, no new location starts; in-flight locations
/// run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Location state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocationStage {
    Pending,
    Loaded,
    Joined,
    Summarized,
}

impl LocationStage {
    pub fn next(self) -> Option<LocationStage> {
        match self {
            Self::Pending => Some(Self::Loaded),
            Self::Loaded => Some(Self::Joined),
            Self::Joined => Some(Self::Summarized),
            Self::Summarized => None,
        }
    }
}

struct StageTracker<'a> {
    location: &'a str,
    stage: LocationStage,
}

impl<'a> StageTracker<'a> {
    fn new(location: &'a str) -> Self {
        Self {
            location,
            stage: LocationStage::Pending,
        }
    }

    fn advance(&mut self, to: LocationStage) {
        debug_assert_eq!(self.stage.next(), Some(to), "illegal stage transition");
        log::debug!("{}: {:?} -> {:?}", self.location, self.stage, to);
        self.stage = to;
    }
}

/// Everything one location hands back to the run.
#[derive(Debug)]
pub struct LocationRun {
    pub report: LocationReport,
    /// Corpus contribution; `None` unless summarized.
    pub contribution: Option<CorpusAccumulator>,
    /// Joined records, kept only when the run exports them.
    pub joined: Option<Vec<JoinedRecord>>,
}

/// Load, join and summarize one location at catalog position `ordinal`.
pub fn process_location(
    ordinal: usize,
    location: &LocationDescriptor,
    config: &PipelineConfig,
    lexicon: &Lexicon,
    cancel: &CancelToken,
) -> LocationRun {
    let not_summarized = |report: LocationReport| LocationRun {
        report,
        contribution: None,
        joined: None,
    };

    if cancel.is_cancelled() {
        log::debug!("{}: not started, run cancelled", location.name);
        return not_summarized(LocationReport::skipped(
            location,
            StatusReason {
                kind: FailureKind::Cancelled,
                message: "run cancelled before this location started".into(),
            },
        ));
    }

    let mut stage = StageTracker::new(&location.name);

    let pair = match load_result_pair(location, &config.sources) {
        Ok(PairLoad::Available(pair)) => pair,
        Ok(unavailable) => {
            let reason = unavailable
                .unavailable_reason()
                .map(|e| StatusReason::from_error(&e))
                .unwrap_or(StatusReason {
                    kind: FailureKind::MissingResultTable,
                    message: "result table not found".into(),
                });
            log::warn!("skipping {}: {}", location.name, reason.message);
            return not_summarized(LocationReport::skipped(location, reason));
        }
        Err(e) => {
            log::warn!("{} failed: {e}", location.name);
            return not_summarized(LocationReport::failed(location, StatusReason::from_error(&e)));
        }
    };
    stage.advance(LocationStage::Loaded);

    let join = join_records(&pair.a, &pair.b, &config.join);
    stage.advance(LocationStage::Joined);

    let summary = summarize(location, &pair, &join, lexicon, config.lexicon.top_n);
    let texts: Vec<String> = join.records.iter().map(|r| r.comment_text.clone()).collect();
    let contribution = CorpusAccumulator::from_location(ordinal, &summary, texts);
    stage.advance(LocationStage::Summarized);

    log::info!(
        "{}: {} joined comment(s), agreement {:.1}%",
        location.name,
        summary.comment_count,
        summary.agreement_rate * 100.0
    );

    LocationRun {
        report: LocationReport::summarized(location, summary),
        contribution: Some(contribution),
        joined: config.run.export_joined.then_some(join.records),
    }
}

fn summarize(
    location: &LocationDescriptor,
    pair: &ResultPair,
    join: &JoinOutput,
    lexicon: &Lexicon,
    top_n: usize,
) -> LocationSummary {
    let records = &join.records;
    let agreement = agreement::analyze(records);
    let comment_count = records.len();

    LocationSummary {
        location: location.name.clone(),
        category_counts_a: joined_distribution(records, SourceId::ClassifierA),
        category_counts_b: joined_distribution(records, SourceId::ClassifierB),
        agreement_rate: agreement.rate,
        comment_count,
        rows_a: pair.a.len(),
        rows_b: pair.b.len(),
        coverage: (location.declared_size > 0)
            .then(|| comment_count as f64 / location.declared_size as f64),
        join: join.stats.clone(),
        agreement,
        top_terms: lexicon.top_terms(records.iter().map(|r| r.comment_text.as_str()), top_n),
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Load the catalog and process every location. Fails only when the
/// catalog itself is unusable or an export cannot be written.
pub fn run(config: &PipelineConfig, cancel: &CancelToken) -> Result<RunReport, ReconError> {
    let catalog = load_catalog(&config.catalog, &config.catalog_keys)?;
    run_catalog(config, &catalog, cancel)
}

pub fn run_catalog(
    config: &PipelineConfig,
    catalog: &[LocationDescriptor],
    cancel: &CancelToken,
) -> Result<RunReport, ReconError> {
    let lexicon = Lexicon::from_config(&config.lexicon);
    run_with_lexicon(config, catalog, &lexicon, cancel)
}

/// Like [`run_catalog`] with a caller-supplied tokenizer setup.
pub fn run_with_lexicon(
    config: &PipelineConfig,
    catalog: &[LocationDescriptor],
    lexicon: &Lexicon,
    cancel: &CancelToken,
) -> Result<RunReport, ReconError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.run.workers)
        .build()
        .map_err(|e| ReconError::Io(format!("cannot start worker pool: {e}")))?;
    let workers = pool.current_num_threads();

    log::info!(
        "processing {} location(s) with {} worker(s)",
        catalog.len(),
        workers
    );

    let (runs, corpus) = pool.install(|| {
        let mut runs: Vec<LocationRun> = catalog
            .par_iter()
            .enumerate()
            .map(|(ordinal, location)| process_location(ordinal, location, config, lexicon, cancel))
            .collect();
        let corpus = take_contributions(&mut runs);
        (runs, corpus)
    });

    let summarized = corpus.locations();
    let corpus = corpus.finalize();
    let corpus_terms = lexicon.top_terms(
        corpus.all_comment_texts.iter().map(String::as_str),
        config.lexicon.top_n,
    );

    let mut locations = Vec::with_capacity(runs.len());
    let mut joined = Vec::new();
    for run in runs {
        if let Some(records) = run.joined {
            joined.push((run.report.name.clone(), records));
        }
        locations.push(run.report);
    }

    let report = RunReport::new(config, workers, locations, corpus, corpus_terms);
    log::info!(
        "run complete: {} summarized, {} skipped, {} failed ({} joined comment(s) across {} location(s))",
        report.totals.summarized,
        report.totals.skipped,
        report.totals.failed,
        report.corpus.comment_count,
        summarized
    );

    if let Some(dir) = &config.output.dir {
        report::write_exports(dir, &report, &joined)?;
    }

    Ok(report)
}

/// Move every contribution out of `runs` and merge them. Leaves each
/// `contribution` as `None`.
fn take_contributions(runs: &mut [LocationRun]) -> CorpusAccumulator {
    corpus::reduce(runs.par_iter_mut().filter_map(|r| r.contribution.take()))
}
