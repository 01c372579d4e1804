//! `dualsent run | validate | catalog`: config-driven classifier comparison.

use std::path::{Path, PathBuf};

use serde::Serialize;

use dualsent_recon::catalog::load_catalog;
use dualsent_recon::{
    CancelToken, Category, CategoryCounts, LocationDescriptor, LocationReport, PipelineConfig,
    ReconError, RunReport, SourceId,
};

use crate::exit_codes::{recon_exit_code, EXIT_LOCATIONS_FAILED, EXIT_RUNTIME};
use crate::util::{pad_right, percent};
use crate::CliError;

fn recon_err(err: ReconError) -> CliError {
    let code = recon_exit_code(&err);
    let cli = CliError::new(code, err.to_string());
    match err {
        ReconError::MalformedManifestLine { .. } => {
            cli.with_hint("each catalog line needs `name: <x>, address: <y>, size: <integer>`; localized keys go in [catalog_keys]")
        }
        ReconError::ConfigParse(_) => cli.with_hint("run `dualsent validate <config>` to check the file"),
        _ => cli,
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig, CliError> {
    PipelineConfig::load(path).map_err(recon_err)
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if let Some(dir) = export_dir {
        config.output.dir = Some(dir);
    }
    if let Some(n) = workers {
        config.run.workers = n;
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("interrupted: no new locations will start");
        handler_token.cancel();
    }) {
        log::warn!("cannot install interrupt handler: {e}");
    }

    let report = dualsent_recon::run(&config, &cancel).map_err(recon_err)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&report);

    if report.has_failures() {
        return Err(CliError::new(
            EXIT_LOCATIONS_FAILED,
            format!("{} location(s) failed", report.totals.failed),
        )
        .with_hint("rerun with -v to see each location's progress"));
    }

    Ok(())
}

const NAME_WIDTH: usize = 24;

/// Human summary to stderr.
fn print_summary(report: &RunReport) {
    let meta = &report.meta;
    eprintln!(
        "{} vs {}: {} location(s), {} summarized, {} skipped, {} failed",
        meta.classifier_a,
        meta.classifier_b,
        report.totals.locations,
        report.totals.summarized,
        report.totals.skipped,
        report.totals.failed,
    );
    eprintln!(
        "  {} {} {:>8} {:>11} {:>11} {:>9}",
        pad_right("location", NAME_WIDTH),
        pad_right("status", 10),
        "comments",
        "a pos/neg",
        "b pos/neg",
        "agree",
    );
    for location in &report.locations {
        eprintln!("  {}", summary_line(location));
    }

    let corpus = &report.corpus;
    eprintln!(
        "corpus: {} joined comment(s) across {} location(s); {} {}, {} {}",
        corpus.comment_count,
        corpus.locations_summarized,
        meta.classifier_a,
        pos_neg(&corpus.total_category_counts_a),
        meta.classifier_b,
        pos_neg(&corpus.total_category_counts_b),
    );
    if !report.corpus_terms.is_empty() {
        let top: Vec<String> = report
            .corpus_terms
            .iter()
            .take(10)
            .map(|t| format!("{} ({})", t.term, t.count))
            .collect();
        eprintln!("top terms: {}", top.join(", "));
    }
}

fn summary_line(location: &LocationReport) -> String {
    let name = pad_right(&location.name, NAME_WIDTH);
    let status = pad_right(location.status.as_str(), 10);
    match (&location.summary, &location.reason) {
        (Some(s), _) => format!(
            "{name} {status} {:>8} {:>11} {:>11} {:>9}",
            s.comment_count,
            pos_neg(&s.category_counts_a),
            pos_neg(&s.category_counts_b),
            percent(s.agreement_rate),
        ),
        (None, Some(reason)) => format!("{name} {status} {}", reason.kind),
        (None, None) => format!("{name} {status}"),
    }
}

fn pos_neg(counts: &CategoryCounts) -> String {
    format!(
        "{}/{}",
        counts.get(Category::Positive),
        counts.get(Category::Negative)
    )
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let catalog = load_catalog(&config.catalog, &config.catalog_keys).map_err(recon_err)?;

    eprintln!(
        "valid: '{}' comparing {} and {} over {} location(s)",
        config.name,
        config.sources.a.label,
        config.sources.b.label,
        catalog.len(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CatalogEntry {
    name: String,
    address: String,
    declared_size: u64,
    table_a: PathBuf,
    table_a_exists: bool,
    table_b: PathBuf,
    table_b_exists: bool,
}

impl CatalogEntry {
    fn new(location: &LocationDescriptor, config: &PipelineConfig) -> Self {
        let table = |source| config.sources.get(source).table_path(&location.name);
        let table_a = table(SourceId::ClassifierA);
        let table_b = table(SourceId::ClassifierB);
        Self {
            name: location.name.clone(),
            address: location.address.clone(),
            declared_size: location.declared_size,
            table_a_exists: table_a.is_file(),
            table_a,
            table_b_exists: table_b.is_file(),
            table_b,
        }
    }

    fn ready(&self) -> bool {
        self.table_a_exists && self.table_b_exists
    }
}

pub fn cmd_catalog(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let catalog = load_catalog(&config.catalog, &config.catalog_keys).map_err(recon_err)?;
    let entries: Vec<CatalogEntry> = catalog
        .iter()
        .map(|location| CatalogEntry::new(location, &config))
        .collect();

    if json_output {
        let json_str = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    let mark = |exists: bool| if exists { "yes" } else { "-" };
    println!(
        "{} {:>8} {:>4} {:>4}  {}",
        pad_right("location", NAME_WIDTH),
        "size",
        "a",
        "b",
        "address",
    );
    for entry in &entries {
        println!(
            "{} {:>8} {:>4} {:>4}  {}",
            pad_right(&entry.name, NAME_WIDTH),
            entry.declared_size,
            mark(entry.table_a_exists),
            mark(entry.table_b_exists),
            entry.address,
        );
    }

    let ready = entries.iter().filter(|e| e.ready()).count();
    eprintln!(
        "{} location(s), {} with both result tables, {} would be skipped",
        entries.len(),
        ready,
        entries.len() - ready,
    );
    Ok(())
}
