//! `dualsent-recon`: cross-validation engine for two sentiment classifiers.
//!
//! Pure engine crate: reads the location catalog and both classifiers' result
//! tables, joins them per location and rolls the results up corpus-wide.
//! No CLI dependencies.

pub mod agreement;
pub mod catalog;
pub mod config;
pub mod corpus;
pub mod distribution;
pub mod error;
pub mod join;
pub mod lexicon;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use error::{FailureKind, ReconError};
pub use model::{
    Category, CategoryCounts, ClassificationRecord, CorpusSummary, JoinedRecord,
    LocationDescriptor, LocationSummary, SourceId,
};
pub use pipeline::{run, CancelToken};
pub use report::{LocationReport, LocationStatus, RunReport};
