#![deny(missing_docs)]
//! Core library of the IaC bug study.
//!
//! This crate classifies the files touched by bug fixes in Ansible, Puppet
//! and Chef repositories, aggregates fix statistics, and derives the
//! distributions and breakdowns reported by the `iacbugs` CLI.

pub mod accumulator;
pub mod analysis;
pub mod breakdown;
pub mod classifier;
pub mod distribution;
pub mod domain;
pub mod error;
pub mod fs;
pub mod inventory;
pub mod metrics;
pub mod report;
/// Label tables for the qualitative bug data.
pub mod taxonomy;

pub use accumulator::{accumulate, accumulate_changes};
pub use analysis::{
    Curve, DEFAULT_POPULATION, FixMetric, FixRecord, FixSizeReport, Grouping, Series,
    SummaryTable, analyze_fix_sizes, join_fixes,
};
pub use breakdown::{Breakdown, Dimension, FrequencyRow};
pub use classifier::{Outcome, classify, classify_tag, evaluate, inspect};
pub use distribution::{Summary, cumulative_fractions};
pub use domain::{
    AggregateBucket, Category, ChangedFile, Component, DistributionPoint, Ecosystem, FileRecord,
    FixStats,
};
pub use error::{IacBugsError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use inventory::{EcosystemInventory, inspect_dataset};
pub use metrics::{
    BugRecord, IssueFix, QuantitativeMetrics, read_records, read_records_from_path, write_records,
};
pub use report::{
    ClassifiedFile, format_date, render_breakdown_markdown, render_classification_markdown,
    render_fix_size_markdown, render_inventory_markdown, render_json, write_curve_points,
};
