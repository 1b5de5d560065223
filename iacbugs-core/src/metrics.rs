//! Tabular records exchanged with the study's CSV files.
//!
//! Column names are a persisted contract shared with the reporting scripts
//! and must not change.

use std::io::{Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{AggregateBucket, Ecosystem, FixStats};
use crate::error::Result;

/// Per-issue fix statistics, one row of `quantitative_metrics.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitativeMetrics {
    /// Issue tracker URL.
    #[serde(rename = "Issue URL")]
    pub issue_url: String,
    /// Pull request or commit that fixed the issue.
    #[serde(rename = "Fix URL")]
    pub fix_url: String,
    /// Ecosystem of the repository.
    #[serde(rename = "Ecosystem")]
    pub ecosystem: Ecosystem,
    /// Creation date (`YYYY-MM-DD`).
    #[serde(rename = "Created At")]
    pub created_at: Option<String>,
    /// Closing date (`YYYY-MM-DD`, or `Not Resolved`).
    #[serde(rename = "Closed At")]
    pub closed_at: Option<String>,
    /// Configuration unit files.
    #[serde(rename = "Config Unit Files Count")]
    pub config_unit_files: u64,
    /// Configuration unit lines added.
    #[serde(rename = "Config Unit Lines Added")]
    pub config_unit_lines_added: u64,
    /// Configuration unit lines removed.
    #[serde(rename = "Config Unit Lines Removed")]
    pub config_unit_lines_removed: u64,
    /// IaC program unit files.
    #[serde(rename = "IAC Program Unit Files Count")]
    pub iac_program_unit_files: u64,
    /// IaC program unit lines added.
    #[serde(rename = "IAC Program Unit Lines Added")]
    pub iac_program_unit_lines_added: u64,
    /// IaC program unit lines removed.
    #[serde(rename = "IAC Program Unit Lines Removed")]
    pub iac_program_unit_lines_removed: u64,
    /// Test unit files.
    #[serde(rename = "Test Unit Files Count")]
    pub test_unit_files: u64,
    /// Test unit lines added.
    #[serde(rename = "Test Unit Lines Added")]
    pub test_unit_lines_added: u64,
    /// Test unit lines removed.
    #[serde(rename = "Test Unit Lines Removed")]
    pub test_unit_lines_removed: u64,
    /// Template unit files.
    #[serde(rename = "Template Unit Files Count")]
    pub template_unit_files: u64,
    /// Template unit lines added.
    #[serde(rename = "Template Unit Lines Added")]
    pub template_unit_lines_added: u64,
    /// Template unit lines removed.
    #[serde(rename = "Template Unit Lines Removed")]
    pub template_unit_lines_removed: u64,
}

impl QuantitativeMetrics {
    /// Build a row from fix statistics.
    pub fn new(
        issue_url: String,
        fix_url: String,
        ecosystem: Ecosystem,
        created_at: Option<&str>,
        closed_at: Option<&str>,
        stats: &FixStats,
    ) -> Self {
        Self {
            issue_url,
            fix_url,
            ecosystem,
            created_at: created_at.map(date_part),
            closed_at: closed_at.map(date_part),
            config_unit_files: stats.config_units.files,
            config_unit_lines_added: stats.config_units.lines_added,
            config_unit_lines_removed: stats.config_units.lines_removed,
            iac_program_unit_files: stats.iac_program_units.files,
            iac_program_unit_lines_added: stats.iac_program_units.lines_added,
            iac_program_unit_lines_removed: stats.iac_program_units.lines_removed,
            test_unit_files: stats.test_units.files,
            test_unit_lines_added: stats.test_units.lines_added,
            test_unit_lines_removed: stats.test_units.lines_removed,
            template_unit_files: stats.template_units.files,
            template_unit_lines_added: stats.template_units.lines_added,
            template_unit_lines_removed: stats.template_units.lines_removed,
        }
    }

    /// Fix statistics held by the row.
    pub fn stats(&self) -> FixStats {
        FixStats {
            config_units: AggregateBucket {
                files: self.config_unit_files,
                lines_added: self.config_unit_lines_added,
                lines_removed: self.config_unit_lines_removed,
            },
            iac_program_units: AggregateBucket {
                files: self.iac_program_unit_files,
                lines_added: self.iac_program_unit_lines_added,
                lines_removed: self.iac_program_unit_lines_removed,
            },
            test_units: AggregateBucket {
                files: self.test_unit_files,
                lines_added: self.test_unit_lines_added,
                lines_removed: self.test_unit_lines_removed,
            },
            template_units: AggregateBucket {
                files: self.template_unit_files,
                lines_added: self.template_unit_lines_added,
                lines_removed: self.template_unit_lines_removed,
            },
        }
    }
}

/// An issue paired with the change that fixed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFix {
    /// Issue tracker URL.
    #[serde(rename = "Issue URL")]
    pub issue_url: String,
    /// Pull request or commit URL.
    #[serde(rename = "Fix URL")]
    pub fix_url: String,
    /// Raw ecosystem tag.
    #[serde(rename = "Ecosystem")]
    pub ecosystem: String,
}

/// A manually analysed bug from `bugs.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRecord {
    /// Issue tracker URL.
    #[serde(rename = "Issue URL")]
    pub issue_url: String,
    /// Raw ecosystem tag.
    #[serde(rename = "Ecosystem")]
    pub ecosystem: String,
    /// Raw component label (`Code` or `Configuration`).
    #[serde(rename = "Component")]
    pub component: String,
    /// Observable symptom of the bug.
    #[serde(rename = "Symptom", default)]
    pub symptom: String,
    /// Fine-grained root cause.
    #[serde(rename = "Root cause", default)]
    pub root_cause: String,
    /// System state the bug depends on.
    #[serde(rename = "System state", default)]
    pub system_state: String,
    /// `;`-separated description of the inputs needed to reproduce the bug.
    #[serde(rename = "Test Input", default)]
    pub test_input: Option<String>,
}

/// Strip the time portion of an ISO-8601 timestamp.
pub fn date_part(timestamp: &str) -> String {
    timestamp
        .split('T')
        .next()
        .unwrap_or(timestamp)
        .to_string()
}

/// Read every row of a headed CSV stream.
pub fn read_records<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read every row of a headed CSV file.
pub fn read_records_from_path<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}

/// Write rows with a header line.
pub fn write_records<T: Serialize, W: Write>(writer: W, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
