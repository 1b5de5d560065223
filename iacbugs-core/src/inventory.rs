//! Dataset inventory: repository, issue and bug counts per ecosystem.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::{Component, Ecosystem};
use crate::error::Result;
use crate::fs::FileSystem;
use crate::metrics::{BugRecord, QuantitativeMetrics, read_records};

const METRICS_FILE: &str = "quantitative_metrics.csv";
const BUGS_FILE: &str = "bugs.csv";

static ECOSYSTEM_FILES: &[(Ecosystem, &[&str])] = &[
    (
        Ecosystem::Puppet,
        &["puppet_bugs.csv", "puppet_jira_issues.csv", "puppet_urls.csv"],
    ),
    (
        Ecosystem::Ansible,
        &[
            "ansible_bugs.csv",
            "ansible_builtin_bugs.csv",
            "ansible_role_bugs.csv",
            "ansible_extra_repo.csv",
            "ansible_roles_urls.csv",
            "ansible_urls.csv",
        ],
    ),
    (Ecosystem::Chef, &["chef_bugs.csv", "chef_urls.csv"]),
];

/// Dataset totals for one ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemInventory {
    /// Ecosystem described by the row.
    pub ecosystem: Ecosystem,
    /// Repositories listed in the URL files.
    pub repositories: usize,
    /// Closed issues listed in the issue files.
    pub issues: usize,
    /// Creation date of the oldest analysed issue.
    pub oldest_issue: Option<NaiveDate>,
    /// Creation date of the most recent analysed issue.
    pub most_recent_issue: Option<NaiveDate>,
    /// Analysed bugs in configuration units.
    pub configuration_unit_bugs: usize,
    /// Analysed bugs in IaC programs.
    pub iac_program_bugs: usize,
}

impl EcosystemInventory {
    fn empty(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            repositories: 0,
            issues: 0,
            oldest_issue: None,
            most_recent_issue: None,
            configuration_unit_bugs: 0,
            iac_program_bugs: 0,
        }
    }
}

/// Scan a dataset directory and tally it per ecosystem.
pub fn inspect_dataset<F: FileSystem>(fs: &F, root: &Path) -> Result<Vec<EcosystemInventory>> {
    let mut rows: BTreeMap<Ecosystem, EcosystemInventory> = Ecosystem::ALL
        .into_iter()
        .map(|ecosystem| (ecosystem, EcosystemInventory::empty(ecosystem)))
        .collect();

    for path in fs.list_files(root)? {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if name == METRICS_FILE {
            let contents = fs.read_to_string(&path)?;
            apply_issue_dates(&mut rows, &read_records(contents.as_bytes())?);
        } else if name == BUGS_FILE {
            let contents = fs.read_to_string(&path)?;
            apply_bug_components(&mut rows, &read_records(contents.as_bytes())?);
        } else if let Some(ecosystem) = ecosystem_of_file(name) {
            let lines = count_data_lines(&fs.read_to_string(&path)?);
            let Some(row) = rows.get_mut(&ecosystem) else {
                continue;
            };
            if is_repository_list(name) {
                row.repositories += lines;
            } else {
                row.issues += lines;
            }
        }
    }

    Ok(Ecosystem::ALL
        .iter()
        .filter_map(|ecosystem| rows.remove(ecosystem))
        .collect())
}

fn ecosystem_of_file(name: &str) -> Option<Ecosystem> {
    ECOSYSTEM_FILES
        .iter()
        .find(|(_, files)| files.contains(&name))
        .map(|(ecosystem, _)| *ecosystem)
}

fn is_repository_list(name: &str) -> bool {
    name.contains("urls.csv") || name.contains("repo.csv")
}

fn count_data_lines(contents: &str) -> usize {
    contents.lines().count().saturating_sub(1)
}

fn apply_issue_dates(
    rows: &mut BTreeMap<Ecosystem, EcosystemInventory>,
    metrics: &[QuantitativeMetrics],
) {
    for metric in metrics {
        let Some(created) = metric
            .created_at
            .as_deref()
            .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
        else {
            debug!("no creation date for {}", metric.issue_url);
            continue;
        };
        let Some(row) = rows.get_mut(&metric.ecosystem) else {
            continue;
        };
        row.oldest_issue = Some(row.oldest_issue.map_or(created, |date| date.min(created)));
        row.most_recent_issue = Some(
            row.most_recent_issue
                .map_or(created, |date| date.max(created)),
        );
    }
}

fn apply_bug_components(rows: &mut BTreeMap<Ecosystem, EcosystemInventory>, bugs: &[BugRecord]) {
    for bug in bugs {
        let (Ok(ecosystem), Ok(component)) = (
            bug.ecosystem.parse::<Ecosystem>(),
            bug.component.parse::<Component>(),
        ) else {
            debug!("skipping bug {} with unknown labels", bug.issue_url);
            continue;
        };
        let Some(row) = rows.get_mut(&ecosystem) else {
            continue;
        };
        match component {
            Component::ConfigurationUnit => row.configuration_unit_bugs += 1,
            Component::IacProgram => row.iac_program_bugs += 1,
        }
    }
}
