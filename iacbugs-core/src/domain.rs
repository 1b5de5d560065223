//! Domain entities for the IaC bug study.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IacBugsError, Result};

/// An Infrastructure-as-Code ecosystem covered by the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    /// Ansible roles, collections and the core modules.
    Ansible,
    /// Puppet modules.
    Puppet,
    /// Chef cookbooks.
    Chef,
}

impl Ecosystem {
    /// All supported ecosystems in reporting order.
    pub const ALL: [Ecosystem; 3] = [Ecosystem::Ansible, Ecosystem::Puppet, Ecosystem::Chef];

    /// Canonical name as persisted in the study CSVs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ansible => "Ansible",
            Self::Puppet => "Puppet",
            Self::Chef => "Chef",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = IacBugsError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "ansible" => Ok(Self::Ansible),
            "puppet" => Ok(Self::Puppet),
            "chef" => Ok(Self::Chef),
            _ => Err(IacBugsError::UnsupportedEcosystem(value.to_string())),
        }
    }
}

/// The unit category a changed file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Code implementing the tooling behaviour (modules, providers, resources).
    ConfigUnit,
    /// Declarative infrastructure code (playbooks, manifests, recipes).
    IacProgramUnit,
    /// Tests and specs.
    TestUnit,
    /// Templates rendered into configuration artifacts.
    TemplateUnit,
    /// Excluded from the analysis.
    Unclassified,
}

impl Category {
    /// Column label used by the persisted metrics schema.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConfigUnit => "Config Unit",
            Self::IacProgramUnit => "IAC Program Unit",
            Self::TestUnit => "Test Unit",
            Self::TemplateUnit => "Template Unit",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file touched by a fix, as reported by the source-control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Repository-relative path.
    pub filename: String,
    /// Lines added by the fix.
    pub additions: u64,
    /// Lines removed by the fix.
    pub deletions: u64,
}

/// A changed file bound to the ecosystem of the repository it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repository-relative path.
    pub path: String,
    /// Ecosystem of the owning repository.
    pub ecosystem: Ecosystem,
    /// Lines added by the fix.
    pub lines_added: u64,
    /// Lines removed by the fix.
    pub lines_removed: u64,
}

impl FileRecord {
    /// Bind a changed file to an ecosystem.
    pub fn from_changed(ecosystem: Ecosystem, file: &ChangedFile) -> Self {
        Self {
            path: file.filename.clone(),
            ecosystem,
            lines_added: file.additions,
            lines_removed: file.deletions,
        }
    }
}

/// File and line totals for one category of a fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Number of files routed to the bucket.
    pub files: u64,
    /// Sum of added lines.
    pub lines_added: u64,
    /// Sum of removed lines.
    pub lines_removed: u64,
}

impl AggregateBucket {
    /// Added plus removed lines.
    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_removed
    }
}

/// Per-category buckets for a single fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixStats {
    /// Configuration unit totals.
    pub config_units: AggregateBucket,
    /// IaC program unit totals.
    pub iac_program_units: AggregateBucket,
    /// Test unit totals.
    pub test_units: AggregateBucket,
    /// Template unit totals.
    pub template_units: AggregateBucket,
}

impl FixStats {
    /// Mutable bucket for a category; `None` for [`Category::Unclassified`].
    pub fn bucket_mut(&mut self, category: Category) -> Option<&mut AggregateBucket> {
        match category {
            Category::ConfigUnit => Some(&mut self.config_units),
            Category::IacProgramUnit => Some(&mut self.iac_program_units),
            Category::TestUnit => Some(&mut self.test_units),
            Category::TemplateUnit => Some(&mut self.template_units),
            Category::Unclassified => None,
        }
    }
}

/// One step of an empirical cumulative distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionPoint {
    /// Sample value.
    pub magnitude: u64,
    /// Percentage of the population with a value at most `magnitude`.
    pub cumulative_percentage: f64,
}

/// The part of an IaC ecosystem a bug was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Tooling code, labelled `Code` in the raw study data.
    #[serde(rename = "Configuration unit")]
    ConfigurationUnit,
    /// Infrastructure code, labelled `Configuration` in the raw study data.
    #[serde(rename = "IaC program")]
    IacProgram,
}

impl Component {
    /// Both components in reporting order.
    pub const ALL: [Component; 2] = [Component::ConfigurationUnit, Component::IacProgram];

    /// Display label after relabelling.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConfigurationUnit => "Configuration unit",
            Self::IacProgram => "IaC program",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Component {
    type Err = IacBugsError;

    fn from_str(value: &str) -> Result<Self> {
        match crate::taxonomy::normalize_component(value.trim()) {
            "Configuration unit" => Ok(Self::ConfigurationUnit),
            "IaC program" => Ok(Self::IacProgram),
            _ => Err(IacBugsError::UnknownComponent(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecosystem_parses_known_tags() {
        assert_eq!(
            "Ansible".parse::<Ecosystem>().expect("ansible"),
            Ecosystem::Ansible
        );
        assert_eq!(
            " puppet ".parse::<Ecosystem>().expect("puppet"),
            Ecosystem::Puppet
        );
        assert_eq!("CHEF".parse::<Ecosystem>().expect("chef"), Ecosystem::Chef);
    }

    #[test]
    fn ecosystem_rejects_unknown_tag() {
        let err = "SaltStack".parse::<Ecosystem>().unwrap_err();
        assert!(matches!(err, IacBugsError::UnsupportedEcosystem(tag) if tag == "SaltStack"));
    }

    #[test]
    fn category_labels_match_csv_columns() {
        let labels = [
            Category::ConfigUnit,
            Category::IacProgramUnit,
            Category::TestUnit,
            Category::TemplateUnit,
        ]
        .map(|category| category.label());
        assert_eq!(
            labels,
            ["Config Unit", "IAC Program Unit", "Test Unit", "Template Unit"]
        );
    }

    #[test]
    fn fix_stats_has_no_unclassified_bucket() {
        let mut stats = FixStats::default();
        assert!(stats.bucket_mut(Category::Unclassified).is_none());
        stats
            .bucket_mut(Category::TestUnit)
            .expect("test bucket")
            .files = 2;
        assert_eq!(stats.test_units.files, 2);
        assert_eq!(stats.config_units, AggregateBucket::default());
    }

    #[test]
    fn component_accepts_raw_and_display_labels() {
        assert_eq!(
            "Code".parse::<Component>().expect("code"),
            Component::ConfigurationUnit
        );
        assert_eq!(
            "Configuration".parse::<Component>().expect("configuration"),
            Component::IacProgram
        );
        assert_eq!(
            "IaC program".parse::<Component>().expect("iac"),
            Component::IacProgram
        );
        assert!("Docs".parse::<Component>().is_err());
    }
}
