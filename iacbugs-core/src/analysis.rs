//! Fix-size analysis: how large the fixes are and how many tests they touch.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::distribution::{Summary, cumulative_fractions};
use crate::domain::{Component, DistributionPoint, Ecosystem, FixStats};
use crate::error::Result;
use crate::metrics::{BugRecord, QuantitativeMetrics};

/// Population size the study normalises its overall curves against.
pub const DEFAULT_POPULATION: usize = 360;

/// A fix joined with the component its bug was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRecord {
    /// Issue tracker URL.
    pub issue_url: String,
    /// Ecosystem of the repository.
    pub ecosystem: Ecosystem,
    /// Component the bug was found in.
    pub component: Component,
    /// Classified fix statistics.
    pub stats: FixStats,
}

impl FixRecord {
    /// Source files touched in the buggy component.
    ///
    /// IaC program fixes count program and template units together.
    pub fn total_files(&self) -> u64 {
        match self.component {
            Component::ConfigurationUnit => self.stats.config_units.files,
            Component::IacProgram => {
                self.stats.iac_program_units.files + self.stats.template_units.files
            }
        }
    }

    /// Lines added plus removed in the buggy component.
    pub fn total_loc(&self) -> u64 {
        match self.component {
            Component::ConfigurationUnit => self.stats.config_units.lines_changed(),
            Component::IacProgram => {
                self.stats.iac_program_units.lines_changed()
                    + self.stats.template_units.lines_changed()
            }
        }
    }

    /// Test files touched by the fix.
    pub fn test_files(&self) -> u64 {
        self.stats.test_units.files
    }

    /// Value of a metric for this fix.
    pub fn metric(&self, metric: FixMetric) -> u64 {
        match metric {
            FixMetric::TotalLoc => self.total_loc(),
            FixMetric::TotalFiles => self.total_files(),
            FixMetric::TestFiles => self.test_files(),
        }
    }
}

/// A per-fix measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixMetric {
    /// Lines of code changed in the buggy component.
    TotalLoc,
    /// Source files changed in the buggy component.
    TotalFiles,
    /// Test files changed.
    TestFiles,
}

impl FixMetric {
    /// Heading used in summary tables.
    pub fn title(&self) -> &'static str {
        match self {
            Self::TotalLoc => "Number of Lines of Code (LoC) in a Fix",
            Self::TotalFiles => "Number of Source Files in a Fix",
            Self::TestFiles => "Number of Test Files in a Fix",
        }
    }
}

/// How fixes are split into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// By the component the bug was found in.
    Component,
    /// By ecosystem.
    Ecosystem,
}

impl Grouping {
    /// Column name of the grouping.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Component => "Component",
            Self::Ecosystem => "Ecosystem",
        }
    }
}

/// One labelled cumulative distribution curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Legend label.
    pub label: String,
    /// Population the percentages are relative to.
    pub population: usize,
    /// Curve points.
    pub points: Vec<DistributionPoint>,
}

/// A figure's worth of curves over the same metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curve {
    /// Short name, used as the output file stem.
    pub name: String,
    /// Metric on the horizontal axis.
    pub metric: FixMetric,
    /// Curves in drawing order.
    pub series: Vec<Series>,
}

/// One row of a summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Group name, or `All`.
    pub group: String,
    /// Statistics of the group.
    pub summary: Summary,
}

/// Descriptive statistics of a metric per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTable {
    /// Summarised metric.
    pub metric: FixMetric,
    /// Grouping of the rows.
    pub grouping: Grouping,
    /// Rows, with the overall `All` row last.
    pub rows: Vec<SummaryRow>,
}

/// Curves and tables describing fix sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixSizeReport {
    /// Population used for the overall curves.
    pub population: usize,
    /// Number of joined fixes.
    pub fixes: usize,
    /// Cumulative distribution figures.
    pub curves: Vec<Curve>,
    /// Descriptive statistics tables.
    pub summaries: Vec<SummaryTable>,
}

/// Join fix metrics with analysed bugs on the issue URL.
///
/// Metrics without an analysed bug are dropped, as are bugs whose component
/// label is unknown.
pub fn join_fixes(metrics: &[QuantitativeMetrics], bugs: &[BugRecord]) -> Vec<FixRecord> {
    let mut components: HashMap<&str, Vec<Component>> = HashMap::new();
    for bug in bugs {
        match bug.component.parse::<Component>() {
            Ok(component) => components
                .entry(bug.issue_url.as_str())
                .or_default()
                .push(component),
            Err(err) => warn!("skipping {}: {err}", bug.issue_url),
        }
    }

    let mut fixes = Vec::new();
    for metric in metrics {
        let Some(matches) = components.get(metric.issue_url.as_str()) else {
            debug!("no analysed bug for {}", metric.issue_url);
            continue;
        };
        for component in matches {
            fixes.push(FixRecord {
                issue_url: metric.issue_url.clone(),
                ecosystem: metric.ecosystem,
                component: *component,
                stats: metric.stats(),
            });
        }
    }
    fixes
}

/// Build the fix-size curves and summary tables.
pub fn analyze_fix_sizes(fixes: &[FixRecord], population: usize) -> Result<FixSizeReport> {
    let curves = vec![
        component_curve("lines", FixMetric::TotalLoc, fixes, Some(population))?,
        component_curve("files", FixMetric::TotalFiles, fixes, Some(population))?,
        ecosystem_curve("test_files", FixMetric::TestFiles, fixes)?,
        component_curve("test_files_component", FixMetric::TestFiles, fixes, None)?,
    ];
    let summaries = vec![
        summary_table(FixMetric::TotalLoc, Grouping::Component, fixes),
        summary_table(FixMetric::TotalFiles, Grouping::Component, fixes),
        summary_table(FixMetric::TestFiles, Grouping::Ecosystem, fixes),
        summary_table(FixMetric::TestFiles, Grouping::Component, fixes),
    ];
    Ok(FixSizeReport {
        population,
        fixes: fixes.len(),
        curves,
        summaries,
    })
}

fn series(label: &str, fixes: &[&FixRecord], metric: FixMetric, total: usize) -> Result<Series> {
    let samples: Vec<u64> = fixes.iter().map(|fix| fix.metric(metric)).collect();
    Ok(Series {
        label: label.to_string(),
        population: total,
        points: cumulative_fractions(&samples, total)?,
    })
}

fn component_series_label(component: Component) -> &'static str {
    match component {
        Component::ConfigurationUnit => "Configuration Unit",
        Component::IacProgram => "IaC Program Unit",
    }
}

// Per-component curves are relative to their own subset; the optional `All`
// curve is relative to `overall`.
fn component_curve(
    name: &str,
    metric: FixMetric,
    fixes: &[FixRecord],
    overall: Option<usize>,
) -> Result<Curve> {
    let mut curve = Curve {
        name: name.to_string(),
        metric,
        series: Vec::new(),
    };
    for component in Component::ALL {
        let subset: Vec<&FixRecord> = fixes
            .iter()
            .filter(|f| f.component == component)
            .collect();
        if subset.is_empty() {
            continue;
        }
        let label = component_series_label(component);
        curve
            .series
            .push(series(label, &subset, metric, subset.len())?);
    }
    if let Some(total) = overall {
        let all: Vec<&FixRecord> = fixes.iter().collect();
        curve.series.push(series("All", &all, metric, total)?);
    }
    Ok(curve)
}

fn ecosystem_curve(name: &str, metric: FixMetric, fixes: &[FixRecord]) -> Result<Curve> {
    let mut curve = Curve {
        name: name.to_string(),
        metric,
        series: Vec::new(),
    };
    for ecosystem in [Ecosystem::Puppet, Ecosystem::Ansible, Ecosystem::Chef] {
        let subset: Vec<&FixRecord> = fixes
            .iter()
            .filter(|f| f.ecosystem == ecosystem)
            .collect();
        if subset.is_empty() {
            continue;
        }
        curve
            .series
            .push(series(ecosystem.as_str(), &subset, metric, subset.len())?);
    }
    if !fixes.is_empty() {
        let all: Vec<&FixRecord> = fixes.iter().collect();
        let mut overall = series("All", &all, metric, all.len())?;
        anchor_at_zero(&mut overall);
        curve.series.push(overall);
    }
    Ok(curve)
}

/// Make the overall curve start at magnitude zero.
fn anchor_at_zero(series: &mut Series) {
    let starts_above_zero = matches!(series.points.first(), Some(point) if point.magnitude > 0);
    if starts_above_zero {
        series.points.insert(
            0,
            DistributionPoint {
                magnitude: 0,
                cumulative_percentage: 0.0,
            },
        );
    }
}

fn summary_table(metric: FixMetric, grouping: Grouping, fixes: &[FixRecord]) -> SummaryTable {
    let groups: Vec<(String, Vec<u64>)> = match grouping {
        Grouping::Component => Component::ALL
            .iter()
            .map(|component| {
                let values = fixes
                    .iter()
                    .filter(|f| f.component == *component)
                    .map(|f| f.metric(metric))
                    .collect();
                (component.label().to_string(), values)
            })
            .collect(),
        Grouping::Ecosystem => Ecosystem::ALL
            .iter()
            .map(|ecosystem| {
                let values = fixes
                    .iter()
                    .filter(|f| f.ecosystem == *ecosystem)
                    .map(|f| f.metric(metric))
                    .collect();
                (ecosystem.as_str().to_string(), values)
            })
            .collect(),
    };

    let all: Vec<u64> = fixes.iter().map(|f| f.metric(metric)).collect();
    let rows = groups
        .into_iter()
        .chain(std::iter::once(("All".to_string(), all)))
        .filter_map(|(group, values)| {
            Summary::of(&values).map(|summary| SummaryRow { group, summary })
        })
        .collect();

    SummaryTable {
        metric,
        grouping,
        rows,
    }
}
