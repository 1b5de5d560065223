//! Report formatting utilities for study outputs.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::analysis::{Curve, FixSizeReport, SummaryTable};
use crate::breakdown::Breakdown;
use crate::classifier::inspect;
use crate::domain::{Category, Ecosystem};
use crate::error::Result;
use crate::inventory::EcosystemInventory;

/// Classification of a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedFile {
    /// Repository-relative path.
    pub path: String,
    /// Ecosystem whose rules were applied.
    pub ecosystem: Ecosystem,
    /// Assigned category.
    pub category: Category,
    /// Index of the matching rule, or `None` when no rule matched.
    pub rule: Option<usize>,
}

impl ClassifiedFile {
    /// Classify `path` and record which rule decided it.
    pub fn classify(ecosystem: Ecosystem, path: impl Into<String>) -> Self {
        let path = path.into();
        let outcome = inspect(ecosystem, &path);
        Self {
            category: outcome.category(),
            rule: outcome.rule(),
            path,
            ecosystem,
        }
    }
}

/// Render classified paths as Markdown.
pub fn render_classification_markdown(files: &[ClassifiedFile]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# File Classification\n");
    if files.is_empty() {
        let _ = writeln!(output, "No paths classified.");
        return output;
    }
    let _ = writeln!(output, "| Path | Ecosystem | Category | Rule |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for file in files {
        let rule = file
            .rule
            .map_or_else(|| "unhandled".to_string(), |index| index.to_string());
        let _ = writeln!(
            output,
            "| `{}` | {} | {} | {rule} |",
            file.path, file.ecosystem, file.category
        );
    }
    let _ = writeln!(output);
    output
}

/// Render a fix-size report as Markdown.
///
/// Curve points are listed only when `with_points` is set.
pub fn render_fix_size_markdown(report: &FixSizeReport, with_points: bool) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Fix Size Analysis\n");
    let _ = writeln!(output, "- Fixes: {}", report.fixes);
    let _ = writeln!(output, "- Population: {}\n", report.population);
    for table in &report.summaries {
        append_summary_table(&mut output, table);
    }
    if with_points {
        for curve in &report.curves {
            append_curve(&mut output, curve);
        }
    }
    output
}

/// Render a breakdown as Markdown.
pub fn render_breakdown_markdown(breakdown: &Breakdown) -> String {
    let mut output = String::new();
    let _ = write!(output, "# {} Breakdown", breakdown.dimension.label());
    if let Some(component) = breakdown.component {
        let _ = write!(output, " ({component})");
    }
    let _ = writeln!(output, "\n");
    if breakdown.rows.is_empty() {
        let _ = writeln!(output, "No bugs to report.");
        return output;
    }
    let _ = writeln!(
        output,
        "| {} | {} | Frequency | Percentage |",
        breakdown.group_label,
        breakdown.dimension.label()
    );
    let _ = writeln!(output, "| --- | --- | ---: | ---: |");
    for row in &breakdown.rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.2}% |",
            row.group, row.value, row.frequency, row.percentage
        );
    }
    let _ = writeln!(output);
    output
}

/// Render the dataset inventory as Markdown.
pub fn render_inventory_markdown(rows: &[EcosystemInventory]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Dataset Descriptives\n");
    let _ = writeln!(
        output,
        "| Ecosystem | Repositories | Issues | Oldest | Most recent | Configuration unit bugs | IaC program bugs |"
    );
    let _ = writeln!(output, "| --- | ---: | ---: | --- | --- | ---: | ---: |");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} |",
            row.ecosystem,
            row.repositories,
            row.issues,
            format_date(row.oldest_issue),
            format_date(row.most_recent_issue),
            row.configuration_unit_bugs,
            row.iac_program_bugs
        );
    }
    let _ = writeln!(output);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(
    payload: &T,
) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Write the points of every series of a curve as CSV.
pub fn write_curve_points<W: std::io::Write>(writer: W, curve: &Curve) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Series", "Magnitude", "Cumulative Percentage"])?;
    for series in &curve.series {
        for point in &series.points {
            writer.write_record([
                series.label.clone(),
                point.magnitude.to_string(),
                format!("{:.4}", point.cumulative_percentage),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Format an optional date, or `-` when absent.
pub fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |date| date.format("%Y-%m-%d").to_string())
}

fn append_summary_table(output: &mut String, table: &SummaryTable) {
    let _ = writeln!(
        output,
        "### {} (by {})",
        table.metric.title(),
        table.grouping.label()
    );
    if table.rows.is_empty() {
        let _ = writeln!(output, "No fixes.\n");
        return;
    }
    let _ = writeln!(
        output,
        "| Group | Count | Mean | Median | Std | Min | Max |"
    );
    let _ = writeln!(output, "| --- | ---: | ---: | ---: | ---: | ---: | ---: |");
    for row in &table.rows {
        let summary = &row.summary;
        let std_dev = summary
            .std_dev
            .map_or_else(|| "-".to_string(), |value| format!("{value:.2}"));
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} | {:.1} | {std_dev} | {} | {} |",
            row.group, summary.count, summary.mean, summary.median, summary.min, summary.max
        );
    }
    let _ = writeln!(output);
}

fn append_curve(output: &mut String, curve: &Curve) {
    let _ = writeln!(output, "### Curve `{}`", curve.name);
    if curve.series.is_empty() {
        let _ = writeln!(output, "No series.\n");
        return;
    }
    for series in &curve.series {
        let points: Vec<String> = series
            .points
            .iter()
            .map(|point| format!("({}, {:.2})", point.magnitude, point.cumulative_percentage))
            .collect();
        let _ = writeln!(
            output,
            "- {} (n={}): {}",
            series.label,
            series.population,
            points.join(" ")
        );
    }
    let _ = writeln!(output);
}
