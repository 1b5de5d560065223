#![deny(missing_docs)]
//! IaC bug study command-line interface.
//!
//! Classifies fix files, collects fix statistics from GitHub and Jira, and
//! reports fix-size distributions and bug breakdowns.

mod collect;
mod github;
mod jira;

use clap::{Args, Parser, Subcommand, ValueEnum};
use collect::CollectArgs;
use iacbugs_core::breakdown::{root_causes, symptoms, system_states, test_inputs};
use iacbugs_core::{
    Breakdown, BugRecord, ClassifiedFile, Component, DEFAULT_POPULATION, Ecosystem,
    EcosystemInventory, FixSizeReport, Grouping, QuantitativeMetrics, StdFileSystem,
    analyze_fix_sizes, format_date, inspect_dataset, join_fixes, read_records_from_path,
    render_breakdown_markdown, render_classification_markdown, render_fix_size_markdown,
    render_inventory_markdown, render_json, write_curve_points,
};
use log::info;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "iacbugs", version, about = "IaC bug study toolkit")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum BreakdownKind {
    Symptom,
    RootCause,
    SystemState,
    TestInput,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum ComponentArg {
    Conf,
    Iac,
}

impl From<ComponentArg> for Component {
    fn from(value: ComponentArg) -> Self {
        match value {
            ComponentArg::Conf => Component::ConfigurationUnit,
            ComponentArg::Iac => Component::IacProgram,
        }
    }
}

#[derive(Args, Clone)]
struct PopulationArgs {
    /// Number of bugs in the study population.
    #[arg(long, env = "IACBUGS_POPULATION", default_value_t = DEFAULT_POPULATION)]
    population: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify repository paths; reads paths from stdin when none are given.
    Classify {
        /// Ecosystem whose rules apply (Ansible, Puppet or Chef).
        #[arg(short, long, value_parser = parse_ecosystem)]
        ecosystem: Ecosystem,
        /// Repository-relative paths.
        paths: Vec<String>,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Fetch fix statistics for issues from GitHub and Jira.
    Collect {
        #[command(flatten)]
        args: CollectArgs,
    },
    /// Summarise fix sizes and build their cumulative distributions.
    Distribution {
        /// CSV with the analysed bugs.
        bugs: PathBuf,
        /// CSV with the collected fix statistics.
        metrics: PathBuf,
        /// Directory to write one CSV of curve points per figure into.
        #[arg(long)]
        directory: Option<PathBuf>,
        #[command(flatten)]
        population: PopulationArgs,
        /// Include curve points in the report.
        #[arg(long)]
        points: bool,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Frequency tables of symptoms, root causes, system states or test inputs.
    Breakdown {
        /// CSV with the analysed bugs.
        bugs: PathBuf,
        /// Attribute to count.
        #[arg(long, value_enum)]
        by: BreakdownKind,
        /// Group by ecosystem instead of component.
        #[arg(long)]
        ecosystem: bool,
        /// Component whose root causes are counted.
        #[arg(long, value_enum, default_value_t = ComponentArg::Conf)]
        component: ComponentArg,
        #[command(flatten)]
        population: PopulationArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Repository, issue and bug counts per ecosystem of a dataset directory.
    Descriptives {
        /// Dataset directory.
        directory: PathBuf,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Classify {
            ecosystem,
            paths,
            report,
        } => run_classify(ecosystem, paths, report).await?,
        Commands::Collect { args } => collect::run_collect(args).await?,
        Commands::Distribution {
            bugs,
            metrics,
            directory,
            population,
            points,
            report,
        } => {
            run_distribution(
                &bugs,
                &metrics,
                directory.as_deref(),
                population.population,
                points,
                report,
            )
            .await?
        }
        Commands::Breakdown {
            bugs,
            by,
            ecosystem,
            component,
            population,
            report,
        } => {
            let grouping = if ecosystem {
                Grouping::Ecosystem
            } else {
                Grouping::Component
            };
            run_breakdown(
                &bugs,
                by,
                grouping,
                component.into(),
                population.population,
                report,
            )
            .await?
        }
        Commands::Descriptives { directory, report } => {
            run_descriptives(&directory, report).await?
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

#[cfg_attr(test, allow(dead_code))]
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn parse_ecosystem(value: &str) -> Result<Ecosystem, String> {
    value.parse::<Ecosystem>().map_err(|err| err.to_string())
}

async fn run_classify(
    ecosystem: Ecosystem,
    paths: Vec<String>,
    report: OutputArgs,
) -> CliResult<()> {
    let paths = if paths.is_empty() {
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        split_paths(&input)
    } else {
        paths
    };
    let files: Vec<ClassifiedFile> = paths
        .into_iter()
        .map(|path| ClassifiedFile::classify(ecosystem, path))
        .collect();
    emit_classifications(&files, &report).await
}

fn split_paths(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

async fn run_distribution(
    bugs_path: &Path,
    metrics_path: &Path,
    directory: Option<&Path>,
    population: usize,
    points: bool,
    report: OutputArgs,
) -> CliResult<()> {
    let bugs: Vec<BugRecord> = read_records_from_path(bugs_path)?;
    let metrics: Vec<QuantitativeMetrics> = read_records_from_path(metrics_path)?;
    let fixes = join_fixes(&metrics, &bugs);
    info!(
        "joined {} fixes from {} analysed bugs",
        fixes.len(),
        bugs.len()
    );
    let analysis = analyze_fix_sizes(&fixes, population)?;

    if let Some(directory) = directory {
        write_curve_files(&analysis, directory).await?;
    }
    emit_fix_size_report(&analysis, points, &report).await
}

async fn write_curve_files(report: &FixSizeReport, directory: &Path) -> CliResult<()> {
    tokio::fs::create_dir_all(directory).await?;
    for curve in &report.curves {
        let mut buffer = Vec::new();
        write_curve_points(&mut buffer, curve)?;
        let path = directory.join(format!("{}.csv", curve.name));
        tokio::fs::write(&path, buffer).await?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

async fn run_breakdown(
    bugs_path: &Path,
    kind: BreakdownKind,
    grouping: Grouping,
    component: Component,
    population: usize,
    report: OutputArgs,
) -> CliResult<()> {
    let bugs: Vec<BugRecord> = read_records_from_path(bugs_path)?;
    let breakdown = match kind {
        BreakdownKind::Symptom => symptoms(&bugs, grouping),
        BreakdownKind::RootCause => root_causes(&bugs, component),
        BreakdownKind::SystemState => system_states(&bugs, grouping),
        BreakdownKind::TestInput => test_inputs(&bugs, population)?,
    };
    emit_breakdown(&breakdown, &report).await
}

async fn run_descriptives(directory: &Path, report: OutputArgs) -> CliResult<()> {
    let rows = inspect_dataset(&StdFileSystem::new(), directory)?;
    emit_inventory(&rows, &report).await
}

async fn emit_classifications(files: &[ClassifiedFile], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_classification_text(files),
        OutputFormat::Markdown => render_classification_markdown(files),
        OutputFormat::Json => render_json(files)?,
    };
    emit_output(output, contents).await
}

async fn emit_fix_size_report(
    report: &FixSizeReport,
    points: bool,
    output: &OutputArgs,
) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_fix_size_text(report, points),
        OutputFormat::Markdown => render_fix_size_markdown(report, points),
        OutputFormat::Json => render_json(report)?,
    };
    emit_output(output, contents).await
}

async fn emit_breakdown(breakdown: &Breakdown, output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_breakdown_text(breakdown),
        OutputFormat::Markdown => render_breakdown_markdown(breakdown),
        OutputFormat::Json => render_json(breakdown)?,
    };
    emit_output(output, contents).await
}

async fn emit_inventory(rows: &[EcosystemInventory], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_inventory_text(rows),
        OutputFormat::Markdown => render_inventory_markdown(rows),
        OutputFormat::Json => render_json(rows)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_classification_text(files: &[ClassifiedFile]) -> String {
    let mut output = String::new();
    for file in files {
        match file.rule {
            Some(rule) => {
                let _ = writeln!(output, "{}\t{} (rule {rule})", file.path, file.category);
            }
            None => {
                let _ = writeln!(output, "{}\t{} (unhandled)", file.path, file.category);
            }
        }
    }
    output
}

fn render_fix_size_text(report: &FixSizeReport, points: bool) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Fixes: {} (population {})",
        report.fixes, report.population
    );
    for table in &report.summaries {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{} by {}:",
            table.metric.title(),
            table.grouping.label()
        );
        if table.rows.is_empty() {
            let _ = writeln!(output, "  none");
            continue;
        }
        let _ = writeln!(
            output,
            "  {:<20} {:>6} {:>9} {:>8} {:>9} {:>6} {:>6}",
            "Group", "Count", "Mean", "Median", "Std", "Min", "Max"
        );
        for row in &table.rows {
            let summary = &row.summary;
            let std_dev = summary
                .std_dev
                .map_or_else(|| "-".to_string(), |value| format!("{value:.2}"));
            let _ = writeln!(
                output,
                "  {:<20} {:>6} {:>9.2} {:>8.1} {:>9} {:>6} {:>6}",
                row.group,
                summary.count,
                summary.mean,
                summary.median,
                std_dev,
                summary.min,
                summary.max
            );
        }
    }

    if points {
        for curve in &report.curves {
            let _ = writeln!(output);
            let _ = writeln!(output, "Curve {}:", curve.name);
            for series in &curve.series {
                let _ = writeln!(output, "  {} (n={}):", series.label, series.population);
                for point in &series.points {
                    let _ = writeln!(
                        output,
                        "    {:>6} {:>7.2}%",
                        point.magnitude, point.cumulative_percentage
                    );
                }
            }
        }
    }
    output
}

fn render_breakdown_text(breakdown: &Breakdown) -> String {
    let mut output = String::new();
    if let Some(component) = breakdown.component {
        let _ = writeln!(output, "Component: {component}");
    }
    if breakdown.rows.is_empty() {
        let _ = writeln!(output, "No bugs to report.");
        return output;
    }
    let _ = writeln!(
        output,
        "{:<20} {:<45} {:>9} {:>10}",
        breakdown.group_label,
        breakdown.dimension.label(),
        "Frequency",
        "Percentage"
    );
    for row in &breakdown.rows {
        let _ = writeln!(
            output,
            "{:<20} {:<45} {:>9} {:>9.2}%",
            row.group, row.value, row.frequency, row.percentage
        );
    }
    output
}

fn render_inventory_text(rows: &[EcosystemInventory]) -> String {
    let mut output = String::new();
    for row in rows {
        let _ = writeln!(output, "Ecosystem: {}", row.ecosystem);
        let _ = writeln!(output, "Repositories: {}", row.repositories);
        let _ = writeln!(output, "Issues: {}", row.issues);
        let _ = writeln!(
            output,
            "Issue dates: {} to {}",
            format_date(row.oldest_issue),
            format_date(row.most_recent_issue)
        );
        let _ = writeln!(
            output,
            "Bugs: {} configuration unit, {} IaC program",
            row.configuration_unit_bugs, row.iac_program_bugs
        );
        let _ = writeln!(output);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use iacbugs_core::Category;

    const METRICS: &str = "Issue URL,Fix URL,Ecosystem,Created At,Closed At,\
Config Unit Files Count,Config Unit Lines Added,Config Unit Lines Removed,\
IAC Program Unit Files Count,IAC Program Unit Lines Added,IAC Program Unit Lines Removed,\
Test Unit Files Count,Test Unit Lines Added,Test Unit Lines Removed,\
Template Unit Files Count,Template Unit Lines Added,Template Unit Lines Removed
https://github.com/a/b/issues/1,https://github.com/a/b/pull/2,Ansible,2020-01-01,2020-01-02,2,10,4,0,0,0,1,8,0,0,0,0
https://github.com/a/c/issues/3,https://github.com/a/c/pull/4,Chef,2019-01-01,2019-02-01,0,0,0,1,3,3,0,0,0,1,2,0
";

    const BUGS: &str = "Issue URL,Ecosystem,Component,Symptom,Root cause,System state,Test Input
https://github.com/a/b/issues/1,Ansible,Code,Crash,Missing system operations,Out of the box,file path
https://github.com/a/c/issues/3,Chef,Configuration,Misconfiguration,Template bugs,Managed state,shell
";

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        PathBuf::from(format!("iacbugs_cli_test_{nanos}"))
    }

    fn temp_dataset() -> PathBuf {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(&root).expect("create temp dir");
        std::fs::write(root.join("bugs.csv"), BUGS).expect("write bugs");
        std::fs::write(root.join("quantitative_metrics.csv"), METRICS).expect("write metrics");
        std::fs::write(root.join("chef_urls.csv"), "url\nhttps://github.com/a/c\n").expect("urls");
        root
    }

    fn file_output(path: PathBuf, format: OutputFormat) -> OutputArgs {
        OutputArgs {
            format,
            report_output: Some(path),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from([
            "iacbugs",
            "-v",
            "classify",
            "--ecosystem",
            "chef",
            "recipes/default.rb",
        ])
        .expect("parse classify");
        assert!(cli.verbose);
        match cli.command {
            Commands::Classify {
                ecosystem, paths, ..
            } => {
                assert_eq!(ecosystem, Ecosystem::Chef);
                assert_eq!(paths, vec!["recipes/default.rb".to_string()]);
            }
            _ => panic!("expected classify"),
        }

        let cli = Cli::try_parse_from([
            "iacbugs",
            "breakdown",
            "bugs.csv",
            "--by",
            "root-cause",
            "--component",
            "iac",
            "--format",
            "markdown",
        ])
        .expect("parse breakdown");
        match cli.command {
            Commands::Breakdown {
                by,
                component,
                report,
                ..
            } => {
                assert_eq!(by, BreakdownKind::RootCause);
                assert_eq!(Component::from(component), Component::IacProgram);
                assert_eq!(report.format, OutputFormat::Markdown);
            }
            _ => panic!("expected breakdown"),
        }

        assert!(
            Cli::try_parse_from(["iacbugs", "classify", "--ecosystem", "salt", "a.sls"]).is_err()
        );
    }

    #[test]
    fn split_paths_skips_blank_lines() {
        assert_eq!(
            split_paths("manifests/init.pp\n\n  spec/foo_spec.rb \n"),
            vec!["manifests/init.pp".to_string(), "spec/foo_spec.rb".to_string()]
        );
    }

    #[tokio::test]
    async fn classify_writes_json_report() {
        let root = std::env::temp_dir().join(unique_dir_name());
        let path = root.join("out/classify.json");
        run_classify(
            Ecosystem::Ansible,
            vec!["tests/test.yml".to_string(), "roles/x/tasks/main.yml".to_string()],
            file_output(path.clone(), OutputFormat::Json),
        )
        .await
        .expect("classify");

        let contents = std::fs::read_to_string(&path).expect("read report");
        let files: Vec<ClassifiedFile> = serde_json::from_str(&contents).expect("parse");
        assert_eq!(files[0].category, Category::TestUnit);
        assert_eq!(files[1].category, Category::IacProgramUnit);
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn distribution_writes_report_and_curves() {
        let root = temp_dataset();
        let report_path = root.join("out/report.md");
        let curves = root.join("curves");
        run_distribution(
            &root.join("bugs.csv"),
            &root.join("quantitative_metrics.csv"),
            Some(&curves),
            DEFAULT_POPULATION,
            true,
            file_output(report_path.clone(), OutputFormat::Markdown),
        )
        .await
        .expect("distribution");

        let contents = std::fs::read_to_string(&report_path).expect("read report");
        assert!(contents.contains("# Fix Size Analysis"));
        assert!(contents.contains("- Fixes: 2"));
        for name in ["lines", "files", "test_files", "test_files_component"] {
            assert!(
                curves.join(format!("{name}.csv")).exists(),
                "{name} missing"
            );
        }
        let lines = std::fs::read_to_string(curves.join("lines.csv")).expect("read lines");
        assert!(lines.contains("Configuration Unit,14,100.0000"));
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn breakdown_and_descriptives_emit_reports() {
        let root = temp_dataset();

        let symptoms_path = root.join("out/symptoms.txt");
        run_breakdown(
            &root.join("bugs.csv"),
            BreakdownKind::Symptom,
            Grouping::Ecosystem,
            Component::ConfigurationUnit,
            DEFAULT_POPULATION,
            file_output(symptoms_path.clone(), OutputFormat::Text),
        )
        .await
        .expect("breakdown");
        let contents = std::fs::read_to_string(&symptoms_path).expect("read breakdown");
        assert!(contents.contains("Crash"));
        assert!(contents.contains("100.00%"));

        let inputs_path = root.join("out/inputs.json");
        run_breakdown(
            &root.join("bugs.csv"),
            BreakdownKind::TestInput,
            Grouping::Component,
            Component::ConfigurationUnit,
            4,
            file_output(inputs_path.clone(), OutputFormat::Json),
        )
        .await
        .expect("test inputs");
        let contents = std::fs::read_to_string(&inputs_path).expect("read inputs");
        assert!(contents.contains("\"dimension\": \"test-input\""));

        let inventory_path = root.join("out/descriptives.txt");
        run_descriptives(
            &root,
            file_output(inventory_path.clone(), OutputFormat::Text),
        )
            .await
            .expect("descriptives");
        let contents = std::fs::read_to_string(&inventory_path).expect("read inventory");
        assert!(contents.contains("Ecosystem: Chef"));
        assert!(contents.contains("Repositories: 1"));
        assert!(contents.contains("Issue dates: 2019-01-01 to 2019-01-01"));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn zero_population_is_reported_as_error() {
        let root = temp_dataset();
        let result = run_breakdown(
            &root.join("bugs.csv"),
            BreakdownKind::TestInput,
            Grouping::Component,
            Component::ConfigurationUnit,
            0,
            OutputArgs {
                format: OutputFormat::Text,
                report_output: None,
            },
        )
        .await;
        assert!(result.is_err());
        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn text_renderers_cover_empty_and_unhandled_cases() {
        let files = vec![ClassifiedFile::classify(Ecosystem::Chef, "bin/run.sh")];
        let output = render_classification_text(&files);
        assert!(output.contains("bin/run.sh\tUnclassified (unhandled)"));

        let empty = analyze_fix_sizes(&[], DEFAULT_POPULATION).expect("report");
        let output = render_fix_size_text(&empty, true);
        assert!(output.contains("Fixes: 0 (population 360)"));
        assert!(output.contains("none"));
        assert!(output.contains("Curve lines:"));

        let breakdown = symptoms(&[], Grouping::Component);
        assert!(render_breakdown_text(&breakdown).contains("No bugs to report."));
    }
}
