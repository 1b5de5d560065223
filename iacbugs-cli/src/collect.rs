//! Collection of per-issue fix statistics from GitHub and Jira.

use crate::CliResult;
use crate::github::{
    DEFAULT_GITHUB_API_URL, GitHubApi, IssueDates, Sleeper, parse_fix_url, parse_issue_url,
};
use crate::jira::{DEFAULT_JIRA_API_URL, JiraApi};
use clap::Args;
use iacbugs_core::{
    ChangedFile, Ecosystem, FixStats, IssueFix, QuantitativeMetrics, accumulate_changes,
    read_records_from_path, write_records,
};
use log::{info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// CLI arguments for the collect command.
#[derive(Args, Clone, Debug)]
pub struct CollectArgs {
    /// CSV with `Issue URL`, `Fix URL` and `Ecosystem` columns.
    pub input: PathBuf,
    /// Where to write the fix statistics.
    #[arg(short, long, default_value = "quantitative_metrics.csv")]
    pub output: PathBuf,
    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
    /// Base URL of the GitHub API.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    pub github_api_url: String,
    /// Base URL of the Jira site tracking Puppet issues.
    #[arg(long, env = "JIRA_API_URL", default_value = DEFAULT_JIRA_API_URL)]
    pub jira_api_url: String,
    /// Maximum number of issues fetched concurrently.
    #[arg(short = 'j', long, default_value_t = 4)]
    pub concurrency: usize,
}

/// Source of issue dates and fix contents.
pub(crate) trait FixSource {
    /// Dates of an issue, or `None` when the URL is not a known tracker.
    fn issue_dates<'a>(
        &'a self,
        issue_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<Option<IssueDates>>> + Send + 'a>>;

    /// Files changed by a pull request or commit.
    fn changed_files<'a>(
        &'a self,
        fix_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<Vec<ChangedFile>>> + Send + 'a>>;
}

/// GitHub and Jira backed fix source.
pub(crate) struct ApiFixSource<S> {
    github: GitHubApi,
    jira: JiraApi,
    sleeper: S,
}

impl<S: Sleeper + Send + Sync> ApiFixSource<S> {
    pub(crate) fn new(github: GitHubApi, jira: JiraApi, sleeper: S) -> Self {
        Self {
            github,
            jira,
            sleeper,
        }
    }

    async fn lookup_issue(&self, issue_url: &str) -> CliResult<Option<IssueDates>> {
        if let Some(issue) = parse_issue_url(issue_url) {
            return Ok(Some(self.github.issue_dates(&issue, &self.sleeper).await?));
        }
        if self.jira.owns(issue_url) {
            return Ok(Some(self.jira.issue_dates(issue_url).await?));
        }
        Ok(None)
    }

    async fn lookup_fix(&self, fix_url: &str) -> CliResult<Vec<ChangedFile>> {
        let fix = parse_fix_url(fix_url).ok_or_else(|| format!("unsupported fix URL: {fix_url}"))?;
        self.github.changed_files(&fix).await
    }
}

impl<S: Sleeper + Send + Sync> FixSource for ApiFixSource<S> {
    fn issue_dates<'a>(
        &'a self,
        issue_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<Option<IssueDates>>> + Send + 'a>> {
        Box::pin(self.lookup_issue(issue_url))
    }

    fn changed_files<'a>(
        &'a self,
        fix_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = CliResult<Vec<ChangedFile>>> + Send + 'a>> {
        Box::pin(self.lookup_fix(fix_url))
    }
}

/// Fetch fix statistics for every issue and write them as CSV.
#[cfg(not(test))]
pub async fn run_collect(args: CollectArgs) -> CliResult<()> {
    let client = reqwest::Client::builder()
        .user_agent("iacbugs-cli")
        .build()?;
    let source = ApiFixSource::new(
        GitHubApi::new(
            client.clone(),
            &args.github_api_url,
            args.github_token.clone(),
        ),
        JiraApi::new(client, &args.jira_api_url),
        crate::github::TokioSleeper,
    );
    run_collect_with(args, Arc::new(source)).await
}

async fn run_collect_with<F>(args: CollectArgs, source: Arc<F>) -> CliResult<()>
where
    F: FixSource + Send + Sync + 'static,
{
    let rows: Vec<IssueFix> = read_records_from_path(&args.input)?;
    info!("collecting fix statistics for {} issues", rows.len());
    let metrics = collect_metrics(source, rows, args.concurrency).await?;

    let mut buffer = Vec::new();
    write_records(&mut buffer, &metrics)?;
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&args.output, buffer).await?;
    info!("wrote {} rows to {}", metrics.len(), args.output.display());
    Ok(())
}

/// Collect rows concurrently, keeping the input order.
async fn collect_metrics<F>(
    source: Arc<F>,
    rows: Vec<IssueFix>,
    concurrency: usize,
) -> CliResult<Vec<QuantitativeMetrics>>
where
    F: FixSource + Send + Sync + 'static,
{
    let concurrency = if concurrency == 0 { 1 } else { concurrency };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let total = rows.len();

    for (index, row) in rows.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let source = source.clone();
        tasks.spawn(async move {
            let _permit = permit;
            (index, collect_row(source.as_ref(), row).await)
        });
    }

    let mut slots: Vec<Option<QuantitativeMetrics>> = vec![None; total];
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok((index, metrics)) => slots[index] = metrics,
            Err(err) => warn!("collect task failed: {err}"),
        }
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Build one output row; `None` when the row cannot be attributed.
async fn collect_row<F: FixSource + ?Sized>(
    source: &F,
    row: IssueFix,
) -> Option<QuantitativeMetrics> {
    let ecosystem = match row.ecosystem.parse::<Ecosystem>() {
        Ok(ecosystem) => ecosystem,
        Err(err) => {
            warn!("skipping {}: {err}", row.issue_url);
            return None;
        }
    };

    let dates = match source.issue_dates(&row.issue_url).await {
        Ok(Some(dates)) => dates,
        Ok(None) => {
            warn!("Could not parse URL: {}", row.issue_url);
            return None;
        }
        Err(err) => {
            warn!("failed to fetch dates for {}: {err}", row.issue_url);
            IssueDates::default()
        }
    };

    let stats = match source.changed_files(&row.fix_url).await {
        Ok(files) => accumulate_changes(ecosystem, &files),
        Err(err) => {
            warn!("failed to fetch fix {}: {err}", row.fix_url);
            FixStats::default()
        }
    };

    Some(QuantitativeMetrics::new(
        row.issue_url,
        row.fix_url,
        ecosystem,
        dates.created_at.as_deref(),
        dates.closed_at.as_deref(),
        &stats,
    ))
}
