//! GitHub REST and GraphQL access for fix statistics.

use crate::CliResult;
use iacbugs_core::ChangedFile;
use log::{debug, warn};
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "iacbugs-cli";
const PER_PAGE: usize = 100;
// The pull request files endpoint stops at 3000 files.
const MAX_PAGES: usize = 30;
const MAX_RATE_LIMIT_ATTEMPTS: usize = 5;
const RATE_LIMIT_PADDING_SECS: u64 = 10;
const RATE_LIMIT_FALLBACK_SECS: u64 = 60;

static ISSUE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+)/issues/(\d+)").expect("issue url pattern")
});
static PULL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+)/pull/(\d+)").expect("pull url pattern")
});
static COMMIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/]+)/commit/([0-9a-f]{40})").expect("commit url pattern")
});

const CLOSURE_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issue(number: $number) {
      createdAt
      closedAt
      timelineItems(last: 1, itemTypes: [CLOSED_EVENT]) {
        nodes {
          __typename
          ... on ClosedEvent {
            closer {
              __typename
              ... on PullRequest { url }
              ... on Commit { oid url }
            }
          }
        }
      }
    }
  }
}
"#;

/// A GitHub issue coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueRef {
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) number: u64,
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// The change that fixed an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FixRef {
    Pull {
        owner: String,
        repo: String,
        number: u64,
    },
    Commit {
        owner: String,
        repo: String,
        sha: String,
    },
}

/// Parse a GitHub issue URL.
pub(crate) fn parse_issue_url(url: &str) -> Option<IssueRef> {
    let captures = ISSUE_URL.captures(url)?;
    Some(IssueRef {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        number: captures[3].parse().ok()?,
    })
}

/// Parse a GitHub pull request or commit URL.
pub(crate) fn parse_fix_url(url: &str) -> Option<FixRef> {
    if url.contains("/pull/") {
        let captures = PULL_URL.captures(url)?;
        return Some(FixRef::Pull {
            owner: captures[1].to_string(),
            repo: captures[2].to_string(),
            number: captures[3].parse().ok()?,
        });
    }
    let captures = COMMIT_URL.captures(url)?;
    Some(FixRef::Commit {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        sha: captures[3].to_string(),
    })
}

/// Creation and closing timestamps of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IssueDates {
    pub(crate) created_at: Option<String>,
    pub(crate) closed_at: Option<String>,
}

/// Async sleep abstraction so rate limit waits can be observed in tests.
pub(crate) trait Sleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Tokio-backed sleeper used in production.
#[cfg_attr(test, allow(dead_code))]
pub(crate) struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    created_at: Option<String>,
    closed_at: Option<String>,
    #[serde(default)]
    timeline_items: TimelineItems,
}

#[derive(Debug, Default, Deserialize)]
struct TimelineItems {
    #[serde(default)]
    nodes: Vec<Option<TimelineNode>>,
}

#[derive(Debug, Deserialize)]
struct TimelineNode {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    closer: Option<CloserNode>,
}

#[derive(Debug, Deserialize)]
struct CloserNode {
    #[serde(rename = "__typename")]
    typename: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    files: Option<Vec<ChangedFile>>,
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub(crate) struct GitHubApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubApi {
    pub(crate) fn new(client: Client, base_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch issue dates, waiting out GraphQL rate limits a bounded number of times.
    pub(crate) async fn issue_dates<S: Sleeper + Sync>(
        &self,
        issue: &IssueRef,
        sleeper: &S,
    ) -> CliResult<IssueDates> {
        let body = serde_json::json!({
            "query": CLOSURE_QUERY,
            "variables": {
                "owner": issue.owner,
                "repo": issue.repo,
                "number": issue.number,
            },
        });
        for attempt in 1..=MAX_RATE_LIMIT_ATTEMPTS {
            let response = self
                .authorized(self.client.post(format!("{}/graphql", self.base_url)))
                .json(&body)
                .send()
                .await?;
            let reset = header_u64(&response, "X-RateLimit-Reset");
            let exhausted = header_u64(&response, "X-RateLimit-Remaining") == Some(0);
            let payload = response.json::<GraphQlResponse>().await?;
            let rate_limited = payload
                .errors
                .iter()
                .any(|error| error.kind.as_deref() == Some("RATE_LIMITED"));
            if rate_limited || (exhausted && !payload.errors.is_empty()) {
                let wait = rate_limit_wait(reset, unix_now());
                warn!(
                    "GitHub API rate limit exceeded (attempt {attempt}). Waiting for {} minutes...",
                    wait.as_secs() / 60
                );
                sleeper.sleep(wait).await;
                continue;
            }
            if let Some(error) = payload.errors.first() {
                let kind = error.kind.as_deref().unwrap_or("ERROR");
                let message = &error.message;
                return Err(format!("GraphQL query for {issue} failed: {kind} {message}").into());
            }
            return dates_from_payload(issue, payload);
        }
        Err(format!("rate limit retries exhausted for {issue}").into())
    }

    /// Files changed by a pull request or commit.
    pub(crate) async fn changed_files(&self, fix: &FixRef) -> CliResult<Vec<ChangedFile>> {
        match fix {
            FixRef::Pull {
                owner,
                repo,
                number,
            } => self.pull_request_files(owner, repo, *number).await,
            FixRef::Commit { owner, repo, sha } => self.commit_files(owner, repo, sha).await,
        }
    }

    async fn pull_request_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> CliResult<Vec<ChangedFile>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{number}/files",
            self.base_url
        );
        let mut files = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self
                .authorized(self.client.get(&url))
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<ChangedFile>>()
                .await?;
            let last_page = batch.len() < PER_PAGE;
            files.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(files)
    }

    async fn commit_files(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> CliResult<Vec<ChangedFile>> {
        let url = format!("{}/repos/{owner}/{repo}/commits/{sha}", self.base_url);
        let commit = self
            .authorized(self.client.get(url))
            .send()
            .await?
            .error_for_status()?
            .json::<CommitResponse>()
            .await?;
        commit
            .files
            .ok_or_else(|| format!("commit {sha} response has no files").into())
    }
}

fn dates_from_payload(issue: &IssueRef, payload: GraphQlResponse) -> CliResult<IssueDates> {
    let node = payload
        .data
        .and_then(|data| data.repository)
        .and_then(|repository| repository.issue)
        .ok_or_else(|| format!("issue {issue} not found"))?;

    match node.timeline_items.nodes.into_iter().flatten().last() {
        Some(TimelineNode {
            typename,
            closer: Some(CloserNode {
                typename: closer,
                url: Some(url),
            }),
        }) if typename == "ClosedEvent" => debug!("{issue} closed by {closer} {url}"),
        _ => debug!("{issue} has no recorded closer"),
    }

    Ok(IssueDates {
        created_at: node.created_at,
        closed_at: node.closed_at,
    })
}

fn rate_limit_wait(reset: Option<u64>, now: u64) -> Duration {
    let remaining = match reset {
        Some(reset) => reset.saturating_sub(now),
        None => RATE_LIMIT_FALLBACK_SECS,
    };
    Duration::from_secs(remaining + RATE_LIMIT_PADDING_SECS)
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::Mutex;

    pub(crate) struct RecordingSleeper {
        durations: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn new() -> Self {
            Self {
                durations: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn durations(&self) -> Vec<Duration> {
            self.durations.lock().expect("sleeper lock").clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep<'a>(
            &'a self,
            duration: Duration,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
            self.durations.lock().expect("sleeper lock").push(duration);
            Box::pin(async {})
        }
    }

    fn changed(filename: &str, additions: u64, deletions: u64) -> serde_json::Value {
        serde_json::json!({
            "sha": "abc",
            "filename": filename,
            "status": "modified",
            "additions": additions,
            "deletions": deletions,
            "changes": additions + deletions,
        })
    }

    fn issue() -> IssueRef {
        IssueRef {
            owner: "sous-chefs".to_string(),
            repo: "golang".to_string(),
            number: 54,
        }
    }

    #[test]
    fn parses_issue_urls() {
        let issue =
            parse_issue_url("https://github.com/sous-chefs/golang/issues/54").expect("issue");
        assert_eq!(issue.owner, "sous-chefs");
        assert_eq!(issue.repo, "golang");
        assert_eq!(issue.number, 54);
        assert_eq!(issue.to_string(), "sous-chefs/golang#54");
        assert!(parse_issue_url("https://puppet.atlassian.net/browse/PUP-1").is_none());
    }

    #[test]
    fn parses_fix_urls() {
        assert_eq!(
            parse_fix_url("https://github.com/sous-chefs/golang/pull/55"),
            Some(FixRef::Pull {
                owner: "sous-chefs".to_string(),
                repo: "golang".to_string(),
                number: 55,
            })
        );
        let sha = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(
            parse_fix_url(&format!("https://github.com/ansible/ansible/commit/{sha}")),
            Some(FixRef::Commit {
                owner: "ansible".to_string(),
                repo: "ansible".to_string(),
                sha: sha.to_string(),
            })
        );
        assert!(parse_fix_url("https://github.com/ansible/ansible/commit/short").is_none());
        assert!(parse_fix_url("https://github.com/ansible/ansible/pull/x").is_none());
    }

    #[test]
    fn rate_limit_wait_pads_the_reset_time() {
        assert_eq!(rate_limit_wait(Some(130), 100), Duration::from_secs(40));
        assert_eq!(rate_limit_wait(Some(50), 100), Duration::from_secs(10));
        assert_eq!(rate_limit_wait(None, 100), Duration::from_secs(70));
    }

    #[tokio::test]
    async fn fetches_issue_dates() {
        let server = MockServer::start_async().await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .header("authorization", "Bearer token");
                then.status(200).json_body(serde_json::json!({
                    "data": {"repository": {"issue": {
                        "createdAt": "2016-06-20T10:36:22Z",
                        "closedAt": "2016-06-21T10:36:22Z",
                        "timelineItems": {"nodes": [{
                            "__typename": "ClosedEvent",
                            "closer": {
                                "__typename": "PullRequest",
                                "url": "https://github.com/sous-chefs/golang/pull/55"
                            }
                        }]}
                    }}}
                }));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), Some("token".to_string()));
        let sleeper = RecordingSleeper::new();
        let dates = api.issue_dates(&issue(), &sleeper).await.expect("dates");

        assert_eq!(dates.created_at.as_deref(), Some("2016-06-20T10:36:22Z"));
        assert_eq!(dates.closed_at.as_deref(), Some("2016-06-21T10:36:22Z"));
        assert!(sleeper.durations().is_empty());
        graphql.assert_async().await;
    }

    #[tokio::test]
    async fn missing_issue_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .json_body(serde_json::json!({"data": {"repository": {"issue": null}}}));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let err = api
            .issue_dates(&issue(), &RecordingSleeper::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn rate_limited_queries_are_retried_then_abandoned() {
        let server = MockServer::start_async().await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .header("X-RateLimit-Reset", "0")
                    .json_body(serde_json::json!({
                        "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]
                    }));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let sleeper = RecordingSleeper::new();
        let err = api.issue_dates(&issue(), &sleeper).await.unwrap_err();

        assert!(err.to_string().contains("rate limit retries exhausted"));
        assert_eq!(
            sleeper.durations(),
            vec![Duration::from_secs(RATE_LIMIT_PADDING_SECS); MAX_RATE_LIMIT_ATTEMPTS]
        );
        graphql.assert_hits_async(MAX_RATE_LIMIT_ATTEMPTS).await;
    }

    #[tokio::test]
    async fn exhausted_quota_header_triggers_a_wait() {
        let server = MockServer::start_async().await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .header("X-RateLimit-Remaining", "0")
                    .header("X-RateLimit-Reset", "0")
                    .json_body(serde_json::json!({
                        "errors": [{"message": "API rate limit exceeded"}]
                    }));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let sleeper = RecordingSleeper::new();
        assert!(api.issue_dates(&issue(), &sleeper).await.is_err());
        assert_eq!(sleeper.durations().len(), MAX_RATE_LIMIT_ATTEMPTS);
        graphql.assert_hits_async(MAX_RATE_LIMIT_ATTEMPTS).await;
    }

    #[tokio::test]
    async fn other_query_errors_fail_without_waiting() {
        let reset = (unix_now() + 3600).to_string();
        let server = MockServer::start_async().await;
        let graphql = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .header("X-RateLimit-Remaining", "4999")
                    .header("X-RateLimit-Reset", reset.as_str())
                    .json_body(serde_json::json!({
                        "data": {"repository": null},
                        "errors": [{
                            "type": "NOT_FOUND",
                            "message": "Could not resolve to a Repository."
                        }]
                    }));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let sleeper = RecordingSleeper::new();
        let err = api.issue_dates(&issue(), &sleeper).await.unwrap_err();

        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(sleeper.durations().is_empty());
        graphql.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn pull_request_files_are_paginated() {
        let server = MockServer::start_async().await;
        let first: Vec<serde_json::Value> = (0..PER_PAGE)
            .map(|index| changed(&format!("recipes/r{index}.rb"), 1, 0))
            .collect();
        let page_one = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/sous-chefs/golang/pulls/55/files")
                    .query_param("per_page", "100")
                    .query_param("page", "1");
                then.status(200).json_body(serde_json::Value::Array(first));
            })
            .await;
        let page_two = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/sous-chefs/golang/pulls/55/files")
                    .query_param("page", "2");
                then.status(200)
                    .json_body(serde_json::json!([changed("spec/unit/default_spec.rb", 12, 3)]));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let fix = parse_fix_url("https://github.com/sous-chefs/golang/pull/55").expect("fix");
        let files = api.changed_files(&fix).await.expect("files");

        assert_eq!(files.len(), PER_PAGE + 1);
        assert_eq!(files[PER_PAGE].filename, "spec/unit/default_spec.rb");
        assert_eq!(files[PER_PAGE].additions, 12);
        page_one.assert_async().await;
        page_two.assert_async().await;
    }

    #[tokio::test]
    async fn commit_files_require_a_files_key() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/repos/ansible/ansible/commits/{sha}"));
                then.status(200).json_body(serde_json::json!({
                    "sha": sha,
                    "files": [changed("lib/ansible/modules/apt.py", 4, 2)]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("/repos/ansible/ansible/commits/{}", "f".repeat(40)));
                then.status(200).json_body(serde_json::json!({"sha": "f"}));
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let fix = FixRef::Commit {
            owner: "ansible".to_string(),
            repo: "ansible".to_string(),
            sha: sha.to_string(),
        };
        let files = api.changed_files(&fix).await.expect("files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].deletions, 2);

        let missing = FixRef::Commit {
            owner: "ansible".to_string(),
            repo: "ansible".to_string(),
            sha: "f".repeat(40),
        };
        let err = api.changed_files(&missing).await.unwrap_err();
        assert!(err.to_string().contains("has no files"));
    }

    #[tokio::test]
    async fn failed_requests_surface_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/org/repo/pulls/1/files");
                then.status(404).body("missing");
            })
            .await;

        let api = GitHubApi::new(Client::new(), &server.url(""), None);
        let fix = FixRef::Pull {
            owner: "org".to_string(),
            repo: "repo".to_string(),
            number: 1,
        };
        assert!(api.changed_files(&fix).await.is_err());
    }
}
