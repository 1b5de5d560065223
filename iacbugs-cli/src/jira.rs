//! Jira issue lookups for Puppet bugs tracked outside GitHub.

use crate::CliResult;
use crate::github::IssueDates;
use reqwest::Client;
use serde::Deserialize;

pub(crate) const DEFAULT_JIRA_API_URL: &str = "https://puppet.atlassian.net";
pub(crate) const NOT_RESOLVED: &str = "Not Resolved";

#[derive(Debug, Deserialize)]
struct JiraIssue {
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    created: String,
    resolutiondate: Option<String>,
}

/// Jira REST client.
#[derive(Debug, Clone)]
pub(crate) struct JiraApi {
    client: Client,
    base_url: String,
}

impl JiraApi {
    pub(crate) fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Whether an issue URL belongs to this Jira site.
    pub(crate) fn owns(&self, issue_url: &str) -> bool {
        !self.base_url.is_empty() && issue_url.starts_with(&format!("{}/", self.base_url))
    }

    /// Creation and resolution dates; unresolved issues report `Not Resolved`.
    pub(crate) async fn issue_dates(&self, issue_url: &str) -> CliResult<IssueDates> {
        let key = issue_key(issue_url).ok_or_else(|| format!("no issue key in {issue_url}"))?;
        let issue = self
            .client
            .get(format!("{}/rest/api/3/issue/{key}", self.base_url))
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<JiraIssue>()
            .await?;
        Ok(IssueDates {
            created_at: Some(issue.fields.created),
            closed_at: Some(
                issue
                    .fields
                    .resolutiondate
                    .unwrap_or_else(|| NOT_RESOLVED.to_string()),
            ),
        })
    }
}

fn issue_key(issue_url: &str) -> Option<&str> {
    issue_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|key| !key.is_empty())
}
