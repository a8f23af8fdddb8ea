use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::Result;
use crate::providers::http;

const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowRunsPageDto {
    pub total_count: usize,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRunDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkflowRunDto {
    pub run_number: u64,
    pub head_branch: Option<String>,
    pub status: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub run_started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowsPageDto {
    pub total_count: usize,
    #[serde(default)]
    pub workflows: Vec<WorkflowDto>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowDto {
    pub id: u64,
    pub name: String,
    pub path: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            api_url: http::parse_base_url(api_url)?,
            token,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn api_request(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        self.auth_request(request)
    }

    /// Fetch a page of the workflows defined in a repository.
    pub async fn fetch_workflows_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u32,
    ) -> Result<WorkflowsPageDto> {
        let url = http::join_segments(
            &self.api_url,
            &["repos", owner, repo, "actions", "workflows"],
        )?;

        let request = self
            .api_request(url)
            .query(&[("page", page), ("per_page", per_page)]);

        let response = http::check_status(request.send().await?).await?;
        let workflows = response.json::<WorkflowsPageDto>().await?;
        Ok(workflows)
    }

    /// Fetch a page of runs for one workflow (id or file name).
    pub async fn fetch_workflow_runs_page(
        &self,
        owner: &str,
        repo: &str,
        workflow: &str,
        branch: &str,
        page: u32,
        per_page: u32,
    ) -> Result<WorkflowRunsPageDto> {
        let url = http::join_segments(
            &self.api_url,
            &["repos", owner, repo, "actions", "workflows", workflow, "runs"],
        )?;

        let mut request = self
            .api_request(url)
            .query(&[("page", page), ("per_page", per_page)]);
        if !branch.is_empty() {
            request = request.query(&[("branch", branch)]);
        }

        let response = http::check_status(request.send().await?).await?;
        let runs = response.json::<WorkflowRunsPageDto>().await?;
        Ok(runs)
    }
}
