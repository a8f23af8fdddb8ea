use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};

use super::client::{GitHubClient, WorkflowDto, WorkflowRunDto};
use crate::auth::Token;
use crate::error::{DeployFreqError, Result};
use crate::models::{Build, Platform};
use crate::providers::{BuildSource, PipelineTarget, MAX_FETCHED_BUILDS};

const PER_PAGE: u32 = 100;

pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(api_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let client = GitHubClient::new(api_url, token, timeout)?;

        Ok(Self { client })
    }

    /// Workflow path segment for the runs endpoint. The API accepts an id or
    /// a file name, so display names are looked up in the workflow list.
    async fn resolve_workflow(&self, target: &PipelineTarget) -> Result<String> {
        if let Some(id) = &target.pipeline_id {
            return Ok(id.clone());
        }
        let name = target.pipeline_name.as_str();
        if is_id_or_file_name(name) {
            return Ok(name.to_string());
        }

        let mut seen = 0;
        let mut page = 1;
        loop {
            let result = self
                .client
                .fetch_workflows_page(&target.owner, &target.project, page, PER_PAGE)
                .await?;
            let fetched_count = result.workflows.len();
            seen += fetched_count;

            let found = result.workflows.iter().find(|w| matches_workflow(w, name));
            if let Some(workflow) = found {
                debug!("Resolved workflow '{name}' to id {}", workflow.id);
                return Ok(workflow.id.to_string());
            }
            if fetched_count == 0 || seen >= result.total_count {
                break;
            }
            page += 1;
        }

        Err(DeployFreqError::Config(format!(
            "Workflow '{name}' not found in {}/{}",
            target.owner, target.project
        )))
    }
}

fn is_id_or_file_name(workflow: &str) -> bool {
    workflow.ends_with(".yml")
        || workflow.ends_with(".yaml")
        || (!workflow.is_empty() && workflow.bytes().all(|b| b.is_ascii_digit()))
}

fn matches_workflow(workflow: &WorkflowDto, name: &str) -> bool {
    workflow.name == name || workflow.path.rsplit('/').next() == Some(name)
}

fn to_build(dto: WorkflowRunDto) -> Build {
    let start_time = dto.run_started_at.unwrap_or(dto.created_at);
    let status = dto.status.unwrap_or_default();
    let end_time = if status == "completed" {
        dto.updated_at.filter(|end| *end >= start_time)
    } else {
        None
    };

    Build {
        build_number: dto.run_number.to_string(),
        branch: dto.head_branch.unwrap_or_default(),
        status,
        url: dto.html_url,
        start_time,
        end_time,
        build_duration_percent: 0,
    }
}

#[async_trait]
impl BuildSource for GitHubProvider {
    fn platform(&self) -> Platform {
        Platform::GitHub
    }

    async fn fetch_builds(&self, target: &PipelineTarget) -> Result<Vec<Build>> {
        let workflow = self.resolve_workflow(target).await?;
        let mut all_runs = Vec::new();
        let mut page = 1;

        info!(
            "Fetching GitHub workflow runs for {}/{} ({workflow})",
            target.owner, target.project
        );

        while all_runs.len() < MAX_FETCHED_BUILDS {
            let result = self
                .client
                .fetch_workflow_runs_page(
                    &target.owner,
                    &target.project,
                    &workflow,
                    &target.branch,
                    page,
                    PER_PAGE,
                )
                .await?;

            let fetched_count = result.workflow_runs.len();
            all_runs.extend(result.workflow_runs.into_iter().map(to_build));

            info!(
                "Page {page}: fetched {fetched_count} runs (total: {} of {})",
                all_runs.len(),
                result.total_count
            );

            if fetched_count == 0 || all_runs.len() >= result.total_count {
                break;
            }
            page += 1;
        }

        all_runs.truncate(MAX_FETCHED_BUILDS);
        Ok(all_runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const RUNS_PATH: &str = "/repos/samsmithnz/SamsFeatureFlags/actions/workflows/108084/runs";

    fn target() -> PipelineTarget {
        PipelineTarget {
            owner: "samsmithnz".to_string(),
            project: "SamsFeatureFlags".to_string(),
            branch: "main".to_string(),
            pipeline_name: "SamsFeatureFlags.CI/CD".to_string(),
            pipeline_id: Some("108084".to_string()),
        }
    }

    fn provider(url: &str, token: Option<Token>) -> GitHubProvider {
        GitHubProvider::new(url, token, Duration::from_secs(5)).unwrap()
    }

    fn run_json(run_number: u64, status: &str) -> String {
        format!(
            r#"{{
                "id": {},
                "run_number": {run_number},
                "name": "SamsFeatureFlags.CI/CD",
                "head_branch": "main",
                "status": "{status}",
                "conclusion": null,
                "html_url": "https://github.com/samsmithnz/SamsFeatureFlags/actions/runs/{run_number}",
                "created_at": "2024-03-14T09:59:00Z",
                "run_started_at": "2024-03-14T10:00:00Z",
                "updated_at": "2024-03-14T10:06:00Z"
            }}"#,
            run_number + 9000
        )
    }

    fn page(total_count: usize, runs: &[String]) -> String {
        format!(
            r#"{{ "total_count": {total_count}, "workflow_runs": [{}] }}"#,
            runs.join(",")
        )
    }

    #[tokio::test]
    async fn test_maps_runs_and_passes_status_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("branch".into(), "main".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("authorization", "Bearer ghp_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(2, &[run_json(42, "completed"), run_json(43, "in_progress")]))
            .create_async()
            .await;

        let builds = provider(&server.url(), Some(Token::from("ghp_test")))
            .fetch_builds(&target())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].build_number, "42");
        assert_eq!(builds[0].branch, "main");
        assert_eq!(builds[0].status, "completed");
        assert_eq!(
            builds[0].url,
            "https://github.com/samsmithnz/SamsFeatureFlags/actions/runs/42"
        );
        assert_eq!(builds[0].duration_seconds(), 360);
        assert_eq!(builds[1].status, "in_progress");
        assert!(builds[1].end_time.is_none());
    }

    #[tokio::test]
    async fn test_paginates_until_total_count() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(3, &[run_json(3, "completed"), run_json(2, "completed")]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(3, &[run_json(1, "completed")]))
            .expect(1)
            .create_async()
            .await;

        let builds = provider(&server.url(), None)
            .fetch_builds(&target())
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(builds.len(), 3);
    }

    #[tokio::test]
    async fn test_uses_workflow_name_without_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/repos/samsmithnz/SamsFeatureFlags/actions/workflows/ci.yml/runs",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(0, &[]))
            .create_async()
            .await;

        let mut target = target();
        target.pipeline_name = "ci.yml".to_string();
        target.pipeline_id = None;

        let builds = provider(&server.url(), None)
            .fetch_builds(&target)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(builds.is_empty());
    }

    #[tokio::test]
    async fn test_resolves_workflow_display_name_to_id() {
        let mut server = mockito::Server::new_async().await;
        let workflows = server
            .mock("GET", "/repos/samsmithnz/SamsFeatureFlags/actions/workflows")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "total_count": 2,
                    "workflows": [
                        { "id": 5, "name": "CodeQL", "path": ".github/workflows/codeql.yml", "state": "active" },
                        { "id": 108084, "name": "SamsFeatureFlags.CI/CD", "path": ".github/workflows/main.yml", "state": "active" }
                    ]
                }"#,
            )
            .expect(1)
            .create_async()
            .await;
        let runs = server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(1, &[run_json(7, "completed")]))
            .expect(1)
            .create_async()
            .await;

        let mut target = target();
        target.pipeline_id = None;

        let builds = provider(&server.url(), None)
            .fetch_builds(&target)
            .await
            .unwrap();

        workflows.assert_async().await;
        runs.assert_async().await;
        assert_eq!(builds.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_workflow_name_is_config_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/samsmithnz/SamsFeatureFlags/actions/workflows")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{ "total_count": 1, "workflows": [ { "id": 5, "name": "CodeQL", "path": ".github/workflows/codeql.yml" } ] }"#,
            )
            .create_async()
            .await;

        let mut target = target();
        target.pipeline_name = "Release".to_string();
        target.pipeline_id = None;

        let err = provider(&server.url(), None)
            .fetch_builds(&target)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployFreqError::Config(ref m) if m.contains("Release")));
    }

    #[test]
    fn test_workflow_selector_kinds() {
        assert!(is_id_or_file_name("ci.yml"));
        assert!(is_id_or_file_name("deploy.yaml"));
        assert!(is_id_or_file_name("108084"));
        assert!(!is_id_or_file_name("SamsFeatureFlags.CI/CD"));
        assert!(!is_id_or_file_name(""));
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-ratelimit-remaining", "0")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .fetch_builds(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployFreqError::UpstreamRateLimited(_)));
    }

    #[tokio::test]
    async fn test_forbidden_with_quota_left_is_bad_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("x-ratelimit-remaining", "4999")
            .with_body(r#"{"message": "Resource not accessible"}"#)
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .fetch_builds(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployFreqError::UpstreamBadResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", RUNS_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "workflow_runs": [] }"#)
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .fetch_builds(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployFreqError::UpstreamBadResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        // Nothing listens on the discard port
        let err = provider("http://127.0.0.1:9", None)
            .fetch_builds(&target())
            .await
            .unwrap_err();

        assert!(matches!(err, DeployFreqError::UpstreamUnavailable(_)));
    }
}
