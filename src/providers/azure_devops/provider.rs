use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::client::{AzureDevOpsClient, BuildDto};
use crate::auth::Token;
use crate::error::Result;
use crate::models::{Build, Platform};
use crate::providers::{BuildSource, PipelineTarget, MAX_FETCHED_BUILDS};

const PAGE_SIZE: usize = 100;

pub struct AzureDevOpsProvider {
    client: AzureDevOpsClient,
}

impl AzureDevOpsProvider {
    pub fn new(base_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        let client = AzureDevOpsClient::new(base_url, token, timeout)?;

        Ok(Self { client })
    }
}

/// Match on definition id when one was given, otherwise on its name.
fn matches_definition(dto: &BuildDto, target: &PipelineTarget) -> bool {
    dto.definition.as_ref().is_some_and(|d| match &target.pipeline_id {
        Some(id) => d.id.to_string() == *id,
        None => d.name == target.pipeline_name,
    })
}

fn to_build(dto: BuildDto) -> Option<Build> {
    let start_time = dto.start_time.or(dto.queue_time)?;
    let end_time = dto.finish_time.filter(|end| *end >= start_time);
    let url = dto
        .links
        .and_then(|l| l.web)
        .map_or(dto.url, |web| web.href);

    Some(Build {
        build_number: dto.build_number,
        branch: dto.source_branch,
        status: dto.status,
        url,
        start_time,
        end_time,
        build_duration_percent: 0,
    })
}

#[async_trait]
impl BuildSource for AzureDevOpsProvider {
    fn platform(&self) -> Platform {
        Platform::AzureDevOps
    }

    async fn fetch_builds(&self, target: &PipelineTarget) -> Result<Vec<Build>> {
        let mut all_builds = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut fetched = 0;
        let mut page = 1;

        info!(
            "Fetching Azure DevOps builds for {}/{} ({})",
            target.owner, target.project, target.pipeline_name
        );

        // The cap counts every record pulled, matching or not
        while fetched < MAX_FETCHED_BUILDS {
            let top = PAGE_SIZE.min(MAX_FETCHED_BUILDS - fetched);
            let result = self
                .client
                .fetch_build_page(
                    &target.owner,
                    &target.project,
                    &target.branch,
                    target.pipeline_id.as_deref(),
                    top,
                    continuation_token.as_deref(),
                )
                .await?;

            let fetched_count = result.builds.len();
            fetched += fetched_count;
            all_builds.extend(
                result
                    .builds
                    .into_iter()
                    .filter(|b| matches_definition(b, target))
                    .filter_map(|b| {
                        let id = b.id;
                        let build = to_build(b);
                        if build.is_none() {
                            debug!("Skipping build {id} without a start or queue time");
                        }
                        build
                    }),
            );

            info!(
                "Page {page}: fetched {fetched_count} builds (fetched: {fetched}, kept: {})",
                all_builds.len()
            );

            continuation_token = result.continuation_token;
            if continuation_token.is_none() || fetched_count == 0 {
                break;
            }
            page += 1;
        }

        if fetched >= MAX_FETCHED_BUILDS && continuation_token.is_some() {
            warn!("Stopped after {fetched} builds, older history was not fetched");
        }

        Ok(all_builds)
    }
}
