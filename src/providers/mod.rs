pub mod azure_devops;
pub mod github;
mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Build, Platform};

/// Maximum number of records an adapter pulls before it stops paginating.
pub const MAX_FETCHED_BUILDS: usize = 1000;

/// Identifies one pipeline on one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTarget {
    pub owner: String,
    pub project: String,
    pub branch: String,
    pub pipeline_name: String,
    pub pipeline_id: Option<String>,
}

#[async_trait]
pub trait BuildSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch the pipeline's run history, mapped to [`Build`] records.
    ///
    /// Throttling surfaces as `UpstreamRateLimited` so the caller can fall
    /// back instead of failing.
    async fn fetch_builds(&self, target: &PipelineTarget) -> Result<Vec<Build>>;
}
