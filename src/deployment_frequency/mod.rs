mod badge;
mod cache;
mod metric;
mod sample;
mod window;

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use cache::{CacheKey, ResultCache};

use crate::error::{DeployFreqError, Result};
use crate::models::{Build, DeploymentFrequency, Platform, Tier};
use crate::providers::{BuildSource, PipelineTarget};

/// Everything the caller supplies for one deployment frequency request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentFrequencyRequest {
    pub platform: Platform,
    pub owner: String,
    pub project: String,
    pub branch: String,
    pub pipeline_name: String,
    pub pipeline_id: Option<String>,
    pub number_of_days: u32,
    pub max_number_of_items: usize,
    pub use_cache: bool,
    pub use_sample_data: bool,
}

impl DeploymentFrequencyRequest {
    fn cache_key(&self) -> CacheKey {
        CacheKey {
            platform: self.platform,
            owner: self.owner.clone(),
            project: self.project.clone(),
            branch: self.branch.clone(),
            pipeline: self
                .pipeline_id
                .clone()
                .unwrap_or_else(|| self.pipeline_name.clone()),
            number_of_days: self.number_of_days,
            max_number_of_items: self.max_number_of_items,
        }
    }

    fn target(&self) -> PipelineTarget {
        PipelineTarget {
            owner: self.owner.clone(),
            project: self.project.clone(),
            branch: self.branch.clone(),
            pipeline_name: self.pipeline_name.clone(),
            pipeline_id: self.pipeline_id.clone(),
        }
    }
}

pub struct DeploymentFrequencyEngine {
    cache: ResultCache,
}

impl DeploymentFrequencyEngine {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache: ResultCache::new(cache_ttl),
        }
    }

    /// Compute the deployment frequency for one pipeline.
    ///
    /// Throttling never fails the request: the last cached result (or an
    /// empty one) comes back with `rate_limit_hit` set.
    pub async fn deployment_frequency(
        &self,
        source: &dyn BuildSource,
        request: &DeploymentFrequencyRequest,
    ) -> Result<DeploymentFrequency> {
        if request.number_of_days == 0 {
            return Err(DeployFreqError::Config(
                "number of days must be at least 1".to_string(),
            ));
        }
        if source.platform() != request.platform {
            return Err(DeployFreqError::Config(format!(
                "request targets {} but the build source is {}",
                request.platform,
                source.platform()
            )));
        }

        if request.use_sample_data {
            info!("Returning sample data for {}", request.pipeline_name);
            return sample::deployment_frequency(request, Utc::now());
        }

        let key = request.cache_key();
        if request.use_cache {
            if let Some(cached) = self.cache.get(&key) {
                debug!("Cache hit for {key:?}");
                return Ok(cached);
            }
            debug!("Cache miss for {key:?}");
        }

        let builds = match source.fetch_builds(&request.target()).await {
            Ok(builds) => builds,
            Err(DeployFreqError::UpstreamRateLimited(message)) => {
                warn!("Rate limit hit on {}: {message}", request.platform);
                return self.rate_limited(request, &key);
            }
            Err(e) => return Err(e),
        };

        let result = compute(request, builds, Utc::now())?;

        if request.use_cache {
            self.cache.put(key, result.clone());
        }

        info!(
            "{} deployments in {} days ({:.2} per day, {})",
            result.total_items,
            result.number_of_days,
            result.deployments_per_day_metric,
            result.deployments_per_day_metric_description
        );

        Ok(result)
    }

    fn rate_limited(
        &self,
        request: &DeploymentFrequencyRequest,
        key: &CacheKey,
    ) -> Result<DeploymentFrequency> {
        if request.use_cache {
            if let Some(mut cached) = self.cache.get_stale(key) {
                info!("Serving previously cached result after rate limit");
                cached.rate_limit_hit = true;
                return Ok(cached);
            }
        }

        let mut empty = compute(request, Vec::new(), Utc::now())?;
        empty.rate_limit_hit = true;
        Ok(empty)
    }
}

fn compute(
    request: &DeploymentFrequencyRequest,
    builds: Vec<Build>,
    now: DateTime<Utc>,
) -> Result<DeploymentFrequency> {
    let (build_list, total_items) = window::normalize(
        builds,
        request.number_of_days,
        request.max_number_of_items,
        now,
    );
    let (per_day, tier): (f64, Tier) = metric::compute(total_items, request.number_of_days);
    let badge = badge::make_badge(tier.as_str(), per_day)?;

    Ok(DeploymentFrequency {
        target_platform: request.platform,
        deployment_name: request.pipeline_name.clone(),
        number_of_days: request.number_of_days,
        max_number_of_items: request.max_number_of_items,
        total_items,
        build_list,
        deployments_per_day_metric: per_day,
        deployments_per_day_metric_description: tier,
        rate_limit_hit: false,
        badge_url: badge.url,
        badge_with_metric_url: badge.with_metric_url,
    })
}
