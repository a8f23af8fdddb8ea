use chrono::{DateTime, Duration, Utc};

use super::badge::make_badge;
use super::window::apply_duration_percent;
use super::DeploymentFrequencyRequest;
use crate::error::Result;
use crate::models::{Build, DeploymentFrequency, Platform, Tier};

/// Run lengths in minutes, most recent first.
const SAMPLE_DURATIONS: [i64; 10] = [7, 10, 8, 6, 9, 5, 7, 8, 10, 4];
const SAMPLE_DEPLOYMENTS_PER_DAY: f64 = 10.0;
const AZURE_DEVOPS_SAMPLE_URL: &str = "https://dev.azure.com/samsmithnz/samlearnsazure";
const GITHUB_SAMPLE_URL: &str = "https://GitHub.com/samsmithnz/devopsmetrics";

/// Fixed demo result that never touches an upstream platform.
pub fn deployment_frequency(
    request: &DeploymentFrequencyRequest,
    now: DateTime<Utc>,
) -> Result<DeploymentFrequency> {
    let build_list = sample_builds(request, now);
    let tier = Tier::Elite;
    let badge = make_badge(tier.as_str(), SAMPLE_DEPLOYMENTS_PER_DAY)?;

    Ok(DeploymentFrequency {
        target_platform: request.platform,
        deployment_name: request.pipeline_name.clone(),
        number_of_days: request.number_of_days,
        max_number_of_items: request.max_number_of_items,
        total_items: SAMPLE_DURATIONS.len(),
        build_list,
        deployments_per_day_metric: SAMPLE_DEPLOYMENTS_PER_DAY,
        deployments_per_day_metric_description: tier,
        rate_limit_hit: false,
        badge_url: badge.url,
        badge_with_metric_url: badge.with_metric_url,
    })
}

fn sample_builds(request: &DeploymentFrequencyRequest, now: DateTime<Utc>) -> Vec<Build> {
    // Fixture URLs stay fixed whatever project was asked for
    let base_url = match request.platform {
        Platform::AzureDevOps => AZURE_DEVOPS_SAMPLE_URL,
        Platform::GitHub => GITHUB_SAMPLE_URL,
    };

    let mut builds: Vec<Build> = SAMPLE_DURATIONS
        .iter()
        .zip(1_i64..)
        .take(request.max_number_of_items)
        .map(|(minutes, n)| {
            let start_time = now - Duration::hours(n * 6);
            Build {
                build_number: n.to_string(),
                branch: "main".to_string(),
                status: "completed".to_string(),
                url: format!("{base_url}/{n}"),
                start_time,
                end_time: Some(start_time + Duration::minutes(*minutes)),
                build_duration_percent: 0,
            }
        })
        .collect();

    apply_duration_percent(&mut builds);
    builds
}
