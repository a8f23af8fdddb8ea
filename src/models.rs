use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DeployFreqError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    AzureDevOps,
    GitHub,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AzureDevOps => write!(f, "Azure DevOps"),
            Self::GitHub => write!(f, "GitHub"),
        }
    }
}

/// DORA deployment frequency classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Elite,
    High,
    Medium,
    Low,
    None,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elite => "Elite",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::None => "None",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = DeployFreqError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Elite" => Ok(Self::Elite),
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            "None" => Ok(Self::None),
            other => Err(DeployFreqError::InvalidTier(other.to_string())),
        }
    }
}

/// One pipeline run, normalized from whatever the platform returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub build_number: String,
    pub branch: String,
    pub status: String,
    pub url: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub build_duration_percent: u32,
}

impl Build {
    /// Unfinished runs count as zero-length.
    pub fn duration_seconds(&self) -> i64 {
        self.end_time
            .map_or(0, |end| (end - self.start_time).num_seconds().max(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFrequency {
    pub target_platform: Platform,
    pub deployment_name: String,
    pub number_of_days: u32,
    pub max_number_of_items: usize,
    pub total_items: usize,
    pub build_list: Vec<Build>,
    pub deployments_per_day_metric: f64,
    pub deployments_per_day_metric_description: Tier,
    pub rate_limit_hit: bool,
    pub badge_url: String,
    pub badge_with_metric_url: String,
}
