use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::Token;
use crate::deployment_frequency::{DeploymentFrequencyEngine, DeploymentFrequencyRequest};
use crate::models::{DeploymentFrequency, Platform};
use crate::providers::azure_devops::AzureDevOpsProvider;
use crate::providers::github::GitHubProvider;
use crate::providers::BuildSource;

#[derive(Parser)]
#[command(name = "deployfreq")]
#[command(author, version, about = "DORA deployment frequency from CI/CD history", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// How long computed results stay cached, in seconds
    #[arg(long, global = true, env = "DEPLOYFREQ_CACHE_TTL_SECS", default_value_t = 600)]
    cache_ttl_secs: u64,

    /// Upstream request timeout, in seconds
    #[arg(long, global = true, env = "DEPLOYFREQ_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Args)]
struct WindowArgs {
    /// Trailing window to count deployments over
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,

    /// Maximum number of builds to list
    #[arg(short, long, default_value_t = 20)]
    max_items: usize,

    /// Skip the result cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Return fixed sample data instead of calling the platform
    #[arg(long, default_value_t = false)]
    sample: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deployment frequency of an Azure DevOps build definition
    AzureDevops {
        /// Personal access token (optional for public projects)
        #[arg(short, long, env = "AZURE_DEVOPS_PAT")]
        token: Option<String>,

        /// Azure DevOps instance URL
        #[arg(short, long, default_value = "https://dev.azure.com")]
        url: String,

        /// Organization name
        #[arg(long)]
        organization: String,

        /// Project name
        #[arg(short = 'P', long)]
        project: String,

        /// Branch to count builds on (e.g., "refs/heads/main")
        #[arg(short, long)]
        branch: String,

        /// Build definition name
        #[arg(long)]
        build_name: String,

        /// Build definition id (filters server-side when given)
        #[arg(long)]
        build_id: Option<String>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Deployment frequency of a GitHub Actions workflow
    Github {
        /// GitHub API token (optional, raises the rate limit)
        #[arg(short, long, env = "GITHUB_TOKEN")]
        token: Option<String>,

        /// GitHub API URL
        #[arg(long, default_value = "https://api.github.com")]
        api_url: String,

        /// Repository owner
        #[arg(long)]
        owner: String,

        /// Repository name
        #[arg(short, long)]
        repo: String,

        /// Branch to count runs on
        #[arg(short, long)]
        branch: String,

        /// Workflow display name, file name (e.g., "ci.yml") or id
        #[arg(long)]
        workflow_name: String,

        /// Workflow id (preferred over the name when given)
        #[arg(long)]
        workflow_id: Option<String>,

        #[command(flatten)]
        window: WindowArgs,
    },
    /// Deployment frequency of every target in a JSON file, sharing one cache
    Batch {
        /// JSON array of targets
        #[arg(short, long)]
        file: PathBuf,

        /// Azure DevOps personal access token
        #[arg(long, env = "AZURE_DEVOPS_PAT")]
        azure_devops_token: Option<String>,

        /// Azure DevOps instance URL
        #[arg(long, default_value = "https://dev.azure.com")]
        azure_devops_url: String,

        /// GitHub API token
        #[arg(long, env = "GITHUB_TOKEN")]
        github_token: Option<String>,

        /// GitHub API URL
        #[arg(long, default_value = "https://api.github.com")]
        github_api_url: String,
    },
}

/// One entry of a batch file. Omitted window fields take the CLI defaults.
#[derive(Debug, Deserialize)]
struct BatchTarget {
    platform: Platform,
    owner: String,
    project: String,
    branch: String,
    pipeline_name: String,
    #[serde(default)]
    pipeline_id: Option<String>,
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default = "default_max_items")]
    max_items: usize,
    #[serde(default)]
    no_cache: bool,
    #[serde(default)]
    sample: bool,
}

fn default_days() -> u32 {
    7
}

fn default_max_items() -> usize {
    20
}

impl From<BatchTarget> for DeploymentFrequencyRequest {
    fn from(target: BatchTarget) -> Self {
        Self {
            platform: target.platform,
            owner: target.owner,
            project: target.project,
            branch: target.branch,
            pipeline_name: target.pipeline_name,
            pipeline_id: target.pipeline_id,
            number_of_days: target.days,
            max_number_of_items: target.max_items,
            use_cache: !target.no_cache,
            use_sample_data: target.sample,
        }
    }
}

fn read_batch(path: &Path) -> Result<Vec<DeploymentFrequencyRequest>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let targets: Vec<BatchTarget> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid batch file {}", path.display()))?;

    Ok(targets.into_iter().map(Into::into).collect())
}

/// Serve each request in order through the same engine, so repeated targets
/// are answered from its cache.
async fn run_batch(
    engine: &DeploymentFrequencyEngine,
    sources: &[Box<dyn BuildSource>],
    requests: &[DeploymentFrequencyRequest],
) -> Result<Vec<DeploymentFrequency>> {
    let mut results = Vec::with_capacity(requests.len());

    for request in requests {
        let source = sources
            .iter()
            .find(|s| s.platform() == request.platform)
            .ok_or_else(|| anyhow!("No build source for {}", request.platform))?;
        let result = engine
            .deployment_frequency(source.as_ref(), request)
            .await
            .with_context(|| {
                format!(
                    "{} {}/{} ({})",
                    request.platform, request.owner, request.project, request.pipeline_name
                )
            })?;
        results.push(result);
    }

    Ok(results)
}

impl WindowArgs {
    fn request(
        &self,
        platform: Platform,
        owner: &str,
        project: &str,
        branch: &str,
        pipeline_name: &str,
        pipeline_id: Option<&String>,
    ) -> DeploymentFrequencyRequest {
        DeploymentFrequencyRequest {
            platform,
            owner: owner.to_string(),
            project: project.to_string(),
            branch: branch.to_string(),
            pipeline_name: pipeline_name.to_string(),
            pipeline_id: pipeline_id.cloned(),
            number_of_days: self.days,
            max_number_of_items: self.max_items,
            use_cache: !self.no_cache,
            use_sample_data: self.sample,
        }
    }
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let engine = DeploymentFrequencyEngine::new(Duration::from_secs(self.cache_ttl_secs));

        let json_output = match &self.command {
            Commands::AzureDevops {
                token,
                url,
                organization,
                project,
                branch,
                build_name,
                build_id,
                window,
            } => {
                info!("Collecting deployment frequency for {organization}/{project}");
                let token = Token::from_optional(token.as_deref());
                let source = AzureDevOpsProvider::new(url, token, timeout)?;
                let request = window.request(
                    Platform::AzureDevOps,
                    organization,
                    project,
                    branch,
                    build_name,
                    build_id.as_ref(),
                );
                let result = engine.deployment_frequency(&source, &request).await?;
                self.to_json(&result)?
            }
            Commands::Github {
                token,
                api_url,
                owner,
                repo,
                branch,
                workflow_name,
                workflow_id,
                window,
            } => {
                info!("Collecting deployment frequency for {owner}/{repo}");
                let token = Token::from_optional(token.as_deref());
                let source = GitHubProvider::new(api_url, token, timeout)?;
                let request = window.request(
                    Platform::GitHub,
                    owner,
                    repo,
                    branch,
                    workflow_name,
                    workflow_id.as_ref(),
                );
                let result = engine.deployment_frequency(&source, &request).await?;
                self.to_json(&result)?
            }
            Commands::Batch {
                file,
                azure_devops_token,
                azure_devops_url,
                github_token,
                github_api_url,
            } => {
                let requests = read_batch(file)?;
                info!(
                    "Collecting deployment frequency for {} targets from {}",
                    requests.len(),
                    file.display()
                );
                let azure_devops: Box<dyn BuildSource> = Box::new(AzureDevOpsProvider::new(
                    azure_devops_url,
                    Token::from_optional(azure_devops_token.as_deref()),
                    timeout,
                )?);
                let github: Box<dyn BuildSource> = Box::new(GitHubProvider::new(
                    github_api_url,
                    Token::from_optional(github_token.as_deref()),
                    timeout,
                )?);
                let sources = vec![azure_devops, github];
                let results = run_batch(&engine, &sources, &requests).await?;
                self.to_json(&results)?
            }
        };

        // Write to output
        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Deployment frequency written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn to_json<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}
