use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use url::Url;

use crate::error::{DeployFreqError, Result};

const USER_AGENT: &str = concat!("deployfreq/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| DeployFreqError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Parse a base URL so that relative joins append to its path.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).map_err(|e| DeployFreqError::Config(format!("Invalid base URL: {e}")))
}

pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let path = segments
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    base.join(&path)
        .map_err(|e| DeployFreqError::Config(format!("Invalid request URL: {e}")))
}

/// Classify a non-success response into the error taxonomy.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let throttled = is_throttled(&response);
    let body = response.text().await.unwrap_or_default();
    let message = format!("{status} - {body}");

    if throttled {
        Err(DeployFreqError::UpstreamRateLimited(message))
    } else if status.is_server_error() {
        Err(DeployFreqError::UpstreamUnavailable(message))
    } else {
        Err(DeployFreqError::UpstreamBadResponse(message))
    }
}

fn is_throttled(response: &Response) -> bool {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0"),
        _ => false,
    }
}
