use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::Token;
use crate::error::Result;
use crate::providers::http;

const API_VERSION: &str = "7.1";
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

pub struct AzureDevOpsClient {
    client: Client,
    base_url: Url,
    token: Option<Token>,
}

#[derive(Debug, Deserialize)]
pub struct BuildListDto {
    #[serde(default)]
    pub value: Vec<BuildDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDto {
    pub id: u64,
    pub build_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub source_branch: String,
    pub queue_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub definition: Option<DefinitionDto>,
    #[serde(rename = "_links")]
    pub links: Option<LinksDto>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DefinitionDto {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LinksDto {
    pub web: Option<LinkDto>,
}

#[derive(Debug, Deserialize)]
pub struct LinkDto {
    pub href: String,
}

/// One page of builds and the token for the next one, if any.
pub struct BuildPage {
    pub builds: Vec<BuildDto>,
    pub continuation_token: Option<String>,
}

impl AzureDevOpsClient {
    pub fn new(base_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: http::parse_base_url(base_url)?,
            token,
        })
    }

    /// PATs go in basic auth with an empty user name
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.basic_auth("", Some(token.as_str()))
        } else {
            request
        }
    }

    pub async fn fetch_build_page(
        &self,
        organization: &str,
        project: &str,
        branch: &str,
        definition_id: Option<&str>,
        top: usize,
        continuation_token: Option<&str>,
    ) -> Result<BuildPage> {
        let url = http::join_segments(
            &self.base_url,
            &[organization, project, "_apis", "build", "builds"],
        )?;

        let top = top.to_string();
        let mut request = self.client.get(url).query(&[
            ("api-version", API_VERSION),
            ("$top", top.as_str()),
            ("queryOrder", "startTimeDescending"),
        ]);
        if !branch.is_empty() {
            request = request.query(&[("branchName", branch)]);
        }
        if let Some(id) = definition_id {
            request = request.query(&[("definitions", id)]);
        }
        if let Some(token) = continuation_token {
            request = request.query(&[("continuationToken", token)]);
        }
        request = self.auth_request(request);

        let response = http::check_status(request.send().await?).await?;
        let continuation_token = response
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let list = response.json::<BuildListDto>().await?;

        Ok(BuildPage {
            builds: list.value,
            continuation_token,
        })
    }
}
