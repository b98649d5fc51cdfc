//! Remote version sources.
//!
//! Each source wraps one upstream endpoint and maps its payload into
//! [`VersionRecord`]s. Failures come back as [`SourceError`]; the
//! aggregator decides how to absorb them.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::{
    ChangeKind, ChangelogEntry, DeploymentPlatform, Links, NativeDetails, VersionRecord,
};

/// Failure classes for a single source read.
#[derive(Debug)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout)
    Transport(reqwest::Error),
    /// Upstream answered with a non-success status
    Status(StatusCode),
    /// Upstream answered with a non-JSON content type
    ContentType(String),
    /// Body did not decode into the expected shape
    Decode(reqwest::Error),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Transport(err) => write!(f, "transport error: {}", err),
            SourceError::Status(status) => write!(f, "unexpected status: {}", status),
            SourceError::ContentType(ct) => write!(f, "non-JSON content type: {}", ct),
            SourceError::Decode(err) => write!(f, "decode error: {}", err),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err)
    }
}

/// A remote endpoint that can produce version records.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Fetch all records this source currently knows about.
    async fn fetch(&self) -> Result<Vec<VersionRecord>, SourceError>;
}

/// A plain endpoint returning a bare JSON array of version records.
pub struct JsonEndpointSource {
    name: String,
    client: reqwest::Client,
    url: String,
}

impl JsonEndpointSource {
    pub fn new(name: impl Into<String>, client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl VersionSource for JsonEndpointSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<VersionRecord>, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            return Err(SourceError::ContentType(content_type));
        }

        response
            .json::<Vec<VersionRecord>>()
            .await
            .map_err(SourceError::Decode)
    }
}

/// Settings for the Pages deployments API source.
#[derive(Debug, Clone)]
pub struct DeploymentsApiSettings {
    pub api_base: String,
    pub account_id: String,
    pub api_token: String,
    pub project_name: String,
}

/// Source backed by the Cloudflare Pages deployments API.
///
/// The deployments endpoint speaks a different dialect than the version
/// endpoints: records arrive inside a `{result: [...]}` envelope and have
/// to be mapped field-by-field into version records.
pub struct PagesDeploymentsSource {
    client: reqwest::Client,
    settings: DeploymentsApiSettings,
}

impl PagesDeploymentsSource {
    pub fn new(client: reqwest::Client, settings: DeploymentsApiSettings) -> Self {
        Self { client, settings }
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentsEnvelope {
    #[serde(default)]
    result: Vec<PagesDeployment>,
}

#[derive(Debug, Deserialize)]
struct PagesDeployment {
    id: String,
    short_id: String,
    created_on: String,
    url: String,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    deployment_trigger: Option<DeploymentTrigger>,
    #[serde(default)]
    build_config: Option<BuildConfig>,
    #[serde(default)]
    source: Option<DeploymentSource>,
}

#[derive(Debug, Deserialize)]
struct DeploymentTrigger {
    #[serde(default)]
    metadata: Option<TriggerMetadata>,
}

#[derive(Debug, Deserialize)]
struct TriggerMetadata {
    #[serde(default)]
    commit_message: Option<String>,
    #[serde(default)]
    commit_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildConfig {
    #[serde(default)]
    build_command: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentSource {
    #[serde(default)]
    config: Option<DeploymentSourceConfig>,
}

#[derive(Debug, Deserialize)]
struct DeploymentSourceConfig {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    repo_name: Option<String>,
}

impl PagesDeployment {
    fn into_record(self) -> VersionRecord {
        let metadata = self.deployment_trigger.and_then(|t| t.metadata);
        let commit_message = metadata
            .as_ref()
            .and_then(|m| m.commit_message.clone())
            .unwrap_or_else(|| "Deployment".to_string());
        let commit_hash = metadata.and_then(|m| m.commit_hash);
        let repository = self
            .source
            .and_then(|s| s.config)
            .and_then(|c| match (c.owner, c.repo_name) {
                (Some(owner), Some(repo)) => Some(format!("https://github.com/{}/{}", owner, repo)),
                _ => None,
            });
        let build_command = self
            .build_config
            .and_then(|b| b.build_command)
            .unwrap_or_else(|| "n/a".to_string());

        VersionRecord {
            version: self.short_id.clone(),
            deployment_date: self.created_on.clone(),
            commit_hash: self.id,
            changelog: vec![ChangelogEntry {
                kind: ChangeKind::Chore,
                description: commit_message,
                date: self.created_on,
            }],
            deployment_platform: DeploymentPlatform::CloudflarePages,
            links: Links {
                website: self.url,
                repository,
            },
            native_details: Some(NativeDetails {
                title: format!("Cloudflare Pages deployment {}", self.short_id),
                description: format!(
                    "Commit: {}",
                    commit_hash.as_deref().unwrap_or("unknown")
                ),
                technical_details: vec![
                    format!(
                        "Environment: {}",
                        self.environment.as_deref().unwrap_or("unknown")
                    ),
                    format!("Build command: {}", build_command),
                ],
                challenges: Vec::new(),
                learnings: Vec::new(),
                image_url: None,
            }),
            original_commits: None,
        }
    }
}

#[async_trait]
impl VersionSource for PagesDeploymentsSource {
    fn name(&self) -> &str {
        "pages-deployments"
    }

    async fn fetch(&self) -> Result<Vec<VersionRecord>, SourceError> {
        let url = format!(
            "{}/accounts/{}/pages/projects/{}/deployments",
            self.settings.api_base, self.settings.account_id, self.settings.project_name
        );

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.settings.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status));
        }

        let envelope = response
            .json::<DeploymentsEnvelope>()
            .await
            .map_err(SourceError::Decode)?;

        Ok(envelope
            .result
            .into_iter()
            .map(PagesDeployment::into_record)
            .collect())
    }
}
