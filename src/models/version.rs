//! Version record model matching the frontend WebsiteVersion interface.

use serde::{Deserialize, Serialize};

/// Platform a version was deployed on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeploymentPlatform {
    #[serde(rename = "Cloudflare Workers")]
    CloudflareWorkers,
    #[serde(rename = "Cloudflare Workers/Pages")]
    CloudflarePages,
    #[serde(rename = "Local Development")]
    LocalDevelopment,
}

impl DeploymentPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentPlatform::CloudflareWorkers => "Cloudflare Workers",
            DeploymentPlatform::CloudflarePages => "Cloudflare Workers/Pages",
            DeploymentPlatform::LocalDevelopment => "Local Development",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Cloudflare Workers" => Some(DeploymentPlatform::CloudflareWorkers),
            "Cloudflare Workers/Pages" => Some(DeploymentPlatform::CloudflarePages),
            "Local Development" => Some(DeploymentPlatform::LocalDevelopment),
            _ => None,
        }
    }
}

impl Default for DeploymentPlatform {
    fn default() -> Self {
        DeploymentPlatform::CloudflarePages
    }
}

/// Kind of change recorded in a changelog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Feat,
    Fix,
    Docs,
    Chore,
}

/// One changelog entry attached to a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    /// Wire field is `type`, matching the frontend contract.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub description: String,
    pub date: String,
}

/// Outbound links for a version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    /// Always non-empty after aggregation; the canonical website URL is
    /// substituted when the source omitted it.
    #[serde(default)]
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Free-form descriptive block attached to some versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeDetails {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub technical_details: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A commit referenced by a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub hash: String,
    pub message: String,
    pub date: String,
    pub author: String,
}

/// One deployment/release entry.
///
/// `deploymentDate` stays a string on the model; sources are not trusted
/// to emit strictly parseable timestamps, so dates are parsed only where
/// ordering requires it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: String,
    pub deployment_date: String,
    pub commit_hash: String,
    #[serde(default)]
    pub changelog: Vec<ChangelogEntry>,
    #[serde(default)]
    pub deployment_platform: DeploymentPlatform,
    #[serde(default)]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_details: Option<NativeDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_commits: Option<Vec<CommitRef>>,
}

impl VersionRecord {
    /// Dedup key: two records sharing `(version, deploymentDate)` describe
    /// the same release.
    pub fn dedup_key(&self) -> (String, String) {
        (self.version.clone(), self.deployment_date.clone())
    }
}

/// Partial record used to constrain an aggregation.
///
/// Every present field is an exact-match constraint; absent fields impose
/// no constraint. Nested links are matched key-by-key.
#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    pub version: Option<String>,
    pub deployment_date: Option<String>,
    pub commit_hash: Option<String>,
    pub deployment_platform: Option<DeploymentPlatform>,
    pub links: Option<LinksFilter>,
}

/// Link constraints of a [`VersionFilter`].
#[derive(Debug, Clone, Default)]
pub struct LinksFilter {
    pub website: Option<String>,
    pub repository: Option<String>,
}

impl VersionFilter {
    pub fn matches(&self, record: &VersionRecord) -> bool {
        if let Some(version) = &self.version {
            if record.version != *version {
                return false;
            }
        }
        if let Some(date) = &self.deployment_date {
            if record.deployment_date != *date {
                return false;
            }
        }
        if let Some(hash) = &self.commit_hash {
            if record.commit_hash != *hash {
                return false;
            }
        }
        if let Some(platform) = &self.deployment_platform {
            if record.deployment_platform != *platform {
                return false;
            }
        }
        if let Some(links) = &self.links {
            if let Some(website) = &links.website {
                if record.links.website != *website {
                    return false;
                }
            }
            if let Some(repository) = &links.repository {
                if record.links.repository.as_deref() != Some(repository.as_str()) {
                    return false;
                }
            }
        }
        true
    }
}
