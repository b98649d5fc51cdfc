//! Version aggregation.
//!
//! Fans out one read per configured source, joins on all of them, and
//! reduces the combined batches into a deduplicated, date-descending list.
//! A failed source contributes an empty batch; a fully dark upstream
//! degrades to a synthesized record, so callers always receive data.

mod sources;

pub use sources::*;

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::models::{
    ChangeKind, ChangelogEntry, DeploymentPlatform, Links, NativeDetails, VersionFilter,
    VersionRecord,
};

/// Sentinel commit hash carried by the fallback record.
pub const FALLBACK_COMMIT: &str = "fallback-version";

/// Commit hash substituted into a placeholder when the filter did not pin one.
const PLACEHOLDER_COMMIT: &str = "custom-version";

/// Canonical link values injected into records whose source omitted them.
#[derive(Debug, Clone)]
pub struct LinkDefaults {
    pub website: String,
    pub repository: Option<String>,
}

/// How an aggregation result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    /// At least one record came from a real source.
    Live,
    /// Every source was empty or unavailable and no filter was given; the
    /// hard-coded fallback record was substituted.
    Fallback,
    /// A filter was supplied and matched nothing; a placeholder was
    /// synthesized from the filter fields.
    Placeholder,
}

/// The outcome of one aggregation pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Date-descending list; never empty.
    pub records: Vec<VersionRecord>,
    pub kind: AggregationKind,
}

/// Aggregates version records from all configured sources.
///
/// Holds no state between calls; every aggregation starts from fresh
/// source reads.
pub struct VersionAggregator {
    sources: Vec<Arc<dyn VersionSource>>,
    defaults: LinkDefaults,
}

impl VersionAggregator {
    pub fn new(sources: Vec<Arc<dyn VersionSource>>, defaults: LinkDefaults) -> Self {
        Self { sources, defaults }
    }

    /// Fetch, merge, and order records from every configured source.
    ///
    /// Never fails: an unavailable source is treated as empty, and an
    /// empty merge result is replaced by a synthesized record (see
    /// [`AggregationKind`]).
    pub async fn fetch_versions(&self, filter: Option<&VersionFilter>) -> Aggregation {
        let batches = join_all(self.sources.iter().map(|source| async move {
            match source.fetch().await {
                Ok(records) => {
                    tracing::debug!(
                        source = source.name(),
                        count = records.len(),
                        "source batch received"
                    );
                    records
                }
                Err(err) => {
                    tracing::warn!(
                        source = source.name(),
                        error = %err,
                        "source unavailable, treating as empty"
                    );
                    Vec::new()
                }
            }
        }))
        .await;

        // First-seen wins across the concatenated batches.
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for record in batches.into_iter().flatten() {
            if seen.insert(record.dedup_key()) {
                merged.push(self.with_link_defaults(record));
            }
        }

        let (mut records, kind) = match filter {
            Some(filter) => {
                let matched: Vec<VersionRecord> =
                    merged.into_iter().filter(|r| filter.matches(r)).collect();
                if matched.is_empty() {
                    (vec![self.placeholder(filter)], AggregationKind::Placeholder)
                } else {
                    (matched, AggregationKind::Live)
                }
            }
            None if merged.is_empty() => (vec![self.fallback()], AggregationKind::Fallback),
            None => (merged, AggregationKind::Live),
        };

        // Stable sort keeps first-seen order for equal dates.
        records.sort_by_key(|r| Reverse(parse_deployment_date(&r.deployment_date)));

        Aggregation { records, kind }
    }

    fn with_link_defaults(&self, mut record: VersionRecord) -> VersionRecord {
        if record.links.website.is_empty() {
            record.links.website = self.defaults.website.clone();
        }
        if record.links.repository.is_none() {
            record.links.repository = self.defaults.repository.clone();
        }
        record
    }

    /// Well-formed stand-in for a filter that matched nothing.
    fn placeholder(&self, filter: &VersionFilter) -> VersionRecord {
        let now = Utc::now().to_rfc3339();
        let links = filter.links.as_ref();

        VersionRecord {
            version: filter
                .version
                .clone()
                .unwrap_or_else(|| "0.0.1".to_string()),
            deployment_date: filter.deployment_date.clone().unwrap_or(now),
            commit_hash: filter
                .commit_hash
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_COMMIT.to_string()),
            changelog: Vec::new(),
            deployment_platform: filter
                .deployment_platform
                .clone()
                .unwrap_or(DeploymentPlatform::CloudflarePages),
            links: Links {
                website: links
                    .and_then(|l| l.website.clone())
                    .unwrap_or_else(|| self.defaults.website.clone()),
                repository: links
                    .and_then(|l| l.repository.clone())
                    .or_else(|| self.defaults.repository.clone()),
            },
            native_details: None,
            original_commits: None,
        }
    }

    /// Hard-coded record describing the local/fallback deployment state.
    fn fallback(&self) -> VersionRecord {
        let now = Utc::now().to_rfc3339();

        VersionRecord {
            version: "0.0.1".to_string(),
            deployment_date: now.clone(),
            commit_hash: FALLBACK_COMMIT.to_string(),
            changelog: vec![ChangelogEntry {
                kind: ChangeKind::Chore,
                description: "Fallback version, no upstream source was reachable".to_string(),
                date: now,
            }],
            deployment_platform: DeploymentPlatform::LocalDevelopment,
            links: Links {
                website: self.defaults.website.clone(),
                repository: self.defaults.repository.clone(),
            },
            native_details: Some(NativeDetails {
                title: "Fallback version".to_string(),
                description: "Unable to fetch versions from any configured source".to_string(),
                technical_details: vec!["Versions API not accessible".to_string()],
                challenges: vec!["Network connectivity issue".to_string()],
                learnings: vec!["Implementing fallback mechanisms".to_string()],
                image_url: None,
            }),
            original_commits: None,
        }
    }
}

/// Parse for ordering only; records keep the raw string they arrived with.
/// Unparseable dates sort after everything else.
fn parse_deployment_date(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
