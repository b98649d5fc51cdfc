//! Version API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::aggregator::AggregationKind;
use crate::errors::AppError;
use crate::models::{DeploymentPlatform, LinksFilter, VersionFilter, VersionRecord};
use crate::AppState;

/// Query parameters accepted by the version list route.
#[derive(Debug, Default, Deserialize)]
pub struct VersionsQuery {
    /// Exact-match on the record version.
    pub version: Option<String>,
    /// Exact-match on links.website.
    pub website: Option<String>,
    /// Exact-match on the deployment platform label.
    pub platform: Option<String>,
}

impl VersionsQuery {
    /// Build the aggregation filter; `None` when no parameter was given.
    fn into_filter(self) -> Result<Option<VersionFilter>, AppError> {
        if self.version.is_none() && self.website.is_none() && self.platform.is_none() {
            return Ok(None);
        }

        let deployment_platform = match self.platform {
            Some(raw) => Some(DeploymentPlatform::from_str(&raw).ok_or_else(|| {
                AppError::Validation(format!("Unknown deployment platform: {}", raw))
            })?),
            None => None,
        };

        Ok(Some(VersionFilter {
            version: self.version,
            deployment_platform,
            links: self.website.map(|website| LinksFilter {
                website: Some(website),
                repository: None,
            }),
            ..Default::default()
        }))
    }
}

/// GET /api/versions - List aggregated deployment versions, newest first.
pub async fn list_versions(
    State(state): State<AppState>,
    Query(params): Query<VersionsQuery>,
) -> Result<Json<Vec<VersionRecord>>, AppError> {
    let filter = params.into_filter()?;
    let aggregation = state.aggregator.fetch_versions(filter.as_ref()).await;

    tracing::debug!(
        count = aggregation.records.len(),
        kind = ?aggregation.kind,
        "returning versions"
    );

    Ok(Json(aggregation.records))
}

/// GET /api/versions/:version - Get the newest record for one version.
pub async fn get_version(
    State(state): State<AppState>,
    Path(version): Path<String>,
) -> Result<Json<VersionRecord>, AppError> {
    let filter = VersionFilter {
        version: Some(version.clone()),
        ..Default::default()
    };
    let aggregation = state.aggregator.fetch_versions(Some(&filter)).await;

    // A placeholder means the exact-version search found nothing real.
    if aggregation.kind == AggregationKind::Placeholder {
        return Err(AppError::NotFound(format!("Version {} not found", version)));
    }

    aggregation
        .records
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Version {} not found", version)))
}
