use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::server::AppState;
use crate::versioning::{MatchPolicy, RegistryError, SemanticVersion, VersionEntry};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub generation: u64,
    pub groups: usize,
    pub bindings: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionStatus {
    pub version: SemanticVersion,
    pub is_default: bool,
    pub is_latest: bool,
    pub deprecated: bool,
    pub sunset: bool,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub sunset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupStatus {
    pub group: String,
    pub policy: MatchPolicy,
    pub default: Option<SemanticVersion>,
    pub latest: Option<SemanticVersion>,
    pub versions: Vec<VersionStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteStatus {
    pub path: String,
    pub method: String,
    pub version: SemanticVersion,
    pub group: String,
}

/// Body of a deprecate call. Both fields are optional; `deprecated_at`
/// defaults to now.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeprecateRequest {
    #[serde(default)]
    pub deprecated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sunset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid version `{0}`")]
    InvalidVersion(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::InvalidVersion(_) | AdminError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AdminError::Registry(RegistryError::NoSuchGroup(_))
            | AdminError::Registry(RegistryError::UnknownVersion { .. }) => StatusCode::NOT_FOUND,
            AdminError::Registry(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let snapshot = state.dispatcher.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        generation: snapshot.generation(),
        groups: snapshot.registry().groups().count(),
        bindings: snapshot.routes().len(),
    })
}

fn version_status(entry: &VersionEntry, latest: Option<&SemanticVersion>, now: DateTime<Utc>) -> VersionStatus {
    VersionStatus {
        version: entry.version.clone(),
        is_default: entry.is_default,
        is_latest: latest == Some(&entry.version),
        deprecated: entry.is_deprecated(now),
        sunset: entry.is_sunset(now),
        deprecated_at: entry.deprecated_at,
        sunset_at: entry.sunset_at,
    }
}

pub async fn get_versions(State(state): State<AppState>) -> Json<Vec<GroupStatus>> {
    let snapshot = state.dispatcher.current();
    let registry = snapshot.registry();
    let now = Utc::now();

    let groups = registry
        .groups()
        .map(|group| {
            let latest = registry.latest(group);
            GroupStatus {
                group: group.to_string(),
                policy: registry.policy(group),
                default: registry.default(group).cloned(),
                latest: latest.cloned(),
                versions: registry
                    .entries(group)
                    .map(|entry| version_status(entry, latest, now))
                    .collect(),
            }
        })
        .collect();
    Json(groups)
}

pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteStatus>> {
    let snapshot = state.dispatcher.current();
    Json(
        snapshot
            .routes()
            .bindings()
            .map(|binding| RouteStatus {
                path: binding.pattern().to_string(),
                method: binding.method().to_string(),
                version: binding.version().clone(),
                group: binding.group().to_string(),
            })
            .collect(),
    )
}

fn parse_version(raw: &str) -> Result<SemanticVersion, AdminError> {
    SemanticVersion::parse(raw).map_err(|_| AdminError::InvalidVersion(raw.to_string()))
}

pub async fn deprecate_version(
    State(state): State<AppState>,
    Path((group, version)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<VersionStatus>, AdminError> {
    let version = parse_version(&version)?;
    let request: DeprecateRequest = if body.is_empty() {
        DeprecateRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AdminError::InvalidBody(e.to_string()))?
    };
    let now = Utc::now();
    let deprecated_at = request.deprecated_at.unwrap_or(now);

    let snapshot = state.dispatcher.update(|current| {
        let registry =
            current
                .registry()
                .deprecate(&group, &version, deprecated_at, request.sunset_at)?;
        Ok::<_, AdminError>(current.with_registry(registry))
    })?;

    tracing::info!(
        group = %group,
        version = %version,
        deprecated_at = %deprecated_at,
        sunset_at = ?request.sunset_at,
        generation = snapshot.generation(),
        "Version deprecated via admin API"
    );
    entry_status(&snapshot, &group, &version, now)
}

pub async fn undeprecate_version(
    State(state): State<AppState>,
    Path((group, version)): Path<(String, String)>,
) -> Result<Json<VersionStatus>, AdminError> {
    let version = parse_version(&version)?;
    let snapshot = state.dispatcher.update(|current| {
        let registry = current.registry().undeprecate(&group, &version)?;
        Ok::<_, AdminError>(current.with_registry(registry))
    })?;

    tracing::info!(
        group = %group,
        version = %version,
        generation = snapshot.generation(),
        "Version deprecation cleared via admin API"
    );
    entry_status(&snapshot, &group, &version, Utc::now())
}

fn entry_status(
    snapshot: &crate::dispatch::ServiceSnapshot,
    group: &str,
    version: &SemanticVersion,
    now: DateTime<Utc>,
) -> Result<Json<VersionStatus>, AdminError> {
    let registry = snapshot.registry();
    let entry = registry
        .entry(group, version)
        .ok_or_else(|| RegistryError::UnknownVersion {
            group: group.to_string(),
            version: version.clone(),
        })?;
    Ok(Json(version_status(entry, registry.latest(group), now)))
}
