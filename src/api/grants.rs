//! Grant API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::{default_limit, AppJson, AppPath, AppQuery, CreatedResponse, MessageResponse};
use crate::db::GrantFilter;
use crate::errors::AppError;
use crate::models::{CreateGrantRequest, Grant, GrantChanges, NewGrant, UpdateGrantRequest};
use crate::AppState;

/// Query parameters for listing grants.
#[derive(Debug, Deserialize)]
pub struct ListGrantsQuery {
    #[serde(default)]
    pub search: Option<String>,
    /// Tag id; an empty value means no tag filter
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl ListGrantsQuery {
    /// `None` when the tag value cannot name any tag, so no grant can match.
    fn into_filter(self) -> Option<GrantFilter> {
        let tag_id = match self.tag.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().ok()?),
        };

        Some(GrantFilter {
            search: self.search,
            tag_id,
            status: self.status,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// GET /api/grants - List grants with optional search, tag and status filters.
pub async fn list_grants(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListGrantsQuery>,
) -> Result<Json<Vec<Grant>>, AppError> {
    let Some(filter) = query.into_filter() else {
        return Ok(Json(Vec::new()));
    };
    let grants = state.repo.list_grants(&filter).await?;
    Ok(Json(grants))
}

/// GET /api/grants/:id - Get a single grant.
pub async fn get_grant(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Grant>, AppError> {
    Ok(Json(state.repo.get_grant(id).await?))
}

/// POST /api/grants - Create a new grant.
pub async fn create_grant(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateGrantRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let grant = NewGrant::try_from(request)?;
    let created = state.repo.create_grant(&grant).await?;

    tracing::info!("Created grant {} ({})", created.id, created.title);

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: created.id,
            message: "Grant created successfully".to_string(),
        }),
    ))
}

/// PUT /api/grants/:id - Update a grant. Only fields present in the body change.
pub async fn update_grant(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateGrantRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let changes = GrantChanges::try_from(request)?;
    state.repo.update_grant(id, &changes).await?;

    Ok(Json(MessageResponse::new("Grant updated successfully")))
}

/// DELETE /api/grants/:id - Delete a grant.
pub async fn delete_grant(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_grant(id).await?;

    tracing::info!("Deleted grant {}", id);
    Ok(Json(MessageResponse::new("Grant deleted successfully")))
}
