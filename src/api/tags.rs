//! Tag API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::{default_limit, AppJson, AppPath, AppQuery, CreatedResponse, MessageResponse};
use crate::errors::AppError;
use crate::models::{CreateTagRequest, Grant, NewTag, Tag, TagChanges, UpdateTagRequest};
use crate::AppState;

/// Pagination parameters for grants of a tag.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/tags - List all tags.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.repo.list_tags().await?))
}

/// GET /api/tags/:id - Get a single tag.
pub async fn get_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(state.repo.get_tag(id).await?))
}

/// POST /api/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let tag = NewTag::try_from(request)?;
    let created = state.repo.create_tag(&tag).await?;

    tracing::info!("Created tag {} ({})", created.id, created.name);

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: created.id,
            message: "Tag created successfully".to_string(),
        }),
    ))
}

/// PUT /api/tags/:id - Update a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<UpdateTagRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let changes = TagChanges::try_from(request)?;
    state.repo.update_tag(id, &changes).await?;

    Ok(Json(MessageResponse::new("Tag updated successfully")))
}

/// DELETE /api/tags/:id - Delete a tag. Grants that carried it are kept.
pub async fn delete_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_tag(id).await?;

    tracing::info!("Deleted tag {}", id);
    Ok(Json(MessageResponse::new("Tag deleted successfully")))
}

/// GET /api/tags/:id/grants - Grants carrying a tag, paginated.
pub async fn list_grants_by_tag(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppQuery(page): AppQuery<PageQuery>,
) -> Result<Json<Vec<Grant>>, AppError> {
    let grants = state
        .repo
        .list_grants_by_tag(id, page.limit, page.offset)
        .await?;
    Ok(Json(grants))
}
