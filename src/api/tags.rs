use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;

use crate::{
    auth::Viewer,
    db::{self, NewTag, TagId},
    error::AppResult,
};

// GET /api/tags/
pub async fn get_tags(State(pool): State<SqlitePool>) -> AppResult<impl IntoResponse> {
    let tags = db::list_tags(&pool).await?;
    Ok(Json(tags))
}

// GET /api/tags/:id/
pub async fn get_tag(
    State(pool): State<SqlitePool>,
    Path(tag_id): Path<TagId>,
) -> AppResult<impl IntoResponse> {
    let tag = db::get_tag(&pool, tag_id).await?;
    Ok(Json(tag))
}

// POST /api/tags/
pub async fn create_tag(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Json(tag): Json<NewTag>,
) -> AppResult<impl IntoResponse> {
    viewer.require_admin()?;

    let tag = db::create_tag(&pool, tag).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
