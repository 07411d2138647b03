use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    auth::Viewer,
    config::Config,
    db::{self, UserId},
    error::AppResult,
    utils::pagination::PageParams,
};

#[derive(Debug, Deserialize, Validate)]
pub struct SetPassword {
    current_password: String,
    #[validate(length(min = 8, max = 64, message = "password must be 8 to 64 characters"))]
    new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    recipes_limit: Option<u32>,
}

// GET /api/users/
pub async fn get_users(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    viewer: Viewer,
    Query(params): Query<PageParams>,
) -> AppResult<impl IntoResponse> {
    let page = params.resolve(config.page_size);
    let users = db::list_users(&pool, viewer.user_id, page).await?;
    Ok(Json(users))
}

// GET /api/users/:id/
pub async fn get_user(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(user_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let profile = db::get_user_profile(&pool, user_id, viewer.user_id).await?;
    Ok(Json(profile))
}

// GET /api/users/me/
pub async fn get_current_user(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    let profile = db::get_user_profile(&pool, user_id, Some(user_id)).await?;
    Ok(Json(profile))
}

// POST /api/users/set_password/
pub async fn set_password(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Json(payload): Json<SetPassword>,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    payload.validate()?;

    db::set_password(&pool, user_id, &payload.current_password, &payload.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/users/subscriptions/
pub async fn get_subscriptions(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    viewer: Viewer,
    Query(params): Query<SubscriptionsQuery>,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(config.page_size);

    let subscriptions = db::subscriptions(&pool, user_id, page, params.recipes_limit).await?;
    Ok(Json(subscriptions))
}

// POST /api/users/:id/subscribe/
pub async fn subscribe(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(author_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    let subscription = db::follow(&pool, user_id, author_id).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

// DELETE /api/users/:id/subscribe/
pub async fn unsubscribe(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(author_id): Path<UserId>,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    db::unfollow(&pool, user_id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
