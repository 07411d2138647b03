use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::Viewer,
    db::{self, IngredientId, NewIngredient},
    error::AppResult,
};

#[derive(Debug, Deserialize)]
pub struct IngredientsQuery {
    #[serde(default)]
    name: Option<String>,
}

// GET /api/ingredients/?name=<prefix>
pub async fn get_ingredients(
    State(pool): State<SqlitePool>,
    Query(params): Query<IngredientsQuery>,
) -> AppResult<impl IntoResponse> {
    let ingredients = db::list_ingredients(&pool, params.name.as_deref()).await?;
    Ok(Json(ingredients))
}

// GET /api/ingredients/:id/
pub async fn get_ingredient(
    State(pool): State<SqlitePool>,
    Path(ingredient_id): Path<IngredientId>,
) -> AppResult<impl IntoResponse> {
    let ingredient = db::get_ingredient(&pool, ingredient_id).await?;
    Ok(Json(ingredient))
}

// POST /api/ingredients/
pub async fn create_ingredient(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Json(ingredient): Json<NewIngredient>,
) -> AppResult<impl IntoResponse> {
    viewer.require_admin()?;

    let ingredient = db::create_ingredient(&pool, ingredient).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}
