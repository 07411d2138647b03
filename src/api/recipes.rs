use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::Viewer,
    config::Config,
    db::{self, IngredientAmount, NewRecipe, RecipeChanges, RecipeFilter, RecipeId, RecipeList, TagId},
    error::{AppError, AppResult},
    utils::{image::ImageStore, pagination::PageParams},
};

#[derive(Debug, Deserialize)]
pub struct CreateRecipe {
    ingredients: Vec<IngredientAmount>,
    tags: Vec<TagId>,
    image: String,
    name: String,
    text: String,
    cooking_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecipe {
    ingredients: Option<Vec<IngredientAmount>>,
    tags: Option<Vec<TagId>>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i64>,
}

/// Query string of the recipe list. `tags` may repeat, so it is read as raw pairs.
#[derive(Debug, Default)]
struct RecipeQuery {
    page: PageParams,
    filter: RecipeFilter,
}

impl RecipeQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> AppResult<Self> {
        let mut query = RecipeQuery::default();

        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page.page = Some(parse_number(&key, &value)?),
                "limit" => query.page.limit = Some(parse_number(&key, &value)?),
                "author" => query.filter.author = Some(parse_number(&key, &value)?),
                "tags" => query.filter.tags.push(value),
                "is_favorited" => query.filter.is_favorited = is_truthy(&value),
                "is_in_shopping_cart" => query.filter.is_in_shopping_cart = is_truthy(&value),
                _ => {}
            }
        }

        Ok(query)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("{key} must be a number")))
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

// GET /api/recipes/
pub async fn get_recipes(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    viewer: Viewer,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<impl IntoResponse> {
    let query = RecipeQuery::from_pairs(pairs)?;
    let page = query.page.resolve(config.page_size);

    let recipes = db::list_recipes(&pool, &query.filter, page, viewer.user_id).await?;
    Ok(Json(recipes))
}

// GET /api/recipes/:id/
pub async fn get_recipe(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let recipe = db::retrieve_recipe(&pool, recipe_id, viewer.user_id).await?;
    Ok(Json(recipe))
}

// POST /api/recipes/
pub async fn create_recipe(
    State(pool): State<SqlitePool>,
    State(images): State<ImageStore>,
    viewer: Viewer,
    Json(payload): Json<CreateRecipe>,
) -> AppResult<impl IntoResponse> {
    let author_id = viewer.require_user()?;
    let image = images.save_data_uri(&payload.image).await?;

    let recipe = NewRecipe {
        name: payload.name,
        text: payload.text,
        image: image.clone(),
        cooking_time: payload.cooking_time,
        tags: payload.tags,
        ingredients: payload.ingredients,
    };

    let created = match db::create_recipe(&pool, author_id, recipe).await {
        Ok(created) => created,
        Err(err) => {
            images.remove(&image).await;
            return Err(err);
        }
    };

    let recipe = db::retrieve_recipe(&pool, created.id, Some(author_id)).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// PATCH /api/recipes/:id/
pub async fn update_recipe(
    State(pool): State<SqlitePool>,
    State(images): State<ImageStore>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
    Json(payload): Json<UpdateRecipe>,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    let previous = db::get_recipe(&pool, recipe_id).await?;
    viewer.require_author(previous.author_id)?;

    let image = match &payload.image {
        Some(data) => Some(images.save_data_uri(data).await?),
        None => None,
    };

    let changes = RecipeChanges {
        name: payload.name,
        text: payload.text,
        image: image.clone(),
        cooking_time: payload.cooking_time,
        tags: payload.tags,
        ingredients: payload.ingredients,
    };

    if let Err(err) = db::update_recipe(&pool, &viewer, recipe_id, changes).await {
        if let Some(image) = &image {
            images.remove(image).await;
        }
        return Err(err);
    }

    if image.is_some() {
        images.remove(&previous.image).await;
    }

    let recipe = db::retrieve_recipe(&pool, recipe_id, Some(user_id)).await?;
    Ok(Json(recipe))
}

// DELETE /api/recipes/:id/
pub async fn delete_recipe(
    State(pool): State<SqlitePool>,
    State(images): State<ImageStore>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    let recipe = db::delete_recipe(&pool, &viewer, recipe_id).await?;
    images.remove(&recipe.image).await;

    Ok(StatusCode::NO_CONTENT)
}

// ================================================= FAVORITES / CART ================================================= //

async fn add_to(
    pool: &SqlitePool,
    viewer: Viewer,
    list: RecipeList,
    recipe_id: RecipeId,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;
    let recipe = db::add_to_list(pool, list, user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_from(
    pool: &SqlitePool,
    viewer: Viewer,
    list: RecipeList,
    recipe_id: RecipeId,
) -> AppResult<StatusCode> {
    let user_id = viewer.require_user()?;
    db::remove_from_list(pool, list, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/recipes/:id/favorite/
pub async fn favorite_recipe(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    add_to(&pool, viewer, RecipeList::Favorites, recipe_id).await
}

// DELETE /api/recipes/:id/favorite/
pub async fn unfavorite_recipe(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    remove_from(&pool, viewer, RecipeList::Favorites, recipe_id).await
}

// POST /api/recipes/:id/shopping_cart/
pub async fn add_to_shopping_cart(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    add_to(&pool, viewer, RecipeList::ShoppingCart, recipe_id).await
}

// DELETE /api/recipes/:id/shopping_cart/
pub async fn remove_from_shopping_cart(
    State(pool): State<SqlitePool>,
    viewer: Viewer,
    Path(recipe_id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    remove_from(&pool, viewer, RecipeList::ShoppingCart, recipe_id).await
}

// GET /api/recipes/download_shopping_cart/
pub async fn download_shopping_cart(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    viewer: Viewer,
) -> AppResult<impl IntoResponse> {
    let user_id = viewer.require_user()?;

    let items = db::build_shopping_list(&pool, user_id).await?;
    let body = db::render_shopping_list(&items, &config.shopping_list);

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", config.shopping_list.filename),
        ),
    ];

    Ok((headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn repeated_tags_are_collected() {
        let query = RecipeQuery::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("author", "3"),
            ("page", "2"),
        ]))
        .unwrap();

        assert_eq!(query.filter.tags, vec!["breakfast", "lunch"]);
        assert!(query.filter.is_favorited);
        assert!(!query.filter.is_in_shopping_cart);
        assert_eq!(query.filter.author, Some(3));
        assert_eq!(query.page.page, Some(2));
    }

    #[test]
    fn non_numeric_author_is_rejected() {
        let err = RecipeQuery::from_pairs(pairs(&[("author", "bob")])).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
