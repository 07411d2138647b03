use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use validator::Validate;

use crate::error::{AppError, AppResult};

pub type IngredientId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewIngredient {
    #[validate(length(min = 1, max = 100, message = "ingredient name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "measurement unit can't be blank"))]
    pub measurement_unit: String,
}

/// Case-insensitive prefix match on the name.
pub async fn list_ingredients(
    pool: &SqlitePool,
    name_prefix: Option<&str>,
) -> AppResult<Vec<Ingredient>> {
    let ingredients = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    let Some(prefix) = name_prefix.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(ingredients);
    };

    // sqlite's LIKE only folds ASCII, the catalogue is not ASCII-only
    let prefix = prefix.to_lowercase();
    Ok(ingredients
        .into_iter()
        .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
        .collect())
}

pub async fn get_ingredient(pool: &SqlitePool, ingredient_id: IngredientId) -> AppResult<Ingredient> {
    sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?",
    )
    .bind(ingredient_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Ingredient"))
}

pub async fn create_ingredient(pool: &SqlitePool, ingredient: NewIngredient) -> AppResult<Ingredient> {
    ingredient.validate()?;

    let mut conn = pool.acquire().await?;
    let created = insert_ingredient(&mut conn, &ingredient).await?;

    tracing::info!(ingredient_id = created.id, name = %created.name, "ingredient created");
    Ok(created)
}

async fn insert_ingredient(
    conn: &mut SqliteConnection,
    ingredient: &NewIngredient,
) -> AppResult<Ingredient> {
    Ok(sqlx::query_as::<_, Ingredient>(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES (?, ?)
        RETURNING id, name, measurement_unit
        ",
    )
    .bind(&ingredient.name)
    .bind(&ingredient.measurement_unit)
    .fetch_one(conn)
    .await?)
}

/// Seeds the catalogue from a JSON array of `{ name, measurement_unit }`.
/// Does nothing when ingredients already exist. Returns the number inserted.
pub async fn load_ingredients(pool: &SqlitePool, path: &Path) -> AppResult<usize> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ingredients")
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        tracing::info!(existing, "ingredients already loaded, skipping fixture");
        return Ok(0);
    }

    let raw = tokio::fs::read(path).await?;
    let ingredients: Vec<NewIngredient> = serde_json::from_slice(&raw)
        .map_err(|err| AppError::validation(format!("invalid ingredient fixture: {err}")))?;

    let mut tx = pool.begin().await?;
    for ingredient in &ingredients {
        insert_ingredient(&mut tx, ingredient).await?;
    }
    tx.commit().await?;

    tracing::info!(count = ingredients.len(), path = %path.display(), "ingredients loaded");
    Ok(ingredients.len())
}
