use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    auth::Viewer,
    error::{AppError, AppResult},
    utils::pagination::{Page, PageRequest},
};

use super::{get_user_profile, tags_for_recipe, IngredientId, Tag, TagId, UserId, UserProfile};

pub type RecipeId = i64;

const MAX_NAME_LEN: usize = 200;
pub const MAX_AMOUNT: i64 = 32_000;
pub const MAX_COOKING_TIME: i64 = 32_000;
const RECIPE_COLUMNS: &str = "id, author_id, name, text, image, cooking_time, created_at";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: IngredientId,
    pub amount: i64,
}

/// A recipe with its full tag set and ingredient list, written as one unit.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i64,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Partial update. A supplied `tags` or `ingredients` list replaces the old one entirely.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: RecipeId,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

// ================== VALIDATION ================== //

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("recipe name can't be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "recipe name can't be longer than {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation("recipe text can't be blank"));
    }
    Ok(())
}

fn validate_cooking_time(cooking_time: i64) -> AppResult<()> {
    if cooking_time < 1 {
        return Err(AppError::validation("cooking time must be at least 1 minute"));
    }
    if cooking_time > MAX_COOKING_TIME {
        return Err(AppError::validation(format!(
            "cooking time can't be more than {MAX_COOKING_TIME} minutes"
        )));
    }
    Ok(())
}

fn validate_ingredients(ingredients: &[IngredientAmount]) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::validation("a recipe needs at least one ingredient"));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            return Err(AppError::validation(format!(
                "ingredient {} is listed more than once",
                ingredient.id
            )));
        }
        if ingredient.amount <= 0 {
            return Err(AppError::validation(format!(
                "amount of ingredient {} must be greater than 0",
                ingredient.id
            )));
        }
        if ingredient.amount > MAX_AMOUNT {
            return Err(AppError::validation(format!(
                "amount of ingredient {} can't be more than {MAX_AMOUNT}",
                ingredient.id
            )));
        }
    }
    Ok(())
}

/// Tags are a set: repeats collapse into one link.
fn normalize_tags(tags: &[TagId]) -> AppResult<Vec<TagId>> {
    if tags.is_empty() {
        return Err(AppError::validation("a recipe needs at least one tag"));
    }
    Ok(tags.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
}

fn validate_changes(changes: &RecipeChanges) -> AppResult<Option<Vec<TagId>>> {
    if let Some(name) = &changes.name {
        validate_name(name)?;
    }
    if let Some(text) = &changes.text {
        validate_text(text)?;
    }
    if let Some(cooking_time) = changes.cooking_time {
        validate_cooking_time(cooking_time)?;
    }
    if let Some(ingredients) = &changes.ingredients {
        validate_ingredients(ingredients)?;
    }
    changes.tags.as_deref().map(normalize_tags).transpose()
}

/// Fails with not-found when any of the (distinct) ids is missing from `table`.
async fn ensure_ids_exist(
    conn: &mut SqliteConnection,
    table: &'static str,
    ids: &[i64],
    what: &'static str,
) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {table} WHERE id IN ("));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found = query.build_query_scalar::<i64>().fetch_one(conn).await?;
    if found != ids.len() as i64 {
        return Err(AppError::not_found(what));
    }
    Ok(())
}

fn ingredient_ids(ingredients: &[IngredientAmount]) -> Vec<IngredientId> {
    ingredients.iter().map(|ingredient| ingredient.id).collect()
}

// ================== WRITES ================== //

pub async fn create_recipe(
    pool: &SqlitePool,
    author_id: UserId,
    recipe: NewRecipe,
) -> AppResult<Recipe> {
    validate_name(&recipe.name)?;
    validate_text(&recipe.text)?;
    validate_cooking_time(recipe.cooking_time)?;
    validate_ingredients(&recipe.ingredients)?;
    let tags = normalize_tags(&recipe.tags)?;

    let mut tx = pool.begin().await?;

    ensure_ids_exist(
        &mut tx,
        "ingredients",
        &ingredient_ids(&recipe.ingredients),
        "Ingredient",
    )
    .await?;
    ensure_ids_exist(&mut tx, "tags", &tags, "Tag").await?;

    let created = sqlx::query_as::<_, Recipe>(&format!(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {RECIPE_COLUMNS}
        "
    ))
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    replace_ingredients(&mut tx, created.id, &recipe.ingredients).await?;
    replace_tags(&mut tx, created.id, &tags).await?;

    tx.commit().await?;

    tracing::info!(
        recipe_id = created.id,
        author_id,
        ingredients = recipe.ingredients.len(),
        tags = tags.len(),
        "recipe created"
    );
    Ok(created)
}

pub async fn update_recipe(
    pool: &SqlitePool,
    viewer: &Viewer,
    recipe_id: RecipeId,
    changes: RecipeChanges,
) -> AppResult<Recipe> {
    let mut tx = pool.begin().await?;

    let recipe = fetch_recipe(&mut tx, recipe_id).await?;
    viewer.require_author(recipe.author_id)?;

    let tags = validate_changes(&changes)?;
    if let Some(ingredients) = &changes.ingredients {
        ensure_ids_exist(&mut tx, "ingredients", &ingredient_ids(ingredients), "Ingredient")
            .await?;
    }
    if let Some(tags) = &tags {
        ensure_ids_exist(&mut tx, "tags", tags, "Tag").await?;
    }

    let updated = sqlx::query_as::<_, Recipe>(&format!(
        "
        UPDATE recipes
        SET name = COALESCE(?, name),
            text = COALESCE(?, text),
            image = COALESCE(?, image),
            cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
        RETURNING {RECIPE_COLUMNS}
        "
    ))
    .bind(changes.name)
    .bind(changes.text)
    .bind(changes.image)
    .bind(changes.cooking_time)
    .bind(recipe.id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(ingredients) = &changes.ingredients {
        replace_ingredients(&mut tx, recipe.id, ingredients).await?;
    }
    if let Some(tags) = &tags {
        replace_tags(&mut tx, recipe.id, tags).await?;
    }

    tx.commit().await?;

    tracing::info!(recipe_id, "recipe updated");
    Ok(updated)
}

/// Removes the recipe; links, favorites and cart entries go with it.
pub async fn delete_recipe(
    pool: &SqlitePool,
    viewer: &Viewer,
    recipe_id: RecipeId,
) -> AppResult<Recipe> {
    let mut tx = pool.begin().await?;

    let recipe = fetch_recipe(&mut tx, recipe_id).await?;
    viewer.require_author(recipe.author_id)?;

    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(recipe_id, "recipe deleted");
    Ok(recipe)
}

async fn replace_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    ingredients: &[IngredientAmount],
) -> AppResult<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}

async fn replace_tags(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    tags: &[TagId],
) -> AppResult<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });
    query.build().execute(&mut *conn).await?;

    Ok(())
}

// ================== READS ================== //

async fn fetch_recipe(conn: &mut SqliteConnection, recipe_id: RecipeId) -> AppResult<Recipe> {
    sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?"
    ))
    .bind(recipe_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("Recipe"))
}

pub async fn get_recipe(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<Recipe> {
    let mut conn = pool.acquire().await?;
    fetch_recipe(&mut conn, recipe_id).await
}

pub async fn retrieve_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
    viewer_id: Option<UserId>,
) -> AppResult<RecipeDetail> {
    let recipe = get_recipe(pool, recipe_id).await?;
    recipe_detail(pool, recipe, viewer_id).await
}

pub async fn list_recipes(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    page: PageRequest,
    viewer_id: Option<UserId>,
) -> AppResult<Page<RecipeDetail>> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count, filter, viewer_id);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at FROM recipes r",
    );
    push_filters(&mut query, filter, viewer_id);
    query
        .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let recipes = query.build_query_as::<Recipe>().fetch_all(pool).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(recipe_detail(pool, recipe, viewer_id).await?);
    }

    Ok(Page::new(results, total, page))
}

/// `is_favorited` and `is_in_shopping_cart` only apply to signed-in viewers.
fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &RecipeFilter, viewer_id: Option<UserId>) {
    query.push(" WHERE 1 = 1");

    if let Some(author_id) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author_id);
    }

    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.clone());
        }
        separated.push_unseparated("))");
    }

    let Some(user_id) = viewer_id else {
        return;
    };

    if filter.is_favorited {
        query
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }

    if filter.is_in_shopping_cart {
        query
            .push(" AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

async fn recipe_detail(
    pool: &SqlitePool,
    recipe: Recipe,
    viewer_id: Option<UserId>,
) -> AppResult<RecipeDetail> {
    let author = get_user_profile(pool, recipe.author_id, viewer_id).await?;
    let tags = tags_for_recipe(pool, recipe.id).await?;
    let ingredients = ingredients_for_recipe(pool, recipe.id).await?;

    let (is_favorited, is_in_shopping_cart) = sqlx::query_as::<_, (bool, bool)>(
        "
        SELECT
            EXISTS (SELECT 1 FROM favorites WHERE user_id = ?1 AND recipe_id = ?2),
            EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = ?1 AND recipe_id = ?2)
        ",
    )
    .bind(viewer_id)
    .bind(recipe.id)
    .fetch_one(pool)
    .await?;

    Ok(RecipeDetail {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn ingredients_for_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
) -> AppResult<Vec<RecipeIngredient>> {
    Ok(sqlx::query_as::<_, RecipeIngredient>(
        "
        SELECT ingredients.id, ingredients.name, ingredients.measurement_unit, recipe_ingredients.amount
        FROM recipe_ingredients
        INNER JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE recipe_ingredients.recipe_id = ?
        ORDER BY recipe_ingredients.id
        ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?)
}
