use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::error::{on_unique_violation, AppError, AppResult};

use super::RecipeId;

pub type TagId = i64;

const DEFAULT_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTag {
    #[validate(length(min = 1, max = 20, message = "tag name must be 1 to 20 characters"))]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub async fn list_tags(pool: &SqlitePool) -> AppResult<Vec<Tag>> {
    Ok(
        sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY id")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn get_tag(pool: &SqlitePool, tag_id: TagId) -> AppResult<Tag> {
    sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Tag"))
}

pub async fn create_tag(pool: &SqlitePool, tag: NewTag) -> AppResult<Tag> {
    tag.validate()?;

    let color = tag.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
    if !is_hex_color(&color) {
        return Err(AppError::validation(format!(
            "'{color}' is not a #RRGGBB color"
        )));
    }

    let slug = tag
        .slug
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| slug::slugify(&tag.name));

    let created = sqlx::query_as::<_, Tag>(
        "
        INSERT INTO tags (name, color, slug)
        VALUES (?, ?, ?)
        RETURNING id, name, color, slug
        ",
    )
    .bind(&tag.name)
    .bind(&color)
    .bind(&slug)
    .fetch_one(pool)
    .await
    .map_err(|err| on_unique_violation(err, format!("tag with slug '{slug}' already exists")))?;

    tracing::info!(tag_id = created.id, slug = %created.slug, "tag created");
    Ok(created)
}

pub(crate) async fn tags_for_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
) -> AppResult<Vec<Tag>> {
    Ok(sqlx::query_as::<_, Tag>(
        "
        SELECT tags.id, tags.name, tags.color, tags.slug
        FROM recipe_tags
        INNER JOIN tags ON tags.id = recipe_tags.tag_id
        WHERE recipe_tags.recipe_id = ?
        ORDER BY tags.id
        ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?)
}
