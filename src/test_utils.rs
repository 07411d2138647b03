//! Shared helpers for the database tests: an in-memory pool plus builders
//! with sensible defaults.

use sqlx::SqlitePool;
use tracing_subscriber::EnvFilter;

use crate::db::{
    self, IngredientAmount, IngredientId, NewIngredient, NewRecipe, NewTag, NewUser, Recipe, Tag,
    TagId, UserId,
};

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory database with the schema applied.
pub(crate) async fn setup_test_db() -> SqlitePool {
    init_test_tracing();

    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::prepare_db(&pool).await.unwrap();
    pool
}

/// Registers `<name>@example.com` with password `password123`.
pub(crate) async fn create_test_user(pool: &SqlitePool, name: &str) -> UserId {
    db::create_user(
        pool,
        NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            password: "password123".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

pub(crate) async fn create_test_tag(pool: &SqlitePool, slug: &str) -> Tag {
    db::create_tag(
        pool,
        NewTag {
            name: slug.to_string(),
            color: Some("#49B64E".to_string()),
            slug: Some(slug.to_string()),
        },
    )
    .await
    .unwrap()
}

pub(crate) async fn create_test_ingredient(
    pool: &SqlitePool,
    name: &str,
    unit: &str,
) -> db::Ingredient {
    db::create_ingredient(
        pool,
        NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        },
    )
    .await
    .unwrap()
}

/// Recipe defaults: name "Test recipe", 10 minutes, a placeholder image.
pub(crate) fn new_recipe(tags: Vec<TagId>, ingredients: Vec<IngredientAmount>) -> NewRecipe {
    NewRecipe {
        name: "Test recipe".to_string(),
        text: "Mix everything.".to_string(),
        image: "recipes/test.png".to_string(),
        cooking_time: 10,
        tags,
        ingredients,
    }
}

/// Creates a recipe tagged with the shared `test` tag.
pub(crate) async fn create_test_recipe(
    pool: &SqlitePool,
    author: UserId,
    ingredients: &[(IngredientId, i64)],
) -> Recipe {
    let tag_id = sqlx::query_scalar::<_, TagId>(
        "
        INSERT INTO tags (name, color, slug) VALUES ('test', '#000000', 'test')
        ON CONFLICT (slug) DO UPDATE SET name = excluded.name
        RETURNING id
        ",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let ingredients = ingredients
        .iter()
        .map(|&(id, amount)| IngredientAmount { id, amount })
        .collect();

    db::create_recipe(pool, author, new_recipe(vec![tag_id], ingredients))
        .await
        .unwrap()
}

pub(crate) async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
