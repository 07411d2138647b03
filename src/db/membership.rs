use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::{on_unique_violation, AppError, AppResult},
    utils::pagination::{Page, PageRequest},
};

use super::{get_user_profile, RecipeId, RecipeSummary, UserId, UserProfile, PROFILE_COLUMNS};

/// The two per-user recipe lists. Both are plain (user, recipe) join tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn entry(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Favorite",
            RecipeList::ShoppingCart => "Shopping cart entry",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "the shopping cart",
        }
    }
}

/// A followed author together with what they have published.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: i64,
}

async fn recipe_summary(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<RecipeSummary> {
    sqlx::query_as::<_, RecipeSummary>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = ?",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Recipe"))
}

/// Adding a recipe that is already on the list is a conflict, not a no-op.
pub async fn add_to_list(
    pool: &SqlitePool,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<RecipeSummary> {
    let recipe = recipe_summary(pool, recipe_id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES (?, ?)",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await
    .map_err(|err| {
        on_unique_violation(err, format!("recipe is already in {}", list.label()))
    })?;
    tx.commit().await?;

    tracing::info!(user_id, recipe_id, list = list.table(), "recipe added");
    Ok(recipe)
}

pub async fn remove_from_list(
    pool: &SqlitePool,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<()> {
    recipe_summary(pool, recipe_id).await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(list.entry()));
    }
    tx.commit().await?;

    tracing::info!(user_id, recipe_id, list = list.table(), "recipe removed");
    Ok(())
}

pub async fn follow(pool: &SqlitePool, user_id: UserId, author_id: UserId) -> AppResult<Subscription> {
    if user_id == author_id {
        return Err(AppError::SelfFollow);
    }
    get_user_profile(pool, author_id, None).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await
        .map_err(|err| on_unique_violation(err, "already subscribed to this author"))?;
    tx.commit().await?;

    tracing::info!(user_id, author_id, "subscribed");

    let author = get_user_profile(pool, author_id, Some(user_id)).await?;
    subscription(pool, author, None).await
}

pub async fn unfollow(pool: &SqlitePool, user_id: UserId, author_id: UserId) -> AppResult<()> {
    if user_id == author_id {
        return Err(AppError::SelfFollow);
    }
    get_user_profile(pool, author_id, None).await?;

    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Subscription"));
    }
    tx.commit().await?;

    tracing::info!(user_id, author_id, "unsubscribed");
    Ok(())
}

/// Authors `user_id` follows, each with up to `recipes_limit` of their newest recipes.
pub async fn subscriptions(
    pool: &SqlitePool,
    user_id: UserId,
    page: PageRequest,
    recipes_limit: Option<u32>,
) -> AppResult<Page<Subscription>> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let sql = format!(
        "
        SELECT {PROFILE_COLUMNS}
        FROM follows
        INNER JOIN users u ON u.id = follows.author_id
        WHERE follows.user_id = ?
        ORDER BY follows.id
        LIMIT ? OFFSET ?
        "
    );
    let authors = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(user_id)
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(subscription(pool, author, recipes_limit).await?);
    }

    Ok(Page::new(results, count, page))
}

async fn subscription(
    pool: &SqlitePool,
    author: UserProfile,
    recipes_limit: Option<u32>,
) -> AppResult<Subscription> {
    let recipes_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(author.id)
        .fetch_one(pool)
        .await?;

    // LIMIT -1 means no limit in sqlite
    let limit = recipes_limit.map_or(-1, i64::from);
    let recipes = sqlx::query_as::<_, RecipeSummary>(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        ",
    )
    .bind(author.id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(Subscription {
        author,
        recipes,
        recipes_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DBError,
        test_utils::{count_rows, create_test_ingredient, create_test_recipe, create_test_user, setup_test_db},
    };

    #[tokio::test]
    async fn favorite_twice_is_a_conflict() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;
        let recipe = create_test_recipe(&pool, alice, &[(salt.id, 1)]).await;

        let summary = add_to_list(&pool, RecipeList::Favorites, alice, recipe.id).await.unwrap();
        assert_eq!(summary.id, recipe.id);

        let err = add_to_list(&pool, RecipeList::Favorites, alice, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::Conflict(_))));
        assert_eq!(count_rows(&pool, "favorites").await, 1);
    }

    #[tokio::test]
    async fn removing_what_was_never_added_is_not_found() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;
        let recipe = create_test_recipe(&pool, alice, &[(salt.id, 1)]).await;

        let err = remove_from_list(&pool, RecipeList::Favorites, alice, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFound("Favorite"))));

        add_to_list(&pool, RecipeList::ShoppingCart, alice, recipe.id).await.unwrap();
        remove_from_list(&pool, RecipeList::ShoppingCart, alice, recipe.id)
            .await
            .unwrap();
        assert_eq!(count_rows(&pool, "shopping_cart").await, 0);
    }

    #[tokio::test]
    async fn lists_are_independent() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;
        let recipe = create_test_recipe(&pool, alice, &[(salt.id, 1)]).await;

        add_to_list(&pool, RecipeList::Favorites, alice, recipe.id).await.unwrap();
        add_to_list(&pool, RecipeList::ShoppingCart, alice, recipe.id).await.unwrap();

        assert_eq!(count_rows(&pool, "favorites").await, 1);
        assert_eq!(count_rows(&pool, "shopping_cart").await, 1);
    }

    #[tokio::test]
    async fn unknown_recipe_is_not_found() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;

        let err = add_to_list(&pool, RecipeList::ShoppingCart, alice, 99).await.unwrap_err();
        assert!(matches!(err, AppError::DBError(DBError::NotFound("Recipe"))));
    }

    #[tokio::test]
    async fn following_yourself_is_rejected() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;

        assert!(matches!(follow(&pool, alice, alice).await, Err(AppError::SelfFollow)));
        assert_eq!(count_rows(&pool, "follows").await, 0);
    }

    #[tokio::test]
    async fn follow_toggles_and_conflicts() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;

        let subscription = follow(&pool, alice, bob).await.unwrap();
        assert!(subscription.author.is_subscribed);
        assert_eq!(subscription.recipes_count, 0);

        assert!(matches!(
            follow(&pool, alice, bob).await,
            Err(AppError::DBError(DBError::Conflict(_)))
        ));

        unfollow(&pool, alice, bob).await.unwrap();
        assert!(matches!(
            unfollow(&pool, alice, bob).await,
            Err(AppError::DBError(DBError::NotFound("Subscription")))
        ));
        assert!(matches!(
            follow(&pool, alice, 999).await,
            Err(AppError::DBError(DBError::NotFound("User")))
        ));
    }

    #[tokio::test]
    async fn subscriptions_carry_recipes() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let carol = create_test_user(&pool, "carol").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;

        for n in 1..=3 {
            create_test_recipe(&pool, bob, &[(salt.id, n)]).await;
        }
        follow(&pool, alice, bob).await.unwrap();
        follow(&pool, alice, carol).await.unwrap();

        let page = subscriptions(&pool, alice, PageRequest { page: 1, size: 10 }, Some(2))
            .await
            .unwrap();

        assert_eq!(page.count, 2);
        let bob_sub = &page.results[0];
        assert_eq!(bob_sub.author.username, "bob");
        assert!(bob_sub.author.is_subscribed);
        assert_eq!(bob_sub.recipes_count, 3);
        assert_eq!(bob_sub.recipes.len(), 2);
        assert_eq!(page.results[1].recipes_count, 0);
    }
}
