use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{config::ShoppingListConfig, error::AppResult};

use super::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ShoppingListItem {
    pub name: String,
    pub total: i64,
    pub measurement_unit: String,
}

/// Sums every ingredient across the recipes in the user's cart.
///
/// Lines are keyed on (name, unit) rather than the ingredient row, so the same
/// product listed twice in the catalogue still lands on one line. Sorted by
/// name, then unit.
pub async fn build_shopping_list(
    pool: &SqlitePool,
    user_id: UserId,
) -> AppResult<Vec<ShoppingListItem>> {
    Ok(sqlx::query_as::<_, ShoppingListItem>(
        "
        SELECT ingredients.name AS name,
               SUM(recipe_ingredients.amount) AS total,
               ingredients.measurement_unit AS measurement_unit
        FROM shopping_cart
        INNER JOIN recipe_ingredients ON recipe_ingredients.recipe_id = shopping_cart.recipe_id
        INNER JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE shopping_cart.user_id = ?
        GROUP BY ingredients.name, ingredients.measurement_unit
        ORDER BY ingredients.name, ingredients.measurement_unit
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub fn render_shopping_list(items: &[ShoppingListItem], config: &ShoppingListConfig) -> String {
    let mut report = format!("{}\n", config.header);

    for item in items {
        report.push_str(&format!(
            "{}: {} {}\n",
            item.name, item.total, item.measurement_unit
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{add_to_list, RecipeList},
        test_utils::{create_test_ingredient, create_test_recipe, create_test_user, setup_test_db},
    };

    #[tokio::test]
    async fn shared_ingredient_is_summed_into_one_line() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;
        let egg = create_test_ingredient(&pool, "Egg", "pcs").await;

        let a = create_test_recipe(&pool, alice, &[(salt.id, 10), (egg.id, 2)]).await;
        let b = create_test_recipe(&pool, alice, &[(salt.id, 5)]).await;
        add_to_list(&pool, RecipeList::ShoppingCart, alice, a.id).await.unwrap();
        add_to_list(&pool, RecipeList::ShoppingCart, alice, b.id).await.unwrap();

        let items = build_shopping_list(&pool, alice).await.unwrap();
        let report = render_shopping_list(&items, &ShoppingListConfig::default());

        assert_eq!(report, "Shopping list:\nEgg: 2 pcs\nSalt: 15 g\n");
    }

    #[tokio::test]
    async fn same_name_and_unit_from_different_rows_combine() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;
        let salt_again = create_test_ingredient(&pool, "Salt", "g").await;
        let salt_spoons = create_test_ingredient(&pool, "Salt", "tsp").await;

        let a = create_test_recipe(&pool, alice, &[(salt.id, 10), (salt_spoons.id, 1)]).await;
        let b = create_test_recipe(&pool, alice, &[(salt_again.id, 5)]).await;
        add_to_list(&pool, RecipeList::ShoppingCart, alice, a.id).await.unwrap();
        add_to_list(&pool, RecipeList::ShoppingCart, alice, b.id).await.unwrap();

        let items = build_shopping_list(&pool, alice).await.unwrap();
        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: "Salt".to_string(),
                    total: 15,
                    measurement_unit: "g".to_string(),
                },
                ShoppingListItem {
                    name: "Salt".to_string(),
                    total: 1,
                    measurement_unit: "tsp".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn only_the_users_cart_counts() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;
        let salt = create_test_ingredient(&pool, "Salt", "g").await;

        let recipe = create_test_recipe(&pool, alice, &[(salt.id, 10)]).await;
        add_to_list(&pool, RecipeList::ShoppingCart, bob, recipe.id).await.unwrap();
        add_to_list(&pool, RecipeList::Favorites, alice, recipe.id).await.unwrap();

        assert!(build_shopping_list(&pool, alice).await.unwrap().is_empty());
        assert_eq!(build_shopping_list(&pool, bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_cart_renders_header_only() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;

        let items = build_shopping_list(&pool, alice).await.unwrap();
        let config = ShoppingListConfig {
            header: "To buy:".to_string(),
            ..Default::default()
        };

        assert_eq!(render_shopping_list(&items, &config), "To buy:\n");
    }
}
