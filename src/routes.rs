use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{api, AppState};

pub fn generate_routes(state: AppState) -> Router {
    Router::new()
        // ==== AUTH ==== //
        .route("/api/auth/token/login/", post(api::auth::login))
        // ==== USERS ==== //
        .route(
            "/api/users/",
            get(api::user::get_users).post(api::auth::registration),
        )
        .route("/api/users/me/", get(api::user::get_current_user))
        .route("/api/users/set_password/", post(api::user::set_password))
        .route("/api/users/subscriptions/", get(api::user::get_subscriptions))
        .route("/api/users/:id/", get(api::user::get_user))
        .route(
            "/api/users/:id/subscribe/",
            post(api::user::subscribe).delete(api::user::unsubscribe),
        )
        // ==== TAGS ==== //
        .route(
            "/api/tags/",
            get(api::tags::get_tags).post(api::tags::create_tag),
        )
        .route("/api/tags/:id/", get(api::tags::get_tag))
        // ==== INGREDIENTS ==== //
        .route(
            "/api/ingredients/",
            get(api::ingredients::get_ingredients).post(api::ingredients::create_ingredient),
        )
        .route(
            "/api/ingredients/:id/",
            get(api::ingredients::get_ingredient),
        )
        // ==== RECIPES ==== //
        .route(
            "/api/recipes/",
            get(api::recipes::get_recipes).post(api::recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart/",
            get(api::recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/:id/",
            get(api::recipes::get_recipe)
                .patch(api::recipes::update_recipe)
                .delete(api::recipes::delete_recipe),
        )
        .route(
            "/api/recipes/:id/favorite/",
            post(api::recipes::favorite_recipe).delete(api::recipes::unfavorite_recipe),
        )
        .route(
            "/api/recipes/:id/shopping_cart/",
            post(api::recipes::add_to_shopping_cart)
                .delete(api::recipes::remove_from_shopping_cart),
        )
        .fallback(handler_404)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "nothing to see here" })),
    )
}
