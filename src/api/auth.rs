use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    db::{self, NewUser},
    error::{AppError, AppResult},
    utils::{hasher, jwt},
};

// ================================================= LOGIN ================================================= //

#[derive(Debug, Deserialize, Validate)]
pub struct Login {
    #[validate(
        email(message = "invalid email address"),
        length(min = 1, message = "email can't be blank")
    )]
    email: String,
    #[validate(length(min = 1, message = "password can't be blank"))]
    password: String,
}

// POST /api/auth/token/login/
pub async fn login(
    State(pool): State<SqlitePool>,
    State(key): State<EncodingKey>,
    State(config): State<Arc<Config>>,
    Json(login): Json<Login>,
) -> AppResult<impl IntoResponse> {
    login.validate()?;

    let Some(user) = db::find_user_by_email(&pool, &login.email).await? else {
        return Err(AppError::Forbidden("email or password is invalid"));
    };

    if !hasher::verify_password(&user.hash, &login.password)? {
        tracing::warn!(user_id = user.id, "failed login");
        return Err(AppError::Forbidden("email or password is invalid"));
    }

    let token = jwt::generate_jwt(user.id, &key, config.token_ttl_days)?;
    tracing::info!(user_id = user.id, "token issued");

    Ok((StatusCode::CREATED, Json(json!({ "auth_token": token }))))
}

// ================================================= REGISTRATION ================================================= //

// POST /api/users/
pub async fn registration(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Json(user): Json<NewUser>,
) -> AppResult<impl IntoResponse> {
    let promote = config.admin_email.as_deref() == Some(user.email.as_str());
    let email = user.email.clone();

    let profile = db::create_user(&pool, user).await?;
    if promote && db::grant_admin(&pool, &email).await? {
        tracing::info!(user_id = profile.id, "administrator registered");
    }

    Ok((StatusCode::CREATED, Json(profile)))
}
