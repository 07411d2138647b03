use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use crate::{
    auth::Role,
    error::{on_unique_violation, AppError, AppResult},
    utils::{
        hasher,
        pagination::{Page, PageRequest},
    },
};

pub type UserId = i64;

/// `is_subscribed` is relative to the viewer id bound as the first parameter.
pub(crate) const PROFILE_COLUMNS: &str = "u.id, u.email, u.username, u.first_name, u.last_name, \
    EXISTS (SELECT 1 FROM follows f WHERE f.user_id = ? AND f.author_id = u.id) AS is_subscribed";

#[derive(Debug, FromRow)]
pub struct UserAuth {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub hash: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "invalid email address"), length(max = 150))]
    pub email: String,
    #[validate(length(min = 1, max = 50, message = "username must be 1 to 50 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub last_name: String,
    #[validate(length(min = 8, max = 64, message = "password must be 8 to 64 characters"))]
    pub password: String,
}

pub async fn create_user(pool: &SqlitePool, user: NewUser) -> AppResult<UserProfile> {
    user.validate()?;

    let hash = hasher::hash_password(&user.password)?;

    let id = sqlx::query_scalar::<_, UserId>(
        "
        INSERT INTO users (email, username, first_name, last_name, hash)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(hash)
    .fetch_one(pool)
    .await
    .map_err(|err| on_unique_violation(err, "a user with this email or username already exists"))?;

    tracing::info!(user_id = id, username = %user.username, "user registered");

    get_user_profile(pool, id, None).await
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<UserAuth>> {
    Ok(sqlx::query_as::<_, UserAuth>(
        "SELECT id, email, username, hash, role FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?)
}

pub async fn get_role(pool: &SqlitePool, user_id: UserId) -> AppResult<Option<Role>> {
    let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(role.as_deref().map(Role::from_db))
}

pub async fn get_user_profile(
    pool: &SqlitePool,
    user_id: UserId,
    viewer_id: Option<UserId>,
) -> AppResult<UserProfile> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ?");

    sqlx::query_as::<_, UserProfile>(&sql)
        .bind(viewer_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn list_users(
    pool: &SqlitePool,
    viewer_id: Option<UserId>,
    page: PageRequest,
) -> AppResult<Page<UserProfile>> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users u ORDER BY u.id LIMIT ? OFFSET ?");
    let users = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(viewer_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok(Page::new(users, count, page))
}

pub async fn set_password(
    pool: &SqlitePool,
    user_id: UserId,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let hash = sqlx::query_scalar::<_, String>("SELECT hash FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !hasher::verify_password(&hash, current_password)? {
        return Err(AppError::validation("current password is not correct"));
    }

    let hash = hasher::hash_password(new_password)?;
    sqlx::query("UPDATE users SET hash = ? WHERE id = ?")
        .bind(hash)
        .bind(user_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id, "password changed");
    Ok(())
}

/// Promotes an existing account to administrator. Returns whether a row changed.
pub async fn grant_admin(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let result = sqlx::query("UPDATE users SET role = 'admin' WHERE email = ? AND role <> 'admin'")
        .bind(email)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::follow,
        test_utils::{create_test_user, setup_test_db},
    };

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let pool = setup_test_db().await;
        create_test_user(&pool, "alice").await;

        let err = create_user(
            &pool,
            NewUser {
                email: "alice@example.com".to_string(),
                username: "alice2".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                password: "password123".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::DBError(crate::error::DBError::Conflict(_))));
    }

    #[tokio::test]
    async fn profile_reports_subscription_for_viewer() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;
        let bob = create_test_user(&pool, "bob").await;

        follow(&pool, alice, bob).await.unwrap();

        assert!(get_user_profile(&pool, bob, Some(alice)).await.unwrap().is_subscribed);
        assert!(!get_user_profile(&pool, bob, None).await.unwrap().is_subscribed);
        assert!(!get_user_profile(&pool, alice, Some(bob)).await.unwrap().is_subscribed);
    }

    #[tokio::test]
    async fn set_password_checks_current_password() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;

        let err = set_password(&pool, alice, "wrong-password", "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        set_password(&pool, alice, "password123", "new-password")
            .await
            .unwrap();
        let auth = find_user_by_email(&pool, "alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(hasher::verify_password(&auth.hash, "new-password").unwrap());
    }

    #[tokio::test]
    async fn grant_admin_changes_role_once() {
        let pool = setup_test_db().await;
        let alice = create_test_user(&pool, "alice").await;

        assert!(grant_admin(&pool, "alice@example.com").await.unwrap());
        assert!(!grant_admin(&pool, "alice@example.com").await.unwrap());
        assert_eq!(get_role(&pool, alice).await.unwrap(), Some(Role::Admin));
    }
}
