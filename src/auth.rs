use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    headers::Authorization,
    http::{header::AUTHORIZATION, request::Parts},
    TypedHeader,
};
use jsonwebtoken::DecodingKey;
use sqlx::SqlitePool;

use crate::{
    db::{self, UserId},
    error::{AppError, AppResult},
    utils::jwt::{self, JWTToken},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Anonymous,
    User,
    Admin,
}

impl Role {
    pub fn from_db(role: &str) -> Self {
        match role {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Who is making the request, resolved once from the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<UserId>,
    pub role: Role,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: Role::User,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: Role::Admin,
        }
    }

    pub fn require_user(&self) -> AppResult<UserId> {
        self.user_id.ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> AppResult<UserId> {
        let user_id = self.require_user()?;
        match self.role {
            Role::Admin => Ok(user_id),
            _ => Err(AppError::Forbidden("only administrators can do this")),
        }
    }

    /// Only the author may change what they wrote.
    pub fn require_author(&self, author_id: UserId) -> AppResult<UserId> {
        let user_id = self.require_user()?;
        if user_id != author_id {
            return Err(AppError::Forbidden("only the author can change this recipe"));
        }
        Ok(user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
    DecodingKey: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header =
            Option::<TypedHeader<Authorization<JWTToken>>>::from_request_parts(parts, state)
                .await
                .unwrap_or_default();

        let Some(TypedHeader(Authorization(token))) = header else {
            if parts.headers.contains_key(AUTHORIZATION) {
                return Err(AppError::Unauthorized);
            }
            return Ok(Viewer::anonymous());
        };

        let user_id = jwt::verify_token(&token.0, &DecodingKey::from_ref(state))?;

        let pool = SqlitePool::from_ref(state);
        let role = db::get_role(&pool, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Viewer {
            user_id: Some(user_id),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_check_separates_anonymous_from_strangers() {
        assert!(matches!(
            Viewer::anonymous().require_author(1),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            Viewer::user(2).require_author(1),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(Viewer::user(1).require_author(1).unwrap(), 1);
    }

    #[test]
    fn admin_check_uses_role() {
        assert!(Viewer::admin(1).require_admin().is_ok());
        assert!(matches!(
            Viewer::user(1).require_admin(),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(Role::from_db("admin"), Role::Admin);
        assert_eq!(Role::from_db("user"), Role::User);
    }
}
