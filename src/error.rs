use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum DBError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Any error: {0:?}")]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    DBError(#[from] DBError),

    #[error("{0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("You can not follow yourself")]
    SelfFollow,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("SQL failed: {0:?}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JWT error: {0:?}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl AppError {
    pub fn not_found(what: &'static str) -> Self {
        DBError::NotFound(what).into()
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DBError::Conflict(message.into()).into()
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::SelfFollow | AppError::Invalid(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::DBError(DBError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::DBError(DBError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Sqlx(_) | AppError::Anyhow(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Maps a unique-constraint violation to a conflict, passing other errors through.
pub fn on_unique_violation(err: sqlx::Error, message: impl Into<String>) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
            None
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
            Some(self.to_string())
        };

        let body = Json(json!({
            "error": error_message
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_taxonomy() {
        assert_eq!(
            AppError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::not_found("Recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::SelfFollow.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::not_found("Recipe").to_string(), "Recipe not found");
    }
}
