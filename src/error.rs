use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

const COMIC_ENTITY: &str = "Comic";

/// Failures reported by the storage and view-count collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("view lookup for chapter {chapter_id} timed out")]
    Timeout { chapter_id: i64 },

    #[error("{0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn comic_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: COMIC_ENTITY,
            id,
        }
    }

    pub fn user_not_found(id: i64) -> Self {
        Self::NotFound { entity: "User", id }
    }

    pub fn chapter_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Chapter", id }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidValue { name: String, value: String },
}

/// Error type returned by every HTTP handler.
///
/// Client-facing variants carry their message into the `{message}` body.
/// `Unexpected` is logged in full and answered with a fixed generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Unexpected(anyhow::Error),
}

/// Comic ids are the only identifiers clients send, so only a missing comic
/// is their mistake. Any other missing record is broken stored data.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                entity: COMIC_ENTITY,
                ..
            } => Self::InvalidInput(err.to_string()),
            other => Self::Unexpected(other.into()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::Unexpected(err) => {
                tracing::error!("Unexpected failure: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_FAILURE_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

/// Parses a path or body identifier. Only positive integers are accepted.
pub fn parse_id(raw: &str, entity: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid {} id: {}", entity, raw)))
}
