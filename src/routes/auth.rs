use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, StoreError};
use crate::models::User;
use crate::state::AppState;

/// Access-token claims. Tokens are issued elsewhere; `sub` carries the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

pub async fn extract_current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    let user_id = token_data
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;

    match state.users.find_by_id(user_id).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound { .. }) => Err(AppError::Unauthorized("User not found".to_string())),
        Err(err) => Err(err.into()),
    }
}

pub async fn extract_admin_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = extract_current_user(state, headers).await?;
    if !user.is_admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}
