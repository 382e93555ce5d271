//! Session-token authentication extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// Caller identity resolved from `Authorization: Bearer <session token>`.
///
/// Handlers that take an `AuthUser` reject unauthenticated requests with 401 before the
/// request body is read.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            debug!("Rejected request without a bearer token");
            AppError::Unauthorized
        })?;

        let user: Option<User> = sqlx::query_as(
            "SELECT u.id, u.email, u.created_at
             FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = $1 AND s.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&state.db)
        .await?;

        let user = user.ok_or_else(|| {
            debug!("Rejected unknown or expired session token");
            AppError::Unauthorized
        })?;

        debug!(user_id = %user.id, "Authenticated session");
        Ok(AuthUser { user_id: user.id })
    }
}

/// Extracts a non-empty bearer token. The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
