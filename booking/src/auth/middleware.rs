//! Authentication extractors.
//!
//! - [`BearerToken`]: the raw `Authorization: Bearer <token>` value
//! - [`SessionUser`]: any authenticated, non-banned account
//! - [`RequireAdmin`]: an authenticated admin
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn my_tickets(
//!     State(state): State<AppState>,
//!     session: SessionUser,
//! ) -> Result<Json<Vec<TicketView>>, AppError> {
//!     Ok(Json(state.service.my_tickets(session.user_id).await?))
//! }
//! ```

use crate::accounts::{Account, AuthError};
use crate::server::state::AppState;
use crate::types::{Actor, UserId};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use eventbook_web::AppError;

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'")
            })?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::unauthorized(err.to_string()),
            AuthError::Banned { .. } => Self::forbidden("Your account has been banned"),
            AuthError::Seed(_) | AuthError::Directory(_) => Self::internal(err.to_string()),
        }
    }
}

/// Authenticated, non-banned user.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated user ID
    pub user_id: UserId,
    /// The full account
    pub account: Account,
}

impl SessionUser {
    /// The caller as a domain actor.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.account.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let account = state.service.authenticate(&bearer.0).await.inspect_err(|err| {
            tracing::debug!(error = %err, "Authentication failed");
        })?;

        Ok(Self {
            user_id: account.id,
            account,
        })
    }
}

/// Authenticated admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionUser);

impl RequireAdmin {
    /// The admin as a domain actor.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = SessionUser::from_request_parts(parts, state).await?;
        if !session.actor().is_admin() {
            tracing::debug!(user = %session.user_id, "Admin access denied");
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(Self(session))
    }
}
