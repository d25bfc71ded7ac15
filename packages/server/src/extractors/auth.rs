use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Basic;
use hashbin_common::index::Principal;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::password;

/// Authenticated user extracted from the `Authorization: Basic ...` header.
///
/// Add this as a handler parameter to require authentication. Credentials are
/// checked against `auth.users`.
pub struct BasicAuthUser {
    pub username: String,
}

impl BasicAuthUser {
    pub fn principal(&self) -> Principal {
        Principal::new(self.username.clone())
    }
}

impl FromRequestParts<AppState> for BasicAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(basic)) =
            TypedHeader::<Authorization<Basic>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let username = basic.username().to_string();
        let Some(stored) = state.config.auth.users.get(&username).cloned() else {
            tracing::debug!(%username, "Unknown user");
            return Err(AppError::Unauthorized);
        };

        let candidate = basic.password().to_string();
        let valid =
            tokio::task::spawn_blocking(move || password::verify_password(&candidate, &stored))
                .await
                .map_err(|e| AppError::Internal(format!("Password check panicked: {e}")))?;

        if !valid {
            tracing::debug!(%username, "Wrong password");
            return Err(AppError::Unauthorized);
        }

        Ok(BasicAuthUser { username })
    }
}
