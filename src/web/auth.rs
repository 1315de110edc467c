use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::poller::PollerHandle;

use super::api::error::ErrorResponse;
use super::config::{Config, Permission};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

impl AuthenticatedUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub poller: PollerHandle,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingAuth,
    InvalidFormat,
    InvalidKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAuth => "Missing Authorization header",
            AuthError::InvalidFormat => "Invalid Authorization format",
            AuthError::InvalidKey => "Invalid API key",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::with_message("unauthorized", message)),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub struct PermissionError(pub Permission);

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::with_message(
                "forbidden",
                &format!("missing permission {:?}", self.0),
            )),
        )
            .into_response()
    }
}

/// Resolves a `Bearer <key>` header against the configured API keys.
pub fn authenticate(
    config: &Config,
    header: Option<&HeaderValue>,
) -> Result<AuthenticatedUser, AuthError> {
    let value = header
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    let key = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AuthError::InvalidFormat)?;

    let api_key = config.find_api_key(key).ok_or(AuthError::InvalidKey)?;
    Ok(AuthenticatedUser {
        name: api_key.name.clone(),
        permissions: api_key.permissions.clone(),
    })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(&state.config, parts.headers.get(AUTHORIZATION));
        if let Err(e) = &user {
            log::debug!("Rejected request to {}: {:?}", parts.uri.path(), e);
        }
        user
    }
}

pub fn require_permission(
    user: &AuthenticatedUser,
    permission: Permission,
) -> Result<(), PermissionError> {
    if user.has_permission(permission) {
        Ok(())
    } else {
        log::warn!("{} lacks permission {:?}", user.name, permission);
        Err(PermissionError(permission))
    }
}
