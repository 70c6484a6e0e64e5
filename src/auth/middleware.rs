use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{Credential, CredentialError, Scheme, authenticate, extract_credential};
use crate::server::AppState;
use crate::types::User;

/// Extractor that accepts a session cookie, Basic auth, or an API token.
pub struct RequireUser {
    pub user: User,
}

/// Extractor for API endpoints that accept only an API token or a session.
pub struct RequireApiUser {
    pub user: User,
}

/// Extractor that never rejects; invalid credentials read as anonymous.
pub struct MaybeUser(pub Option<User>);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    InvalidCredentials,
    TokenExpired,
    SessionExpired,
    SchemeNotAllowed,
    InternalError,
}

impl From<CredentialError> for AuthError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::InvalidScheme => AuthError::InvalidScheme,
            CredentialError::InvalidToken => AuthError::InvalidToken,
            CredentialError::InvalidCredentials => AuthError::InvalidCredentials,
            CredentialError::TokenExpired => AuthError::TokenExpired,
            CredentialError::SessionExpired => AuthError::SessionExpired,
            CredentialError::InternalError => AuthError::InternalError,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::SchemeNotAllowed => (
                StatusCode::UNAUTHORIZED,
                "Use a token or session for this endpoint",
            ),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Token realm=\"curation\""),
            );
        }

        response
    }
}

/// Authenticates the request from its headers.
pub fn authenticate_parts(parts: &Parts, state: &Arc<AppState>) -> Result<(User, Scheme), AuthError> {
    let credential: Credential = extract_credential(&parts.headers)?.ok_or(AuthError::MissingAuth)?;
    let user = authenticate(state.store.as_ref(), &credential).map_err(|e| {
        tracing::warn!(scheme = ?credential.scheme(), "Rejected credential: {e:?}");
        AuthError::from(e)
    })?;
    Ok((user, credential.scheme()))
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = authenticate_parts(parts, state)?;
        Ok(RequireUser { user })
    }
}

impl FromRequestParts<Arc<AppState>> for RequireApiUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (user, scheme) = authenticate_parts(parts, state)?;

        if scheme == Scheme::Basic {
            return Err(AuthError::SchemeNotAllowed);
        }

        Ok(RequireApiUser { user })
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate_parts(parts, state).ok().map(|(user, _)| user)))
    }
}
