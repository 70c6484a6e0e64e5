//! Request interceptors for the HTML pages, composed as axum middleware.
//!
//! `require_login` runs first and stores the authenticated [`CurrentUser`] in
//! the request extensions; the later interceptors read it from there. Each
//! interceptor either forwards the request or answers with a redirect.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    handler::Handler,
    http::{StatusCode, Uri, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::{MethodRouter, post},
};

use crate::auth::{authenticate, extract_credential};
use crate::server::AppState;
use crate::types::User;

pub const LOGIN_PATH: &str = "/accounts/login";
pub const UNSUPPORTED_BROWSER_PATH: &str = "/unsupported_browser";
pub const POLICIES_PATH: &str = "/policies/accept";

/// The user authenticated by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn login_redirect(uri: &Uri) -> Response {
    let next = uri.path_and_query().map_or("/", |pq| pq.as_str());
    Redirect::to(&format!("{LOGIN_PATH}?next={}", urlencoding::encode(next))).into_response()
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| login_redirect(&parts.uri))
    }
}

/// Redirects anonymous requests to the login page, remembering where they were going.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let credential = match extract_credential(request.headers()) {
        Ok(Some(credential)) => credential,
        _ => return login_redirect(request.uri()),
    };

    match authenticate(state.store.as_ref(), &credential) {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), "Login required: {e:?}");
            login_redirect(request.uri())
        }
    }
}

fn is_unsupported_browser(user_agent: &str) -> bool {
    user_agent.contains("MSIE ") || user_agent.contains("Trident/")
}

/// Sends Internet Explorer to a page explaining that it is not supported.
pub async fn browser_is_supported(request: Request, next: Next) -> Response {
    let unsupported = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_unsupported_browser);

    if unsupported {
        return Redirect::to(UNSUPPORTED_BROWSER_PATH).into_response();
    }
    next.run(request).await
}

/// Sends users who have not accepted the current policies to the acceptance page.
pub async fn has_accepted_policies(request: Request, next: Next) -> Response {
    let pending = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(|CurrentUser(user)| !user.policies_accepted);

    if pending {
        return Redirect::to(POLICIES_PATH).into_response();
    }
    next.run(request).await
}

async fn only_post_allowed() -> Response {
    (
        StatusCode::BAD_REQUEST,
        "Only POST requests are allowed on this endpoint.",
    )
        .into_response()
}

/// A POST route that answers every other method with 400 instead of 405.
pub fn post_only<H, T>(handler: H) -> MethodRouter<Arc<AppState>>
where
    H: Handler<T, Arc<AppState>>,
    T: 'static,
{
    post(handler).fallback(only_post_allowed)
}
