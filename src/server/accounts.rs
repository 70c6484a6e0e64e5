use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde_json::json;

use crate::auth::{Credential, SESSION_COOKIE, authenticate, end_session, extract_session_cookie, start_session};
use crate::server::AppState;
use crate::server::dto::{LoginQuery, LoginRequest};
use crate::server::interceptors::{LOGIN_PATH, post_only};
use crate::server::render::render_page;
use crate::server::response::{ApiError, StoreResultExt};

pub fn accounts_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post_only(logout))
}

/// Browsers read `\` as `/`, so `/\host` leaves the site just like `//host`.
fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/' | '\\'))
        && !path.chars().any(|c| c == '\\' || c.is_control())
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if is_local_path(path) => path,
        _ => "/channels",
    }
}

fn session_cookie(value: &str, max_age_secs: i64) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .map_err(|_| ApiError::internal("Failed to build session cookie"))
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let context = json!({ "next": safe_next(query.next.as_deref()) });
    render_page(&state.config.site_title, "login", &context)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginRequest>,
) -> Result<Response, ApiError> {
    let credential = Credential::Basic {
        username: form.email.trim().to_lowercase(),
        password: form.password,
    };

    let user = match authenticate(state.store.as_ref(), &credential) {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Failed login: {e:?}");
            let context = json!({
                "next": safe_next(form.next.as_deref()),
                "error": "Invalid email or password",
            });
            let page = render_page(&state.config.site_title, "login", &context);
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
    };

    let ttl = state.config.session_ttl();
    let key = start_session(state.store.as_ref(), &user.id, ttl).api_err("Failed to start session")?;

    tracing::info!(user_id = %user.id, "Signed in");

    let mut response = Redirect::to(safe_next(form.next.as_deref())).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie(&key, ttl.num_seconds())?);
    Ok(response)
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(key) = extract_session_cookie(&headers) {
        end_session(state.store.as_ref(), &key).api_err("Failed to end session")?;
    }

    let mut response = Redirect::to(LOGIN_PATH).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie("", 0)?);
    Ok(response)
}
