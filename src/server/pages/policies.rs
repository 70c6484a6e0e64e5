use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde_json::json;

use crate::server::AppState;
use crate::server::interceptors::CurrentUser;
use crate::server::render::{render_message, render_page};
use crate::server::response::{ApiError, StoreResultExt};

pub async fn unsupported_browser(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    render_message(
        &state.config.site_title,
        "Browser not supported",
        "Please use a recent version of Firefox, Chrome, Safari or Edge.",
    )
}

pub async fn policies_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let context = json!({ "current_user": user });
    render_page(&state.config.site_title, "policies", &context)
}

pub async fn accept_policies(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    state
        .store
        .accept_policies(&user.id)
        .api_err("Failed to record policy acceptance")?;

    tracing::info!(user_id = %user.id, "Accepted policies");

    Ok::<_, ApiError>(Redirect::to("/channels"))
}
