use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};

use crate::auth::MaybeUser;
use crate::server::AppState;
use crate::server::interceptors::LOGIN_PATH;
use crate::server::response::{ApiError, StoreResultExt};

pub async fn base(MaybeUser(user): MaybeUser) -> Redirect {
    match user {
        Some(_) => Redirect::to("/channels"),
        None => Redirect::to(LOGIN_PATH),
    }
}

/// Liveness probe that also touches the database.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let channel = state
        .store
        .first_channel()
        .api_err("Failed to query channels")?;

    Ok::<_, ApiError>(match channel {
        Some(channel) => channel.name,
        None => "No channels created yet!".to_string(),
    })
}

pub async fn stealth() -> &'static str {
    "<3"
}
