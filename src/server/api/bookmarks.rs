use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::load_channel;
use crate::server::dto::BookmarkRequest;
use crate::server::response::{ApiError, Payload, StoreOptionExt, StoreResultExt, Success};
use crate::types::{Channel, User};

/// Resolves the user and channel named in a bookmark request.
/// Only admins may change someone else's bookmarks.
fn resolve(state: &AppState, caller: &User, body: &BookmarkRequest) -> Result<(User, Channel), ApiError> {
    if body.user_id != caller.id && !caller.is_admin {
        return Err(ApiError::forbidden("Cannot change another user's bookmarks"));
    }

    let user = state
        .store
        .get_user(&body.user_id)
        .api_err("Failed to load user")?
        .or_not_found(format!("User with id {} not found", body.user_id))?;
    let channel = load_channel(state.store.as_ref(), &body.channel_id)?;

    Ok((user, channel))
}

pub async fn add_bookmark(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<BookmarkRequest>,
) -> impl IntoResponse {
    let (user, channel) = resolve(&state, &user, &body)?;

    state
        .store
        .add_bookmark(&channel.id, &user.id)
        .api_err("Failed to add bookmark")?;

    Ok::<_, ApiError>(Success::ok())
}

pub async fn remove_bookmark(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<BookmarkRequest>,
) -> impl IntoResponse {
    let (user, channel) = resolve(&state, &user, &body)?;

    state
        .store
        .remove_bookmark(&channel.id, &user.id)
        .api_err("Failed to remove bookmark")?;

    Ok::<_, ApiError>(Success::ok())
}
