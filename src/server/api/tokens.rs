use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::is_editor;
use crate::server::dto::ChannelSetResponse;
use crate::server::response::{ApiError, Payload, StoreOptionExt, StoreResultExt, Success};

/// Channel sets the user edits, each with the channels its token unlocks.
pub async fn get_user_channel_sets(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let sets = store
        .list_user_channel_sets(&user.id)
        .api_err("Failed to list channel sets")?;

    let mut responses = Vec::with_capacity(sets.len());
    for set in sets {
        let token = store
            .get_secret_token_by_id(&set.secret_token_id)
            .api_err("Failed to load channel set token")?
            .or_not_found(format!("Token for channel set {} not found", set.id))?;
        let channels = store
            .list_secret_token_channels(&token.id)
            .api_err("Failed to list channel set channels")?
            .into_iter()
            .map(|c| c.id)
            .collect();
        responses.push(ChannelSetResponse::new(set, token, channels));
    }

    Ok::<_, ApiError>(Json(responses))
}

/// Replaces the channels a secret token grants access to.
/// Unknown channel ids are ignored; known ones must be editable by the caller.
pub async fn save_token_to_channels(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Payload(channel_ids): Payload<Vec<String>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let secret_token = store
        .get_secret_token(&token)
        .api_err("Failed to load token")?
        .or_not_found(format!("Token {token} not found"))?;

    for channel_id in &channel_ids {
        let Some(channel) = store.get_channel(channel_id).api_err("Failed to load channel")? else {
            continue;
        };
        if !is_editor(store, &user, &channel)? {
            return Err(ApiError::forbidden(format!(
                "No permission to edit channel {channel_id}"
            )));
        }
    }

    store
        .set_secret_token_channels(&secret_token.id, &channel_ids)
        .api_err("Failed to save token channels")?;

    Ok::<_, ApiError>(Success::ok())
}
