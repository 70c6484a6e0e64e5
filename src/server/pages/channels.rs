use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::auth::format_channel_token;
use crate::server::AppState;
use crate::server::access::{can_access_channel, can_edit_channel, is_editor, load_channel};
use crate::server::dto::ChannelResponse;
use crate::server::interceptors::CurrentUser;
use crate::server::render::{render_message, render_page};
use crate::server::response::{ApiError, StoreResultExt};
use crate::types::{Channel, User};

fn edit_path(channel_id: &str) -> String {
    format!("/channels/{channel_id}/edit")
}

fn view_path(channel_id: &str) -> String {
    format!("/channels/{channel_id}/view")
}

pub async fn redirect_to_channel_edit(Path(channel_id): Path<String>) -> Redirect {
    Redirect::to(&edit_path(&channel_id))
}

pub async fn redirect_to_channel_view(Path(channel_id): Path<String>) -> Redirect {
    Redirect::to(&view_path(&channel_id))
}

#[derive(Debug, Clone, Copy, Default)]
struct PageMode {
    allow_edit: bool,
    staging: bool,
}

fn channel_page(
    state: &AppState,
    user: &User,
    channel: Channel,
    mode: PageMode,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();

    let channel_list = store
        .list_channel_picker(&user.id, &channel.id)
        .api_err("Failed to list channels")?;

    let primary_token = store
        .get_primary_secret_token(&channel.id)
        .api_err("Failed to load channel token")?
        .map_or_else(|| channel.id.clone(), |t| format_channel_token(&t.token));

    let context = json!({
        "allow_edit": mode.allow_edit,
        "staging": mode.staging,
        "is_public": channel.public,
        "channel_id": channel.id,
        "channel_name": channel.name,
        "ricecooker_version": channel.ricecooker_version,
        "channel_list": channel_list,
        "current_user": user,
        "preferences": channel.content_defaults,
        "primary_token": primary_token,
        "title": state.config.site_title,
        "channel": ChannelResponse::new(channel, !mode.allow_edit),
    });

    Ok(render_page(&state.config.site_title, "channel_edit", &context).into_response())
}

pub async fn channel_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let context = json!({
        "channel_name": false,
        "current_user": user,
        "user_preferences": user.content_defaults,
    });
    render_page(&state.config.site_title, "channel_list", &context)
}

/// Edit page. Users who cannot edit are sent to the read-only view instead.
pub async fn channel(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel = load_channel(state.store.as_ref(), &channel_id)?;

    if !is_editor(state.store.as_ref(), &user, &channel)? {
        return Ok(Redirect::to(&view_path(&channel.id)).into_response());
    }

    channel_page(
        &state,
        &user,
        channel,
        PageMode {
            allow_edit: true,
            staging: false,
        },
    )
}

pub async fn channel_view_only(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel = load_channel(state.store.as_ref(), &channel_id)?;
    can_access_channel(state.store.as_ref(), &user, &channel)?;

    channel_page(&state, &user, channel, PageMode::default())
}

pub async fn channel_staging(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(channel_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel = load_channel(state.store.as_ref(), &channel_id)?;
    can_edit_channel(state.store.as_ref(), &user, &channel)?;

    if channel.staging_tree_id.is_none() {
        return Ok(render_message(
            &state.config.site_title,
            "Staging tree not found",
            "This channel has no staged changes to review.",
        )
        .into_response());
    }

    channel_page(
        &state,
        &user,
        channel,
        PageMode {
            allow_edit: true,
            staging: true,
        },
    )
}
