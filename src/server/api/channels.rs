use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use bytes::Bytes;
use serde_json::json;

use crate::auth::{RequireApiUser, RequireUser};
use crate::cache::Expiry;
use crate::catalog::{NewChannel, create_channel, project_channels, staged_diff};
use crate::server::AppState;
use crate::server::access::{can_access_channel, can_edit_channel, load_channel};
use crate::server::dto::{ChannelIdRequest, ProberChannelResponse, SetPriorityRequest};
use crate::server::response::{ApiError, Payload, StoreResultExt, Success};
use crate::tasks::{EXPORT_CHANNEL, GENERATE_CHANNEL_CSV, NewTask};
use crate::types::AccessibleChannelQuery;

pub const PUBLIC_CHANNELS_CACHE_KEY: &str = "public_channels";

const PROBER_CHANNEL_NAME: &str = "Prober channel";

pub async fn get_prober_channel(
    RequireApiUser { user }: RequireApiUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    if !user.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let existing = state
        .store
        .first_edited_channel(&user.id)
        .api_err("Failed to look up prober channel")?;

    let channel = match existing {
        Some(channel) => channel,
        None => create_channel(
            state.store.as_ref(),
            NewChannel::named(PROBER_CHANNEL_NAME).edited_by(&user.id),
        )
        .api_err("Failed to create prober channel")?,
    };

    Ok::<_, ApiError>(Json(ProberChannelResponse::from(channel)))
}

/// Channels the user may import from while editing `channel_id`.
pub async fn accessible_channels(
    RequireApiUser { user }: RequireApiUser,
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
) -> impl IntoResponse {
    let rows = state
        .store
        .list_accessible_channels(&AccessibleChannelQuery {
            user_id: user.id,
            exclude_channel_id: Some(channel_id),
            public_only: false,
        })
        .api_err("Failed to list accessible channels")?;

    Ok::<_, ApiError>(Json(project_channels(rows)))
}

pub async fn public_channels(
    _user: RequireApiUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let ttl = Expiry::After(state.config.public_channels_ttl());

    let body = state
        .cache
        .get_or_load(PUBLIC_CHANNELS_CACHE_KEY, ttl, || {
            let rows = state.store.list_accessible_channels(&AccessibleChannelQuery {
                user_id: String::new(),
                exclude_channel_id: None,
                public_only: true,
            })?;
            Ok(Bytes::from(serde_json::to_vec(&project_channels(rows))?))
        })
        .api_err("Failed to list public channels")?;

    Ok::<_, ApiError>(([(header::CONTENT_TYPE, "application/json")], body))
}

pub async fn publish_channel(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<ChannelIdRequest>,
) -> impl IntoResponse {
    tracing::debug!(channel_id = %body.channel_id, "Entering publish_channel");

    let store = state.store.as_ref();
    let channel = load_channel(store, &body.channel_id)?;
    can_edit_channel(store, &user, &channel)?;

    let task = state
        .tasks
        .enqueue(NewTask::for_channel(
            EXPORT_CHANNEL,
            &user.id,
            &channel.id,
            json!({ "user_id": user.id, "channel_id": channel.id }),
        ))
        .api_err("Failed to queue publish task")?;

    tracing::info!(channel_id = %channel.id, task_id = %task.id, "Publishing channel");

    Ok::<_, ApiError>(Json(task))
}

/// Promotes the staged tree of a channel to its main tree.
pub async fn activate_channel(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<ChannelIdRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let channel = load_channel(store, &body.channel_id)?;
    can_edit_channel(store, &user, &channel)?;

    store
        .activate_channel(&channel.id)
        .api_err("Failed to activate channel")?;
    state.cache.invalidate(PUBLIC_CHANNELS_CACHE_KEY);

    tracing::info!(channel_id = %channel.id, user_id = %user.id, "Activated channel");

    Ok::<_, ApiError>(Success::ok())
}

pub async fn get_staged_diff(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<ChannelIdRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let channel = load_channel(store, &body.channel_id)?;
    can_access_channel(store, &user, &channel)?;

    if channel.staging_tree_id.is_none() {
        return Err(ApiError::not_found("Channel has no staged changes"));
    }

    let rows = staged_diff(store, &channel).api_err("Failed to compute staged diff")?;

    Ok::<_, ApiError>(Json(rows))
}

pub async fn set_channel_priority(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Payload(body): Payload<SetPriorityRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let channel = load_channel(store, &body.channel_id)?;
    can_edit_channel(store, &user, &channel)?;

    store
        .set_channel_priority(&channel.id, body.priority)
        .api_err("Failed to set channel priority")?;

    Ok::<_, ApiError>(Success::ok())
}

/// Queues a CSV export of the channel's content; the result is delivered out of band.
pub async fn download_channel_content_csv(
    RequireUser { user }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    tracing::debug!(%channel_id, "Entering download_channel_content_csv");

    let store = state.store.as_ref();
    let channel = load_channel(store, &channel_id)?;
    can_access_channel(store, &user, &channel)?;

    let site = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    state
        .tasks
        .enqueue(NewTask::for_channel(
            GENERATE_CHANNEL_CSV,
            &user.id,
            &channel.id,
            json!({ "channel_id": channel.id, "site": site, "user_id": user.id }),
        ))
        .api_err("Failed to queue CSV export")?;

    Ok::<_, ApiError>(Success::ok())
}
