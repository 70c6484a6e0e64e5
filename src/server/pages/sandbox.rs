use std::sync::Arc;

use axum::{extract::State, response::IntoResponse};
use serde_json::json;

use crate::server::AppState;
use crate::server::interceptors::CurrentUser;
use crate::server::render::render_page;
use crate::server::response::{ApiError, StoreResultExt};
use crate::types::ContentKind;

/// Playground with one authored node of every kind and one imported resource,
/// taken from channels the user edits or public channels.
pub async fn sandbox(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut nodes = Vec::new();
    for kind in ContentKind::ALL {
        if let Some(node) = store
            .find_sample_node(&user.id, Some(kind), false)
            .api_err("Failed to load sample nodes")?
        {
            nodes.push(node);
        }
    }
    if let Some(node) = store
        .find_sample_node(&user.id, None, true)
        .api_err("Failed to load sample nodes")?
    {
        nodes.push(node);
    }

    let channel = store
        .first_edited_channel(&user.id)
        .api_err("Failed to load channel")?
        .map(|c| c.id);

    let context = json!({
        "nodes": nodes,
        "channel": channel,
        "current_user": user,
    });

    Ok::<_, ApiError>(render_page(&state.config.site_title, "sandbox", &context))
}
