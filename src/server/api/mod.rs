mod bookmarks;
mod channels;
mod constants;
mod invitations;
mod tokens;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;
use crate::server::interceptors::post_only;

pub use channels::PUBLIC_CHANNELS_CACHE_KEY;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Health probes
        .route("/probers/get_prober_channel", get(channels::get_prober_channel))
        // Channel listings
        .route(
            "/accessible_channels/{channel_id}",
            get(channels::accessible_channels),
        )
        .route("/public_channels", get(channels::public_channels))
        .route("/get_user_channel_sets", get(tokens::get_user_channel_sets))
        // Channel actions
        .route("/publish_channel", post_only(channels::publish_channel))
        .route("/activate_channel", post_only(channels::activate_channel))
        .route("/get_staged_diff", post_only(channels::get_staged_diff))
        .route("/set_channel_priority", post_only(channels::set_channel_priority))
        .route(
            "/download_channel_content_csv/{channel_id}",
            get(channels::download_channel_content_csv),
        )
        .route(
            "/accept_channel_invite",
            post_only(invitations::accept_channel_invite),
        )
        // Bookmarks
        .route("/add_bookmark", post_only(bookmarks::add_bookmark))
        .route("/remove_bookmark", post_only(bookmarks::remove_bookmark))
        // Secret tokens
        .route(
            "/save_token_to_channels/{token}",
            post_only(tokens::save_token_to_channels),
        )
        // Constants
        .route("/constants/{name}", get(constants::get_constants))
}
