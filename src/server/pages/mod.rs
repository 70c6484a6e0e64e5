mod channels;
mod health;
mod policies;
mod sandbox;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::server::AppState;
use crate::server::interceptors::{browser_is_supported, has_accepted_policies, require_login};

/// HTML pages. Most sit behind the full interceptor chain; the policy
/// pages only need a login, and the probes and redirects need nothing.
pub fn pages_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/channels", get(channels::channel_list))
        .route("/channels/{channel_id}/edit", get(channels::channel))
        .route("/channels/{channel_id}/view", get(channels::channel_view_only))
        .route("/channels/{channel_id}/staging", get(channels::channel_staging))
        .route("/sandbox", get(sandbox::sandbox))
        .route_layer(middleware::from_fn(has_accepted_policies))
        .route_layer(middleware::from_fn(browser_is_supported))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    let policies = Router::new()
        .route(
            "/policies/accept",
            get(policies::policies_page).post(policies::accept_policies),
        )
        .route_layer(middleware::from_fn_with_state(state, require_login));

    Router::new()
        .route("/", get(health::base))
        .route("/healthz", get(health::health))
        .route("/stealthz", get(health::stealth))
        .route("/unsupported_browser", get(policies::unsupported_browser))
        .route(
            "/channels/{channel_id}",
            get(channels::redirect_to_channel_edit),
        )
        .route(
            "/channels/{channel_id}/view_only",
            get(channels::redirect_to_channel_view),
        )
        .merge(protected)
        .merge(policies)
}
