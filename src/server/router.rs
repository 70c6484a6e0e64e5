use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;

use super::accounts::accounts_router;
use super::api::api_router;
use super::pages::pages_router;
use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::store::Store;
use crate::tasks::{StoreTaskDispatcher, TaskDispatcher};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Cache,
    pub tasks: Arc<dyn TaskDispatcher>,
    pub config: ServerConfig,
}

impl AppState {
    /// State with an in-memory cache and tasks recorded in the store.
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        Self {
            tasks: Arc::new(StoreTaskDispatcher::new(store.clone())),
            cache: Cache::in_memory(),
            store,
            config,
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(pages_router(state.clone()))
        .nest("/api", api_router())
        .nest("/accounts", accounts_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
