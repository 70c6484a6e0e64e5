use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;

use crate::cache::Expiry;
use crate::error::Result;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;
use crate::types::ContentKind;

/// Lookup tables served to the client, named by their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constant {
    ContentKind,
    License,
}

#[derive(Serialize)]
struct KindEntry {
    kind: ContentKind,
}

impl Constant {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "ContentKind" => Some(Self::ContentKind),
            "License" => Some(Self::License),
            _ => None,
        }
    }

    fn cache_key(self) -> &'static str {
        match self {
            Self::ContentKind => "ContentKind",
            Self::License => "License",
        }
    }

    fn load(self, store: &dyn Store) -> Result<Bytes> {
        let encoded = match self {
            Self::ContentKind => {
                let entries: Vec<KindEntry> = store
                    .list_content_kinds()?
                    .into_iter()
                    .map(|kind| KindEntry { kind })
                    .collect();
                serde_json::to_vec(&entries)?
            }
            Self::License => serde_json::to_vec(&store.list_licenses()?)?,
        };
        Ok(Bytes::from(encoded))
    }
}

/// Constants never change while the server runs, so they are cached without expiry.
pub async fn get_constants(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let constant =
        Constant::parse(&name).ok_or_else(|| ApiError::not_found(format!("Unknown constant {name}")))?;

    let body = state
        .cache
        .get_or_load(constant.cache_key(), Expiry::Never, || {
            constant.load(state.store.as_ref())
        })
        .api_err("Failed to load constants")?;

    Ok::<_, ApiError>(([(header::CONTENT_TYPE, "application/json")], body))
}
