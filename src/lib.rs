//! # Curation
//!
//! A server for curating tree-structured content channels, usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! curation = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use curation::config::ServerConfig;
//! use curation::server::{AppState, create_router};
//! use curation::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `curation` binary. Disable with `default-features = false`.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod tasks;
pub mod types;
