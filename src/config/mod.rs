mod server;

pub use server::{DEFAULT_SITE_TITLE, PUBLIC_CHANNELS_CACHE_SECS, ServerConfig};
