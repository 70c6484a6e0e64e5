mod access;
mod accounts;
mod api;
pub mod dto;
pub mod interceptors;
mod pages;
mod render;
pub mod response;
mod router;

pub use router::{AppState, create_router};

#[cfg(test)]
pub(crate) mod test_support;
