mod kind;
mod models;

pub use kind::{ContentKind, ShareMode, TaskStatus};
pub use models::*;
