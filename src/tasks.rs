use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::{Task, TaskStatus};

pub const EXPORT_CHANNEL: &str = "export-channel";
pub const GENERATE_CHANNEL_CSV: &str = "generate-channel-csv";

/// Work to hand to the background executor.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: &'static str,
    pub user_id: String,
    /// Shown to clients, e.g. which channels the task affects.
    pub metadata: Value,
    /// Consumed by the executor only.
    pub args: Value,
}

impl NewTask {
    /// A task touching a single channel, with the usual `affects` metadata.
    #[must_use]
    pub fn for_channel(task_type: &'static str, user_id: &str, channel_id: &str, args: Value) -> Self {
        Self {
            task_type,
            user_id: user_id.to_string(),
            metadata: serde_json::json!({ "affects": { "channels": [channel_id] } }),
            args,
        }
    }
}

/// Hands tasks to an executor and returns a handle synchronously.
pub trait TaskDispatcher: Send + Sync {
    fn enqueue(&self, task: NewTask) -> Result<Task>;
}

/// Records tasks in the store in the `QUEUED` state for an external worker to pick up.
pub struct StoreTaskDispatcher {
    store: Arc<dyn Store>,
}

impl StoreTaskDispatcher {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl TaskDispatcher for StoreTaskDispatcher {
    fn enqueue(&self, task: NewTask) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            task_type: task.task_type.to_string(),
            status: TaskStatus::Queued,
            user_id: task.user_id,
            metadata: task.metadata,
            args: task.args,
            created_at: Utc::now(),
        };

        self.store.create_task(&task)?;
        tracing::info!(task_id = %task.id, task_type = %task.task_type, "Queued task");

        Ok(task)
    }
}
