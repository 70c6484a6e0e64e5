use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ContentKind, ShareMode, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub is_admin: bool,
    pub policies_accepted: bool,
    /// Default metadata applied to new content (author, license, ...).
    pub content_defaults: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Session {
    /// SHA-256 of the cookie value; the raw key is never stored.
    pub key_hash: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub deleted: bool,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ricecooker_version: Option<String>,
    pub content_defaults: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The rows that make up a freshly created channel.
#[derive(Debug, Clone)]
pub struct ChannelDraft {
    pub channel: Channel,
    pub root: ContentNode,
    pub editor_id: Option<String>,
    pub primary_token: SecretToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: String,
    /// Every node of one tree shares the tree id of its root.
    pub tree_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub kind: ContentKind,
    pub title: String,
    /// Identity of the content itself; duplicated nodes keep it.
    pub content_id: String,
    /// Set on imported nodes whose authoring metadata must not change.
    pub freeze_authoring_data: bool,
    pub sort_order: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub channel_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub share_mode: ShareMode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretToken {
    pub id: String,
    pub token: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSet {
    pub id: String,
    pub name: String,
    pub description: String,
    pub secret_token_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub name: String,
    pub exists: bool,
    pub is_custom: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub status: TaskStatus,
    pub user_id: String,
    pub metadata: serde_json::Value,
    #[serde(skip)]
    pub args: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Filter for the accessible channel listing.
#[derive(Debug, Clone)]
pub struct AccessibleChannelQuery {
    pub user_id: String,
    pub exclude_channel_id: Option<String>,
    /// Restrict to public channels and ignore membership.
    pub public_only: bool,
}

/// One channel with its aggregated tree data, as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAggregate {
    pub main_tree_id: String,
    pub name: String,
    pub resource_count: i64,
    /// Immediate children of the root. A childless root aggregates to `[None]`.
    pub children: Vec<Option<String>>,
}

/// A channel the user edits or views, for the channel switcher on edit pages.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelPickerEntry {
    pub id: String,
    pub name: String,
    pub is_view_only: bool,
}

/// Per-kind node counts for a single tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStats {
    pub kind_counts: Vec<(ContentKind, i64)>,
    pub resource_count: i64,
}

impl TreeStats {
    #[must_use]
    pub fn count(&self, kind: ContentKind) -> i64 {
        self.kind_counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}
