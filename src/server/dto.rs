use serde::{Deserialize, Serialize};

use crate::auth::format_channel_token;
use crate::types::{Channel, ChannelSet, SecretToken};

#[derive(Debug, Deserialize)]
pub struct ChannelIdRequest {
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BookmarkRequest {
    pub user_id: String,
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPriorityRequest {
    pub channel_id: String,
    pub priority: i64,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub invitation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    pub priority: i64,
    pub main_tree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_tree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ricecooker_version: Option<String>,
    pub content_defaults: serde_json::Value,
    pub is_view_only: bool,
}

impl ChannelResponse {
    #[must_use]
    pub fn new(channel: Channel, is_view_only: bool) -> Self {
        Self {
            id: channel.id,
            name: channel.name,
            description: channel.description,
            public: channel.public,
            priority: channel.priority,
            main_tree: channel.main_tree_id,
            staging_tree: channel.staging_tree_id,
            ricecooker_version: channel.ricecooker_version,
            content_defaults: channel.content_defaults,
            is_view_only,
        }
    }
}

/// Minimal channel shape returned to the uptime prober.
#[derive(Debug, Serialize)]
pub struct ProberChannelResponse {
    pub id: String,
    pub name: String,
    pub main_tree: Option<String>,
}

impl From<Channel> for ProberChannelResponse {
    fn from(channel: Channel) -> Self {
        Self {
            id: channel.id,
            name: channel.name,
            main_tree: channel.main_tree_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SecretTokenResponse {
    pub id: String,
    pub token: String,
    pub display_token: String,
    pub channels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelSetResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub secret_token: SecretTokenResponse,
}

impl ChannelSetResponse {
    #[must_use]
    pub fn new(set: ChannelSet, token: SecretToken, channels: Vec<String>) -> Self {
        Self {
            id: set.id,
            name: set.name,
            description: set.description,
            secret_token: SecretTokenResponse {
                display_token: format_channel_token(&token.token),
                id: token.id,
                token: token.token,
                channels,
            },
        }
    }
}
