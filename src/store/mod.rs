mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn has_admin_user(&self) -> Result<bool>;
    fn accept_policies(&self, user_id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session(&self, key_hash: &str) -> Result<Option<Session>>;
    fn delete_session(&self, key_hash: &str) -> Result<bool>;

    // Channel operations
    fn create_channel(&self, channel: &Channel) -> Result<()>;
    /// Writes the root node, channel, editor link and primary token in one transaction.
    /// A taken token fails with `AlreadyExists` and leaves nothing behind.
    fn create_channel_with_tree(&self, draft: &ChannelDraft) -> Result<()>;
    fn get_channel(&self, id: &str) -> Result<Option<Channel>>;
    fn first_channel(&self) -> Result<Option<Channel>>;
    fn first_edited_channel(&self, user_id: &str) -> Result<Option<Channel>>;
    fn set_channel_priority(&self, id: &str, priority: i64) -> Result<bool>;
    fn set_channel_deleted(&self, id: &str, deleted: bool) -> Result<bool>;
    fn set_channel_staging_tree(&self, id: &str, tree_id: Option<&str>) -> Result<bool>;
    /// Promotes the staging tree to main, keeping the old main as previous.
    fn activate_channel(&self, id: &str) -> Result<()>;

    // Channel membership
    fn add_channel_editor(&self, channel_id: &str, user_id: &str) -> Result<()>;
    fn add_channel_viewer(&self, channel_id: &str, user_id: &str) -> Result<()>;
    fn is_channel_editor(&self, channel_id: &str, user_id: &str) -> Result<bool>;
    fn is_channel_viewer(&self, channel_id: &str, user_id: &str) -> Result<bool>;

    // Bookmarks
    fn add_bookmark(&self, channel_id: &str, user_id: &str) -> Result<()>;
    fn remove_bookmark(&self, channel_id: &str, user_id: &str) -> Result<bool>;
    fn is_bookmarked(&self, channel_id: &str, user_id: &str) -> Result<bool>;

    // Listings and aggregates
    fn list_accessible_channels(&self, query: &AccessibleChannelQuery) -> Result<Vec<ChannelAggregate>>;
    fn list_channel_picker(
        &self,
        user_id: &str,
        exclude_channel_id: &str,
    ) -> Result<Vec<ChannelPickerEntry>>;
    fn count_resources(&self, tree_id: &str) -> Result<i64>;
    fn tree_stats(&self, tree_id: &str) -> Result<TreeStats>;

    // Content node operations
    fn create_content_node(&self, node: &ContentNode) -> Result<()>;
    fn get_content_node(&self, id: &str) -> Result<Option<ContentNode>>;
    /// First node of `kind` in the trees of channels the user edits or that are public.
    fn find_sample_node(
        &self,
        user_id: &str,
        kind: Option<ContentKind>,
        imported: bool,
    ) -> Result<Option<ContentNode>>;

    // Secret token operations
    fn create_secret_token(&self, token: &SecretToken) -> Result<()>;
    fn get_secret_token(&self, token: &str) -> Result<Option<SecretToken>>;
    fn get_secret_token_by_id(&self, id: &str) -> Result<Option<SecretToken>>;
    fn add_channel_secret_token(&self, channel_id: &str, secret_token_id: &str) -> Result<()>;
    fn get_primary_secret_token(&self, channel_id: &str) -> Result<Option<SecretToken>>;
    fn set_secret_token_channels(&self, secret_token_id: &str, channel_ids: &[String]) -> Result<()>;
    fn list_secret_token_channels(&self, secret_token_id: &str) -> Result<Vec<Channel>>;

    // Channel set operations
    fn create_channel_set(&self, set: &ChannelSet, editor_ids: &[String]) -> Result<()>;
    fn list_user_channel_sets(&self, user_id: &str) -> Result<Vec<ChannelSet>>;

    // Invitation operations
    fn create_invitation(&self, invitation: &Invitation) -> Result<()>;
    fn get_invitation(&self, id: &str) -> Result<Option<Invitation>>;
    /// Grants the invitation's access to `user_id` and consumes the invitation.
    fn accept_invitation(&self, invitation: &Invitation, user_id: &str) -> Result<()>;

    // Task operations
    fn create_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;

    // Constants
    fn list_content_kinds(&self) -> Result<Vec<ContentKind>>;
    fn list_licenses(&self) -> Result<Vec<License>>;
}
