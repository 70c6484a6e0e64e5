//! Channel-level operations shared by the handlers: creating channels and
//! their trees, projecting aggregated rows, and comparing staged content.

mod diff;
mod projection;

pub use diff::{DiffRow, staged_diff};
pub use projection::{ChannelMetadata, ChannelSummary, project_channel, project_channels};

use chrono::Utc;
use uuid::Uuid;

use crate::auth::generate_channel_token;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Channel, ChannelDraft, ContentKind, ContentNode, SecretToken};

const TOKEN_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct NewChannel {
    pub name: String,
    pub public: bool,
    pub editor_id: Option<String>,
}

impl NewChannel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    #[must_use]
    pub fn edited_by(mut self, user_id: impl Into<String>) -> Self {
        self.editor_id = Some(user_id.into());
        self
    }
}

/// A node to insert under an existing parent.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub kind: ContentKind,
    pub title: String,
    pub content_id: String,
    pub imported: bool,
}

impl NewNode {
    pub fn topic(title: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Topic,
            title: title.into(),
            content_id: Uuid::new_v4().to_string(),
            imported: false,
        }
    }

    pub fn resource(kind: ContentKind, content_id: impl Into<String>) -> Self {
        let content_id = content_id.into();
        Self {
            kind,
            title: content_id.clone(),
            content_id,
            imported: false,
        }
    }

    #[must_use]
    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }
}

fn root_node(title: &str) -> ContentNode {
    let id = Uuid::new_v4().to_string();
    ContentNode {
        id: id.clone(),
        tree_id: id.clone(),
        parent_id: None,
        kind: ContentKind::Topic,
        title: title.to_string(),
        content_id: id,
        freeze_authoring_data: false,
        sort_order: 1.0,
        created_at: Utc::now(),
    }
}

fn primary_token() -> SecretToken {
    SecretToken {
        id: Uuid::new_v4().to_string(),
        token: generate_channel_token(),
        is_primary: true,
    }
}

/// Creates a channel with an empty main tree and a primary secret token.
/// Either every row is written or none is.
pub fn create_channel(store: &dyn Store, new: NewChannel) -> Result<Channel> {
    let root = root_node(&new.name);
    let now = Utc::now();

    let channel = Channel {
        id: Uuid::new_v4().simple().to_string(),
        name: new.name,
        description: String::new(),
        public: new.public,
        deleted: false,
        priority: 0,
        main_tree_id: Some(root.id.clone()),
        staging_tree_id: None,
        previous_tree_id: None,
        ricecooker_version: None,
        content_defaults: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    };

    let mut draft = ChannelDraft {
        channel,
        root,
        editor_id: new.editor_id,
        primary_token: primary_token(),
    };

    for _ in 0..TOKEN_ATTEMPTS {
        match store.create_channel_with_tree(&draft) {
            Ok(()) => return Ok(draft.channel),
            Err(Error::AlreadyExists) => draft.primary_token = primary_token(),
            Err(e) => return Err(e),
        }
    }
    Err(Error::AlreadyExists)
}

/// Starts an empty staging tree for the channel and returns its root id.
pub fn create_staging_tree(store: &dyn Store, channel_id: &str) -> Result<String> {
    let channel = store.get_channel(channel_id)?.ok_or(Error::NotFound)?;
    let root = root_node(&channel.name);
    store.create_content_node(&root)?;
    store.set_channel_staging_tree(channel_id, Some(&root.id))?;
    Ok(root.id)
}

/// Inserts a node as the last child of `parent_id`, in the parent's tree.
pub fn add_node(store: &dyn Store, parent_id: &str, new: NewNode) -> Result<ContentNode> {
    let parent = store.get_content_node(parent_id)?.ok_or(Error::NotFound)?;

    let node = ContentNode {
        id: Uuid::new_v4().to_string(),
        tree_id: parent.tree_id,
        parent_id: Some(parent.id),
        kind: new.kind,
        title: new.title,
        content_id: new.content_id,
        freeze_authoring_data: new.imported,
        sort_order: Utc::now().timestamp_micros() as f64,
        created_at: Utc::now(),
    };
    store.create_content_node(&node)?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::AccessibleChannelQuery;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_create_channel_has_tree_and_primary_token() {
        let store = store();
        let channel = create_channel(&store, NewChannel::named("Biology").public()).unwrap();

        let root_id = channel.main_tree_id.as_deref().unwrap();
        let root = store.get_content_node(root_id).unwrap().unwrap();
        assert_eq!(root.tree_id, root.id);
        assert_eq!(root.kind, ContentKind::Topic);

        let token = store.get_primary_secret_token(&channel.id).unwrap().unwrap();
        assert_eq!(token.token.len(), 10);
    }

    #[test]
    fn test_failed_create_channel_leaves_nothing_behind() {
        let store = store();

        let result = create_channel(&store, NewChannel::named("Orphan").edited_by("ghost"));

        assert!(matches!(result, Err(Error::Database(_))));
        assert!(store.first_channel().unwrap().is_none());
    }

    #[test]
    fn test_add_node_joins_parent_tree() {
        let store = store();
        let channel = create_channel(&store, NewChannel::named("Biology")).unwrap();
        let root_id = channel.main_tree_id.clone().unwrap();

        let topic = add_node(&store, &root_id, NewNode::topic("Cells")).unwrap();
        let video = add_node(&store, &topic.id, NewNode::resource(ContentKind::Video, "c1")).unwrap();

        assert_eq!(video.tree_id, root_id);
        assert_eq!(video.parent_id.as_deref(), Some(topic.id.as_str()));
        assert!(matches!(
            add_node(&store, "missing", NewNode::topic("x")),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_listing_projects_through_catalog() {
        let store = store();
        let channel = create_channel(&store, NewChannel::named("Empty").public()).unwrap();

        let rows = store
            .list_accessible_channels(&AccessibleChannelQuery {
                user_id: "nobody".to_string(),
                exclude_channel_id: None,
                public_only: false,
            })
            .unwrap();
        let summaries = project_channels(rows);

        assert_eq!(summaries.len(), 1);
        assert_eq!(Some(summaries[0].id.clone()), channel.main_tree_id);
        assert!(summaries[0].children.is_empty());
        assert_eq!(summaries[0].metadata.resource_count, 0);
    }
}
