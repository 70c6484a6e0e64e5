use serde::Serialize;

use crate::types::ChannelAggregate;

/// Public shape of a channel in the import listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    /// Id of the channel's main tree root, not of the channel itself.
    pub id: String,
    pub title: String,
    pub metadata: ChannelMetadata,
    pub children: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelMetadata {
    pub resource_count: i64,
}

/// A childless root aggregates to a single null slot; present it as no children.
fn normalize_children(children: Vec<Option<String>>) -> Vec<Option<String>> {
    if matches!(children.as_slice(), [None]) {
        Vec::new()
    } else {
        children
    }
}

#[must_use]
pub fn project_channel(row: ChannelAggregate) -> ChannelSummary {
    ChannelSummary {
        id: row.main_tree_id,
        title: row.name,
        metadata: ChannelMetadata {
            resource_count: row.resource_count,
        },
        children: normalize_children(row.children),
    }
}

#[must_use]
pub fn project_channels(rows: Vec<ChannelAggregate>) -> Vec<ChannelSummary> {
    rows.into_iter().map(project_channel).collect()
}
