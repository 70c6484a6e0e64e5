use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Channel, ContentKind, TreeStats};

/// One compared statistic between the live and staged trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub field: String,
    pub live: i64,
    pub staged: i64,
    pub difference: i64,
}

impl DiffRow {
    fn new(field: impl Into<String>, live: i64, staged: i64) -> Self {
        Self {
            field: field.into(),
            live,
            staged,
            difference: staged - live,
        }
    }
}

fn kind_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Topic => "# of Topics",
        ContentKind::Video => "# of Videos",
        ContentKind::Audio => "# of Audio Files",
        ContentKind::Exercise => "# of Exercises",
        ContentKind::Document => "# of Documents",
        ContentKind::Html5 => "# of HTML5 Apps",
        ContentKind::Slideshow => "# of Slideshows",
    }
}

fn stats_for(store: &dyn Store, tree_id: Option<&str>) -> Result<TreeStats> {
    match tree_id {
        Some(id) => store.tree_stats(id),
        None => Ok(TreeStats::default()),
    }
}

/// Compares the channel's main tree against its staging tree.
/// Fails with `NotFound` when nothing is staged.
pub fn staged_diff(store: &dyn Store, channel: &Channel) -> Result<Vec<DiffRow>> {
    let staging_tree_id = channel.staging_tree_id.as_deref().ok_or(Error::NotFound)?;

    let live = stats_for(store, channel.main_tree_id.as_deref())?;
    let staged = stats_for(store, Some(staging_tree_id))?;

    let mut rows: Vec<DiffRow> = ContentKind::ALL
        .into_iter()
        .map(|kind| DiffRow::new(kind_label(kind), live.count(kind), staged.count(kind)))
        .collect();
    rows.push(DiffRow::new(
        "# of Resources",
        live.resource_count,
        staged.resource_count,
    ));

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewChannel, NewNode, add_node, create_channel, create_staging_tree};
    use crate::store::SqliteStore;

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_no_staging_tree_is_not_found() {
        let store = store();
        let channel = create_channel(&store, NewChannel::named("Channel")).unwrap();
        assert!(matches!(staged_diff(&store, &channel), Err(Error::NotFound)));
    }

    #[test]
    fn test_diff_counts_by_kind() {
        let store = store();
        let channel = create_channel(&store, NewChannel::named("Channel")).unwrap();
        let main_root = channel.main_tree_id.clone().unwrap();
        add_node(&store, &main_root, NewNode::resource(ContentKind::Video, "c1")).unwrap();

        let staged = create_staging_tree(&store, &channel.id).unwrap();
        add_node(&store, &staged, NewNode::resource(ContentKind::Video, "c1")).unwrap();
        add_node(&store, &staged, NewNode::resource(ContentKind::Video, "c2")).unwrap();
        add_node(&store, &staged, NewNode::resource(ContentKind::Exercise, "c3")).unwrap();

        let channel = store.get_channel(&channel.id).unwrap().unwrap();
        let rows = staged_diff(&store, &channel).unwrap();

        let find = |field: &str| rows.iter().find(|r| r.field == field).unwrap().clone();
        assert_eq!(find("# of Videos"), DiffRow::new("# of Videos", 1, 2));
        assert_eq!(find("# of Exercises").difference, 1);
        assert_eq!(find("# of Topics"), DiffRow::new("# of Topics", 1, 1));
        assert_eq!(find("# of Resources"), DiffRow::new("# of Resources", 1, 3));
        assert_eq!(rows.len(), ContentKind::ALL.len() + 1);
    }
}
