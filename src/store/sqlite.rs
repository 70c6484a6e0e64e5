use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, is_admin, policies_accepted, content_defaults, created_at, updated_at";

const CHANNEL_COLUMNS: &str = "c.id, c.name, c.description, c.public, c.deleted, c.priority, c.main_tree_id, c.staging_tree_id, c.previous_tree_id, c.ricecooker_version, c.content_defaults, c.created_at, c.updated_at";

const NODE_COLUMNS: &str = "n.id, n.tree_id, n.parent_id, n.kind, n.title, n.content_id, n.freeze_authoring_data, n.sort_order, n.created_at";

const TASK_COLUMNS: &str = "id, task_type, status, user_id, metadata, args, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Each call gets a fresh one.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn kind_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ContentKind> {
    let raw: String = row.get(idx)?;
    ContentKind::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown content kind '{raw}'")))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_channel(conn: &Connection, channel: &Channel) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO channels (id, name, description, public, deleted, priority, main_tree_id,
                               staging_tree_id, previous_tree_id, ricecooker_version,
                               content_defaults, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            channel.id,
            channel.name,
            channel.description,
            channel.public,
            channel.deleted,
            channel.priority,
            channel.main_tree_id,
            channel.staging_tree_id,
            channel.previous_tree_id,
            channel.ricecooker_version,
            channel.content_defaults.to_string(),
            format_datetime(&channel.created_at),
            format_datetime(&channel.updated_at),
        ],
    )?;
    Ok(())
}

fn insert_content_node(conn: &Connection, node: &ContentNode) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO content_nodes (id, tree_id, parent_id, kind, title, content_id,
                                    freeze_authoring_data, sort_order, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            node.id,
            node.tree_id,
            node.parent_id,
            node.kind.as_str(),
            node.title,
            node.content_id,
            node.freeze_authoring_data,
            node.sort_order,
            format_datetime(&node.created_at),
        ],
    )?;
    Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        is_admin: row.get(5)?,
        policies_accepted: row.get(6)?,
        content_defaults: json_column(row, 7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        public: row.get(3)?,
        deleted: row.get(4)?,
        priority: row.get(5)?,
        main_tree_id: row.get(6)?,
        staging_tree_id: row.get(7)?,
        previous_tree_id: row.get(8)?,
        ricecooker_version: row.get(9)?,
        content_defaults: json_column(row, 10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<ContentNode> {
    Ok(ContentNode {
        id: row.get(0)?,
        tree_id: row.get(1)?,
        parent_id: row.get(2)?,
        kind: kind_column(row, 3)?,
        title: row.get(4)?,
        content_id: row.get(5)?,
        freeze_authoring_data: row.get(6)?,
        sort_order: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(2)?;
    Ok(Task {
        id: row.get(0)?,
        task_type: row.get(1)?,
        status: TaskStatus::parse(&status)
            .ok_or_else(|| conversion_error(2, format!("unknown task status '{status}'")))?,
        user_id: row.get(3)?,
        metadata: json_column(row, 4)?,
        args: json_column(row, 5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn secret_token_from_row(row: &Row<'_>) -> rusqlite::Result<SecretToken> {
    Ok(SecretToken {
        id: row.get(0)?,
        token: row.get(1)?,
        is_primary: row.get(2)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, email, first_name, last_name, password_hash, is_admin,
                                policies_accepted, content_defaults, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.is_admin,
                user.policies_accepted,
                user.content_defaults.to_string(),
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn accept_policies(&self, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE users SET policies_accepted = 1, updated_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), user_id],
        )?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row
                        .get::<_, Option<String>>(5)?
                        .map(|s| parse_datetime(&s)),
                    last_used_at: row
                        .get::<_, Option<String>>(6)?
                        .map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (key_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.key_hash,
                session.user_id,
                format_datetime(&session.created_at),
                format_datetime(&session.expires_at),
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, key_hash: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT key_hash, user_id, created_at, expires_at FROM sessions WHERE key_hash = ?1",
            params![key_hash],
            |row| {
                Ok(Session {
                    key_hash: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    expires_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, key_hash: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE key_hash = ?1", params![key_hash])?;
        Ok(rows > 0)
    }

    // Channel operations

    fn create_channel(&self, channel: &Channel) -> Result<()> {
        insert_channel(&self.conn(), channel)?;
        Ok(())
    }

    fn create_channel_with_tree(&self, draft: &ChannelDraft) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        insert_content_node(&tx, &draft.root)?;
        insert_channel(&tx, &draft.channel)?;

        if let Some(editor_id) = &draft.editor_id {
            tx.execute(
                "INSERT INTO channel_editors (channel_id, user_id) VALUES (?1, ?2)",
                params![draft.channel.id, editor_id],
            )?;
        }

        let token = &draft.primary_token;
        match tx.execute(
            "INSERT INTO secret_tokens (id, token, is_primary) VALUES (?1, ?2, ?3)",
            params![token.id, token.token, token.is_primary],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(Error::AlreadyExists),
            Err(e) => return Err(Error::from(e)),
        }
        tx.execute(
            "INSERT INTO channel_secret_tokens (channel_id, secret_token_id) VALUES (?1, ?2)",
            params![draft.channel.id, token.id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_channel(&self, id: &str) -> Result<Option<Channel>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels c WHERE c.id = ?1"),
            params![id],
            channel_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn first_channel(&self) -> Result<Option<Channel>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels c ORDER BY c.created_at, c.id LIMIT 1"),
            [],
            channel_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn first_edited_channel(&self, user_id: &str) -> Result<Option<Channel>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {CHANNEL_COLUMNS} FROM channels c
                 JOIN channel_editors e ON e.channel_id = c.id
                 WHERE e.user_id = ?1
                 ORDER BY c.created_at, c.id LIMIT 1"
            ),
            params![user_id],
            channel_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_channel_priority(&self, id: &str, priority: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE channels SET priority = ?1, updated_at = ?2 WHERE id = ?3",
            params![priority, format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn set_channel_deleted(&self, id: &str, deleted: bool) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE channels SET deleted = ?1, updated_at = ?2 WHERE id = ?3",
            params![deleted, format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn set_channel_staging_tree(&self, id: &str, tree_id: Option<&str>) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE channels SET staging_tree_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![tree_id, format_datetime(&Utc::now()), id],
        )?;
        Ok(rows > 0)
    }

    fn activate_channel(&self, id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let staging: Option<String> = tx
            .query_row(
                "SELECT staging_tree_id FROM channels WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        let staging = staging
            .ok_or_else(|| Error::BadRequest("channel has no staging tree".to_string()))?;

        tx.execute(
            "UPDATE channels
             SET previous_tree_id = main_tree_id, main_tree_id = ?1, staging_tree_id = NULL,
                 updated_at = ?2
             WHERE id = ?3",
            params![staging, format_datetime(&Utc::now()), id],
        )?;

        tx.commit()?;
        Ok(())
    }

    // Channel membership

    fn add_channel_editor(&self, channel_id: &str, user_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO channel_editors (channel_id, user_id) VALUES (?1, ?2)",
            params![channel_id, user_id],
        )?;
        Ok(())
    }

    fn add_channel_viewer(&self, channel_id: &str, user_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO channel_viewers (channel_id, user_id) VALUES (?1, ?2)",
            params![channel_id, user_id],
        )?;
        Ok(())
    }

    fn is_channel_editor(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM channel_editors WHERE channel_id = ?1 AND user_id = ?2)",
            params![channel_id, user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn is_channel_viewer(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM channel_viewers WHERE channel_id = ?1 AND user_id = ?2)",
            params![channel_id, user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // Bookmarks

    fn add_bookmark(&self, channel_id: &str, user_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO channel_bookmarks (channel_id, user_id) VALUES (?1, ?2)",
            params![channel_id, user_id],
        )?;
        Ok(())
    }

    fn remove_bookmark(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM channel_bookmarks WHERE channel_id = ?1 AND user_id = ?2",
            params![channel_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn is_bookmarked(&self, channel_id: &str, user_id: &str) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM channel_bookmarks WHERE channel_id = ?1 AND user_id = ?2)",
            params![channel_id, user_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // Listings and aggregates

    fn list_accessible_channels(&self, query: &AccessibleChannelQuery) -> Result<Vec<ChannelAggregate>> {
        let conn = self.conn();
        // Membership is tested with EXISTS so no join can multiply channel rows; the
        // resource count is a correlated subquery so it never sees the children join.
        let mut stmt = conn.prepare(
            "SELECT root.id, c.name,
                    (SELECT COUNT(DISTINCT n.content_id) FROM content_nodes n
                     WHERE n.tree_id = root.tree_id AND n.kind <> 'topic') AS resource_count,
                    json_group_array(child.id ORDER BY child.sort_order, child.id) AS children
             FROM channels c
             JOIN content_nodes root ON root.id = c.main_tree_id
             LEFT JOIN content_nodes child ON child.parent_id = root.id
             WHERE c.deleted = 0
               AND (?2 IS NULL OR c.id <> ?2)
               AND (c.public = 1 OR (?3 = 0 AND (
                    EXISTS (SELECT 1 FROM channel_editors e WHERE e.channel_id = c.id AND e.user_id = ?1)
                    OR EXISTS (SELECT 1 FROM channel_viewers v WHERE v.channel_id = c.id AND v.user_id = ?1))))
             GROUP BY c.id
             ORDER BY c.name, c.id",
        )?;

        let rows = stmt.query_map(
            params![query.user_id, query.exclude_channel_id, query.public_only],
            |row| {
                let children: String = row.get(3)?;
                Ok(ChannelAggregate {
                    main_tree_id: row.get(0)?,
                    name: row.get(1)?,
                    resource_count: row.get(2)?,
                    children: serde_json::from_str(&children)
                        .map_err(|e| conversion_error(3, e.to_string()))?,
                })
            },
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_channel_picker(
        &self,
        user_id: &str,
        exclude_channel_id: &str,
    ) -> Result<Vec<ChannelPickerEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name,
                    EXISTS (SELECT 1 FROM channel_editors e WHERE e.channel_id = c.id AND e.user_id = ?1)
             FROM channels c
             WHERE c.deleted = 0 AND c.id <> ?2
               AND (EXISTS (SELECT 1 FROM channel_editors e WHERE e.channel_id = c.id AND e.user_id = ?1)
                    OR EXISTS (SELECT 1 FROM channel_viewers v WHERE v.channel_id = c.id AND v.user_id = ?1))
             ORDER BY c.name, c.id",
        )?;

        let rows = stmt.query_map(params![user_id, exclude_channel_id], |row| {
            let is_editor: bool = row.get(2)?;
            Ok(ChannelPickerEntry {
                id: row.get(0)?,
                name: row.get(1)?,
                is_view_only: !is_editor,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_resources(&self, tree_id: &str) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(DISTINCT content_id) FROM content_nodes WHERE tree_id = ?1 AND kind <> 'topic'",
            params![tree_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn tree_stats(&self, tree_id: &str) -> Result<TreeStats> {
        let kind_counts = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT kind, COUNT(*) FROM content_nodes WHERE tree_id = ?1 GROUP BY kind ORDER BY kind",
            )?;
            let rows = stmt.query_map(params![tree_id], |row| {
                Ok((kind_column(row, 0)?, row.get::<_, i64>(1)?))
            })?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        Ok(TreeStats {
            kind_counts,
            resource_count: self.count_resources(tree_id)?,
        })
    }

    // Content node operations

    fn create_content_node(&self, node: &ContentNode) -> Result<()> {
        insert_content_node(&self.conn(), node)?;
        Ok(())
    }

    fn get_content_node(&self, id: &str) -> Result<Option<ContentNode>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM content_nodes n WHERE n.id = ?1"),
            params![id],
            node_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn find_sample_node(
        &self,
        user_id: &str,
        kind: Option<ContentKind>,
        imported: bool,
    ) -> Result<Option<ContentNode>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {NODE_COLUMNS} FROM content_nodes n
                 WHERE n.tree_id IN (
                     SELECT root.tree_id FROM channels c
                     JOIN content_nodes root ON root.id = c.main_tree_id
                     WHERE c.deleted = 0
                       AND (c.public = 1 OR EXISTS (
                            SELECT 1 FROM channel_editors e WHERE e.channel_id = c.id AND e.user_id = ?1)))
                   AND (?2 IS NULL OR n.kind = ?2)
                   AND n.freeze_authoring_data = ?3
                   AND (?3 = 0 OR n.kind <> 'topic')
                 ORDER BY n.created_at, n.id LIMIT 1"
            ),
            params![user_id, kind.map(ContentKind::as_str), imported],
            node_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Secret token operations

    fn create_secret_token(&self, token: &SecretToken) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO secret_tokens (id, token, is_primary) VALUES (?1, ?2, ?3)",
            params![token.id, token.token, token.is_primary],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_secret_token(&self, token: &str) -> Result<Option<SecretToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token, is_primary FROM secret_tokens WHERE token = ?1",
            params![token],
            secret_token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_secret_token_by_id(&self, id: &str) -> Result<Option<SecretToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token, is_primary FROM secret_tokens WHERE id = ?1",
            params![id],
            secret_token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn add_channel_secret_token(&self, channel_id: &str, secret_token_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO channel_secret_tokens (channel_id, secret_token_id) VALUES (?1, ?2)",
            params![channel_id, secret_token_id],
        )?;
        Ok(())
    }

    fn get_primary_secret_token(&self, channel_id: &str) -> Result<Option<SecretToken>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT t.id, t.token, t.is_primary FROM secret_tokens t
             JOIN channel_secret_tokens ct ON ct.secret_token_id = t.id
             WHERE ct.channel_id = ?1 AND t.is_primary = 1
             ORDER BY t.id LIMIT 1",
            params![channel_id],
            secret_token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_secret_token_channels(&self, secret_token_id: &str, channel_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM channel_secret_tokens WHERE secret_token_id = ?1",
            params![secret_token_id],
        )?;

        {
            // Unknown channel ids are skipped rather than rejected.
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO channel_secret_tokens (channel_id, secret_token_id)
                 SELECT id, ?2 FROM channels WHERE id = ?1",
            )?;
            for channel_id in channel_ids {
                stmt.execute(params![channel_id, secret_token_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_secret_token_channels(&self, secret_token_id: &str) -> Result<Vec<Channel>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels c
             JOIN channel_secret_tokens ct ON ct.channel_id = c.id
             WHERE ct.secret_token_id = ?1 AND c.deleted = 0
             ORDER BY c.name, c.id"
        ))?;

        let rows = stmt.query_map(params![secret_token_id], channel_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Channel set operations

    fn create_channel_set(&self, set: &ChannelSet, editor_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO channel_sets (id, name, description, secret_token_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                set.id,
                set.name,
                set.description,
                set.secret_token_id,
                format_datetime(&set.created_at),
            ],
        )?;

        for user_id in editor_ids {
            tx.execute(
                "INSERT OR IGNORE INTO channel_set_editors (channel_set_id, user_id) VALUES (?1, ?2)",
                params![set.id, user_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_user_channel_sets(&self, user_id: &str) -> Result<Vec<ChannelSet>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.description, s.secret_token_id, s.created_at
             FROM channel_sets s
             JOIN channel_set_editors e ON e.channel_set_id = s.id
             WHERE e.user_id = ?1
             ORDER BY s.name, s.id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ChannelSet {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                secret_token_id: row.get(3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Invitation operations

    fn create_invitation(&self, invitation: &Invitation) -> Result<()> {
        self.conn().execute(
            "INSERT INTO invitations (id, channel_id, email, invited_id, sender_id, share_mode, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                invitation.id,
                invitation.channel_id,
                invitation.email,
                invitation.invited_id,
                invitation.sender_id,
                invitation.share_mode.as_str(),
                format_datetime(&invitation.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_invitation(&self, id: &str) -> Result<Option<Invitation>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, channel_id, email, invited_id, sender_id, share_mode, created_at
             FROM invitations WHERE id = ?1",
            params![id],
            |row| {
                let share_mode: String = row.get(5)?;
                Ok(Invitation {
                    id: row.get(0)?,
                    channel_id: row.get(1)?,
                    email: row.get(2)?,
                    invited_id: row.get(3)?,
                    sender_id: row.get(4)?,
                    share_mode: ShareMode::parse(&share_mode).ok_or_else(|| {
                        conversion_error(5, format!("unknown share mode '{share_mode}'"))
                    })?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn accept_invitation(&self, invitation: &Invitation, user_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let (grant, revoke) = match invitation.share_mode {
            ShareMode::View => ("channel_viewers", "channel_editors"),
            ShareMode::Edit => ("channel_editors", "channel_viewers"),
        };

        tx.execute(
            &format!("INSERT OR IGNORE INTO {grant} (channel_id, user_id) VALUES (?1, ?2)"),
            params![invitation.channel_id, user_id],
        )?;
        tx.execute(
            &format!("DELETE FROM {revoke} WHERE channel_id = ?1 AND user_id = ?2"),
            params![invitation.channel_id, user_id],
        )?;
        tx.execute(
            "DELETE FROM invitations WHERE id = ?1",
            params![invitation.id],
        )?;

        tx.commit()?;
        Ok(())
    }

    // Task operations

    fn create_task(&self, task: &Task) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tasks (id, task_type, status, user_id, metadata, args, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id,
                task.task_type,
                task.status.as_str(),
                task.user_id,
                task.metadata.to_string(),
                task.args.to_string(),
                format_datetime(&task.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            task_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    // Constants

    fn list_content_kinds(&self) -> Result<Vec<ContentKind>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT kind FROM content_kinds ORDER BY kind")?;
        let rows = stmt.query_map([], |row| kind_column(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_licenses(&self) -> Result<Vec<License>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, license_exists, is_custom FROM licenses ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(License {
                id: row.get(0)?,
                name: row.get(1)?,
                exists: row.get(2)?,
                is_custom: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
