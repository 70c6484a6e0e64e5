pub const SCHEMA: &str = r#"
-- Accounts
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    password_hash TEXT,                    -- argon2id PHC string, NULL = token-only account
    is_admin INTEGER NOT NULL DEFAULT 0,
    policies_accepted INTEGER NOT NULL DEFAULT 0,
    content_defaults TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- API tokens are credentials for a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,
    token_lookup TEXT NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Browser sessions, keyed by sha256 of the cookie value
CREATE TABLE IF NOT EXISTS sessions (
    key_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL
);

-- Content trees: every node of a tree shares tree_id
CREATE TABLE IF NOT EXISTS content_nodes (
    id TEXT PRIMARY KEY,
    tree_id TEXT NOT NULL,
    parent_id TEXT REFERENCES content_nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL REFERENCES content_kinds(kind),
    title TEXT NOT NULL DEFAULT '',
    content_id TEXT NOT NULL,
    freeze_authoring_data INTEGER NOT NULL DEFAULT 0,
    sort_order REAL NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    public INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,    -- soft delete
    priority INTEGER NOT NULL DEFAULT 0,
    main_tree_id TEXT REFERENCES content_nodes(id) ON DELETE SET NULL,
    staging_tree_id TEXT REFERENCES content_nodes(id) ON DELETE SET NULL,
    previous_tree_id TEXT REFERENCES content_nodes(id) ON DELETE SET NULL,
    ricecooker_version TEXT,
    content_defaults TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS channel_editors (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (channel_id, user_id)
);

CREATE TABLE IF NOT EXISTS channel_viewers (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (channel_id, user_id)
);

CREATE TABLE IF NOT EXISTS channel_bookmarks (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (channel_id, user_id)
);

-- Shareable tokens granting access to one or more channels
CREATE TABLE IF NOT EXISTS secret_tokens (
    id TEXT PRIMARY KEY,
    token TEXT NOT NULL UNIQUE,
    is_primary INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS channel_secret_tokens (
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    secret_token_id TEXT NOT NULL REFERENCES secret_tokens(id) ON DELETE CASCADE,
    PRIMARY KEY (channel_id, secret_token_id)
);

-- A channel set is defined by the channels of its secret token
CREATE TABLE IF NOT EXISTS channel_sets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    secret_token_id TEXT NOT NULL REFERENCES secret_tokens(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS channel_set_editors (
    channel_set_id TEXT NOT NULL REFERENCES channel_sets(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (channel_set_id, user_id)
);

CREATE TABLE IF NOT EXISTS invitations (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    invited_id TEXT REFERENCES users(id) ON DELETE CASCADE,
    sender_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    share_mode TEXT NOT NULL DEFAULT 'edit',
    created_at TEXT DEFAULT (datetime('now'))
);

-- Background jobs handed to the task executor
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    task_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'QUEUED',
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    metadata TEXT NOT NULL DEFAULT '{}',
    args TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now'))
);

-- Constants
CREATE TABLE IF NOT EXISTS content_kinds (
    kind TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS licenses (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    license_exists INTEGER NOT NULL DEFAULT 1,
    is_custom INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO content_kinds (kind) VALUES
    ('topic'), ('video'), ('audio'), ('exercise'), ('document'), ('html5'), ('slideshow');

INSERT OR IGNORE INTO licenses (id, name, license_exists, is_custom) VALUES
    (1, 'CC BY', 1, 0),
    (2, 'CC BY-SA', 1, 0),
    (3, 'CC BY-ND', 1, 0),
    (4, 'CC BY-NC', 1, 0),
    (5, 'CC BY-NC-SA', 1, 0),
    (6, 'CC BY-NC-ND', 1, 0),
    (7, 'All Rights Reserved', 1, 0),
    (8, 'Public Domain', 1, 0),
    (9, 'Special Permissions', 1, 1);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_content_nodes_tree ON content_nodes(tree_id, kind);
CREATE INDEX IF NOT EXISTS idx_content_nodes_parent ON content_nodes(parent_id);
CREATE INDEX IF NOT EXISTS idx_channels_main_tree ON channels(main_tree_id);
CREATE INDEX IF NOT EXISTS idx_channel_editors_user ON channel_editors(user_id);
CREATE INDEX IF NOT EXISTS idx_channel_viewers_user ON channel_viewers(user_id);
CREATE INDEX IF NOT EXISTS idx_invitations_channel ON invitations(channel_id);
CREATE INDEX IF NOT EXISTS idx_channel_set_editors_user ON channel_set_editors(user_id);
"#;
