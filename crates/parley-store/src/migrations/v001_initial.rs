//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `channels`, `files`, and
//! `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name           TEXT NOT NULL,               -- not unique
    status         TEXT NOT NULL DEFAULT 'offline',
    status_message TEXT NOT NULL DEFAULT '',
    profile_image  TEXT,                        -- data URL or /files/<id>
    created_at     TEXT NOT NULL                -- RFC-3339, microseconds
);

CREATE INDEX IF NOT EXISTS idx_users_name ON users(name);

-- ----------------------------------------------------------------
-- Channels
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    name       TEXT NOT NULL,                   -- duplicates allowed
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channels_name ON channels(name);

-- ----------------------------------------------------------------
-- Files (upload metadata; bytes live in the blob store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS files (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    name       TEXT NOT NULL,
    mime_type  TEXT NOT NULL,
    size       INTEGER NOT NULL,
    locator    TEXT NOT NULL,                   -- blob store key
    created_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    content    TEXT NOT NULL,
    timestamp  TEXT NOT NULL,                   -- RFC-3339, microseconds
    user_id    TEXT NOT NULL,                   -- FK -> users(id)
    channel_id TEXT,                            -- FK -> channels(id)
    avatar_id  TEXT,                            -- avatar conversation key
    file_id    TEXT,                            -- FK -> files(id)

    CHECK ((channel_id IS NULL) <> (avatar_id IS NULL)),
    FOREIGN KEY (user_id)    REFERENCES users(id),
    FOREIGN KEY (channel_id) REFERENCES channels(id) ON DELETE CASCADE,
    FOREIGN KEY (file_id)    REFERENCES files(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts
    ON messages(channel_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_messages_avatar_ts
    ON messages(avatar_id, timestamp);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
