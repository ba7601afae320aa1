use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Reactions: presence flags keyed by (message, user, emoji)
CREATE TABLE IF NOT EXISTS reactions (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    message_id TEXT NOT NULL,              -- FK -> messages(id)
    user_id    TEXT NOT NULL,              -- FK -> users(id)
    emoji      TEXT NOT NULL,              -- emoji character(s)
    created_at TEXT NOT NULL,

    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)    REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_reactions_message ON reactions(message_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_reactions_unique ON reactions(message_id, user_id, emoji);

-- Threads: at most one per parent message
CREATE TABLE IF NOT EXISTS threads (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    message_id TEXT NOT NULL,              -- FK -> messages(id)
    created_at TEXT NOT NULL,

    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_threads_message ON threads(message_id);

CREATE TABLE IF NOT EXISTS thread_messages (
    id        TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    thread_id TEXT NOT NULL,               -- FK -> threads(id)
    user_id   TEXT NOT NULL,               -- FK -> users(id)
    content   TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    file_id   TEXT,                        -- FK -> files(id)

    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id)   REFERENCES users(id),
    FOREIGN KEY (file_id)   REFERENCES files(id)
);

CREATE INDEX IF NOT EXISTS idx_thread_messages_ts ON thread_messages(thread_id, timestamp);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
