use rusqlite::Connection;

// user_low < user_high (string order of the UUIDs), so a pair has one row
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS dm_pairs (
    channel_id TEXT PRIMARY KEY NOT NULL,     -- FK -> channels(id)
    user_low   TEXT NOT NULL,                 -- FK -> users(id)
    user_high  TEXT NOT NULL,                 -- FK -> users(id)

    FOREIGN KEY (channel_id) REFERENCES channels(id) ON DELETE CASCADE,
    FOREIGN KEY (user_low)   REFERENCES users(id),
    FOREIGN KEY (user_high)  REFERENCES users(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_dm_pairs_users ON dm_pairs(user_low, user_high);
CREATE INDEX IF NOT EXISTS idx_dm_pairs_high ON dm_pairs(user_high);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
