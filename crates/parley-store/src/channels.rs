//! CRUD operations for [`Channel`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Channel;
use crate::sql::{not_found, now, ts, ts_at, uuid_at};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new channel. Names are not checked for uniqueness.
    pub fn create_channel(&self, name: &str) -> Result<Channel> {
        let channel = Channel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now(),
        };
        self.insert_channel(&channel)?;
        Ok(channel)
    }

    pub(crate) fn insert_channel(&self, channel: &Channel) -> Result<()> {
        self.conn().execute(
            "INSERT INTO channels (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                channel.id.to_string(),
                channel.name,
                ts(&channel.created_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single channel by UUID.
    pub fn get_channel(&self, id: Uuid) -> Result<Channel> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at
                 FROM channels
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(not_found)
    }

    /// List all channels in creation order.
    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, created_at
             FROM channels
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map([], row_to_channel)?;

        let mut channels = Vec::new();
        for row in rows {
            channels.push(row?);
        }
        Ok(channels)
    }

    /// Channels whose name starts with `prefix`, in creation order.
    pub fn list_channels_with_prefix(&self, prefix: &str) -> Result<Vec<Channel>> {
        // substr() instead of LIKE: names may contain `_` and `%`
        let mut stmt = self.conn().prepare(
            "SELECT id, name, created_at
             FROM channels
             WHERE substr(name, 1, length(?1)) = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![prefix], row_to_channel)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub(crate) fn channel_exists(&self, id: Uuid) -> Result<bool> {
        let found: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM channels WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Channel`].
pub(crate) fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        created_at: ts_at(row, 2)?,
    })
}
