//! File metadata records. Only the metadata lives here; the bytes are held
//! by the server's blob store under [`FileRecord::locator`].

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::FileRecord;
use crate::sql::{not_found, now, ts, ts_at, uuid_at};

impl Database {
    pub fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        size: i64,
        locator: &str,
    ) -> Result<FileRecord> {
        let file = FileRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size,
            locator: locator.to_string(),
            created_at: now(),
        };

        self.conn().execute(
            "INSERT INTO files (id, name, mime_type, size, locator, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.id.to_string(),
                file.name,
                file.mime_type,
                file.size,
                file.locator,
                ts(&file.created_at),
            ],
        )?;
        Ok(file)
    }

    pub fn get_file(&self, id: Uuid) -> Result<FileRecord> {
        self.conn()
            .query_row(
                "SELECT id, name, mime_type, size, locator, created_at
                 FROM files
                 WHERE id = ?1",
                params![id.to_string()],
                |row| row_to_file(row, 0),
            )
            .map_err(not_found)
    }

    pub fn count_files(&self) -> Result<u64> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub(crate) fn file_exists(&self, id: Uuid) -> Result<bool> {
        match self.get_file(id) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Map six consecutive columns starting at `offset` to a [`FileRecord`].
pub(crate) fn row_to_file(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: uuid_at(row, offset)?,
        name: row.get(offset + 1)?,
        mime_type: row.get(offset + 2)?,
        size: row.get(offset + 3)?,
        locator: row.get(offset + 4)?,
        created_at: ts_at(row, offset + 5)?,
    })
}

/// Like [`row_to_file`] for a LEFT JOIN: `None` when the id column is NULL.
pub(crate) fn row_to_opt_file(
    row: &rusqlite::Row<'_>,
    offset: usize,
) -> rusqlite::Result<Option<FileRecord>> {
    let id: Option<String> = row.get(offset)?;
    match id {
        Some(_) => row_to_file(row, offset).map(Some),
        None => Ok(None),
    }
}
