//! CRUD operations for [`User`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewUser, StatusUpdate, User};
use crate::sql::{not_found, now, ts, ts_at, uuid_at};

const USER_COLUMNS: &str = "id, name, status, status_message, profile_image, created_at";

impl Database {
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            status: new.status,
            status_message: new.status_message.clone(),
            profile_image: new.profile_image.clone(),
            created_at: now(),
        };

        self.conn().execute(
            "INSERT INTO users (id, name, status, status_message, profile_image, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.name,
                user.status.as_str(),
                user.status_message,
                user.profile_image,
                ts(&user.created_at),
            ],
        )?;
        Ok(user)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// First user (by creation time) with exactly this name.
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        match self.conn().query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE name = ?1
                 ORDER BY created_at ASC, rowid ASC LIMIT 1"
            ),
            params![name],
            row_to_user,
        ) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All users in creation order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Apply a partial status update and return the updated user.
    pub fn update_user_status(&self, id: Uuid, update: &StatusUpdate) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users
             SET status = COALESCE(?2, status),
                 status_message = COALESCE(?3, status_message)
             WHERE id = ?1",
            params![
                id.to_string(),
                update.status.map(|s| s.as_str()),
                update.status_message,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    pub fn set_profile_image(&self, id: Uuid, profile_image: &str) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users SET profile_image = ?2 WHERE id = ?1",
            params![id.to_string(), profile_image],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    pub(crate) fn user_exists(&self, id: Uuid) -> Result<bool> {
        let found: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let status_str: String = row.get(2)?;
    let status = status_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(User {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        status,
        status_message: row.get(3)?,
        profile_image: row.get(4)?,
        created_at: ts_at(row, 5)?,
    })
}
