use std::collections::HashMap;

use parley_shared::MessageTarget;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::files::row_to_opt_file;
use crate::models::{Message, MessageDetails, NewMessage};
use crate::sql::{not_found, now, opt_uuid_at, ts, ts_at, uuid_at};

const DETAILS_SELECT: &str = "
    SELECT m.id, m.content, m.timestamp, m.user_id, m.channel_id, m.avatar_id, m.file_id,
           u.name, u.profile_image,
           (SELECT COUNT(*) FROM thread_messages tm
              JOIN threads t ON t.id = tm.thread_id
             WHERE t.message_id = m.id),
           f.id, f.name, f.mime_type, f.size, f.locator, f.created_at
      FROM messages m
      JOIN users u ON u.id = m.user_id
      LEFT JOIN files f ON f.id = m.file_id";

impl Database {
    /// Insert a message after checking that everything it points at exists.
    pub fn insert_message(&self, new: &NewMessage) -> Result<Message> {
        if !self.user_exists(new.user_id)? {
            return Err(StoreError::MissingReference("User"));
        }
        if let MessageTarget::Channel(channel_id) = &new.target {
            if !self.channel_exists(*channel_id)? {
                return Err(StoreError::MissingReference("Channel"));
            }
        }
        if let Some(file_id) = new.file_id {
            if !self.file_exists(file_id)? {
                return Err(StoreError::MissingReference("File"));
            }
        }

        let message = Message {
            id: Uuid::new_v4(),
            content: new.content.clone(),
            timestamp: now(),
            user_id: new.user_id,
            target: new.target.clone(),
            file_id: new.file_id,
        };

        self.conn().execute(
            "INSERT INTO messages (id, content, timestamp, user_id, channel_id, avatar_id, file_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id.to_string(),
                message.content,
                ts(&message.timestamp),
                message.user_id.to_string(),
                message.target.channel_id().map(|id| id.to_string()),
                message.target.avatar_id(),
                message.file_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(message)
    }

    pub fn get_message(&self, id: Uuid) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, content, timestamp, user_id, channel_id, avatar_id, file_id
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(not_found)
    }

    /// Messages of one conversation, oldest first, each joined with its
    /// author, reactions, reply count and attachment.
    pub fn list_message_details(&self, target: &MessageTarget) -> Result<Vec<MessageDetails>> {
        let (column, key) = target_filter(target);

        let mut stmt = self.conn().prepare(&format!(
            "{DETAILS_SELECT}
             WHERE m.{column} = ?1
             ORDER BY m.timestamp ASC, m.rowid ASC"
        ))?;
        let rows = stmt.query_map(params![key], row_to_details)?;
        let mut details = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        let mut reactions = self.reactions_for_target(column, &key)?;
        for item in &mut details {
            if let Some(emojis) = reactions.remove(&item.message.id) {
                item.reactions = emojis;
            }
        }
        Ok(details)
    }

    /// One message with the same joins as [`Database::list_message_details`].
    pub fn get_message_details(&self, id: Uuid) -> Result<MessageDetails> {
        let mut details = self
            .conn()
            .query_row(
                &format!("{DETAILS_SELECT} WHERE m.id = ?1"),
                params![id.to_string()],
                row_to_details,
            )
            .map_err(not_found)?;
        details.reactions = self
            .get_reactions_for_message(id)?
            .into_iter()
            .map(|r| r.emoji)
            .collect();
        Ok(details)
    }

    pub(crate) fn message_exists(&self, id: Uuid) -> Result<bool> {
        let found: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    /// Emojis of every message in a conversation, grouped by message.
    fn reactions_for_target(&self, column: &str, key: &str) -> Result<HashMap<Uuid, Vec<String>>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT r.message_id, r.emoji
               FROM reactions r
               JOIN messages m ON m.id = r.message_id
              WHERE m.{column} = ?1
              ORDER BY r.created_at ASC, r.rowid ASC"
        ))?;
        let rows = stmt.query_map(params![key], |row| {
            Ok((uuid_at(row, 0)?, row.get::<_, String>(1)?))
        })?;

        let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            let (message_id, emoji) = row?;
            map.entry(message_id).or_default().push(emoji);
        }
        Ok(map)
    }
}

/// Column and key selecting a conversation.
fn target_filter(target: &MessageTarget) -> (&'static str, String) {
    match target {
        MessageTarget::Channel(id) => ("channel_id", id.to_string()),
        MessageTarget::Avatar(avatar) => ("avatar_id", avatar.clone()),
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let channel_id = opt_uuid_at(row, 4)?;
    let avatar_id: Option<String> = row.get(5)?;
    let target = MessageTarget::from_selectors(channel_id, avatar_id).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(StoreError::Corrupt(
                "message must have exactly one of channel_id, avatar_id".into(),
            )),
        )
    })?;

    Ok(Message {
        id: uuid_at(row, 0)?,
        content: row.get(1)?,
        timestamp: ts_at(row, 2)?,
        user_id: uuid_at(row, 3)?,
        target,
        file_id: opt_uuid_at(row, 6)?,
    })
}

fn row_to_details(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageDetails> {
    let reply_count: i64 = row.get(9)?;
    Ok(MessageDetails {
        message: row_to_message(row)?,
        author_name: row.get(7)?,
        author_image: row.get(8)?,
        reactions: Vec::new(),
        reply_count: reply_count as u32,
        file: row_to_opt_file(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use parley_shared::UserStatus;

    use super::*;
    use crate::models::{NewUser, User};

    fn user(db: &Database, name: &str) -> User {
        db.create_user(&NewUser {
            name: name.into(),
            status: UserStatus::Online,
            status_message: String::new(),
            profile_image: Some(format!("img:{name}")),
        })
        .unwrap()
    }

    fn post(db: &Database, user: &User, target: MessageTarget, content: &str) -> Message {
        db.insert_message(&NewMessage {
            content: content.into(),
            user_id: user.id,
            target,
            file_id: None,
        })
        .unwrap()
    }

    #[test]
    fn fresh_message_has_no_reactions_or_replies() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let channel = db.create_channel("general").unwrap();
        post(&db, &alice, MessageTarget::Channel(channel.id), "hi");

        let listed = db
            .list_message_details(&MessageTarget::Channel(channel.id))
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message.content, "hi");
        assert_eq!(listed[0].author_name, "alice");
        assert_eq!(listed[0].author_image.as_deref(), Some("img:alice"));
        assert!(listed[0].reactions.is_empty());
        assert_eq!(listed[0].reply_count, 0);
        assert!(listed[0].file.is_none());
    }

    #[test]
    fn list_is_oldest_first_and_scoped_to_target() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let general = db.create_channel("general").unwrap();
        let random = db.create_channel("random").unwrap();

        for text in ["one", "two", "three"] {
            post(&db, &alice, MessageTarget::Channel(general.id), text);
        }
        post(&db, &alice, MessageTarget::Channel(random.id), "elsewhere");
        post(&db, &alice, MessageTarget::Avatar("celtic_x".into()), "to avatar");

        let listed = db
            .list_message_details(&MessageTarget::Channel(general.id))
            .unwrap();
        let contents: Vec<_> = listed.iter().map(|d| d.message.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert!(listed
            .windows(2)
            .all(|w| w[0].message.timestamp <= w[1].message.timestamp));

        let avatar = db
            .list_message_details(&MessageTarget::Avatar("celtic_x".into()))
            .unwrap();
        assert_eq!(avatar.len(), 1);
        assert_eq!(avatar[0].message.target, MessageTarget::Avatar("celtic_x".into()));
    }

    #[test]
    fn missing_references_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let channel = db.create_channel("general").unwrap();

        let err = db
            .insert_message(&NewMessage {
                content: "hi".into(),
                user_id: Uuid::new_v4(),
                target: MessageTarget::Channel(channel.id),
                file_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("User")));

        let err = db
            .insert_message(&NewMessage {
                content: "hi".into(),
                user_id: alice.id,
                target: MessageTarget::Channel(Uuid::new_v4()),
                file_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("Channel")));

        let err = db
            .insert_message(&NewMessage {
                content: String::new(),
                user_id: alice.id,
                target: MessageTarget::Channel(channel.id),
                file_id: Some(Uuid::new_v4()),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference("File")));
    }

    #[test]
    fn details_include_attachment() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let channel = db.create_channel("general").unwrap();
        let file = db.create_file("a.png", "image/png", 3, "loc").unwrap();

        let message = db
            .insert_message(&NewMessage {
                content: String::new(),
                user_id: alice.id,
                target: MessageTarget::Channel(channel.id),
                file_id: Some(file.id),
            })
            .unwrap();

        let details = db.get_message_details(message.id).unwrap();
        assert_eq!(details.file, Some(file));
        assert_eq!(db.get_message(message.id).unwrap(), message);
    }
}
