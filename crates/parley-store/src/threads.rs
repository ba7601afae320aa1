//! Threads and their replies.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::files::row_to_opt_file;
use crate::models::{NewReply, ReplyDetails, Thread, ThreadMessage};
use crate::sql::{not_found, now, opt_uuid_at, ts, ts_at, uuid_at};

const REPLY_SELECT: &str = "
    SELECT tm.id, tm.thread_id, tm.user_id, tm.content, tm.timestamp, tm.file_id,
           u.name,
           f.id, f.name, f.mime_type, f.size, f.locator, f.created_at
      FROM thread_messages tm
      JOIN users u ON u.id = tm.user_id
      LEFT JOIN files f ON f.id = tm.file_id";

impl Database {
    /// Return the thread of `message_id`, creating it on first use.
    ///
    /// The unique index on `threads(message_id)` makes concurrent first
    /// calls converge on a single row.
    pub fn get_or_create_thread(&self, message_id: Uuid) -> Result<Thread> {
        if !self.message_exists(message_id)? {
            return Err(StoreError::MissingReference("Message"));
        }

        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO threads (id, message_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                Uuid::new_v4().to_string(),
                message_id.to_string(),
                ts(&now()),
            ],
        )?;
        if inserted > 0 {
            tracing::debug!(message_id = %message_id, "created thread");
        }

        self.find_thread(message_id)?.ok_or(StoreError::NotFound)
    }

    pub fn find_thread(&self, message_id: Uuid) -> Result<Option<Thread>> {
        match self.conn().query_row(
            "SELECT id, message_id, created_at FROM threads WHERE message_id = ?1",
            params![message_id.to_string()],
            |row| {
                Ok(Thread {
                    id: uuid_at(row, 0)?,
                    message_id: uuid_at(row, 1)?,
                    created_at: ts_at(row, 2)?,
                })
            },
        ) {
            Ok(thread) => Ok(Some(thread)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replies of a thread, oldest first.
    pub fn list_replies(&self, thread_id: Uuid) -> Result<Vec<ReplyDetails>> {
        let mut stmt = self.conn().prepare(&format!(
            "{REPLY_SELECT}
             WHERE tm.thread_id = ?1
             ORDER BY tm.timestamp ASC, tm.rowid ASC"
        ))?;
        let rows = stmt.query_map(params![thread_id.to_string()], row_to_reply)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn add_reply(&self, thread_id: Uuid, new: &NewReply) -> Result<ReplyDetails> {
        if !self.user_exists(new.user_id)? {
            return Err(StoreError::MissingReference("User"));
        }
        if let Some(file_id) = new.file_id {
            if !self.file_exists(file_id)? {
                return Err(StoreError::MissingReference("File"));
            }
        }

        let reply = ThreadMessage {
            id: Uuid::new_v4(),
            thread_id,
            user_id: new.user_id,
            content: new.content.clone(),
            timestamp: now(),
            file_id: new.file_id,
        };

        self.conn().execute(
            "INSERT INTO thread_messages (id, thread_id, user_id, content, timestamp, file_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reply.id.to_string(),
                reply.thread_id.to_string(),
                reply.user_id.to_string(),
                reply.content,
                ts(&reply.timestamp),
                reply.file_id.map(|id| id.to_string()),
            ],
        )?;

        self.conn()
            .query_row(
                &format!("{REPLY_SELECT} WHERE tm.id = ?1"),
                params![reply.id.to_string()],
                row_to_reply,
            )
            .map_err(not_found)
    }
}

fn row_to_reply(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReplyDetails> {
    Ok(ReplyDetails {
        reply: ThreadMessage {
            id: uuid_at(row, 0)?,
            thread_id: uuid_at(row, 1)?,
            user_id: uuid_at(row, 2)?,
            content: row.get(3)?,
            timestamp: ts_at(row, 4)?,
            file_id: opt_uuid_at(row, 5)?,
        },
        author_name: row.get(6)?,
        file: row_to_opt_file(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use parley_shared::{MessageTarget, UserStatus};

    use super::*;
    use crate::models::{Message, NewMessage, NewUser, User};

    fn setup() -> (Database, User, Message) {
        let db = Database::open_in_memory().unwrap();
        let alice = db
            .create_user(&NewUser {
                name: "alice".into(),
                status: UserStatus::Online,
                status_message: String::new(),
                profile_image: None,
            })
            .unwrap();
        let channel = db.create_channel("general").unwrap();
        let message = db
            .insert_message(&NewMessage {
                content: "parent".into(),
                user_id: alice.id,
                target: MessageTarget::Channel(channel.id),
                file_id: None,
            })
            .unwrap();
        (db, alice, message)
    }

    fn reply(content: &str, user: &User) -> NewReply {
        NewReply {
            content: content.into(),
            user_id: user.id,
            file_id: None,
        }
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let (db, _, message) = setup();
        assert!(db.find_thread(message.id).unwrap().is_none());

        let first = db.get_or_create_thread(message.id).unwrap();
        let second = db.get_or_create_thread(message.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.message_id, message.id);
    }

    #[test]
    fn thread_requires_parent_message() {
        let (db, _, _) = setup();
        assert!(matches!(
            db.get_or_create_thread(Uuid::new_v4()),
            Err(StoreError::MissingReference("Message"))
        ));
    }

    #[test]
    fn replies_are_oldest_first() {
        let (db, alice, message) = setup();
        let thread = db.get_or_create_thread(message.id).unwrap();

        for text in ["first", "second", "third"] {
            db.add_reply(thread.id, &reply(text, &alice)).unwrap();
        }

        let replies = db.list_replies(thread.id).unwrap();
        let contents: Vec<_> = replies.iter().map(|r| r.reply.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert!(replies
            .windows(2)
            .all(|w| w[0].reply.timestamp <= w[1].reply.timestamp));
        assert!(replies.iter().all(|r| r.author_name == "alice"));
    }

    #[test]
    fn replies_count_on_parent() {
        let (db, alice, message) = setup();
        let thread = db.get_or_create_thread(message.id).unwrap();
        db.add_reply(thread.id, &reply("a", &alice)).unwrap();
        db.add_reply(thread.id, &reply("b", &alice)).unwrap();

        let details = db.get_message_details(message.id).unwrap();
        assert_eq!(details.reply_count, 2);
    }

    #[test]
    fn reply_with_attachment() {
        let (db, alice, message) = setup();
        let thread = db.get_or_create_thread(message.id).unwrap();
        let file = db.create_file("a.txt", "text/plain", 1, "loc").unwrap();

        let added = db
            .add_reply(
                thread.id,
                &NewReply {
                    content: String::new(),
                    user_id: alice.id,
                    file_id: Some(file.id),
                },
            )
            .unwrap();
        assert_eq!(added.file, Some(file));
    }
}
