use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Reaction, ReactionToggle};
use crate::sql::{now, ts, ts_at, uuid_at};

impl Database {
    /// Flip the presence of `emoji` by `user_id` on `message_id`.
    ///
    /// Absent becomes present (the new row is returned); present becomes
    /// absent. Runs in one transaction, and the unique index on
    /// `(message_id, user_id, emoji)` rules out duplicates.
    pub fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<ReactionToggle> {
        if !self.message_exists(message_id)? {
            return Err(StoreError::MissingReference("Message"));
        }
        if !self.user_exists(user_id)? {
            return Err(StoreError::MissingReference("User"));
        }

        let tx = self.conn().unchecked_transaction()?;

        let removed = tx.execute(
            "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            params![message_id.to_string(), user_id.to_string(), emoji],
        )?;

        let outcome = if removed > 0 {
            ReactionToggle::Removed
        } else {
            let reaction = Reaction {
                id: Uuid::new_v4(),
                message_id,
                user_id,
                emoji: emoji.to_string(),
                created_at: now(),
            };
            tx.execute(
                "INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reaction.id.to_string(),
                    reaction.message_id.to_string(),
                    reaction.user_id.to_string(),
                    reaction.emoji,
                    ts(&reaction.created_at),
                ],
            )?;
            ReactionToggle::Added(reaction)
        };

        tx.commit()?;
        Ok(outcome)
    }

    pub fn get_reactions_for_message(&self, message_id: Uuid) -> Result<Vec<Reaction>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, message_id, user_id, emoji, created_at
             FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![message_id.to_string()], |row| {
            Ok(Reaction {
                id: uuid_at(row, 0)?,
                message_id: uuid_at(row, 1)?,
                user_id: uuid_at(row, 2)?,
                emoji: row.get(3)?,
                created_at: ts_at(row, 4)?,
            })
        })?;

        let mut reactions = Vec::new();
        for row in rows {
            reactions.push(row?);
        }
        Ok(reactions)
    }
}
