//! Direct-message channels.
//!
//! A DM channel is an ordinary channel named with
//! [`dm_channel_name`](parley_shared::identity::dm_channel_name). Channels
//! opened through [`Database::open_dm`] are also recorded in `dm_pairs`,
//! keyed by the sorted pair of user ids, so lookups never depend on names.

use std::collections::HashSet;

use parley_shared::constants::DM_PREFIX;
use parley_shared::identity::{dm_channel_name, dm_other_participant};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{missing, Result, StoreError};
use crate::models::{Channel, DmPair};
use crate::sql::{now, uuid_at};

impl Database {
    /// Return the DM channel between `user_id` and `other_id`, creating it
    /// on first use. Both directions yield the same channel.
    pub fn open_dm(&self, user_id: Uuid, other_id: Uuid) -> Result<DmPair> {
        let me = self.get_user(user_id).map_err(missing("User"))?;
        let other = self.get_user(other_id).map_err(missing("User"))?;
        let (low, high) = sorted(user_id, other_id);

        let tx = self.conn().unchecked_transaction()?;

        let existing = match tx.query_row(
            "SELECT c.id, c.name FROM dm_pairs p
               JOIN channels c ON c.id = p.channel_id
              WHERE p.user_low = ?1 AND p.user_high = ?2",
            params![low.to_string(), high.to_string()],
            |row| Ok((uuid_at(row, 0)?, row.get::<_, String>(1)?)),
        ) {
            Ok(found) => Some(found),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let (channel_id, channel_name) = match existing {
            Some(found) => found,
            None => {
                let name = dm_channel_name(&me.name, &other.name)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;

                // a channel created by name alone is adopted, not duplicated
                let legacy = match tx.query_row(
                    "SELECT id FROM channels
                      WHERE name = ?1
                        AND id NOT IN (SELECT channel_id FROM dm_pairs)
                      ORDER BY created_at ASC, rowid ASC
                      LIMIT 1",
                    params![name],
                    |row| uuid_at(row, 0),
                ) {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };

                let channel_id = match legacy {
                    Some(id) => {
                        tracing::info!(channel = %name, %id, "recorded existing DM channel");
                        id
                    }
                    None => {
                        let channel = Channel {
                            id: Uuid::new_v4(),
                            name: name.clone(),
                            created_at: now(),
                        };
                        self.insert_channel(&channel)?;
                        tracing::info!(channel = %name, id = %channel.id, "opened DM channel");
                        channel.id
                    }
                };

                tx.execute(
                    "INSERT INTO dm_pairs (channel_id, user_low, user_high) VALUES (?1, ?2, ?3)",
                    params![channel_id.to_string(), low.to_string(), high.to_string()],
                )?;
                (channel_id, name)
            }
        };

        tx.commit()?;

        Ok(DmPair {
            channel_id,
            channel_name,
            other_name: other.name,
        })
    }

    /// All DM conversations of `user_id`.
    ///
    /// Includes channels recorded in `dm_pairs` and legacy `dm_` channels
    /// created by name whose participants resolve exactly to this user.
    pub fn list_dm_pairs(&self, user_id: Uuid) -> Result<Vec<DmPair>> {
        let me = self.get_user(user_id)?;

        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.name, u.name
               FROM dm_pairs p
               JOIN channels c ON c.id = p.channel_id
               JOIN users u ON u.id = CASE WHEN p.user_low = ?1 THEN p.user_high ELSE p.user_low END
              WHERE p.user_low = ?1 OR p.user_high = ?1
              ORDER BY c.created_at ASC, c.rowid ASC",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(DmPair {
                channel_id: uuid_at(row, 0)?,
                channel_name: row.get(1)?,
                other_name: row.get(2)?,
            })
        })?;
        let mut pairs = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        let recorded = self.recorded_dm_channels()?;
        let mut seen: HashSet<Uuid> = pairs.iter().map(|p| p.channel_id).collect();

        for channel in self.list_channels_with_prefix(DM_PREFIX)? {
            if recorded.contains(&channel.id) || seen.contains(&channel.id) {
                continue;
            }
            if let Some(other) = dm_other_participant(&channel.name, &me.name) {
                seen.insert(channel.id);
                pairs.push(DmPair {
                    channel_id: channel.id,
                    other_name: other.to_string(),
                    channel_name: channel.name,
                });
            }
        }

        Ok(pairs)
    }

    fn recorded_dm_channels(&self) -> Result<HashSet<Uuid>> {
        let mut stmt = self.conn().prepare("SELECT channel_id FROM dm_pairs")?;
        let rows = stmt.query_map([], |row| uuid_at(row, 0))?;
        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn sorted(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a.to_string() <= b.to_string() {
        (a, b)
    } else {
        (b, a)
    }
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
            profile_image: None,
        })
        .unwrap()
    }

    #[test]
    fn both_directions_share_one_channel() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let from_alice = db.open_dm(alice.id, bob.id).unwrap();
        let from_bob = db.open_dm(bob.id, alice.id).unwrap();

        assert_eq!(from_alice.channel_name, "dm_alice_bob");
        assert_eq!(from_alice.channel_id, from_bob.channel_id);
        assert_eq!(from_alice.other_name, "bob");
        assert_eq!(from_bob.other_name, "alice");
        assert_eq!(db.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn channel_created_by_name_is_adopted() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let legacy = db.create_channel("dm_alice_bob").unwrap();

        let opened = db.open_dm(bob.id, alice.id).unwrap();
        assert_eq!(opened.channel_id, legacy.id);
        assert_eq!(opened.other_name, "alice");
        assert_eq!(db.open_dm(alice.id, bob.id).unwrap().channel_id, legacy.id);
        assert_eq!(db.list_channels().unwrap().len(), 1);

        let pairs: Vec<_> = db
            .list_dm_pairs(alice.id)
            .unwrap()
            .into_iter()
            .map(|p| (p.channel_id, p.other_name))
            .collect();
        assert_eq!(pairs, [(legacy.id, "bob".to_string())]);
    }

    #[test]
    fn listing_returns_the_other_participant() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let carol = user(&db, "carol");

        db.open_dm(alice.id, bob.id).unwrap();
        db.open_dm(carol.id, alice.id).unwrap();
        db.open_dm(bob.id, carol.id).unwrap();

        let names: Vec<_> = db
            .list_dm_pairs(alice.id)
            .unwrap()
            .into_iter()
            .map(|p| p.other_name)
            .collect();
        assert_eq!(names, ["bob", "carol"]);
    }

    #[test]
    fn substring_names_do_not_match() {
        let db = Database::open_in_memory().unwrap();
        let al = user(&db, "al");
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        db.open_dm(alice.id, bob.id).unwrap();
        // legacy channel created by name only
        db.create_channel("dm_alice_carol").unwrap();

        assert!(db.list_dm_pairs(al.id).unwrap().is_empty());

        let names: Vec<_> = db
            .list_dm_pairs(alice.id)
            .unwrap()
            .into_iter()
            .map(|p| p.other_name)
            .collect();
        assert_eq!(names, ["bob", "carol"]);
    }

    #[test]
    fn unknown_users_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        assert!(matches!(
            db.open_dm(alice.id, Uuid::new_v4()),
            Err(StoreError::MissingReference("User"))
        ));
        assert!(matches!(
            db.list_dm_pairs(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }
}
