//! Domain model structs persisted in the SQLite database.
//!
//! These are the raw records. The HTTP layer reshapes them into the view
//! models from `parley_shared::protocol` before they leave the server.

use chrono::{DateTime, Utc};
use parley_shared::{MessageTarget, UserStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A chat participant. Names are not unique at the store level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub status: UserStatus,
    pub status_message: String,
    /// Data URL or file URL of the profile picture.
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub status: UserStatus,
    pub status_message: String,
    pub profile_image: Option<String>,
}

/// Partial status update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: Option<UserStatus>,
    pub status_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A named conversation. DM channels carry a `dm_` name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A DM channel as seen from one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmPair {
    pub channel_id: Uuid,
    pub channel_name: String,
    /// Name of the participant who is not the requesting user.
    pub other_name: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    pub target: MessageTarget,
    pub file_id: Option<Uuid>,
}

/// Fields accepted when posting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub user_id: Uuid,
    pub target: MessageTarget,
    pub file_id: Option<Uuid>,
}

/// A message joined with everything the client renders next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDetails {
    pub message: Message,
    pub author_name: String,
    pub author_image: Option<String>,
    pub reactions: Vec<String>,
    pub reply_count: u32,
    pub file: Option<FileRecord>,
}

// ---------------------------------------------------------------------------
// Reaction
// ---------------------------------------------------------------------------

/// One user's emoji on one message. `(message_id, user_id, emoji)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// What a reaction toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionToggle {
    Added(Reaction),
    Removed,
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Side conversation attached to exactly one parent message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub id: Uuid,
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub file_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub content: String,
    pub user_id: Uuid,
    pub file_id: Option<Uuid>,
}

/// A reply joined with its author name and attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDetails {
    pub reply: ThreadMessage,
    pub author_name: String,
    pub file: Option<FileRecord>,
}

// ---------------------------------------------------------------------------
// File (upload metadata)
// ---------------------------------------------------------------------------

/// Metadata for an uploaded file. The bytes live in the blob store under
/// `locator`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Uuid,
    /// Original file name.
    pub name: String,
    pub mime_type: String,
    /// File size in bytes.
    pub size: i64,
    /// Blob store key.
    pub locator: String,
    pub created_at: DateTime<Utc>,
}
