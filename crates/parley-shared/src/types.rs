use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

/// Presence status shown next to a user's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    #[default]
    Offline,
    /// Set while the user is chatting with an avatar.
    Active,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            "active" => Ok(Self::Active),
            other => Err(IdentityError::UnknownStatus(other.to_string())),
        }
    }
}

/// Where a message lives. A message belongs to exactly one of a channel or
/// an avatar conversation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageTarget {
    Channel(Uuid),
    Avatar(String),
}

impl MessageTarget {
    /// Build a target from the two optional selectors of a request.
    ///
    /// Returns `None` unless exactly one of them is present.
    pub fn from_selectors(channel_id: Option<Uuid>, avatar_id: Option<String>) -> Option<Self> {
        match (channel_id, avatar_id) {
            (Some(id), None) => Some(Self::Channel(id)),
            (None, Some(avatar)) => Some(Self::Avatar(avatar)),
            _ => None,
        }
    }

    pub fn channel_id(&self) -> Option<Uuid> {
        match self {
            Self::Channel(id) => Some(*id),
            Self::Avatar(_) => None,
        }
    }

    pub fn avatar_id(&self) -> Option<&str> {
        match self {
            Self::Channel(_) => None,
            Self::Avatar(avatar) => Some(avatar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_every_variant() {
        for status in [
            UserStatus::Online,
            UserStatus::Away,
            UserStatus::Busy,
            UserStatus::Offline,
            UserStatus::Active,
        ] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown_and_mixed_case() {
        assert!("dnd".parse::<UserStatus>().is_err());
        assert!("Online".parse::<UserStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&UserStatus::Busy).unwrap();
        assert_eq!(json, "\"busy\"");
    }

    #[test]
    fn target_requires_exactly_one_selector() {
        let id = Uuid::new_v4();
        assert_eq!(
            MessageTarget::from_selectors(Some(id), None),
            Some(MessageTarget::Channel(id))
        );
        assert_eq!(
            MessageTarget::from_selectors(None, Some("celtic_u1".into())),
            Some(MessageTarget::Avatar("celtic_u1".into()))
        );
        assert_eq!(MessageTarget::from_selectors(None, None), None);
        assert_eq!(
            MessageTarget::from_selectors(Some(id), Some("celtic_u1".into())),
            None
        );
    }
}
