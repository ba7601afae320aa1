//! Identity derivation for direct messages and avatar conversations.
//!
//! The server uses these when resolving DM pairs and the client uses them
//! when routing the UI, so both ends always agree on the channel for a pair.

use crate::constants::{DM_PREFIX, NAME_SEPARATOR};
use crate::error::IdentityError;

/// Canonical channel name for a DM between `a` and `b`.
///
/// The names are sorted before joining, so the result does not depend on
/// who opened the conversation.
pub fn dm_channel_name(a: &str, b: &str) -> Result<String, IdentityError> {
    if a.is_empty() || b.is_empty() {
        return Err(IdentityError::EmptyName);
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Ok(format!("{DM_PREFIX}{first}{NAME_SEPARATOR}{second}"))
}

/// Whether a channel name carries the DM prefix.
pub fn is_dm_channel(name: &str) -> bool {
    name.starts_with(DM_PREFIX)
}

/// Resolve the participant of a DM channel that is not `me`.
///
/// Matching is exact and case-sensitive: the part after `dm_` must be
/// `<me>_<other>` or `<other>_<me>`. A name that merely contains `me` as a
/// substring does not match.
pub fn dm_other_participant<'a>(channel_name: &'a str, me: &str) -> Option<&'a str> {
    if me.is_empty() {
        return None;
    }
    let rest = channel_name.strip_prefix(DM_PREFIX)?;

    let leading = rest
        .strip_prefix(me)
        .and_then(|r| r.strip_prefix(NAME_SEPARATOR))
        .filter(|other| !other.is_empty());
    let trailing = rest
        .strip_suffix(me)
        .and_then(|r| r.strip_suffix(NAME_SEPARATOR))
        .filter(|other| !other.is_empty());

    // Prefer the split that reproduces the canonical sorted name.
    [leading, trailing].into_iter().flatten().find(|other| {
        dm_channel_name(me, other).is_ok_and(|canonical| canonical == channel_name)
    })
}

/// Split a DM channel name into its two participants.
///
/// Only unambiguous when neither name contains the separator; callers that
/// know one participant should use [`dm_other_participant`] instead.
pub fn dm_participants(channel_name: &str) -> Result<(&str, &str), IdentityError> {
    let rest = channel_name
        .strip_prefix(DM_PREFIX)
        .ok_or_else(|| IdentityError::NotDmChannel(channel_name.to_string()))?;
    match rest.split_once(NAME_SEPARATOR) {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(IdentityError::NotDmChannel(channel_name.to_string())),
    }
}

/// Conversation key between a user and an avatar responder.
pub fn avatar_conversation_id(avatar: &str, user_id: &str) -> String {
    format!("{avatar}{NAME_SEPARATOR}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_name_is_commutative() {
        let pairs = [
            ("alice", "bob"),
            ("Bob", "alice"),
            ("zed", "amy_lee"),
            ("same", "same"),
            ("a", "ab"),
        ];
        for (a, b) in pairs {
            assert_eq!(dm_channel_name(a, b).unwrap(), dm_channel_name(b, a).unwrap());
        }
    }

    #[test]
    fn dm_name_sorts_participants() {
        assert_eq!(dm_channel_name("bob", "alice").unwrap(), "dm_alice_bob");
        // byte order: uppercase sorts first
        assert_eq!(dm_channel_name("alice", "Zoe").unwrap(), "dm_Zoe_alice");
    }

    #[test]
    fn dm_name_rejects_empty() {
        assert_eq!(dm_channel_name("", "bob"), Err(IdentityError::EmptyName));
        assert_eq!(dm_channel_name("bob", ""), Err(IdentityError::EmptyName));
    }

    #[test]
    fn other_participant_from_either_side() {
        assert_eq!(dm_other_participant("dm_alice_bob", "alice"), Some("bob"));
        assert_eq!(dm_other_participant("dm_alice_bob", "bob"), Some("alice"));
    }

    #[test]
    fn other_participant_is_not_a_substring_match() {
        // "al" is a substring of "alice" but not a participant
        assert_eq!(dm_other_participant("dm_alice_bob", "al"), None);
        assert_eq!(dm_other_participant("dm_alice_bob", "ob"), None);
        assert_eq!(dm_other_participant("dm_alice_bob", "Alice"), None);
        assert_eq!(dm_other_participant("general", "alice"), None);
    }

    #[test]
    fn other_participant_handles_separator_in_names() {
        let name = dm_channel_name("amy_lee", "bob").unwrap();
        assert_eq!(name, "dm_amy_lee_bob");
        assert_eq!(dm_other_participant(&name, "bob"), Some("amy_lee"));
        assert_eq!(dm_other_participant(&name, "amy_lee"), Some("bob"));
    }

    #[test]
    fn self_dm_resolves_to_self() {
        let name = dm_channel_name("alice", "alice").unwrap();
        assert_eq!(dm_other_participant(&name, "alice"), Some("alice"));
    }

    #[test]
    fn participants_split() {
        assert_eq!(dm_participants("dm_alice_bob").unwrap(), ("alice", "bob"));
        assert!(dm_participants("general").is_err());
        assert!(dm_participants("dm_alice").is_err());
        assert!(is_dm_channel("dm_alice_bob"));
        assert!(!is_dm_channel("random"));
    }

    #[test]
    fn avatar_id_combines_avatar_and_user() {
        assert_eq!(avatar_conversation_id("celtic", "u-1"), "celtic_u-1");
    }
}
