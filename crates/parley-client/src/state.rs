//! Client-side cache of everything the UI renders.
//!
//! [`ChatStore`] is a plain value owned by the [`Session`](crate::session::Session).
//! Each resource has its own read and write methods; nothing here performs
//! I/O, so the whole store can be exercised without a server.

use std::collections::HashMap;

use parley_shared::identity::{dm_other_participant, is_dm_channel};
use parley_shared::protocol::{ChannelView, DmPairView, MessageView, ThreadMessageView, UserView};
use parley_shared::MessageTarget;
use uuid::Uuid;

/// A message matched by [`ChatStore::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub target: MessageTarget,
    pub message: MessageView,
}

#[derive(Debug, Default)]
pub struct ChatStore {
    channels: Vec<ChannelView>,
    users: Vec<UserView>,
    dm_pairs: Vec<DmPairView>,
    messages: HashMap<MessageTarget, Vec<MessageView>>,
    /// Thread replies keyed by parent message id.
    replies: HashMap<Uuid, Vec<ThreadMessageView>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    pub fn set_channels(&mut self, channels: Vec<ChannelView>) {
        self.channels = channels;
    }

    pub fn channels(&self) -> &[ChannelView] {
        &self.channels
    }

    /// Channels that are not DM channels.
    pub fn public_channels(&self) -> impl Iterator<Item = &ChannelView> {
        self.channels.iter().filter(|c| !is_dm_channel(&c.name))
    }

    pub fn upsert_channel(&mut self, channel: ChannelView) {
        match self.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn set_users(&mut self, users: Vec<UserView>) {
        self.users = users;
    }

    pub fn users(&self) -> &[UserView] {
        &self.users
    }

    /// First cached user with exactly this name.
    pub fn user_by_name(&self, name: &str) -> Option<&UserView> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn user(&self, id: Uuid) -> Option<&UserView> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn upsert_user(&mut self, user: UserView) {
        match self.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    // ------------------------------------------------------------------
    // DM pairs
    // ------------------------------------------------------------------

    pub fn set_dm_pairs(&mut self, pairs: Vec<DmPairView>) {
        self.dm_pairs = pairs;
    }

    pub fn dm_pairs(&self) -> &[DmPairView] {
        &self.dm_pairs
    }

    pub fn upsert_dm_pair(&mut self, pair: DmPairView) {
        match self.dm_pairs.iter_mut().find(|p| p.id == pair.id) {
            Some(existing) => *existing = pair,
            None => self.dm_pairs.push(pair),
        }
    }

    /// The other participant of a cached DM channel, by exact name match.
    pub fn dm_partner(&self, channel_id: Uuid, me: &str) -> Option<&str> {
        if let Some(pair) = self.dm_pairs.iter().find(|p| p.id == channel_id) {
            return Some(&pair.user_name);
        }
        let channel = self.channels.iter().find(|c| c.id == channel_id)?;
        dm_other_participant(&channel.name, me)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Replace the cached history of a conversation. The last write wins.
    pub fn set_messages(&mut self, target: MessageTarget, messages: Vec<MessageView>) {
        self.messages.insert(target, messages);
    }

    pub fn messages(&self, target: &MessageTarget) -> &[MessageView] {
        self.messages.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push_message(&mut self, target: MessageTarget, message: MessageView) {
        let list = self.messages.entry(target).or_default();
        if !list.iter().any(|m| m.id == message.id) {
            list.push(message);
        }
    }

    fn message_mut(&mut self, message_id: Uuid) -> Option<&mut MessageView> {
        self.messages
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|m| m.id == message_id)
    }

    pub fn message(&self, message_id: Uuid) -> Option<&MessageView> {
        self.messages
            .values()
            .flat_map(|list| list.iter())
            .find(|m| m.id == message_id)
    }

    /// Conversation holding a cached message.
    pub fn locate(&self, message_id: Uuid) -> Option<&MessageTarget> {
        self.messages
            .iter()
            .find(|(_, list)| list.iter().any(|m| m.id == message_id))
            .map(|(target, _)| target)
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    /// Flip `emoji` on a cached message before the server confirms.
    ///
    /// Returns `Some(true)` when the emoji was added, `Some(false)` when one
    /// occurrence was removed, and `None` when the message is not cached.
    pub fn toggle_reaction_local(&mut self, message_id: Uuid, emoji: &str) -> Option<bool> {
        let message = self.message_mut(message_id)?;
        match message.reactions.iter().position(|e| e == emoji) {
            Some(idx) => {
                message.reactions.remove(idx);
                Some(false)
            }
            None => {
                message.reactions.push(emoji.to_string());
                Some(true)
            }
        }
    }

    /// Correct an optimistic toggle once the server's answer is known.
    ///
    /// The cached reaction list merges every user's emojis, so the local
    /// guess can differ from what the server did for this user.
    pub fn reconcile_reaction(
        &mut self,
        message_id: Uuid,
        emoji: &str,
        guessed_added: bool,
        server_added: bool,
    ) {
        if guessed_added == server_added {
            return;
        }
        let Some(message) = self.message_mut(message_id) else {
            return;
        };
        if server_added {
            message.reactions.push(emoji.to_string());
        } else if let Some(idx) = message.reactions.iter().rposition(|e| e == emoji) {
            message.reactions.remove(idx);
        }
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    pub fn set_replies(&mut self, message_id: Uuid, replies: Vec<ThreadMessageView>) {
        let count = replies.len() as u32;
        self.replies.insert(message_id, replies);
        if let Some(parent) = self.message_mut(message_id) {
            parent.reply_count = count;
        }
    }

    pub fn replies(&self, message_id: Uuid) -> &[ThreadMessageView] {
        self.replies
            .get(&message_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append a reply and bump the parent's reply count.
    pub fn push_reply(&mut self, message_id: Uuid, reply: ThreadMessageView) {
        let list = self.replies.entry(message_id).or_default();
        if list.iter().any(|r| r.id == reply.id) {
            return;
        }
        list.push(reply);
        if let Some(parent) = self.message_mut(message_id) {
            parent.reply_count += 1;
        }
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Case-insensitive match on content or attachment name across every
    /// cached conversation. A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        // conversations in a fixed order, messages in history order
        let mut targets: Vec<&MessageTarget> = self.messages.keys().collect();
        targets.sort();

        targets
            .into_iter()
            .flat_map(|target| {
                self.messages(target)
                    .iter()
                    .map(move |message| (target, message))
            })
            .filter(|(_, m)| {
                m.content.to_lowercase().contains(&needle)
                    || m.file
                        .as_ref()
                        .is_some_and(|f| f.name.to_lowercase().contains(&needle))
            })
            .map(|(target, m)| SearchHit {
                target: target.clone(),
                message: m.clone(),
            })
            .collect()
    }

    /// Drop every cached resource.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use parley_shared::protocol::FileView;

    use super::*;

    fn message(content: &str) -> MessageView {
        MessageView {
            id: Uuid::new_v4(),
            user: "alice".into(),
            user_image: None,
            content: content.into(),
            timestamp: "9:00:00 AM".into(),
            reactions: vec![],
            reply_count: 0,
            file: None,
        }
    }

    fn reply(content: &str) -> ThreadMessageView {
        ThreadMessageView {
            id: Uuid::new_v4(),
            user: "bob".into(),
            content: content.into(),
            timestamp: "9:01:00 AM".into(),
            file: None,
        }
    }

    fn channel(name: &str) -> ChannelView {
        ChannelView {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn dm_channels_are_hidden_from_public_list() {
        let mut store = ChatStore::new();
        store.set_channels(vec![channel("general"), channel("dm_alice_bob")]);
        let names: Vec<_> = store.public_channels().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["general"]);
    }

    #[test]
    fn dm_partner_prefers_pairs_then_exact_names() {
        let mut store = ChatStore::new();
        let legacy = channel("dm_alice_carol");
        let paired = channel("dm_alice_bob");
        store.set_channels(vec![legacy.clone(), paired.clone()]);
        store.set_dm_pairs(vec![DmPairView {
            id: paired.id,
            user_name: "bob".into(),
        }]);

        assert_eq!(store.dm_partner(paired.id, "alice"), Some("bob"));
        assert_eq!(store.dm_partner(legacy.id, "alice"), Some("carol"));
        assert_eq!(store.dm_partner(legacy.id, "al"), None);
    }

    #[test]
    fn optimistic_reaction_and_reconcile() {
        let mut store = ChatStore::new();
        let target = MessageTarget::Channel(Uuid::new_v4());
        let msg = message("hi");
        store.push_message(target.clone(), msg.clone());

        assert_eq!(store.toggle_reaction_local(msg.id, "😀"), Some(true));
        assert_eq!(store.message(msg.id).unwrap().reactions, ["😀"]);

        // server agrees: nothing to fix
        store.reconcile_reaction(msg.id, "😀", true, true);
        assert_eq!(store.message(msg.id).unwrap().reactions, ["😀"]);

        // someone else's 😀 made us guess "remove", but the server added ours
        assert_eq!(store.toggle_reaction_local(msg.id, "😀"), Some(false));
        store.reconcile_reaction(msg.id, "😀", false, true);
        assert_eq!(store.message(msg.id).unwrap().reactions, ["😀", "😀"]);

        assert_eq!(store.toggle_reaction_local(Uuid::new_v4(), "😀"), None);
    }

    #[test]
    fn replies_bump_parent_count() {
        let mut store = ChatStore::new();
        let target = MessageTarget::Channel(Uuid::new_v4());
        let parent = message("parent");
        store.push_message(target, parent.clone());

        store.set_replies(parent.id, vec![reply("one")]);
        assert_eq!(store.message(parent.id).unwrap().reply_count, 1);

        let second = reply("two");
        store.push_reply(parent.id, second.clone());
        store.push_reply(parent.id, second);
        assert_eq!(store.replies(parent.id).len(), 2);
        assert_eq!(store.message(parent.id).unwrap().reply_count, 2);
    }

    #[test]
    fn search_matches_content_and_file_names() {
        let mut store = ChatStore::new();
        let general = MessageTarget::Channel(Uuid::new_v4());
        let avatar = MessageTarget::Avatar("celtic_u1".into());

        let greeting = message("Hello World");
        let mut with_file = message("see attached");
        with_file.file = Some(FileView {
            id: Uuid::new_v4(),
            name: "Quarterly-Report.pdf".into(),
            mime_type: "application/pdf".into(),
            url: "/files/x".into(),
        });
        let other = message("nothing here");

        store.set_messages(general.clone(), vec![greeting.clone(), with_file.clone()]);
        store.set_messages(avatar.clone(), vec![other]);

        let hits = store.search("hello");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message.id, greeting.id);
        assert_eq!(hits[0].target, general);

        let hits = store.search("REPORT");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message.id, with_file.id);

        assert!(store.search("   ").is_empty());
        assert_eq!(store.locate(with_file.id), Some(&general));
        assert_eq!(store.locate(Uuid::new_v4()), None);
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = ChatStore::new();
        store.set_channels(vec![channel("general")]);
        store.push_message(MessageTarget::Avatar("a_1".into()), message("x"));
        store.clear();
        assert!(store.channels().is_empty());
        assert!(store.messages(&MessageTarget::Avatar("a_1".into())).is_empty());
        assert!(store.search("x").is_empty());
    }
}
