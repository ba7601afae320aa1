//! User-facing flows composed from API calls and cache updates.

use parley_shared::constants::MAX_FILE_SIZE;
use parley_shared::identity::avatar_conversation_id;
use parley_shared::protocol::{
    ChannelView, DmChannelView, DmPairView, MessageView, ThreadMessageView, UserView,
};
use parley_shared::{MessageTarget, UserStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, Attachment};
use crate::error::{ClientError, Result};
use crate::state::{ChatStore, SearchHit};

/// One logged-in user talking to one server.
pub struct Session {
    api: ApiClient,
    store: ChatStore,
    me: Option<UserView>,
    /// Conversation that `send` posts to.
    current: Option<MessageTarget>,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: ChatStore::new(),
            me: None,
            current: None,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn me(&self) -> Option<&UserView> {
        self.me.as_ref()
    }

    pub fn current(&self) -> Option<&MessageTarget> {
        self.current.as_ref()
    }

    fn my_id(&self) -> Result<Uuid> {
        self.me.as_ref().map(|u| u.id).ok_or(ClientError::NotLoggedIn)
    }

    // ------------------------------------------------------------------
    // Login / logout
    // ------------------------------------------------------------------

    /// Log in by username. An unknown name creates the user.
    /// Either way the user is marked `online`.
    pub async fn login(&mut self, name: &str) -> Result<UserView> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::InvalidInput("username is required".into()));
        }

        self.store.set_users(self.api.list_users().await?);

        let me = match self.store.user_by_name(name).map(|u| u.id) {
            Some(id) => {
                self.api
                    .update_status(id, Some(UserStatus::Online), None)
                    .await?
            }
            None => self.api.create_user(name, Some(UserStatus::Online)).await?,
        };
        info!(id = %me.id, name = %me.name, "Logged in");

        self.store.upsert_user(me.clone());
        self.me = Some(me.clone());
        self.refresh().await?;
        Ok(me)
    }

    /// Mark the user offline and forget every cached resource.
    pub async fn logout(&mut self) -> Result<()> {
        if let Some(id) = self.me.as_ref().map(|u| u.id) {
            if let Err(e) = self
                .api
                .update_status(id, Some(UserStatus::Offline), None)
                .await
            {
                warn!(error = %e, "Failed to mark user offline");
            }
        }
        self.store.clear();
        self.me = None;
        self.current = None;
        info!("Logged out");
        Ok(())
    }

    /// Reload channels, users and DM pairs.
    pub async fn refresh(&mut self) -> Result<()> {
        let me = self.my_id()?;
        let (channels, users, pairs) = tokio::try_join!(
            self.api.list_channels(),
            self.api.list_users(),
            self.api.list_dm_pairs(me),
        )?;
        self.store.set_channels(channels);
        self.store.set_users(users);
        self.store.set_dm_pairs(pairs);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------

    pub async fn create_channel(&mut self, name: &str) -> Result<ChannelView> {
        let channel = self.api.create_channel(name).await?;
        self.store.upsert_channel(channel.clone());
        Ok(channel)
    }

    pub async fn open_channel(&mut self, channel_id: Uuid) -> Result<&[MessageView]> {
        self.load(MessageTarget::Channel(channel_id)).await
    }

    /// Open (creating if needed) the DM channel with another user.
    pub async fn open_dm(&mut self, other_user_id: Uuid) -> Result<DmChannelView> {
        let me = self.my_id()?;
        let dm = self.api.open_dm(me, other_user_id).await?;

        self.store.upsert_channel(ChannelView {
            id: dm.id,
            name: dm.name.clone(),
        });
        self.store.upsert_dm_pair(DmPairView {
            id: dm.id,
            user_name: dm.user_name.clone(),
        });
        self.load(MessageTarget::Channel(dm.id)).await?;
        Ok(dm)
    }

    /// Open the conversation with an avatar; the user becomes `active`.
    pub async fn open_avatar(&mut self, avatar: &str) -> Result<MessageTarget> {
        let me = self.my_id()?;
        let avatar = avatar.trim();
        if avatar.is_empty() {
            return Err(ClientError::InvalidInput("avatar is required".into()));
        }

        let target = MessageTarget::Avatar(avatar_conversation_id(avatar, &me.to_string()));
        self.load(target.clone()).await?;
        self.update_status(
            Some(UserStatus::Active),
            Some(&format!("Chatting with {avatar}")),
        )
        .await?;
        Ok(target)
    }

    /// Fetch a conversation and make it current. Leaving an avatar
    /// conversation for a channel puts the user back `online`.
    async fn load(&mut self, target: MessageTarget) -> Result<&[MessageView]> {
        let leaving_avatar = matches!(self.current, Some(MessageTarget::Avatar(_)))
            && target.channel_id().is_some();

        let messages = self.api.list_messages(&target).await?;
        self.store.set_messages(target.clone(), messages);
        self.current = Some(target);

        if leaving_avatar {
            self.update_status(Some(UserStatus::Online), Some("")).await?;
        }
        Ok(self
            .current
            .as_ref()
            .map(|t| self.store.messages(t))
            .unwrap_or(&[]))
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Post to the open conversation. An attachment is uploaded first and
    /// then referenced by id.
    pub async fn send(
        &mut self,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<MessageView> {
        let me = self.my_id()?;
        let target = self.current.clone().ok_or(ClientError::NoConversation)?;
        if content.trim().is_empty() && attachment.is_none() {
            return Err(ClientError::InvalidInput("message is empty".into()));
        }

        let file_id = match attachment {
            Some(file) => Some(self.upload(file).await?),
            None => None,
        };
        let message = self
            .api
            .send_message(me, &target, content, file_id)
            .await?;

        self.store.push_message(target, message.clone());
        Ok(message)
    }

    /// Toggle `emoji` locally, then on the server. Returns whether the
    /// server now holds the reaction.
    pub async fn toggle_reaction(&mut self, message_id: Uuid, emoji: &str) -> Result<bool> {
        let me = self.my_id()?;
        let guessed = self.store.toggle_reaction_local(message_id, emoji);

        match self.api.toggle_reaction(message_id, me, emoji).await {
            Ok(outcome) => {
                let added = !outcome.is_removed();
                if let Some(guessed) = guessed {
                    self.store
                        .reconcile_reaction(message_id, emoji, guessed, added);
                }
                Ok(added)
            }
            Err(e) => {
                // undo the optimistic change
                if let Some(guessed) = guessed {
                    self.store
                        .reconcile_reaction(message_id, emoji, guessed, !guessed);
                }
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    pub async fn open_thread(&mut self, message_id: Uuid) -> Result<&[ThreadMessageView]> {
        let replies = self.api.list_replies(message_id).await?;
        self.store.set_replies(message_id, replies);
        Ok(self.store.replies(message_id))
    }

    pub async fn reply(
        &mut self,
        message_id: Uuid,
        content: &str,
        attachment: Option<&Attachment>,
    ) -> Result<ThreadMessageView> {
        let me = self.my_id()?;
        if content.trim().is_empty() && attachment.is_none() {
            return Err(ClientError::InvalidInput("reply is empty".into()));
        }

        let file_id = match attachment {
            Some(file) => Some(self.upload(file).await?),
            None => None,
        };
        let reply = self
            .api
            .add_reply(message_id, me, content, file_id)
            .await?;

        self.store.push_reply(message_id, reply.clone());
        Ok(reply)
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    pub async fn update_status(
        &mut self,
        status: Option<UserStatus>,
        status_message: Option<&str>,
    ) -> Result<UserView> {
        let me = self.my_id()?;
        let updated = self.api.update_status(me, status, status_message).await?;
        self.store.upsert_user(updated.clone());
        self.me = Some(updated.clone());
        Ok(updated)
    }

    pub async fn upload_profile_image(&mut self, image: &Attachment) -> Result<UserView> {
        let me = self.my_id()?;
        check_attachment(image)?;
        if !image.mime_type.starts_with("image/") {
            return Err(ClientError::InvalidInput(
                "profile picture must be an image".into(),
            ));
        }

        let updated = self.api.upload_profile_image(me, image).await?;
        self.store.upsert_user(updated.clone());
        self.me = Some(updated.clone());
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.store.search(query)
    }

    pub fn locate(&self, message_id: Uuid) -> Option<&MessageTarget> {
        self.store.locate(message_id)
    }

    async fn upload(&self, file: &Attachment) -> Result<Uuid> {
        check_attachment(file)?;
        Ok(self.api.upload_file(file).await?.file_id)
    }
}

/// Same limits the server enforces, checked before any bytes are sent.
fn check_attachment(file: &Attachment) -> Result<()> {
    if file.data.is_empty() {
        return Err(ClientError::InvalidInput("file is empty".into()));
    }
    if file.data.len() > MAX_FILE_SIZE {
        return Err(ClientError::InvalidInput(format!(
            "file exceeds {} MB",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }
    Ok(())
}
