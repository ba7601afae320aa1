//! Typed wrapper over the server's HTTP endpoints.

use parley_shared::protocol::{
    ChannelView, CreateChannelRequest, CreateMessageRequest, CreateReplyRequest,
    CreateUserRequest, DmChannelView, DmPairView, ErrorResponse, FileRef, FileUploadResponse,
    HealthResponse, MessageView, OpenDmRequest, ThreadMessageView, ToggleReactionRequest,
    ToggleReactionResponse, UpdateStatusRequest, UserView,
};
use parley_shared::{MessageTarget, UserStatus};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ClientError, Result};

/// A file about to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute form of a server-relative URL such as `/files/<id>`.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:")
        {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/health", &[]).await
    }

    // -- channels ---------------------------------------------------------

    pub async fn list_channels(&self) -> Result<Vec<ChannelView>> {
        self.get_json("/channels", &[]).await
    }

    pub async fn create_channel(&self, name: &str) -> Result<ChannelView> {
        let body = CreateChannelRequest {
            name: Some(name.to_string()),
        };
        self.post_json("/channels", &[], &body).await
    }

    // -- direct messages --------------------------------------------------

    pub async fn list_dm_pairs(&self, user_id: Uuid) -> Result<Vec<DmPairView>> {
        self.get_json("/dm-pairs", &[("userId", user_id.to_string())])
            .await
    }

    pub async fn open_dm(&self, user_id: Uuid, other_user_id: Uuid) -> Result<DmChannelView> {
        let body = OpenDmRequest {
            user_id: Some(user_id.to_string()),
            other_user_id: Some(other_user_id.to_string()),
        };
        self.post_json("/dm-pairs", &[], &body).await
    }

    // -- messages ---------------------------------------------------------

    pub async fn list_messages(&self, target: &MessageTarget) -> Result<Vec<MessageView>> {
        self.get_json("/messages", &[selector(target)]).await
    }

    pub async fn send_message(
        &self,
        user_id: Uuid,
        target: &MessageTarget,
        content: &str,
        file_id: Option<Uuid>,
    ) -> Result<MessageView> {
        let body = CreateMessageRequest {
            content: Some(content.to_string()),
            user_id: Some(user_id.to_string()),
            channel_id: target.channel_id().map(|id| id.to_string()),
            avatar_id: target.avatar_id().map(str::to_string),
            file: file_id.map(|id| FileRef { id }),
        };
        self.post_json("/messages", &[], &body).await
    }

    pub async fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<ToggleReactionResponse> {
        let body = ToggleReactionRequest {
            message_id: Some(message_id.to_string()),
            user_id: Some(user_id.to_string()),
            emoji: Some(emoji.to_string()),
        };
        self.post_json("/reactions", &[], &body).await
    }

    // -- threads ----------------------------------------------------------

    pub async fn list_replies(&self, message_id: Uuid) -> Result<Vec<ThreadMessageView>> {
        self.get_json("/threads", &[("messageId", message_id.to_string())])
            .await
    }

    pub async fn add_reply(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        content: &str,
        file_id: Option<Uuid>,
    ) -> Result<ThreadMessageView> {
        let body = CreateReplyRequest {
            content: Some(content.to_string()),
            user_id: Some(user_id.to_string()),
            file: file_id.map(|id| FileRef { id }),
        };
        self.post_json("/threads", &[("messageId", message_id.to_string())], &body)
            .await
    }

    // -- users ------------------------------------------------------------

    pub async fn list_users(&self) -> Result<Vec<UserView>> {
        self.get_json("/users", &[]).await
    }

    pub async fn create_user(&self, name: &str, status: Option<UserStatus>) -> Result<UserView> {
        let body = CreateUserRequest {
            name: Some(name.to_string()),
            status: status.map(|s| s.to_string()),
            status_message: None,
        };
        self.post_json("/users", &[], &body).await
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        status: Option<UserStatus>,
        status_message: Option<&str>,
    ) -> Result<UserView> {
        let body = UpdateStatusRequest {
            status: status.map(|s| s.to_string()),
            status_message: status_message.map(str::to_string),
        };
        let resp = self
            .http
            .patch(self.url("/users"))
            .query(&[("id", user_id.to_string())])
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn upload_profile_image(
        &self,
        user_id: Uuid,
        image: &Attachment,
    ) -> Result<UserView> {
        let form = Form::new()
            .text("userId", user_id.to_string())
            .part("file", file_part(image)?);
        self.post_form("/users/upload", form).await
    }

    // -- files ------------------------------------------------------------

    pub async fn upload_file(&self, file: &Attachment) -> Result<FileUploadResponse> {
        let form = Form::new()
            .part("file", file_part(file)?)
            .text("filename", file.name.clone());
        self.post_form("/files/upload", form).await
    }

    /// Fetch stored bytes by their server-relative or absolute URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(self.resolve(url)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(api_error(resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }

    // -- plumbing ---------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(path, "GET");
        let resp = self.http.get(self.url(path)).query(query).send().await?;
        decode(resp).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        debug!(path, "POST");
        let resp = self
            .http
            .post(self.url(path))
            .query(query)
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        debug!(path, "POST multipart");
        let resp = self.http.post(self.url(path)).multipart(form).send().await?;
        decode(resp).await
    }
}

fn selector(target: &MessageTarget) -> (&'static str, String) {
    match target {
        MessageTarget::Channel(id) => ("channelId", id.to_string()),
        MessageTarget::Avatar(avatar) => ("avatarId", avatar.clone()),
    }
}

fn file_part(file: &Attachment) -> Result<Part> {
    Ok(Part::bytes(file.data.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?)
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    if resp.status().is_success() {
        Ok(resp.json().await?)
    } else {
        Err(api_error(resp).await)
    }
}

/// Turn a non-success response into [`ClientError::Api`], keeping the
/// server's `error` message when the body carries one.
async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => match body.details {
            Some(details) => format!("{} ({details})", body.error),
            None => body.error,
        },
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
