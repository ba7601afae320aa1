use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use parley_shared::protocol::{CreateMessageRequest, MessageView};
use parley_shared::MessageTarget;
use parley_store::{missing, NewMessage};
use serde::Deserialize;
use tracing::info;

use super::{non_blank, parse_id, parse_opt_id, AppState};
use crate::error::ServerError;
use crate::views::message_view;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MessagesQuery {
    channel_id: Option<String>,
    avatar_id: Option<String>,
}

/// Exactly one of the two selectors must be present.
fn target(channel_id: Option<&str>, avatar_id: Option<String>) -> Result<MessageTarget, ServerError> {
    let channel_id = parse_opt_id(channel_id, "channelId")?;
    MessageTarget::from_selectors(channel_id, non_blank(avatar_id)).ok_or_else(|| {
        ServerError::BadRequest("Exactly one of channelId or avatarId is required".to_string())
    })
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageView>>, ServerError> {
    let target = target(query.channel_id.as_deref(), query.avatar_id)?;

    let details = state.with_db(|db| {
        if let MessageTarget::Channel(id) = &target {
            db.get_channel(*id).map_err(missing("Channel"))?;
        }
        db.list_message_details(&target)
    })?;

    Ok(Json(details.into_iter().map(message_view).collect()))
}

pub(super) async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<Json<MessageView>, ServerError> {
    let Json(req) = payload?;
    let user_id = parse_id(req.user_id.as_deref(), "userId")?;
    let target = target(req.channel_id.as_deref(), req.avatar_id)?;
    let content = req.content.unwrap_or_default();
    let file_id = req.file.map(|f| f.id);

    if content.trim().is_empty() && file_id.is_none() {
        return Err(ServerError::BadRequest(
            "content is required unless a file is attached".to_string(),
        ));
    }

    let details = state.with_db(|db| {
        let message = db.insert_message(&NewMessage {
            content,
            user_id,
            target,
            file_id,
        })?;
        db.get_message_details(message.id)
    })?;

    info!(
        id = %details.message.id,
        user = %details.author_name,
        attachment = details.file.is_some(),
        "Message created"
    );

    Ok(Json(message_view(details)))
}
