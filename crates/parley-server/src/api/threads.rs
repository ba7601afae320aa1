use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use parley_shared::protocol::{CreateReplyRequest, ThreadMessageView};
use parley_store::{missing, NewReply};
use serde::Deserialize;
use tracing::info;

use super::{parse_id, AppState};
use crate::error::ServerError;
use crate::views::thread_message_view;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ThreadQuery {
    message_id: Option<String>,
}

/// Replies of a message's thread, oldest first. The thread is created on
/// first access.
pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Vec<ThreadMessageView>>, ServerError> {
    let message_id = parse_id(query.message_id.as_deref(), "messageId")?;

    let replies = state.with_db(|db| {
        let thread = db.get_or_create_thread(message_id)?;
        db.list_replies(thread.id)
    })?;

    Ok(Json(replies.into_iter().map(thread_message_view).collect()))
}

pub(super) async fn reply(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
    payload: Result<Json<CreateReplyRequest>, JsonRejection>,
) -> Result<Json<ThreadMessageView>, ServerError> {
    let message_id = parse_id(query.message_id.as_deref(), "messageId")?;
    let Json(req) = payload?;
    let user_id = parse_id(req.user_id.as_deref(), "userId")?;
    let content = req.content.unwrap_or_default();
    let file_id = req.file.map(|f| f.id);

    if content.trim().is_empty() && file_id.is_none() {
        return Err(ServerError::BadRequest(
            "content is required unless a file is attached".to_string(),
        ));
    }

    let reply = state.with_db(|db| {
        // resolve references first so a rejected reply creates no thread
        db.get_user(user_id).map_err(missing("User"))?;
        if let Some(file_id) = file_id {
            db.get_file(file_id).map_err(missing("File"))?;
        }
        let thread = db.get_or_create_thread(message_id)?;
        db.add_reply(
            thread.id,
            &NewReply {
                content,
                user_id,
                file_id,
            },
        )
    })?;

    info!(id = %reply.reply.id, thread = %reply.reply.thread_id, "Reply added");

    Ok(Json(thread_message_view(reply)))
}
