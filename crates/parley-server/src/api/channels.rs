use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use parley_shared::protocol::{ChannelView, CreateChannelRequest};
use tracing::info;

use super::{non_blank, AppState};
use crate::error::ServerError;
use crate::views::channel_view;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<ChannelView>>, ServerError> {
    let channels = state.with_db(|db| db.list_channels())?;
    Ok(Json(channels.into_iter().map(channel_view).collect()))
}

/// Duplicate names are allowed.
pub(super) async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateChannelRequest>, JsonRejection>,
) -> Result<Json<ChannelView>, ServerError> {
    let Json(req) = payload?;
    let name =
        non_blank(req.name).ok_or_else(|| ServerError::BadRequest("name is required".into()))?;

    let channel = state.with_db(|db| db.create_channel(&name))?;
    info!(id = %channel.id, name = %channel.name, "Channel created");

    Ok(Json(channel_view(channel)))
}
