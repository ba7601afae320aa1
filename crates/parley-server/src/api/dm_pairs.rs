use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use parley_shared::protocol::{DmChannelView, DmPairView, OpenDmRequest};
use parley_store::missing;
use serde::Deserialize;

use super::{parse_id, AppState};
use crate::error::ServerError;
use crate::views::{dm_channel_view, dm_pair_view};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DmPairsQuery {
    user_id: Option<String>,
}

pub(super) async fn list(
    State(state): State<AppState>,
    Query(query): Query<DmPairsQuery>,
) -> Result<Json<Vec<DmPairView>>, ServerError> {
    let user_id = parse_id(query.user_id.as_deref(), "userId")?;
    let pairs = state.with_db(|db| db.list_dm_pairs(user_id).map_err(missing("User")))?;
    Ok(Json(pairs.into_iter().map(dm_pair_view).collect()))
}

/// Get or create the DM channel between two users.
pub(super) async fn open(
    State(state): State<AppState>,
    payload: Result<Json<OpenDmRequest>, JsonRejection>,
) -> Result<Json<DmChannelView>, ServerError> {
    let Json(req) = payload?;
    let user_id = parse_id(req.user_id.as_deref(), "userId")?;
    let other_id = parse_id(req.other_user_id.as_deref(), "otherUserId")?;

    let pair = state.with_db(|db| db.open_dm(user_id, other_id))?;
    Ok(Json(dm_channel_view(pair)))
}
