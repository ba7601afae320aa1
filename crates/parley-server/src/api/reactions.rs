use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use parley_shared::protocol::{ToggleReactionRequest, ToggleReactionResponse};
use parley_store::ReactionToggle;
use tracing::debug;

use super::{non_blank, parse_id, AppState};
use crate::error::ServerError;
use crate::views::reaction_view;

/// Absent becomes present and the new reaction is returned; present
/// becomes absent and `{removed: true}` is returned.
pub(super) async fn toggle(
    State(state): State<AppState>,
    payload: Result<Json<ToggleReactionRequest>, JsonRejection>,
) -> Result<Json<ToggleReactionResponse>, ServerError> {
    let Json(req) = payload?;
    let message_id = parse_id(req.message_id.as_deref(), "messageId")?;
    let user_id = parse_id(req.user_id.as_deref(), "userId")?;
    let emoji =
        non_blank(req.emoji).ok_or_else(|| ServerError::BadRequest("emoji is required".into()))?;

    let outcome = state.with_db(|db| db.toggle_reaction(message_id, user_id, &emoji))?;
    debug!(%message_id, %user_id, emoji = %emoji, "Reaction toggled");

    Ok(Json(match outcome {
        ReactionToggle::Added(reaction) => ToggleReactionResponse::Added(reaction_view(reaction)),
        ReactionToggle::Removed => ToggleReactionResponse::removed(),
    }))
}
