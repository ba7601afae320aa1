use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use parley_shared::constants::{file_url, DEFAULT_UPLOAD_NAME};
use parley_shared::protocol::{CreateUserRequest, UpdateStatusRequest, UserView};
use parley_shared::UserStatus;
use parley_store::{missing, NewUser, StatusUpdate};
use serde::Deserialize;
use tracing::info;

use super::upload::{check_upload, read_upload};
use super::{non_blank, parse_id, AppState};
use crate::error::ServerError;
use crate::views::user_view;

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    id: Option<String>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<UserStatus>, ServerError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<UserStatus>())
        .transpose()
        .map_err(|e| ServerError::BadRequest(e.to_string()))
}

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ServerError> {
    let users = state.with_db(|db| db.list_users())?;
    Ok(Json(users.into_iter().map(user_view).collect()))
}

/// New users get a generated avatar; status defaults to `offline`.
pub(super) async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<UserView>, ServerError> {
    let Json(req) = payload?;
    let name =
        non_blank(req.name).ok_or_else(|| ServerError::BadRequest("name is required".into()))?;
    let status = parse_status(req.status.as_deref())?.unwrap_or_default();
    let status_message = req.status_message.unwrap_or_default();

    let profile_image = state.avatars.avatar_for(&name).await;

    let user = state.with_db(|db| {
        db.create_user(&NewUser {
            name,
            status,
            status_message,
            profile_image: Some(profile_image),
        })
    })?;
    info!(id = %user.id, name = %user.name, "User created");

    Ok(Json(user_view(user)))
}

/// Partial update: absent fields keep their current value.
pub(super) async fn update_status(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UserView>, ServerError> {
    let id = parse_id(query.id.as_deref(), "id")?;
    let Json(req) = payload?;
    let update = StatusUpdate {
        status: parse_status(req.status.as_deref())?,
        status_message: req.status_message,
    };

    let user = state.with_db(|db| db.update_user_status(id, &update).map_err(missing("User")))?;
    Ok(Json(user_view(user)))
}

/// Store an uploaded picture and point `profileImage` at it.
pub(super) async fn upload_profile_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UserView>, ServerError> {
    let upload = read_upload(multipart).await?;
    let user_id = parse_id(upload.field("userId"), "userId")?;

    check_upload(&upload.data, state.config.max_file_size)?;
    let mime_type = upload
        .content_type
        .clone()
        .filter(|m| m.starts_with("image/"))
        .ok_or_else(|| ServerError::Validation("Profile image must be an image".to_string()))?;

    state.with_db(|db| db.get_user(user_id).map_err(missing("User")))?;

    let locator = state.blob_store.put(&upload.data).await?;
    let name = upload
        .file_name
        .clone()
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    let size = upload.data.len() as i64;

    let user = state.with_db(|db| {
        let file = db.create_file(&name, &mime_type, size, &locator)?;
        db.set_profile_image(user_id, &file_url(file.id))
    })?;
    info!(id = %user.id, "Profile image updated");

    Ok(Json(user_view(user)))
}
