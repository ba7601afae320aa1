use axum::extract::{Multipart, Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_shared::constants::{file_url, DEFAULT_MIME_TYPE, DEFAULT_UPLOAD_NAME};
use parley_shared::protocol::FileUploadResponse;
use parley_store::missing;
use tracing::info;

use super::upload::{check_upload, read_upload};
use super::{non_blank, parse_id, AppState};
use crate::error::ServerError;

/// Multipart `{file, filename?}`. The bytes go to the blob store; the
/// returned id is what messages and replies attach by reference.
pub(super) async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FileUploadResponse>, ServerError> {
    let upload = read_upload(multipart).await?;
    check_upload(&upload.data, state.config.max_file_size)?;

    let name = non_blank(upload.field("filename").map(str::to_string))
        .or_else(|| upload.file_name.clone())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    let mime_type = upload
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let size = upload.data.len() as i64;

    let locator = state.blob_store.put(&upload.data).await?;
    let file = state.with_db(|db| db.create_file(&name, &mime_type, size, &locator))?;

    info!(id = %file.id, name = %file.name, size, "File uploaded");

    Ok(Json(FileUploadResponse {
        file_id: file.id,
        file_url: file_url(file.id),
    }))
}

pub(super) async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let id = parse_id(Some(&id), "id")?;
    let file = state.with_db(|db| db.get_file(id).map_err(missing("File")))?;
    let data = state.blob_store.get(&file.locator).await?;

    let content_type = HeaderValue::from_str(&file.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));
    let safe_name = file.name.replace(['"', '\\', '\r', '\n'], "_");
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{safe_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, disposition),
            (
                CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000"),
            ),
        ],
        data,
    )
        .into_response())
}
