use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::attachments::dtos::{AttachmentFileDto, UploadFileResponseDto};
use crate::features::attachments::routes::AttachmentState;
use crate::features::auth::AuthenticatedUser;

/// Upload a file
///
/// Accepts multipart/form-data with a `file` part. `chat_id` 0 stores the
/// file without a chat; any other id must be one of the user's chats.
pub async fn upload_file(
    user: AuthenticatedUser,
    Path(chat_id): Path<i64>,
    State(state): State<AttachmentState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadFileResponseDto>)> {
    let chat_id = if chat_id == 0 {
        None
    } else {
        Some(state.chats.get_owned(chat_id, user.id).await?.id)
    };

    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        if field.name() != Some("file") {
            debug!("Ignoring unknown field: {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        upload = Some((file_name, content_type, data.to_vec()));
        break;
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file part".to_string()))?;
    if file_name.is_empty() {
        return Err(AppError::BadRequest("No selected file".to_string()));
    }

    let attachment = state
        .attachments
        .upload(user.id, chat_id, &file_name, content_type.as_deref(), &data)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadFileResponseDto {
            success: true,
            file: AttachmentFileDto::from(&attachment),
        }),
    ))
}

/// Serve a stored file inline to its owner
pub async fn serve_file(
    user: AuthenticatedUser,
    Path(file_id): Path<i64>,
    State(state): State<AttachmentState>,
) -> Result<Response> {
    let attachment = state.attachments.get_owned(file_id, user.id).await?;
    let data = state.attachments.read(&attachment).await?;

    let content_type = HeaderValue::from_str(attachment.content_type_or_default())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        attachment.filename
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}
