use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use minijinja::context;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{is_json_request, wants_json, AppJson};
use crate::features::auth::AuthenticatedUser;
use crate::features::chats::dtos::{
    ChatQuery, DeleteChatResponseDto, RenameChatDto, RenameChatForm, RenameChatResponseDto,
    SendMessageDto, SendMessageResponseDto,
};
use crate::features::chats::routes::ChatState;
use crate::features::chats::services::{InlineUpload, MessageInput};
use crate::shared::constants::DEFAULT_CHAT_NAME;
use crate::shared::flash::{redirect_with_flash, render_page, Flash, Flashes};

fn chat_url(chat_id: i64) -> String {
    format!("/chat?chat_id={}", chat_id)
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Read the `prompt` text and every `file` part of a multipart body
async fn read_prompt_and_files(mut multipart: Multipart) -> Result<(String, Vec<InlineUpload>)> {
    let mut prompt = String::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => {
                prompt = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read prompt: {}", e)))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                if !filename.is_empty() {
                    uploads.push(InlineUpload {
                        filename,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            other => debug!("Ignoring unknown field: {:?}", other),
        }
    }

    Ok((prompt, uploads))
}

/// Main chat page
pub async fn chat_view(
    user: AuthenticatedUser,
    State(state): State<ChatState>,
    Query(query): Query<ChatQuery>,
    flashes: Flashes,
) -> Result<Response> {
    if user.username.is_none() {
        return Ok(Redirect::to("/set-username").into_response());
    }

    let chats = state.chats.list_or_create(user.id).await?;
    let requested = query
        .chat_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());
    let active_chat = requested
        .and_then(|id| chats.iter().find(|chat| chat.id == id))
        .unwrap_or(&chats[0])
        .clone();

    let messages = state.chats.messages(active_chat.id).await?;

    render_page(
        StatusCode::OK,
        "pages/chat.jinja",
        flashes,
        context! {
            user => user,
            chats => chats,
            active_chat => active_chat,
            messages => messages,
        },
    )
}

pub async fn new_chat(
    user: AuthenticatedUser,
    State(state): State<ChatState>,
) -> Result<Redirect> {
    let chat = state.chats.create(user.id, DEFAULT_CHAT_NAME).await?;
    Ok(Redirect::to(&chat_url(chat.id)))
}

/// Delete a chat; a fresh one is created when it was the last
pub async fn delete_chat(
    user: AuthenticatedUser,
    Path(chat_id): Path<i64>,
    State(state): State<ChatState>,
) -> Result<Json<DeleteChatResponseDto>> {
    let chat = state.chats.get_owned(chat_id, user.id).await?;
    state.chats.delete(chat.id).await?;

    let redirect = if state.chats.list_for_user(user.id).await?.is_empty() {
        let fresh = state.chats.create(user.id, DEFAULT_CHAT_NAME).await?;
        chat_url(fresh.id)
    } else {
        "/chat".to_string()
    };

    Ok(Json(DeleteChatResponseDto { redirect }))
}

/// Rename a chat from a JSON `{name}` body or a `new_name` form field
pub async fn rename_chat(
    user: AuthenticatedUser,
    Path(chat_id): Path<i64>,
    State(state): State<ChatState>,
    req: Request,
) -> Result<Response> {
    let chat = state.chats.get_owned(chat_id, user.id).await?;
    let respond_json = wants_json(req.headers());

    let new_name = if is_json_request(req.headers()) {
        match AppJson::<RenameChatDto>::from_request(req, &()).await {
            Ok(AppJson(body)) => body.name,
            Err(rejection) => return Ok(rejection.into_response()),
        }
    } else {
        match Form::<RenameChatForm>::from_request(req, &()).await {
            Ok(Form(form)) => form.new_name,
            Err(rejection) => return Ok(rejection.into_response()),
        }
    };

    let chat = state
        .chats
        .rename(chat, new_name.as_deref().unwrap_or_default())
        .await?;

    if respond_json {
        Ok(Json(RenameChatResponseDto {
            success: true,
            name: chat.name,
        })
        .into_response())
    } else {
        Ok(Redirect::to(&chat_url(chat.id)).into_response())
    }
}

/// Send a message in a chat and answer with the assistant reply.
///
/// Accepts JSON `{message, attachments: [{id}]}` or multipart `prompt` and
/// `file` parts.
pub async fn send_message(
    user: AuthenticatedUser,
    Path(chat_id): Path<i64>,
    State(state): State<ChatState>,
    req: Request,
) -> Result<Response> {
    let chat = state.chats.get_owned(chat_id, user.id).await?;

    let input = if is_multipart(&req) {
        let multipart = match Multipart::from_request(req, &()).await {
            Ok(multipart) => multipart,
            Err(rejection) => return Ok(rejection.into_response()),
        };
        let (text, uploads) = read_prompt_and_files(multipart).await?;
        MessageInput {
            text,
            uploads,
            attachment_ids: Vec::new(),
        }
    } else {
        let body = match AppJson::<SendMessageDto>::from_request(req, &()).await {
            Ok(AppJson(body)) => body,
            Err(rejection) => return Ok(rejection.into_response()),
        };
        MessageInput {
            text: body.message.unwrap_or_default(),
            uploads: Vec::new(),
            attachment_ids: body
                .attachments
                .unwrap_or_default()
                .into_iter()
                .map(|attachment| attachment.id)
                .collect(),
        }
    };

    let reply = state.messages.send(&user, &chat, input).await?;
    Ok(Json(SendMessageResponseDto { reply }).into_response())
}

/// Start a titled chat from an uploaded file and an optional prompt
pub async fn upload_chat(
    user: AuthenticatedUser,
    State(state): State<ChatState>,
    multipart: Multipart,
) -> Result<Response> {
    let (prompt, uploads) = read_prompt_and_files(multipart).await?;

    let Some(upload) = uploads.into_iter().next() else {
        return Ok(redirect_with_flash(
            "/chat",
            Flash::danger("⚠️ Please select a file to upload."),
        ));
    };

    let chat = state
        .messages
        .start_chat_from_upload(&user, &prompt, upload)
        .await?;
    Ok(Redirect::to(&chat_url(chat.id)).into_response())
}
