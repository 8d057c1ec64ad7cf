//! Service wiring and the HTTP router

use axum::{extract::DefaultBodyLimit, http::StatusCode, routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::core::config::Config;
use crate::core::middleware::{self, SessionState};
use crate::features::attachments::{self, AttachmentService, AttachmentState};
use crate::features::auth::{self, AuthService, TokenService};
use crate::features::chats::{self, ChatService, ChatState, MessageService};
use crate::features::users::UserService;
use crate::modules::extraction::{ContentExtractor, OcrEngine};
use crate::modules::mail::Mailer;
use crate::modules::storage::LocalStorage;
use crate::shared::llm::{AiBridge, ChatCompletionClient};

/// Every long-lived service, built once at startup
pub struct AppContext {
    pub config: Config,
    pub users: Arc<UserService>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub attachments: Arc<AttachmentService>,
    pub chats: Arc<ChatService>,
    pub messages: Arc<MessageService>,
}

impl AppContext {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        mailer: Arc<dyn Mailer>,
        completions: Arc<dyn ChatCompletionClient>,
        ocr: Box<dyn OcrEngine>,
    ) -> Self {
        let users = Arc::new(UserService::new(pool.clone()));
        let tokens = Arc::new(TokenService::new(&config.auth));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&users),
            Arc::clone(&tokens),
            mailer,
            config.app.public_base_url.clone(),
            config.auth.bcrypt_cost,
            config.auth.secure_cookies,
        ));
        tracing::info!("Auth services initialized");

        let storage = Arc::new(LocalStorage::new(config.storage.upload_dir.clone()));
        let attachments = Arc::new(AttachmentService::new(
            pool.clone(),
            storage,
            config.storage.allowed_extensions.clone(),
        ));
        tracing::info!(
            "Attachment service initialized (upload_dir={})",
            config.storage.upload_dir.display()
        );

        let bridge = Arc::new(AiBridge::new(completions, config.llm.clone()));
        let extractor = Arc::new(ContentExtractor::new(ocr));
        let chats = Arc::new(ChatService::new(pool.clone()));
        let messages = Arc::new(MessageService::new(
            pool,
            Arc::clone(&attachments),
            extractor,
            bridge,
            config.app.public_base_url.clone(),
        ));
        tracing::info!(
            "Chat services initialized (chat_model={}, title_model={})",
            config.llm.chat_model,
            config.llm.title_model
        );

        Self {
            config,
            users,
            tokens,
            auth,
            attachments,
            chats,
            messages,
        }
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Assemble all feature routers with the session, body-limit and tracing layers
pub fn build_router(ctx: &AppContext) -> Router {
    let session_state = SessionState {
        tokens: Arc::clone(&ctx.tokens),
        users: Arc::clone(&ctx.users),
    };

    Router::new()
        .merge(auth::routes(Arc::clone(&ctx.auth)))
        .merge(chats::routes(ChatState {
            chats: Arc::clone(&ctx.chats),
            messages: Arc::clone(&ctx.messages),
        }))
        .merge(attachments::routes(AttachmentState {
            attachments: Arc::clone(&ctx.attachments),
            chats: Arc::clone(&ctx.chats),
        }))
        .layer(axum::middleware::from_fn_with_state(
            session_state,
            middleware::session_middleware,
        ))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(ctx.config.app.max_request_body_size))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
}
