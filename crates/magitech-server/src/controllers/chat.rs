use axum::{
    extract::{Path, RawQuery, State},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::error::MagitechError;
use crate::extractors::{AuthUser, Json};
use crate::game::ActivityKind;
use crate::models::chat_message::{self, ChatMessageResponse, Entity as ChatMessage};
use crate::response::ApiResponse;

use super::sessions::{actor, find_active_session, require_member};
use super::AppState;

const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChatQuery {
    /// Number of recent messages (capped by server config).
    pub limit: Option<u64>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/{id}/chat", get(list_messages).post(send_message))
}

/// Most recent messages, oldest first.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/chat",
    params(("id" = i32, Path, description = "Session ID"), ChatQuery),
    responses(
        (status = 200, description = "Chat history", body = ApiResponse<Vec<ChatMessageResponse>>),
        (status = 403, description = "Not a member")
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    RawQuery(query): RawQuery,
) -> Result<ApiResponse<Vec<ChatMessageResponse>>, MagitechError> {
    let query: ChatQuery = serde_urlencoded::from_str(query.as_deref().unwrap_or(""))
        .map_err(|e| MagitechError::Validation(format!("Invalid chat query: {}", e)))?;
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;

    let max = state.game.config.chat_history_limit.max(1);
    let limit = query.limit.unwrap_or(max).clamp(1, max);

    let mut messages = ChatMessage::find()
        .filter(chat_message::Column::SessionId.eq(id))
        .order_by_desc(chat_message::Column::Id)
        .limit(limit)
        .all(&state.db)
        .await?;
    messages.reverse();

    Ok(ApiResponse::success(
        messages.into_iter().map(Into::into).collect(),
    ))
}

/// Post a chat message to the session.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/chat",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Message sent", body = ApiResponse<ChatMessageResponse>),
        (status = 400, description = "Empty or oversized message"),
        (status = 403, description = "Not a member")
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ChatRequest>,
) -> Result<ApiResponse<ChatMessageResponse>, MagitechError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(MagitechError::Validation("Message cannot be empty".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(MagitechError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;

    let model = chat_message::ActiveModel {
        session_id: Set(id),
        user_id: Set(user.id),
        username: Set(user.username.clone()),
        message: Set(message.to_string()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    state
        .game
        .activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::Chat,
            json!({ "message_id": model.id, "message": model.message }),
        )
        .await?;

    Ok(ApiResponse::success(model.into()))
}
