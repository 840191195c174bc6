use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::MagitechError;
use crate::extractors::{AuthUser, Json, Pagination};
use crate::game::combat::Removal;
use crate::game::{turn_change_data, ActivityKind, Actor};
use crate::models::game_session::{self, Entity as GameSession, GameSessionResponse};
use crate::models::session_player::{self, Entity as SessionPlayer, SessionPlayerResponse};
use crate::response::ApiResponse;

use super::characters::find_owned;
use super::AppState;

const MAX_SESSION_NAME_LEN: usize = 64;

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub name: String,
    /// Defaults to the server's per-session maximum.
    pub max_players: Option<i32>,
    /// Character the host plays in this session.
    pub character_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct JoinSessionRequest {
    pub character_id: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionRequest {
    pub x: f64,
    pub y: f64,
    pub map_name: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDetail {
    pub session: GameSessionResponse,
    pub players: Vec<SessionPlayerResponse>,
    pub combat_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeaveResponse {
    pub session_id: i32,
    pub session_closed: bool,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{id}", get(get_session))
        .route("/{id}/join", post(join_session))
        .route("/{id}/leave", post(leave_session))
        .route("/{id}/position", post(update_position))
}

// ── Shared lookups ──

/// An active session, or 404.
pub(crate) async fn find_active_session(
    state: &AppState,
    session_id: i32,
) -> Result<game_session::Model, MagitechError> {
    GameSession::find_by_id(session_id)
        .one(&state.db)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| MagitechError::NotFound(format!("Session {session_id} not found")))
}

/// The caller's membership row, or 403.
pub(crate) async fn require_member(
    state: &AppState,
    session_id: i32,
    user_id: i32,
) -> Result<session_player::Model, MagitechError> {
    find_membership(state, session_id, user_id)
        .await?
        .ok_or_else(|| MagitechError::Forbidden("Not a member of this session".to_string()))
}

async fn find_membership(
    state: &AppState,
    session_id: i32,
    user_id: i32,
) -> Result<Option<session_player::Model>, MagitechError> {
    Ok(SessionPlayer::find()
        .filter(session_player::Column::SessionId.eq(session_id))
        .filter(session_player::Column::UserId.eq(user_id))
        .one(&state.db)
        .await?)
}

/// Members in join order.
pub(crate) async fn session_players(
    state: &AppState,
    session_id: i32,
) -> Result<Vec<session_player::Model>, MagitechError> {
    Ok(members_in(&state.db, session_id).await?)
}

async fn members_in<C: ConnectionTrait>(
    conn: &C,
    session_id: i32,
) -> Result<Vec<session_player::Model>, DbErr> {
    SessionPlayer::find()
        .filter(session_player::Column::SessionId.eq(session_id))
        .order_by_asc(session_player::Column::JoinedAt)
        .order_by_asc(session_player::Column::Id)
        .all(conn)
        .await
}

async fn detail(
    state: &AppState,
    session: game_session::Model,
) -> Result<SessionDetail, MagitechError> {
    let players = session_players(state, session.id).await?;
    let combat_active = state.game.combats.is_active(session.id);
    Ok(SessionDetail {
        session: session.into(),
        players: players.into_iter().map(Into::into).collect(),
        combat_active,
    })
}

/// Add `user` to the session (or refresh their character if already in).
/// Must run under the membership lock. The member row and the session's
/// player count are committed together; the activity is logged after.
async fn add_member(
    state: &AppState,
    session_id: i32,
    user: &AuthUser,
    character_id: Option<i32>,
) -> Result<session_player::Model, MagitechError> {
    let session = find_active_session(state, session_id).await?;
    let character = match character_id {
        Some(id) => Some(find_owned(state, user.id, id).await?),
        None => None,
    };
    let now = Utc::now().naive_utc();

    if let Some(existing) = find_membership(state, session_id, user.id).await? {
        let Some(character) = character else {
            return Ok(existing);
        };
        let mut active: session_player::ActiveModel = existing.into();
        active.character_id = Set(Some(character.id));
        active.character_data = Set(character.data);
        active.last_update = Set(now);
        return Ok(active.update(&state.db).await?);
    }

    if session.is_full() {
        return Err(MagitechError::Conflict("Session is full".to_string()));
    }

    let (character_id, character_data) = match character {
        Some(c) => (Some(c.id), c.data),
        None => (None, json!({})),
    };
    let txn = state.db.begin().await?;
    let player = session_player::ActiveModel {
        session_id: Set(session_id),
        user_id: Set(user.id),
        username: Set(user.username.clone()),
        character_id: Set(character_id),
        character_data: Set(character_data),
        x: Set(0.0),
        y: Set(0.0),
        map_name: Set(None),
        direction: Set(None),
        joined_at: Set(now),
        last_update: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let count = refresh_player_count(&txn, session).await?;
    txn.commit().await?;

    state
        .game
        .activities
        .append(
            &state.db,
            session_id,
            actor(user),
            ActivityKind::PlayerJoined,
            json!({ "character_id": character_id, "current_players": count }),
        )
        .await?;

    tracing::info!(session_id, user_id = user.id, "player joined ({count} in session)");
    Ok(player)
}

/// Recount members and store the count on the session.
async fn refresh_player_count<C: ConnectionTrait>(
    conn: &C,
    session: game_session::Model,
) -> Result<i32, DbErr> {
    let count = SessionPlayer::find()
        .filter(session_player::Column::SessionId.eq(session.id))
        .count(conn)
        .await? as i32;
    let mut active: game_session::ActiveModel = session.into();
    active.current_players = Set(count);
    active.update(conn).await?;
    Ok(count)
}

pub(crate) fn actor(user: &AuthUser) -> Actor<'_> {
    Actor::User {
        id: user.id,
        username: &user.username,
    }
}

// ── Handlers ──

/// List active sessions, newest first.
#[utoipa::path(
    get,
    path = "/api/sessions",
    params(Pagination),
    responses(
        (status = 200, description = "Active sessions", body = ApiResponse<Vec<GameSessionResponse>>)
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    _user: AuthUser,
    pagination: Pagination,
) -> Result<ApiResponse<Vec<GameSessionResponse>>, MagitechError> {
    let sessions = GameSession::find()
        .filter(game_session::Column::IsActive.eq(true))
        .order_by_desc(game_session::Column::CreatedAt)
        .order_by_desc(game_session::Column::Id)
        .offset(pagination.offset)
        .limit(pagination.limit)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(
        sessions.into_iter().map(Into::into).collect(),
    ))
}

/// Create a session; the caller becomes host and first member.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = ApiResponse<SessionDetail>),
        (status = 400, description = "Invalid input")
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<ApiResponse<SessionDetail>, MagitechError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > MAX_SESSION_NAME_LEN {
        return Err(MagitechError::Validation(format!(
            "Session name must be 1 to {MAX_SESSION_NAME_LEN} characters"
        )));
    }
    let limit = state.game.config.max_players_per_session;
    let max_players = payload.max_players.unwrap_or(limit);
    if !(1..=limit).contains(&max_players) {
        return Err(MagitechError::Validation(format!(
            "max_players must be between 1 and {limit}"
        )));
    }
    if let Some(id) = payload.character_id {
        find_owned(&state, user.id, id).await?;
    }

    let session = game_session::ActiveModel {
        name: Set(name.to_string()),
        host_user_id: Set(user.id),
        max_players: Set(max_players),
        current_players: Set(0),
        is_active: Set(true),
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
            session.id,
            actor(&user),
            ActivityKind::SessionCreated,
            json!({ "name": session.name, "max_players": max_players }),
        )
        .await?;

    {
        let _membership = state.game.membership.lock().await;
        add_member(&state, session.id, &user, payload.character_id).await?;
    }

    tracing::info!(session_id = session.id, host = user.id, "session created");
    let session = find_active_session(&state, session.id).await?;
    Ok(ApiResponse::success(detail(&state, session).await?))
}

/// Session detail with its members.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = ApiResponse<SessionDetail>),
        (status = 404, description = "Not found")
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<SessionDetail>, MagitechError> {
    let session = find_active_session(&state, id).await?;
    Ok(ApiResponse::success(detail(&state, session).await?))
}

/// Join a session. Re-joining only refreshes the character.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/join",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Joined", body = ApiResponse<SessionDetail>),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session full")
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn join_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<JoinSessionRequest>,
) -> Result<ApiResponse<SessionDetail>, MagitechError> {
    {
        let _membership = state.game.membership.lock().await;
        add_member(&state, id, &user, payload.character_id).await?;
    }
    let session = find_active_session(&state, id).await?;
    Ok(ApiResponse::success(detail(&state, session).await?))
}

/// Leave a session. The last player out closes it.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/leave",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Left", body = ApiResponse<LeaveResponse>),
        (status = 404, description = "Session not found or not a member")
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn leave_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<LeaveResponse>, MagitechError> {
    let _membership = state.game.membership.lock().await;

    let session = find_active_session(&state, id).await?;
    let member = find_membership(&state, id, user.id)
        .await?
        .ok_or_else(|| MagitechError::NotFound("Not a member of this session".to_string()))?;
    let host_left = session.host_user_id == user.id;

    // Membership and the session row change together.
    let txn = state.db.begin().await?;
    member.delete(&txn).await?;
    let remaining = members_in(&txn, id).await?;
    let session_closed = remaining.is_empty();
    let new_host = if host_left { remaining.first().cloned() } else { None };
    let mut active: game_session::ActiveModel = session.into();
    active.current_players = Set(remaining.len() as i32);
    if session_closed {
        active.is_active = Set(false);
    }
    if let Some(host) = &new_host {
        active.host_user_id = Set(host.user_id);
    }
    active.update(&txn).await?;
    txn.commit().await?;

    let activities = &state.game.activities;
    let _order = state.game.combat_events.lock().await;

    match state.game.combats.remove_participant(id, user.id) {
        Some((Removal::TurnPassed(_), view)) => {
            activities
                .append(
                    &state.db,
                    id,
                    Actor::System,
                    ActivityKind::TurnChange,
                    turn_change_data(&view),
                )
                .await?;
            state.game.schedule_if_enemy_turn(&state.db, &view);
        }
        Some((Removal::Emptied, view)) => {
            activities
                .append(
                    &state.db,
                    id,
                    Actor::System,
                    ActivityKind::CombatEnd,
                    json!({ "combat_id": view.combat_id, "outcome": "abandoned" }),
                )
                .await?;
        }
        Some((Removal::Unchanged | Removal::NotPresent, _)) | None => {}
    }

    activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::PlayerLeft,
            json!({ "current_players": remaining.len() }),
        )
        .await?;

    if let Some(host) = &new_host {
        activities
            .append(
                &state.db,
                id,
                Actor::System,
                ActivityKind::HostChanged,
                json!({ "host_user_id": host.user_id, "username": host.username }),
            )
            .await?;
    }

    if session_closed {
        if let Some(view) = state.game.combats.end_for_session(id) {
            activities
                .append(
                    &state.db,
                    id,
                    Actor::System,
                    ActivityKind::CombatEnd,
                    json!({ "combat_id": view.combat_id, "outcome": "abandoned" }),
                )
                .await?;
        }
        activities
            .append(&state.db, id, Actor::System, ActivityKind::SessionClosed, json!({}))
            .await?;
        activities.forget(id).await;
        tracing::info!(session_id = id, "session closed");
    }

    tracing::info!(session_id = id, user_id = user.id, "player left");
    Ok(ApiResponse::success(LeaveResponse {
        session_id: id,
        session_closed,
    }))
}

/// Report the caller's position on the world map.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/position",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = PositionRequest,
    responses(
        (status = 200, description = "Position stored", body = ApiResponse<SessionPlayerResponse>),
        (status = 400, description = "Invalid coordinates"),
        (status = 403, description = "Not a member")
    ),
    tag = "sessions",
    security(("bearer_auth" = []))
)]
pub async fn update_position(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<PositionRequest>,
) -> Result<ApiResponse<SessionPlayerResponse>, MagitechError> {
    if !payload.x.is_finite() || !payload.y.is_finite() {
        return Err(MagitechError::Validation(
            "Coordinates must be finite numbers".to_string(),
        ));
    }
    find_active_session(&state, id).await?;
    let member = require_member(&state, id, user.id).await?;

    let mut active: session_player::ActiveModel = member.into();
    active.x = Set(payload.x);
    active.y = Set(payload.y);
    if payload.map_name.is_some() {
        active.map_name = Set(payload.map_name.clone());
    }
    if payload.direction.is_some() {
        active.direction = Set(payload.direction.clone());
    }
    active.last_update = Set(Utc::now().naive_utc());
    let player = active.update(&state.db).await?;

    state
        .game
        .activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::PositionUpdate,
            json!({
                "x": player.x,
                "y": player.y,
                "map_name": player.map_name,
                "direction": player.direction,
            }),
        )
        .await?;

    Ok(ApiResponse::success(player.into()))
}
