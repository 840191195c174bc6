use axum::{
    extract::{Path, RawQuery, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::MagitechError;
use crate::extractors::AuthUser;
use crate::game::CombatView;
use crate::models::game_session::GameSessionResponse;
use crate::models::session_activity::ActivityResponse;
use crate::models::session_player::{self, SessionPlayerResponse};
use crate::response::ApiResponse;

use super::sessions::{find_active_session, require_member, session_players};
use super::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SyncQuery {
    /// Last activity sequence the client has seen (default 0).
    #[serde(default)]
    pub since: i64,
    /// Maximum activities to return (capped by server config).
    pub limit: Option<u64>,
}

/// Everything a polling client needs to catch up.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub session: GameSessionResponse,
    pub players: Vec<SessionPlayerResponse>,
    /// Activities with `sequence > since`, oldest first.
    pub activities: Vec<ActivityResponse>,
    pub latest_sequence: i64,
    /// More activities remain past the last one returned.
    pub has_more: bool,
    pub combat: Option<CombatView>,
    pub server_time: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/{id}/sync", get(sync_session))
}

/// Poll for session state and new activities. Also refreshes the caller's
/// heartbeat.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/sync",
    params(("id" = i32, Path, description = "Session ID"), SyncQuery),
    responses(
        (status = 200, description = "Sync snapshot", body = ApiResponse<SyncResponse>),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Session not found")
    ),
    tag = "sync",
    security(("bearer_auth" = []))
)]
pub async fn sync_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    RawQuery(query): RawQuery,
) -> Result<ApiResponse<SyncResponse>, MagitechError> {
    let query: SyncQuery = serde_urlencoded::from_str(query.as_deref().unwrap_or(""))
        .map_err(|e| MagitechError::Validation(format!("Invalid sync query: {}", e)))?;

    let session = find_active_session(&state, id).await?;
    let member = require_member(&state, id, user.id).await?;

    let mut heartbeat: session_player::ActiveModel = member.into();
    heartbeat.last_update = Set(Utc::now().naive_utc());
    heartbeat.update(&state.db).await?;

    let max = state.game.config.sync_activity_limit.max(1);
    let limit = query.limit.unwrap_or(max).clamp(1, max);
    let since = query.since.max(0);

    // One extra row tells us whether the client is still behind.
    let mut activities = state
        .game
        .activities
        .since(&state.db, id, since, limit + 1)
        .await?;
    let has_more = activities.len() as u64 > limit;
    activities.truncate(limit as usize);

    let latest_sequence = state.game.activities.latest_sequence(&state.db, id).await?;
    let players = session_players(&state, id).await?;

    tracing::trace!(
        session_id = id,
        user_id = user.id,
        since,
        returned = activities.len(),
        "sync"
    );

    Ok(ApiResponse::success(SyncResponse {
        session: session.into(),
        players: players.into_iter().map(Into::into).collect(),
        activities: activities.into_iter().map(Into::into).collect(),
        latest_sequence,
        has_more,
        combat: state.game.combats.get(id),
        server_time: Utc::now(),
    }))
}
