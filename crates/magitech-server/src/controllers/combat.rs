use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::error::MagitechError;
use crate::extractors::{AuthUser, Json};
use crate::game::combat::{ActionOutcome, CombatActionKind};
use crate::game::{turn_change_data, ActivityKind, Actor, CombatView, Enemy, PlayerAction};
use crate::response::ApiResponse;

use super::sessions::{actor, find_active_session, require_member, session_players};
use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartCombatRequest {
    pub enemy: Enemy,
    /// User ids taking part. Defaults to every member of the session.
    pub participants: Option<Vec<i32>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// `continue`, `enemy_defeated` or `all_fled`.
    pub outcome: String,
    pub combat: CombatView,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/combat", get(get_combat))
        .route("/{id}/combat/start", post(start_combat))
        .route("/{id}/combat/action", post(combat_action))
        .route("/{id}/combat/end", post(end_combat))
}

const MAX_ENEMY_LEVEL: i32 = 1000;

fn validate_enemy(enemy: &Enemy) -> Result<(), MagitechError> {
    if enemy.name.trim().is_empty() {
        return Err(MagitechError::Validation("Enemy name is required".into()));
    }
    if !(1..=MAX_ENEMY_LEVEL).contains(&enemy.level) {
        return Err(MagitechError::Validation(format!(
            "Enemy level must be between 1 and {MAX_ENEMY_LEVEL}"
        )));
    }
    if enemy.hp < 1 || enemy.max_hp < enemy.hp {
        return Err(MagitechError::Validation(
            "Enemy hp must be between 1 and max_hp".into(),
        ));
    }
    Ok(())
}

fn combat_end_data(view: &CombatView, outcome: &str) -> serde_json::Value {
    json!({
        "combat_id": view.combat_id,
        "outcome": outcome,
        "enemy_hp": view.enemy.hp,
    })
}

/// Current combat in the session.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/combat",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Combat state", body = ApiResponse<CombatView>),
        (status = 403, description = "Not a member"),
        (status = 404, description = "No active combat")
    ),
    tag = "combat",
    security(("bearer_auth" = []))
)]
pub async fn get_combat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<CombatView>, MagitechError> {
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;
    let view = state
        .game
        .combats
        .get(id)
        .ok_or_else(|| MagitechError::NotFound("No active combat in this session".into()))?;
    Ok(ApiResponse::success(view))
}

/// Start a combat against one enemy.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/combat/start",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = StartCombatRequest,
    responses(
        (status = 200, description = "Combat started", body = ApiResponse<CombatView>),
        (status = 400, description = "Invalid enemy or participants"),
        (status = 403, description = "Not a member"),
        (status = 409, description = "Combat already in progress")
    ),
    tag = "combat",
    security(("bearer_auth" = []))
)]
pub async fn start_combat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<StartCombatRequest>,
) -> Result<ApiResponse<CombatView>, MagitechError> {
    validate_enemy(&payload.enemy)?;
    // Members read here must still be members when the combat is created.
    let _membership = state.game.membership.lock().await;
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;

    let members: Vec<i32> = session_players(&state, id)
        .await?
        .into_iter()
        .map(|p| p.user_id)
        .collect();
    let participants = match payload.participants {
        Some(requested) => {
            if let Some(stranger) = requested.iter().find(|uid| !members.contains(uid)) {
                return Err(MagitechError::Validation(format!(
                    "User {stranger} is not a member of this session"
                )));
            }
            requested
        }
        None => members,
    };

    let _order = state.game.combat_events.lock().await;
    let view = state.game.combats.start(
        id,
        payload.enemy,
        &participants,
        state.game.config.turn_timeout(),
    )?;

    tracing::info!(
        session_id = id,
        combat_id = %view.combat_id,
        participants = view.participants.len(),
        "combat started against {}",
        view.enemy.name
    );

    state
        .game
        .activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::CombatStart,
            json!({
                "combat_id": view.combat_id,
                "enemy": view.enemy,
                "participants": view.participants,
                "turn_order": view.turn_order,
                "current_turn": view.current_turn,
                "turn_sequence": view.turn_sequence,
            }),
        )
        .await?;

    state.game.schedule_if_enemy_turn(&state.db, &view);
    Ok(ApiResponse::success(view))
}

/// Take the caller's turn.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/combat/action",
    params(("id" = i32, Path, description = "Session ID")),
    request_body = PlayerAction,
    responses(
        (status = 200, description = "Action applied", body = ApiResponse<ActionResponse>),
        (status = 403, description = "Not your turn or not a participant"),
        (status = 404, description = "No active combat")
    ),
    tag = "combat",
    security(("bearer_auth" = []))
)]
pub async fn combat_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(action): Json<PlayerAction>,
) -> Result<ApiResponse<ActionResponse>, MagitechError> {
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;

    let _order = state.game.combat_events.lock().await;
    let (outcome, view) = state.game.combats.act(id, user.id, &action)?;
    let activities = &state.game.activities;

    let damage = match action.kind {
        CombatActionKind::Flee => 0,
        _ => action.damage.max(0),
    };
    activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::CombatAction,
            json!({
                "combat_id": view.combat_id,
                "action": action.kind.as_str(),
                "damage": damage,
                "detail": action.detail,
                "enemy_hp": view.enemy.hp,
            }),
        )
        .await?;

    let outcome = match outcome {
        ActionOutcome::EnemyDefeated => {
            tracing::info!(session_id = id, "{} defeated", view.enemy.name);
            activities
                .append(
                    &state.db,
                    id,
                    Actor::System,
                    ActivityKind::CombatEnd,
                    combat_end_data(&view, "victory"),
                )
                .await?;
            "enemy_defeated"
        }
        ActionOutcome::AllFled => {
            activities
                .append(
                    &state.db,
                    id,
                    Actor::System,
                    ActivityKind::CombatEnd,
                    combat_end_data(&view, "fled"),
                )
                .await?;
            "all_fled"
        }
        ActionOutcome::Continue { .. } => {
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
            "continue"
        }
    };

    Ok(ApiResponse::success(ActionResponse {
        outcome: outcome.to_string(),
        combat: view,
    }))
}

/// End the session's combat.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/combat/end",
    params(("id" = i32, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Combat ended", body = ApiResponse<CombatView>),
        (status = 403, description = "Not a member"),
        (status = 404, description = "No active combat")
    ),
    tag = "combat",
    security(("bearer_auth" = []))
)]
pub async fn end_combat(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<CombatView>, MagitechError> {
    find_active_session(&state, id).await?;
    require_member(&state, id, user.id).await?;

    let _order = state.game.combat_events.lock().await;
    let view = state
        .game
        .combats
        .end(id)
        .ok_or_else(|| MagitechError::NotFound("No active combat in this session".into()))?;

    state
        .game
        .activities
        .append(
            &state.db,
            id,
            actor(&user),
            ActivityKind::CombatEnd,
            combat_end_data(&view, "ended"),
        )
        .await?;

    tracing::info!(session_id = id, combat_id = %view.combat_id, user_id = user.id, "combat ended");
    Ok(ApiResponse::success(view))
}
