//! In-process game state shared by all request handlers: the combat
//! registry, the activity log, and the membership lock.

pub mod activity;
pub mod combat;
pub mod registry;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::GameConfig;

pub use activity::{ActivityKind, ActivityLog, Actor};
pub use combat::{CombatSession, CombatView, Enemy, PlayerAction, TurnSlot, TurnToken};
pub use registry::CombatRegistry;

#[derive(Debug)]
pub struct GameState {
    pub combats: CombatRegistry,
    pub activities: ActivityLog,
    /// Serializes join/leave so capacity checks and player counts agree.
    /// Taken before `combat_events` when both are needed.
    pub membership: Mutex<()>,
    /// Held from a combat transition until its activities are logged, so
    /// the log lists combat events in the order they happened.
    pub combat_events: Mutex<()>,
    pub config: GameConfig,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        GameState {
            combats: CombatRegistry::new(),
            activities: ActivityLog::new(),
            membership: Mutex::new(()),
            combat_events: Mutex::new(()),
            config,
        }
    }

    /// If the enemy holds the turn in `view`, schedule its move.
    pub fn schedule_if_enemy_turn(
        self: &Arc<Self>,
        db: &DatabaseConnection,
        view: &CombatView,
    ) {
        if view.active && view.current_turn == TurnSlot::Enemy {
            self.schedule_enemy_turn(
                db.clone(),
                view.session_id,
                TurnToken {
                    combat_id: view.combat_id,
                    turn_sequence: view.turn_sequence,
                },
            );
        }
    }

    /// Fire the enemy's move for `token` after the configured delay.
    ///
    /// The timer re-validates the token under the combat lock, so a turn
    /// that was already resolved, a combat that ended, or a combat replaced
    /// by a newer one is left untouched.
    pub fn schedule_enemy_turn(
        self: &Arc<Self>,
        db: DatabaseConnection,
        session_id: i32,
        token: TurnToken,
    ) {
        let state = Arc::clone(self);
        let delay = self.config.enemy_turn_delay();
        tracing::debug!(
            session_id,
            combat_id = %token.combat_id,
            turn_sequence = token.turn_sequence,
            "scheduling enemy turn in {:?}",
            delay
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.run_enemy_turn(&db, session_id, token).await;
        });
    }

    async fn run_enemy_turn(self: &Arc<Self>, db: &DatabaseConnection, session_id: i32, token: TurnToken) {
        let _order = self.combat_events.lock().await;
        let Some((strike, next, view)) = self.combats.take_enemy_turn(session_id, token) else {
            tracing::debug!(session_id, combat_id = %token.combat_id, "enemy turn no longer current");
            return;
        };

        tracing::info!(
            session_id,
            target = strike.target_user_id,
            damage = strike.damage,
            "{} attacks",
            view.enemy.name
        );

        let enemy = Actor::Enemy {
            name: &view.enemy.name,
        };
        let attack = self
            .activities
            .append(
                db,
                session_id,
                enemy,
                ActivityKind::EnemyAttack,
                json!({
                    "combat_id": view.combat_id,
                    "target_user_id": strike.target_user_id,
                    "damage": strike.damage,
                }),
            )
            .await;
        let turn = self
            .activities
            .append(
                db,
                session_id,
                Actor::System,
                ActivityKind::TurnChange,
                turn_change_data(&view),
            )
            .await;
        for result in [attack, turn] {
            if let Err(e) = result {
                tracing::error!(session_id, "failed to log enemy turn: {}", e);
            }
        }

        if next == TurnSlot::Enemy {
            self.schedule_if_enemy_turn(db, &view);
        }
    }
}

/// Payload of a `turn_change` activity.
pub fn turn_change_data(view: &CombatView) -> serde_json::Value {
    json!({
        "combat_id": view.combat_id,
        "current_turn": view.current_turn,
        "current_turn_index": view.current_turn_index,
        "turn_sequence": view.turn_sequence,
        "turn_expires_at": view.turn_expires_at,
    })
}
