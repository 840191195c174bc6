use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::MagitechError;

use super::combat::{
    ActionOutcome, CombatSession, CombatView, Enemy, EnemyStrike, PlayerAction, Removal, TurnSlot,
    TurnToken,
};

/// Active combats keyed by game session id.
///
/// The map lock is never held across an `.await`; every method does its
/// read-modify-write synchronously and hands back an owned [`CombatView`].
#[derive(Debug, Default)]
pub struct CombatRegistry {
    combats: Mutex<HashMap<i32, CombatSession>>,
}

impl CombatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, CombatSession>> {
        self.combats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin a combat for `session_id`. Fails with `Conflict` if one is
    /// already running there.
    pub fn start(
        &self,
        session_id: i32,
        enemy: Enemy,
        participants: &[i32],
        turn_timeout: Duration,
    ) -> Result<CombatView, MagitechError> {
        let mut combats = self.lock();
        if combats.get(&session_id).is_some_and(CombatSession::is_active) {
            return Err(MagitechError::Conflict(
                "A combat is already in progress in this session".to_string(),
            ));
        }
        let combat = CombatSession::start(
            session_id,
            enemy,
            participants,
            turn_timeout,
            &mut rand::thread_rng(),
        )?;
        let view = combat.view();
        combats.insert(session_id, combat);
        Ok(view)
    }

    pub fn get(&self, session_id: i32) -> Option<CombatView> {
        self.lock().get(&session_id).map(CombatSession::view)
    }

    pub fn is_active(&self, session_id: i32) -> bool {
        self.lock()
            .get(&session_id)
            .is_some_and(CombatSession::is_active)
    }

    pub fn turn_token(&self, session_id: i32) -> Option<TurnToken> {
        self.lock().get(&session_id).map(CombatSession::turn_token)
    }

    /// Apply a player's move. A combat that ends as a result is removed.
    pub fn act(
        &self,
        session_id: i32,
        user_id: i32,
        action: &PlayerAction,
    ) -> Result<(ActionOutcome, CombatView), MagitechError> {
        let mut combats = self.lock();
        let combat = combats
            .get_mut(&session_id)
            .ok_or_else(|| MagitechError::NotFound("No active combat in this session".into()))?;
        let outcome = combat.apply_player_action(user_id, action)?;
        let view = combat.view();
        if !view.active {
            combats.remove(&session_id);
        }
        Ok((outcome, view))
    }

    /// Run the enemy turn identified by `token`. Returns `None` when the
    /// combat is gone or has moved past that turn.
    pub fn take_enemy_turn(
        &self,
        session_id: i32,
        token: TurnToken,
    ) -> Option<(EnemyStrike, TurnSlot, CombatView)> {
        let mut combats = self.lock();
        let combat = combats.get_mut(&session_id)?;
        if combat.turn_token() != token {
            return None;
        }
        let (strike, next) = combat.take_enemy_turn(&mut rand::thread_rng())?;
        Some((strike, next, combat.view()))
    }

    /// Drop a player from the session's combat, if any. An emptied combat
    /// is removed.
    pub fn remove_participant(&self, session_id: i32, user_id: i32) -> Option<(Removal, CombatView)> {
        let mut combats = self.lock();
        let combat = combats.get_mut(&session_id)?;
        let removal = combat.remove_participant(user_id);
        let view = combat.view();
        if removal == Removal::Emptied {
            combats.remove(&session_id);
        }
        Some((removal, view))
    }

    /// Remove and return the session's combat.
    pub fn end(&self, session_id: i32) -> Option<CombatView> {
        let mut combat = self.lock().remove(&session_id)?;
        combat.finish();
        Some(combat.view())
    }

    /// End the combat of a session that is closing, if it has one.
    pub fn end_for_session(&self, session_id: i32) -> Option<CombatView> {
        let view = self.end(session_id)?;
        tracing::debug!(session_id, combat_id = %view.combat_id, "combat closed with its session");
        Some(view)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::CombatActionKind;

    fn goblin() -> Enemy {
        Enemy {
            name: "Clockwork Goblin".to_string(),
            level: 1,
            hp: 20,
            max_hp: 20,
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn one_active_combat_per_session() {
        let registry = CombatRegistry::new();
        registry
            .start(1, goblin(), &[10, 11], Duration::from_secs(30))
            .unwrap();
        let err = registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);

        // A different session is independent.
        registry
            .start(2, goblin(), &[12], Duration::from_secs(30))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn stale_token_is_ignored() {
        let registry = CombatRegistry::new();
        registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap();
        let mut token = registry.turn_token(1).unwrap();
        token.turn_sequence += 5;
        assert!(registry.take_enemy_turn(1, token).is_none());
        assert!(registry.take_enemy_turn(99, token).is_none());
    }

    #[test]
    fn enemy_turn_runs_with_current_token() {
        let registry = CombatRegistry::new();
        let view = registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap();
        if view.current_turn != TurnSlot::Enemy {
            let action = PlayerAction {
                kind: CombatActionKind::Defend,
                damage: 0,
                detail: serde_json::Value::Null,
            };
            registry.act(1, 10, &action).unwrap();
        }
        let token = registry.turn_token(1).unwrap();
        let (strike, next, view) = registry.take_enemy_turn(1, token).unwrap();
        assert_eq!(strike.target_user_id, 10);
        assert_eq!(next, TurnSlot::Player(10));
        assert_eq!(view.turn_sequence, token.turn_sequence + 1);
        // Same token a second time is now stale.
        assert!(registry.take_enemy_turn(1, token).is_none());
    }

    #[test]
    fn finished_combats_leave_the_registry() {
        let registry = CombatRegistry::new();
        registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap();
        let (removal, view) = registry.remove_participant(1, 10).unwrap();
        assert_eq!(removal, Removal::Emptied);
        assert!(!view.active);
        assert!(registry.get(1).is_none());

        registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap();
        let ended = registry.end(1).unwrap();
        assert!(!ended.active);
        assert!(registry.is_empty());
        assert!(registry.end(1).is_none());
    }

    #[test]
    fn end_for_session_only_touches_that_session() {
        let registry = CombatRegistry::new();
        registry
            .start(1, goblin(), &[10], Duration::from_secs(30))
            .unwrap();
        registry
            .start(2, goblin(), &[11], Duration::from_secs(30))
            .unwrap();

        let ended = registry.end_for_session(1).unwrap();
        assert!(!ended.active);
        assert_eq!(ended.session_id, 1);
        assert!(registry.end_for_session(1).is_none());
        assert!(registry.is_active(2));
    }
}
