//! Turn-order state machine for one combat encounter.
//!
//! A combat holds the joined players plus a single NPC enemy. The turn
//! order is the participant list with the [`TurnSlot::Enemy`] sentinel
//! appended, shuffled once at start. Turns advance circularly; every change
//! of the current slot bumps `turn_sequence`, which the enemy-turn timer
//! uses to detect that the turn it was scheduled for has already passed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Wire name of the enemy slot in a serialized turn order.
pub const ENEMY_SENTINEL: &str = "ENEMY";

/// Base enemy damage range, before the per-level bonus.
const ENEMY_BASE_DAMAGE: std::ops::RangeInclusive<i32> = 3..=12;
const ENEMY_DAMAGE_PER_LEVEL: i32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("Combat needs at least one participant")]
    NoParticipants,

    #[error("User {0} is not part of this combat")]
    NotParticipant(i32),

    #[error("It is not user {0}'s turn")]
    NotYourTurn(i32),

    #[error("Combat is no longer active")]
    Inactive,
}

/// One entry of the turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnSlot {
    Player(i32),
    Enemy,
}

impl Serialize for TurnSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TurnSlot::Player(id) => serializer.serialize_i32(*id),
            TurnSlot::Enemy => serializer.serialize_str(ENEMY_SENTINEL),
        }
    }
}

/// The NPC side of an encounter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enemy {
    pub name: String,
    pub level: i32,
    pub hp: i32,
    pub max_hp: i32,
    /// Client-defined extras (sprite id, loot table key, ...), stored verbatim.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CombatActionKind {
    Attack,
    Spell,
    Item,
    Defend,
    Flee,
}

impl CombatActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CombatActionKind::Attack => "attack",
            CombatActionKind::Spell => "spell",
            CombatActionKind::Item => "item",
            CombatActionKind::Defend => "defend",
            CombatActionKind::Flee => "flee",
        }
    }
}

/// A player's move. Damage is computed client-side; the server only
/// clamps it and applies it to the enemy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerAction {
    pub kind: CombatActionKind,
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EnemyStrike {
    pub target_user_id: i32,
    pub damage: i32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The enemy dropped to zero hp; the combat is over.
    EnemyDefeated,
    /// The last player fled; the combat is over.
    AllFled,
    /// The turn moved on to `next`.
    Continue { next: TurnSlot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    NotPresent,
    /// Someone else's turn was current and still is.
    Unchanged,
    /// The removed player held the turn; it passed to the given slot.
    TurnPassed(TurnSlot),
    /// No players remain; the combat became inactive.
    Emptied,
}

/// Identifies a specific turn of a specific combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnToken {
    pub combat_id: Uuid,
    pub turn_sequence: u64,
}

/// `random(3..=12) + level * 2`, saturating at `i32::MAX`.
pub fn enemy_damage<R: Rng>(level: i32, rng: &mut R) -> i32 {
    rng.gen_range(ENEMY_BASE_DAMAGE)
        .saturating_add(level.max(0).saturating_mul(ENEMY_DAMAGE_PER_LEVEL))
}

#[derive(Debug, Clone)]
pub struct CombatSession {
    combat_id: Uuid,
    session_id: i32,
    enemy: Enemy,
    participants: Vec<i32>,
    turn_order: Vec<TurnSlot>,
    current_turn_index: usize,
    turn_sequence: u64,
    started_at: DateTime<Utc>,
    last_turn_at: DateTime<Utc>,
    turn_timeout: Duration,
    active: bool,
    last_enemy_strike: Option<EnemyStrike>,
}

impl CombatSession {
    /// Start an encounter. Duplicate participant ids are collapsed.
    pub fn start<R: Rng>(
        session_id: i32,
        enemy: Enemy,
        participants: &[i32],
        turn_timeout: Duration,
        rng: &mut R,
    ) -> Result<Self, CombatError> {
        let mut unique: Vec<i32> = Vec::with_capacity(participants.len());
        for id in participants {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.is_empty() {
            return Err(CombatError::NoParticipants);
        }

        let mut turn_order: Vec<TurnSlot> = unique.iter().copied().map(TurnSlot::Player).collect();
        turn_order.push(TurnSlot::Enemy);
        turn_order.shuffle(rng);

        let now = Utc::now();
        Ok(CombatSession {
            combat_id: Uuid::new_v4(),
            session_id,
            enemy,
            participants: unique,
            turn_order,
            current_turn_index: 0,
            turn_sequence: 0,
            started_at: now,
            last_turn_at: now,
            turn_timeout,
            active: true,
            last_enemy_strike: None,
        })
    }

    pub fn combat_id(&self) -> Uuid {
        self.combat_id
    }

    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    pub fn enemy(&self) -> &Enemy {
        &self.enemy
    }

    pub fn participants(&self) -> &[i32] {
        &self.participants
    }

    pub fn turn_order(&self) -> &[TurnSlot] {
        &self.turn_order
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn turn_sequence(&self) -> u64 {
        self.turn_sequence
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_enemy_strike(&self) -> Option<&EnemyStrike> {
        self.last_enemy_strike.as_ref()
    }

    pub fn turn_token(&self) -> TurnToken {
        TurnToken {
            combat_id: self.combat_id,
            turn_sequence: self.turn_sequence,
        }
    }

    pub fn current_turn(&self) -> TurnSlot {
        self.turn_order[self.current_turn_index % self.turn_order.len()]
    }

    pub fn is_players_turn(&self, user_id: i32) -> bool {
        self.active && self.current_turn() == TurnSlot::Player(user_id)
    }

    /// Advisory deadline for the current turn. Nothing enforces it.
    pub fn turn_expires_at(&self) -> DateTime<Utc> {
        let timeout = chrono::Duration::from_std(self.turn_timeout)
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.last_turn_at + timeout
    }

    /// Move to the next slot circularly and return it.
    pub fn advance_turn(&mut self) -> TurnSlot {
        self.current_turn_index = (self.current_turn_index + 1) % self.turn_order.len();
        self.mark_turn_change();
        self.current_turn()
    }

    fn mark_turn_change(&mut self) {
        self.turn_sequence += 1;
        self.last_turn_at = Utc::now();
    }

    /// Apply the current player's move.
    pub fn apply_player_action(
        &mut self,
        user_id: i32,
        action: &PlayerAction,
    ) -> Result<ActionOutcome, CombatError> {
        if !self.active {
            return Err(CombatError::Inactive);
        }
        if !self.participants.contains(&user_id) {
            return Err(CombatError::NotParticipant(user_id));
        }
        if self.current_turn() != TurnSlot::Player(user_id) {
            return Err(CombatError::NotYourTurn(user_id));
        }

        if action.kind == CombatActionKind::Flee {
            return Ok(match self.remove_participant(user_id) {
                Removal::Emptied => ActionOutcome::AllFled,
                Removal::TurnPassed(next) => ActionOutcome::Continue { next },
                Removal::Unchanged | Removal::NotPresent => ActionOutcome::Continue {
                    next: self.current_turn(),
                },
            });
        }

        let damage = action.damage.max(0);
        self.enemy.hp = (self.enemy.hp - damage).max(0);
        if self.enemy.hp == 0 {
            self.active = false;
            return Ok(ActionOutcome::EnemyDefeated);
        }

        Ok(ActionOutcome::Continue {
            next: self.advance_turn(),
        })
    }

    /// Resolve the enemy's turn: strike a uniformly random participant and
    /// advance. Returns `None` unless the enemy currently holds the turn.
    pub fn take_enemy_turn<R: Rng>(
        &mut self,
        rng: &mut R,
    ) -> Option<(EnemyStrike, TurnSlot)> {
        if !self.active || self.current_turn() != TurnSlot::Enemy {
            return None;
        }
        let target_user_id = *self.participants.choose(rng)?;
        let strike = EnemyStrike {
            target_user_id,
            damage: enemy_damage(self.enemy.level, rng),
            at: Utc::now(),
        };
        self.last_enemy_strike = Some(strike.clone());
        let next = self.advance_turn();
        Some((strike, next))
    }

    /// Drop a player (leave or flee), keeping the turn index valid.
    pub fn remove_participant(&mut self, user_id: i32) -> Removal {
        let Some(pos) = self.participants.iter().position(|id| *id == user_id) else {
            return Removal::NotPresent;
        };
        self.participants.remove(pos);

        let Some(slot) = self
            .turn_order
            .iter()
            .position(|s| *s == TurnSlot::Player(user_id))
        else {
            return Removal::Unchanged;
        };
        self.turn_order.remove(slot);

        if self.participants.is_empty() {
            self.active = false;
            self.current_turn_index = 0;
            return Removal::Emptied;
        }

        match slot.cmp(&self.current_turn_index) {
            std::cmp::Ordering::Less => {
                self.current_turn_index -= 1;
                Removal::Unchanged
            }
            std::cmp::Ordering::Equal => {
                if self.current_turn_index >= self.turn_order.len() {
                    self.current_turn_index = 0;
                }
                self.mark_turn_change();
                Removal::TurnPassed(self.current_turn())
            }
            std::cmp::Ordering::Greater => Removal::Unchanged,
        }
    }

    /// Mark the combat finished (explicit end or session shutdown).
    pub fn finish(&mut self) {
        self.active = false;
    }

    pub fn view(&self) -> CombatView {
        CombatView {
            combat_id: self.combat_id,
            session_id: self.session_id,
            enemy: self.enemy.clone(),
            participants: self.participants.clone(),
            turn_order: self.turn_order.clone(),
            current_turn_index: self.current_turn_index,
            current_turn: self.current_turn(),
            turn_sequence: self.turn_sequence,
            started_at: self.started_at,
            last_turn_at: self.last_turn_at,
            turn_timeout_secs: self.turn_timeout.as_secs(),
            turn_expires_at: self.turn_expires_at(),
            active: self.active,
            last_enemy_strike: self.last_enemy_strike.clone(),
        }
    }
}

/// Serializable snapshot of a combat, as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CombatView {
    pub combat_id: Uuid,
    pub session_id: i32,
    pub enemy: Enemy,
    pub participants: Vec<i32>,
    /// Player ids and the `"ENEMY"` sentinel, in acting order.
    #[schema(value_type = Vec<Object>)]
    pub turn_order: Vec<TurnSlot>,
    pub current_turn_index: usize,
    #[schema(value_type = Object)]
    pub current_turn: TurnSlot,
    pub turn_sequence: u64,
    pub started_at: DateTime<Utc>,
    pub last_turn_at: DateTime<Utc>,
    pub turn_timeout_secs: u64,
    pub turn_expires_at: DateTime<Utc>,
    pub active: bool,
    pub last_enemy_strike: Option<EnemyStrike>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn slime(level: i32, hp: i32) -> Enemy {
        Enemy {
            name: "Arc Slime".to_string(),
            level,
            hp,
            max_hp: hp,
            extra: serde_json::Value::Null,
        }
    }

    fn attack(damage: i32) -> PlayerAction {
        PlayerAction {
            kind: CombatActionKind::Attack,
            damage,
            detail: serde_json::Value::Null,
        }
    }

    fn flee() -> PlayerAction {
        PlayerAction {
            kind: CombatActionKind::Flee,
            damage: 0,
            detail: serde_json::Value::Null,
        }
    }

    fn combat(players: &[i32], seed: u64) -> CombatSession {
        let mut rng = StdRng::seed_from_u64(seed);
        CombatSession::start(1, slime(2, 100), players, Duration::from_secs(30), &mut rng).unwrap()
    }

    /// Advance until `slot` holds the turn.
    fn rotate_to(c: &mut CombatSession, slot: TurnSlot) {
        for _ in 0..c.turn_order().len() {
            if c.current_turn() == slot {
                return;
            }
            c.advance_turn();
        }
        panic!("slot {slot:?} not in turn order");
    }

    #[test]
    fn turn_order_contains_every_player_and_one_enemy() {
        let c = combat(&[1, 2, 3, 2], 7);
        assert_eq!(c.participants(), &[1, 2, 3]);
        assert_eq!(c.turn_order().len(), 4);
        assert_eq!(
            c.turn_order().iter().filter(|s| **s == TurnSlot::Enemy).count(),
            1
        );
        for id in [1, 2, 3] {
            assert!(c.turn_order().contains(&TurnSlot::Player(id)));
        }
        assert_eq!(c.current_turn_index(), 0);
        assert_eq!(c.turn_sequence(), 0);
        assert!(c.is_active());
    }

    #[test]
    fn start_without_players_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = CombatSession::start(1, slime(1, 10), &[], Duration::from_secs(30), &mut rng)
            .unwrap_err();
        assert_eq!(err, CombatError::NoParticipants);
    }

    #[test]
    fn advance_wraps_and_bumps_sequence() {
        let mut c = combat(&[1, 2], 3);
        let first = c.current_turn();
        for step in 1..=6u64 {
            c.advance_turn();
            assert!(c.current_turn_index() < c.turn_order().len());
            assert_eq!(c.turn_sequence(), step);
        }
        // 6 steps over a 3-slot order lands back on the first slot.
        assert_eq!(c.current_turn(), first);
    }

    #[test]
    fn only_current_player_may_act() {
        let mut c = combat(&[1, 2], 11);
        rotate_to(&mut c, TurnSlot::Player(1));
        assert_eq!(
            c.apply_player_action(2, &attack(5)),
            Err(CombatError::NotYourTurn(2))
        );
        assert_eq!(
            c.apply_player_action(99, &attack(5)),
            Err(CombatError::NotParticipant(99))
        );
        let before = c.turn_sequence();
        let outcome = c.apply_player_action(1, &attack(5)).unwrap();
        assert!(matches!(outcome, ActionOutcome::Continue { .. }));
        assert_eq!(c.enemy().hp, 95);
        assert_eq!(c.turn_sequence(), before + 1);
    }

    #[test]
    fn negative_damage_is_clamped() {
        let mut c = combat(&[1], 5);
        rotate_to(&mut c, TurnSlot::Player(1));
        c.apply_player_action(1, &attack(-40)).unwrap();
        assert_eq!(c.enemy().hp, 100);
    }

    #[test]
    fn lethal_hit_ends_combat() {
        let mut c = combat(&[1], 5);
        rotate_to(&mut c, TurnSlot::Player(1));
        let outcome = c.apply_player_action(1, &attack(250)).unwrap();
        assert_eq!(outcome, ActionOutcome::EnemyDefeated);
        assert_eq!(c.enemy().hp, 0);
        assert!(!c.is_active());
        assert_eq!(
            c.apply_player_action(1, &attack(1)),
            Err(CombatError::Inactive)
        );
    }

    #[test]
    fn enemy_turn_strikes_a_participant_and_advances() {
        let mut c = combat(&[1, 2, 3], 21);
        let mut rng = StdRng::seed_from_u64(99);
        rotate_to(&mut c, TurnSlot::Player(1));
        assert!(c.take_enemy_turn(&mut rng).is_none());

        rotate_to(&mut c, TurnSlot::Enemy);
        let seq = c.turn_sequence();
        let (strike, next) = c.take_enemy_turn(&mut rng).unwrap();
        assert!(c.participants().contains(&strike.target_user_id));
        // level 2: 3..=12 plus 4
        assert!((7..=16).contains(&strike.damage));
        assert_ne!(next, TurnSlot::Enemy);
        assert_eq!(c.turn_sequence(), seq + 1);
        assert_eq!(c.last_enemy_strike(), Some(&strike));
    }

    #[test]
    fn enemy_damage_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(4);
        for level in 0..10 {
            for _ in 0..50 {
                let d = enemy_damage(level, &mut rng);
                assert!(d >= 3 + level * 2 && d <= 12 + level * 2);
            }
        }
    }

    #[test]
    fn enemy_damage_saturates_for_huge_levels() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(enemy_damage(i32::MAX, &mut rng), i32::MAX);
        assert_eq!(enemy_damage(i32::MAX / 2 + 1, &mut rng), i32::MAX);
        let d = enemy_damage(i32::MIN, &mut rng);
        assert!((3..=12).contains(&d));
    }

    #[test]
    fn enemy_turn_with_max_level_still_advances() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut c =
            CombatSession::start(1, slime(i32::MAX, 100), &[1], Duration::from_secs(30), &mut rng)
                .unwrap();
        rotate_to(&mut c, TurnSlot::Enemy);
        let before = c.turn_sequence();
        let (strike, next) = c.take_enemy_turn(&mut rng).unwrap();
        assert_eq!(strike.damage, i32::MAX);
        assert_eq!(next, TurnSlot::Player(1));
        assert_eq!(c.turn_sequence(), before + 1);
    }

    #[test]
    fn removing_current_player_passes_turn() {
        let mut c = combat(&[1, 2, 3], 8);
        rotate_to(&mut c, TurnSlot::Player(2));
        let seq = c.turn_sequence();
        match c.remove_participant(2) {
            Removal::TurnPassed(next) => assert_eq!(next, c.current_turn()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(c.turn_sequence(), seq + 1);
        assert!(!c.turn_order().contains(&TurnSlot::Player(2)));
        assert!(c.current_turn_index() < c.turn_order().len());
    }

    #[test]
    fn removing_other_player_keeps_current_turn() {
        for seed in 0..20 {
            let mut c = combat(&[1, 2, 3], seed);
            c.advance_turn();
            c.advance_turn();
            let current = c.current_turn();
            let victim = c
                .participants()
                .iter()
                .copied()
                .find(|id| TurnSlot::Player(*id) != current)
                .unwrap();
            let seq = c.turn_sequence();
            assert_eq!(c.remove_participant(victim), Removal::Unchanged);
            assert_eq!(c.current_turn(), current);
            assert_eq!(c.turn_sequence(), seq);
        }
    }

    #[test]
    fn last_player_leaving_deactivates() {
        let mut c = combat(&[1], 2);
        assert_eq!(c.remove_participant(42), Removal::NotPresent);
        assert_eq!(c.remove_participant(1), Removal::Emptied);
        assert!(!c.is_active());
        assert_eq!(c.turn_order(), &[TurnSlot::Enemy]);
        assert_eq!(c.current_turn(), TurnSlot::Enemy);
    }

    #[test]
    fn fleeing_passes_turn_or_ends_combat() {
        let mut c = combat(&[1, 2], 13);
        rotate_to(&mut c, TurnSlot::Player(1));
        let outcome = c.apply_player_action(1, &flee()).unwrap();
        assert!(matches!(outcome, ActionOutcome::Continue { .. }));
        assert_eq!(c.participants(), &[2]);

        rotate_to(&mut c, TurnSlot::Player(2));
        assert_eq!(
            c.apply_player_action(2, &flee()).unwrap(),
            ActionOutcome::AllFled
        );
        assert!(!c.is_active());
    }

    #[test]
    fn turn_index_stays_valid_under_random_play() {
        let mut rng = StdRng::seed_from_u64(2024);
        for seed in 0..30 {
            let mut c = combat(&[1, 2, 3, 4], seed);
            let mut last_seq = 0;
            while c.is_active() {
                match c.current_turn() {
                    TurnSlot::Enemy => {
                        c.take_enemy_turn(&mut rng).unwrap();
                    }
                    TurnSlot::Player(id) => {
                        let action = if rng.gen_bool(0.2) { flee() } else { attack(7) };
                        c.apply_player_action(id, &action).unwrap();
                    }
                }
                assert!(c.turn_sequence() >= last_seq);
                last_seq = c.turn_sequence();
                assert!(c.current_turn_index() < c.turn_order().len());
            }
        }
    }

    #[test]
    fn serializes_enemy_as_sentinel() {
        let order = vec![TurnSlot::Player(4), TurnSlot::Enemy];
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json, serde_json::json!([4, "ENEMY"]));
    }

    #[test]
    fn expiry_is_last_turn_plus_timeout() {
        let c = combat(&[1], 1);
        let view = c.view();
        assert_eq!(
            (view.turn_expires_at - view.last_turn_at).num_seconds(),
            30
        );
    }
}
