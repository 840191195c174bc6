//! Wire types mirrored from the server's JSON responses.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Wire name of the enemy slot in a turn order.
pub const ENEMY_SENTINEL: &str = "ENEMY";

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthData {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub data: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deleted {
    pub id: i32,
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameSession {
    pub id: i32,
    pub name: String,
    pub host_user_id: i32,
    pub max_players: i32,
    pub current_players: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionPlayer {
    pub user_id: i32,
    pub username: String,
    pub character_id: Option<i32>,
    pub character_data: serde_json::Value,
    pub x: f64,
    pub y: f64,
    pub map_name: Option<String>,
    pub direction: Option<String>,
    pub joined_at: NaiveDateTime,
    pub last_update: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionDetail {
    pub session: GameSession,
    pub players: Vec<SessionPlayer>,
    pub combat_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaveResult {
    pub session_id: i32,
    pub session_closed: bool,
}

/// Where the local player is standing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    pub id: i32,
    pub user_id: Option<i32>,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    pub sequence: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSnapshot {
    pub session: GameSession,
    pub players: Vec<SessionPlayer>,
    pub activities: Vec<Activity>,
    pub latest_sequence: i64,
    pub has_more: bool,
    pub combat: Option<CombatView>,
    pub server_time: DateTime<Utc>,
}

/// One entry of a combat's turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnSlot {
    Player(i32),
    Enemy,
}

impl<'de> Deserialize<'de> for TurnSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i32),
            Tag(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(TurnSlot::Player(id)),
            Raw::Tag(tag) if tag == ENEMY_SENTINEL => Ok(TurnSlot::Enemy),
            Raw::Tag(tag) => Err(D::Error::custom(format!("unknown turn slot {tag:?}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub level: i32,
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnemyStrike {
    pub target_user_id: i32,
    pub damage: i32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CombatView {
    pub combat_id: String,
    pub session_id: i32,
    pub enemy: Enemy,
    pub participants: Vec<i32>,
    pub turn_order: Vec<TurnSlot>,
    pub current_turn_index: usize,
    pub current_turn: TurnSlot,
    pub turn_sequence: u64,
    pub started_at: DateTime<Utc>,
    pub last_turn_at: DateTime<Utc>,
    pub turn_timeout_secs: u64,
    pub turn_expires_at: DateTime<Utc>,
    pub active: bool,
    pub last_enemy_strike: Option<EnemyStrike>,
}

impl CombatView {
    pub fn is_players_turn(&self, user_id: i32) -> bool {
        self.active && self.current_turn == TurnSlot::Player(user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Spell,
    Item,
    Defend,
    Flee,
}

/// A combat move. Damage is rolled by the client.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerAction {
    pub kind: ActionKind,
    pub damage: i32,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl PlayerAction {
    pub fn attack(damage: i32) -> Self {
        PlayerAction {
            kind: ActionKind::Attack,
            damage,
            detail: serde_json::Value::Null,
        }
    }

    pub fn flee() -> Self {
        PlayerAction {
            kind: ActionKind::Flee,
            damage: 0,
            detail: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionResult {
    /// `continue`, `enemy_defeated` or `all_fled`.
    pub outcome: String,
    pub combat: CombatView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_slots_decode_from_ids_and_sentinel() {
        let order: Vec<TurnSlot> = serde_json::from_str(r#"[7, "ENEMY", 3]"#).unwrap();
        assert_eq!(
            order,
            vec![TurnSlot::Player(7), TurnSlot::Enemy, TurnSlot::Player(3)]
        );
        assert!(serde_json::from_str::<TurnSlot>(r#""BOSS""#).is_err());
    }

    #[test]
    fn actions_serialize_snake_case() {
        let json = serde_json::to_value(PlayerAction::attack(9)).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "attack", "damage": 9 }));
        let json = serde_json::to_value(PlayerAction::flee()).unwrap();
        assert_eq!(json["kind"], "flee");
    }
}
