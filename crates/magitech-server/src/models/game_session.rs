use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A multiplayer room. `current_players` mirrors the number of
/// `session_players` rows and is maintained under the membership lock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "game_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub host_user_id: i32,

    pub max_players: i32,

    pub current_players: i32,

    pub is_active: bool,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameSessionResponse {
    pub id: i32,
    pub name: String,
    pub host_user_id: i32,
    pub max_players: i32,
    pub current_players: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl From<Model> for GameSessionResponse {
    fn from(m: Model) -> Self {
        GameSessionResponse {
            id: m.id,
            name: m.name,
            host_user_id: m.host_user_id,
            max_players: m.max_players,
            current_players: m.current_players,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}
