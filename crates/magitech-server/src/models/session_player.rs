use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Membership of a user in a game session, with the last position they
/// reported. Unique on `(session_id, user_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_players")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub session_id: i32,

    pub user_id: i32,

    pub username: String,

    pub character_id: Option<i32>,

    #[sea_orm(column_type = "Json")]
    pub character_data: Json,

    pub x: f64,
    pub y: f64,
    pub map_name: Option<String>,
    pub direction: Option<String>,

    pub joined_at: NaiveDateTime,
    pub last_update: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionPlayerResponse {
    pub user_id: i32,
    pub username: String,
    pub character_id: Option<i32>,
    #[schema(value_type = Object)]
    pub character_data: serde_json::Value,
    pub x: f64,
    pub y: f64,
    pub map_name: Option<String>,
    pub direction: Option<String>,
    pub joined_at: NaiveDateTime,
    pub last_update: NaiveDateTime,
}

impl From<Model> for SessionPlayerResponse {
    fn from(m: Model) -> Self {
        SessionPlayerResponse {
            user_id: m.user_id,
            username: m.username,
            character_id: m.character_id,
            character_data: m.character_data,
            x: m.x,
            y: m.y,
            map_name: m.map_name,
            direction: m.direction,
            joined_at: m.joined_at,
            last_update: m.last_update,
        }
    }
}
