use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One entry of a session's append-only activity log.
///
/// `sequence` is assigned by [`crate::game::ActivityLog`] and is strictly
/// increasing per session. Enemy and system events carry no `user_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session_activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub session_id: i32,

    pub user_id: Option<i32>,

    pub username: String,

    pub activity_type: String,

    #[sea_orm(column_type = "Json")]
    pub data: Json,

    pub sequence: i64,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    pub id: i32,
    pub user_id: Option<i32>,
    pub username: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub sequence: i64,
    pub created_at: NaiveDateTime,
}

impl From<Model> for ActivityResponse {
    fn from(m: Model) -> Self {
        ActivityResponse {
            id: m.id,
            user_id: m.user_id,
            username: m.username,
            activity_type: m.activity_type,
            data: m.data,
            sequence: m.sequence,
            created_at: m.created_at,
        }
    }
}
