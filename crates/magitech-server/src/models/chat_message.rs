use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub session_id: i32,

    pub user_id: i32,

    pub username: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,

    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

impl From<Model> for ChatMessageResponse {
    fn from(m: Model) -> Self {
        ChatMessageResponse {
            id: m.id,
            user_id: m.user_id,
            username: m.username,
            message: m.message,
            created_at: m.created_at,
        }
    }
}
