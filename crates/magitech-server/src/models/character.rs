use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A saved character. Stats live in `data` as an opaque JSON blob owned by
/// the client; the server only stores and returns it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "characters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub name: String,

    #[sea_orm(column_type = "Json")]
    pub data: Json,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CharacterResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Model> for CharacterResponse {
    fn from(m: Model) -> Self {
        CharacterResponse {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            data: m.data,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
