use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::MagitechError;
use crate::extractors::{AuthUser, Json, Pagination};
use crate::models::character::{self, CharacterResponse, Entity as Character};
use crate::response::ApiResponse;

use super::AppState;

const MAX_CHARACTER_NAME_LEN: usize = 32;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveCharacterRequest {
    pub name: String,
    /// Opaque stats blob (class, level, hp, inventory, ...).
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub id: i32,
    pub deleted: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_characters).post(create_character))
        .route(
            "/{id}",
            get(get_character)
                .put(update_character)
                .delete(delete_character),
        )
}

fn validate(payload: &SaveCharacterRequest) -> Result<String, MagitechError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(MagitechError::Validation("Character name is required".into()));
    }
    if name.chars().count() > MAX_CHARACTER_NAME_LEN {
        return Err(MagitechError::Validation(format!(
            "Character name must be at most {MAX_CHARACTER_NAME_LEN} characters"
        )));
    }
    if !(payload.data.is_object() || payload.data.is_null()) {
        return Err(MagitechError::Validation(
            "Character data must be a JSON object".into(),
        ));
    }
    Ok(name.to_string())
}

/// Load a character owned by `user_id`: 404 if missing, 403 if someone else's.
pub(crate) async fn find_owned(
    state: &AppState,
    user_id: i32,
    id: i32,
) -> Result<character::Model, MagitechError> {
    let model = Character::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| MagitechError::NotFound(format!("Character {id} not found")))?;
    if model.user_id != user_id {
        return Err(MagitechError::Forbidden(
            "Character belongs to another user".into(),
        ));
    }
    Ok(model)
}

/// List the caller's characters.
#[utoipa::path(
    get,
    path = "/api/characters",
    params(Pagination),
    responses(
        (status = 200, description = "Characters", body = ApiResponse<Vec<CharacterResponse>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "characters",
    security(("bearer_auth" = []))
)]
pub async fn list_characters(
    State(state): State<AppState>,
    user: AuthUser,
    pagination: Pagination,
) -> Result<ApiResponse<Vec<CharacterResponse>>, MagitechError> {
    let characters = Character::find()
        .filter(character::Column::UserId.eq(user.id))
        .order_by_asc(character::Column::Id)
        .offset(pagination.offset)
        .limit(pagination.limit)
        .all(&state.db)
        .await?;
    Ok(ApiResponse::success(
        characters.into_iter().map(CharacterResponse::from).collect(),
    ))
}

/// Create a character.
#[utoipa::path(
    post,
    path = "/api/characters",
    request_body = SaveCharacterRequest,
    responses(
        (status = 200, description = "Character created", body = ApiResponse<CharacterResponse>),
        (status = 400, description = "Invalid input")
    ),
    tag = "characters",
    security(("bearer_auth" = []))
)]
pub async fn create_character(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveCharacterRequest>,
) -> Result<ApiResponse<CharacterResponse>, MagitechError> {
    let name = validate(&payload)?;
    let now = Utc::now().naive_utc();
    let data = if payload.data.is_null() {
        serde_json::json!({})
    } else {
        payload.data
    };

    let model = character::ActiveModel {
        user_id: Set(user.id),
        name: Set(name),
        data: Set(data),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(user_id = user.id, character_id = model.id, "character created");
    Ok(ApiResponse::success(CharacterResponse::from(model)))
}

/// Get one of the caller's characters.
#[utoipa::path(
    get,
    path = "/api/characters/{id}",
    params(("id" = i32, Path, description = "Character ID")),
    responses(
        (status = 200, description = "Character", body = ApiResponse<CharacterResponse>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    ),
    tag = "characters",
    security(("bearer_auth" = []))
)]
pub async fn get_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<CharacterResponse>, MagitechError> {
    let model = find_owned(&state, user.id, id).await?;
    Ok(ApiResponse::success(CharacterResponse::from(model)))
}

/// Save (overwrite) a character.
#[utoipa::path(
    put,
    path = "/api/characters/{id}",
    params(("id" = i32, Path, description = "Character ID")),
    request_body = SaveCharacterRequest,
    responses(
        (status = 200, description = "Character saved", body = ApiResponse<CharacterResponse>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    ),
    tag = "characters",
    security(("bearer_auth" = []))
)]
pub async fn update_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SaveCharacterRequest>,
) -> Result<ApiResponse<CharacterResponse>, MagitechError> {
    let name = validate(&payload)?;
    let model = find_owned(&state, user.id, id).await?;

    let mut active: character::ActiveModel = model.into();
    active.name = Set(name);
    if !payload.data.is_null() {
        active.data = Set(payload.data);
    }
    active.updated_at = Set(Utc::now().naive_utc());
    let model = active.update(&state.db).await?;

    Ok(ApiResponse::success(CharacterResponse::from(model)))
}

/// Delete a character.
#[utoipa::path(
    delete,
    path = "/api/characters/{id}",
    params(("id" = i32, Path, description = "Character ID")),
    responses(
        (status = 200, description = "Character deleted", body = ApiResponse<DeletedResponse>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    ),
    tag = "characters",
    security(("bearer_auth" = []))
)]
pub async fn delete_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<ApiResponse<DeletedResponse>, MagitechError> {
    let model = find_owned(&state, user.id, id).await?;
    model.delete(&state.db).await?;
    tracing::info!(user_id = user.id, character_id = id, "character deleted");
    Ok(ApiResponse::success(DeletedResponse { id, deleted: true }))
}
