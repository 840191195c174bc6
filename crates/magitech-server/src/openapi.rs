use utoipa::OpenApi;

use crate::controllers::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::controllers::characters::{DeletedResponse, SaveCharacterRequest};
use crate::controllers::chat::ChatRequest;
use crate::controllers::combat::{ActionResponse, StartCombatRequest};
use crate::controllers::sessions::{
    CreateSessionRequest, JoinSessionRequest, LeaveResponse, PositionRequest, SessionDetail,
};
use crate::controllers::sync::SyncResponse;
use crate::error::ErrorDetail;
use crate::game::combat::{CombatActionKind, EnemyStrike};
use crate::game::{CombatView, Enemy, PlayerAction};
use crate::models::character::CharacterResponse;
use crate::models::chat_message::ChatMessageResponse;
use crate::models::game_session::GameSessionResponse;
use crate::models::session_activity::ActivityResponse;
use crate::models::session_player::SessionPlayerResponse;
use crate::models::user::UserResponse;

/// OpenAPI document served at `/api-docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Magitech RPG API",
        version = "0.3.0",
        description = "Multiplayer sessions, turn-based combat and polling sync for Magitech RPG."
    ),
    paths(
        crate::controllers::auth::register,
        crate::controllers::auth::login,
        crate::controllers::auth::me,
        crate::controllers::characters::list_characters,
        crate::controllers::characters::create_character,
        crate::controllers::characters::get_character,
        crate::controllers::characters::update_character,
        crate::controllers::characters::delete_character,
        crate::controllers::sessions::list_sessions,
        crate::controllers::sessions::create_session,
        crate::controllers::sessions::get_session,
        crate::controllers::sessions::join_session,
        crate::controllers::sessions::leave_session,
        crate::controllers::sessions::update_position,
        crate::controllers::sync::sync_session,
        crate::controllers::combat::get_combat,
        crate::controllers::combat::start_combat,
        crate::controllers::combat::combat_action,
        crate::controllers::combat::end_combat,
        crate::controllers::chat::list_messages,
        crate::controllers::chat::send_message,
    ),
    components(
        schemas(
            ErrorDetail,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            SaveCharacterRequest,
            CharacterResponse,
            DeletedResponse,
            CreateSessionRequest,
            JoinSessionRequest,
            PositionRequest,
            SessionDetail,
            LeaveResponse,
            GameSessionResponse,
            SessionPlayerResponse,
            SyncResponse,
            ActivityResponse,
            StartCombatRequest,
            ActionResponse,
            Enemy,
            EnemyStrike,
            PlayerAction,
            CombatActionKind,
            CombatView,
            ChatRequest,
            ChatMessageResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "characters", description = "Saved characters"),
        (name = "sessions", description = "Multiplayer sessions and membership"),
        (name = "sync", description = "Polling catch-up"),
        (name = "combat", description = "Turn-based combat"),
        (name = "chat", description = "Session chat")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
