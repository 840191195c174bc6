use axum::Router;

use crate::controllers::{auth, characters, chat, combat, sessions, sync, AppState};

/// All `/api` routes.
pub fn build_routes() -> Router<AppState> {
    let session_routes = sessions::routes()
        .merge(sync::routes())
        .merge(combat::routes())
        .merge(chat::routes());

    Router::new()
        .nest("/api/auth", auth::routes())
        .nest("/api/characters", characters::routes())
        .nest("/api/sessions", session_routes)
}
