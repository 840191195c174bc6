pub mod character;
pub mod chat_message;
pub mod game_session;
pub mod session_activity;
pub mod session_player;
pub mod user;
