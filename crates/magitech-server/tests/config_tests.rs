use std::time::Duration;

use magitech_server::{Config, GameConfig};

#[test]
fn test_game_config_defaults() {
    let game = GameConfig::default();
    assert_eq!(game.enemy_turn_delay_ms, 2000);
    assert_eq!(game.turn_timeout_secs, 30);
    assert_eq!(game.max_players_per_session, 4);
    assert_eq!(game.sync_activity_limit, 100);
    assert_eq!(game.chat_history_limit, 50);
    assert_eq!(game.enemy_turn_delay(), Duration::from_secs(2));
    assert_eq!(game.turn_timeout(), Duration::from_secs(30));
}

#[test]
fn test_config_for_tests() {
    let config = Config::for_tests();
    assert_eq!(config.database_url, "sqlite::memory:");
    assert_eq!(config.server_port, 0);
    assert_eq!(config.environment, "test");
    assert!(!config.is_dev());
    assert_eq!(config.game.enemy_turn_delay(), Duration::from_millis(50));
}

#[test]
fn test_server_addr() {
    let mut config = Config::for_tests();
    config.server_host = "0.0.0.0".to_string();
    config.server_port = 5000;
    assert_eq!(config.server_addr(), "0.0.0.0:5000");
}

#[test]
fn test_is_dev() {
    let mut config = Config::for_tests();
    config.environment = "development".to_string();
    assert!(config.is_dev());
    config.environment = "production".to_string();
    assert!(!config.is_dev());
}

#[tokio::test]
async fn test_custom_capacity_is_enforced() {
    let mut config = Config::for_tests();
    config.game.max_players_per_session = 2;
    let app = magitech_server::TestApp::with_config(config).await;
    let (token, _) = app.register_user("host", "arcane123").await;

    let body = serde_json::json!({ "name": "Trio", "max_players": 3 });
    let res = app
        .client
        .post_with_auth(&app.url("/api/sessions"), &token, &body.to_string())
        .await;
    assert_eq!(res.status, 400);

    // Defaults to the configured maximum.
    let res = app
        .client
        .post_with_auth(
            &app.url("/api/sessions"),
            &token,
            &serde_json::json!({ "name": "Duo" }).to_string(),
        )
        .await;
    assert_eq!(res.data()["session"]["max_players"], 2);
}
