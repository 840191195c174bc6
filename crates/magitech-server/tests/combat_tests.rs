use std::time::Duration;

use magitech_server::TestApp;
use serde_json::{json, Value};

fn goblin(hp: i64) -> Value {
    json!({ "name": "Clockwork Goblin", "level": 1, "hp": hp, "max_hp": hp })
}

async fn start_combat(app: &TestApp, token: &str, id: i64, hp: i64) -> Value {
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/sessions/{id}/combat/start")),
            token,
            &json!({ "enemy": goblin(hp) }).to_string(),
        )
        .await;
    assert_eq!(res.status, 200, "start combat failed: {}", res.body);
    res.data()
}

/// Poll until a player holds the turn; the enemy timer moves it along.
async fn wait_for_player_turn(app: &TestApp, token: &str, id: i64) -> Value {
    let url = app.url(&format!("/api/sessions/{id}/combat"));
    for _ in 0..100 {
        let res = app.client.get_with_auth(&url, token).await;
        assert_eq!(res.status, 200, "combat lookup failed: {}", res.body);
        let view = res.data();
        if view["current_turn"].is_number() {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("enemy never passed the turn");
}

async fn act(app: &TestApp, token: &str, id: i64, action: Value) -> magitech_server::TestResponse {
    app.client
        .post_with_auth(
            &app.url(&format!("/api/sessions/{id}/combat/action")),
            token,
            &action.to_string(),
        )
        .await
}

async fn activity_types(app: &TestApp, token: &str, id: i64) -> Vec<Value> {
    let res = app
        .client
        .get_with_auth(&app.url(&format!("/api/sessions/{id}/sync")), token)
        .await;
    assert_eq!(res.status, 200);
    res.data()["activities"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_start_combat_builds_turn_order() {
    let app = TestApp::new().await;
    let (host, host_user) = app.register_user("host", "arcane123").await;
    let (guest, guest_user) = app.register_user("guest", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    app.join_session(&guest, id).await;

    let view = start_combat(&app, &host, id, 30).await;

    assert_eq!(view["active"], true);
    assert_eq!(view["session_id"], id);
    assert_eq!(view["enemy"]["name"], "Clockwork Goblin");
    assert_eq!(view["participants"].as_array().unwrap().len(), 2);

    let order = view["turn_order"].as_array().unwrap();
    assert_eq!(order.len(), 3);
    assert!(order.contains(&json!("ENEMY")));
    assert!(order.contains(&host_user["id"]));
    assert!(order.contains(&guest_user["id"]));
    assert_eq!(view["current_turn_index"], 0);
    assert_eq!(view["current_turn"], order[0]);
    assert!(view["turn_expires_at"].is_string());
}

#[tokio::test]
async fn test_only_one_combat_per_session() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 30).await;

    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/sessions/{id}/combat/start")),
            &host,
            &json!({ "enemy": goblin(10) }).to_string(),
        )
        .await;
    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn test_start_combat_validation() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let (stranger, stranger_user) = app.register_user("stranger", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    let url = app.url(&format!("/api/sessions/{id}/combat/start"));

    // Participants must be members.
    let body = json!({ "enemy": goblin(10), "participants": [stranger_user["id"]] });
    let res = app.client.post_with_auth(&url, &host, &body.to_string()).await;
    assert_eq!(res.status, 400);

    // Enemy must be alive.
    let body = json!({ "enemy": { "name": "Husk", "level": 1, "hp": 0, "max_hp": 10 } });
    let res = app.client.post_with_auth(&url, &host, &body.to_string()).await;
    assert_eq!(res.status, 400);

    // Non-members cannot start a fight.
    let body = json!({ "enemy": goblin(10) });
    let res = app.client.post_with_auth(&url, &stranger, &body.to_string()).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_action_out_of_turn_is_forbidden() {
    let app = TestApp::new().await;
    let (host, host_user) = app.register_user("host", "arcane123").await;
    let (guest, _) = app.register_user("guest", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    app.join_session(&guest, id).await;

    start_combat(&app, &host, id, 500).await;
    let view = wait_for_player_turn(&app, &host, id).await;

    let waiting = if view["current_turn"] == host_user["id"] {
        &guest
    } else {
        &host
    };
    let res = act(&app, waiting, id, json!({ "kind": "attack", "damage": 5 })).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.error()["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_defeating_enemy_ends_combat() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 10).await;
    wait_for_player_turn(&app, &host, id).await;

    let res = act(&app, &host, id, json!({ "kind": "spell", "damage": 25 })).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["outcome"], "enemy_defeated");
    assert_eq!(res.data()["combat"]["enemy"]["hp"], 0);
    assert_eq!(res.data()["combat"]["active"], false);

    let res = app
        .client
        .get_with_auth(&app.url(&format!("/api/sessions/{id}/combat")), &host)
        .await;
    assert_eq!(res.status, 404);

    let activities = activity_types(&app, &host, id).await;
    let end = activities
        .iter()
        .find(|a| a["type"] == "combat_end")
        .expect("combat_end logged");
    assert_eq!(end["data"]["outcome"], "victory");
    assert!(activities.iter().any(|a| a["type"] == "combat_action"));

    // A fresh combat may start once the previous one is over.
    start_combat(&app, &host, id, 10).await;
}

#[tokio::test]
async fn test_negative_damage_is_clamped() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 40).await;
    wait_for_player_turn(&app, &host, id).await;

    let res = act(&app, &host, id, json!({ "kind": "attack", "damage": -15 })).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["outcome"], "continue");
    assert_eq!(res.data()["combat"]["enemy"]["hp"], 40);
}

#[tokio::test]
async fn test_enemy_turn_fires_after_delay() {
    let app = TestApp::new().await;
    let (host, host_user) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 500).await;
    let before = wait_for_player_turn(&app, &host, id).await;
    let sequence = before["turn_sequence"].as_u64().unwrap();

    let res = act(&app, &host, id, json!({ "kind": "attack", "damage": 7 })).await;
    assert_eq!(res.status, 200);
    let combat = &res.data()["combat"];
    assert_eq!(combat["current_turn"], "ENEMY");
    assert_eq!(combat["enemy"]["hp"], 493);
    assert_eq!(combat["turn_sequence"].as_u64().unwrap(), sequence + 1);

    let after = wait_for_player_turn(&app, &host, id).await;
    assert_eq!(after["current_turn"], host_user["id"]);
    assert_eq!(after["turn_sequence"].as_u64().unwrap(), sequence + 2);

    let strike = &after["last_enemy_strike"];
    assert_eq!(strike["target_user_id"], host_user["id"]);
    let damage = strike["damage"].as_i64().unwrap();
    // 3..=12 plus 2 per enemy level.
    assert!((5..=14).contains(&damage), "damage {damage} out of range");

    let activities = activity_types(&app, &host, id).await;
    let attack = activities
        .iter()
        .rev()
        .find(|a| a["type"] == "enemy_attack")
        .expect("enemy_attack logged");
    assert_eq!(attack["username"], "Clockwork Goblin");
    assert!(attack["user_id"].is_null());
    assert_eq!(attack["data"]["damage"], damage);
    assert!(activities.iter().any(|a| a["type"] == "turn_change"));
}

#[tokio::test]
async fn test_flee_ends_solo_combat() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 50).await;
    wait_for_player_turn(&app, &host, id).await;

    let res = act(&app, &host, id, json!({ "kind": "flee" })).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["outcome"], "all_fled");

    let res = app
        .client
        .get_with_auth(&app.url(&format!("/api/sessions/{id}/combat")), &host)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_end_combat() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    let url = app.url(&format!("/api/sessions/{id}/combat/end"));

    let res = app.client.post_with_auth(&url, &host, "").await;
    assert_eq!(res.status, 404);

    start_combat(&app, &host, id, 50).await;
    let res = app.client.post_with_auth(&url, &host, "").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["active"], false);

    let res = app.client.post_with_auth(&url, &host, "").await;
    assert_eq!(res.status, 404);
    assert!(app.game.combats.is_empty());
}

#[tokio::test]
async fn test_leaving_removes_player_from_combat() {
    let app = TestApp::new().await;
    let (host, host_user) = app.register_user("host", "arcane123").await;
    let (guest, guest_user) = app.register_user("guest", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    app.join_session(&guest, id).await;

    start_combat(&app, &host, id, 500).await;

    let res = app
        .client
        .post_with_auth(&app.url(&format!("/api/sessions/{id}/leave")), &host, "")
        .await;
    assert_eq!(res.status, 200);

    let view = wait_for_player_turn(&app, &guest, id).await;
    assert_eq!(view["participants"], json!([guest_user["id"]]));
    let order = view["turn_order"].as_array().unwrap();
    assert_eq!(order.len(), 2);
    assert!(!order.contains(&host_user["id"]));
    assert_eq!(view["current_turn"], guest_user["id"]);
}

#[tokio::test]
async fn test_last_player_leaving_drops_combat() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 500).await;
    assert!(app.game.combats.is_active(id as i32));

    app.client
        .post_with_auth(&app.url(&format!("/api/sessions/{id}/leave")), &host, "")
        .await;

    assert!(!app.game.combats.is_active(id as i32));
    assert!(app.game.combats.is_empty());
}

#[tokio::test]
async fn test_combat_requires_membership() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let (stranger, _) = app.register_user("stranger", "arcane123").await;
    let id = app.create_session(&host, "Party").await;
    start_combat(&app, &host, id, 50).await;

    let res = app
        .client
        .get_with_auth(&app.url(&format!("/api/sessions/{id}/combat")), &stranger)
        .await;
    assert_eq!(res.status, 403);

    let res = act(&app, &stranger, id, json!({ "kind": "attack", "damage": 1 })).await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn test_highest_level_enemy_still_passes_the_turn() {
    let app = TestApp::new().await;
    let (host, host_user) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    let enemy = json!({ "name": "Iron Colossus", "level": 1000, "hp": 900, "max_hp": 900 });
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/sessions/{id}/combat/start")),
            &host,
            &json!({ "enemy": enemy }).to_string(),
        )
        .await;
    assert_eq!(res.status, 200);

    wait_for_player_turn(&app, &host, id).await;
    let res = act(&app, &host, id, json!({ "kind": "defend" })).await;
    assert_eq!(res.status, 200);
    let sequence = res.data()["combat"]["turn_sequence"].as_u64().unwrap();
    assert_eq!(res.data()["combat"]["current_turn"], "ENEMY");

    let after = wait_for_player_turn(&app, &host, id).await;
    assert_eq!(after["current_turn"], host_user["id"]);
    assert_eq!(after["turn_sequence"].as_u64().unwrap(), sequence + 1);
    let damage = after["last_enemy_strike"]["damage"].as_i64().unwrap();
    assert!((2003..=2012).contains(&damage), "damage {damage} out of range");
}

#[tokio::test]
async fn test_enemy_level_is_capped() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    let enemy = json!({ "name": "Titan", "level": 2_000_000_000, "hp": 100, "max_hp": 100 });
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/sessions/{id}/combat/start")),
            &host,
            &json!({ "enemy": enemy }).to_string(),
        )
        .await;
    assert_eq!(res.status, 400);
    assert!(app.game.combats.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_start_racing_leave_never_keeps_departed_player() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let (guest, guest_user) = app.register_user("guest", "arcane123").await;

    for round in 0..10 {
        let id = app.create_session(&host, &format!("Round {round}")).await;
        app.join_session(&guest, id).await;

        let start_url = app.url(&format!("/api/sessions/{id}/combat/start"));
        let leave_url = app.url(&format!("/api/sessions/{id}/leave"));
        let body = json!({ "enemy": goblin(500) }).to_string();
        let (started, left) = tokio::join!(
            app.client.post_with_auth(&start_url, &host, &body),
            app.client.post_with_auth(&leave_url, &guest, ""),
        );
        assert_eq!(started.status, 200, "start failed: {}", started.body);
        assert_eq!(left.status, 200, "leave failed: {}", left.body);

        let res = app
            .client
            .get_with_auth(&app.url(&format!("/api/sessions/{id}/combat")), &host)
            .await;
        assert_eq!(res.status, 200);
        let view = res.data();
        let participants = view["participants"].as_array().unwrap();
        assert!(
            !participants.contains(&guest_user["id"]),
            "round {round}: departed guest still in combat"
        );
        assert!(!view["turn_order"].as_array().unwrap().contains(&guest_user["id"]));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_combat_log_follows_turn_order() {
    let app = TestApp::new().await;
    let (host, _) = app.register_user("host", "arcane123").await;
    let id = app.create_session(&host, "Party").await;

    start_combat(&app, &host, id, 500).await;
    for _ in 0..5 {
        wait_for_player_turn(&app, &host, id).await;
        let res = act(&app, &host, id, json!({ "kind": "defend" })).await;
        assert_eq!(res.status, 200);
    }
    wait_for_player_turn(&app, &host, id).await;

    let activities = activity_types(&app, &host, id).await;
    let turns: Vec<u64> = activities
        .iter()
        .filter(|a| a["type"] == "turn_change")
        .map(|a| a["data"]["turn_sequence"].as_u64().unwrap())
        .collect();
    assert!(turns.len() >= 10, "expected ten turn changes, got {turns:?}");
    assert!(
        turns.windows(2).all(|w| w[0] < w[1]),
        "turn changes logged out of order: {turns:?}"
    );

    // Each enemy attack is logged right before the turn change it caused.
    for (i, a) in activities.iter().enumerate() {
        if a["type"] == "enemy_attack" {
            assert_eq!(activities[i + 1]["type"], "turn_change");
        }
    }
}
