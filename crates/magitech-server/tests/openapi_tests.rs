use magitech_server::TestApp;

#[tokio::test]
async fn test_openapi_json_endpoint() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/api-docs/openapi.json")).await;
    assert_eq!(res.status, 200);

    let json = res.json();
    assert_eq!(json["openapi"], "3.1.0");
    assert_eq!(json["info"]["title"], "Magitech RPG API");
    assert!(json["paths"].is_object());
}

#[tokio::test]
async fn test_openapi_lists_game_paths() {
    let app = TestApp::new().await;

    let json = app.client.get(&app.url("/api-docs/openapi.json")).await.json();
    for path in [
        "/api/auth/register",
        "/api/auth/login",
        "/api/characters/{id}",
        "/api/sessions",
        "/api/sessions/{id}/join",
        "/api/sessions/{id}/sync",
        "/api/sessions/{id}/combat/start",
        "/api/sessions/{id}/combat/action",
        "/api/sessions/{id}/chat",
    ] {
        assert!(json["paths"][path].is_object(), "missing {path} in OpenAPI spec");
    }
}

#[tokio::test]
async fn test_openapi_has_security_scheme() {
    let app = TestApp::new().await;

    let json = app.client.get(&app.url("/api-docs/openapi.json")).await.json();
    assert_eq!(
        json["components"]["securitySchemes"]["bearer_auth"]["scheme"],
        "bearer"
    );
}

#[tokio::test]
async fn test_docs_ui_and_welcome() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/api-docs")).await;
    assert_eq!(res.status, 200);
    assert!(res.body.contains("<html") || res.body.contains("<!doctype html"));

    let res = app.client.get(&app.url("/")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json()["status"], "running");
    assert_eq!(res.json()["docs"], "/api-docs");
}
