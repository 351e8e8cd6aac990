
use axum::http::StatusCode;
use axum_test::TestServer;
use parley_server::config::SecurityConfig;
use parley_server::protocol::{MessageView, Room};
use parley_server::server::ChatServer;
use parley_server::websocket::create_router;
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::{create_room, create_test_server, token_for, token_with_ttl};

fn rest_client(server: Arc<ChatServer>) -> TestServer {
    let app = create_router(&SecurityConfig::default()).with_state(server);
    TestServer::new(app).expect("test server builds")
}

#[tokio::test]
async fn health_reports_ok() {
    let client = rest_client(create_test_server());
    let response = client.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn rooms_require_bearer_token() {
    let client = rest_client(create_test_server());

    let response = client.get("/rooms").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "errors": "Authentication required" }));

    let response = client
        .get("/rooms")
        .authorization_bearer(token_with_ttl("alice", -600))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "errors": "Token expired" }));
}

#[tokio::test]
async fn rooms_list_includes_participants_and_summary() {
    let server = create_test_server();
    let room = create_room(&server, "general").await;
    server
        .post_message(&"alice".to_string(), room, "first message")
        .await
        .unwrap();
    server
        .database()
        .add_participant(&room, &"alice".to_string())
        .await
        .unwrap();
    let client = rest_client(server);

    let response = client
        .get("/rooms")
        .authorization_bearer(token_for("bob"))
        .await;
    response.assert_status_ok();
    let rooms: Vec<Room> = response.json();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].id, room);
    assert!(rooms[0].participants.contains("alice"));
    assert_eq!(
        rooms[0].last_message.as_ref().map(|s| s.text.as_str()),
        Some("first message")
    );
}

#[tokio::test]
async fn history_is_ascending_and_unknown_room_is_404() {
    let server = create_test_server();
    let room = create_room(&server, "general").await;
    for text in ["one", "two", "three"] {
        server
            .post_message(&"alice".to_string(), room, text)
            .await
            .unwrap();
    }
    let client = rest_client(server);
    let token = token_for("bob");

    let response = client
        .get(&format!("/rooms/{room}/messages"))
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let history: Vec<MessageView> = response.json();
    let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert!(history.windows(2).all(|w| w[0].created_at < w[1].created_at));

    let response = client
        .get(&format!("/rooms/{}/messages", uuid::Uuid::new_v4()))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_message_persists_and_returns_record() {
    let server = create_test_server();
    let room = create_room(&server, "general").await;
    let client = rest_client(server.clone());

    let response = client
        .post("/messages")
        .authorization_bearer(token_for("alice"))
        .json(&json!({ "roomId": room, "text": "  from http  " }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["text"], "from http");
    assert_eq!(body["roomId"], room.to_string());
    assert_eq!(body["user"]["id"], "alice");

    let stored = server.database().room_history(&room).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "from http");
}

#[tokio::test]
async fn post_message_rejects_bad_requests() {
    let server = create_test_server();
    let room = create_room(&server, "general").await;
    let client = rest_client(server);
    let token = token_for("alice");

    client
        .post("/messages")
        .json(&json!({ "roomId": room, "text": "hi" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    client
        .post("/messages")
        .authorization_bearer(&token)
        .json(&json!({ "roomId": uuid::Uuid::new_v4(), "text": "hi" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    client
        .post("/messages")
        .authorization_bearer(&token)
        .json(&json!({ "roomId": room, "text": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
