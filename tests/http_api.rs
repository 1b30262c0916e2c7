//! HTTP surface tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use common::TestServer;
use pulsechat::backend::chat::handlers::{join_room, send_message};
use pulsechat::backend::routes::create_router;
use pulsechat::shared::messaging::Conversation;
use pulsechat::shared::protocol::{JoinRoomRequest, SendMessageRequest};

fn router(server: &TestServer) -> Router {
    create_router(server.state.clone())
}

async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn seeded_conversation(server: &TestServer, messages: &[&str]) -> (Conversation, String, String) {
    let alice = server.user("alice").await;
    let bob = server.user("bob").await;
    let a = server.connect(&alice).await;
    let conversation = assert_ok!(
        join_room(
            &server.state,
            a.context(),
            JoinRoomRequest {
                conversation_id: None,
                participant_ids: vec![bob.id],
            },
        )
        .await
    );
    for content in messages {
        assert_ok!(
            send_message(
                &server.state,
                a.context(),
                SendMessageRequest {
                    conversation_id: conversation.id,
                    content: content.to_string(),
                },
            )
            .await
        );
    }
    let mallory = server.user("mallory").await;
    (conversation, server.token_for(&bob), server.token_for(&mallory))
}

#[tokio::test]
async fn test_healthcheck() {
    let server = TestServer::new();
    let (status, body) = get(router(&server), "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn test_history_is_oldest_first_and_limited() {
    let server = TestServer::new();
    let (conversation, bob_token, _) = seeded_conversation(&server, &["one", "two", "three"]).await;
    let uri = format!("/api/conversations/{}/messages", conversation.id);

    let (status, body) = get(router(&server), &uri, Some(&bob_token)).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["one", "two", "three"]);

    let (_, body) = get(router(&server), &format!("{}?limit=2", uri), Some(&bob_token)).await;
    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["two", "three"]);
}

#[tokio::test]
async fn test_history_requires_participant_and_token() {
    let server = TestServer::new();
    let (conversation, _, mallory_token) = seeded_conversation(&server, &["secret"]).await;
    let uri = format!("/api/conversations/{}/messages", conversation.id);

    let (status, body) = get(router(&server), &uri, Some(&mallory_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);

    let (status, _) = get(router(&server), &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(router(&server), &uri, Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_online_users() {
    let server = TestServer::new();
    let alice = server.user("alice").await;
    let bob = server.user("bob").await;
    let _a = server.connect(&alice).await;

    let (status, body) = get(router(&server), "/api/presence/online", Some(&server.token_for(&bob))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], serde_json::json!([alice.id]));
    assert_eq!(body["recently_active"], serde_json::json!([]));
}

#[tokio::test]
async fn test_online_users_lists_recently_seen() {
    let server = TestServer::new();
    let alice = server.user("alice").await;
    let carol = server.user("carol").await;
    let dave = server.user("dave").await;
    let now = chrono::Utc::now();
    assert_ok!(server.state.store.touch_user(carol.id, now - chrono::Duration::minutes(1)).await);
    assert_ok!(server.state.store.touch_user(dave.id, now - chrono::Duration::minutes(10)).await);
    let _a = server.connect(&alice).await;

    let (_, body) = get(router(&server), "/api/presence/online", Some(&server.token_for(&dave))).await;
    assert_eq!(body["users"], serde_json::json!([alice.id]));
    assert_eq!(body["recently_active"], serde_json::json!([carol.id]));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = TestServer::new();
    let (status, _) = get(router(&server), "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
