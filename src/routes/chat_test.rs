use super::*;
use crate::routes::app;
use crate::state::test_helpers;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    post_raw(app, body.to_string()).await
}

async fn post_raw(app: &Router, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router) -> (StatusCode, Value) {
    send(app, Request::builder().uri("/chat").body(Body::empty()).unwrap()).await
}

// =============================================================================
// Action parsing
// =============================================================================

#[test]
fn action_names_round_trip() {
    for action in [
        ChatAction::SendMessage,
        ChatAction::AddOnlineUser,
        ChatAction::RemoveOnlineUser,
        ChatAction::ClearChat,
        ChatAction::UserActivity,
    ] {
        assert_eq!(ChatAction::from_str(action.as_str()), Some(action));
    }
    assert_eq!(ChatAction::from_str("SEND_MESSAGE"), None);
    assert_eq!(ChatAction::from_str(""), None);
}

#[test]
fn required_rejects_blank_and_keeps_verbatim() {
    assert!(required(None, "text").is_err());
    assert!(required(Some("   ".into()), "text").is_err());
    assert_eq!(required(Some(" hi ".into()), "text").unwrap(), " hi ");
}

// =============================================================================
// GET /chat
// =============================================================================

#[tokio::test]
async fn get_on_empty_store() {
    let app = app(test_helpers::test_app_state());
    let (status, body) = get(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["messages"], json!([]));
    assert_eq!(body["onlineUsers"], json!([]));
}

#[tokio::test]
async fn get_caps_messages_at_fifty() {
    let state = test_helpers::test_app_state();
    for i in 0..80 {
        state.store.append_message("Neo", &format!("m{i}"), None);
    }
    let app = app(state);
    let (_, body) = get(&app).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 50);
    assert_eq!(messages[0]["text"], "m30");
    assert_eq!(messages[49]["text"], "m79");
}

// =============================================================================
// POST /chat
// =============================================================================

#[tokio::test]
async fn send_message_returns_created_message() {
    let app = app(test_helpers::test_app_state());
    let (status, body) = post(
        &app,
        json!({ "action": "send_message", "data": { "text": "hello", "user": "Neo", "userId": "1" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["user"], "Neo");
    assert!(body["message"]["time"].is_string());
    assert_eq!(body["message"]["text"], "hello");
    assert_eq!(body["message"]["userId"], "1");

    let (_, listing) = get(&app).await;
    let messages = listing["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["id"], body["message"]["id"]);
}

#[tokio::test]
async fn send_message_requires_text_and_user() {
    let state = test_helpers::test_app_state();
    let app = app(state.clone());

    let (status, body) = post(&app, json!({ "action": "send_message", "data": { "user": "Neo" } })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "text is required");

    let (status, body) = post(&app, json!({ "action": "send_message", "data": { "text": "x", "user": " " } })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "user is required");

    assert_eq!(state.store.message_count(), 0);
}

#[tokio::test]
async fn add_and_remove_online_user() {
    let state = test_helpers::test_app_state();
    let app = app(state.clone());

    let (_, body) = post(&app, json!({ "action": "add_online_user", "data": { "username": "Trinity" } })).await;
    assert_eq!(body["onlineUsers"], json!(["Trinity"]));

    let (_, body) = post(&app, json!({ "action": "add_online_user", "data": { "username": "Trinity" } })).await;
    assert_eq!(body["onlineUsers"], json!(["Trinity"]));

    let (status, body) =
        post(&app, json!({ "action": "remove_online_user", "data": { "username": "Trinity" } })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["onlineUsers"], json!([]));
    assert_eq!(state.store.pending_timers(), 1);
}

#[tokio::test]
async fn presence_actions_require_username() {
    let app = app(test_helpers::test_app_state());
    for action in ["add_online_user", "remove_online_user", "user_activity"] {
        let (status, body) = post(&app, json!({ "action": action })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{action}");
        assert_eq!(body["error"], "username is required");
    }
}

#[tokio::test]
async fn clear_chat_reports_cleared_count() {
    let state = test_helpers::test_app_state();
    state.store.append_message("Neo", "a", None);
    state.store.append_message("Trinity", "b", None);
    state.store.mark_online("Neo");
    let app = app(state.clone());

    let (status, body) = post(&app, json!({ "action": "clear_chat" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["cleared"], 2);
    assert_eq!(state.store.message_count(), 0);
    assert_eq!(state.store.pending_timers(), 0);
    assert_eq!(state.store.online_users(), vec!["Neo"]);
}

#[tokio::test]
async fn user_activity_has_no_other_side_effects() {
    let state = test_helpers::test_app_state();
    let app = app(state.clone());
    let (status, body) = post(&app, json!({ "action": "user_activity", "data": { "username": "Neo" } })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    assert_eq!(state.store.message_count(), 0);
    assert!(state.store.online_users().is_empty());
    assert_eq!(state.store.pending_timers(), 1);
}

#[tokio::test]
async fn unknown_action_is_rejected_without_mutation() {
    let state = test_helpers::test_app_state();
    state.store.append_message("Neo", "keep", None);
    let app = app(state.clone());

    let (status, body) = post(&app, json!({ "action": "drop_tables", "data": {} })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "Invalid action" }));
    assert_eq!(state.store.message_count(), 1);
}

#[tokio::test]
async fn missing_action_is_invalid() {
    let app = app(test_helpers::test_app_state());
    let (status, body) = post(&app, json!({ "data": { "username": "Neo" } })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid action");
}

#[tokio::test]
async fn non_json_body_keeps_envelope() {
    let app = app(test_helpers::test_app_state());
    let (status, body) = post_raw(&app, "{not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body, json!({ "success": false, "error": "invalid request body" }));
}

#[tokio::test]
async fn non_string_action_is_invalid() {
    let state = test_helpers::test_app_state();
    let app = app(state.clone());
    for action in [json!(5), json!(true), json!(["send_message"]), json!({ "name": "clear_chat" })] {
        let (status, body) = post(&app, json!({ "action": action, "data": { "text": "x", "user": "Neo" } })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{action}");
        assert_eq!(body, json!({ "success": false, "error": "Invalid action" }));
    }
    assert_eq!(state.store.message_count(), 0);
}

#[tokio::test]
async fn wrong_field_type_hides_decoder_detail() {
    let app = app(test_helpers::test_app_state());
    let (status, body) = post(&app, json!({ "action": "user_activity", "data": { "username": 42 } })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid request body");
}

#[tokio::test(start_paused = true)]
async fn offline_user_messages_vanish_from_poll_after_grace() {
    let state = test_helpers::test_app_state_with_inactivity(Duration::from_secs(60));
    let app = app(state);

    post(&app, json!({ "action": "send_message", "data": { "text": "bye", "user": "Neo" } })).await;
    post(&app, json!({ "action": "remove_online_user", "data": { "username": "Neo" } })).await;

    tokio::time::sleep(Duration::from_secs(61)).await;
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    let (_, body) = get(&app).await;
    assert_eq!(body["messages"], json!([]));
}
