//! Chat polling endpoint.
//!
//! `GET /chat` returns recent messages and presence. `POST /chat` takes an
//! `{ action, data }` envelope and dispatches it to the store. Input is
//! validated here; the store accepts whatever it is given.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
struct ChatRequest {
    /// Kept loose so a non-string action is reported as invalid, not malformed.
    #[serde(default)]
    action: Value,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct SendMessageData {
    text: Option<String>,
    user: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct UsernameData {
    username: Option<String>,
}

/// Actions accepted by `POST /chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    SendMessage,
    AddOnlineUser,
    RemoveOnlineUser,
    ClearChat,
    UserActivity,
}

impl ChatAction {
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "send_message" => Some(Self::SendMessage),
            "add_online_user" => Some(Self::AddOnlineUser),
            "remove_online_user" => Some(Self::RemoveOnlineUser),
            "clear_chat" => Some(Self::ClearChat),
            "user_activity" => Some(Self::UserActivity),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::AddOnlineUser => "add_online_user",
            Self::RemoveOnlineUser => "remove_online_user",
            Self::ClearChat => "clear_chat",
            Self::UserActivity => "user_activity",
        }
    }
}

/// `GET /chat` — last messages plus the online set.
pub async fn get_chat(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.store.snapshot();
    Json(json!({
        "success": true,
        "messages": snapshot.messages,
        "onlineUsers": snapshot.online_users,
    }))
}

/// `POST /chat` — dispatch an `{ action, data }` request.
pub async fn post_chat(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: ChatRequest = serde_json::from_slice(&body)?;
    let Some(action) = request.action.as_str().and_then(ChatAction::from_str) else {
        return Err(ApiError::InvalidAction(request.action.to_string()));
    };
    debug!(action = action.as_str(), "chat request");

    let data = if request.data.is_null() { json!({}) } else { request.data };
    let store = &state.store;

    match action {
        ChatAction::SendMessage => {
            let data: SendMessageData = serde_json::from_value(data)?;
            let text = required(data.text, "text")?;
            let user = required(data.user, "user")?;
            let message = store.append_message(&user, &text, data.user_id);
            Ok(Json(json!({ "success": true, "message": message })))
        }
        ChatAction::AddOnlineUser => {
            let username = username(data)?;
            let online = store.mark_online(&username);
            Ok(Json(json!({ "success": true, "onlineUsers": online })))
        }
        ChatAction::RemoveOnlineUser => {
            let username = username(data)?;
            let online = store.mark_offline(&username);
            Ok(Json(json!({ "success": true, "onlineUsers": online })))
        }
        ChatAction::ClearChat => {
            let cleared = store.clear_all();
            Ok(Json(json!({
                "success": true,
                "message": "Chat cleared successfully",
                "cleared": cleared,
            })))
        }
        ChatAction::UserActivity => {
            let username = username(data)?;
            store.record_activity(&username);
            Ok(Json(json!({ "success": true })))
        }
    }
}

fn username(data: Value) -> Result<String, ApiError> {
    let data: UsernameData = serde_json::from_value(data)?;
    required(data.username, "username")
}

/// Reject missing or blank fields. Accepted values are passed on verbatim.
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::MalformedInput(format!("{field} is required"))),
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
