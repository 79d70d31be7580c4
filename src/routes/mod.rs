//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The browser poller hits `/chat` on an interval and posts actions to the
//! same path. Handlers are thin: they decode the envelope, call the store,
//! and shape the JSON reply.

pub mod chat;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", get(chat::get_chat).post(chat::post_chat))
        .route("/healthz", get(healthz))
        .layer(CatchPanicLayer::custom(panic_to_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// A panicking handler answers with the generic failure envelope; the
/// server keeps serving.
fn panic_to_response(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(detail).into_response()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
