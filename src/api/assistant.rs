//! Assistant control endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::ApiState;
use crate::session::SessionState;

/// Build the assistant control router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/assistant/toggle", post(toggle))
        .route("/api/state", get(session_state))
        .with_state(state)
}

/// Toggle listening, then show the assistant view again
async fn toggle(State(state): State<Arc<ApiState>>) -> Response {
    match state.session.toggle().await {
        Ok(()) => Redirect::to("/assistant").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "toggle failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Current session state as JSON
async fn session_state(State(state): State<Arc<ApiState>>) -> Json<SessionState> {
    Json(state.session.state())
}
