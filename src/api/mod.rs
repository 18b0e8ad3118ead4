//! Local web surface for the voice assistant
//!
//! Serves a navigation page linking to the assistant view, the assistant
//! view itself, and a JSON snapshot of the session state.

pub mod assistant;
pub mod health;
pub mod views;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::session::SessionHandle;
use crate::{Error, Result};

/// Shared state for handlers
#[derive(Clone)]
pub struct ApiState {
    pub session: SessionHandle,
    pub assistant_name: String,
}

/// Web server for the assistant
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for the given session
    #[must_use]
    pub fn new(session: SessionHandle, assistant_name: String, port: u16) -> Self {
        Self {
            state: Arc::new(ApiState {
                session,
                assistant_name,
            }),
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    /// Run the server on localhost until `shutdown` resolves
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(url = %format!("http://{addr}/"), "web surface listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Config(format!("web server error: {e}")))?;

        Ok(())
    }
}

/// Build the full router over shared state
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(views::router(Arc::clone(&state)))
        .merge(assistant::router(state))
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
}
