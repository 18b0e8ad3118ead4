//! Voice assistant session
//!
//! A session is the idle/listening toggle plus the loading flag, the last
//! question and the last answer. It lives for as long as the process and is
//! driven one turn at a time by the [`SessionController`].

mod controller;

use serde::Serialize;

pub use controller::{SessionController, SessionHandle, UNSUPPORTED_NOTICE};

/// Observable state of the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// A recognition session is running
    pub listening: bool,

    /// Last recognized question
    pub question: String,

    /// Last answer or failure message
    pub answer: String,

    /// An answer request is in flight
    pub loading: bool,

    /// Why the assistant cannot listen, if it cannot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl SessionState {
    /// Nothing is in progress
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.listening && !self.loading
    }
}
