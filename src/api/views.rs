//! HTML views
//!
//! Rendering is a pure function of the session state.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use super::ApiState;
use crate::session::SessionState;

const QUESTION_PLACEHOLDER: &str = "Your question will appear here...";
const ANSWER_PLACEHOLDER: &str = "The answer will appear here...";

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;background:#f9fafb;margin:0;padding:24px;color:#1f2937}\
.card{max-width:42rem;margin:0 auto;background:#fff;border:1px solid #e5e7eb;border-radius:8px;padding:32px}\
.center{text-align:center}\
.nav{min-height:100vh;display:flex;align-items:center;justify-content:center}\
.nav a{padding:16px 32px;background:#2563eb;color:#fff;font-size:1.125rem;font-weight:600;border-radius:8px;text-decoration:none}\
.mic{width:64px;height:64px;border-radius:50%;border:2px solid;color:#fff;font-weight:600;cursor:pointer}\
.mic.idle{background:#3b82f6;border-color:#3b82f6}\
.mic.listening{background:#ef4444;border-color:#ef4444}\
.mic:disabled{opacity:.5;cursor:not-allowed}\
.status.listening{color:#dc2626}\
.panel{border-radius:8px;padding:16px;margin-top:24px;background:#f9fafb}\
.panel.answer{background:#eff6ff}\
.notice{color:#b91c1c}";

/// Build the view router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/assistant", get(assistant))
        .with_state(state)
}

async fn home(State(state): State<Arc<ApiState>>) -> Html<String> {
    Html(render_home(&state.assistant_name))
}

async fn assistant(State(state): State<Arc<ApiState>>) -> Html<String> {
    Html(render_assistant(&state.session.state()))
}

/// Navigation view: a single link to the assistant
#[must_use]
pub fn render_home(assistant_name: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{name}</title>\
         <style>{STYLE}</style></head><body><div class=\"nav\">\
         <a href=\"/assistant\">{name}</a></div></body></html>",
        name = escape_html(assistant_name),
    )
}

/// Assistant view: toggle control, question panel, answer panel
#[must_use]
pub fn render_assistant(state: &SessionState) -> String {
    let mut html = String::with_capacity(2048);

    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    if state.listening || state.loading {
        html.push_str("<meta http-equiv=\"refresh\" content=\"1\">");
    }
    let _ = write!(
        html,
        "<title>Voice Assistant</title><style>{STYLE}</style></head><body><div class=\"card\">"
    );

    html.push_str(
        "<div class=\"center\"><h1>Voice Assistant</h1>\
         <p>Click the microphone to start speaking</p></div>",
    );

    if let Some(notice) = &state.notice {
        let _ = write!(html, "<p class=\"notice center\">{}</p>", escape_html(notice));
    }

    let (mode, button, status) = if state.listening {
        ("listening", "Stop", "Listening...")
    } else {
        ("idle", "Speak", "Click to speak")
    };
    let disabled = if state.notice.is_some() || state.loading {
        " disabled"
    } else {
        ""
    };
    let _ = write!(
        html,
        "<div class=\"center\"><form method=\"post\" action=\"/assistant/toggle\">\
         <button class=\"mic {mode}\" type=\"submit\"{disabled}>{button}</button></form>\
         <p class=\"status {mode}\">{status}</p></div>"
    );

    let question = if state.question.is_empty() {
        QUESTION_PLACEHOLDER.to_string()
    } else {
        escape_html(&state.question)
    };
    let _ = write!(
        html,
        "<div class=\"panel question\"><h3>Your Question</h3><p>{question}</p></div>"
    );

    let answer = if state.loading {
        "<span class=\"spinner\"></span>Thinking...".to_string()
    } else if state.answer.is_empty() {
        ANSWER_PLACEHOLDER.to_string()
    } else {
        escape_html(&state.answer)
    };
    let _ = write!(
        html,
        "<div class=\"panel answer\"><h3>Assistant Answer</h3><p>{answer}</p></div>"
    );

    html.push_str("</div></body></html>");
    html
}

/// Escape text for inclusion in HTML element content or attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_links_to_assistant() {
        let html = render_home("Agent 03");
        assert!(html.contains("<a href=\"/assistant\">Agent 03</a>"));
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_idle_placeholders() {
        let html = render_assistant(&SessionState::default());
        assert!(html.contains("Click to speak"));
        assert!(html.contains("mic idle"));
        assert!(html.contains(QUESTION_PLACEHOLDER));
        assert!(html.contains(ANSWER_PLACEHOLDER));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn test_listening_view() {
        let state = SessionState {
            listening: true,
            ..SessionState::default()
        };
        let html = render_assistant(&state);
        assert!(html.contains("Listening..."));
        assert!(html.contains("mic listening"));
        assert!(html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn test_loading_hides_answer() {
        let state = SessionState {
            question: "What is the capital of France?".to_string(),
            answer: "stale".to_string(),
            loading: true,
            ..SessionState::default()
        };
        let html = render_assistant(&state);
        assert!(html.contains("Thinking..."));
        assert!(html.contains("What is the capital of France?"));
        assert!(!html.contains("stale"));
    }

    #[test]
    fn test_answer_is_escaped() {
        let state = SessionState {
            answer: "<script>alert('x')</script> & more".to_string(),
            ..SessionState::default()
        };
        let html = render_assistant(&state);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_notice_disables_toggle() {
        let state = SessionState {
            notice: Some("no microphone".to_string()),
            ..SessionState::default()
        };
        let html = render_assistant(&state);
        assert!(html.contains("no microphone"));
        assert!(html.contains(" disabled>"));
    }
}
