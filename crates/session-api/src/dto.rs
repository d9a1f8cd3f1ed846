//! Request and response bodies

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use session_core::{CookieAttributes, SessionState, SessionStatus, UserRef};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub cookie: CookieAttributes,
    pub data: Map<String, Value>,
}

impl SessionView {
    pub fn new(status: SessionStatus, state: SessionState) -> Self {
        let status = match status {
            SessionStatus::Resolved => "resolved",
            SessionStatus::Unresolved => "unresolved",
        };
        Self {
            status,
            data: state.data().clone(),
            user: state.user,
            cookie: state.cookie,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}
