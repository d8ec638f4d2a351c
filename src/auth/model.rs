use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
struct TokenState {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expiration_time: Option<DateTime<Utc>>,
}

/// A signed-in user and its current token pair.
#[derive(Debug)]
pub struct User {
    uid: String,
    email: Option<String>,
    tokens: Mutex<TokenState>,
}

impl User {
    pub(crate) fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            tokens: Mutex::new(TokenState::default()),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn id_token(&self) -> Option<String> {
        self.tokens().id_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens().refresh_token.clone()
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.tokens().expiration_time
    }

    pub(crate) fn update_tokens(&self, id_token: String, refresh_token: String, expires_in: Duration) {
        let mut state = self.tokens();
        state.id_token = Some(id_token);
        state.refresh_token = Some(refresh_token);
        state.expiration_time = chrono::Duration::from_std(expires_in)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta));
    }

    /// Returns `true` when the ID token is missing or expires within `tolerance`.
    pub(crate) fn should_refresh(&self, tolerance: Duration) -> bool {
        let state = self.tokens();
        if state.id_token.is_none() {
            return true;
        }
        match (state.expiration_time, chrono::Duration::from_std(tolerance)) {
            (None, _) => false,
            (Some(expiration), Ok(tolerance)) => expiration <= Utc::now() + tolerance,
            (Some(_), Err(_)) => true,
        }
    }

    fn tokens(&self) -> MutexGuard<'_, TokenState> {
        self.tokens
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

#[derive(Debug, Serialize, Clone)]
pub(crate) struct EmailPasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(rename = "returnSecureToken")]
    pub return_secure_token: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct EmailPasswordResponse {
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "localId")]
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshTokenResponse {
    pub refresh_token: String,
    pub id_token: String,
    pub expires_in: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_without_tokens_need_refresh() {
        let user = User::new("uid-1", None);
        assert!(user.should_refresh(Duration::from_secs(0)));
    }

    #[test]
    fn refresh_window_uses_tolerance() {
        let user = User::new("uid-2", Some("ada@example.com".into()));
        user.update_tokens("id".into(), "refresh".into(), Duration::from_secs(3600));
        assert!(!user.should_refresh(Duration::from_secs(60)));
        assert!(user.should_refresh(Duration::from_secs(2 * 3600)));
        assert_eq!(user.email(), Some("ada@example.com"));
        assert_eq!(user.id_token().as_deref(), Some("id"));
    }
}
