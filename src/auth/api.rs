use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::app::FirebaseApp;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{
    EmailPasswordRequest, EmailPasswordResponse, ErrorResponse, RefreshTokenRequest,
    RefreshTokenResponse, User,
};
use crate::logger::Logger;

pub(crate) const AUTH_COMPONENT_NAME: &str = "auth";
pub const DEFAULT_IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@app-shell/auth"));

/// Base URLs of the two REST services used by [`Auth`]; point them at the emulator in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub identity_toolkit: String,
    pub secure_token: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: DEFAULT_IDENTITY_TOOLKIT_ENDPOINT.to_string(),
            secure_token: DEFAULT_SECURE_TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl AuthEndpoints {
    /// Endpoints of the Auth emulator listening at `host` (e.g. `http://127.0.0.1:9099`).
    pub fn emulator(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        Self {
            identity_toolkit: format!("{host}/identitytoolkit.googleapis.com/v1"),
            secure_token: format!("{host}/securetoken.googleapis.com/v1"),
        }
    }
}

pub struct Auth {
    app: FirebaseApp,
    api_key: String,
    rest_client: Client,
    endpoints: Mutex<AuthEndpoints>,
    current_user: Mutex<Option<Arc<User>>>,
    token_refresh_tolerance: Duration,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("app", &self.app.name())
            .field("signed_in", &self.current_user().is_some())
            .finish()
    }
}

impl Auth {
    pub fn new(app: FirebaseApp) -> AuthResult<Self> {
        let api_key = app
            .options()
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AuthError::InvalidCredential("Missing API key".into()))?;

        Ok(Self {
            app,
            api_key,
            rest_client: Client::new(),
            endpoints: Mutex::new(AuthEndpoints::default()),
            current_user: Mutex::new(None),
            token_refresh_tolerance: Duration::from_secs(5 * 60),
        })
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.app
    }

    pub fn endpoints(&self) -> AuthEndpoints {
        self.endpoints_guard().clone()
    }

    pub fn set_endpoints(&self, endpoints: AuthEndpoints) {
        *self.endpoints_guard() = endpoints;
    }

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.user_guard().clone()
    }

    pub fn sign_out(&self) {
        if let Some(user) = self.user_guard().take() {
            LOGGER.debug(format!("Signed out user {}", user.uid()));
        }
    }

    pub async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<Arc<User>> {
        self.email_password_request("accounts:signInWithPassword", email, password)
            .await
    }

    pub async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<Arc<User>> {
        self.email_password_request("accounts:signUp", email, password)
            .await
    }

    /// Returns the current user's ID token, refreshing it first when it is about to expire or
    /// when `force_refresh` is set. Resolves to `None` when nobody is signed in.
    pub async fn get_token(&self, force_refresh: bool) -> AuthResult<Option<String>> {
        let Some(user) = self.current_user() else {
            return Ok(None);
        };

        if force_refresh || user.should_refresh(self.token_refresh_tolerance) {
            self.refresh_user_token(&user).await.map(Some)
        } else {
            Ok(user.id_token())
        }
    }

    async fn email_password_request(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Arc<User>> {
        let request = EmailPasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: EmailPasswordResponse = self.execute_request(path, &request).await?;

        let expires_in = parse_expires_in(&response.expires_in)?;
        let user = User::new(
            response.local_id,
            response.email.or_else(|| Some(email.to_owned())),
        );
        user.update_tokens(response.id_token, response.refresh_token, expires_in);
        let user = Arc::new(user);
        *self.user_guard() = Some(user.clone());
        LOGGER.debug(format!("Signed in user {}", user.uid()));
        Ok(user)
    }

    async fn refresh_user_token(&self, user: &Arc<User>) -> AuthResult<String> {
        let refresh_token = user
            .refresh_token()
            .ok_or_else(|| AuthError::InvalidCredential("Missing refresh token".into()))?;
        let url = self.endpoint_url(&self.endpoints().secure_token, "token")?;
        let request = RefreshTokenRequest {
            grant_type: "refresh_token",
            refresh_token: &refresh_token,
        };

        let response = self
            .rest_client
            .post(url)
            .form(&request)
            .send()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        let response: RefreshTokenResponse = decode_response(response).await?;

        let expires_in = parse_expires_in(&response.expires_in)?;
        user.update_tokens(response.id_token.clone(), response.refresh_token, expires_in);
        Ok(response.id_token)
    }

    async fn execute_request<TRequest, TResponse>(
        &self,
        path: &str,
        request: &TRequest,
    ) -> AuthResult<TResponse>
    where
        TRequest: Serialize,
        TResponse: DeserializeOwned,
    {
        let url = self.endpoint_url(&self.endpoints().identity_toolkit, path)?;
        let response = self
            .rest_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        decode_response(response).await
    }

    fn endpoint_url(&self, base: &str, path: &str) -> AuthResult<Url> {
        let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))
            .map_err(|err| AuthError::Network(err.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    fn endpoints_guard(&self) -> MutexGuard<'_, AuthEndpoints> {
        self.endpoints
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn user_guard(&self) -> MutexGuard<'_, Option<Arc<User>>> {
        self.current_user
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> AuthResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|err| AuthError::Network(err.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_error_response(status, &body))
}

fn map_error_response(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.message);
    match message {
        Some(message) if message.starts_with("TOKEN_EXPIRED") || message == "INVALID_REFRESH_TOKEN" => {
            AuthError::InvalidCredential(message)
        }
        Some(message) => AuthError::Rejected(message),
        None => AuthError::Network(format!("Auth request failed with status {status}")),
    }
}

fn parse_expires_in(raw: &str) -> AuthResult<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| AuthError::InvalidCredential(format!("Invalid expiresIn value '{raw}'")))
}

/// Returns the auth handle of `app`, creating it on first use.
pub fn auth_for_app(app: &FirebaseApp) -> AuthResult<Arc<Auth>> {
    app.get_or_init_service(AUTH_COMPONENT_NAME, |app| Auth::new(app.clone()))
}

/// Returns the auth handle of `app` only if one has already been created.
pub(crate) fn existing_auth(app: &FirebaseApp) -> Option<Arc<Auth>> {
    app.service::<Auth>(AUTH_COMPONENT_NAME)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_app(api_key: Option<&str>) -> FirebaseApp {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let options = FirebaseOptions {
            api_key: api_key.map(str::to_string),
            project_id: Some("auth-test".into()),
            ..Default::default()
        };
        let settings = FirebaseAppSettings {
            name: Some(format!("auth-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        };
        initialize_app(options, Some(settings)).unwrap()
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let err = auth_for_app(&test_app(None)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[test]
    fn auth_is_cached_per_app() {
        let app = test_app(Some("key"));
        let first = auth_for_app(&app).unwrap();
        let second = auth_for_app(&app).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(existing_auth(&app).is_some());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_in_stores_user_and_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword")
                    .query_param("key", "test-key")
                    .json_body(json!({
                        "email": "ada@example.com",
                        "password": "secret",
                        "returnSecureToken": true
                    }));
                then.status(200).json_body(json!({
                    "idToken": "id-token",
                    "refreshToken": "refresh-token",
                    "localId": "uid-123",
                    "email": "ada@example.com",
                    "expiresIn": "3600"
                }));
            })
            .await;

        let auth = auth_for_app(&test_app(Some("test-key"))).unwrap();
        auth.set_endpoints(AuthEndpoints::emulator(&server.base_url()));

        let user = auth
            .sign_in_with_email_and_password("ada@example.com", "secret")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(user.uid(), "uid-123");
        assert_eq!(auth.get_token(false).await.unwrap().as_deref(), Some("id-token"));

        auth.sign_out();
        assert!(auth.current_user().is_none());
        assert_eq!(auth.get_token(false).await.unwrap(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn forced_refresh_uses_secure_token_endpoint() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/identitytoolkit.googleapis.com/v1/accounts:signUp");
                then.status(200).json_body(json!({
                    "idToken": "first-token",
                    "refreshToken": "refresh-1",
                    "localId": "uid-9",
                    "expiresIn": "3600"
                }));
            })
            .await;
        let refresh = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/securetoken.googleapis.com/v1/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=refresh-1");
                then.status(200).json_body(json!({
                    "access_token": "second-token",
                    "refresh_token": "refresh-2",
                    "id_token": "second-token",
                    "expires_in": "3600",
                    "user_id": "uid-9"
                }));
            })
            .await;

        let auth = auth_for_app(&test_app(Some("test-key"))).unwrap();
        auth.set_endpoints(AuthEndpoints::emulator(&server.base_url()));
        let user = auth
            .create_user_with_email_and_password("grace@example.com", "pw123456")
            .await
            .unwrap();
        assert_eq!(user.email(), Some("grace@example.com"));

        let token = auth.get_token(true).await.unwrap();
        refresh.assert_async().await;
        assert_eq!(token.as_deref(), Some("second-token"));
        assert_eq!(user.refresh_token().as_deref(), Some("refresh-2"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn backend_error_codes_are_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword");
                then.status(400)
                    .json_body(json!({"error": {"code": 400, "message": "EMAIL_NOT_FOUND"}}));
            })
            .await;

        let auth = auth_for_app(&test_app(Some("test-key"))).unwrap();
        auth.set_endpoints(AuthEndpoints::emulator(&server.base_url()));
        let err = auth
            .sign_in_with_email_and_password("nobody@example.com", "x")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Rejected("EMAIL_NOT_FOUND".into()));
        assert!(auth.current_user().is_none());
    }
}
