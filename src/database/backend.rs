use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::app::FirebaseApp;
use crate::auth::existing_auth;
use crate::database::error::{
    internal_error, invalid_argument, network_error, permission_denied, DatabaseError,
    DatabaseResult,
};
use crate::logger::Logger;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@app-shell/database"));

/// Characters left unescaped in a path segment of a REST URL.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// Storage behind a [`Database`](crate::database::Database).
///
/// Paths are already validated segment lists. `get` resolves to `Value::Null` when nothing is
/// stored; `update` receives absolute paths that all live under `base_path`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DatabaseBackend: Send + Sync {
    async fn get(&self, path: &[String]) -> DatabaseResult<Value>;
    async fn set(&self, path: &[String], value: Value) -> DatabaseResult<()>;
    async fn update(
        &self,
        base_path: &[String],
        updates: Vec<(Vec<String>, Value)>,
    ) -> DatabaseResult<()>;
    async fn delete(&self, path: &[String]) -> DatabaseResult<()>;
}

/// Uses the REST backend when the app has a `database_url`, the in-memory one otherwise.
pub(crate) fn select_backend(app: &FirebaseApp) -> Arc<dyn DatabaseBackend> {
    if let Some(url) = app.options().database_url {
        match RestBackend::new(&url, Some(app.clone())) {
            Ok(backend) => return Arc::new(backend),
            Err(err) => {
                LOGGER.warn(format!(
                    "Falling back to in-memory Realtime Database backend: {err}"
                ));
            }
        }
    }
    Arc::new(InMemoryBackend::default())
}

/// Process-local tree with the same merge and delete semantics as the hosted database.
pub struct InMemoryBackend {
    data: Mutex<Value>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            data: Mutex::new(Value::Object(Map::new())),
        }
    }
}

impl InMemoryBackend {
    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl DatabaseBackend for InMemoryBackend {
    async fn get(&self, path: &[String]) -> DatabaseResult<Value> {
        let data = self.data();
        Ok(get_at_path(&data, path).cloned().unwrap_or(Value::Null))
    }

    async fn set(&self, path: &[String], value: Value) -> DatabaseResult<()> {
        let mut data = self.data();
        set_at_path(&mut data, path, value);
        prune(&mut data);
        Ok(())
    }

    async fn update(
        &self,
        _base_path: &[String],
        updates: Vec<(Vec<String>, Value)>,
    ) -> DatabaseResult<()> {
        let mut data = self.data();
        for (path, value) in updates {
            set_at_path(&mut data, &path, value);
        }
        prune(&mut data);
        Ok(())
    }

    async fn delete(&self, path: &[String]) -> DatabaseResult<()> {
        let mut data = self.data();
        set_at_path(&mut data, path, Value::Null);
        prune(&mut data);
        Ok(())
    }
}

/// Talks to `https://<db>.firebaseio.com/<path>.json`, attaching the signed-in user's ID token.
pub struct RestBackend {
    client: Client,
    base_url: Url,
    base_query: Vec<(String, String)>,
    app: Option<FirebaseApp>,
}

impl RestBackend {
    /// `app` supplies the auth token; pass `None` for unauthenticated access.
    pub fn new(raw_url: &str, app: Option<FirebaseApp>) -> DatabaseResult<Self> {
        let mut url = Url::parse(raw_url)
            .map_err(|err| invalid_argument(format!("Invalid database_url '{raw_url}': {err}")))?;

        if !url.path().ends_with('/') {
            let mut path = url.path().trim_end_matches('/').to_owned();
            path.push('/');
            url.set_path(&path);
        }

        let base_query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.set_query(None);

        Ok(Self {
            client: Client::new(),
            base_url: url,
            base_query,
            app,
        })
    }

    fn url_for_path(&self, path: &[String], query: &[(String, String)]) -> DatabaseResult<Url> {
        let encoded: Vec<String> = path
            .iter()
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        let relative = if encoded.is_empty() {
            ".json".to_string()
        } else {
            format!("{}.json", encoded.join("/"))
        };
        let mut url = self
            .base_url
            .join(&relative)
            .map_err(|err| internal_error(format!("Failed to compose database URL: {err}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in self.base_query.iter().chain(query.iter()) {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn auth_token(&self) -> DatabaseResult<Option<String>> {
        let Some(auth) = self.app.as_ref().and_then(existing_auth) else {
            return Ok(None);
        };
        match auth.get_token(false).await {
            Ok(Some(token)) if token.is_empty() => Ok(None),
            Ok(token) => Ok(token),
            Err(err) => Err(internal_error(format!("failed to obtain auth token: {err}"))),
        }
    }

    async fn send_request(
        &self,
        method: Method,
        path: &[String],
        mut query: Vec<(String, String)>,
        body: Option<&Value>,
    ) -> DatabaseResult<Response> {
        if !query.iter().any(|(key, _)| key == "auth") {
            if let Some(token) = self.auth_token().await? {
                query.push(("auth".to_string(), token));
            }
        }
        let url = self.url_for_path(path, &query)?;
        let mut request = self.client.request(method, url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        request.send().await.map_err(handle_reqwest_error)
    }

    async fn ensure_success(&self, response: Response) -> DatabaseResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.ok();
        Err(handle_http_error(status, body))
    }
}

fn silent() -> Vec<(String, String)> {
    vec![("print".to_string(), "silent".to_string())]
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl DatabaseBackend for RestBackend {
    async fn get(&self, path: &[String]) -> DatabaseResult<Value> {
        let response = self.send_request(Method::GET, path, Vec::new(), None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Value::Null);
        }
        let response = self.ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|err| internal_error(format!("Failed to decode database response: {err}")))
    }

    async fn set(&self, path: &[String], value: Value) -> DatabaseResult<()> {
        let response = self
            .send_request(Method::PUT, path, silent(), Some(&value))
            .await?;
        self.ensure_success(response).await.map(|_| ())
    }

    async fn update(
        &self,
        base_path: &[String],
        updates: Vec<(Vec<String>, Value)>,
    ) -> DatabaseResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut payload = Map::with_capacity(updates.len());
        for (absolute_path, value) in updates {
            let Some(relative) = absolute_path.strip_prefix(base_path) else {
                return Err(internal_error(
                    "Database update contained a path outside the reference",
                ));
            };
            if relative.is_empty() {
                return Err(invalid_argument(
                    "Database update path cannot be empty relative to the reference",
                ));
            }
            payload.insert(relative.join("/"), value);
        }

        let body = Value::Object(payload);
        let response = self
            .send_request(Method::PATCH, base_path, silent(), Some(&body))
            .await?;
        self.ensure_success(response).await.map(|_| ())
    }

    async fn delete(&self, path: &[String]) -> DatabaseResult<()> {
        let response = self
            .send_request(Method::DELETE, path, silent(), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.ensure_success(response).await.map(|_| ())
    }
}

fn handle_reqwest_error(err: reqwest::Error) -> DatabaseError {
    if let Some(status) = err.status() {
        return handle_http_error(status, None);
    }
    network_error(format!("Database request failed: {err}"))
}

fn handle_http_error(status: StatusCode, body: Option<String>) -> DatabaseError {
    let message = body.as_deref().and_then(extract_error_message);

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            invalid_argument(message.unwrap_or_else(|| "Invalid data payload".to_string()))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            permission_denied(message.unwrap_or_else(|| "Permission denied".to_string()))
        }
        _ => internal_error(format!(
            "Database request failed with status {}{}",
            status.as_str(),
            message.map(|b| format!(": {b}")).unwrap_or_default()
        )),
    }
}

fn extract_error_message(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        if let Some(Value::String(message)) = obj.get("error") {
            return Some(message.clone());
        }
    }
    Some(raw.to_string())
}

fn set_at_path(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if value.is_null() && current.get(segment).is_none() {
            return;
        }
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn get_at_path<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let found = path
        .iter()
        .try_fold(root, |current, segment| current.as_object()?.get(segment))?;
    match found {
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

/// Drops null leaves and the empty objects they leave behind.
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        map.values_mut().for_each(prune);
        map.retain(|_, child| !is_empty_node(child));
    }
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
