#![cfg(not(target_arch = "wasm32"))]

use std::sync::Arc;

use async_trait::async_trait;
use firebase_app_shell::app::{initialize_app, FirebaseApp, FirebaseAppSettings, FirebaseOptions};
use firebase_app_shell::auth::{auth_for_app, AuthEndpoints};
use firebase_app_shell::database::{
    get_database, Database, DatabaseBackend, DatabaseError, DatabaseErrorCode, DatabaseResult,
};
use firebase_app_shell::fields::{get_field_value, update_field_value, FieldAccessError};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn unique_settings(name: &str) -> FirebaseAppSettings {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    FirebaseAppSettings {
        name: Some(format!("{name}-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
        ..Default::default()
    }
}

fn init_app(name: &str, database_url: Option<String>) -> FirebaseApp {
    let options = FirebaseOptions {
        api_key: Some("test-api-key".into()),
        project_id: Some("field-tests".into()),
        database_url,
        ..Default::default()
    };
    initialize_app(options, Some(unique_settings(name))).expect("initialize app")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    volume: u8,
}

#[tokio::test(flavor = "multi_thread")]
async fn read_after_write_round_trips_typed_values() {
    let database = get_database(Some(init_app("fields-memory", None))).unwrap();

    update_field_value(
        &database,
        "users/ada",
        "settings",
        Settings {
            theme: "dark".into(),
            volume: 7,
        },
    )
    .await
    .unwrap();
    update_field_value(&database, "users/ada", "nickname", "countess")
        .await
        .unwrap();

    let settings: Option<Settings> = get_field_value(&database, "users/ada/settings")
        .await
        .unwrap();
    assert_eq!(
        settings,
        Some(Settings {
            theme: "dark".into(),
            volume: 7
        })
    );

    let user: Option<Value> = get_field_value(&database, "users/ada").await.unwrap();
    assert_eq!(
        user,
        Some(json!({
            "nickname": "countess",
            "settings": { "theme": "dark", "volume": 7 }
        }))
    );

    let missing: Option<Settings> = get_field_value(&database, "users/grace/settings")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_field_paths_do_not_touch_siblings() {
    let database = get_database(Some(init_app("fields-nested", None))).unwrap();
    update_field_value(&database, "game", "scores/ada", 3).await.unwrap();
    update_field_value(&database, "game", "scores/grace", 5).await.unwrap();
    update_field_value(&database, "game", "round", 2).await.unwrap();

    let scores: Option<Value> = get_field_value(&database, "game/scores").await.unwrap();
    assert_eq!(scores, Some(json!({ "ada": 3, "grace": 5 })));
}

#[tokio::test(flavor = "multi_thread")]
async fn overwriting_a_field_keeps_its_siblings() {
    let database = get_database(Some(init_app("fields-overwrite", None))).unwrap();
    database
        .reference("doc")
        .unwrap()
        .set(json!({ "a": 1, "b": 2 }))
        .await
        .unwrap();

    let before: Option<i64> = get_field_value(&database, "doc/a").await.unwrap();
    assert_eq!(before, Some(1));

    update_field_value(&database, "doc", "a", 5).await.unwrap();

    let after: Option<i64> = get_field_value(&database, "doc/a").await.unwrap();
    assert_eq!(after, Some(5));
    let doc: Option<Value> = get_field_value(&database, "doc").await.unwrap();
    assert_eq!(doc, Some(json!({ "a": 5, "b": 2 })));
}

struct UnavailableBackend;

fn offline() -> DatabaseError {
    DatabaseError::new(DatabaseErrorCode::Network, "backend offline")
}

#[async_trait]
impl DatabaseBackend for UnavailableBackend {
    async fn get(&self, _path: &[String]) -> DatabaseResult<Value> {
        Err(offline())
    }

    async fn set(&self, _path: &[String], _value: Value) -> DatabaseResult<()> {
        Err(offline())
    }

    async fn update(
        &self,
        _base_path: &[String],
        _updates: Vec<(Vec<String>, Value)>,
    ) -> DatabaseResult<()> {
        Err(offline())
    }

    async fn delete(&self, _path: &[String]) -> DatabaseResult<()> {
        Err(offline())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn backend_failures_are_wrapped_with_their_source() {
    let database = Database::with_backend(
        init_app("fields-offline", None),
        Arc::new(UnavailableBackend),
    );

    let read = get_field_value::<String>(&database, "status").await.unwrap_err();
    assert!(matches!(read, FieldAccessError::Read { ref path, .. } if path == "status"));
    assert!(read.to_string().contains("backend offline"));
    assert_eq!(
        read.database_error().map(DatabaseError::code_str),
        Some("database/network")
    );

    let update = update_field_value(&database, "status", "online", true)
        .await
        .unwrap_err();
    match &update {
        FieldAccessError::Update { path, field, source } => {
            assert_eq!(path, "status");
            assert_eq!(field, "online");
            assert_eq!(source.code, DatabaseErrorCode::Network);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let source = std::error::Error::source(&update).expect("source");
    assert!(source.to_string().contains("backend offline"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_reads_carry_the_signed_in_users_token() {
    let server = MockServer::start_async().await;
    let sign_in = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword")
                .query_param("key", "test-api-key");
            then.status(200).json_body(json!({
                "idToken": "id-token-1",
                "refreshToken": "refresh-1",
                "localId": "uid-ada",
                "expiresIn": "3600"
            }));
        })
        .await;
    let read = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/scores/ada.json")
                .query_param("auth", "id-token-1");
            then.status(200).json_body(json!(42));
        })
        .await;

    let app = init_app("fields-rest-auth", Some(server.url("/")));
    let auth = auth_for_app(&app).unwrap();
    auth.set_endpoints(AuthEndpoints::emulator(&server.base_url()));
    auth.sign_in_with_email_and_password("ada@example.com", "hunter2")
        .await
        .unwrap();

    let database = get_database(Some(app)).unwrap();
    let score: Option<u32> = get_field_value(&database, "scores/ada").await.unwrap();
    assert_eq!(score, Some(42));

    sign_in.assert_async().await;
    read.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_absence_and_permission_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing.json");
            then.status(200).body("null");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/secret.json");
            then.status(401)
                .json_body(json!({ "error": "Permission denied" }));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/profiles/ada.json")
                .query_param("print", "silent")
                .json_body(json!({ "status": "away" }));
            then.status(204);
        })
        .await;

    let database = get_database(Some(init_app("fields-rest", Some(server.url("/"))))).unwrap();

    let missing: Option<String> = get_field_value(&database, "missing").await.unwrap();
    assert!(missing.is_none());

    let err = get_field_value::<String>(&database, "secret").await.unwrap_err();
    assert_eq!(
        err.database_error().map(DatabaseError::code_str),
        Some("database/permission-denied")
    );
    assert!(err.to_string().contains("Permission denied"));

    update_field_value(&database, "profiles/ada", "status", "away")
        .await
        .unwrap();
    patch.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_overwrite_sends_only_the_changed_field() {
    let server = MockServer::start_async().await;
    let mut before = server
        .mock_async(|when, then| {
            when.method(GET).path("/doc/a.json");
            then.status(200).json_body(json!(1));
        })
        .await;
    let patch = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/doc.json")
                .json_body(json!({ "a": 5 }));
            then.status(204);
        })
        .await;

    let database =
        get_database(Some(init_app("fields-rest-overwrite", Some(server.url("/"))))).unwrap();

    let value: Option<i64> = get_field_value(&database, "doc/a").await.unwrap();
    assert_eq!(value, Some(1));

    update_field_value(&database, "doc", "a", 5).await.unwrap();
    patch.assert_async().await;

    before.assert_async().await;
    before.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc/a.json");
            then.status(200).json_body(json!(5));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/doc.json");
            then.status(200).json_body(json!({ "a": 5, "b": 2 }));
        })
        .await;

    let value: Option<i64> = get_field_value(&database, "doc/a").await.unwrap();
    assert_eq!(value, Some(5));
    let doc: Option<Value> = get_field_value(&database, "doc").await.unwrap();
    assert_eq!(doc, Some(json!({ "a": 5, "b": 2 })));
}
