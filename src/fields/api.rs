use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Map;

use crate::database::{Database, DatabaseError};
use crate::fields::error::{FieldAccessError, FieldResult};

/// Reads the value stored at `path`.
///
/// Returns `Ok(None)` when nothing is stored there.
pub async fn get_field_value<T>(database: &Database, path: &str) -> FieldResult<Option<T>>
where
    T: DeserializeOwned,
{
    let read_error = |source: DatabaseError| FieldAccessError::Read {
        path: path.to_string(),
        source,
    };

    let snapshot = database
        .reference(path)
        .map_err(read_error)?
        .get()
        .await
        .map_err(read_error)?;
    if !snapshot.exists() {
        return Ok(None);
    }

    serde_json::from_value(snapshot.into_value())
        .map(Some)
        .map_err(|source| FieldAccessError::Decode {
            path: path.to_string(),
            source,
        })
}

/// Sets `field` under `path` to `value`, leaving the other children of `path` untouched.
///
/// `field` may itself be a slash-delimited relative path.
pub async fn update_field_value<T>(
    database: &Database,
    path: &str,
    field: &str,
    value: T,
) -> FieldResult<()>
where
    T: Serialize,
{
    let value = serde_json::to_value(value).map_err(|source| FieldAccessError::Encode {
        path: path.to_string(),
        field: field.to_string(),
        source,
    })?;
    let update_error = |source: DatabaseError| FieldAccessError::Update {
        path: path.to_string(),
        field: field.to_string(),
        source,
    };

    let mut payload = Map::new();
    payload.insert(field.to_string(), value);

    database
        .reference(path)
        .map_err(update_error)?
        .update(payload)
        .await
        .map_err(update_error)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
    use crate::database::get_database;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn database() -> Arc<Database> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let settings = FirebaseAppSettings {
            name: Some(format!("fields-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        };
        let options = FirebaseOptions {
            project_id: Some("fields".into()),
            ..Default::default()
        };
        get_database(Some(initialize_app(options, Some(settings)).unwrap())).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        name: String,
        score: u32,
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_values_are_none() {
        let database = database();
        let value: Option<String> = get_field_value(&database, "nothing/here").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn updates_merge_into_existing_children() {
        let database = database();
        update_field_value(&database, "users/ada", "name", "Ada").await.unwrap();
        update_field_value(&database, "users/ada", "score", 10).await.unwrap();

        let profile: Option<Profile> = get_field_value(&database, "users/ada").await.unwrap();
        assert_eq!(
            profile,
            Some(Profile {
                name: "Ada".into(),
                score: 10
            })
        );

        let score: Option<u32> = get_field_value(&database, "users/ada/score").await.unwrap();
        assert_eq!(score, Some(10));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shape_mismatch_is_a_decode_error() {
        let database = database();
        update_field_value(&database, "counters", "visits", json!("many")).await.unwrap();
        let err = get_field_value::<u64>(&database, "counters/visits")
            .await
            .unwrap_err();
        assert!(matches!(err, FieldAccessError::Decode { .. }));
        assert_eq!(err.path(), "counters/visits");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_paths_keep_the_database_error() {
        let database = database();
        let err = update_field_value(&database, "users", "bad#field", 1)
            .await
            .unwrap_err();
        let source = err.database_error().unwrap();
        assert_eq!(source.code_str(), "database/invalid-argument");
        assert!(err.to_string().contains(&source.to_string()));
        assert!(std::error::Error::source(&err).is_some());
    }
}
