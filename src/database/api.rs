use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::app::{get_app, FirebaseApp};
use crate::database::backend::{select_backend, DatabaseBackend};
use crate::database::error::{invalid_argument, DatabaseResult};
use crate::database::path::{join_path, normalize_path};

pub(crate) const DATABASE_COMPONENT_NAME: &str = "database";

/// Handle to the Realtime Database of one app.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    app: FirebaseApp,
    backend: Arc<dyn DatabaseBackend>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("app", &self.inner.app.name())
            .field("backend", &"dynamic")
            .finish()
    }
}

impl Database {
    /// Creates a database for `app` with the backend chosen from its options.
    pub fn new(app: FirebaseApp) -> Self {
        let backend = select_backend(&app);
        Self::with_backend(app, backend)
    }

    pub fn with_backend(app: FirebaseApp, backend: Arc<dyn DatabaseBackend>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner { app, backend }),
        }
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.inner.app
    }

    pub fn reference(&self, path: &str) -> DatabaseResult<DatabaseReference> {
        Ok(DatabaseReference {
            database: self.clone(),
            path: normalize_path(path)?,
        })
    }

    pub fn root(&self) -> DatabaseReference {
        DatabaseReference {
            database: self.clone(),
            path: Vec::new(),
        }
    }

    fn backend(&self) -> &dyn DatabaseBackend {
        self.inner.backend.as_ref()
    }
}

/// A location in the database tree.
#[derive(Clone, Debug)]
pub struct DatabaseReference {
    database: Database,
    path: Vec<String>,
}

impl DatabaseReference {
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The last path segment, or `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// The absolute path, always starting with `/`.
    pub fn path(&self) -> String {
        join_path(&self.path)
    }

    pub fn child(&self, relative_path: &str) -> DatabaseResult<DatabaseReference> {
        let mut path = self.path.clone();
        path.extend(normalize_path(relative_path)?);
        Ok(DatabaseReference {
            database: self.database.clone(),
            path,
        })
    }

    pub fn parent(&self) -> Option<DatabaseReference> {
        let (_, parent) = self.path.split_last()?;
        Some(DatabaseReference {
            database: self.database.clone(),
            path: parent.to_vec(),
        })
    }

    pub fn root(&self) -> DatabaseReference {
        self.database.root()
    }

    /// Reads the current value; the snapshot reports `exists() == false` when nothing is stored.
    pub async fn get(&self) -> DatabaseResult<DataSnapshot> {
        let value = self.database.backend().get(&self.path).await?;
        Ok(DataSnapshot {
            reference: self.clone(),
            value,
        })
    }

    /// Replaces the value at this location. Writing `null` removes it.
    pub async fn set(&self, value: Value) -> DatabaseResult<()> {
        self.database.backend().set(&self.path, value).await
    }

    /// Writes each entry of `updates` at its (possibly nested, slash-delimited) child path,
    /// leaving every other child untouched.
    pub async fn update(&self, updates: Map<String, Value>) -> DatabaseResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut operations = Vec::with_capacity(updates.len());
        for (key, value) in updates {
            let relative = normalize_path(&key)?;
            if relative.is_empty() {
                return Err(invalid_argument(
                    "Database update path cannot reference the current location",
                ));
            }
            let mut segments = self.path.clone();
            segments.extend(relative);
            operations.push((segments, value));
        }

        self.database
            .backend()
            .update(&self.path, operations)
            .await
    }

    pub async fn remove(&self) -> DatabaseResult<()> {
        self.database.backend().delete(&self.path).await
    }
}

impl fmt::Display for DatabaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// The value read from a location at one point in time.
#[derive(Clone, Debug)]
pub struct DataSnapshot {
    reference: DatabaseReference,
    value: Value,
}

impl DataSnapshot {
    pub fn reference(&self) -> &DatabaseReference {
        &self.reference
    }

    pub fn key(&self) -> Option<&str> {
        self.reference.key()
    }

    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn child(&self, relative_path: &str) -> DatabaseResult<DataSnapshot> {
        let segments = normalize_path(relative_path)?;
        let value = segments
            .iter()
            .try_fold(&self.value, |current, segment| current.get(segment.as_str()))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(DataSnapshot {
            reference: self.reference.child(relative_path)?,
            value,
        })
    }
}

/// Returns the database handle of `app` (or of the default app), creating it on first use.
pub fn get_database(app: Option<FirebaseApp>) -> DatabaseResult<Arc<Database>> {
    let app = match app {
        Some(app) => app,
        None => get_app(None)?,
    };
    app.get_or_init_service(DATABASE_COMPONENT_NAME, |app| {
        Ok(Database::new(app.clone()))
    })
}
