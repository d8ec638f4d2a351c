//! # Realtime Database
//!
//! References, snapshots and single-shot reads and writes against the Realtime Database.
//!
//! The handle picks its storage from the app options: the REST API when a `database_url` is
//! configured (emulator URLs such as `http://127.0.0.1:9000/?ns=demo` work too), otherwise a
//! process-local in-memory tree with the same merge and delete semantics. Requests carry the
//! ID token of the user signed in through [`crate::auth`], if any.
//!
//! ```
//! use firebase_app_shell::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
//! use firebase_app_shell::database::get_database;
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let options = FirebaseOptions {
//!     project_id: Some("demo-project".into()),
//!     ..Default::default()
//! };
//! let settings = FirebaseAppSettings {
//!     name: Some("database-doc".into()),
//!     ..Default::default()
//! };
//! let app = initialize_app(options, Some(settings)).unwrap();
//! let database = get_database(Some(app)).unwrap();
//!
//! let messages = database.reference("/messages").unwrap();
//! messages.set(json!({ "greeting": "hello" })).await.unwrap();
//! assert_eq!(messages.get().await.unwrap().value(), &json!({ "greeting": "hello" }));
//! # });
//! ```
//!
//! Listeners, queries, transactions and offline persistence are not provided.

mod api;
mod backend;
pub mod error;
mod path;

#[doc(inline)]
pub use api::{get_database, DataSnapshot, Database, DatabaseReference};

#[doc(inline)]
pub use backend::{DatabaseBackend, InMemoryBackend, RestBackend};

#[doc(inline)]
pub use error::{DatabaseError, DatabaseErrorCode, DatabaseResult};
