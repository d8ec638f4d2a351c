//! # Config registry
//!
//! Maps an environment tag (`dev`, `prod`, or any key of a loaded registry) to the
//! [`FirebaseOptions`](crate::app::FirebaseOptions) used to initialize the backend. Lookups are
//! pure; an unknown tag is a configuration error that is expected to abort startup.
//!
//! ```
//! use firebase_app_shell::config::{ConfigRegistry, Environment};
//!
//! let registry = ConfigRegistry::builtin();
//! let options = registry.lookup(Environment::Dev).unwrap();
//! assert!(options.database_url.is_some());
//! assert!(registry.lookup("staging").is_err());
//! ```

mod error;
mod registry;

#[doc(inline)]
pub use error::{ConfigError, ConfigResult};

#[doc(inline)]
pub use registry::{ConfigRegistry, Environment, CONFIG_REGISTRY_ENV};
