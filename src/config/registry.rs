use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::app::FirebaseOptions;
use crate::config::error::{ConfigError, ConfigResult};
use crate::platform::environment::parse_config_source;

/// Environment variable holding a registry as inline JSON or as a path to a JSON file.
pub const CONFIG_REGISTRY_ENV: &str = "FIREBASE_CONFIG_REGISTRY";

/// The environments compiled into [`ConfigRegistry::builtin`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 2] = [Environment::Dev, Environment::Prod];

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }

    fn options(self) -> FirebaseOptions {
        match self {
            Environment::Dev => FirebaseOptions {
                api_key: Some("AIzaSy-app-shell-dev-placeholder".into()),
                auth_domain: Some("app-shell-dev.firebaseapp.com".into()),
                database_url: Some("https://app-shell-dev-default-rtdb.firebaseio.com".into()),
                project_id: Some("app-shell-dev".into()),
                storage_bucket: Some("app-shell-dev.appspot.com".into()),
                messaging_sender_id: Some("100000000001".into()),
                app_id: Some("1:100000000001:web:0000000000000001".into()),
                measurement_id: Some("G-DEV0000001".into()),
            },
            Environment::Prod => FirebaseOptions {
                api_key: Some("AIzaSy-app-shell-prod-placeholder".into()),
                auth_domain: Some("app-shell-prod.firebaseapp.com".into()),
                database_url: Some("https://app-shell-prod-default-rtdb.firebaseio.com".into()),
                project_id: Some("app-shell-prod".into()),
                storage_bucket: Some("app-shell-prod.appspot.com".into()),
                messaging_sender_id: Some("100000000002".into()),
                app_id: Some("1:100000000002:web:0000000000000002".into()),
                measurement_id: Some("G-PROD000002".into()),
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Environment::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                environment: s.to_string(),
                known: Environment::ALL.iter().map(|env| env.to_string()).collect(),
            })
    }
}

/// Static mapping from environment tag to connection configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigRegistry {
    entries: BTreeMap<String, FirebaseOptions>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `dev` and `prod` configurations shipped with the application.
    pub fn builtin() -> Self {
        let entries = Environment::ALL
            .into_iter()
            .map(|env| (env.as_str().to_string(), env.options()))
            .collect();
        Self { entries }
    }

    /// Parses a registry of the form `{ "<environment>": { "apiKey": ..., ... } }`.
    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|err| ConfigError::InvalidSource {
            message: format!("Invalid config registry JSON: {err}"),
        })?;
        Self::from_value(value)
    }

    /// Parses a registry given either as inline JSON or as a path to a JSON file.
    pub fn from_source(raw: &str) -> ConfigResult<Self> {
        let value = parse_config_source(raw).ok_or_else(|| ConfigError::InvalidSource {
            message: "Config registry source is neither a JSON object nor a readable JSON file"
                .to_string(),
        })?;
        Self::from_value(value)
    }

    /// Loads the registry named by `FIREBASE_CONFIG_REGISTRY`, or the built-in one when unset.
    pub fn from_env() -> ConfigResult<Self> {
        match env::var(CONFIG_REGISTRY_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_source(&raw),
            _ => Ok(Self::builtin()),
        }
    }

    fn from_value(value: Value) -> ConfigResult<Self> {
        let Value::Object(map) = value else {
            return Err(ConfigError::InvalidSource {
                message: "Config registry must be a JSON object keyed by environment".to_string(),
            });
        };

        let mut registry = Self::new();
        for (environment, raw_options) in map {
            let options: FirebaseOptions =
                serde_json::from_value(raw_options).map_err(|err| ConfigError::InvalidSource {
                    message: format!("Invalid options for environment '{environment}': {err}"),
                })?;
            registry.insert(environment, options)?;
        }
        Ok(registry)
    }

    /// Adds or replaces the configuration of one environment.
    pub fn insert(
        &mut self,
        environment: impl Into<String>,
        options: FirebaseOptions,
    ) -> ConfigResult<()> {
        let environment = environment.into();
        if !options.is_defined() {
            return Err(ConfigError::EmptyOptions { environment });
        }
        self.entries.insert(environment, options);
        Ok(())
    }

    /// Returns the configuration for `environment`.
    pub fn lookup(&self, environment: impl AsRef<str>) -> ConfigResult<FirebaseOptions> {
        let environment = environment.as_ref();
        self.entries
            .get(environment)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                environment: environment.to_string(),
                known: self.environments(),
            })
    }

    pub fn contains(&self, environment: impl AsRef<str>) -> bool {
        self.entries.contains_key(environment.as_ref())
    }

    pub fn environments(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
