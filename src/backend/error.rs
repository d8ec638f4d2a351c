use std::fmt;

use crate::analytics::AnalyticsError;
use crate::app::AppError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::database::DatabaseError;

pub type BackendResult<T> = Result<T, BackendError>;

/// Initialization failure, keeping the error of the component that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    Config(ConfigError),
    App(AppError),
    Auth(AuthError),
    Database(DatabaseError),
    Analytics(AnalyticsError),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Config(err) => write!(f, "Configuration error: {err}"),
            BackendError::App(err) => write!(f, "App initialization failed: {err}"),
            BackendError::Auth(err) => write!(f, "Auth initialization failed: {err}"),
            BackendError::Database(err) => write!(f, "Database initialization failed: {err}"),
            BackendError::Analytics(err) => write!(f, "Analytics initialization failed: {err}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Config(err) => Some(err),
            BackendError::App(err) => Some(err),
            BackendError::Auth(err) => Some(err),
            BackendError::Database(err) => Some(err),
            BackendError::Analytics(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BackendError {
    fn from(err: ConfigError) -> Self {
        BackendError::Config(err)
    }
}

impl From<AppError> for BackendError {
    fn from(err: AppError) -> Self {
        BackendError::App(err)
    }
}

impl From<AuthError> for BackendError {
    fn from(err: AuthError) -> Self {
        BackendError::Auth(err)
    }
}

impl From<DatabaseError> for BackendError {
    fn from(err: DatabaseError) -> Self {
        BackendError::Database(err)
    }
}

impl From<AnalyticsError> for BackendError {
    fn from(err: AnalyticsError) -> Self {
        BackendError::Analytics(err)
    }
}
