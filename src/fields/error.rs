use std::fmt;

use crate::database::DatabaseError;

pub type FieldResult<T> = Result<T, FieldAccessError>;

/// Failure of a field read or update. Every variant keeps the underlying error as its
/// [`source`](std::error::Error::source) and repeats its message.
#[derive(Debug)]
pub enum FieldAccessError {
    Read {
        path: String,
        source: DatabaseError,
    },
    Update {
        path: String,
        field: String,
        source: DatabaseError,
    },
    /// The stored value does not have the requested shape.
    Decode {
        path: String,
        source: serde_json::Error,
    },
    /// The value could not be turned into JSON.
    Encode {
        path: String,
        field: String,
        source: serde_json::Error,
    },
}

impl FieldAccessError {
    pub fn path(&self) -> &str {
        match self {
            FieldAccessError::Read { path, .. }
            | FieldAccessError::Update { path, .. }
            | FieldAccessError::Decode { path, .. }
            | FieldAccessError::Encode { path, .. } => path,
        }
    }

    /// The database error behind a read or update failure.
    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self {
            FieldAccessError::Read { source, .. } | FieldAccessError::Update { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldAccessError::Read { path, source } => {
                write!(f, "Failed to read '{path}': {source}")
            }
            FieldAccessError::Update {
                path,
                field,
                source,
            } => write!(f, "Failed to update '{field}' at '{path}': {source}"),
            FieldAccessError::Decode { path, source } => {
                write!(f, "Unexpected value at '{path}': {source}")
            }
            FieldAccessError::Encode {
                path,
                field,
                source,
            } => write!(f, "Cannot encode '{field}' for '{path}': {source}"),
        }
    }
}

impl std::error::Error for FieldAccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FieldAccessError::Read { source, .. } | FieldAccessError::Update { source, .. } => {
                Some(source)
            }
            FieldAccessError::Decode { source, .. } | FieldAccessError::Encode { source, .. } => {
                Some(source)
            }
        }
    }
}
