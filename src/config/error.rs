use std::fmt;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment tag is not a key of the registry.
    UnknownEnvironment {
        environment: String,
        known: Vec<String>,
    },
    /// A registry entry does not define a single option.
    EmptyOptions { environment: String },
    /// The registry source could not be read or parsed.
    InvalidSource { message: String },
}

impl ConfigError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ConfigError::UnknownEnvironment { .. } => "config/unknown-environment",
            ConfigError::EmptyOptions { .. } => "config/empty-options",
            ConfigError::InvalidSource { .. } => "config/invalid-source",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownEnvironment { environment, known } => write!(
                f,
                "Unknown environment '{environment}' (known: {}) ({})",
                known.join(", "),
                self.code_str()
            ),
            ConfigError::EmptyOptions { environment } => write!(
                f,
                "Environment '{environment}' does not define any Firebase option ({})",
                self.code_str()
            ),
            ConfigError::InvalidSource { message } => {
                write!(f, "{message} ({})", self.code_str())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
