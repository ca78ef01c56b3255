use thiserror::Error;

#[derive(Error, Debug)]
pub enum CspError {
    #[error("Unknown CSP directive: {0}")]
    UnknownDirective(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value for directive {directive}: {reason}")]
    InvalidValue { directive: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CspError {
    pub(crate) fn invalid_value(directive: &str, reason: impl Into<String>) -> Self {
        CspError::InvalidValue {
            directive: directive.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CspError>;
