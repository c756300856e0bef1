// models/src/errors.rs

pub use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrectaError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("An internal error occurred: {0}")]
    InternalError(String),
}

impl PrectaError {
    pub fn not_found(what: impl Into<String>) -> Self {
        PrectaError::NotFound(what.into())
    }

    pub fn forbidden(why: impl Into<String>) -> Self {
        PrectaError::Forbidden(why.into())
    }

    pub fn conflict(why: impl Into<String>) -> Self {
        PrectaError::Conflict(why.into())
    }

    pub fn invalid(why: impl Into<String>) -> Self {
        PrectaError::Validation(ValidationError::InvalidValue(why.into()))
    }
}

impl From<serde_json::Error> for PrectaError {
    fn from(err: serde_json::Error) -> Self {
        PrectaError::InternalError(format!("JSON processing error: {}", err))
    }
}

/// A validation error raised at the request boundary or by a business rule.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A free-form rule violation; the message is shown to the user as-is.
    #[error("{0}")]
    InvalidValue(String),
    /// An identifier is malformed.
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    /// An identifier has an invalid length.
    #[error("identifier has invalid length")]
    InvalidIdentifierLength,
    /// An enumerated field received a value outside its set.
    #[error("invalid {field}: '{value}'")]
    InvalidEnumValue { field: &'static str, value: String },
    /// A required field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// An invalid date format was provided.
    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),
}

/// A type alias for a `Result` that returns a `PrectaError` on failure.
pub type PrectaResult<T> = Result<T, PrectaError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
