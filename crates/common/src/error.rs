//! Application errors reported by CTFBoard entry points
//!
//! Domain crates convert their own error enums into [`Error`]; binaries print
//! the stable [`Error::error_code`] and exit with [`Error::exit_code`].

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Permission denied: {0}")]
    Authorization(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller must repeat the request with explicit consent
    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Output encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Authorization(_) => "AUTHORIZATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::ConfirmationRequired(_) => "CONFIRMATION_REQUIRED",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit status. Caller mistakes get distinct codes so scripts can
    /// branch on them; every infrastructure failure exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Validation(_) => 2,
            Error::NotFound(_) => 3,
            Error::Conflict(_) => 4,
            Error::Authorization(_) => 5,
            Error::ConfirmationRequired(_) => 6,
            Error::Configuration(_) => 78,
            Error::Database(_) | Error::Serialization(_) | Error::Internal(_) => 1,
        }
    }

    /// Whether the failure was caused by the request rather than the system
    pub fn is_caller_error(&self) -> bool {
        (2..=6).contains(&self.exit_code())
    }
}
