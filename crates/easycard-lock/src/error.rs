//! Error types

/// Screen lock errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Persistent store error
    #[error("Storage error: {0}")]
    Storage(#[from] easycard_storage_sqlite::Error),

    /// Passcode does not meet the format requirements
    #[error("Invalid passcode: {0}")]
    InvalidPasscode(String),

    /// Digest or key handling error
    #[error("Security error: {0}")]
    Security(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Biometric credential record error
    #[error("Biometric error: {0}")]
    Biometric(String),

    /// Operation not allowed in the current lock state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
