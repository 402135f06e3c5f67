use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Attempt store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session metadata is malformed: {0}")]
    Malformed(String),

    #[error("Failed to serialize session metadata: {0}")]
    Serialization(String),

    #[error("Failed to write session cookie: {0}")]
    CookieWrite(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid session configuration: {0}")]
    InvalidSession(String),

    #[error("Invalid route table: {0}")]
    InvalidRoute(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_cookie_write_error(&self) -> bool {
        matches!(self, Error::Session(SessionError::CookieWrite(_)))
    }
}
