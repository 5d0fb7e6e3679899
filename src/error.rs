//! Error types raised while configuring and registering authorization

/// Registration-time error type.
///
/// These are fatal: they surface from builders and `register` calls before any
/// request or message is processed. Per-request failures use
/// [`AuthError`](crate::auth::AuthError) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Handler already registered: {0}")]
    DuplicateHandler(String),
}

pub type Result<T> = std::result::Result<T, Error>;
