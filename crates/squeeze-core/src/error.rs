//! Error types for Squeeze

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Squeeze
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error, usually raised by the downstream sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be decoded as UTF-8
    #[error("Invalid character data: {0}")]
    Encoding(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A compression stage could not process its input
    #[error("{stage} compression failed: {message}")]
    Minify {
        /// Stage name (html, css, js)
        stage: &'static str,
        /// Error message
        message: String,
    },

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                StatusCode::GATEWAY_TIMEOUT
            }
            Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a compression stage error
    pub fn minify(stage: &'static str, message: impl Into<String>) -> Self {
        Error::Minify {
            stage,
            message: message.into(),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::Encoding(msg) => std::io::Error::new(std::io::ErrorKind::InvalidData, msg),
            other => std::io::Error::other(other.to_string()),
        }
    }
}
