pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error raised by the driver while closing a connection
    #[error("failed to close connection: {0}")]
    CloseFailed(String),
    /// Error raised by the driver while opening a connection
    #[error("failed to connect: {0}")]
    ConnectionFailed(String),
    /// Error when a driver for an identifier is not found
    #[error("driver not found for: {0}")]
    DriverNotFound(String),
    /// Error parsing a URL
    #[error("{0}")]
    InvalidUrl(String),
    /// IO error
    #[error("{0}")]
    IoError(String),
    /// A statement was issued without an open connection
    #[error("not connected")]
    NotConnected,
    /// The number of bound parameters does not match the statement placeholders
    #[error("statement expects {expected} parameter(s) but {actual} were bound")]
    ParameterCount { expected: usize, actual: usize },
    /// Error raised by the driver while executing a statement
    #[error("query failed: {0}")]
    Query(String),
    /// Error when a column type is not supported
    #[error("column type [{column_type}] is not supported for column [{column_name}]")]
    UnsupportedColumnType {
        column_name: String,
        column_type: String,
    },
}

/// Converts a [`std::io::Error`] into an [`IoError`](Error::IoError)
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error.to_string())
    }
}

/// Convert [`url::ParseError`] to [`InvalidUrl`](Error::InvalidUrl)
impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::InvalidUrl(error.to_string())
    }
}
