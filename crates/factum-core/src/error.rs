use thiserror::Error;

/// Errors that can occur in factum-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed or non-tabular input to materialization.
    #[error("Invalid tabular input: {0}")]
    InvalidInput(String),
    /// An object value outside {string, int, float}.
    #[error("Unsupported literal type under predicate '{predicate}': {value}")]
    UnsupportedLiteral {
        /// Predicate the offending cell was found under.
        predicate: String,
        /// Display form of the offending value.
        value: String,
    },
}

/// Result type alias for factum-core.
pub type Result<T> = std::result::Result<T, Error>;
