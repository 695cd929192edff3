use thiserror::Error;

/// Errors that can occur in factum-kge.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV serialization error during embedding export.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Unparseable line in a serialized triple file.
    #[error("Corrupt graph file at line {line}: {content}")]
    CorruptGraphFile {
        /// 1-indexed line number.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// Unrecognized embedding-model configuration.
    #[error("Unknown model family: {0}")]
    UnknownModel(String),
    /// Entity identifier not found in the index or bundle.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),
    /// Operation not supported by the model or configuration.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Result type alias for factum-kge.
pub type Result<T> = std::result::Result<T, Error>;
