use thiserror::Error;

/// Custom Result type for database operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the database engine
///
/// All of these are value-level failures: the execution engine converts
/// them into structured failure results at statement granularity instead
/// of letting them cross the statement boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Missing/unknown/mistyped column or invalid coercion
    #[error("schema error: {0}")]
    Schema(String),
    /// Primary-key or unique collision
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Malformed SQL fragment
    #[error("parse error: {0}")]
    Parse(String),
    /// Unknown table or column
    #[error("lookup error: {0}")]
    Lookup(String),
    /// Persistence collaborator failure (serialization, file I/O)
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::num::ParseIntError> for Error {
    fn from(value: std::num::ParseIntError) -> Self {
        Error::Parse(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Storage(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Storage(value.to_string())
    }
}
