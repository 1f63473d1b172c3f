use std::fmt;
use std::io;

/// Errors raised by the schema compiler and its collaborators.
///
/// Structural problems found while validating entity definitions are *not*
/// reported through this type; they accumulate on each entity type's
/// `errors` list so that one broken definition cannot prevent the rest of
/// the set from loading.
#[derive(Debug, Clone)]
pub enum SchemaError {
    /// Entity type lookup failed.
    NotFound(String),
    /// A field type name could not be resolved against the registry.
    UnknownFieldType(String),
    /// Raw definition data could not be parsed or interpreted.
    InvalidData(String),
    /// Underlying file I/O failure.
    Io(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SchemaError::NotFound(msg) => write!(f, "Entity type not found: {}", msg),
            SchemaError::UnknownFieldType(msg) => write!(f, "Unknown field type: {}", msg),
            SchemaError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            SchemaError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<io::Error> for SchemaError {
    fn from(err: io::Error) -> Self {
        SchemaError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::InvalidData(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type SchemaResult<T> = Result<T, SchemaError>;
