use thiserror::Error;

/// Main error type for ModelGraph
#[derive(Error, Debug)]
pub enum ModelGraphError {
    /// Invalid builder or file configuration (e.g. blacklist and whitelist both set)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A schema lookup failed while traversing; aborts the whole build
    #[error("Failed to fetch fields of model '{model}': {source}")]
    Fetch {
        model: String,
        #[source]
        source: SchemaError,
    },

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse errors (schema documents)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rendering errors
    #[error("Render error: {0}")]
    Render(String),
}

/// Errors raised by a schema provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The provider does not know the requested model
    #[error("Model not found: {0}")]
    NotFound(String),

    /// A field descriptor could not be interpreted
    #[error("Invalid field '{field}' on model '{model}': {reason}")]
    Invalid {
        model: String,
        field: String,
        reason: String,
    },

    /// The provider could not be reached or answered with garbage
    #[error("Schema provider unavailable: {0}")]
    Unavailable(String),
}

/// Convenient Result type using ModelGraphError
pub type Result<T> = std::result::Result<T, ModelGraphError>;
