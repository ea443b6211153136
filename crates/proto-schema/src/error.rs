use thiserror::Error;

/// Errors raised while compiling schemas or building the catalog.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema compilation failed: {0}")]
    Compilation(String),

    #[error("Schema registration failed: {0}")]
    Registration(String),

    #[error("Message type not found: {0}")]
    TypeNotFound(String),

    #[error("Message type '{name}' is ambiguous, candidates: {}", .candidates.join(", "))]
    AmbiguousType {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Failed to decode descriptor set: {0}")]
    DescriptorDecode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Whether the error means the requested name matched no single message,
    /// as opposed to a tooling or schema failure.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            SchemaError::TypeNotFound(_) | SchemaError::AmbiguousType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
