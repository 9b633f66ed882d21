//! Error types for Taxmail.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence-layer errors.
///
/// The thread resolver treats any `StoreError` from a lookup as "no match"
/// for that layer and moves on; only the persistence steps of the pipeline
/// propagate these.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Ingestion-pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
