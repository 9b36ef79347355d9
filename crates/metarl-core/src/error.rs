//! Error types for the meta-RL core library

use thiserror::Error;

/// Core error type for environment, task and sampling operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Action outside the declared action space
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Task lacks a field the environment variant requires
    #[error("Incomplete task for {env}: missing field `{field}`")]
    IncompleteTask {
        /// Environment variant that rejected the task
        env: String,
        /// Name of the missing field
        field: String,
    },

    /// Task field present but malformed
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// Abstract operation called without a concrete implementation
    #[error("{0} is not implemented by this sampler")]
    NotImplemented(&'static str),

    /// No environment registered under this name
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// Configuration or keyword arguments cannot produce a valid component
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation not legal in the current episode phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Failure reported by the physics engine
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// A sampling worker panicked or was cancelled
    #[error("Sampling worker failed: {0}")]
    Worker(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RLError {
    /// Shorthand for [`RLError::IncompleteTask`]
    pub fn incomplete_task(env: impl Into<String>, field: impl Into<String>) -> Self {
        Self::IncompleteTask {
            env: env.into(),
            field: field.into(),
        }
    }
}

/// Result type alias for meta-RL operations
pub type Result<T> = std::result::Result<T, RLError>;
