//! Error types for fraudsim.
//!
//! Engine operations are total and never fail; errors only surface at the
//! edges of the crate: scenario validation, catalog loading, configuration
//! and the command transport of the playback runtime.

use thiserror::Error;

/// Validation errors for authored scenario data and configuration.
#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Scenario id cannot be empty")]
    EmptyScenarioId,

    #[error("Scenario '{scenario_id}' has no steps")]
    NoSteps {
        scenario_id: String,
    },

    #[error("Step at index {index} has an empty id")]
    EmptyStepId {
        index: usize,
    },

    #[error("Step id '{step_id}' appears more than once")]
    DuplicateStepId {
        step_id: String,
    },

    #[error("Unknown locale '{value}' (expected 'th' or 'en')")]
    UnknownLocale {
        value: String,
    },

    #[error("Speed {value} is invalid: {reason}")]
    InvalidSpeed {
        value: f64,
        reason: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors raised while loading scenario definitions.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse scenario data: {message}")]
    Parse {
        message: String,
    },

    #[error("Failed to read scenario file '{path}': {message}")]
    Io {
        path: String,
        message: String,
    },

    #[error("Scenario not found: {id}")]
    ScenarioNotFound {
        id: String,
    },

    #[error("Scenario '{scenario_id}' is invalid: {source}")]
    Invalid {
        scenario_id: String,
        #[source]
        source: ValidationError,
    },
}

/// Errors from the threaded playback runtime.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Playback worker disconnected ({channel})")]
    Disconnected {
        channel: String,
    },

    #[error("Command queue is full (capacity: {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("No reply within {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Failed to spawn playback worker: {message}")]
    Spawn {
        message: String,
    },
}

/// Top-level error type for fraudsim.
#[derive(Debug, Error)]
pub enum SimError {
    /// Bad scenario data or configuration.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Scenario loading failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The playback worker could not be reached.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl SimError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a catalog error.
    #[must_use]
    pub const fn is_catalog(&self) -> bool {
        matches!(self, Self::Catalog(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Catalog(_) => false,
            Self::Runtime(e) => matches!(e, RuntimeError::QueueFull { .. } | RuntimeError::Timeout { .. }),
        }
    }
}

/// Result type alias for fraudsim operations.
pub type SimResult<T> = Result<T, SimError>;
