//! Error types for witnesskb.
//!
//! All errors are strongly typed using thiserror. Verification itself never
//! errors — an undecidable report resolves to `pending` with a full
//! reasoning trace — so the error surface covers compilation, storage, and
//! runtime execution only.

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while compiling a (event, user) pair into atoms.
///
/// Compilation is all-or-nothing: on error nothing has been inserted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilationError {
    /// A required field was absent or empty.
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),
}

/// Errors raised by the runtime execution paths.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A worker-pool queue is at capacity.
    #[error("Execution queue full on {path} path (capacity: {capacity})")]
    QueueFull {
        /// The path whose queue is full.
        path: String,
        /// The configured queue capacity.
        capacity: usize,
    },

    /// A worker pool has shut down.
    #[error("Execution path {path} disconnected")]
    Disconnected {
        /// The disconnected path.
        path: String,
    },

    /// A bounded wait on a result elapsed.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        /// How long the caller waited.
        duration_ms: u64,
    },
}

/// Top-level error type for witnesskb.
#[derive(Debug, Error)]
pub enum WitnessError {
    /// Input failed fact compilation; nothing was inserted.
    #[error("Compilation error: {0}")]
    Compilation(#[from] CompilationError),

    /// The atom store reported a fault; never swallowed since a dropped
    /// insert would silently corrupt the audit trail.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A runtime execution fault.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// An admin action referenced an event the store has never admitted.
    #[error("Unknown event: {fact_ref}")]
    UnknownEvent {
        /// The event reference that matched no identity atom.
        fact_ref: String,
    },
}

impl WitnessError {
    /// Returns true if this is a compilation (caller) error.
    #[must_use]
    pub const fn is_compilation(&self) -> bool {
        matches!(self, Self::Compilation(_))
    }

    /// Returns true if this is a store error.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// Compilation errors won't change on retry; queue pressure and
    /// timeouts may clear.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Compilation(_) | Self::Store(_) | Self::UnknownEvent { .. } => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::QueueFull { .. } | ExecutionError::Timeout { .. }
            ),
        }
    }
}

/// Result type alias for witnesskb operations.
pub type WitnessResult<T> = Result<T, WitnessError>;
