//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.
//!
//! Two of the kinds below (`PositionMismatch`, `InsufficientTypedMarkers`)
//! are recoverable during compute: the pipeline degrades gracefully and
//! reports them as counts in the run summary. They are still real error
//! values so that ingestion and configuration code can raise them when the
//! degraded path is not available (e.g. no window has enough typed markers).

use thiserror::Error;

/// Main error type for Remi operations
#[derive(Error, Debug)]
pub enum RemiError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A window with zero typed markers or zero haplotypes
    #[error("empty window: {message}")]
    EmptyWindow { message: String },

    /// A non-missing target genotype outside {0, 1, 2}
    #[error("invalid genotype value {value} at marker {marker}, sample {sample}")]
    InvalidGenotype {
        marker: usize,
        sample: usize,
        value: u8,
    },

    /// A typed position is absent from the reference panel
    #[error("position mismatch: {message}")]
    PositionMismatch { message: String },

    /// NaN or infinity observed inside the compute kernel
    #[error("numerical anomaly: {message}")]
    NumericalAnomaly { message: String },

    /// A window has fewer typed markers than `min_typed_snps`
    #[error("insufficient typed markers: {message}")]
    InsufficientTypedMarkers { message: String },

    /// A breakpoint position fell outside its two-window span
    #[error("breakpoint invariant violated: {message}")]
    BreakpointInvariantViolation { message: String },

    /// Invalid data errors (dimension mismatch, positions out of order)
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration errors (invalid options)
    #[error("configuration error: {message}")]
    Config { message: String },
}

/// Type alias for Results using RemiError
pub type Result<T> = std::result::Result<T, RemiError>;

impl RemiError {
    /// Create an empty-window error
    pub fn empty_window(message: impl Into<String>) -> Self {
        Self::EmptyWindow {
            message: message.into(),
        }
    }

    /// Create a position-mismatch error
    pub fn position_mismatch(message: impl Into<String>) -> Self {
        Self::PositionMismatch {
            message: message.into(),
        }
    }

    /// Create a numerical-anomaly error
    pub fn numerical_anomaly(message: impl Into<String>) -> Self {
        Self::NumericalAnomaly {
            message: message.into(),
        }
    }

    /// Create an insufficient-typed-markers error
    pub fn insufficient_typed(message: impl Into<String>) -> Self {
        Self::InsufficientTypedMarkers {
            message: message.into(),
        }
    }

    /// Create a breakpoint-invariant error
    pub fn breakpoint_invariant(message: impl Into<String>) -> Self {
        Self::BreakpointInvariantViolation {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
