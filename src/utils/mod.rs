//! # Utilities Module
//!
//! Cross-cutting helpers that don't belong in domain-specific modules.
//!
//! ## Sub-modules
//! - `threading`: rayon thread pool configuration
//! - `timing`: per-stage wall-clock summary
//! - `workspace`: pre-allocated buffers for zero-allocation hot paths

pub mod threading;
pub mod timing;
pub mod workspace;

pub use threading::build_thread_pool;
pub use timing::{RunSummary, StageTimings};
pub use workspace::Workspace;
