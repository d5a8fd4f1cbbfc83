//! # Run Summary
//!
//! Per-stage wall-clock timings and graceful-degradation counters, returned
//! to the caller as plain scalars. Anything fancier (progress bars,
//! hierarchical profiles) belongs to the embedding application.

use std::time::Duration;

/// Wall-clock durations for the pipeline stages
#[derive(Clone, Copy, Debug, Default)]
pub struct StageTimings {
    /// Window stage: pair search + redundant expansion
    pub window_search: Duration,
    /// Sample stage: connector, breakpoint refinement, mosaic assembly
    pub phasing: Duration,
    /// Dense output assembly
    pub imputation: Duration,
    /// End-to-end
    pub total: Duration,
}

/// Scalar summary of one pipeline run
#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    pub timings: StageTimings,
    /// Windows processed
    pub n_windows: usize,
    /// Samples phased
    pub n_samples: usize,
    /// Usable typed markers
    pub n_typed: usize,
    /// Typed positions skipped for having no reference counterpart
    pub n_skipped_positions: usize,
    /// Windows that reused a neighbour's candidates for lack of typed
    /// markers
    pub n_thin_windows: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "windows: {} ({} thin), samples: {}, typed markers: {} ({} skipped)",
            self.n_windows,
            self.n_thin_windows,
            self.n_samples,
            self.n_typed,
            self.n_skipped_positions
        )?;
        write!(
            f,
            "search {:.3}s, phasing {:.3}s, imputation {:.3}s, total {:.3}s",
            self.timings.window_search.as_secs_f64(),
            self.timings.phasing.as_secs_f64(),
            self.timings.imputation.as_secs_f64(),
            self.timings.total.as_secs_f64()
        )
    }
}
