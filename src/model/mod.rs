//! # Model Module
//!
//! The per-window and cross-window compute kernels of the imputation engine.
//!
//! ## Core Algorithms
//! - `pair_search`: per-window least-squares optimal haplotype pairs
//! - `redundancy`: unique-pair to full-panel pair expansion
//! - `connector`: cross-window pair selection (DP or set intersection)
//! - `breakpoint`: strand orientation and crossover localisation

pub mod breakpoint;
pub mod connector;
pub mod pair_search;
pub mod redundancy;

pub use breakpoint::{refine_transition, BreakpointDecision};
pub use connector::{connect_dp, connect_intersection, switch_cost};
pub use pair_search::{
    fill_missing, haplopair, haplopair_rescreen, haplopair_thinned, PairSearchResult,
};
pub use redundancy::{expand_bitsets, expand_pairs, MAX_REDUNDANT_PAIRS};
