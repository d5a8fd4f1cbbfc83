//! # Data Module
//!
//! ## Role
//! In-memory representations of genomic data. This is the core "Model" layer.
//!
//! ## Design Philosophy: Data-Oriented Design
//! - **Structure of Arrays (SoA):** marker positions, genotype columns and
//!   haplotype bits are stored in flat arrays for cache-friendly iteration.
//! - **Zero-cost newtypes:** `HapIdx`, `SampleIdx` prevent index bugs at
//!   compile time with no runtime overhead.
//! - **Bit-packed reference:** the phased panel stores one bit per allele;
//!   windows materialise unique columns into dense floats on demand.
//!
//! ## Sub-modules
//! - `haplotype`: index types for samples and haplotypes
//! - `marker`: typed-to-reference position alignment
//! - `mosaic`: per-sample two-strand haplotype mosaics
//! - `panel`: pre-windowed reference haplotype panel
//! - `target`: unphased target genotype matrix

pub mod haplotype;
pub mod marker;
pub mod mosaic;
pub mod panel;
pub mod target;

pub use haplotype::{HapIdx, SampleIdx, Samples};
pub use marker::PositionAlignment;
pub use mosaic::{Mosaic, SamplePhase, Segment};
pub use panel::{ReferencePanel, RefWindow};
pub use target::{TargetGenotypes, MISSING};
