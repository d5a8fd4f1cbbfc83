//! # Target Genotype Matrix
//!
//! Unphased diploid genotypes over the typed marker positions. Entries are
//! allele dosages in {0, 1, 2} with 255 as the missing sentinel; anything
//! else is rejected at ingestion.

use std::sync::Arc;

use ndarray::Array2;

use crate::data::haplotype::{SampleIdx, Samples};
use crate::error::{RemiError, Result};

/// Missing-genotype sentinel
pub const MISSING: u8 = 255;

/// Unphased target genotypes (typed markers x samples)
#[derive(Clone, Debug)]
pub struct TargetGenotypes {
    /// Sorted typed marker positions
    positions: Vec<u32>,
    /// Genotype dosages, one row per typed marker
    geno: Array2<u8>,
    /// Sample metadata
    samples: Arc<Samples>,
}

impl TargetGenotypes {
    /// Create a target matrix, validating positions and genotype values
    pub fn new(positions: Vec<u32>, geno: Array2<u8>, samples: Arc<Samples>) -> Result<Self> {
        let (n_markers, n_samples) = geno.dim();

        if positions.len() != n_markers {
            return Err(RemiError::invalid_data(format!(
                "{} positions for {} genotype rows",
                positions.len(),
                n_markers
            )));
        }
        if n_samples != samples.len() {
            return Err(RemiError::invalid_data(format!(
                "{} genotype columns for {} samples",
                n_samples,
                samples.len()
            )));
        }
        if !positions.windows(2).all(|w| w[0] < w[1]) {
            return Err(RemiError::invalid_data(
                "target positions must be strictly increasing",
            ));
        }

        for ((marker, sample), &value) in geno.indexed_iter() {
            if value > 2 && value != MISSING {
                return Err(RemiError::InvalidGenotype {
                    marker,
                    sample,
                    value,
                });
            }
        }

        Ok(Self {
            positions,
            geno,
            samples,
        })
    }

    /// Number of typed markers
    pub fn n_markers(&self) -> usize {
        self.positions.len()
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Sorted typed marker positions
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Sample metadata
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Sample metadata handle
    pub fn samples_arc(&self) -> Arc<Samples> {
        Arc::clone(&self.samples)
    }

    /// Genotype dosage at (typed marker row, sample); 255 = missing
    #[inline]
    pub fn genotype(&self, marker: usize, sample: SampleIdx) -> u8 {
        self.geno[[marker, sample.as_usize()]]
    }

    /// The raw genotype matrix
    pub fn matrix(&self) -> &Array2<u8> {
        &self.geno
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn samples(n: usize) -> Arc<Samples> {
        Arc::new(Samples::from_ids(
            (0..n).map(|i| format!("S{i}")).collect(),
        ))
    }

    #[test]
    fn test_accepts_valid_entries() {
        let geno = array![[0u8, 1], [2, MISSING]];
        let target = TargetGenotypes::new(vec![100, 200], geno, samples(2)).unwrap();
        assert_eq!(target.n_markers(), 2);
        assert_eq!(target.genotype(1, SampleIdx::new(1)), MISSING);
    }

    #[test]
    fn test_rejects_invalid_genotype() {
        let geno = array![[0u8, 3]];
        let err = TargetGenotypes::new(vec![100], geno, samples(2)).unwrap_err();
        match err {
            RemiError::InvalidGenotype {
                marker,
                sample,
                value,
            } => {
                assert_eq!((marker, sample, value), (0, 1, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_unsorted_positions() {
        let geno = array![[0u8], [1]];
        assert!(TargetGenotypes::new(vec![200, 100], geno, samples(1)).is_err());
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let geno = array![[0u8, 1]];
        assert!(TargetGenotypes::new(vec![100, 200], geno, samples(2)).is_err());
    }
}
