//! # Reference Haplotype Panel
//!
//! Fully-phased reference haplotypes, bit-packed at one bit per allele, plus
//! the per-window view the pair search runs on: each window restricts the
//! panel to its typed markers, de-duplicates the haplotype columns and
//! materialises the distinct columns as a dense float matrix.
//!
//! Building the windows from an in-memory panel is a convenience for callers
//! and tests; a pre-windowed panel produced elsewhere can be handed over
//! window by window through the same types.

use std::collections::HashMap;
use std::ops::Range;

use bitvec::prelude::*;
use ndarray::Array2;

use crate::data::haplotype::HapIdx;
use crate::error::{RemiError, Result};

/// Bit-packed phased reference panel (markers x haplotypes)
#[derive(Clone, Debug)]
pub struct ReferencePanel {
    /// Sorted reference marker positions
    positions: Vec<u32>,
    /// Allele bits, marker-major: bit `marker * n_haplotypes + hap`
    alleles: BitVec<u64, Lsb0>,
    /// Number of reference haplotypes
    n_haplotypes: usize,
}

impl ReferencePanel {
    /// Create a panel from a per-(marker, haplotype) allele closure
    pub fn from_fn<F>(positions: Vec<u32>, n_haplotypes: usize, mut allele: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> u8,
    {
        let n_markers = positions.len();
        if n_markers == 0 || n_haplotypes == 0 {
            return Err(RemiError::empty_window(format!(
                "reference panel has {n_markers} markers and {n_haplotypes} haplotypes"
            )));
        }
        if !positions.windows(2).all(|w| w[0] < w[1]) {
            return Err(RemiError::invalid_data(
                "reference positions must be strictly increasing",
            ));
        }

        let mut alleles = bitvec![u64, Lsb0; 0; n_markers * n_haplotypes];
        for marker in 0..n_markers {
            let base = marker * n_haplotypes;
            for hap in 0..n_haplotypes {
                match allele(marker, hap) {
                    0 => {}
                    1 => alleles.set(base + hap, true),
                    other => {
                        return Err(RemiError::invalid_data(format!(
                            "reference allele {other} at marker {marker}, haplotype {hap} \
                             (panel must be biallelic 0/1)"
                        )))
                    }
                }
            }
        }

        Ok(Self {
            positions,
            alleles,
            n_haplotypes,
        })
    }

    /// Number of reference markers
    pub fn n_markers(&self) -> usize {
        self.positions.len()
    }

    /// Number of reference haplotypes
    pub fn n_haplotypes(&self) -> usize {
        self.n_haplotypes
    }

    /// Sorted reference marker positions
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Allele (0/1) at a reference marker for a full-panel haplotype
    #[inline]
    pub fn allele(&self, marker: usize, hap: HapIdx) -> u8 {
        self.alleles[marker * self.n_haplotypes + hap.as_usize()] as u8
    }

    /// Split the typed markers into fixed-width windows and de-duplicate
    /// each window's haplotype columns.
    ///
    /// `typed_to_ref` maps typed marker index to reference marker index
    /// (strictly increasing, from [`PositionAlignment`]). The last window
    /// absorbs the remainder. Window `g`'s reference range starts at its
    /// first typed marker (window 0 starts at reference marker 0) and runs
    /// to the next window's start (the last runs to the end of the panel).
    ///
    /// [`PositionAlignment`]: crate::data::PositionAlignment
    pub fn build_windows(&self, typed_to_ref: &[usize], width: usize) -> Result<Vec<RefWindow>> {
        let n_typed = typed_to_ref.len();
        if n_typed == 0 {
            return Err(RemiError::empty_window("no typed markers to window"));
        }
        if width < 2 {
            return Err(RemiError::config("window width must be at least 2 markers"));
        }

        let n_windows = (n_typed / width).max(1);
        let mut windows = Vec::with_capacity(n_windows);
        for g in 0..n_windows {
            let typed_start = g * width;
            let typed_end = if g + 1 == n_windows {
                n_typed
            } else {
                (g + 1) * width
            };

            let ref_start = if g == 0 { 0 } else { typed_to_ref[typed_start] };
            let ref_end = if g + 1 == n_windows {
                self.n_markers()
            } else {
                typed_to_ref[typed_end]
            };

            windows.push(self.build_window(
                g,
                typed_start..typed_end,
                ref_start..ref_end,
                &typed_to_ref[typed_start..typed_end],
            ));
        }

        Ok(windows)
    }

    /// De-duplicate one window's haplotype columns over its typed rows
    fn build_window(
        &self,
        index: usize,
        typed_range: Range<usize>,
        ref_range: Range<usize>,
        ref_rows: &[usize],
    ) -> RefWindow {
        let p = ref_rows.len();
        let d_full = self.n_haplotypes;
        let key_words = (p + 63) / 64;

        // First-occurrence order keys the unique column indices, so the
        // de-duplicated ordering is deterministic given the panel ordering.
        let mut seen: HashMap<Vec<u64>, u32> = HashMap::new();
        let mut hap_to_unique = vec![0u32; d_full];
        let mut unique_to_haps: Vec<Vec<HapIdx>> = Vec::new();
        let mut representatives: Vec<usize> = Vec::new();

        let mut key = vec![0u64; key_words];
        for hap in 0..d_full {
            key.iter_mut().for_each(|w| *w = 0);
            for (u, &r) in ref_rows.iter().enumerate() {
                if self.alleles[r * d_full + hap] {
                    key[u / 64] |= 1u64 << (u % 64);
                }
            }
            let unique = *seen.entry(key.clone()).or_insert_with(|| {
                let id = unique_to_haps.len() as u32;
                unique_to_haps.push(Vec::new());
                representatives.push(hap);
                id
            });
            hap_to_unique[hap] = unique;
            unique_to_haps[unique as usize].push(HapIdx::new(hap as u32));
        }

        let mut unique = Array2::<f32>::zeros((p, representatives.len()));
        for (col, &hap) in representatives.iter().enumerate() {
            for (u, &r) in ref_rows.iter().enumerate() {
                unique[[u, col]] = self.alleles[r * d_full + hap] as u8 as f32;
            }
        }

        let alt_freq = ref_rows
            .iter()
            .map(|&r| {
                let ones = self.alleles[r * d_full..(r + 1) * d_full].count_ones();
                ones as f32 / d_full as f32
            })
            .collect();

        RefWindow {
            index,
            typed_range,
            ref_range,
            unique,
            hap_to_unique,
            unique_to_haps,
            alt_freq,
        }
    }
}

/// One processing window of the reference panel
#[derive(Clone, Debug)]
pub struct RefWindow {
    /// Window number (0-indexed)
    index: usize,
    /// Typed marker indices covered by this window
    typed_range: Range<usize>,
    /// Reference marker indices covered by this window
    ref_range: Range<usize>,
    /// Distinct haplotype columns over the typed rows (p x d)
    unique: Array2<f32>,
    /// Full-panel haplotype index -> unique column index
    hap_to_unique: Vec<u32>,
    /// Unique column index -> all full-panel haplotypes it represents,
    /// ascending
    unique_to_haps: Vec<Vec<HapIdx>>,
    /// Panel alt-allele frequency per typed row
    alt_freq: Vec<f32>,
}

impl RefWindow {
    /// Window number
    pub fn index(&self) -> usize {
        self.index
    }

    /// Typed marker indices covered by this window
    pub fn typed_range(&self) -> Range<usize> {
        self.typed_range.clone()
    }

    /// Reference marker indices covered by this window
    pub fn ref_range(&self) -> Range<usize> {
        self.ref_range.clone()
    }

    /// Number of typed markers in the window
    pub fn n_typed(&self) -> usize {
        self.typed_range.len()
    }

    /// Number of distinct haplotype columns
    pub fn n_unique(&self) -> usize {
        self.unique.ncols()
    }

    /// The distinct columns as a dense float matrix (p x d)
    pub fn unique(&self) -> &Array2<f32> {
        &self.unique
    }

    /// Unique column index for a full-panel haplotype
    #[inline]
    pub fn unique_of(&self, hap: HapIdx) -> u32 {
        self.hap_to_unique[hap.as_usize()]
    }

    /// All full-panel haplotypes represented by a unique column, ascending
    pub fn haps_for_unique(&self, unique: u32) -> &[HapIdx] {
        &self.unique_to_haps[unique as usize]
    }

    /// Panel alt-allele frequency per typed row
    pub fn alt_freq(&self) -> &[f32] {
        &self.alt_freq
    }
}
