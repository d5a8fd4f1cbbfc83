//! # Imputation Pipeline
//!
//! Orchestrates the mosaic workflow:
//! 1. Align typed positions onto the reference panel
//! 2. Split typed markers into fixed-width windows, de-duplicating columns
//! 3. Window stage (parallel over windows): optimal-pair search, then
//!    expansion to redundant full-panel pair sets
//! 4. Thin windows borrow a neighbouring window's candidates
//! 5. Sample stage (parallel over samples): cross-window connector,
//!    breakpoint refinement, mosaic assembly
//! 6. Dense output assembly: walk each mosaic and emit phased alleles
//!
//! The two stages are separated by a barrier; window results land in
//! disjoint per-window slots and each sample's mosaic is written by exactly
//! one thread, so the output is a deterministic function of the inputs and
//! configuration regardless of thread count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use bitvec::prelude::*;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info_span, instrument};

use crate::config::Config;
use crate::data::haplotype::{HapIdx, SampleIdx};
use crate::data::marker::PositionAlignment;
use crate::data::mosaic::{Mosaic, SamplePhase};
use crate::data::panel::{RefWindow, ReferencePanel};
use crate::data::target::{TargetGenotypes, MISSING};
use crate::error::{RemiError, Result};
use crate::model::breakpoint::refine_transition;
use crate::model::connector::{connect_dp, connect_intersection};
use crate::model::pair_search::{
    fill_missing, haplopair, haplopair_rescreen, haplopair_thinned, window_genotypes,
    PairSearchResult,
};
use crate::model::redundancy::{expand_bitsets, expand_pairs};
use crate::utils::threading::build_thread_pool;
use crate::utils::timing::{RunSummary, StageTimings};
use crate::utils::workspace::Workspace;

/// Largest typed-marker chunk that keeps all per-chunk state resident:
/// `(2/3) * memory_bits / (D + 32 N)` for `D` reference haplotypes at one
/// bit per entry and `N` samples at 32 bits per entry. Callers split their
/// input above this and run the pipeline per chunk.
pub fn max_chunk_typed_markers(
    memory_bytes: usize,
    n_ref_haplotypes: usize,
    n_samples: usize,
) -> usize {
    let per_marker_bits = n_ref_haplotypes + 32 * n_samples;
    if per_marker_bits == 0 {
        return 0;
    }
    memory_bytes.saturating_mul(8) / 3 * 2 / per_marker_bits
}

/// Per-window candidate sets, one entry per sample
#[derive(Clone, Debug)]
enum WindowSets {
    /// Redundant full-panel pairs (dynamic-programming mode)
    Pairs(Vec<Vec<(u32, u32)>>),
    /// One bit-set per strand (set-intersection mode)
    Bitsets(Vec<(BitVec<u64, Lsb0>, BitVec<u64, Lsb0>)>),
}

/// Result of one pipeline run
#[derive(Clone, Debug)]
pub struct ImputeOutput {
    /// Two-strand mosaic per sample
    pub phases: Vec<SamplePhase>,
    /// Phased strand-1 alleles, reference markers x samples (if `impute`)
    pub allele1: Option<Array2<u8>>,
    /// Phased strand-2 alleles (if `impute`)
    pub allele2: Option<Array2<u8>>,
    /// Diploid dosages; observed typed entries win unless `full_mosaic`
    /// (if `impute`)
    pub genotypes: Option<Array2<u8>>,
    /// Per-stage timings and degradation counters
    pub summary: RunSummary,
}

/// Phase result for one sample before the dense matrices are assembled
struct SampleResult {
    phase: SamplePhase,
    allele1: Option<Vec<u8>>,
    allele2: Option<Vec<u8>>,
}

/// Imputation pipeline
pub struct ImputationPipeline {
    config: Config,
}

impl ImputationPipeline {
    /// Create a pipeline, validating the configuration up front
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run phasing and imputation for every sample
    #[instrument(name = "imputation", skip_all)]
    pub fn run(
        &self,
        target: &TargetGenotypes,
        panel: &ReferencePanel,
    ) -> Result<ImputeOutput> {
        let pool = build_thread_pool(self.config.nthreads())?;
        pool.install(|| self.run_inner(target, panel))
    }

    fn run_inner(
        &self,
        target: &TargetGenotypes,
        panel: &ReferencePanel,
    ) -> Result<ImputeOutput> {
        let t_total = Instant::now();

        let align = PositionAlignment::new(target.positions(), panel.positions())?;
        let windows = panel.build_windows(align.typed_to_ref(), self.config.width)?;
        let n_samples = target.n_samples();

        debug!(
            n_typed = align.n_typed(),
            n_skipped = align.n_skipped(),
            n_windows = windows.len(),
            n_samples,
            "aligned target against reference panel"
        );

        // ---- Window stage: pair search + redundant expansion ----
        let t_search = Instant::now();
        let progress = AtomicUsize::new(0);
        let screened: Vec<Option<WindowSets>> = {
            let _span = info_span!("window_stage").entered();
            windows
                .par_iter()
                .map(|window| {
                    let sets = self.screen_window(window, target, &align, panel)?;
                    let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 100 == 0 {
                        debug!(done, total = windows.len(), "pair search progress");
                    }
                    Ok(sets)
                })
                .collect::<Result<_>>()?
        };
        let (sets, n_thin_windows) = fill_thin_windows(screened)?;
        let window_search = t_search.elapsed();

        // ---- Sample stage: connector + breakpoints + mosaic assembly ----
        let t_phase = Instant::now();
        let progress = AtomicUsize::new(0);
        let results: Vec<SampleResult> = {
            let _span = info_span!("sample_stage").entered();
            (0..n_samples)
                .into_par_iter()
                .map_init(Workspace::new, |ws, sample| {
                    let result =
                        self.phase_sample(sample, target, panel, &align, &windows, &sets, ws)?;
                    let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 100 == 0 {
                        debug!(done, total = n_samples, "phasing progress");
                    }
                    Ok(result)
                })
                .collect::<Result<_>>()?
        };
        let phasing = t_phase.elapsed();

        // ---- Dense output assembly ----
        let t_impute = Instant::now();
        let mut phases = Vec::with_capacity(n_samples);
        let (mut allele1, mut allele2) = if self.config.impute {
            let shape = (panel.n_markers(), n_samples);
            (
                Some(Array2::<u8>::zeros(shape)),
                Some(Array2::<u8>::zeros(shape)),
            )
        } else {
            (None, None)
        };

        for (i, result) in results.into_iter().enumerate() {
            if let (Some(a1), Some(col)) = (allele1.as_mut(), result.allele1) {
                a1.column_mut(i).iter_mut().zip(col).for_each(|(out, v)| *out = v);
            }
            if let (Some(a2), Some(col)) = (allele2.as_mut(), result.allele2) {
                a2.column_mut(i).iter_mut().zip(col).for_each(|(out, v)| *out = v);
            }
            phases.push(result.phase);
        }

        let genotypes = match (&allele1, &allele2) {
            (Some(a1), Some(a2)) => {
                let mut sums = a1 + a2;
                if !self.config.full_mosaic {
                    overlay_observed(&mut sums, target, &align);
                }
                Some(sums)
            }
            _ => None,
        };
        let imputation = t_impute.elapsed();

        let summary = RunSummary {
            timings: StageTimings {
                window_search,
                phasing,
                imputation,
                total: t_total.elapsed(),
            },
            n_windows: windows.len(),
            n_samples,
            n_typed: align.n_typed(),
            n_skipped_positions: align.n_skipped(),
            n_thin_windows,
        };
        debug!(%summary, "pipeline finished");

        Ok(ImputeOutput {
            phases,
            allele1,
            allele2,
            genotypes,
            summary,
        })
    }

    /// Window stage for one window: search optimal unique pairs for every
    /// sample, then expand them to full-panel candidate sets.
    ///
    /// Returns `None` for windows below `min_typed_snps`; those borrow a
    /// neighbour's candidates afterwards.
    fn screen_window(
        &self,
        window: &RefWindow,
        target: &TargetGenotypes,
        align: &PositionAlignment,
        panel: &ReferencePanel,
    ) -> Result<Option<WindowSets>> {
        let p = window.n_typed();
        if p < self.config.min_typed_snps {
            return Ok(None);
        }

        let n = target.n_samples();
        let typed_start = window.typed_range().start;
        let raw = window_genotypes(p, n, |r, i| {
            target.genotype(align.target_row(typed_start + r), SampleIdx::from(i))
        });
        let mut xw = raw.clone();
        fill_missing(&mut xw);

        let hw = window.unique();
        let d = window.n_unique();

        let found: PairSearchResult = if d > self.config.max_haplotypes {
            let weights: Option<Vec<f32>> = self.config.thinning_scale_allelefreq.then(|| {
                window
                    .alt_freq()
                    .iter()
                    .map(|&f| 1.0 / f.max(1e-6))
                    .collect()
            });
            haplopair_thinned(&xw, hw, self.config.thinning_keep(), weights.as_deref())?
        } else if self.config.rescreen {
            haplopair_rescreen(&xw, &raw, hw)?
        } else {
            haplopair(&xw, hw)?
        };

        let sets = if self.config.dynamic_programming {
            WindowSets::Pairs(
                (0..n)
                    .map(|i| expand_pairs(window, found.hap1[i], found.hap2[i]))
                    .collect(),
            )
        } else {
            WindowSets::Bitsets(
                (0..n)
                    .map(|i| {
                        expand_bitsets(
                            window,
                            found.hap1[i],
                            found.hap2[i],
                            panel.n_haplotypes(),
                        )
                    })
                    .collect(),
            )
        };
        Ok(Some(sets))
    }

    /// Sample stage for one sample: pick a pair per window, refine the
    /// transitions, assemble both mosaics and optionally impute the dense
    /// allele columns.
    #[allow(clippy::too_many_arguments)]
    fn phase_sample(
        &self,
        sample: usize,
        target: &TargetGenotypes,
        panel: &ReferencePanel,
        align: &PositionAlignment,
        windows: &[RefWindow],
        sets: &[WindowSets],
        ws: &mut Workspace,
    ) -> Result<SampleResult> {
        let sample_idx = SampleIdx::from(sample);

        let chosen: Vec<(u32, u32)> = if self.config.dynamic_programming {
            let candidates: Vec<&[(u32, u32)]> = sets
                .iter()
                .map(|s| match s {
                    WindowSets::Pairs(per_sample) => per_sample[sample].as_slice(),
                    WindowSets::Bitsets(_) => unreachable!("mode fixed at configuration"),
                })
                .collect();
            connect_dp(&candidates, Config::LAMBDA, ws)
        } else {
            let per_sample: Vec<(BitVec<u64, Lsb0>, BitVec<u64, Lsb0>)> = sets
                .iter()
                .map(|s| match s {
                    WindowSets::Bitsets(b) => b[sample].clone(),
                    WindowSets::Pairs(_) => unreachable!("mode fixed at configuration"),
                })
                .collect();
            connect_intersection(&per_sample)
        };

        let mut phase = SamplePhase::new();
        phase
            .strand1
            .push(0, 0, HapIdx::new(chosen[0].0));
        phase
            .strand2
            .push(0, 0, HapIdx::new(chosen[0].1));

        let mut prev = chosen[0];
        for g in 1..windows.len() {
            let span_start = windows[g - 1].typed_range().start;
            let span_end = windows[g].typed_range().end;
            let span_len = span_end - span_start;

            ws.load_span(span_len, |u| {
                target.genotype(align.target_row(span_start + u), sample_idx)
            });
            let h = |u: usize, hap: u32| {
                panel.allele(align.ref_index(span_start + u), HapIdx::new(hap))
            };

            let decision = refine_transition(&ws.span_geno, h, prev, chosen[g]);

            extend_strand(
                &mut phase.strand1,
                windows,
                align,
                g,
                span_start,
                span_len,
                prev.0,
                decision.pair.0,
                decision.bkpt.0,
            )?;
            extend_strand(
                &mut phase.strand2,
                windows,
                align,
                g,
                span_start,
                span_len,
                prev.1,
                decision.pair.1,
                decision.bkpt.1,
            )?;

            prev = decision.pair;
        }

        phase.collapse();

        let (allele1, allele2) = if self.config.impute {
            let (a1, a2) = impute_alleles(&phase, panel);
            (Some(a1), Some(a2))
        } else {
            (None, None)
        };

        Ok(SampleResult {
            phase,
            allele1,
            allele2,
        })
    }
}

/// Replace thin windows' missing candidate sets with a neighbour's:
/// the previous window's where one exists, otherwise the next usable one.
fn fill_thin_windows(
    mut screened: Vec<Option<WindowSets>>,
) -> Result<(Vec<WindowSets>, usize)> {
    let n_thin = screened.iter().filter(|s| s.is_none()).count();
    if n_thin == screened.len() {
        return Err(RemiError::insufficient_typed(
            "no window reaches min_typed_snps; decrease the threshold or widen windows",
        ));
    }

    // Backfill leading thin windows from the first usable one; every later
    // thin window borrows its predecessor.
    let first_usable = screened.iter().position(|s| s.is_some()).unwrap_or(0);
    for g in 0..first_usable {
        screened[g] = screened[first_usable].clone();
    }

    let mut filled: Vec<WindowSets> = Vec::with_capacity(screened.len());
    for (g, slot) in screened.into_iter().enumerate() {
        match slot {
            Some(sets) => filled.push(sets),
            None => {
                let prev = filled[g - 1].clone();
                filled.push(prev);
            }
        }
    }
    Ok((filled, n_thin))
}

/// Record window `g`'s segment(s) for one strand.
///
/// `bkpt` is the refinement offset into the two-window typed span starting
/// at typed marker `span_start`: `-1` keeps the incoming haplotype for the
/// whole window, `span_len` keeps the outgoing one, and anything between
/// places the crossover at a single typed marker, which may fall back into
/// window `g - 1`.
#[allow(clippy::too_many_arguments)]
fn extend_strand(
    mosaic: &mut Mosaic,
    windows: &[RefWindow],
    align: &PositionAlignment,
    g: usize,
    span_start: usize,
    span_len: usize,
    prev_hap: u32,
    cur_hap: u32,
    bkpt: i32,
) -> Result<()> {
    let window = &windows[g];
    let first_ref = window.ref_range().start as u32;

    if bkpt == -1 {
        mosaic.push(first_ref, g as u32, HapIdx::new(cur_hap));
        return Ok(());
    }

    let t = bkpt as usize;
    if bkpt < 0 || t > span_len {
        return Err(RemiError::breakpoint_invariant(format!(
            "offset {bkpt} outside the {span_len}-marker span before window {g}"
        )));
    }
    if t == span_len {
        // The outgoing haplotype still covers the entire window.
        mosaic.push(first_ref, g as u32, HapIdx::new(prev_hap));
        return Ok(());
    }

    let x_bkpt = align.ref_index(span_start + t);
    let prev_window = &windows[g - 1];
    if x_bkpt < prev_window.ref_range().start || x_bkpt >= window.ref_range().end {
        return Err(RemiError::breakpoint_invariant(format!(
            "breakpoint at reference marker {x_bkpt} escapes windows {} and {g}",
            g - 1
        )));
    }

    if x_bkpt as u32 >= first_ref {
        mosaic.push(first_ref, g as u32, HapIdx::new(prev_hap));
        mosaic.push(x_bkpt as u32, g as u32, HapIdx::new(cur_hap));
    } else {
        // The incoming haplotype took over before this window began:
        // rewrite the tail of window g - 1.
        mosaic.push(x_bkpt as u32, (g - 1) as u32, HapIdx::new(cur_hap));
        mosaic.push(first_ref, g as u32, HapIdx::new(cur_hap));
    }
    Ok(())
}

/// Walk both mosaics and read the phased alleles at every reference marker
fn impute_alleles(phase: &SamplePhase, panel: &ReferencePanel) -> (Vec<u8>, Vec<u8>) {
    let n_markers = panel.n_markers();
    let mut a1 = Vec::with_capacity(n_markers);
    let mut a2 = Vec::with_capacity(n_markers);
    for r in 0..n_markers {
        a1.push(panel.allele(r, phase.strand1.hap_at(r)));
        a2.push(panel.allele(r, phase.strand2.hap_at(r)));
    }
    (a1, a2)
}

/// Overwrite imputed dosages with the observed typed genotypes
fn overlay_observed(
    sums: &mut Array2<u8>,
    target: &TargetGenotypes,
    align: &PositionAlignment,
) {
    for u in 0..align.n_typed() {
        let row = align.target_row(u);
        let ref_row = align.ref_index(u);
        for i in 0..target.n_samples() {
            let observed = target.genotype(row, SampleIdx::from(i));
            if observed != MISSING {
                sums[[ref_row, i]] = observed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_chunk_formula() {
        // 2/3 of 3000 bits = 2000 bits per (D + 32N) = (4 + 32) = 36
        assert_eq!(max_chunk_typed_markers(375, 4, 1), 55);
        assert_eq!(max_chunk_typed_markers(0, 4, 1), 0);
        assert_eq!(max_chunk_typed_markers(100, 0, 0), 0);
    }

    #[test]
    fn test_fill_thin_windows_borrows_previous() {
        let a = WindowSets::Pairs(vec![vec![(0, 0)]]);
        let b = WindowSets::Pairs(vec![vec![(1, 1)]]);
        let (filled, n_thin) =
            fill_thin_windows(vec![None, Some(a), None, Some(b), None]).unwrap();
        let label = |s: &WindowSets| match s {
            WindowSets::Pairs(p) => p[0][0],
            _ => unreachable!(),
        };
        assert_eq!(n_thin, 3);
        // Leading thin window borrows the first usable one; trailing thin
        // windows borrow their predecessor.
        assert_eq!(label(&filled[0]), (0, 0));
        assert_eq!(label(&filled[2]), (0, 0));
        assert_eq!(label(&filled[4]), (1, 1));
    }

    #[test]
    fn test_fill_thin_windows_all_thin_is_fatal() {
        let err = fill_thin_windows(vec![None, None]).unwrap_err();
        assert!(matches!(err, RemiError::InsufficientTypedMarkers { .. }));
    }
}
