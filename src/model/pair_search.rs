//! # Optimal Haplotype-Pair Search
//!
//! For each sample, find the unordered pair of unique haplotype columns
//! `(j, k)`, `j <= k`, minimising `||x - h_j - h_k||^2` over a window's typed
//! markers. Expanding the square,
//!
//! ```text
//! ||x - h_j - h_k||^2 = ||x||^2 + (2 h_j'h_k + ||h_j||^2 + ||h_k||^2)
//!                               - 2 x'(h_j + h_k)
//! ```
//!
//! so a pair of dense products `M = H'H` and `N = 2 X'H` reduces the inner
//! loop to `M[j,k] - N[i,j] - N[i,k]`. The `||x||^2` term is independent of
//! the argmin and added back at the end.
//!
//! Ties break toward the first pair in enumeration order (outer `k`, inner
//! `j <= k`, strict-less comparison), which makes the result deterministic
//! given the column ordering.

use ndarray::{Array2, Axis};

use crate::data::target::MISSING;
use crate::error::{RemiError, Result};

/// Candidate pairs retained for the observed-only rescreen
const RESCREEN_CANDIDATES: usize = 10;

/// Per-sample optimal unique-column pairs for one window
#[derive(Clone, Debug, Default)]
pub struct PairSearchResult {
    /// First unique column per sample (`hap1[i] <= hap2[i]`)
    pub hap1: Vec<u32>,
    /// Second unique column per sample
    pub hap2: Vec<u32>,
    /// Squared reconstruction error per sample
    pub score: Vec<f32>,
}

/// Convert a window's genotype block to floats, keeping missing as NaN
pub fn window_genotypes<F>(p: usize, n: usize, genotype: F) -> Array2<f32>
where
    F: Fn(usize, usize) -> u8,
{
    Array2::from_shape_fn((p, n), |(r, i)| {
        let g = genotype(r, i);
        if g == MISSING {
            f32::NAN
        } else {
            f32::from(g)
        }
    })
}

/// Replace missing entries (NaN) with twice the row's observed alt-allele
/// frequency, i.e. the mean of the row's observed dosages. Rows with no
/// observed entry are filled with zero.
pub fn fill_missing(xw: &mut Array2<f32>) {
    for mut row in xw.rows_mut() {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for &v in row.iter() {
            if v.is_finite() {
                sum += v;
                count += 1;
            }
        }
        let fill = if count == 0 { 0.0 } else { sum / count as f32 };
        for v in row.iter_mut() {
            if !v.is_finite() {
                *v = fill;
            }
        }
    }
}

/// Validate pair-search inputs: non-degenerate shapes, finite values
fn validate(xw: &Array2<f32>, hw: &Array2<f32>) -> Result<()> {
    let (p, _n) = xw.dim();
    let (ph, d) = hw.dim();

    if p == 0 || d == 0 {
        return Err(RemiError::empty_window(format!(
            "pair search over {p} typed markers and {d} unique haplotypes"
        )));
    }
    if p != ph {
        return Err(RemiError::invalid_data(format!(
            "genotype window has {p} rows but haplotype window has {ph}"
        )));
    }
    if xw.iter().any(|v| !v.is_finite()) {
        return Err(RemiError::numerical_anomaly(
            "non-finite genotype entered the pair search",
        ));
    }
    if hw.iter().any(|v| !v.is_finite()) {
        return Err(RemiError::numerical_anomaly(
            "non-finite haplotype entered the pair search",
        ));
    }
    Ok(())
}

/// Validate inputs and compute the two dense products.
///
/// Returns `M` post-processed in place (off-diagonal `2M[j,k] + M[j,j] +
/// M[k,k]`, diagonal `4M[j,j]`) and `N = 2 X'H`.
fn grammians(xw: &Array2<f32>, hw: &Array2<f32>) -> Result<(Array2<f32>, Array2<f32>)> {
    validate(xw, hw)?;
    let mut m = hw.t().dot(hw);
    expand_gram(&mut m);
    let mut nm = xw.t().dot(hw);
    nm.mapv_inplace(|v| 2.0 * v);
    Ok((m, nm))
}

/// Rewrite a gram matrix `H'H` so entry `(j, k)` holds
/// `2 h_j'h_k + ||h_j||^2 + ||h_k||^2` (diagonal: `4||h_j||^2`).
/// Only the upper triangle is used afterwards.
fn expand_gram(m: &mut Array2<f32>) {
    let d = m.nrows();
    let diag: Vec<f32> = (0..d).map(|j| m[[j, j]]).collect();
    for k in 0..d {
        for j in 0..k {
            m[[j, k]] = 2.0 * m[[j, k]] + diag[j] + diag[k];
        }
        m[[k, k]] = 4.0 * diag[k];
    }
}

/// Squared norm of each genotype column (the `||x||^2` term)
fn column_norms(xw: &Array2<f32>) -> Vec<f32> {
    xw.axis_iter(Axis(1))
        .map(|col| col.iter().map(|v| v * v).sum())
        .collect()
}

/// Full `O(d^2 n)` pair search over a filled window.
///
/// `xw` is `p x n` with missing entries already filled ([`fill_missing`]);
/// `hw` is the window's `p x d` unique-column matrix.
pub fn haplopair(xw: &Array2<f32>, hw: &Array2<f32>) -> Result<PairSearchResult> {
    let (m, nm) = grammians(xw, hw)?;
    let n = xw.ncols();
    let d = hw.ncols();

    let mut best = vec![f32::INFINITY; n];
    let mut hap1 = vec![0u32; n];
    let mut hap2 = vec![0u32; n];

    for k in 0..d {
        for j in 0..=k {
            let mjk = m[[j, k]];
            for i in 0..n {
                let score = mjk - nm[[i, j]] - nm[[i, k]];
                if score < best[i] {
                    best[i] = score;
                    hap1[i] = j as u32;
                    hap2[i] = k as u32;
                }
            }
        }
    }

    for (b, sq) in best.iter_mut().zip(column_norms(xw)) {
        *b += sq;
    }

    Ok(PairSearchResult {
        hap1,
        hap2,
        score: best,
    })
}

/// Pair search with an observed-only rescreen.
///
/// The coarse search over the filled matrix `xw` retains the top
/// [`RESCREEN_CANDIDATES`] pairs per sample, which are then re-ranked on the
/// raw matrix `xw_raw` (missing as NaN) counting only observed markers.
/// The returned score is the observed-only squared error.
pub fn haplopair_rescreen(
    xw: &Array2<f32>,
    xw_raw: &Array2<f32>,
    hw: &Array2<f32>,
) -> Result<PairSearchResult> {
    let (m, nm) = grammians(xw, hw)?;
    let n = xw.ncols();
    let d = hw.ncols();

    // Bounded per-sample candidate lists, ascending by coarse score,
    // stable in enumeration order among equals.
    let mut candidates: Vec<Vec<(f32, u32, u32)>> =
        vec![Vec::with_capacity(RESCREEN_CANDIDATES + 1); n];

    for k in 0..d {
        for j in 0..=k {
            let mjk = m[[j, k]];
            for (i, cand) in candidates.iter_mut().enumerate() {
                let score = mjk - nm[[i, j]] - nm[[i, k]];
                if cand.len() == RESCREEN_CANDIDATES
                    && score >= cand[RESCREEN_CANDIDATES - 1].0
                {
                    continue;
                }
                let at = cand.partition_point(|c| c.0 <= score);
                cand.insert(at, (score, j as u32, k as u32));
                cand.truncate(RESCREEN_CANDIDATES);
            }
        }
    }

    let mut hap1 = vec![0u32; n];
    let mut hap2 = vec![0u32; n];
    let mut score = vec![f32::INFINITY; n];

    for (i, cand) in candidates.iter().enumerate() {
        for &(_, j, k) in cand {
            let err = observed_error(xw_raw, hw, i, j as usize, k as usize);
            if err < score[i] {
                score[i] = err;
                hap1[i] = j;
                hap2[i] = k;
            }
        }
    }

    Ok(PairSearchResult { hap1, hap2, score })
}

/// Squared error of `h_j + h_k` against sample `i`, observed markers only
fn observed_error(xw_raw: &Array2<f32>, hw: &Array2<f32>, i: usize, j: usize, k: usize) -> f32 {
    let mut acc = 0.0f32;
    for r in 0..xw_raw.nrows() {
        let x = xw_raw[[r, i]];
        if x.is_finite() {
            let diff = x - hw[[r, j]] - hw[[r, k]];
            acc += diff * diff;
        }
    }
    acc
}

/// Thinned pair search for wide windows (`d > max_haplotypes`).
///
/// Each sample keeps its `keep` highest-affinity columns, ranked by
/// `N[i, .]` (optionally computed against rows scaled by `weights`, the
/// inverse alt-allele frequencies), and the full search runs on that subset.
/// The result is a feasible pair, not necessarily the global optimum.
pub fn haplopair_thinned(
    xw: &Array2<f32>,
    hw: &Array2<f32>,
    keep: usize,
    weights: Option<&[f32]>,
) -> Result<PairSearchResult> {
    validate(xw, hw)?;
    // The full d x d gram is never formed here; each sample's subset gram
    // is small enough to recompute.
    let mut nm = xw.t().dot(hw);
    nm.mapv_inplace(|v| 2.0 * v);

    let (p, n) = xw.dim();
    let d = hw.ncols();
    let keep = keep.min(d).max(2).min(d);

    let rank = match weights {
        Some(w) => {
            if w.len() != p {
                return Err(RemiError::invalid_data(format!(
                    "{} thinning weights for {p} typed markers",
                    w.len()
                )));
            }
            let mut scaled = xw.clone();
            for (mut row, &wr) in scaled.rows_mut().into_iter().zip(w) {
                row.mapv_inplace(|v| v * wr);
            }
            scaled.t().dot(hw)
        }
        None => nm.clone(),
    };

    let norms = column_norms(xw);
    let mut hap1 = vec![0u32; n];
    let mut hap2 = vec![0u32; n];
    let mut score = vec![0.0f32; n];

    let mut order: Vec<usize> = Vec::with_capacity(d);
    for i in 0..n {
        order.clear();
        order.extend(0..d);
        // Highest affinity first; index order among equals for determinism.
        order.sort_by(|&a, &b| {
            rank[[i, b]]
                .partial_cmp(&rank[[i, a]])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        let mut subset: Vec<usize> = order[..keep].to_vec();
        subset.sort_unstable();

        let hsub = hw.select(Axis(1), &subset);
        let mut msub = hsub.t().dot(&hsub);
        expand_gram(&mut msub);

        let mut best = f32::INFINITY;
        let (mut bj, mut bk) = (0usize, 0usize);
        for k in 0..subset.len() {
            for j in 0..=k {
                let s = msub[[j, k]] - nm[[i, subset[j]]] - nm[[i, subset[k]]];
                if s < best {
                    best = s;
                    bj = j;
                    bk = k;
                }
            }
        }

        hap1[i] = subset[bj] as u32;
        hap2[i] = subset[bk] as u32;
        score[i] = best + norms[i];
    }

    Ok(PairSearchResult { hap1, hap2, score })
}
