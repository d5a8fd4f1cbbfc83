//! # Breakpoint Refinement
//!
//! Between two consecutive windows the connector hands over two unordered
//! haplotype pairs. This module resolves which strand continues which
//! haplotype and localises at most one crossover per strand to a single
//! typed marker inside the two-window span.
//!
//! Offsets are in `0..=L` over the span's typed markers: position `u` uses
//! the outgoing haplotype when `u < t` and the incoming one when `u >= t`,
//! so `t = 0` means the switch happened before the span and `t = L` means
//! the outgoing haplotype still covers the whole span. `-1` marks a strand
//! with no breakpoint at all.
//!
//! Error counts are maintained incrementally: the scan starts from "entire
//! span uses the incoming haplotype" and flips one marker at a time, so the
//! 1-d search is `O(L)` and the 2-d search `O(L^2)`. Missing genotypes
//! never contribute.

use crate::data::target::MISSING;

/// Outcome of refining one window transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreakpointDecision {
    /// The incoming pair, oriented to the strands of the previous pair
    pub pair: (u32, u32),
    /// Breakpoint offset per strand; `-1` = strand continues unbroken
    pub bkpt: (i32, i32),
    /// Observed-marker errors of the chosen outcome over the span
    pub errors: u32,
}

/// Resolve strand orientation and locate breakpoints.
///
/// `x` holds the sample's typed genotypes over the two-window span
/// (missing allowed); `h(u, hap)` yields the 0/1 reference allele at span
/// offset `u`. `prev` is strand-oriented from the previous transition,
/// `next` is the connector's unordered choice for the current window.
pub fn refine_transition<F>(
    x: &[u8],
    h: F,
    prev: (u32, u32),
    next: (u32, u32),
) -> BreakpointDecision
where
    F: Fn(usize, u32) -> u8,
{
    let (i, j) = prev;
    let (k, l) = next;

    // Same pair as a set: both strands continue.
    if (i, j) == (k, l) || (i, j) == (l, k) {
        return BreakpointDecision {
            pair: (i, j),
            bkpt: (-1, -1),
            errors: span_errors(x, &h, i, j),
        };
    }

    // Exactly one strand continues: a single 1-d scan on the other.
    if i == k {
        let (t, errors) = search_single(x, &h, i, j, l);
        return BreakpointDecision {
            pair: (k, l),
            bkpt: (-1, t as i32),
            errors,
        };
    }
    if i == l {
        let (t, errors) = search_single(x, &h, i, j, k);
        return BreakpointDecision {
            pair: (l, k),
            bkpt: (-1, t as i32),
            errors,
        };
    }
    if j == k {
        let (t, errors) = search_single(x, &h, j, i, l);
        return BreakpointDecision {
            pair: (l, k),
            bkpt: (t as i32, -1),
            errors,
        };
    }
    if j == l {
        let (t, errors) = search_single(x, &h, j, i, k);
        return BreakpointDecision {
            pair: (k, l),
            bkpt: (t as i32, -1),
            errors,
        };
    }

    // Both strands switch: try straight and crossed pairings.
    let (t1s, t2s, err_straight) = search_double(x, &h, (i, k), (j, l));
    let (t1c, t2c, err_crossed) = search_double(x, &h, (i, l), (j, k));

    if err_crossed < err_straight {
        BreakpointDecision {
            pair: (l, k),
            bkpt: (t1c as i32, t2c as i32),
            errors: err_crossed,
        }
    } else {
        BreakpointDecision {
            pair: (k, l),
            bkpt: (t1s as i32, t2s as i32),
            errors: err_straight,
        }
    }
}

/// Observed-marker errors of a fixed pair over the whole span
fn span_errors<F>(x: &[u8], h: &F, a: u32, b: u32) -> u32
where
    F: Fn(usize, u32) -> u8,
{
    let mut errors = 0;
    for (u, &g) in x.iter().enumerate() {
        if g != MISSING && g != h(u, a) + h(u, b) {
            errors += 1;
        }
    }
    errors
}

/// 1-d scan: one strand holds `constant`, the other switches `from -> to`
/// at the returned offset. Ties keep the smallest offset.
fn search_single<F>(x: &[u8], h: &F, constant: u32, from: u32, to: u32) -> (usize, u32)
where
    F: Fn(usize, u32) -> u8,
{
    let len = x.len();

    // Start from "entire span already uses the incoming haplotype".
    let mut errors = span_errors(x, h, constant, to);
    let mut best_t = 0usize;
    let mut best_errors = errors;

    for t in 1..=len {
        let u = t - 1;
        let g = x[u];
        if g != MISSING {
            let shared = h(u, constant);
            errors += (g != shared + h(u, from)) as u32;
            errors -= (g != shared + h(u, to)) as u32;
        }
        if errors < best_errors {
            best_errors = errors;
            best_t = t;
        }
    }

    (best_t, best_errors)
}

/// 2-d scan: both strands switch independently, `strand1 = (from, to)` and
/// `strand2 = (from, to)`. Ties keep the smallest `(t1, t2)` in scan order.
fn search_double<F>(
    x: &[u8],
    h: &F,
    strand1: (u32, u32),
    strand2: (u32, u32),
) -> (usize, usize, u32)
where
    F: Fn(usize, u32) -> u8,
{
    let len = x.len();
    let (a1, b1) = strand1;
    let (a2, b2) = strand2;

    // errors at (t1, 0) as t1 advances; starts from both strands incoming.
    let mut base = span_errors(x, h, b1, b2);
    let mut best = (0usize, 0usize, u32::MAX);

    for t1 in 0..=len {
        if base < best.2 {
            best = (t1, 0, base);
        }
        let mut errors = base;
        for t2 in 1..=len {
            let u = t2 - 1;
            let g = x[u];
            if g != MISSING {
                let s1 = if u < t1 { h(u, a1) } else { h(u, b1) };
                errors += (g != s1 + h(u, a2)) as u32;
                errors -= (g != s1 + h(u, b2)) as u32;
            }
            if errors < best.2 {
                best = (t1, t2, errors);
            }
        }
        if t1 < len {
            let g = x[t1];
            if g != MISSING {
                let s2 = h(t1, b2);
                base += (g != h(t1, a1) + s2) as u32;
                base -= (g != h(t1, b1) + s2) as u32;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference haplotypes as rows of a small matrix
    fn hap_fn(rows: &[Vec<u8>]) -> impl Fn(usize, u32) -> u8 + '_ {
        move |u, hap| rows[hap as usize][u]
    }

    /// Brute-force 1-d error at offset t
    fn err_at<F: Fn(usize, u32) -> u8>(
        x: &[u8],
        h: &F,
        constant: u32,
        from: u32,
        to: u32,
        t: usize,
    ) -> u32 {
        let mut e = 0;
        for (u, &g) in x.iter().enumerate() {
            if g == MISSING {
                continue;
            }
            let other = if u < t { from } else { to };
            if g != h(u, constant) + h(u, other) {
                e += 1;
            }
        }
        e
    }

    #[test]
    fn test_single_scan_finds_crossover() {
        // hap0 constant; truth switches hap1 -> hap2 at offset 3
        let haps = vec![
            vec![0, 0, 0, 0, 0, 0],
            vec![1, 1, 1, 1, 1, 1],
            vec![0, 0, 0, 0, 0, 0],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 1, 1, 0, 0, 0];
        let (t, errors) = search_single(&x, &h, 0, 1, 2);
        assert_eq!(t, 3);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_single_scan_is_optimal_and_tie_breaks_low() {
        let haps = vec![
            vec![0, 1, 0, 1, 0],
            vec![1, 1, 0, 0, 1],
            vec![1, 0, 1, 0, 1],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 2, MISSING, 1, 1];
        let (t, errors) = search_single(&x, &h, 0, 1, 2);
        let brute: Vec<u32> = (0..=x.len())
            .map(|t| err_at(&x, &h, 0, 1, 2, t))
            .collect();
        let min = *brute.iter().min().unwrap();
        assert_eq!(errors, min);
        assert_eq!(t, brute.iter().position(|&e| e == min).unwrap());
    }

    #[test]
    fn test_full_span_coverage_returns_len() {
        // The outgoing haplotype still explains everything: t = L
        let haps = vec![
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 1],
            vec![0, 1, 0, 1],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 1, 1, 1];
        let (t, errors) = search_single(&x, &h, 0, 1, 2);
        assert_eq!(t, x.len());
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_refine_equal_sets_no_breakpoint() {
        let haps = vec![vec![0, 1], vec![1, 0]];
        let h = hap_fn(&haps);
        let x = vec![1, 1];
        let d = refine_transition(&x, &h, (0, 1), (1, 0));
        assert_eq!(d.pair, (0, 1));
        assert_eq!(d.bkpt, (-1, -1));
        assert_eq!(d.errors, 0);
    }

    #[test]
    fn test_refine_orients_shared_strand() {
        // prev = (0, 1), next = (2, 0): strand1 keeps hap 0, strand2
        // switches 1 -> 2.
        let haps = vec![
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 1],
            vec![0, 0, 1, 1],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 1, 1, 1];
        let d = refine_transition(&x, &h, (0, 1), (2, 0));
        assert_eq!(d.pair, (0, 2));
        assert_eq!(d.bkpt.0, -1);
        // hap2 matches hap1's contribution from offset 2 on, so the scan
        // settles on the earliest zero-error switch point.
        assert_eq!(d.bkpt.1, 2);
        assert_eq!(d.errors, 0);
    }

    #[test]
    fn test_outgoing_hap_covering_span_returns_len() {
        // next strand2 hap disagrees with the truth everywhere, so the
        // best switch point is after the span: t = L.
        let haps = vec![
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 1],
            vec![0, 0, 0, 0],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 1, 1, 1];
        let d = refine_transition(&x, &h, (0, 1), (0, 2));
        assert_eq!(d.pair, (0, 2));
        assert_eq!(d.bkpt, (-1, x.len() as i32));
        assert_eq!(d.errors, 0);
    }

    #[test]
    fn test_double_scan_locates_both_crossovers() {
        // strand1: hap0 -> hap1 at 2; strand2: hap2 -> hap3 at 4
        let haps = vec![
            vec![1, 1, 1, 1, 1, 1],
            vec![0, 0, 0, 0, 0, 0],
            vec![1, 1, 1, 1, 1, 1],
            vec![0, 0, 0, 0, 0, 0],
        ];
        let h = hap_fn(&haps);
        let x = vec![2, 2, 1, 1, 0, 0];
        let (t1, t2, errors) = search_double(&x, &h, (0, 1), (2, 3));
        assert_eq!((t1, t2), (2, 4));
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_refine_picks_crossed_pairing() {
        // prev = (0, 1); next = (2, 3). Straight (0->2, 1->3) explains
        // nothing, crossed (0->3, 1->2) is exact from the span start.
        let haps = vec![
            vec![1, 1, 1, 1],
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 1],
            vec![0, 0, 0, 0],
        ];
        let h = hap_fn(&haps);
        // truth: strand1 -> hap3 (all 0), strand2 -> hap2 (all 1)
        let x = vec![1, 1, 1, 1];
        let d = refine_transition(&x, &h, (0, 1), (2, 3));
        assert_eq!(d.errors, 0);
        // Both pairings reach zero errors here (hap2 == hap0 and
        // hap3 == hap1), so the straight pairing wins the tie.
        assert_eq!(d.pair, (2, 3));
    }

    #[test]
    fn test_refine_crossed_strictly_better() {
        // truth: strand1 switches hap0 -> hap3 at offset 1, strand2
        // switches hap1 -> hap2 at offset 3. Only the crossed pairing can
        // reach zero errors; every straight combination misses the dosage
        // of 2 at offset 1.
        let haps = vec![
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 1],
            vec![1, 0, 1, 0],
            vec![0, 1, 0, 1],
        ];
        let h = hap_fn(&haps);
        let x = vec![1, 2, 1, 1];
        let d = refine_transition(&x, &h, (0, 1), (2, 3));
        assert_eq!(d.errors, 0);
        assert_eq!(d.pair, (3, 2));
        assert_eq!(d.bkpt, (1, 3));
    }
}
