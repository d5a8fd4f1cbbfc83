//! # Cross-Window Connector
//!
//! Every window offers a set of tied-optimal full-panel pairs; the connector
//! picks one per window so the chosen sequence changes haplotypes as rarely
//! as possible. Two interchangeable modes:
//!
//! - **Dynamic programming** (primary): shortest path through the redundant
//!   pair sets under a per-transition switch penalty.
//! - **Set intersection** (faster, coarser): intersect surviving haplotype
//!   chains per strand and close a run when a chain dies out.
//!
//! Both are deterministic: every tie-break is total.

use bitvec::prelude::*;

use crate::utils::workspace::Workspace;

/// Number of strand-level switches between two unordered pairs, taking the
/// better of the two orderings of the successor
#[inline]
pub fn switch_cost(prev: (u32, u32), next: (u32, u32)) -> u32 {
    let straight = (prev.0 != next.0) as u32 + (prev.1 != next.1) as u32;
    let crossed = (prev.0 != next.1) as u32 + (prev.1 != next.0) as u32;
    straight.min(crossed)
}

/// Shortest-path choice of one candidate pair per window.
///
/// All candidates are tied-optimal within their window, so the objective
/// reduces to `lambda` times the summed switch costs. Ties prefer the lower
/// cumulative cost, then the lower lexicographic pair, both at the final
/// window and at every predecessor choice.
///
/// Candidate lists must be non-empty.
pub fn connect_dp(
    candidates: &[&[(u32, u32)]],
    lambda: f32,
    ws: &mut Workspace,
) -> Vec<(u32, u32)> {
    let n_windows = candidates.len();
    if n_windows == 0 {
        return Vec::new();
    }
    debug_assert!(candidates.iter().all(|c| !c.is_empty()));

    let max_candidates = candidates.iter().map(|c| c.len()).max().unwrap_or(1);
    ws.reset_dp(n_windows, max_candidates);

    ws.dp_prev_cost[..candidates[0].len()].fill(0.0);

    for g in 1..n_windows {
        let back = &mut ws.dp_back[g * max_candidates..(g + 1) * max_candidates];
        for (c, &pair) in candidates[g].iter().enumerate() {
            let mut best_cost = f32::INFINITY;
            let mut best_prev = 0usize;
            let mut best_prev_pair = (u32::MAX, u32::MAX);
            for (p, &prev_pair) in candidates[g - 1].iter().enumerate() {
                let cost =
                    ws.dp_prev_cost[p] + lambda * switch_cost(prev_pair, pair) as f32;
                if cost < best_cost
                    || (cost == best_cost && prev_pair < best_prev_pair)
                {
                    best_cost = cost;
                    best_prev = p;
                    best_prev_pair = prev_pair;
                }
            }
            ws.dp_cost[c] = best_cost;
            back[c] = best_prev as u32;
        }
        let live = candidates[g].len();
        ws.dp_prev_cost[..live].copy_from_slice(&ws.dp_cost[..live]);
    }

    // Argmin at the last window, same tie-break
    let last = n_windows - 1;
    let mut best_cost = f32::INFINITY;
    let mut best_c = 0usize;
    let mut best_pair = (u32::MAX, u32::MAX);
    for (c, &pair) in candidates[last].iter().enumerate() {
        let cost = ws.dp_prev_cost[c];
        if cost < best_cost || (cost == best_cost && pair < best_pair) {
            best_cost = cost;
            best_c = c;
            best_pair = pair;
        }
    }

    ws.dp_path[last] = best_c as u32;
    for g in (1..n_windows).rev() {
        let c = ws.dp_path[g] as usize;
        ws.dp_path[g - 1] = ws.dp_back[g * max_candidates + c];
    }

    (0..n_windows)
        .map(|g| candidates[g][ws.dp_path[g] as usize])
        .collect()
}

/// Chain-intersection choice of one pair per window.
///
/// Two surviving haplotype sets are carried forward, one per strand. At each
/// window the pairing (straight vs crossed) maximising the total surviving
/// intersection is applied; when either chain empties, the run closes, every
/// window in the run receives the smallest-index member of each retained
/// set, and the chains restart from the current window's sets.
pub fn connect_intersection(
    sets: &[(BitVec<u64, Lsb0>, BitVec<u64, Lsb0>)],
) -> Vec<(u32, u32)> {
    let n_windows = sets.len();
    if n_windows == 0 {
        return Vec::new();
    }

    let mut chosen = vec![(0u32, 0u32); n_windows];
    let mut chain1 = sets[0].0.clone();
    let mut chain2 = sets[0].1.clone();
    let mut run_start = 0usize;

    for g in 1..n_windows {
        let (s1, s2) = &sets[g];
        let keep_straight = intersection_size(&chain1, s1) + intersection_size(&chain2, s2);
        let keep_crossed = intersection_size(&chain1, s2) + intersection_size(&chain2, s1);
        let (next1, next2) = if keep_crossed > keep_straight {
            (s2, s1)
        } else {
            (s1, s2)
        };

        let survived1 = intersection(&chain1, next1);
        let survived2 = intersection(&chain2, next2);

        if survived1.not_any() || survived2.not_any() {
            let rep = (first_member(&chain1), first_member(&chain2));
            for slot in &mut chosen[run_start..g] {
                *slot = rep;
            }
            chain1 = s1.clone();
            chain2 = s2.clone();
            run_start = g;
        } else {
            chain1 = survived1;
            chain2 = survived2;
        }
    }

    let rep = (first_member(&chain1), first_member(&chain2));
    for slot in &mut chosen[run_start..] {
        *slot = rep;
    }
    chosen
}

fn intersection(a: &BitVec<u64, Lsb0>, b: &BitVec<u64, Lsb0>) -> BitVec<u64, Lsb0> {
    debug_assert_eq!(a.len(), b.len());
    let mut out = a.clone();
    for (word, &other) in out.as_raw_mut_slice().iter_mut().zip(b.as_raw_slice()) {
        *word &= other;
    }
    out
}

fn intersection_size(a: &BitVec<u64, Lsb0>, b: &BitVec<u64, Lsb0>) -> usize {
    debug_assert_eq!(a.len(), b.len());
    a.as_raw_slice()
        .iter()
        .zip(b.as_raw_slice())
        .map(|(x, y)| (x & y).count_ones() as usize)
        .sum()
}

fn first_member(set: &BitVec<u64, Lsb0>) -> u32 {
    set.iter_ones().next().unwrap_or(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(d: usize, members: &[usize]) -> BitVec<u64, Lsb0> {
        let mut bv = bitvec![u64, Lsb0; 0; d];
        for &m in members {
            bv.set(m, true);
        }
        bv
    }

    #[test]
    fn test_switch_cost_orderings() {
        assert_eq!(switch_cost((1, 2), (1, 2)), 0);
        assert_eq!(switch_cost((1, 2), (2, 1)), 0);
        assert_eq!(switch_cost((1, 2), (1, 5)), 1);
        assert_eq!(switch_cost((1, 2), (5, 1)), 1);
        assert_eq!(switch_cost((1, 2), (5, 6)), 2);
    }

    #[test]
    fn test_dp_prefers_continuity() {
        // W1: {(1,2),(3,4)}  W2: {(1,2),(5,6)}  W3: {(5,6),(7,8)}
        // Total cost ties at 2; the lexicographic tie-break keeps (1,2)
        // through the first two windows.
        let w1 = [(1u32, 2u32), (3, 4)];
        let w2 = [(1u32, 2u32), (5, 6)];
        let w3 = [(5u32, 6u32), (7, 8)];
        let candidates: Vec<&[(u32, u32)]> = vec![&w1, &w2, &w3];

        let mut ws = Workspace::new();
        let path = connect_dp(&candidates, 1.0, &mut ws);
        assert_eq!(path, vec![(1, 2), (1, 2), (5, 6)]);
    }

    #[test]
    fn test_dp_single_window_picks_lexicographic_min() {
        let w1 = [(7u32, 9u32), (3, 4), (3, 2)];
        let candidates: Vec<&[(u32, u32)]> = vec![&w1];
        let mut ws = Workspace::new();
        let path = connect_dp(&candidates, 1.0, &mut ws);
        assert_eq!(path, vec![(3, 2)]);
    }

    #[test]
    fn test_dp_crossed_continuation_is_free() {
        let w1 = [(1u32, 2u32)];
        let w2 = [(2u32, 1u32)];
        let candidates: Vec<&[(u32, u32)]> = vec![&w1, &w2];
        let mut ws = Workspace::new();
        let path = connect_dp(&candidates, 1.0, &mut ws);
        assert_eq!(path, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_intersection_single_run() {
        let d = 6;
        let sets = vec![
            (bits(d, &[0, 1]), bits(d, &[4, 5])),
            (bits(d, &[1, 2]), bits(d, &[3, 4])),
        ];
        let chosen = connect_intersection(&sets);
        // Chains narrow to {1} and {4}
        assert_eq!(chosen, vec![(1, 4), (1, 4)]);
    }

    #[test]
    fn test_intersection_crossed_pairing() {
        let d = 4;
        // Window 2's strand sets arrive swapped; the crossed pairing keeps
        // both chains alive.
        let sets = vec![
            (bits(d, &[0]), bits(d, &[3])),
            (bits(d, &[3]), bits(d, &[0])),
        ];
        let chosen = connect_intersection(&sets);
        assert_eq!(chosen, vec![(0, 3), (0, 3)]);
    }

    #[test]
    fn test_intersection_run_closure() {
        let d = 6;
        let sets = vec![
            (bits(d, &[0, 1]), bits(d, &[4])),
            (bits(d, &[1]), bits(d, &[4, 5])),
            // Disjoint from the run: forces closure and a restart
            (bits(d, &[2]), bits(d, &[3])),
        ];
        let chosen = connect_intersection(&sets);
        assert_eq!(chosen[0], (1, 4));
        assert_eq!(chosen[1], (1, 4));
        assert_eq!(chosen[2], (2, 3));
    }
}
