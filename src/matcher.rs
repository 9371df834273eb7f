//! Two dimensional 0/1 knapsack over candidate capacities.
//!
//! Each candidate is worth `sqrt(threads² + ram²)`. The matcher picks the
//! subset of highest total worth whose thread and RAM sums stay within the
//! task budget. Among equally valuable subsets the choice is deterministic
//! (the earliest candidate to reach a value keeps it) but no particular
//! subset is preferred.

use crate::agent::{AgentId, Capacity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: AgentId,
    pub capacity: Capacity,
}

impl Candidate {
    pub fn new(id: AgentId, threads: u32, ram: u32) -> Self {
        Self {
            id,
            capacity: Capacity { threads, ram },
        }
    }

    pub fn value(&self) -> f64 {
        self.capacity.magnitude()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub selected: Vec<Candidate>,
    pub covered_threads: u32,
    pub covered_ram: u32,
    pub value: f64,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.selected.iter().map(|c| c.id)
    }

    pub fn fits(&self, budget: Capacity) -> bool {
        self.covered_threads <= budget.threads && self.covered_ram <= budget.ram
    }
}

/// Dense `(threads + 1) x (ram + 1)` value table.
#[derive(Debug)]
struct Table {
    cols: usize,
    cells: Vec<f64>,
}

impl Table {
    fn new(max_threads: usize, max_ram: usize) -> Self {
        Self {
            cols: max_ram + 1,
            cells: vec![0.0; (max_threads + 1) * (max_ram + 1)],
        }
    }

    #[inline]
    fn get(&self, t: usize, r: usize) -> f64 {
        self.cells[t * self.cols + r]
    }

    #[inline]
    fn set(&mut self, t: usize, r: usize, v: f64) {
        self.cells[t * self.cols + r] = v;
    }
}

/// One bit per (candidate, threads, ram) cell: set when taking the candidate
/// improved that cell.
#[derive(Debug)]
struct KeepSet {
    plane: usize,
    cols: usize,
    words: Vec<u64>,
}

impl KeepSet {
    fn new(candidates: usize, max_threads: usize, max_ram: usize) -> Self {
        let plane = (max_threads + 1) * (max_ram + 1);
        Self {
            plane,
            cols: max_ram + 1,
            words: vec![0; (candidates * plane).div_ceil(64)],
        }
    }

    #[inline]
    fn bit(&self, i: usize, t: usize, r: usize) -> usize {
        i * self.plane + t * self.cols + r
    }

    #[inline]
    fn mark(&mut self, i: usize, t: usize, r: usize) {
        let b = self.bit(i, t, r);
        self.words[b / 64] |= 1u64 << (b % 64);
    }

    #[inline]
    fn kept(&self, i: usize, t: usize, r: usize) -> bool {
        let b = self.bit(i, t, r);
        self.words[b / 64] & (1u64 << (b % 64)) != 0
    }
}

/// Selects the subset of `candidates` maximising total worth within `budget`.
///
/// The table is bounded by what the candidates could fill together, so a
/// huge budget over a small pool costs no more than a tight one. Runs in
/// `O(n * T * R)` time where `T` and `R` are the clamped budget.
/// An empty or infeasible pool yields an empty result, never an error.
pub fn select(budget: Capacity, candidates: &[Candidate]) -> MatchResult {
    if candidates.is_empty() || budget.threads == 0 || budget.ram == 0 {
        return MatchResult::default();
    }

    let fitting = candidates
        .iter()
        .filter(|c| c.capacity.threads <= budget.threads && c.capacity.ram <= budget.ram);
    let (sum_t, sum_r) = fitting.fold((0u64, 0u64), |(t, r), c| {
        (t + c.capacity.threads as u64, r + c.capacity.ram as u64)
    });
    if sum_t == 0 {
        return MatchResult::default();
    }
    let max_t = sum_t.min(budget.threads as u64) as usize;
    let max_r = sum_r.min(budget.ram as u64) as usize;

    let mut dp = Table::new(max_t, max_r);
    let mut keep = KeepSet::new(candidates.len(), max_t, max_r);

    for (i, candidate) in candidates.iter().enumerate() {
        let ct = candidate.capacity.threads as usize;
        let cr = candidate.capacity.ram as usize;
        if ct > max_t || cr > max_r {
            continue;
        }
        let value = candidate.value();
        // Descending so a candidate can only be counted once.
        for t in (ct..=max_t).rev() {
            for r in (cr..=max_r).rev() {
                let with = dp.get(t - ct, r - cr) + value;
                if with > dp.get(t, r) {
                    dp.set(t, r, with);
                    keep.mark(i, t, r);
                }
            }
        }
    }

    let mut result = MatchResult {
        value: dp.get(max_t, max_r),
        ..MatchResult::default()
    };

    let (mut t, mut r) = (max_t, max_r);
    for (i, candidate) in candidates.iter().enumerate().rev() {
        if keep.kept(i, t, r) {
            result.selected.push(*candidate);
            result.covered_threads += candidate.capacity.threads;
            result.covered_ram += candidate.capacity.ram;
            t -= candidate.capacity.threads as usize;
            r -= candidate.capacity.ram as usize;
        }
    }
    result.selected.reverse();
    result
}
