// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! The strategy contract, the solve loop, and the two in-place strategies.
//!
//! Every strategy provides `step(dt)` and `dsteepness()` with identical
//! per-cell arithmetic; they differ only in how the index space is
//! partitioned. [`solve`] drives any of them to the termination predicate
//! and handles periodic snapshots.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::io;
use crate::kernels::{growth, height, steepness};
use crate::range::MountainRange;

/// Default simulation time step.
pub const DEFAULT_DT: f64 = 0.01;

/// An execution strategy for the stencil update.
///
/// Implementations must follow the mandatory phase order inside one step:
/// every height cell is updated from the pre-step growth rate, then every
/// interior growth cell from the post-step height, then the boundary
/// fix-up, then the time advance. Concurrent calls to `step` are a usage
/// error; the driver is single-threaded.
pub trait Solver {
    /// Advance the range from `t` to `t + dt` in one step. Returns the new
    /// simulation time, which accumulates bit-exactly as `t + dt`.
    fn step(&mut self, dt: f64) -> f64;

    /// The integrated steepness derivative over the interior cells. The sum
    /// order is strategy-defined, so results may differ from the serial
    /// strategy at the level of floating-point associativity.
    fn dsteepness(&mut self) -> f64;

    /// Current simulation time.
    fn sim_time(&self) -> f64;

    /// A copy of the full simulation state.
    fn snapshot(&self) -> MountainRange;

    /// Serialize the current state to `path` in the `.wo` format.
    fn write(&self, path: &Path) -> Result<()> {
        io::write_file(&self.snapshot(), path)
    }
}

/// Split `cells` into `size` contiguous sub-ranges, returning the half-open
/// range owned by `rank`.
///
/// The first `cells % size` participants receive one extra cell, so range
/// lengths never differ by more than one.
pub fn partition(cells: usize, rank: usize, size: usize) -> (usize, usize) {
    let per = cells / size;
    let extra = cells % size;
    let first = per * rank + rank.min(extra);
    let last = first + per + usize::from(rank < extra);
    (first, last)
}

/// Tunables for [`solve`].
pub struct SolveOptions {
    /// Time step per iteration.
    pub dt: f64,
    /// Termination threshold: the loop runs while `dsteepness() > eps`.
    /// Setting this to `-f64::EPSILON` reproduces the sign-change variant
    /// that steps until the steepness derivative turns negative.
    pub eps: f64,
    /// Snapshot interval in simulation-time units; 0 disables snapshots.
    pub snapshot_interval: f64,
    /// Directory snapshot files are written into.
    pub snapshot_dir: PathBuf,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            dt: DEFAULT_DT,
            eps: f64::EPSILON,
            snapshot_interval: 0.0,
            snapshot_dir: PathBuf::from("."),
        }
    }
}

impl SolveOptions {
    /// Default options with the snapshot interval taken from the `INTVL`
    /// environment variable. An absent, unparseable, or non-positive value
    /// disables snapshots. The environment is read once, here.
    pub fn from_env() -> Self {
        let snapshot_interval = std::env::var("INTVL")
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(0.0);
        SolveOptions {
            snapshot_interval,
            ..Self::default()
        }
    }
}

/// True when `t` has just crossed a multiple of `interval`. The test window
/// is a band of width 2dt/5 centered on each multiple, so accumulated
/// floating-point drift in `t` cannot skip a trigger.
pub(crate) fn snapshot_due(t: f64, dt: f64, interval: f64) -> bool {
    interval > 0.0 && (t + dt / 5.0) % interval < 2.0 * dt / 5.0
}

/// Step the strategy until the steepness derivative falls to the
/// termination threshold, writing `chk-<t>.wo` snapshots along the way when
/// an interval is configured. Returns the final simulation time.
pub fn solve<S: Solver + ?Sized>(solver: &mut S, opts: &SolveOptions) -> Result<f64> {
    while solver.dsteepness() > opts.eps {
        let t = solver.step(opts.dt);
        if snapshot_due(t, opts.dt, opts.snapshot_interval) {
            let name = format!("chk-{t:07.2}.wo");
            solver.write(&opts.snapshot_dir.join(name))?;
        }
    }
    Ok(solver.sim_time())
}

/// The single-threaded reference strategy. Ground truth for every other
/// strategy's tests.
pub struct BasicSolver {
    range: MountainRange,
}

impl BasicSolver {
    /// Wrap a range for serial execution.
    pub fn new(range: MountainRange) -> Self {
        BasicSolver { range }
    }

    /// The current simulation state.
    pub fn range(&self) -> &MountainRange {
        &self.range
    }

    /// Consume the solver and return the range.
    pub fn into_range(self) -> MountainRange {
        self.range
    }
}

impl Solver for BasicSolver {
    fn step(&mut self, dt: f64) -> f64 {
        let range = &mut self.range;
        for i in 0..range.h.len() {
            range.h[i] = height(range.h[i], range.g[i], dt);
        }
        range.refresh_growth();
        range.t += dt;
        range.t
    }

    fn dsteepness(&mut self) -> f64 {
        let n = self.range.h.len();
        let (h, g) = (&self.range.h, &self.range.g);
        (1..n - 1)
            .map(|i| steepness(h[i - 1], h[i + 1], g[i - 1], g[i + 1], n))
            .sum()
    }

    fn sim_time(&self) -> f64 {
        self.range.t
    }

    fn snapshot(&self) -> MountainRange {
        self.range.clone()
    }
}

/// Bulk data-parallel strategy: each phase is one rayon pass over the index
/// space, with the boundary fix-up applied serially afterwards. The kernels
/// are side-effect-free within a phase, so the runtime is free to split,
/// fuse, or vectorize the passes.
pub struct BulkSolver {
    range: MountainRange,
}

impl BulkSolver {
    /// Wrap a range for bulk-parallel execution.
    pub fn new(range: MountainRange) -> Self {
        BulkSolver { range }
    }

    /// The current simulation state.
    pub fn range(&self) -> &MountainRange {
        &self.range
    }

    /// Consume the solver and return the range.
    pub fn into_range(self) -> MountainRange {
        self.range
    }
}

impl Solver for BulkSolver {
    fn step(&mut self, dt: f64) -> f64 {
        let MountainRange { r, h, g, .. } = &mut self.range;
        h.par_iter_mut()
            .zip(g.par_iter())
            .for_each(|(h_i, g_i)| *h_i = height(*h_i, *g_i, dt));

        let cells = h.len();
        let (r, h) = (&*r, &*h);
        g[1..cells - 1]
            .par_iter_mut()
            .enumerate()
            .for_each(|(offset, g_i)| {
                let i = offset + 1;
                *g_i = growth(r[i], h[i - 1], h[i], h[i + 1]);
            });

        self.range.apply_boundary();
        self.range.t += dt;
        self.range.t
    }

    fn dsteepness(&mut self) -> f64 {
        let n = self.range.h.len();
        let (h, g) = (&self.range.h, &self.range.g);
        (1..n - 1)
            .into_par_iter()
            .map(|i| steepness(h[i - 1], h[i + 1], g[i - 1], g[i + 1], n))
            .sum()
    }

    fn sim_time(&self) -> f64 {
        self.range.t
    }

    fn snapshot(&self) -> MountainRange {
        self.range.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike_range(cells: usize) -> MountainRange {
        let mut h = vec![0.0; cells];
        h[cells / 2] = 1.0;
        MountainRange::new(vec![0.0; cells], h).unwrap()
    }

    #[test]
    fn partition_balances_remainders() {
        // 10 cells over 3 participants: the first gets the extra cell.
        assert_eq!(partition(10, 0, 3), (0, 4));
        assert_eq!(partition(10, 1, 3), (4, 7));
        assert_eq!(partition(10, 2, 3), (7, 10));
    }

    #[test]
    fn partition_covers_every_cell_once() {
        for size in 1..=7 {
            let mut next = 0;
            for rank in 0..size {
                let (first, last) = partition(23, rank, size);
                assert_eq!(first, next);
                assert!(last >= first);
                next = last;
            }
            assert_eq!(next, 23);
        }
    }

    #[test]
    fn step_advances_time_bit_exactly() {
        let mut solver = BasicSolver::new(spike_range(9));
        assert_eq!(solver.step(0.01), 0.01);
        assert_eq!(solver.step(0.01), 0.01 + 0.01);
    }

    #[test]
    fn step_enforces_boundary_policy() {
        let mut solver = BasicSolver::new(spike_range(9));
        solver.step(DEFAULT_DT);
        let g = solver.range().growth_rate();
        assert_eq!(g[0], g[1]);
        assert_eq!(g[8], g[7]);
    }

    #[test]
    fn step_orders_height_before_growth() {
        // The height update must consume the pre-step growth rate: after one
        // step of a spike, the spike cell has dropped by dt * 2 and its
        // neighbors have risen by dt / 2.
        let mut solver = BasicSolver::new(spike_range(9));
        solver.step(0.01);
        let h = solver.range().height();
        assert_eq!(h[4], 1.0 - 0.02);
        assert_eq!(h[3], 0.005);
        assert_eq!(h[5], 0.005);
    }

    #[test]
    fn dsteepness_of_flat_terrain_is_exactly_zero() {
        let range = MountainRange::new(vec![0.0; 100], vec![0.0; 100]).unwrap();
        let mut solver = BasicSolver::new(range);
        assert_eq!(solver.dsteepness(), 0.0);
    }

    #[test]
    fn zero_input_terminates_immediately() {
        let range = MountainRange::new(vec![0.0; 100], vec![0.0; 100]).unwrap();
        let mut solver = BasicSolver::new(range);
        let t = solve(&mut solver, &SolveOptions::default()).unwrap();
        assert_eq!(t, 0.0);
    }

    #[test]
    fn bulk_matches_basic_per_step() {
        let range = spike_range(33);
        let mut basic = BasicSolver::new(range.clone());
        let mut bulk = BulkSolver::new(range);
        for _ in 0..5 {
            assert_eq!(basic.step(DEFAULT_DT), bulk.step(DEFAULT_DT));
        }
        assert_eq!(basic.range().height(), bulk.range().height());
        assert_eq!(basic.range().growth_rate(), bulk.range().growth_rate());
        let diff = (basic.dsteepness() - bulk.dsteepness()).abs();
        assert!(diff < 1e-12, "dsteepness diverged by {}", diff);
    }

    #[test]
    fn snapshot_window_fires_once_per_multiple() {
        let interval = 0.5;
        let dt = DEFAULT_DT;
        let mut t = 0.0;
        let mut fired = Vec::new();
        for _ in 0..200 {
            t += dt;
            if snapshot_due(t, dt, interval) {
                fired.push(t);
            }
        }
        let expected: Vec<f64> = vec![0.5, 1.0, 1.5, 2.0];
        assert_eq!(fired.len(), expected.len());
        for (got, want) in fired.iter().zip(expected) {
            assert!((got - want).abs() < dt / 5.0, "fired at {}", got);
        }
    }

    #[test]
    fn snapshot_disabled_without_interval() {
        assert!(!snapshot_due(0.5, DEFAULT_DT, 0.0));
    }

    #[test]
    fn intvl_environment_variable_sets_interval() {
        std::env::set_var("INTVL", "0.25");
        assert_eq!(SolveOptions::from_env().snapshot_interval, 0.25);
        std::env::set_var("INTVL", "not-a-number");
        assert_eq!(SolveOptions::from_env().snapshot_interval, 0.0);
        std::env::remove_var("INTVL");
        assert_eq!(SolveOptions::from_env().snapshot_interval, 0.0);
    }
}
