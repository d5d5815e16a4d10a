// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Shared-memory strategy: a persistent pool of workers coordinated by
//! barriers.
//!
//! Each worker is pinned to one contiguous sub-range of the index space for
//! the lifetime of the pool. The height and growth arrays are stored as f64
//! bit patterns in `AtomicU64` slabs: within a phase every worker writes
//! only its own sub-range, so relaxed loads and stores are enough and the
//! barriers provide the cross-phase ordering.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::JoinHandle;

use crate::comm::add_f64;
use crate::kernels::{growth, height, steepness};
use crate::range::MountainRange;
use crate::solver::{partition, Solver};

const CMD_STEP: u8 = 0;
const CMD_DSTEEPNESS: u8 = 1;

fn load(slab: &[AtomicU64], i: usize) -> f64 {
    f64::from_bits(slab[i].load(Ordering::Relaxed))
}

fn store(slab: &[AtomicU64], i: usize, value: f64) {
    slab[i].store(value.to_bits(), Ordering::Relaxed);
}

fn to_slab(values: Vec<f64>) -> Box<[AtomicU64]> {
    values
        .into_iter()
        .map(|v| AtomicU64::new(v.to_bits()))
        .collect::<Vec<_>>()
        .into_boxed_slice()
}

struct PoolShared {
    r: Box<[f64]>,
    h: Box<[AtomicU64]>,
    g: Box<[AtomicU64]>,
    cells: usize,
    dt: AtomicU64,
    command: AtomicU8,
    ds_total: AtomicU64,
    running: AtomicBool,
    /// Width `threads + 1`: the driver participates in every crossing. Also
    /// serves as the command release point workers idle on.
    step_barrier: Barrier,
    /// Width `threads + 1`: crossed twice per dsteepness call, around the
    /// driver's read of the accumulator.
    ds_barrier: Barrier,
}

fn worker_loop(shared: Arc<PoolShared>, first: usize, last: usize) {
    let interior_lo = first.max(1);
    let interior_hi = last.min(shared.cells - 1);
    loop {
        shared.step_barrier.wait();
        if !shared.running.load(Ordering::Acquire) {
            return;
        }
        match shared.command.load(Ordering::Relaxed) {
            CMD_STEP => {
                let dt = f64::from_bits(shared.dt.load(Ordering::Relaxed));
                for i in first..last {
                    store(&shared.h, i, height(load(&shared.h, i), load(&shared.g, i), dt));
                }
                // Every height write must land before any growth read.
                shared.step_barrier.wait();
                for i in interior_lo..interior_hi {
                    let g_new = growth(
                        shared.r[i],
                        load(&shared.h, i - 1),
                        load(&shared.h, i),
                        load(&shared.h, i + 1),
                    );
                    store(&shared.g, i, g_new);
                }
                shared.step_barrier.wait();
            }
            _ => {
                let mut local = 0.0;
                for i in interior_lo..interior_hi {
                    local += steepness(
                        load(&shared.h, i - 1),
                        load(&shared.h, i + 1),
                        load(&shared.g, i - 1),
                        load(&shared.g, i + 1),
                        shared.cells,
                    );
                }
                add_f64(&shared.ds_total, local);
                shared.ds_barrier.wait();
                shared.ds_barrier.wait();
            }
        }
    }
}

/// Shared-memory pool strategy with persistent, barrier-coordinated
/// workers.
///
/// The worker count comes from the `SOLVER_NUM_THREADS` environment
/// variable (default 1), read once at construction. Dropping the solver
/// flips the shutdown flag, releases the command barrier one final time so
/// no worker stays blocked, and joins every thread.
pub struct ThreadPoolSolver {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
    t: f64,
    threads: usize,
}

impl ThreadPoolSolver {
    /// Wrap a range, sizing the pool from `SOLVER_NUM_THREADS`.
    pub fn new(range: MountainRange) -> Self {
        Self::with_thread_count(range, threads_from_env())
    }

    /// Wrap a range with an explicit worker count (clamped to at least 1).
    pub fn with_thread_count(range: MountainRange, threads: usize) -> Self {
        let threads = threads.max(1);
        let cells = range.size();
        let MountainRange { t, r, h, g } = range;
        let shared = Arc::new(PoolShared {
            r: r.into_boxed_slice(),
            h: to_slab(h),
            g: to_slab(g),
            cells,
            dt: AtomicU64::new(0),
            command: AtomicU8::new(CMD_STEP),
            ds_total: AtomicU64::new(0),
            running: AtomicBool::new(true),
            step_barrier: Barrier::new(threads + 1),
            ds_barrier: Barrier::new(threads + 1),
        });

        let workers = (0..threads)
            .map(|tid| {
                let shared = Arc::clone(&shared);
                let (first, last) = partition(cells, tid, threads);
                std::thread::spawn(move || worker_loop(shared, first, last))
            })
            .collect();

        ThreadPoolSolver {
            shared,
            workers,
            t,
            threads,
        }
    }

    /// Number of workers in the pool.
    pub fn thread_count(&self) -> usize {
        self.threads
    }
}

fn threads_from_env() -> usize {
    std::env::var("SOLVER_NUM_THREADS")
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

impl Solver for ThreadPoolSolver {
    fn step(&mut self, dt: f64) -> f64 {
        self.shared.dt.store(dt.to_bits(), Ordering::Relaxed);
        self.shared.command.store(CMD_STEP, Ordering::Relaxed);
        self.shared.step_barrier.wait(); // release the workers
        self.shared.step_barrier.wait(); // heights complete
        self.shared.step_barrier.wait(); // interior growth complete
        let n = self.shared.cells;
        store(&self.shared.g, 0, load(&self.shared.g, 1));
        store(&self.shared.g, n - 1, load(&self.shared.g, n - 2));
        self.t += dt;
        self.t
    }

    fn dsteepness(&mut self) -> f64 {
        self.shared.ds_total.store(0, Ordering::Relaxed);
        self.shared.command.store(CMD_DSTEEPNESS, Ordering::Relaxed);
        self.shared.step_barrier.wait(); // release the workers
        self.shared.ds_barrier.wait(); // entry: every partial sum is in
        let total = f64::from_bits(self.shared.ds_total.load(Ordering::Relaxed));
        self.shared.ds_barrier.wait(); // exit: workers may idle again
        total
    }

    fn sim_time(&self) -> f64 {
        self.t
    }

    fn snapshot(&self) -> MountainRange {
        let cells = self.shared.cells;
        let r = self.shared.r.to_vec();
        let h: Vec<f64> = (0..cells).map(|i| load(&self.shared.h, i)).collect();
        let g: Vec<f64> = (0..cells).map(|i| load(&self.shared.g, i)).collect();
        MountainRange::from_raw(r, h, g, self.t)
    }
}

impl Drop for ThreadPoolSolver {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.step_barrier.wait();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{BasicSolver, DEFAULT_DT};

    fn plateau_range(cells: usize) -> MountainRange {
        let mut r = vec![0.0; cells];
        for value in &mut r[cells / 4..cells / 2] {
            *value = 1.0;
        }
        MountainRange::new(r, vec![0.0; cells]).unwrap()
    }

    #[test]
    fn matches_basic_per_step_bit_for_bit() {
        let range = plateau_range(41);
        let mut basic = BasicSolver::new(range.clone());
        let mut pool = ThreadPoolSolver::with_thread_count(range, 4);
        for _ in 0..5 {
            assert_eq!(basic.step(DEFAULT_DT), pool.step(DEFAULT_DT));
        }
        let snap = pool.snapshot();
        assert_eq!(basic.range().height(), snap.height());
        assert_eq!(basic.range().growth_rate(), snap.growth_rate());
        assert_eq!(basic.sim_time(), snap.sim_time());
    }

    #[test]
    fn dsteepness_matches_basic_within_associativity() {
        let range = plateau_range(41);
        let mut basic = BasicSolver::new(range.clone());
        let mut pool = ThreadPoolSolver::with_thread_count(range, 3);
        basic.step(DEFAULT_DT);
        pool.step(DEFAULT_DT);
        let diff = (basic.dsteepness() - pool.dsteepness()).abs();
        assert!(diff < 1e-12, "dsteepness diverged by {}", diff);
    }

    #[test]
    fn more_workers_than_cells_is_harmless() {
        let range = plateau_range(5);
        let mut pool = ThreadPoolSolver::with_thread_count(range, 8);
        pool.step(DEFAULT_DT);
        let _ = pool.dsteepness();
    }

    #[test]
    fn drop_joins_every_worker() {
        // A leaked or deadlocked worker would hang this test on join.
        for _ in 0..50 {
            let mut pool = ThreadPoolSolver::with_thread_count(plateau_range(17), 4);
            pool.step(DEFAULT_DT);
            let _ = pool.dsteepness();
        }
    }
}
