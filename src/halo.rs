// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Distributed strategy: the range is split across participant ranks that
//! exchange halo cells with their neighbors.
//!
//! Each rank privately owns a contiguous slice of the global arrays plus
//! one halo cell at every border it shares with another rank, laid out as
//! `[left halo?, owned.., right halo?]`. After the height pass and again
//! after the growth pass every interior border does a symmetric
//! send/receive, so a rank's halos always mirror its neighbors' freshest
//! boundary cells. The steepness reduction is an all-reduce every rank
//! observes; snapshots gather owned slices back to the driver, which acts
//! as the coordinated serial writer.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::comm::{link_chain, AllReduce, HaloTag, Link};
use crate::kernels::{growth, height, steepness};
use crate::range::MountainRange;
use crate::solver::{partition, Solver};

#[derive(Clone, Copy)]
enum Command {
    Step(f64),
    Dsteepness,
    Collect,
    Shutdown,
}

enum Reply {
    StepDone,
    Dsteepness(f64),
    Chunk {
        rank: usize,
        rate: Vec<f64>,
        height: Vec<f64>,
        growth: Vec<f64>,
    },
}

struct Rank {
    cells: usize,
    /// Global index range this rank owns.
    first: usize,
    last: usize,
    /// Local arrays, halo-padded at interior borders.
    r: Vec<f64>,
    h: Vec<f64>,
    g: Vec<f64>,
    left: Option<Link>,
    right: Option<Link>,
    reduce: Arc<AllReduce>,
    round: usize,
    rank: usize,
    commands: Receiver<Command>,
    replies: Sender<Reply>,
}

impl Rank {
    /// Local index of the first owned cell.
    fn lo(&self) -> usize {
        usize::from(self.left.is_some())
    }

    /// Local index one past the last owned cell.
    fn hi(&self) -> usize {
        self.lo() + (self.last - self.first)
    }

    fn run(mut self) {
        while let Ok(command) = self.commands.recv() {
            match command {
                Command::Step(dt) => {
                    if self.step(dt).is_none() {
                        return;
                    }
                    let _ = self.replies.send(Reply::StepDone);
                }
                Command::Dsteepness => {
                    let total = self.dsteepness();
                    let _ = self.replies.send(Reply::Dsteepness(total));
                }
                Command::Collect => {
                    let (lo, hi) = (self.lo(), self.hi());
                    let _ = self.replies.send(Reply::Chunk {
                        rank: self.rank,
                        rate: self.r[lo..hi].to_vec(),
                        height: self.h[lo..hi].to_vec(),
                        growth: self.g[lo..hi].to_vec(),
                    });
                }
                Command::Shutdown => return,
            }
        }
    }

    /// Symmetric halo swap: the first owned cell travels leftward, the last
    /// owned cell rightward, and the corresponding halo slots are filled
    /// from the neighbors. Both sends complete before either receive so
    /// neighboring ranks cannot deadlock. Returns `None` if a neighbor is
    /// gone.
    fn exchange_halos(
        x: &mut [f64],
        lo: usize,
        hi: usize,
        left: &Option<Link>,
        right: &Option<Link>,
    ) -> Option<()> {
        if let Some(link) = left {
            link.send(HaloTag::Leftward, x[lo]);
        }
        if let Some(link) = right {
            link.send(HaloTag::Rightward, x[hi - 1]);
        }
        if let Some(link) = left {
            x[0] = link.recv(HaloTag::Rightward)?;
        }
        if let Some(link) = right {
            x[hi] = link.recv(HaloTag::Leftward)?;
        }
        Some(())
    }

    fn step(&mut self, dt: f64) -> Option<()> {
        let (lo, hi) = (self.lo(), self.hi());

        for i in lo..hi {
            self.h[i] = height(self.h[i], self.g[i], dt);
        }
        Self::exchange_halos(&mut self.h, lo, hi, &self.left, &self.right)?;

        // Interior growth pass: the global edge cells are excluded and
        // handled by the boundary fix-up below.
        let start = if self.first == 0 { lo + 1 } else { lo };
        let end = if self.last == self.cells { hi - 1 } else { hi };
        for i in start..end {
            self.g[i] = growth(self.r[i], self.h[i - 1], self.h[i], self.h[i + 1]);
        }
        Self::exchange_halos(&mut self.g, lo, hi, &self.left, &self.right)?;

        // Only the ranks holding the global edges apply the fix-up.
        if self.first == 0 {
            self.g[0] = self.g[1];
        }
        if self.last == self.cells {
            let n = self.g.len();
            self.g[n - 1] = self.g[n - 2];
        }
        Some(())
    }

    fn dsteepness(&mut self) -> f64 {
        // The local interior skips halos and the global edge cells, so
        // every global interior cell is summed by exactly one rank.
        let n = self.h.len();
        let mut local = 0.0;
        for i in 1..n - 1 {
            local += steepness(
                self.h[i - 1],
                self.h[i + 1],
                self.g[i - 1],
                self.g[i + 1],
                self.cells,
            );
        }
        self.round += 1;
        self.reduce.sum(self.round, local)
    }
}

/// Distributed halo-exchange strategy over in-process participant ranks.
///
/// The participant count is clamped so every rank owns at least two cells,
/// which keeps every exchanged boundary cell a freshly-computed interior
/// value. Dropping the solver shuts the ranks down and joins them.
pub struct HaloSolver {
    commands: Vec<Sender<Command>>,
    replies: Receiver<Reply>,
    workers: Vec<JoinHandle<()>>,
    t: f64,
    cells: usize,
    size: usize,
}

impl HaloSolver {
    /// Split a range across `size` participant ranks.
    pub fn new(range: MountainRange, size: usize) -> Self {
        let cells = range.size();
        let size = size.clamp(1, (cells / 2).max(1));
        let reduce = AllReduce::new(size);
        let (reply_tx, replies) = unbounded();
        let mut commands = Vec::with_capacity(size);
        let mut workers = Vec::with_capacity(size);

        for (rank, (left, right)) in link_chain(size).into_iter().enumerate() {
            let (first, last) = partition(cells, rank, size);
            let padded_first = first - usize::from(rank > 0);
            let padded_last = last + usize::from(rank + 1 < size);
            let (command_tx, command_rx) = unbounded();
            commands.push(command_tx);

            let state = Rank {
                cells,
                first,
                last,
                r: range.uplift_rate()[padded_first..padded_last].to_vec(),
                h: range.height()[padded_first..padded_last].to_vec(),
                g: range.growth_rate()[padded_first..padded_last].to_vec(),
                left,
                right,
                reduce: Arc::clone(&reduce),
                round: 0,
                rank,
                commands: command_rx,
                replies: reply_tx.clone(),
            };
            workers.push(std::thread::spawn(move || state.run()));
        }

        HaloSolver {
            commands,
            replies,
            workers,
            t: range.sim_time(),
            cells,
            size,
        }
    }

    /// Number of participant ranks.
    pub fn rank_count(&self) -> usize {
        self.size
    }

    fn broadcast(&self, command: Command) {
        for tx in &self.commands {
            let _ = tx.send(command);
        }
    }
}

impl Solver for HaloSolver {
    fn step(&mut self, dt: f64) -> f64 {
        self.broadcast(Command::Step(dt));
        for _ in 0..self.size {
            if self.replies.recv().is_err() {
                break;
            }
        }
        self.t += dt;
        self.t
    }

    fn dsteepness(&mut self) -> f64 {
        self.broadcast(Command::Dsteepness);
        let mut total = 0.0;
        for _ in 0..self.size {
            // Every rank reports the same all-reduced value.
            match self.replies.recv() {
                Ok(Reply::Dsteepness(value)) => total = value,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        total
    }

    fn sim_time(&self) -> f64 {
        self.t
    }

    fn snapshot(&self) -> MountainRange {
        self.broadcast(Command::Collect);
        let mut r = vec![0.0; self.cells];
        let mut h = vec![0.0; self.cells];
        let mut g = vec![0.0; self.cells];
        for _ in 0..self.size {
            match self.replies.recv() {
                Ok(Reply::Chunk {
                    rank,
                    rate,
                    height: h_part,
                    growth: g_part,
                }) => {
                    let (first, _) = partition(self.cells, rank, self.size);
                    r[first..first + rate.len()].copy_from_slice(&rate);
                    h[first..first + h_part.len()].copy_from_slice(&h_part);
                    g[first..first + g_part.len()].copy_from_slice(&g_part);
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        MountainRange::from_raw(r, h, g, self.t)
    }
}

impl Drop for HaloSolver {
    fn drop(&mut self) {
        self.broadcast(Command::Shutdown);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
