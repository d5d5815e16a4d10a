// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use orogeny::io;
use orogeny::solver::{self, SolveOptions, Solver};
use orogeny::{BasicSolver, BulkSolver, HaloSolver, ThreadPoolSolver};

#[derive(Parser)]
#[command(
    name = "mountainsolve",
    about = "Read a mountain range from infile, solve it, and write it to outfile.",
    after_help = "Set SOLVER_NUM_THREADS to a positive integer to size the worker pool for \
                  --strategy threads (default 1).\n\
                  Set INTVL to a positive real to write chk-<time>.wo snapshots every INTVL \
                  simulation-time units."
)]
struct Cli {
    /// Input mountain range (.wo)
    infile: PathBuf,

    /// Output mountain range (.wo)
    outfile: PathBuf,

    /// Execution strategy
    #[arg(long, value_enum, default_value = "basic")]
    strategy: Strategy,

    /// Participant count for the halo strategy (default: available
    /// parallelism)
    #[arg(long)]
    ranks: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy)]
enum Strategy {
    /// Single-threaded reference
    Basic,
    /// Persistent worker pool
    Threads,
    /// Bulk data-parallel passes
    Bulk,
    /// Distributed halo exchange
    Halo,
}

fn run<S: Solver>(mut solver: S, opts: &SolveOptions, outfile: &Path) -> Result<()> {
    let t = solver::solve(&mut solver, opts).context("solve failed")?;
    println!("Solved; simulation time: {t}");
    solver
        .write(outfile)
        .with_context(|| format!("failed to write {}", outfile.display()))?;
    println!("Successfully wrote {}", outfile.display());
    Ok(())
}

fn available_ranks() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let range = io::read_file(&cli.infile)
        .with_context(|| format!("failed to read {}", cli.infile.display()))?;
    println!("Successfully read {}", cli.infile.display());

    let opts = SolveOptions::from_env();
    match cli.strategy {
        Strategy::Basic => run(BasicSolver::new(range), &opts, &cli.outfile),
        Strategy::Threads => run(ThreadPoolSolver::new(range), &opts, &cli.outfile),
        Strategy::Bulk => run(BulkSolver::new(range), &opts, &cli.outfile),
        Strategy::Halo => {
            let ranks = cli.ranks.unwrap_or_else(available_ranks);
            run(HaloSolver::new(range, ranks), &opts, &cli.outfile)
        }
    }
}
