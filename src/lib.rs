// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! A parallel solver for the time evolution of a one-dimensional mountain
//! range.
//!
//! The surface height grows with a prescribed uplift rate, erodes with the
//! cube of its height, and diffuses toward its neighbors under a
//! first-order finite-difference stencil. The simulation runs until the
//! integrated steepness derivative falls to a termination threshold.
//!
//! Four interchangeable execution strategies drive the same per-cell
//! kernels: a serial reference, a rayon bulk-parallel pass, a persistent
//! barrier-coordinated worker pool, and a distributed halo-exchange scheme
//! over participant ranks. All of them produce identical results up to
//! floating-point summation order.

#![warn(missing_docs)]

/// Point-to-point links and reductions for the distributed strategy.
pub mod comm;
/// Error types for the library.
pub mod error;
/// Distributed halo-exchange strategy.
pub mod halo;
/// Reading and writing the binary range format.
pub mod io;
/// Per-cell finite-difference kernels.
pub mod kernels;
/// Shared-memory worker pool strategy.
pub mod pool;
/// The simulation state.
pub mod range;
/// The strategy contract, the solve loop, and the in-place strategies.
pub mod solver;

pub use crate::error::{RangeError, Result};
pub use crate::halo::HaloSolver;
pub use crate::pool::ThreadPoolSolver;
pub use crate::range::MountainRange;
pub use crate::solver::{solve, BasicSolver, BulkSolver, SolveOptions, Solver, DEFAULT_DT};
