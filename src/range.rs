// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{RangeError, Result};
use crate::kernels::growth;

/// Dimensionality of every range this solver handles. Inputs declaring any
/// other value are rejected.
pub const NDIMS: u64 = 1;

/// The full simulation state of a one-dimensional mountain range.
///
/// A range owns three equally-sized arrays: the uplift rate `r` (immutable
/// after construction), the surface height `h` (mutated each step), and the
/// growth rate `g` (derived from `r` and `h`), plus the simulation time `t`.
///
/// Invariants held from the moment a range is observable:
/// - all three arrays have the same length, at least 3;
/// - `g` is consistent with the current `r` and `h`, i.e. equal to one
///   interior growth pass followed by the boundary fix-up;
/// - `t` never decreases.
///
/// A range does not step itself; an execution strategy (see the solver
/// modules) borrows or takes the state and drives it forward.
#[derive(Debug, Clone)]
pub struct MountainRange {
    pub(crate) t: f64,
    pub(crate) r: Vec<f64>,
    pub(crate) h: Vec<f64>,
    pub(crate) g: Vec<f64>,
}

impl MountainRange {
    /// Build a range from an uplift rate and an initial height, starting at
    /// simulation time zero.
    ///
    /// # Errors
    /// Returns an error if the arrays differ in length or hold fewer than 3
    /// cells.
    pub fn new(r: Vec<f64>, h: Vec<f64>) -> Result<Self> {
        Self::from_parts(r, h, 0.0)
    }

    /// Build a range from an uplift rate, a height, and a simulation time.
    ///
    /// The growth rate is derived immediately so that the consistency
    /// invariant holds before any caller observes the range.
    pub fn from_parts(r: Vec<f64>, h: Vec<f64>, t: f64) -> Result<Self> {
        if r.len() != h.len() {
            return Err(RangeError::LengthMismatch {
                rate: r.len(),
                height: h.len(),
            });
        }
        if h.len() < 3 {
            return Err(RangeError::TooFewCells(h.len() as u64));
        }
        let g = vec![0.0; h.len()];
        let mut range = MountainRange { t, r, h, g };
        range.refresh_growth();
        Ok(range)
    }

    /// Reassemble a range from state a strategy already holds. The caller
    /// guarantees the growth rate is consistent with `r` and `h`.
    pub(crate) fn from_raw(r: Vec<f64>, h: Vec<f64>, g: Vec<f64>, t: f64) -> Self {
        debug_assert!(r.len() == h.len() && h.len() == g.len() && h.len() >= 3);
        MountainRange { t, r, h, g }
    }

    /// Number of cells in the range.
    pub fn size(&self) -> usize {
        self.h.len()
    }

    /// Current simulation time.
    pub fn sim_time(&self) -> f64 {
        self.t
    }

    /// The uplift rate array.
    pub fn uplift_rate(&self) -> &[f64] {
        &self.r
    }

    /// The surface height array.
    pub fn height(&self) -> &[f64] {
        &self.h
    }

    /// The growth rate array.
    pub fn growth_rate(&self) -> &[f64] {
        &self.g
    }

    /// Recompute every interior growth rate from the current height, then
    /// apply the boundary fix-up.
    pub(crate) fn refresh_growth(&mut self) {
        for i in 1..self.h.len() - 1 {
            self.g[i] = growth(self.r[i], self.h[i - 1], self.h[i], self.h[i + 1]);
        }
        self.apply_boundary();
    }

    /// Zero-gradient boundary: the edge growth rates copy their interior
    /// neighbors.
    pub(crate) fn apply_boundary(&mut self) {
        let n = self.g.len();
        self.g[0] = self.g[1];
        self.g[n - 1] = self.g[n - 2];
    }
}
