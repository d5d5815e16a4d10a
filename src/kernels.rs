// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Per-cell update kernels shared by every execution strategy.
//!
//! The kernels are scalar so that callers can feed them from plain slices,
//! atomic storage, or halo-padded local arrays without conversion. Keeping a
//! single set of expressions is what makes the strategies numerically
//! equivalent: per-cell arithmetic is identical everywhere, and only the
//! order of reduction sums may differ between strategies.

/// Height of a cell after one explicit Euler step of length `dt`.
#[inline]
pub fn height(h_i: f64, g_i: f64, dt: f64) -> f64 {
    h_i + dt * g_i
}

/// Growth rate of an interior cell from its uplift rate, its height, and the
/// heights of its two neighbors.
///
/// The neighbor term is the local relief: the mean of the two adjacent
/// heights minus the cell's own height.
#[inline]
pub fn growth(r_i: f64, h_left: f64, h_i: f64, h_right: f64) -> f64 {
    let relief = (h_left + h_right) / 2.0 - h_i;
    r_i - h_i.powi(3) + relief
}

/// One interior cell's contribution to the integrated steepness derivative.
///
/// `cells` is the global cell count. The distributed strategy calls this with
/// values drawn from halo-padded local arrays, so the normalization cannot be
/// derived from a slice length.
#[inline]
pub fn steepness(h_left: f64, h_right: f64, g_left: f64, g_right: f64, cells: usize) -> f64 {
    (h_left - h_right) * (g_left - g_right) / 2.0 / (cells as f64 - 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_is_explicit_euler() {
        assert_eq!(height(1.0, 2.0, 0.5), 2.0);
        assert_eq!(height(1.0, -4.0, 0.25), 0.0);
        // A zero-length step leaves the height untouched, bit for bit.
        assert_eq!(height(0.1, 123.456, 0.0), 0.1);
    }

    #[test]
    fn growth_balances_uplift_erosion_and_relief() {
        // Flat terrain grows at exactly the uplift rate.
        assert_eq!(growth(1.0, 0.0, 0.0, 0.0), 1.0);
        // A unit spike on flat ground: relief is -1, erosion is -1.
        assert_eq!(growth(0.0, 0.0, 1.0, 0.0), -2.0);
        // A cell level with its neighbors only sees uplift minus erosion.
        let g = growth(0.5, 2.0, 2.0, 2.0);
        assert!((g - (0.5 - 8.0)).abs() < 1e-15);
    }

    #[test]
    fn steepness_sign_follows_gradient_agreement() {
        // Height and growth rate sloping the same way gives a positive term.
        assert!(steepness(0.0, 1.0, 0.0, 1.0, 10) > 0.0);
        // Opposing slopes give a negative term.
        assert!(steepness(0.0, 1.0, 1.0, 0.0, 10) < 0.0);
        // Normalization divides by the interior cell count.
        let ds = steepness(1.0, 0.0, 1.0, 0.0, 102);
        assert!((ds - 1.0 / 2.0 / 100.0).abs() < 1e-15);
    }
}
