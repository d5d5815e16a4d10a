// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while constructing, reading, or writing a mountain
/// range.
#[derive(Debug)]
pub enum RangeError {
    /// The input declares a dimensionality other than 1.
    UnsupportedDimensions(u64),
    /// The input ended before the fixed-size header could be read.
    TruncatedHeader,
    /// The input body does not hold exactly two arrays of the declared size.
    SizeMismatch {
        /// The cell count declared in the header.
        cells: u64,
        /// The number of body bytes actually present.
        body_bytes: u64,
    },
    /// The range is too small for the interior stencil.
    TooFewCells(u64),
    /// The uplift rate and height arrays have different lengths.
    LengthMismatch {
        /// Length of the uplift rate array.
        rate: usize,
        /// Length of the height array.
        height: usize,
    },
    /// I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::UnsupportedDimensions(ndims) => {
                write!(
                    f,
                    "input declares {} dimensions; this solver only handles 1-dimensional ranges",
                    ndims
                )
            }
            RangeError::TruncatedHeader => {
                write!(f, "input is corrupt: it ends before the header is complete")
            }
            RangeError::SizeMismatch { cells, body_bytes } => {
                write!(
                    f,
                    "input is corrupt: header declares {} cells but the body holds {} bytes",
                    cells, body_bytes
                )
            }
            RangeError::TooFewCells(cells) => {
                write!(f, "a range needs at least 3 cells, got {}", cells)
            }
            RangeError::LengthMismatch { rate, height } => {
                write!(
                    f,
                    "uplift rate has {} cells but height has {}",
                    rate, height
                )
            }
            RangeError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RangeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RangeError {
    fn from(e: std::io::Error) -> Self {
        RangeError::Io(e)
    }
}

/// Convenience type alias for Results with RangeError.
pub type Result<T> = std::result::Result<T, RangeError>;
