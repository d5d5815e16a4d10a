// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Reading and writing the `.wo` binary range format.
//!
//! The format is a single little-endian stream: `ndims: u64` (always 1),
//! `cells: u64`, `t: f64`, then the uplift rate and height arrays as `cells`
//! f64 values each. A well-formed stream is therefore exactly
//! `24 + 16 * cells` bytes; anything else is rejected as corrupt.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{RangeError, Result};
use crate::range::{MountainRange, NDIMS};

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(header_error)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(header_error)?;
    Ok(f64::from_le_bytes(buf))
}

fn header_error(e: std::io::Error) -> RangeError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => RangeError::TruncatedHeader,
        _ => RangeError::Io(e),
    }
}

fn decode_f64s(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect()
}

/// Read a mountain range from a byte stream.
///
/// # Errors
/// Rejects streams that end inside the header, declare a dimensionality
/// other than 1, or whose body length does not match the declared cell
/// count.
pub fn read_range<R: Read>(reader: &mut R) -> Result<MountainRange> {
    let ndims = read_u64(reader)?;
    let cells = read_u64(reader)?;
    let t = read_f64(reader)?;
    if ndims != NDIMS {
        return Err(RangeError::UnsupportedDimensions(ndims));
    }

    // Read the rest of the stream before allocating cell arrays, so a
    // corrupt header can't request an absurd allocation.
    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    if body.len() as u128 != cells as u128 * 16 {
        return Err(RangeError::SizeMismatch {
            cells,
            body_bytes: body.len() as u64,
        });
    }

    let split = body.len() / 2;
    let r = decode_f64s(&body[..split]);
    let h = decode_f64s(&body[split..]);
    MountainRange::from_parts(r, h, t)
}

/// Write a mountain range to a byte stream in the `.wo` layout.
pub fn write_range<W: Write>(writer: &mut W, range: &MountainRange) -> Result<()> {
    writer.write_all(&NDIMS.to_le_bytes())?;
    writer.write_all(&(range.size() as u64).to_le_bytes())?;
    writer.write_all(&range.sim_time().to_le_bytes())?;
    for &value in range.uplift_rate() {
        writer.write_all(&value.to_le_bytes())?;
    }
    for &value in range.height() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Read a mountain range from a file.
pub fn read_file(path: &Path) -> Result<MountainRange> {
    let file = File::open(path)?;
    read_range(&mut BufReader::new(file))
}

/// Write a mountain range to a file.
pub fn write_file(range: &MountainRange, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_range(&mut writer, range)?;
    writer.flush()?;
    Ok(())
}
