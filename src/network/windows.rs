// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use ndarray::{Array2, ArrayView2, s};

use crate::error::{LoopTeError, Result};

/// First sample index of each window.
///
/// Starts are spread evenly from the beginning of the series so that the last
/// window ends on the last sample. A single window covers the most recent
/// `window_len` samples.
pub fn window_starts(n_samples: usize, window_len: usize, window_count: usize) -> Result<Vec<usize>> {
    if window_len == 0 {
        return Err(LoopTeError::invalid("window_len", "must be at least 1"));
    }
    if window_count == 0 {
        return Err(LoopTeError::invalid("window_count", "must be at least 1"));
    }
    if window_len > n_samples {
        return Err(LoopTeError::InsufficientData {
            required: window_len,
            available: n_samples,
        });
    }
    let span = n_samples - window_len;
    if window_count == 1 {
        return Ok(vec![span]);
    }
    Ok((0..window_count)
        .map(|i| (i * span + (window_count - 1) / 2) / (window_count - 1))
        .collect())
}

/// Splits `data` (`variables × samples`) into `window_count` windows of
/// `window_len` samples for transient analysis. Windows may overlap.
pub fn split_windows(
    data: ArrayView2<'_, f64>,
    window_len: usize,
    window_count: usize,
) -> Result<Vec<Array2<f64>>> {
    let starts = window_starts(data.ncols(), window_len, window_count)?;
    Ok(starts
        .into_iter()
        .map(|start| data.slice(s![.., start..start + window_len]).to_owned())
        .collect())
}
