//! Local pattern histogram computation
//!
//! Folds a one-dimensional sample series into a grid and encodes every
//! interior cell's relation to its eight neighbors as a byte code, yielding
//! a 256-bin probability histogram. The histogram is a texture fingerprint
//! of the series, insensitive to absolute signal level.

use serde::{Deserialize, Serialize};

use crate::error::MeterError;

/// Number of histogram bins, one per 8-bit neighborhood code
pub const PATTERN_BINS: usize = 256;

/// Default grid width used when folding long recordings
pub const DEFAULT_GRID_WIDTH: usize = 100;

/// Neighbor offsets (row, column) in bit order: starting at the left
/// neighbor and circling through the lower row first
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// How a one-dimensional series is folded into a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Rows of a fixed width
    Rectangular { width: usize },
    /// Largest square that fits, side `floor(sqrt(n))`
    Square,
}

/// Normalized histogram over the 256 neighborhood codes
///
/// Bin `k` holds the fraction of interior grid cells whose code is `k`;
/// the bins sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternHistogram {
    /// Bin values indexed by code (always `PATTERN_BINS` long)
    pub bins: Vec<f64>,
}

/// Encoder turning sample series into pattern histograms
pub struct PatternEncoder;

impl PatternEncoder {
    /// Encode a sample series into its normalized pattern histogram
    ///
    /// Samples past the last full grid row are dropped. Returns
    /// [`MeterError::EmptyHistogram`] when the grid is too small to
    /// contribute any interior cells.
    pub fn encode(samples: &[f64], mode: GridMode) -> Result<PatternHistogram, MeterError> {
        let (rows, cols) = grid_shape(samples.len(), mode);
        let grid = SampleGrid {
            data: &samples[..rows * cols],
            cols,
        };

        let mut counts = [0u64; PATTERN_BINS];
        let mut total = 0u64;
        // Interior band: the top and left margins are one cell wide, the
        // bottom and right margins two. The asymmetry is deliberate; widening
        // the band breaks comparisons against previously computed histograms.
        for row in 1..rows.saturating_sub(2) {
            for col in 1..cols.saturating_sub(2) {
                counts[grid.code(row, col) as usize] += 1;
                total += 1;
            }
        }
        if total == 0 {
            return Err(MeterError::EmptyHistogram { rows, cols });
        }

        let bins = counts
            .iter()
            .map(|&count| count as f64 / total as f64)
            .collect();
        Ok(PatternHistogram { bins })
    }
}

/// Grid dimensions for a series of `len` samples folded by `mode`
fn grid_shape(len: usize, mode: GridMode) -> (usize, usize) {
    match mode {
        GridMode::Rectangular { width } => {
            if width == 0 {
                (0, 0)
            } else {
                (len / width, width)
            }
        }
        GridMode::Square => {
            let side = (len as f64).sqrt() as usize;
            (side, side)
        }
    }
}

/// Borrowed view of a sample series folded into rows of `cols` cells
struct SampleGrid<'a> {
    data: &'a [f64],
    cols: usize,
}

impl SampleGrid<'_> {
    fn at(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Neighborhood code of an interior cell
    ///
    /// Bit `k` is set when neighbor `k` sits at or above the center value.
    fn code(&self, row: usize, col: usize) -> u8 {
        let center = self.at(row, col);
        let mut code = 0u8;
        for (bit, &(dr, dc)) in NEIGHBOR_OFFSETS.iter().enumerate() {
            let r = (row as isize + dr) as usize;
            let c = (col as isize + dc) as usize;
            if self.at(r, c) - center >= 0.0 {
                code |= 1 << bit;
            }
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constant_series_all_ties() {
        // 5x5 grid of equal values: every neighbor ties, every bit set.
        let samples = vec![1.0; 25];
        let histogram = PatternEncoder::encode(&samples, GridMode::Square).unwrap();

        assert_eq!(histogram.bins.len(), PATTERN_BINS);
        assert_eq!(histogram.bins[255], 1.0);
        let sum: f64 = histogram.bins.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_codes() {
        // 4x4 ramp has exactly one interior cell, (1, 1) with value 5. Its
        // left neighbor (4) falls below it; the lower row (8, 9, 10) and the
        // right neighbor (6) sit above; the upper row (0, 1, 2) falls below.
        // Set bits 1-4: code 30.
        let samples: Vec<f64> = (0..16).map(f64::from).collect();
        let histogram =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 4 }).unwrap();

        assert_eq!(histogram.bins[30], 1.0);
        assert_eq!(histogram.bins.iter().filter(|&&b| b > 0.0).count(), 1);
    }

    #[test]
    fn test_gradient_wide_grid() {
        // 400 samples at width 100: a 4x100 ramp rising by 1 per column and
        // 100 per row. Every interior cell sees the same neighborhood, so
        // the whole mass lands in code 30.
        let samples: Vec<f64> = (0..400).map(f64::from).collect();
        let histogram =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 100 }).unwrap();

        assert_eq!(histogram.bins[30], 1.0);
    }

    #[test]
    fn test_exact_three_rows_at_default_width() {
        // 300 samples fill three rows of 100, one row short of an interior.
        let samples: Vec<f64> = (0..300).map(f64::from).collect();
        let err =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 100 }).unwrap_err();
        assert!(matches!(err, MeterError::EmptyHistogram { rows: 3, cols: 100 }));
    }

    #[test]
    fn test_remainder_dropped() {
        let full: Vec<f64> = (0..16).map(f64::from).collect();
        let mut padded = full.clone();
        padded.extend([99.0, -7.0, 3.5]);

        let mode = GridMode::Rectangular { width: 4 };
        let from_full = PatternEncoder::encode(&full, mode).unwrap();
        let from_padded = PatternEncoder::encode(&padded, mode).unwrap();
        assert_eq!(from_full, from_padded);
    }

    #[test]
    fn test_square_matches_rectangular_prefix() {
        // 30 samples fold to a 5x5 square, same as the first 25 at width 5.
        let samples: Vec<f64> = (0..30).map(|i| ((i * 37) % 17) as f64).collect();
        let square = PatternEncoder::encode(&samples, GridMode::Square).unwrap();
        let rect =
            PatternEncoder::encode(&samples[..25], GridMode::Rectangular { width: 5 }).unwrap();
        assert_eq!(square, rect);
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let samples: Vec<f64> = (0..100).map(|i| ((i * 37) % 17) as f64).collect();
        let histogram =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 10 }).unwrap();

        let sum: f64 = histogram.bins.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(histogram.bins.iter().all(|&b| (0.0..=1.0).contains(&b)));
    }

    #[test]
    fn test_three_row_grid_has_no_interior() {
        // Three rows leave no room between the one-cell top margin and the
        // two-cell bottom margin.
        let samples = vec![1.0; 12];
        let err = PatternEncoder::encode(&samples, GridMode::Rectangular { width: 4 }).unwrap_err();
        assert!(matches!(err, MeterError::EmptyHistogram { rows: 3, cols: 4 }));
    }

    #[test]
    fn test_too_few_samples_for_width() {
        let samples = vec![1.0; 50];
        let err =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 100 }).unwrap_err();
        assert!(matches!(err, MeterError::EmptyHistogram { rows: 0, cols: 100 }));
    }

    #[test]
    fn test_empty_series() {
        let err = PatternEncoder::encode(&[], GridMode::Square).unwrap_err();
        assert!(matches!(err, MeterError::EmptyHistogram { rows: 0, cols: 0 }));
    }

    #[test]
    fn test_zero_width_rejected() {
        let samples = vec![1.0; 16];
        let err =
            PatternEncoder::encode(&samples, GridMode::Rectangular { width: 0 }).unwrap_err();
        assert!(matches!(err, MeterError::EmptyHistogram { rows: 0, cols: 0 }));
    }

    #[test]
    fn test_grid_mode_serde() {
        let json = serde_json::to_string(&GridMode::Rectangular { width: 100 }).unwrap();
        assert_eq!(json, r#"{"rectangular":{"width":100}}"#);
        let mode: GridMode = serde_json::from_str(r#""square""#).unwrap();
        assert_eq!(mode, GridMode::Square);
    }
}
