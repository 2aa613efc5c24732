//! Power feature extraction
//!
//! This module turns a raw meter buffer into the per-sample feature series:
//! - Complex power per channel (voltage times conjugated current)
//! - Real, reactive and apparent power of both channels combined
//! - Power factor of the combined fundamental component
//! - Tick to wall-clock datetime conversion
//! - HF spectrogram transposition into time-major rows

use chrono::{DateTime, Local, Utc};
use ndarray::{s, Array2, Axis, Zip};
use num_complex::Complex64;
use tracing::debug;

use crate::types::{FeatureSeries, MeterBuffer};

/// Extractor turning raw meter buffers into feature series
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract the per-sample feature series from a meter buffer
    pub fn extract(buffer: &MeterBuffer) -> FeatureSeries {
        let power1 = complex_power(&buffer.voltage1, &buffer.current1);
        let power2 = complex_power(&buffer.voltage2, &buffer.current2);

        // Keep only the samples present on both channels.
        let common_len = power1.nrows().min(power2.nrows());
        if common_len < power1.nrows() || common_len < power2.nrows() {
            debug!(
                "channel sample counts differ ({} vs {}), truncating to {}",
                power1.nrows(),
                power2.nrows(),
                common_len
            );
        }
        let power1 = power1.slice(s![..common_len, ..]);
        let power2 = power2.slice(s![..common_len, ..]);

        // Total power per sample, summed over all frequency components.
        let total1 = power1.sum_axis(Axis(1));
        let total2 = power2.sum_axis(Axis(1));

        let real = total1.iter().zip(&total2).map(|(a, b)| a.re + b.re).collect();
        let reactive = total1.iter().zip(&total2).map(|(a, b)| a.im + b.im).collect();
        let apparent = total1
            .iter()
            .zip(&total2)
            .map(|(a, b)| a.norm() + b.norm())
            .collect();

        // Power factor from the fundamental (column 0) of both channels.
        let power_factor = (0..common_len)
            .map(|t| (power1[[t, 0]] + power2[[t, 0]]).arg().cos())
            .collect();

        let mut time_ticks = tick_column(&buffer.time_ticks);
        time_ticks.truncate(common_len);
        let datetimes = to_datetimes(&time_ticks);

        // The HF spectrogram arrives frequency-major; consumers want one row
        // per sample. Its clock is independent of the power samples, so it is
        // never truncated to the common length.
        let hf = buffer
            .hf
            .t()
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();
        let hf_time_ticks = tick_column(&buffer.hf_time_ticks);
        let hf_datetimes = to_datetimes(&hf_time_ticks);

        FeatureSeries {
            real,
            reactive,
            apparent,
            power_factor,
            time_ticks,
            datetimes,
            hf,
            hf_time_ticks,
            hf_datetimes,
            tags: buffer.tags.clone(),
        }
    }
}

/// Complex power of one channel: voltage times conjugated current
///
/// The arrays are aligned on their overlapping shape before multiplying, so
/// a channel whose voltage and current disagree in size degrades to the
/// common prefix instead of panicking.
fn complex_power(voltage: &Array2<Complex64>, current: &Array2<Complex64>) -> Array2<Complex64> {
    let rows = voltage.nrows().min(current.nrows());
    let cols = voltage.ncols().min(current.ncols());
    let volt = voltage.slice(s![..rows, ..cols]);
    let curr = current.slice(s![..rows, ..cols]);
    Zip::from(&volt).and(&curr).map_collect(|&v, &i| v * i.conj())
}

/// First column of a tick array, empty when the array has no columns
fn tick_column(ticks: &Array2<f64>) -> Vec<f64> {
    if ticks.ncols() == 0 {
        return Vec::new();
    }
    ticks.column(0).to_vec()
}

/// Convert unix ticks to local wall-clock datetimes
fn to_datetimes(ticks: &[f64]) -> Vec<DateTime<Local>> {
    ticks.iter().map(|&tick| tick_datetime(tick)).collect()
}

/// Convert one unix tick to a local wall-clock datetime
///
/// Ticks outside the representable datetime range collapse to the epoch.
pub fn tick_datetime(tick: f64) -> DateTime<Local> {
    let secs = tick.floor();
    let nanos = ((tick - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(secs as i64, nanos)
        .unwrap_or_default()
        .with_timezone(&Local)
}
