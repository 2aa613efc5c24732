//! Core types for the Wattlens pipeline
//!
//! This module defines the data structures that flow through the pipeline:
//! raw meter buffers as read from recording containers, appliance tagging
//! records, and the per-sample feature series handed to consumers.

use chrono::{DateTime, Local};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Raw spectral meter recording as stored in a recording container
///
/// Voltage and current arrays are time-major: one row per measurement
/// sample, one column per frequency component (column 0 is the fundamental).
/// The voltage and current arrays of a channel must have identical shape,
/// with at least one component column when they have rows. `time_ticks`
/// must cover at least the shorter channel's sample count and
/// `hf_time_ticks` carry exactly one row per HF sample, each with a data
/// column; [`crate::loader::read_recording`] enforces all of this.
#[derive(Debug, Clone)]
pub struct MeterBuffer {
    /// Channel 1 voltage spectra (samples x components)
    pub voltage1: Array2<Complex64>,
    /// Channel 1 current spectra (samples x components)
    pub current1: Array2<Complex64>,
    /// Channel 2 voltage spectra (samples x components)
    pub voltage2: Array2<Complex64>,
    /// Channel 2 current spectra (samples x components)
    pub current2: Array2<Complex64>,
    /// Unix timestamps of the spectral samples (samples x 1, ticks in column 0)
    pub time_ticks: Array2<f64>,
    /// High-frequency noise spectrogram (frequency bins x samples)
    pub hf: Array2<f64>,
    /// Unix timestamps of the HF samples (samples x 1, ticks in column 0)
    pub hf_time_ticks: Array2<f64>,
    /// Appliance tagging metadata, present only in tagged (training) recordings
    pub tags: Option<Vec<TagRecord>>,
}

/// One appliance tagging interval from a tagged recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Numeric appliance identifier
    pub device_id: i64,
    /// Human-readable appliance name
    pub device_name: String,
    /// Unix timestamp at which the appliance was switched on
    pub on_time: f64,
    /// Unix timestamp at which the appliance was switched off
    pub off_time: f64,
}

/// Per-sample power features extracted from a meter buffer
///
/// All power vectors plus `time_ticks` and `datetimes` share one length:
/// the number of samples common to both channels. The HF spectrogram keeps
/// its own clock (`hf_time_ticks`, `hf_datetimes`) and its own length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSeries {
    /// Real power per sample, both channels combined (watts)
    pub real: Vec<f64>,
    /// Reactive power per sample, both channels combined (VAR)
    pub reactive: Vec<f64>,
    /// Apparent power per sample, sum of per-channel magnitudes (VA)
    pub apparent: Vec<f64>,
    /// Power factor of the combined fundamental, cos(phi)
    pub power_factor: Vec<f64>,
    /// Unix timestamps of the power samples
    pub time_ticks: Vec<f64>,
    /// Local wall-clock datetimes of the power samples
    pub datetimes: Vec<DateTime<Local>>,
    /// HF spectrogram, one row of frequency bins per sample (time-major)
    pub hf: Vec<Vec<f64>>,
    /// Unix timestamps of the HF rows
    pub hf_time_ticks: Vec<f64>,
    /// Local wall-clock datetimes of the HF rows
    pub hf_datetimes: Vec<DateTime<Local>>,
    /// Tagging records carried over from the source buffer
    pub tags: Option<Vec<TagRecord>>,
}
