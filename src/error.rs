//! Error types for Wattlens

use ndarray_npy::ReadNpzError;
use thiserror::Error;

use crate::dataset::Split;

/// Errors that can occur while loading or processing meter recordings
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Channel {channel}: voltage shape {voltage:?} and current shape {current:?} do not form a usable pair")]
    ChannelShapeMismatch {
        channel: &'static str,
        voltage: (usize, usize),
        current: (usize, usize),
    },

    #[error("Tick array {clock}: shape {ticks:?} cannot clock {samples} samples")]
    TickShapeMismatch {
        clock: &'static str,
        ticks: (usize, usize),
        samples: usize,
    },

    #[error("Tagging arrays disagree in length: ids {ids}, names {names}, on {on}, off {off}")]
    TagShapeMismatch {
        ids: usize,
        names: usize,
        on: usize,
        off: usize,
    },

    #[error("Tag name at index {0} is not valid UTF-8")]
    InvalidTagName(usize),

    #[error("Pattern grid {rows}x{cols} has no interior cells")]
    EmptyHistogram { rows: usize, cols: usize },

    #[error("Unknown house: {0}")]
    UnknownHouse(String),

    #[error("Recording index {index} out of range for house {house}: {split} split has {available} files")]
    RecordingIndex {
        house: String,
        split: Split,
        index: usize,
        available: usize,
    },

    #[error("Failed to read recording container: {0}")]
    Container(#[from] ReadNpzError),

    #[error("Invalid dataset table: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
