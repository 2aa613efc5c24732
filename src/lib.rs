//! Wattlens - Feature extraction engine for household power-meter recordings
//!
//! Wattlens turns raw spectral meter recordings into per-sample power
//! features through a deterministic pipeline: container loading → channel
//! alignment → power computation → display windowing.
//!
//! ## Modules
//!
//! - **Power Pipeline**: Load recording containers and extract real,
//!   reactive and apparent power, power factor and HF spectrogram rows
//! - **Pattern Module**: Fold a sample series into a local pattern
//!   histogram, a 256-bin texture fingerprint
//!
//! The two are independent: the pattern encoder accepts any sample slice,
//! most commonly one of the extracted power series.

pub mod dataset;
pub mod error;
pub mod loader;
pub mod lph;
pub mod power;
pub mod types;

mod window;

pub use dataset::{DatasetConfig, HouseFiles, Split};
pub use error::MeterError;
pub use loader::{load_features, load_split, read_recording};
pub use power::{tick_datetime, FeatureExtractor};
pub use types::{FeatureSeries, MeterBuffer, TagRecord};

// Pattern histogram exports
pub use lph::{GridMode, PatternEncoder, PatternHistogram, DEFAULT_GRID_WIDTH, PATTERN_BINS};
