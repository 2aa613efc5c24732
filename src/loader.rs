//! Recording container loading
//!
//! Recordings are zip archives of named arrays, one entry per meter field.
//! This module reads them into [`MeterBuffer`]s, validating the shape
//! contracts the extractor relies on, and offers one-call helpers that go
//! straight from a container (or a dataset table entry) to a feature series.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use ndarray::{Array, Array1, Array2, Dimension};
use ndarray_npy::{NpzReader, ReadableElement};
use num_complex::Complex64;
use tracing::debug;

use crate::dataset::{DatasetConfig, Split};
use crate::error::MeterError;
use crate::power::FeatureExtractor;
use crate::types::{FeatureSeries, MeterBuffer, TagRecord};

/// Entry names of the optional tagging group
const TAG_FIELDS: [&str; 4] = ["tag_id", "tag_name", "tag_on", "tag_off"];

/// Read one recording container into a raw meter buffer
pub fn read_recording(path: impl AsRef<Path>) -> Result<MeterBuffer, MeterError> {
    let path = path.as_ref();
    debug!("reading recording container {}", path.display());

    let file = File::open(path)?;
    let mut npz = NpzReader::new(file)?;
    let entries = entry_map(&mut npz)?;

    let voltage1: Array2<Complex64> = read_entry(&mut npz, &entries, "voltage1")?;
    let current1: Array2<Complex64> = read_entry(&mut npz, &entries, "current1")?;
    let voltage2: Array2<Complex64> = read_entry(&mut npz, &entries, "voltage2")?;
    let current2: Array2<Complex64> = read_entry(&mut npz, &entries, "current2")?;
    let time_ticks: Array2<f64> = read_entry(&mut npz, &entries, "time_ticks")?;
    let hf: Array2<f64> = read_entry(&mut npz, &entries, "hf")?;
    let hf_time_ticks: Array2<f64> = read_entry(&mut npz, &entries, "hf_time_ticks")?;

    check_channel("channel 1", &voltage1, &current1)?;
    check_channel("channel 2", &voltage2, &current2)?;
    check_clock(
        "time_ticks",
        &time_ticks,
        voltage1.nrows().min(voltage2.nrows()),
    )?;
    check_hf_clock(&hf_time_ticks, &hf)?;

    let tags = read_tags(&mut npz, &entries)?;
    debug!(
        "loaded {} spectral samples, {} HF samples, tagged: {}",
        voltage1.nrows(),
        hf.ncols(),
        tags.is_some()
    );

    Ok(MeterBuffer {
        voltage1,
        current1,
        voltage2,
        current2,
        time_ticks,
        hf,
        hf_time_ticks,
        tags,
    })
}

/// Read a recording container and extract its feature series in one call
pub fn load_features(path: impl AsRef<Path>) -> Result<FeatureSeries, MeterError> {
    let buffer = read_recording(path)?;
    Ok(FeatureExtractor::extract(&buffer))
}

/// Load one recording referenced by a dataset table
pub fn load_split(
    config: &DatasetConfig,
    house: &str,
    split: Split,
    index: usize,
) -> Result<FeatureSeries, MeterError> {
    let path = config.recording_path(house, split, index)?;
    load_features(path)
}

/// Map archive entries to their stored names, keyed by logical field name
///
/// Producers may store entries with or without a `.npy` suffix; lookups go
/// through the stored spelling.
fn entry_map<R: Read + Seek>(
    npz: &mut NpzReader<R>,
) -> Result<HashMap<String, String>, MeterError> {
    let mut entries = HashMap::new();
    for stored in npz.names()? {
        let field = stored.strip_suffix(".npy").unwrap_or(&stored).to_string();
        entries.entry(field).or_insert(stored);
    }
    Ok(entries)
}

/// Read one named array entry, failing when the field is absent
fn read_entry<R, A, D>(
    npz: &mut NpzReader<R>,
    entries: &HashMap<String, String>,
    field: &str,
) -> Result<Array<A, D>, MeterError>
where
    R: Read + Seek,
    A: ReadableElement,
    D: Dimension,
{
    let stored = entries
        .get(field)
        .ok_or_else(|| MeterError::MissingField(field.to_string()))?;
    Ok(npz.by_name(stored)?)
}

/// Validate the shape contract of one voltage/current pair
///
/// Both arrays must agree exactly, and non-empty channels must carry at
/// least one frequency component.
fn check_channel(
    channel: &'static str,
    voltage: &Array2<Complex64>,
    current: &Array2<Complex64>,
) -> Result<(), MeterError> {
    let v = voltage.dim();
    let c = current.dim();
    if v != c || (v.0 > 0 && v.1 == 0) {
        return Err(MeterError::ChannelShapeMismatch {
            channel,
            voltage: v,
            current: c,
        });
    }
    Ok(())
}

/// Validate that the power clock covers the aligned sample count
///
/// The clock may outrun the aligned channels (the extractor clips it) but
/// must never fall short of them, and it needs a data column once samples
/// exist.
fn check_clock(
    clock: &'static str,
    ticks: &Array2<f64>,
    samples: usize,
) -> Result<(), MeterError> {
    if ticks.nrows() < samples || (samples > 0 && ticks.ncols() == 0) {
        return Err(MeterError::TickShapeMismatch {
            clock,
            ticks: ticks.dim(),
            samples,
        });
    }
    Ok(())
}

/// Validate the HF clock, which is copied verbatim: one tick per HF sample
fn check_hf_clock(ticks: &Array2<f64>, hf: &Array2<f64>) -> Result<(), MeterError> {
    let samples = hf.ncols();
    if ticks.nrows() != samples || (samples > 0 && ticks.ncols() == 0) {
        return Err(MeterError::TickShapeMismatch {
            clock: "hf_time_ticks",
            ticks: ticks.dim(),
            samples,
        });
    }
    Ok(())
}

/// Read the optional tagging group
///
/// All four tagging entries appear together or not at all; a partial group
/// is malformed. Tag names are fixed-width rows of zero-padded UTF-8.
fn read_tags<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    entries: &HashMap<String, String>,
) -> Result<Option<Vec<TagRecord>>, MeterError> {
    if TAG_FIELDS.iter().all(|field| !entries.contains_key(*field)) {
        return Ok(None);
    }

    let ids: Array1<i64> = read_entry(npz, entries, "tag_id")?;
    let names: Array2<u8> = read_entry(npz, entries, "tag_name")?;
    let on_times: Array1<f64> = read_entry(npz, entries, "tag_on")?;
    let off_times: Array1<f64> = read_entry(npz, entries, "tag_off")?;

    if names.nrows() != ids.len() || on_times.len() != ids.len() || off_times.len() != ids.len() {
        return Err(MeterError::TagShapeMismatch {
            ids: ids.len(),
            names: names.nrows(),
            on: on_times.len(),
            off: off_times.len(),
        });
    }

    let mut tags = Vec::with_capacity(ids.len());
    for (index, row) in names.rows().into_iter().enumerate() {
        let bytes: Vec<u8> = row.iter().copied().take_while(|&b| b != 0).collect();
        let device_name =
            String::from_utf8(bytes).map_err(|_| MeterError::InvalidTagName(index))?;
        tags.push(TagRecord {
            device_id: ids[index],
            device_name,
            on_time: on_times[index],
            off_time: off_times[index],
        });
    }
    Ok(Some(tags))
}
