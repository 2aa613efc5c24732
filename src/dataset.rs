//! Dataset tables mapping houses to their recording files
//!
//! A dataset table is a small JSON document listing, per house, which
//! recording files belong to the training (tagged) split and which to the
//! testing split. Keeping the table external lets the same binary point at
//! differently laid out corpora.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MeterError;

/// Which file table of a house to read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Training,
    Testing,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Testing => "testing",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recording file lists for one house
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseFiles {
    /// Tagged recordings used for training
    #[serde(default)]
    pub training: Vec<String>,
    /// Untagged recordings used for testing
    #[serde(default)]
    pub testing: Vec<String>,
}

impl HouseFiles {
    /// File list for the given split
    pub fn files(&self, split: Split) -> &[String] {
        match split {
            Split::Training => &self.training,
            Split::Testing => &self.testing,
        }
    }
}

/// Dataset table: corpus root plus per-house file lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory containing one subdirectory per house
    pub root: PathBuf,
    /// File tables keyed by house identifier (e.g. "h1")
    pub houses: BTreeMap<String, HouseFiles>,
}

impl DatasetConfig {
    /// Parse a dataset table from JSON text
    pub fn from_json(json: &str) -> Result<Self, MeterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a dataset table from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MeterError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// File lists for one house
    pub fn house(&self, house: &str) -> Result<&HouseFiles, MeterError> {
        self.houses
            .get(house)
            .ok_or_else(|| MeterError::UnknownHouse(house.to_string()))
    }

    /// Path of one recording, laid out as `<root>/<house>/<file>`
    pub fn recording_path(
        &self,
        house: &str,
        split: Split,
        index: usize,
    ) -> Result<PathBuf, MeterError> {
        let files = self.house(house)?.files(split);
        let file = files.get(index).ok_or_else(|| MeterError::RecordingIndex {
            house: house.to_string(),
            split,
            index,
            available: files.len(),
        })?;
        Ok(self.root.join(house).join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_test_config() -> DatasetConfig {
        let json = r#"{
            "root": "/data/corpus",
            "houses": {
                "h1": { "training": ["t1.npz", "t2.npz"], "testing": ["x1.npz"] },
                "h2": { "training": ["a.npz"] }
            }
        }"#;
        DatasetConfig::from_json(json).unwrap()
    }

    #[test]
    fn test_parse_table() {
        let config = make_test_config();
        assert_eq!(config.root, PathBuf::from("/data/corpus"));
        assert_eq!(config.houses.len(), 2);
        assert_eq!(config.house("h1").unwrap().training.len(), 2);
        // Missing split lists default to empty
        assert!(config.house("h2").unwrap().testing.is_empty());
    }

    #[test]
    fn test_recording_path() {
        let config = make_test_config();
        let path = config.recording_path("h1", Split::Training, 1).unwrap();
        assert_eq!(path, PathBuf::from("/data/corpus/h1/t2.npz"));
        let path = config.recording_path("h1", Split::Testing, 0).unwrap();
        assert_eq!(path, PathBuf::from("/data/corpus/h1/x1.npz"));
    }

    #[test]
    fn test_unknown_house() {
        let config = make_test_config();
        let err = config.recording_path("h9", Split::Training, 0).unwrap_err();
        assert!(matches!(err, MeterError::UnknownHouse(house) if house == "h9"));
    }

    #[test]
    fn test_recording_index_out_of_range() {
        let config = make_test_config();
        let err = config.recording_path("h2", Split::Training, 3).unwrap_err();
        match err {
            MeterError::RecordingIndex {
                house,
                split,
                index,
                available,
            } => {
                assert_eq!(house, "h2");
                assert_eq!(split, Split::Training);
                assert_eq!(index, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_split_round_trip() {
        let json = serde_json::to_string(&Split::Training).unwrap();
        assert_eq!(json, "\"training\"");
        let split: Split = serde_json::from_str("\"testing\"").unwrap();
        assert_eq!(split, Split::Testing);
        assert_eq!(Split::Testing.to_string(), "testing");
    }
}
