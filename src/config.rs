use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::{LakehouseError, Result};

/// Pipeline configuration, loaded from TOML with environment overrides.
///
/// Every section has defaults so an absent or partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub source: SourceConfig,
    pub columns: ColumnsConfig,
    pub cleaning: CleaningConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path prefix for the input file and the `delta/` snapshot directory
    pub base_path: String,
    pub raw_snapshot: String,
    pub clean_snapshot: String,
    pub summary_snapshot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: constants::DEFAULT_BASE_PATH.to_string(),
            raw_snapshot: constants::RAW_SNAPSHOT.to_string(),
            clean_snapshot: constants::CLEAN_SNAPSHOT.to_string(),
            summary_snapshot: constants::SUMMARY_SNAPSHOT.to_string(),
        }
    }
}

impl StorageConfig {
    /// Directory holding all snapshots
    pub fn snapshot_root(&self) -> PathBuf {
        Path::new(&self.base_path).join("delta")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Defaults to `<base_path>/taxi_tripdata.csv`
    pub input_path: Option<String>,
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub fare: String,
    pub distance: String,
    pub pickup: String,
    pub dropoff: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            fare: constants::FARE_COLUMN.to_string(),
            distance: constants::DISTANCE_COLUMN.to_string(),
            pickup: constants::PICKUP_COLUMN.to_string(),
            dropoff: constants::DROPOFF_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    /// Trips strictly shorter than this are `short`
    pub short_below: f64,
    /// Remaining trips strictly shorter than this are `medium`, the rest `long`
    pub medium_below: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            lower_percentile: 0.01,
            upper_percentile: 0.99,
            short_below: 1.0,
            medium_below: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sample_rows: usize,
    pub top_routes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_rows: 5,
            top_routes: 10,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `lakehouse.toml` in the
    /// working directory is used when present, defaults otherwise. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LakehouseError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        info!("Loaded config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `LAKEHOUSE_BASE_PATH` and `LAKEHOUSE_INPUT_PATH` when set.
    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var(constants::ENV_BASE_PATH) {
            if !base.trim().is_empty() {
                self.storage.base_path = base;
            }
        }
        if let Ok(input) = std::env::var(constants::ENV_INPUT_PATH) {
            if !input.trim().is_empty() {
                self.source.input_path = Some(input);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.cleaning;
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        if !in_unit(c.lower_percentile) || !in_unit(c.upper_percentile) {
            return Err(LakehouseError::Config(format!(
                "percentiles must lie in [0, 1], got {} and {}",
                c.lower_percentile, c.upper_percentile
            )));
        }
        if c.lower_percentile > c.upper_percentile {
            return Err(LakehouseError::Config(format!(
                "lower percentile {} exceeds upper percentile {}",
                c.lower_percentile, c.upper_percentile
            )));
        }
        if !(c.short_below < c.medium_below) {
            return Err(LakehouseError::Config(format!(
                "short_below ({}) must be less than medium_below ({})",
                c.short_below, c.medium_below
            )));
        }
        if !self.source.delimiter.is_ascii() {
            return Err(LakehouseError::Config(format!(
                "delimiter '{}' is not a single ASCII character",
                self.source.delimiter
            )));
        }
        let s = &self.storage;
        let names = [&s.raw_snapshot, &s.clean_snapshot, &s.summary_snapshot];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(LakehouseError::Config(
                "snapshot names must not be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[1] == names[2] || names[0] == names[2] {
            return Err(LakehouseError::Config(
                "raw, clean and summary snapshots must have distinct names".to_string(),
            ));
        }
        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        match &self.source.input_path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.storage.base_path).join(constants::DEFAULT_INPUT_FILE),
        }
    }

    pub fn delimiter(&self) -> u8 {
        // validate() guarantees ASCII
        self.source.delimiter as u8
    }
}
