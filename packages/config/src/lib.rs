#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Engine configuration.
//!
//! The built-in defaults are embedded at compile time from
//! `defaults/default.toml`. A user file is merged on top of them key by
//! key, except that weight tables under `[weights]` are replaced as a
//! whole. The merged document is deserialized with unknown keys rejected
//! and then validated once; every component downstream can rely on a
//! loaded [`EngineConfig`] being well-formed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use urbansight_poi_models::PoiCategory;
use urbansight_scoring_models::Grade;

/// Built-in configuration, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../defaults/default.toml");

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "URBANSIGHT_CONFIG";

/// Allowed deviation of a weight table's sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has unknown keys.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration could not be rendered back to TOML.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A weight table does not sum to 1.0.
    #[error("Weights in '{table}' sum to {sum}, expected 1.0")]
    InvalidWeightConfiguration {
        /// Name of the offending table.
        table: String,
        /// The actual sum.
        sum: f64,
    },

    /// Any other out-of-range or inconsistent value.
    #[error("Invalid configuration: {message}")]
    InvalidValue {
        /// Description of the problem.
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }
}

/// An input to a weighted score.
///
/// Written in configuration as `<category>` for the category's
/// availability score or `<category>_density` for its normalized density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Signal {
    /// Distance-based availability of the category.
    Availability(PoiCategory),
    /// Density of the category relative to its saturation.
    Density(PoiCategory),
}

impl Signal {
    /// The category this signal reads from.
    #[must_use]
    pub const fn category(self) -> PoiCategory {
        match self {
            Self::Availability(category) | Self::Density(category) => category,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Availability(category) => write!(f, "{category}"),
            Self::Density(category) => write!(f, "{category}_density"),
        }
    }
}

impl FromStr for Signal {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, density) = s
            .strip_suffix("_density")
            .map_or((s, false), |name| (name, true));

        let category = name
            .parse::<PoiCategory>()
            .map_err(|_| ConfigError::invalid(format!("Unknown signal '{s}'")))?;

        if !category.is_scored() {
            return Err(ConfigError::invalid(format!(
                "Signal '{s}' does not refer to a scored category"
            )));
        }

        Ok(if density {
            Self::Density(category)
        } else {
            Self::Availability(category)
        })
    }
}

impl TryFrom<String> for Signal {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        signal.to_string()
    }
}

/// Signal weights for one weighted-sum score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<Signal, f64>);

impl WeightTable {
    /// Builds a table from `(signal, weight)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Signal, f64)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Iterates over the table's signals and weights.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, f64)> + '_ {
        self.0.iter().map(|(signal, weight)| (*signal, *weight))
    }

    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

/// Distance-decay settings for availability scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvailabilityConfig {
    /// Slope multiplier applied beyond a category's ideal distance.
    pub edge_decay_factor: f64,
    /// Ideal distance per scored category, in meters.
    pub ideal_distance_m: BTreeMap<PoiCategory, f64>,
}

/// Pedestrian infrastructure normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PedestrianConfig {
    /// Feature density at which the infrastructure term reaches 100.
    pub infrastructure_saturation_per_km2: f64,
}

/// Weights of the three pedestrian score terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PedestrianWeights {
    pub infrastructure: f64,
    pub transport: f64,
    pub sidewalk_coverage: f64,
}

/// Weights of the sub-scores in the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompositeWeights {
    pub walk: f64,
    pub pedestrian: f64,
    pub accessibility: f64,
    pub convenience: f64,
}

/// All weight tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    pub walk: WeightTable,
    pub accessibility: WeightTable,
    pub convenience: WeightTable,
    pub daily_life: WeightTable,
    pub entertainment: WeightTable,
    pub family: WeightTable,
    pub professional: WeightTable,
    pub green_space: WeightTable,
    pub urban_intensity: WeightTable,
    pub pedestrian: PedestrianWeights,
    pub composite: CompositeWeights,
}

impl WeightsConfig {
    /// Returns every signal table with its configuration name.
    #[must_use]
    pub const fn signal_tables(&self) -> [(&'static str, &WeightTable); 9] {
        [
            ("walk", &self.walk),
            ("accessibility", &self.accessibility),
            ("convenience", &self.convenience),
            ("daily_life", &self.daily_life),
            ("entertainment", &self.entertainment),
            ("family", &self.family),
            ("professional", &self.professional),
            ("green_space", &self.green_space),
            ("urban_intensity", &self.urban_intensity),
        ]
    }
}

/// Minimum composite score for a grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeThreshold {
    pub grade: Grade,
    pub min: f64,
}

/// Composite score to letter grade mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsConfig {
    /// Thresholds in descending order of `min`.
    pub grades: Vec<GradeThreshold>,
    /// Grade for scores below every threshold.
    pub floor: Grade,
}

impl ThresholdsConfig {
    /// Maps a composite score to its grade. A score equal to a threshold
    /// receives that threshold's grade.
    #[must_use]
    pub fn grade_for(&self, score: f64) -> Grade {
        self.grades
            .iter()
            .find(|threshold| score >= threshold.min)
            .map_or(self.floor, |threshold| threshold.grade)
    }
}

/// Collection fan-out limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcurrencyConfig {
    pub max_in_flight: usize,
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_ms: u64,
}

impl RetryConfig {
    /// Initial backoff as a [`Duration`].
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Which categories to fetch and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    pub categories: Vec<PoiCategory>,
    /// Budget for a single fetch attempt.
    pub fetch_timeout_ms: u64,
    /// Deadline for the whole analysis request.
    pub request_timeout_ms: u64,
}

impl CollectionConfig {
    /// Per-attempt fetch timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Request-level deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Narrative generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NarrativeConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl NarrativeConfig {
    /// Narrative timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// The complete, validated engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Default search radius in meters.
    pub radius_m: f64,
    pub availability: AvailabilityConfig,
    /// Density per km² at which a density signal reaches 100.
    pub density_saturation_per_km2: BTreeMap<PoiCategory, f64>,
    pub pedestrian: PedestrianConfig,
    pub weights: WeightsConfig,
    pub thresholds: ThresholdsConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub collection: CollectionConfig,
    pub narrative: NarrativeConfig,
}

impl EngineConfig {
    /// Loads the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded defaults are malformed.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_toml_str("")
    }

    /// Parses `content` as a user configuration layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for syntax errors, unknown keys or
    /// mistyped values, and a validation error for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut merged: toml::Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let overlay: toml::Table = toml::from_str(content)?;
        merge_tables(&mut merged, overlay, false);

        let config: Self = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// as [`Self::from_toml_str`].
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, else the file named by `URBANSIGHT_CONFIG`,
    /// else the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the selected configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(env_path) if !env_path.is_empty() => Self::load_from_path(Path::new(&env_path)),
            _ => {
                log::debug!("Using built-in configuration");
                Self::load_default()
            }
        }
    }

    /// Returns a copy with the search radius replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `radius_m` is not a
    /// positive finite number.
    pub fn with_radius(mut self, radius_m: f64) -> Result<Self, ConfigError> {
        check_positive("radius_m", radius_m)?;
        self.radius_m = radius_m;
        Ok(self)
    }

    /// Ideal distance for `category`, in meters.
    #[must_use]
    pub fn ideal_distance_m(&self, category: PoiCategory) -> Option<f64> {
        self.availability.ideal_distance_m.get(&category).copied()
    }

    /// Density saturation for `category`, per km².
    #[must_use]
    pub fn density_saturation(&self, category: PoiCategory) -> Option<f64> {
        self.density_saturation_per_km2.get(&category).copied()
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TomlSerialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks every range and consistency constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeightConfiguration`] for a weight
    /// table that does not sum to 1.0 and [`ConfigError::InvalidValue`]
    /// for any other violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("radius_m", self.radius_m)?;

        let decay = self.availability.edge_decay_factor;
        if !decay.is_finite() || decay < 1.0 {
            return Err(ConfigError::invalid(format!(
                "availability.edge_decay_factor must be >= 1, got {decay}"
            )));
        }

        for category in PoiCategory::scored() {
            let ideal = self.ideal_distance_m(*category).ok_or_else(|| {
                ConfigError::invalid(format!("Missing ideal distance for {category}"))
            })?;
            check_positive(&format!("availability.ideal_distance_m.{category}"), ideal)?;

            let saturation = self.density_saturation(*category).ok_or_else(|| {
                ConfigError::invalid(format!("Missing density saturation for {category}"))
            })?;
            check_positive(&format!("density_saturation_per_km2.{category}"), saturation)?;
        }

        check_positive(
            "pedestrian.infrastructure_saturation_per_km2",
            self.pedestrian.infrastructure_saturation_per_km2,
        )?;

        for (name, table) in self.weights.signal_tables() {
            check_weights(name, table.iter().map(|(_, weight)| weight))?;
        }
        let pedestrian = &self.weights.pedestrian;
        check_weights(
            "pedestrian",
            [
                pedestrian.infrastructure,
                pedestrian.transport,
                pedestrian.sidewalk_coverage,
            ],
        )?;
        let composite = &self.weights.composite;
        check_weights(
            "composite",
            [
                composite.walk,
                composite.pedestrian,
                composite.accessibility,
                composite.convenience,
            ],
        )?;

        self.validate_thresholds()?;

        if self.concurrency.max_in_flight == 0 {
            return Err(ConfigError::invalid(
                "concurrency.max_in_flight must be at least 1",
            ));
        }

        let collection = &self.collection;
        if collection.categories.is_empty() {
            return Err(ConfigError::invalid(
                "collection.categories must not be empty",
            ));
        }
        for (i, category) in collection.categories.iter().enumerate() {
            if *category == PoiCategory::Other {
                return Err(ConfigError::invalid(
                    "collection.categories cannot include 'other'",
                ));
            }
            if collection.categories[..i].contains(category) {
                return Err(ConfigError::invalid(format!(
                    "collection.categories lists '{category}' twice"
                )));
            }
        }
        if collection.fetch_timeout_ms == 0 || collection.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("collection timeouts must be positive"));
        }
        if self.narrative.timeout_ms == 0 {
            return Err(ConfigError::invalid("narrative.timeout_ms must be positive"));
        }

        Ok(())
    }

    fn validate_thresholds(&self) -> Result<(), ConfigError> {
        let thresholds = &self.thresholds;
        let mut previous = f64::INFINITY;

        for (i, threshold) in thresholds.grades.iter().enumerate() {
            if !(0.0..=100.0).contains(&threshold.min) {
                return Err(ConfigError::invalid(format!(
                    "Threshold for grade {} must be within [0, 100], got {}",
                    threshold.grade, threshold.min
                )));
            }
            if threshold.min >= previous {
                return Err(ConfigError::invalid(
                    "thresholds.grades must be in strictly descending order of min",
                ));
            }
            if threshold.grade == thresholds.floor
                || thresholds.grades[..i]
                    .iter()
                    .any(|t| t.grade == threshold.grade)
            {
                return Err(ConfigError::invalid(format!(
                    "Grade {} appears more than once in thresholds",
                    threshold.grade
                )));
            }
            previous = threshold.min;
        }

        Ok(())
    }
}

/// Merges `overlay` into `base`. Nested tables merge recursively, except
/// that children of `weights` are replaced wholesale.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table, replace_children: bool) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) if !replace_children => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    let replace = key == "weights";
                    merge_tables(existing, incoming, replace);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}

fn check_weights(table: &str, weights: impl IntoIterator<Item = f64>) -> Result<(), ConfigError> {
    let mut sum = 0.0;
    for weight in weights {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::invalid(format!(
                "Weight table '{table}' contains invalid weight {weight}"
            )));
        }
        sum += weight;
    }

    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::InvalidWeightConfiguration {
            table: table.to_string(),
            sum,
        });
    }

    Ok(())
}
