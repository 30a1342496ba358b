#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Statistics and score types shared by the metrics calculator, the score
//! composer and the analysis report.
//!
//! Every value here is computed once by its producing stage and never
//! mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use urbansight_poi_models::PoiCategory;

/// Walking speed used for travel-time estimates (5 km/h).
pub const WALKING_METERS_PER_MINUTE: f64 = 5000.0 / 60.0;

/// Distance and density statistics for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatistics {
    /// The category described.
    pub category: PoiCategory,
    /// Number of POIs within the radius.
    pub count: usize,
    /// Distance to the nearest POI in meters, or the radius when none.
    pub nearest_m: f64,
    /// Mean distance in meters, or the radius when none.
    pub mean_m: f64,
    /// POIs per square kilometer of the search disc.
    pub density_per_km2: f64,
    /// Identifier of the nearest POI.
    pub nearest_id: Option<String>,
    /// Walking time to the nearest POI at 5 km/h.
    pub walking_minutes: f64,
}

impl CategoryStatistics {
    /// Sentinel record for a category with no POIs within `radius_m`.
    #[must_use]
    pub fn empty(category: PoiCategory, radius_m: f64) -> Self {
        Self {
            category,
            count: 0,
            nearest_m: radius_m,
            mean_m: radius_m,
            density_per_km2: 0.0,
            nearest_id: None,
            walking_minutes: radius_m / WALKING_METERS_PER_MINUTE,
        }
    }

    /// Whether no POI of this category was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Pedestrian infrastructure found around the origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSummary {
    /// Sidewalks, crossings, pedestrian ways, tactile paving, lowered kerbs.
    pub feature_count: usize,
    /// Pedestrian features per square kilometer.
    pub feature_density_per_km2: f64,
    /// Road segments carrying sidewalk data.
    pub surveyed_roads: usize,
    /// Surveyed road segments explicitly tagged without sidewalks.
    pub roads_missing_sidewalk: usize,
}

/// Output of the spatial metrics calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialSummary {
    /// Search radius in meters.
    pub radius_m: f64,
    /// One record per scored category, in enumeration order.
    pub categories: Vec<CategoryStatistics>,
    /// Pedestrian infrastructure summary.
    pub infrastructure: InfrastructureSummary,
    /// Scored POIs within the radius.
    pub total_pois: usize,
}

impl SpatialSummary {
    /// Returns the statistics for `category`, if it is a scored category.
    #[must_use]
    pub fn get(&self, category: PoiCategory) -> Option<&CategoryStatistics> {
        self.categories.iter().find(|s| s.category == category)
    }
}

/// Letter grade for the composite score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Returns all variants of this enum, best first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::C, Self::D, Self::F]
    }
}

/// How evenly amenities are spread across categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityMetrics {
    /// Normalized Shannon entropy in `[0, 1]`.
    pub index: f64,
    /// Number of scored categories with at least one POI.
    pub categories_present: usize,
    /// Category with the most POIs.
    pub dominant_category: Option<PoiCategory>,
    /// `100 * min / max` over present categories.
    pub balance_score: f64,
}

/// Lifestyle fit scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleScores {
    pub daily_life: f64,
    pub entertainment: f64,
    pub family: f64,
    pub professional: f64,
}

/// All sub-scores and the composite score for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Walk Score in `[0, 100]`.
    pub walk: f64,
    /// Pedestrian infrastructure score in `[0, 100]`.
    pub pedestrian: f64,
    /// Transit and healthcare accessibility in `[0, 100]`.
    pub accessibility: f64,
    /// Everyday convenience in `[0, 100]`.
    pub convenience: f64,
    /// Green space index in `[0, 100]`.
    pub green_space: f64,
    /// Urban intensity in `[0, 100]`.
    pub urban_intensity: f64,
    pub lifestyle: LifestyleScores,
    /// Availability score per scored category.
    pub availability: BTreeMap<PoiCategory, f64>,
    pub diversity: DiversityMetrics,
    /// The composite UrbanSight Score in `[0, 100]`.
    pub composite: f64,
    pub grade: Grade,
}

/// Notable strengths and concerns derived from the scores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlights {
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
}
