//! The assembled analysis report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use urbansight_poi_models::{Coordinate, PoiCategory, PointOfInterest};
use urbansight_scoring_models::{Highlights, ScoreBreakdown, SpatialSummary};
use uuid::Uuid;

use crate::{CategoryFailure, Degradation};

/// Which categories were fetched successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStatus {
    pub requested: Vec<PoiCategory>,
    pub succeeded: Vec<PoiCategory>,
    pub failed: Vec<CategoryFailure>,
}

/// What happened to the optional narrative stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NarrativeStatus {
    Generated,
    Unavailable,
    /// Disabled in configuration or no generator configured.
    Skipped,
}

/// Outcome record for the optional stages and recovered errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatus {
    pub collection: CollectionStatus,
    pub narrative: NarrativeStatus,
    pub degradations: Vec<Degradation>,
}

impl AnalysisStatus {
    /// Whether every stage completed without degradation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.degradations.is_empty()
    }
}

/// Everything produced for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// The address as requested.
    pub address: String,
    /// The geocoder's canonical form of the address.
    pub matched_address: Option<String>,
    pub coordinate: Coordinate,
    pub radius_m: f64,
    pub pois: Vec<PointOfInterest>,
    pub summary: SpatialSummary,
    pub scores: ScoreBreakdown,
    pub highlights: Highlights,
    pub narrative: Option<String>,
    pub status: AnalysisStatus,
}

impl AnalysisReport {
    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
