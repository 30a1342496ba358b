#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end analysis pipeline.
//!
//! The [`Orchestrator`] resolves an address, collects POIs per category
//! with bounded concurrency and retries, scores the result, optionally
//! asks for a narrative, and assembles an [`AnalysisReport`]. Only a
//! failed geocode or a collection stage where every fetch failed abort a
//! request; everything else is recorded as a [`Degradation`] on the
//! report.

pub mod orchestrator;
pub mod report;
pub mod retry;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use urbansight_poi_models::PoiCategory;

pub use orchestrator::{AnalysisRequest, Orchestrator};
pub use report::{AnalysisReport, AnalysisStatus, CollectionStatus, NarrativeStatus};

/// A category whose fetch failed after all retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFailure {
    pub category: PoiCategory,
    pub reason: String,
}

/// Errors that abort an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request itself is malformed (empty address, bad radius).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// The geocoder returned no match or failed.
    #[error("Could not resolve address '{address}': {reason}")]
    AddressNotResolved {
        /// The address as given.
        address: String,
        /// Why resolution failed.
        reason: String,
    },

    /// Every category fetch failed.
    #[error("All {} category fetches failed", failures.len())]
    AllCategoryFetchesFailed {
        /// Per-category failure reasons.
        failures: Vec<CategoryFailure>,
    },
}

/// A recovered failure, recorded on the report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Degradation {
    /// Some category fetches failed; their statistics are sentinels.
    #[error("Collection failed for {} categories", failed.len())]
    PartialCollectionFailure {
        /// The categories that could not be fetched.
        failed: Vec<CategoryFailure>,
    },

    /// The narrative could not be generated.
    #[error("Narrative unavailable: {reason}")]
    NarrativeUnavailable {
        /// Why no narrative was produced.
        reason: String,
    },
}

/// Pipeline stages.
///
/// `Assembled` and `Failed` are terminal; `Failed` is only reachable from
/// `Geocoding` and `Collecting`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisStage {
    Geocoding,
    Collecting,
    Scoring,
    Narrating,
    Assembled,
    Failed,
}

/// What a single stage produced.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// The stage completed fully.
    Success(T),
    /// The stage produced a usable value but recorded a degradation.
    Degraded(T, Degradation),
    /// The stage cannot produce a value; the request fails.
    Fatal(AnalysisError),
}

impl<T> StageOutcome<T> {
    /// Unpacks the outcome, appending any degradation to `degradations`.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`AnalysisError`], if any.
    pub fn settle(self, degradations: &mut Vec<Degradation>) -> Result<T, AnalysisError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Degraded(value, degradation) => {
                log::warn!("{degradation}");
                degradations.push(degradation);
                Ok(value)
            }
            Self::Fatal(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_collects_degradations() {
        let mut degradations = Vec::new();

        let value = StageOutcome::Success(1).settle(&mut degradations).unwrap();
        assert_eq!(value, 1);
        assert!(degradations.is_empty());

        let value = StageOutcome::Degraded(
            2,
            Degradation::NarrativeUnavailable {
                reason: "timeout".to_string(),
            },
        )
        .settle(&mut degradations)
        .unwrap();
        assert_eq!(value, 2);
        assert_eq!(degradations.len(), 1);

        let err = StageOutcome::<()>::Fatal(AnalysisError::AllCategoryFetchesFailed {
            failures: vec![],
        })
        .settle(&mut degradations);
        assert!(err.is_err());
    }

    #[test]
    fn degradation_serializes_with_kind_tag() {
        let json = serde_json::to_value(Degradation::PartialCollectionFailure {
            failed: vec![CategoryFailure {
                category: PoiCategory::Park,
                reason: "HTTP 503".to_string(),
            }],
        })
        .unwrap();
        assert_eq!(json["kind"], "partialCollectionFailure");
        assert_eq!(json["failed"][0]["category"], "park");
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(AnalysisStage::Collecting.to_string(), "collecting");
        assert_eq!(
            serde_json::to_string(&AnalysisStage::Assembled).unwrap(),
            "\"assembled\""
        );
    }
}
