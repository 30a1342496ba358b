//! The analysis pipeline.
//!
//! An [`Orchestrator`] is shared across requests: it holds no per-request
//! state, so concurrent calls to [`Orchestrator::analyze`] are
//! independent.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::{StreamExt as _, stream};
use tokio::time::Instant;
use urbansight_ai::insight::{
    NarrativeGenerator, NarrativeInput, NarrativeOutcome, request_narrative,
};
use urbansight_config::EngineConfig;
use urbansight_geocoder::{GeocodedAddress, Geocoder};
use urbansight_metrics::compute_statistics;
use urbansight_poi::{PoiProvider, ProviderError, classifier::classify};
use urbansight_poi_models::{Coordinate, PoiCategory, PointOfInterest};
use uuid::Uuid;

use crate::report::{AnalysisReport, AnalysisStatus, CollectionStatus, NarrativeStatus};
use crate::retry::fetch_with_retry;
use crate::{AnalysisError, AnalysisStage, CategoryFailure, Degradation, StageOutcome};

/// A single analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub address: String,
    /// Overrides the configured search radius.
    pub radius_m: Option<f64>,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            radius_m: None,
        }
    }

    #[must_use]
    pub const fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = Some(radius_m);
        self
    }
}

/// Classified, de-duplicated POIs plus per-category fetch status.
struct Collection {
    pois: Vec<PointOfInterest>,
    status: CollectionStatus,
}

impl Collection {
    /// POIs that may feed statistics.
    ///
    /// A failed category keeps its sentinel statistics even when another
    /// fetch returned records that classify into it (a `shop=*` query also
    /// returns supermarkets).
    fn scorable_pois(&self) -> Vec<PointOfInterest> {
        let failed: HashSet<PoiCategory> =
            self.status.failed.iter().map(|f| f.category).collect();

        self.pois
            .iter()
            .filter(|poi| !failed.contains(&poi.category))
            .cloned()
            .collect()
    }
}

/// Tracks and logs stage transitions for one request.
struct StageTracker {
    analysis_id: Uuid,
    stage: AnalysisStage,
}

impl StageTracker {
    fn start(analysis_id: Uuid) -> Self {
        log::info!("[{analysis_id}] {}", AnalysisStage::Geocoding);
        Self {
            analysis_id,
            stage: AnalysisStage::Geocoding,
        }
    }

    fn advance(&mut self, next: AnalysisStage) {
        log::info!("[{}] {} -> {next}", self.analysis_id, self.stage);
        self.stage = next;
    }

    fn fail(&mut self, error: &AnalysisError) {
        log::error!(
            "[{}] {} -> {}: {error}",
            self.analysis_id,
            self.stage,
            AnalysisStage::Failed
        );
        self.stage = AnalysisStage::Failed;
    }
}

/// Runs the geocode, collect, score, narrate pipeline.
pub struct Orchestrator {
    geocoder: Arc<dyn Geocoder>,
    provider: Arc<dyn PoiProvider>,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
    config: EngineConfig,
}

impl Orchestrator {
    /// Creates an orchestrator without a narrative generator.
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        provider: Arc<dyn PoiProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            geocoder,
            provider,
            narrator: None,
            config,
        }
    }

    /// Attaches a narrative generator.
    #[must_use]
    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a full analysis for `request`.
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::InvalidRequest`] if the address is blank or the
    ///   radius override is not a positive number
    /// * [`AnalysisError::AddressNotResolved`] if geocoding fails
    /// * [`AnalysisError::AllCategoryFetchesFailed`] if no category could
    ///   be fetched
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalysisError> {
        let analysis_id = Uuid::new_v4();
        let mut tracker = StageTracker::start(analysis_id);

        let result = self.run(analysis_id, request, &mut tracker).await;
        if let Err(e) = &result {
            tracker.fail(e);
        }
        result
    }

    /// Analyzes many addresses concurrently, at most
    /// `concurrency.max_in_flight` at a time.
    ///
    /// Returns one result per request, in request order. Failed addresses
    /// are logged and do not affect the others.
    pub async fn analyze_batch(
        &self,
        requests: &[AnalysisRequest],
    ) -> Vec<Result<AnalysisReport, AnalysisError>> {
        log::info!("Starting batch analysis for {} addresses", requests.len());

        let results: Vec<_> = stream::iter(requests)
            .map(|request| self.analyze(request))
            .buffered(self.config.concurrency.max_in_flight)
            .collect()
            .await;

        let mut succeeded = 0;
        for (request, result) in requests.iter().zip(&results) {
            match result {
                Ok(_) => succeeded += 1,
                Err(e) => log::error!("Error analyzing '{}': {e}", request.address),
            }
        }
        log::info!(
            "Batch analysis completed: {succeeded}/{} successful",
            requests.len()
        );

        results
    }

    async fn run(
        &self,
        analysis_id: Uuid,
        request: &AnalysisRequest,
        tracker: &mut StageTracker,
    ) -> Result<AnalysisReport, AnalysisError> {
        let address = request.address.trim();
        if address.is_empty() {
            return Err(AnalysisError::InvalidRequest {
                message: "address is empty".to_string(),
            });
        }

        let config = match request.radius_m {
            Some(radius_m) => self.config.clone().with_radius(radius_m).map_err(|e| {
                AnalysisError::InvalidRequest {
                    message: e.to_string(),
                }
            })?,
            None => self.config.clone(),
        };

        let deadline = Instant::now() + config.collection.request_timeout();
        let mut degradations = Vec::new();

        let geocoded = self
            .geocode(address, deadline)
            .await
            .settle(&mut degradations)?;
        let origin = geocoded.coordinate;

        tracker.advance(AnalysisStage::Collecting);
        let collection = self
            .collect(origin, &config, deadline)
            .await
            .settle(&mut degradations)?;

        tracker.advance(AnalysisStage::Scoring);
        let scorable = collection.scorable_pois();
        let summary = compute_statistics(origin, config.radius_m, &scorable);
        let scores = urbansight_scoring::compose(&summary, &config);
        let highlights = urbansight_scoring::highlights(&scores, &summary, &config.thresholds);
        log::info!(
            "[{analysis_id}] walk score {:.1} ({}), {} POIs",
            scores.walk,
            scores.grade,
            summary.total_pois
        );

        tracker.advance(AnalysisStage::Narrating);
        let input = NarrativeInput {
            address,
            coordinate: origin,
            scores: &scores,
            summary: &summary,
            pois: &scorable,
        };
        let outcome = self.narrate(&input, &config, deadline).await;
        let narrative_status = match &outcome {
            StageOutcome::Success(Some(_)) => NarrativeStatus::Generated,
            StageOutcome::Success(None) => NarrativeStatus::Skipped,
            StageOutcome::Degraded(..) | StageOutcome::Fatal(_) => NarrativeStatus::Unavailable,
        };
        let narrative = outcome.settle(&mut degradations)?;

        tracker.advance(AnalysisStage::Assembled);

        Ok(AnalysisReport {
            analysis_id,
            generated_at: Utc::now(),
            address: address.to_string(),
            matched_address: geocoded.matched_address,
            coordinate: origin,
            radius_m: config.radius_m,
            pois: collection.pois,
            summary,
            scores,
            highlights,
            narrative,
            status: AnalysisStatus {
                collection: collection.status,
                narrative: narrative_status,
                degradations,
            },
        })
    }

    async fn geocode(&self, address: &str, deadline: Instant) -> StageOutcome<GeocodedAddress> {
        let not_resolved = |reason: String| {
            StageOutcome::Fatal(AnalysisError::AddressNotResolved {
                address: address.to_string(),
                reason,
            })
        };

        match tokio::time::timeout_at(deadline, self.geocoder.resolve(address)).await {
            Ok(Ok(Some(geocoded))) if geocoded.coordinate.is_valid() => {
                log::info!(
                    "Resolved '{address}' to {} ({})",
                    geocoded.coordinate,
                    geocoded.matched_address.as_deref().unwrap_or("no canonical form")
                );
                StageOutcome::Success(geocoded)
            }
            Ok(Ok(Some(geocoded))) => not_resolved(format!(
                "geocoder returned an invalid coordinate ({})",
                geocoded.coordinate
            )),
            Ok(Ok(None)) => not_resolved("no match".to_string()),
            Ok(Err(e)) => not_resolved(e.to_string()),
            Err(_) => not_resolved("request deadline exceeded".to_string()),
        }
    }

    async fn collect(
        &self,
        origin: Coordinate,
        config: &EngineConfig,
        deadline: Instant,
    ) -> StageOutcome<Collection> {
        let provider = self.provider.as_ref();
        let categories = &config.collection.categories;
        let radius_m = config.radius_m;
        let retry = &config.retry;
        let fetch_timeout = config.collection.fetch_timeout();
        let request_timeout_ms = config.collection.request_timeout_ms;

        log::info!(
            "Fetching {} categories from {} ({} in flight)",
            categories.len(),
            provider.id(),
            config.concurrency.max_in_flight
        );

        let mut results: Vec<_> = stream::iter(categories.iter().copied().enumerate())
            .map(|(index, category)| async move {
                let result = tokio::time::timeout_at(
                    deadline,
                    fetch_with_retry(provider, origin, radius_m, category, retry, fetch_timeout),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(ProviderError::Timeout {
                        millis: request_timeout_ms,
                    })
                });
                (index, category, result)
            })
            .buffer_unordered(config.concurrency.max_in_flight)
            .collect()
            .await;

        // Completion order is arbitrary; restore configured order.
        results.sort_by_key(|(index, ..)| *index);

        let mut seen = HashSet::new();
        let mut pois = Vec::new();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (_, category, result) in results {
            match result {
                Ok(raw) => {
                    log::debug!("{category}: {} records", raw.len());
                    succeeded.push(category);
                    for poi in raw.into_iter().map(classify) {
                        if seen.insert(poi.id.clone()) {
                            pois.push(poi);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("{category}: fetch failed: {e}");
                    failed.push(CategoryFailure {
                        category,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if succeeded.is_empty() {
            return StageOutcome::Fatal(AnalysisError::AllCategoryFetchesFailed { failures: failed });
        }

        log::info!(
            "Collected {} POIs ({} categories ok, {} failed)",
            pois.len(),
            succeeded.len(),
            failed.len()
        );

        let collection = Collection {
            pois,
            status: CollectionStatus {
                requested: categories.clone(),
                succeeded,
                failed: failed.clone(),
            },
        };

        if failed.is_empty() {
            StageOutcome::Success(collection)
        } else {
            StageOutcome::Degraded(collection, Degradation::PartialCollectionFailure { failed })
        }
    }

    async fn narrate(
        &self,
        input: &NarrativeInput<'_>,
        config: &EngineConfig,
        deadline: Instant,
    ) -> StageOutcome<Option<String>> {
        let Some(narrator) = self
            .narrator
            .as_deref()
            .filter(|_| config.narrative.enabled)
        else {
            log::debug!("Narrative skipped");
            return StageOutcome::Success(None);
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return StageOutcome::Degraded(
                None,
                Degradation::NarrativeUnavailable {
                    reason: "request deadline exceeded".to_string(),
                },
            );
        }

        match request_narrative(narrator, input, config.narrative.timeout().min(remaining)).await {
            NarrativeOutcome::Generated(text) => StageOutcome::Success(Some(text)),
            NarrativeOutcome::Unavailable { reason } => {
                StageOutcome::Degraded(None, Degradation::NarrativeUnavailable { reason })
            }
        }
    }
}
