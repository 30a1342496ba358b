//! Narrative requests for composed scores.
//!
//! Builds a structured prompt from the scores and statistics, asks a
//! [`NarrativeGenerator`] for prose, and normalizes whatever comes back.
//! A narrative is never required: timeouts, provider errors and empty
//! responses all become [`NarrativeOutcome::Unavailable`].

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use urbansight_metrics::haversine_m;
use urbansight_poi_models::{Coordinate, PoiCategory, PointOfInterest};
use urbansight_scoring_models::{ScoreBreakdown, SpatialSummary};

use crate::AiError;
use crate::providers::LlmProvider;

/// System prompt sent with every narrative request.
pub const SYSTEM_PROMPT: &str = "You are an urban analyst writing for people choosing where \
    to live or invest. Describe the neighborhood in plain, specific language based only on \
    the metrics provided. Mention distances and counts where they matter. Do not invent \
    places that are not listed.";

/// Nearby POIs listed per category in the prompt.
const POIS_PER_CATEGORY: usize = 3;

/// Upper bound on listed POIs across all categories.
const MAX_LISTED_POIS: usize = 20;

/// Everything the prompt is built from.
pub struct NarrativeInput<'a> {
    pub address: &'a str,
    pub coordinate: Coordinate,
    pub scores: &'a ScoreBreakdown,
    pub summary: &'a SpatialSummary,
    pub pois: &'a [PointOfInterest],
}

/// Produces narrative text for a prompt.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Generates text for `prompt`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if generation fails or times out.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, AiError>;
}

/// [`NarrativeGenerator`] backed by an [`LlmProvider`].
pub struct LlmNarrativeGenerator {
    provider: Box<dyn LlmProvider>,
}

impl LlmNarrativeGenerator {
    /// Wraps `provider`.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrativeGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, AiError> {
        log::debug!("Requesting narrative from {}", self.provider.model());
        tokio::time::timeout(timeout, self.provider.complete(SYSTEM_PROMPT, prompt))
            .await
            .map_err(|_| AiError::Timeout {
                millis: timeout.as_millis(),
            })?
    }
}

/// Result of a narrative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeOutcome {
    /// Non-empty narrative text.
    Generated(String),
    /// No narrative, with the reason.
    Unavailable {
        /// Why no narrative was produced.
        reason: String,
    },
}

/// Requests a narrative, bounded by `timeout`.
///
/// Never fails. The timeout is enforced here as well as passed to the
/// generator, so a generator that ignores it cannot stall the caller.
pub async fn request_narrative(
    generator: &dyn NarrativeGenerator,
    input: &NarrativeInput<'_>,
    timeout: Duration,
) -> NarrativeOutcome {
    let prompt = build_prompt(input);

    let result = tokio::time::timeout(timeout, generator.generate(&prompt, timeout))
        .await
        .unwrap_or(Err(AiError::Timeout {
            millis: timeout.as_millis(),
        }));

    match result {
        Ok(text) if !text.trim().is_empty() => NarrativeOutcome::Generated(text.trim().to_string()),
        Ok(_) => NarrativeOutcome::Unavailable {
            reason: "Narrative generator returned an empty response".to_string(),
        },
        Err(e) => NarrativeOutcome::Unavailable {
            reason: e.to_string(),
        },
    }
}

/// Builds the narrative prompt.
#[must_use]
pub fn build_prompt(input: &NarrativeInput<'_>) -> String {
    let scores = input.scores;
    let summary = input.summary;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "LOCATION:");
    let _ = writeln!(prompt, "- Address: {}", input.address);
    let _ = writeln!(prompt, "- Coordinates: {}", input.coordinate);
    let _ = writeln!(prompt, "- Search radius: {:.0} m", summary.radius_m);

    let _ = writeln!(prompt, "\nSCORES (0-100):");
    let _ = writeln!(
        prompt,
        "- UrbanSight Score: {:.1} (grade {})",
        scores.composite, scores.grade
    );
    let _ = writeln!(prompt, "- Walk Score: {:.1}", scores.walk);
    let _ = writeln!(prompt, "- Pedestrian infrastructure: {:.1}", scores.pedestrian);
    let _ = writeln!(prompt, "- Accessibility: {:.1}", scores.accessibility);
    let _ = writeln!(prompt, "- Convenience: {:.1}", scores.convenience);
    let _ = writeln!(prompt, "- Green space: {:.1}", scores.green_space);
    let _ = writeln!(prompt, "- Urban intensity: {:.1}", scores.urban_intensity);
    let _ = writeln!(
        prompt,
        "- Lifestyle: daily life {:.1}, entertainment {:.1}, family {:.1}, professional {:.1}",
        scores.lifestyle.daily_life,
        scores.lifestyle.entertainment,
        scores.lifestyle.family,
        scores.lifestyle.professional,
    );
    let _ = writeln!(
        prompt,
        "- Diversity index: {:.2} across {} categories",
        scores.diversity.index, scores.diversity.categories_present
    );

    let _ = writeln!(prompt, "\nCATEGORIES:");
    for stats in &summary.categories {
        if stats.is_empty() {
            let _ = writeln!(prompt, "- {}: none within radius", stats.category);
        } else {
            let _ = writeln!(
                prompt,
                "- {}: {} found, nearest {:.0} m ({:.0} min walk), {:.1}/km²",
                stats.category,
                stats.count,
                stats.nearest_m,
                stats.walking_minutes,
                stats.density_per_km2,
            );
        }
    }

    let infrastructure = &summary.infrastructure;
    let _ = writeln!(
        prompt,
        "\nPEDESTRIAN INFRASTRUCTURE: {} features, {} of {} surveyed roads lack sidewalks",
        infrastructure.feature_count,
        infrastructure.roads_missing_sidewalk,
        infrastructure.surveyed_roads,
    );

    let nearby = nearest_named(input);
    if !nearby.is_empty() {
        let _ = writeln!(prompt, "\nNEARBY PLACES:");
        for (poi, distance) in nearby {
            let _ = writeln!(
                prompt,
                "- {} ({}, {}) - {distance:.0} m",
                poi.name.as_deref().unwrap_or_default(),
                poi.category,
                poi.subcategory.as_deref().unwrap_or("unspecified"),
            );
        }
    }

    let _ = write!(
        prompt,
        "\nWrite a two to three paragraph description of this neighborhood: its character, \
         who it suits best, and its main trade-offs."
    );

    prompt
}

/// The closest named POIs per scored category, within the radius.
fn nearest_named<'a>(input: &NarrativeInput<'a>) -> Vec<(&'a PointOfInterest, f64)> {
    let radius_m = input.summary.radius_m;
    let mut listed = Vec::new();

    for category in PoiCategory::scored() {
        let mut candidates: Vec<(&PointOfInterest, f64)> = input
            .pois
            .iter()
            .filter(|poi| poi.category == *category && poi.name.is_some())
            .map(|poi| (poi, haversine_m(input.coordinate, poi.coordinate)))
            .filter(|(_, distance)| *distance <= radius_m)
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        listed.extend(candidates.into_iter().take(POIS_PER_CATEGORY));
    }

    listed.truncate(MAX_LISTED_POIS);
    listed
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use urbansight_scoring_models::{
        CategoryStatistics, DiversityMetrics, Grade, InfrastructureSummary, LifestyleScores,
    };

    use super::*;

    struct FixedGenerator(Result<&'static str, &'static str>);

    #[async_trait]
    impl NarrativeGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, AiError> {
            self.0.map(str::to_string).map_err(|message| AiError::Provider {
                message: message.to_string(),
            })
        }
    }

    struct StalledGenerator;

    #[async_trait]
    impl NarrativeGenerator for StalledGenerator {
        async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn scores() -> ScoreBreakdown {
        ScoreBreakdown {
            walk: 72.5,
            pedestrian: 60.0,
            accessibility: 81.0,
            convenience: 65.0,
            green_space: 40.0,
            urban_intensity: 55.0,
            lifestyle: LifestyleScores {
                daily_life: 70.0,
                entertainment: 62.0,
                family: 48.0,
                professional: 77.0,
            },
            availability: BTreeMap::new(),
            diversity: DiversityMetrics {
                index: 0.82,
                categories_present: 8,
                dominant_category: Some(PoiCategory::Restaurant),
                balance_score: 10.0,
            },
            composite: 71.3,
            grade: Grade::B,
        }
    }

    fn summary() -> SpatialSummary {
        let mut grocery = CategoryStatistics::empty(PoiCategory::Grocery, 1000.0);
        grocery.count = 4;
        grocery.nearest_m = 120.0;
        grocery.walking_minutes = 1.44;
        grocery.density_per_km2 = 1.27;

        SpatialSummary {
            radius_m: 1000.0,
            categories: vec![
                grocery,
                CategoryStatistics::empty(PoiCategory::School, 1000.0),
            ],
            infrastructure: InfrastructureSummary::default(),
            total_pois: 4,
        }
    }

    fn poi(name: Option<&str>, category: PoiCategory, north_m: f64) -> PointOfInterest {
        PointOfInterest {
            id: format!("node/{north_m}"),
            name: name.map(str::to_string),
            category,
            subcategory: Some("supermarket".to_string()),
            coordinate: Coordinate::new(north_m / 111_195.08, 0.0),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn prompt_contains_scores_and_places() {
        let scores = scores();
        let summary = summary();
        let pois = vec![
            poi(Some("Corner Market"), PoiCategory::Grocery, 120.0),
            poi(None, PoiCategory::Grocery, 50.0),
            poi(Some("Far Foods"), PoiCategory::Grocery, 5000.0),
        ];
        let input = NarrativeInput {
            address: "1 Main St",
            coordinate: Coordinate::new(0.0, 0.0),
            scores: &scores,
            summary: &summary,
            pois: &pois,
        };

        let prompt = build_prompt(&input);
        assert!(prompt.contains("Address: 1 Main St"));
        assert!(prompt.contains("UrbanSight Score: 71.3 (grade B)"));
        assert!(prompt.contains("grocery: 4 found, nearest 120 m"));
        assert!(prompt.contains("school: none within radius"));
        assert!(prompt.contains("Corner Market (grocery, supermarket) - 120 m"));
        assert!(!prompt.contains("Far Foods"));
    }

    fn input<'a>(scores: &'a ScoreBreakdown, summary: &'a SpatialSummary) -> NarrativeInput<'a> {
        NarrativeInput {
            address: "1 Main St",
            coordinate: Coordinate::new(0.0, 0.0),
            scores,
            summary,
            pois: &[],
        }
    }

    #[tokio::test]
    async fn trims_generated_text() {
        let (scores, summary) = (scores(), summary());
        let generator = FixedGenerator(Ok("  A quiet, green area.\n"));

        let outcome =
            request_narrative(&generator, &input(&scores, &summary), Duration::from_secs(1)).await;
        assert_eq!(
            outcome,
            NarrativeOutcome::Generated("A quiet, green area.".to_string())
        );
    }

    #[tokio::test]
    async fn empty_and_failed_responses_are_unavailable() {
        let (scores, summary) = (scores(), summary());
        let input = input(&scores, &summary);

        let blank = request_narrative(&FixedGenerator(Ok("   \n")), &input, Duration::from_secs(1)).await;
        assert!(matches!(blank, NarrativeOutcome::Unavailable { .. }));

        let failed = request_narrative(
            &FixedGenerator(Err("rate limited")),
            &input,
            Duration::from_secs(1),
        )
        .await;
        match failed {
            NarrativeOutcome::Unavailable { reason } => assert!(reason.contains("rate limited")),
            NarrativeOutcome::Generated(_) => panic!("expected no narrative"),
        }
    }

    #[tokio::test]
    async fn stalled_generator_times_out() {
        let (scores, summary) = (scores(), summary());
        let input = input(&scores, &summary);

        let outcome =
            request_narrative(&StalledGenerator, &input, Duration::from_millis(20)).await;
        match outcome {
            NarrativeOutcome::Unavailable { reason } => assert!(reason.contains("20 ms")),
            NarrativeOutcome::Generated(_) => panic!("expected a timeout"),
        }
    }
}
