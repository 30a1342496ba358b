#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Score composition.
//!
//! Every score is a weighted sum of *signals* read from a
//! [`SpatialSummary`]: a category's distance-based availability or its
//! normalized density. Weight tables come from a validated
//! [`EngineConfig`], so composition itself cannot fail.

pub mod availability;
pub mod diversity;
pub mod highlights;

use std::collections::BTreeMap;

use urbansight_config::{EngineConfig, Signal, WeightTable};
use urbansight_poi_models::PoiCategory;
use urbansight_scoring_models::{LifestyleScores, ScoreBreakdown, SpatialSummary};

pub use availability::{availability, density_score};
pub use diversity::diversity;
pub use highlights::highlights;

/// Composes every sub-score and the composite score for `summary`.
#[must_use]
pub fn compose(summary: &SpatialSummary, config: &EngineConfig) -> ScoreBreakdown {
    let signals = Signals::new(summary, config);
    let weights = &config.weights;

    let walk = signals.weighted(&weights.walk);
    let accessibility = signals.weighted(&weights.accessibility);
    let convenience = signals.weighted(&weights.convenience);
    let pedestrian = pedestrian_score(summary, signals.availability_of(PoiCategory::Transport), config);

    let composite_weights = &weights.composite;
    let composite = clamp_score(
        walk * composite_weights.walk
            + pedestrian * composite_weights.pedestrian
            + accessibility * composite_weights.accessibility
            + convenience * composite_weights.convenience,
    );
    let grade = config.thresholds.grade_for(composite);

    log::debug!(
        "Composed scores: walk={walk:.1} pedestrian={pedestrian:.1} \
         accessibility={accessibility:.1} convenience={convenience:.1} \
         composite={composite:.1} ({grade})"
    );

    ScoreBreakdown {
        walk,
        pedestrian,
        accessibility,
        convenience,
        green_space: signals.weighted(&weights.green_space),
        urban_intensity: signals.weighted(&weights.urban_intensity),
        lifestyle: LifestyleScores {
            daily_life: signals.weighted(&weights.daily_life),
            entertainment: signals.weighted(&weights.entertainment),
            family: signals.weighted(&weights.family),
            professional: signals.weighted(&weights.professional),
        },
        diversity: diversity(&summary.categories),
        availability: signals.availability,
        composite,
        grade,
    }
}

/// Pedestrian infrastructure score in `[0, 100]`.
///
/// Combines feature density, transit availability and sidewalk coverage.
/// Coverage is 100 when no road was surveyed, since there is no evidence
/// of missing sidewalks.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pedestrian_score(summary: &SpatialSummary, transport_availability: f64, config: &EngineConfig) -> f64 {
    let infrastructure = &summary.infrastructure;

    let infrastructure_term = density_score(
        infrastructure.feature_density_per_km2,
        config.pedestrian.infrastructure_saturation_per_km2,
    );

    let coverage_term = if infrastructure.surveyed_roads == 0 {
        100.0
    } else {
        let missing = infrastructure.roads_missing_sidewalk as f64 / infrastructure.surveyed_roads as f64;
        100.0 * (1.0 - missing).clamp(0.0, 1.0)
    };

    let weights = &config.weights.pedestrian;
    clamp_score(
        infrastructure_term * weights.infrastructure
            + transport_availability * weights.transport
            + coverage_term * weights.sidewalk_coverage,
    )
}

/// Signal values for one summary.
struct Signals<'a> {
    summary: &'a SpatialSummary,
    config: &'a EngineConfig,
    availability: BTreeMap<PoiCategory, f64>,
}

impl<'a> Signals<'a> {
    fn new(summary: &'a SpatialSummary, config: &'a EngineConfig) -> Self {
        let availability = summary
            .categories
            .iter()
            .map(|stats| {
                let ideal = config
                    .ideal_distance_m(stats.category)
                    .unwrap_or(summary.radius_m);
                let score = availability(
                    stats.nearest_m,
                    summary.radius_m,
                    ideal,
                    config.availability.edge_decay_factor,
                );
                (stats.category, score)
            })
            .collect();

        Self {
            summary,
            config,
            availability,
        }
    }

    fn availability_of(&self, category: PoiCategory) -> f64 {
        self.availability.get(&category).copied().unwrap_or(0.0)
    }

    fn value(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Availability(category) => self.availability_of(category),
            Signal::Density(category) => self.summary.get(category).map_or(0.0, |stats| {
                density_score(
                    stats.density_per_km2,
                    self.config.density_saturation(category).unwrap_or(0.0),
                )
            }),
        }
    }

    fn weighted(&self, table: &WeightTable) -> f64 {
        clamp_score(
            table
                .iter()
                .map(|(signal, weight)| weight * self.value(signal))
                .sum(),
        )
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use urbansight_poi_models::{Coordinate, PointOfInterest};
    use urbansight_scoring_models::{CategoryStatistics, Grade, InfrastructureSummary};

    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::load_default().unwrap()
    }

    fn summary_with(radius_m: f64, nearest: &[(PoiCategory, f64, usize)]) -> SpatialSummary {
        let area = std::f64::consts::PI * (radius_m / 1000.0).powi(2);
        let categories: Vec<CategoryStatistics> = PoiCategory::scored()
            .iter()
            .map(|category| {
                nearest.iter().find(|(c, _, _)| c == category).map_or_else(
                    || CategoryStatistics::empty(*category, radius_m),
                    |(_, d, count)| {
                        let mut stats = CategoryStatistics::empty(*category, radius_m);
                        stats.count = *count;
                        stats.nearest_m = *d;
                        stats.density_per_km2 = f64::from(u32::try_from(*count).unwrap()) / area;
                        stats
                    },
                )
            })
            .collect();
        let total_pois = categories.iter().map(|s| s.count).sum();

        SpatialSummary {
            radius_m,
            categories,
            infrastructure: InfrastructureSummary::default(),
            total_pois,
        }
    }

    #[test]
    fn empty_summary_scores_zero_walk() {
        let summary = summary_with(1000.0, &[]);
        let scores = compose(&summary, &config());

        assert!(scores.walk.abs() < f64::EPSILON);
        assert!(scores.accessibility.abs() < f64::EPSILON);
        assert!(scores.convenience.abs() < f64::EPSILON);
        assert!(scores.availability.values().all(|a| a.abs() < f64::EPSILON));
        assert_eq!(scores.availability.len(), 9);
        assert!(scores.diversity.index.abs() < f64::EPSILON);
        // Only the sidewalk coverage term survives.
        assert!((scores.pedestrian - 100.0 / 3.0).abs() < 1e-6);
        assert_eq!(scores.grade, Grade::F);
    }

    #[test]
    fn worked_example_walk_score() {
        let summary = summary_with(
            1000.0,
            &[
                (PoiCategory::Restaurant, 50.0, 40),
                (PoiCategory::Transport, 100.0, 2),
                (PoiCategory::Park, 300.0, 5),
            ],
        );
        let scores = compose(&summary, &config());

        assert!((scores.availability[&PoiCategory::Restaurant] - 95.0).abs() < 1e-9);
        assert!((scores.availability[&PoiCategory::Transport] - 90.0).abs() < 1e-9);
        assert!((scores.availability[&PoiCategory::Park] - 70.0).abs() < 1e-9);
        assert!(scores.availability[&PoiCategory::School].abs() < f64::EPSILON);
        assert!((scores.walk - 34.5).abs() < 1e-9);
    }

    #[test]
    fn worked_example_from_raw_points() {
        let origin = Coordinate::new(-23.5614, -46.6559);
        let meters_per_degree = 111_195.08;
        let at = |id: String, category: PoiCategory, meters: f64| PointOfInterest {
            id,
            name: None,
            category,
            subcategory: None,
            coordinate: Coordinate::new(origin.latitude + meters / meters_per_degree, origin.longitude),
            tags: BTreeMap::new(),
        };

        let mut pois = Vec::new();
        for i in 0..40_u32 {
            let meters = 50.0 + f64::from(i) * (850.0 / 39.0);
            pois.push(at(format!("restaurant/{i}"), PoiCategory::Restaurant, meters));
        }
        pois.push(at("transport/1".to_string(), PoiCategory::Transport, 100.0));
        pois.push(at("transport/2".to_string(), PoiCategory::Transport, 800.0));
        for (i, meters) in [300.0, 450.0, 600.0, 800.0, 950.0].into_iter().enumerate() {
            pois.push(at(format!("park/{i}"), PoiCategory::Park, meters));
        }

        let summary = urbansight_metrics::compute_statistics(origin, 1000.0, &pois);
        let scores = compose(&summary, &config());

        assert_eq!(summary.get(PoiCategory::Restaurant).unwrap().count, 40);
        assert_eq!(summary.get(PoiCategory::School).unwrap().count, 0);
        assert!((scores.walk - 34.5).abs() < 0.05, "walk = {}", scores.walk);
    }

    #[test]
    fn saturated_location_scores_top_grade() {
        let nearest: Vec<_> = PoiCategory::scored()
            .iter()
            .map(|c| (*c, 0.0, 500))
            .collect();
        let mut summary = summary_with(1000.0, &nearest);
        summary.infrastructure = InfrastructureSummary {
            feature_count: 400,
            feature_density_per_km2: 127.0,
            surveyed_roads: 10,
            roads_missing_sidewalk: 0,
        };

        let scores = compose(&summary, &config());
        assert!((scores.walk - 100.0).abs() < 1e-9);
        assert!((scores.pedestrian - 100.0).abs() < 1e-9);
        assert!((scores.urban_intensity - 100.0).abs() < 1e-9);
        assert!(scores.composite <= 100.0);
        assert!((scores.composite - 100.0).abs() < 1e-9);
        assert_eq!(scores.grade, Grade::A);
        assert!((scores.diversity.index - 1.0).abs() < 1e-9);
    }

    #[test]
    fn grade_follows_composite_thresholds() {
        let config = config();
        for (i, category) in PoiCategory::scored().iter().enumerate() {
            let nearest: Vec<_> = PoiCategory::scored()
                .iter()
                .take(i + 1)
                .map(|c| (*c, 150.0, 3))
                .collect();
            let summary = summary_with(1000.0, &nearest);
            let scores = compose(&summary, &config);
            assert!(
                (0.0..=100.0).contains(&scores.composite),
                "composite out of range after adding {category}"
            );
            assert_eq!(scores.grade, config.thresholds.grade_for(scores.composite));
        }
    }

    #[test]
    fn sidewalk_coverage_penalizes_missing_sidewalks() {
        let config = config();
        let mut summary = summary_with(1000.0, &[]);
        summary.infrastructure = InfrastructureSummary {
            feature_count: 0,
            feature_density_per_km2: 0.0,
            surveyed_roads: 4,
            roads_missing_sidewalk: 2,
        };
        let half = pedestrian_score(&summary, 0.0, &config);
        assert!((half - 50.0 / 3.0).abs() < 1e-6);

        summary.infrastructure.roads_missing_sidewalk = 0;
        let full = pedestrian_score(&summary, 0.0, &config);
        assert!((full - 100.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn density_signals_use_saturation() {
        // 10 parks in a 1 km radius is ~3.2/km², below the saturation of 5.
        let summary = summary_with(1000.0, &[(PoiCategory::Park, 100.0, 10)]);
        let scores = compose(&summary, &config());
        let park_density = density_score(10.0 / std::f64::consts::PI, 5.0);
        let expected = 0.7 * 90.0 + 0.3 * park_density;
        assert!((scores.green_space - expected).abs() < 1e-9);
    }

    #[test]
    fn highlights_flag_missing_categories() {
        let config = config();
        let summary = summary_with(1000.0, &[(PoiCategory::Restaurant, 50.0, 40)]);
        let scores = compose(&summary, &config);
        let result = highlights(&scores, &summary, &config.thresholds);

        assert!(result.concerns.iter().any(|c| c == "No schools within 1000 m"));
        assert!(!result.concerns.iter().any(|c| c.contains("restaurants")));
        assert!(result.concerns.iter().any(|c| c.starts_with("Low walkability")));
        assert!(result.strengths.is_empty());
    }
}
