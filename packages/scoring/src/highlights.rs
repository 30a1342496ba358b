//! Human-readable strengths, concerns and recommendations.

use urbansight_config::ThresholdsConfig;
use urbansight_scoring_models::{Highlights, ScoreBreakdown, SpatialSummary};

/// Derives highlights from the composed scores.
///
/// Purely threshold based, so the same scores always produce the same
/// messages in the same order.
#[must_use]
pub fn highlights(
    scores: &ScoreBreakdown,
    summary: &SpatialSummary,
    thresholds: &ThresholdsConfig,
) -> Highlights {
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();
    let mut recommendations = Vec::new();

    if scores.walk >= 80.0 {
        strengths.push(format!(
            "Excellent walkability ({})",
            thresholds.grade_for(scores.walk)
        ));
    }
    if scores.accessibility >= 80.0 {
        strengths.push("Great access to public transport".to_string());
    }
    if scores.convenience >= 80.0 {
        strengths.push("Essential services within easy reach".to_string());
    }
    if scores.lifestyle.entertainment >= 60.0 {
        strengths.push("Good variety of leisure options".to_string());
    }
    if scores.green_space >= 70.0 {
        strengths.push("Plenty of green space nearby".to_string());
    }

    if scores.walk < 50.0 {
        concerns.push("Low walkability, most errands need a car".to_string());
    }
    if scores.accessibility < 40.0 {
        concerns.push("Limited access to public transport".to_string());
    }
    if scores.convenience < 50.0 {
        concerns.push("Essential services are far away".to_string());
    }
    for stats in summary.categories.iter().filter(|s| s.is_empty()) {
        concerns.push(format!(
            "No {} within {:.0} m",
            stats.category.label(),
            summary.radius_m
        ));
    }

    if scores.accessibility < 60.0 {
        recommendations.push("Consider whether you will need a car".to_string());
    }
    if scores.lifestyle.entertainment < 40.0 {
        recommendations.push("Few leisure and entertainment options nearby".to_string());
    }

    Highlights {
        strengths,
        concerns,
        recommendations,
    }
}
