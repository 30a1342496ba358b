#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cast_precision_loss)]

//! Spatial metrics around an origin.
//!
//! Turns a classified POI set into per-category distance and density
//! statistics plus a pedestrian infrastructure summary. Pure and
//! deterministic: the same inputs always produce the same summary.

use geo::{Distance, Haversine, Point};
use urbansight_poi_models::{Coordinate, PoiCategory, PointOfInterest, ROAD_CLASSES};
use urbansight_scoring_models::{
    CategoryStatistics, InfrastructureSummary, SpatialSummary, WALKING_METERS_PER_MINUTE,
};

/// `highway` values that are themselves pedestrian features.
const PEDESTRIAN_HIGHWAYS: &[&str] = &["footway", "pedestrian", "crossing"];

/// `sidewalk` values indicating a sidewalk is present.
const SIDEWALK_PRESENT: &[&str] = &["both", "left", "right", "separate", "yes"];

/// `sidewalk` values indicating a sidewalk is absent.
const SIDEWALK_ABSENT: &[&str] = &["no", "none"];

/// Great-circle distance between two coordinates in meters, using the
/// mean Earth radius (6 371 008.8 m).
#[must_use]
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    Haversine.distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Area of the search disc in square kilometers.
#[must_use]
pub fn disc_area_km2(radius_m: f64) -> f64 {
    let radius_km = radius_m / 1000.0;
    std::f64::consts::PI * radius_km * radius_km
}

/// Computes statistics for every scored category and the pedestrian
/// infrastructure summary.
///
/// Only POIs within `radius_m` of `origin` participate. Categories with
/// no POIs get the sentinel record from [`CategoryStatistics::empty`].
/// `radius_m` must be positive; configuration loading guarantees it.
#[must_use]
pub fn compute_statistics(
    origin: Coordinate,
    radius_m: f64,
    pois: &[PointOfInterest],
) -> SpatialSummary {
    let area_km2 = disc_area_km2(radius_m);

    let in_range: Vec<(&PointOfInterest, f64)> = pois
        .iter()
        .map(|poi| (poi, haversine_m(origin, poi.coordinate)))
        .filter(|(_, distance)| *distance <= radius_m)
        .collect();

    let categories: Vec<CategoryStatistics> = PoiCategory::scored()
        .iter()
        .map(|category| category_statistics(*category, radius_m, area_km2, &in_range))
        .collect();

    let total_pois = categories.iter().map(|s| s.count).sum();
    let infrastructure = infrastructure_summary(area_km2, &in_range);

    log::debug!(
        "{total_pois} scored POIs and {} pedestrian features within {radius_m:.0} m of {origin}",
        infrastructure.feature_count,
    );

    SpatialSummary {
        radius_m,
        categories,
        infrastructure,
        total_pois,
    }
}

fn category_statistics(
    category: PoiCategory,
    radius_m: f64,
    area_km2: f64,
    in_range: &[(&PointOfInterest, f64)],
) -> CategoryStatistics {
    let mut count = 0_usize;
    let mut total = 0.0;
    let mut nearest: Option<(&PointOfInterest, f64)> = None;

    for (poi, distance) in in_range.iter().filter(|(poi, _)| poi.category == category) {
        count += 1;
        total += distance;
        if nearest.is_none_or(|(_, best)| *distance < best) {
            nearest = Some((poi, *distance));
        }
    }

    let Some((nearest_poi, nearest_m)) = nearest else {
        return CategoryStatistics::empty(category, radius_m);
    };

    CategoryStatistics {
        category,
        count,
        nearest_m,
        mean_m: total / count as f64,
        density_per_km2: count as f64 / area_km2,
        nearest_id: Some(nearest_poi.id.clone()),
        walking_minutes: nearest_m / WALKING_METERS_PER_MINUTE,
    }
}

/// Whether a POI's tags mark it as pedestrian infrastructure.
#[must_use]
pub fn is_pedestrian_feature(poi: &PointOfInterest) -> bool {
    poi.tag("footway") == Some("sidewalk")
        || poi
            .tag("highway")
            .is_some_and(|v| PEDESTRIAN_HIGHWAYS.contains(&v))
        || poi.tag("crossing").is_some()
        || poi
            .tag("sidewalk")
            .is_some_and(|v| SIDEWALK_PRESENT.contains(&v))
        || poi.tag("tactile_paving") == Some("yes")
        || poi.tag("kerb") == Some("lowered")
}

/// Whether a POI is a road segment carrying sidewalk data.
#[must_use]
pub fn is_surveyed_road(poi: &PointOfInterest) -> bool {
    poi.tag("highway").is_some_and(|v| ROAD_CLASSES.contains(&v)) && poi.tag("sidewalk").is_some()
}

fn infrastructure_summary(
    area_km2: f64,
    in_range: &[(&PointOfInterest, f64)],
) -> InfrastructureSummary {
    let mut summary = InfrastructureSummary::default();

    for (poi, _) in in_range {
        if is_pedestrian_feature(poi) {
            summary.feature_count += 1;
        }
        if is_surveyed_road(poi) {
            summary.surveyed_roads += 1;
            if poi
                .tag("sidewalk")
                .is_some_and(|v| SIDEWALK_ABSENT.contains(&v))
            {
                summary.roads_missing_sidewalk += 1;
            }
        }
    }

    summary.feature_density_per_km2 = summary.feature_count as f64 / area_km2;
    summary
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(41.8781, -87.6298);

    /// Meters per degree of latitude on the mean-radius sphere.
    const METERS_PER_DEGREE: f64 = 111_195.08;

    fn poi_north(id: &str, category: PoiCategory, meters: f64, tags: &[(&str, &str)]) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            name: None,
            category,
            subcategory: None,
            coordinate: Coordinate::new(ORIGIN.latitude + meters / METERS_PER_DEGREE, ORIGIN.longitude),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn haversine_known_distance() {
        // Chicago to Milwaukee, roughly 130 km.
        let milwaukee = Coordinate::new(43.0389, -87.9065);
        let d = haversine_m(ORIGIN, milwaukee);
        assert!((d - 130_000.0).abs() < 2_000.0, "got {d}");
        assert!(haversine_m(ORIGIN, ORIGIN).abs() < f64::EPSILON);
    }

    #[test]
    fn latitude_offset_matches_meters() {
        let poi = poi_north("n", PoiCategory::Park, 500.0, &[]);
        assert!((haversine_m(ORIGIN, poi.coordinate) - 500.0).abs() < 0.5);
    }

    #[test]
    fn empty_input_yields_sentinels() {
        let summary = compute_statistics(ORIGIN, 1000.0, &[]);
        assert_eq!(summary.categories.len(), PoiCategory::scored().len());
        assert_eq!(summary.total_pois, 0);
        for (stats, category) in summary.categories.iter().zip(PoiCategory::scored()) {
            assert_eq!(stats.category, *category);
            assert_eq!(stats.count, 0);
            assert!((stats.nearest_m - 1000.0).abs() < f64::EPSILON);
            assert!((stats.mean_m - 1000.0).abs() < f64::EPSILON);
            assert!(stats.density_per_km2.abs() < f64::EPSILON);
            assert!(stats.nearest_id.is_none());
        }
        assert_eq!(summary.infrastructure, InfrastructureSummary::default());
    }

    #[test]
    fn nearest_mean_and_density() {
        let pois = vec![
            poi_north("a", PoiCategory::Grocery, 300.0, &[]),
            poi_north("b", PoiCategory::Grocery, 100.0, &[]),
            poi_north("c", PoiCategory::Grocery, 500.0, &[]),
            poi_north("far", PoiCategory::Grocery, 1500.0, &[]),
        ];
        let summary = compute_statistics(ORIGIN, 1000.0, &pois);
        let grocery = summary.get(PoiCategory::Grocery).unwrap();

        assert_eq!(grocery.count, 3);
        assert_eq!(grocery.nearest_id.as_deref(), Some("b"));
        assert!((grocery.nearest_m - 100.0).abs() < 0.5);
        assert!((grocery.mean_m - 300.0).abs() < 0.5);
        assert!((grocery.density_per_km2 - 3.0 / std::f64::consts::PI).abs() < 1e-9);
        assert!((grocery.walking_minutes - 1.2).abs() < 0.01);
        assert_eq!(summary.total_pois, 3);
    }

    #[test]
    fn unscored_categories_are_not_counted() {
        let pois = vec![
            poi_north("x", PoiCategory::Other, 50.0, &[]),
            poi_north("s", PoiCategory::Infrastructure, 50.0, &[("highway", "footway")]),
        ];
        let summary = compute_statistics(ORIGIN, 1000.0, &pois);
        assert_eq!(summary.total_pois, 0);
        assert!(summary.get(PoiCategory::Other).is_none());
        assert_eq!(summary.infrastructure.feature_count, 1);
    }

    #[test]
    fn infrastructure_features_and_roads() {
        let pois = vec![
            poi_north("1", PoiCategory::Infrastructure, 10.0, &[("footway", "sidewalk")]),
            poi_north("2", PoiCategory::Infrastructure, 20.0, &[("highway", "crossing"), ("crossing", "zebra")]),
            poi_north("3", PoiCategory::Infrastructure, 30.0, &[("kerb", "lowered")]),
            poi_north("4", PoiCategory::Infrastructure, 40.0, &[("highway", "residential"), ("sidewalk", "both")]),
            poi_north("5", PoiCategory::Infrastructure, 50.0, &[("highway", "primary"), ("sidewalk", "no")]),
            poi_north("6", PoiCategory::Infrastructure, 60.0, &[("highway", "tertiary"), ("sidewalk", "none")]),
            poi_north("7", PoiCategory::Infrastructure, 70.0, &[("highway", "motorway"), ("sidewalk", "no")]),
            poi_north("8", PoiCategory::Infrastructure, 2000.0, &[("footway", "sidewalk")]),
        ];
        let summary = compute_statistics(ORIGIN, 1000.0, &pois).infrastructure;

        // 1, 2, 3 and the residential road with sidewalks on both sides.
        assert_eq!(summary.feature_count, 4);
        assert_eq!(summary.surveyed_roads, 3);
        assert_eq!(summary.roads_missing_sidewalk, 2);
        assert!((summary.feature_density_per_km2 - 4.0 / std::f64::consts::PI).abs() < 1e-9);
    }
}
