//! Distance-decay availability curve.

/// Availability score in `[0, 100]` for a nearest distance `distance_m`.
///
/// Linear from 100 at the origin down to the ideal distance, then the
/// slope is multiplied by `edge_decay_factor` until the score reaches 0.
/// Anything at or beyond `radius_m` scores 0. Continuous at the ideal
/// distance and non-increasing in `distance_m`.
#[must_use]
pub fn availability(distance_m: f64, radius_m: f64, ideal_m: f64, edge_decay_factor: f64) -> f64 {
    if distance_m.is_nan() || distance_m >= radius_m {
        return 0.0;
    }

    let linear = |d: f64| 100.0 * (1.0 - d / radius_m).clamp(0.0, 1.0);

    if distance_m <= ideal_m {
        linear(distance_m)
    } else {
        let excess = (distance_m - ideal_m) / radius_m;
        (linear(ideal_m) - 100.0 * edge_decay_factor * excess).max(0.0)
    }
}

/// Normalizes a density against its saturation point, in `[0, 100]`.
#[must_use]
pub fn density_score(density_per_km2: f64, saturation_per_km2: f64) -> f64 {
    if saturation_per_km2 <= 0.0 {
        return 0.0;
    }
    100.0 * (density_per_km2 / saturation_per_km2).clamp(0.0, 1.0)
}
