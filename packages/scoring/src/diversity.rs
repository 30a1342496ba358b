//! Amenity diversity from category counts.

use urbansight_scoring_models::{CategoryStatistics, DiversityMetrics};

/// Computes the normalized Shannon diversity of the category counts.
///
/// The index is the entropy of the count distribution divided by
/// `ln(categories present)`, so it is 1 for a perfectly even spread and
/// 0 when at most one category is present. Ties for the dominant
/// category go to the earlier category in enumeration order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn diversity(categories: &[CategoryStatistics]) -> DiversityMetrics {
    let present: Vec<&CategoryStatistics> = categories.iter().filter(|s| s.count > 0).collect();
    let total: usize = present.iter().map(|s| s.count).sum();

    let dominant_category = present
        .iter()
        .copied()
        .fold(None::<&CategoryStatistics>, |best, s| match best {
            Some(b) if b.count >= s.count => Some(b),
            _ => Some(s),
        })
        .map(|s| s.category);

    if present.len() <= 1 {
        return DiversityMetrics {
            index: 0.0,
            categories_present: present.len(),
            dominant_category,
            balance_score: 0.0,
        };
    }

    let entropy: f64 = present
        .iter()
        .map(|s| {
            let p = s.count as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    let index = (entropy / (present.len() as f64).ln()).clamp(0.0, 1.0);

    let min = present.iter().map(|s| s.count).min().unwrap_or(0);
    let max = present.iter().map(|s| s.count).max().unwrap_or(1);

    DiversityMetrics {
        index,
        categories_present: present.len(),
        dominant_category,
        balance_score: 100.0 * min as f64 / max as f64,
    }
}

#[cfg(test)]
mod tests {
    use urbansight_poi_models::PoiCategory;

    use super::*;

    fn counts(values: &[(PoiCategory, usize)]) -> Vec<CategoryStatistics> {
        PoiCategory::scored()
            .iter()
            .map(|category| {
                let mut stats = CategoryStatistics::empty(*category, 1000.0);
                stats.count = values
                    .iter()
                    .find(|(c, _)| c == category)
                    .map_or(0, |(_, n)| *n);
                stats
            })
            .collect()
    }

    #[test]
    fn nothing_present() {
        let metrics = diversity(&counts(&[]));
        assert!(metrics.index.abs() < f64::EPSILON);
        assert_eq!(metrics.categories_present, 0);
        assert!(metrics.dominant_category.is_none());
    }

    #[test]
    fn single_category_is_zero() {
        let metrics = diversity(&counts(&[(PoiCategory::Restaurant, 40)]));
        assert!(metrics.index.abs() < f64::EPSILON);
        assert_eq!(metrics.categories_present, 1);
        assert_eq!(metrics.dominant_category, Some(PoiCategory::Restaurant));
        assert!(metrics.balance_score.abs() < f64::EPSILON);
    }

    #[test]
    fn even_spread_is_one() {
        let metrics = diversity(&counts(&[
            (PoiCategory::Grocery, 5),
            (PoiCategory::Park, 5),
            (PoiCategory::School, 5),
        ]));
        assert!((metrics.index - 1.0).abs() < 1e-9);
        assert!((metrics.balance_score - 100.0).abs() < 1e-9);
        // Tie goes to the first category in enumeration order.
        assert_eq!(metrics.dominant_category, Some(PoiCategory::Grocery));
    }

    #[test]
    fn skewed_spread_is_between_bounds() {
        let metrics = diversity(&counts(&[
            (PoiCategory::Restaurant, 40),
            (PoiCategory::Transport, 2),
            (PoiCategory::Park, 5),
        ]));
        assert!(metrics.index > 0.0 && metrics.index < 1.0);
        assert_eq!(metrics.dominant_category, Some(PoiCategory::Restaurant));
        assert!((metrics.balance_score - 5.0).abs() < 1e-9);
    }
}
