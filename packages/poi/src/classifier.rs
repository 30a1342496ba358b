//! Tag-based POI classification.
//!
//! Maps a provider's raw tag set to the canonical [`PoiCategory`] using an
//! ordered rule list. The first matching rule wins, so specific amenity
//! rules come before broad ones (a pharmacy that is also tagged as a shop
//! is healthcare, not shopping).

use urbansight_poi_models::{PoiCategory, PointOfInterest, RawPoi};

/// Which tag values a rule accepts.
#[derive(Debug, Clone, Copy)]
pub enum TagMatch {
    /// Any value for the key.
    Any,
    /// One of the listed values.
    OneOf(&'static [&'static str]),
}

impl TagMatch {
    fn matches(self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(values) => values.contains(&value),
        }
    }
}

/// A single classification rule: `key` with a matching value maps to
/// `category`.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Tag key to inspect.
    pub key: &'static str,
    /// Accepted values.
    pub values: TagMatch,
    /// Category assigned on match.
    pub category: PoiCategory,
}

const fn rule(key: &'static str, values: TagMatch, category: PoiCategory) -> Rule {
    Rule {
        key,
        values,
        category,
    }
}

/// The ordered classification rules. Order is significant.
pub const RULES: &[Rule] = &[
    // ── Specific amenities first ────────────────────────────────────
    rule(
        "amenity",
        TagMatch::OneOf(&[
            "school",
            "university",
            "college",
            "kindergarten",
            "library",
        ]),
        PoiCategory::School,
    ),
    rule(
        "amenity",
        TagMatch::OneOf(&[
            "hospital",
            "clinic",
            "pharmacy",
            "dentist",
            "doctors",
            "veterinary",
        ]),
        PoiCategory::Healthcare,
    ),
    rule("healthcare", TagMatch::Any, PoiCategory::Healthcare),
    rule(
        "shop",
        TagMatch::OneOf(&[
            "supermarket",
            "convenience",
            "greengrocer",
            "bakery",
            "butcher",
            "grocery",
        ]),
        PoiCategory::Grocery,
    ),
    rule(
        "amenity",
        TagMatch::OneOf(&["marketplace"]),
        PoiCategory::Grocery,
    ),
    rule(
        "amenity",
        TagMatch::OneOf(&[
            "restaurant",
            "cafe",
            "fast_food",
            "bar",
            "pub",
            "food_court",
            "ice_cream",
        ]),
        PoiCategory::Restaurant,
    ),
    // ── Transport ───────────────────────────────────────────────────
    rule(
        "amenity",
        TagMatch::OneOf(&["bus_station", "ferry_terminal", "taxi", "bicycle_rental"]),
        PoiCategory::Transport,
    ),
    rule(
        "public_transport",
        TagMatch::OneOf(&["platform", "stop_position", "station"]),
        PoiCategory::Transport,
    ),
    rule(
        "highway",
        TagMatch::OneOf(&["bus_stop"]),
        PoiCategory::Transport,
    ),
    rule(
        "railway",
        TagMatch::OneOf(&["station", "halt", "tram_stop", "subway_entrance"]),
        PoiCategory::Transport,
    ),
    // ── Leisure ─────────────────────────────────────────────────────
    rule(
        "leisure",
        TagMatch::OneOf(&["park", "garden", "playground", "nature_reserve", "dog_park"]),
        PoiCategory::Park,
    ),
    rule(
        "amenity",
        TagMatch::OneOf(&[
            "cinema",
            "theatre",
            "arts_centre",
            "nightclub",
            "community_centre",
        ]),
        PoiCategory::Entertainment,
    ),
    rule(
        "leisure",
        TagMatch::OneOf(&["sports_centre", "fitness_centre", "stadium", "swimming_pool"]),
        PoiCategory::Entertainment,
    ),
    rule(
        "tourism",
        TagMatch::OneOf(&["museum", "gallery", "attraction", "zoo"]),
        PoiCategory::Entertainment,
    ),
    // ── Services ────────────────────────────────────────────────────
    rule(
        "amenity",
        TagMatch::OneOf(&[
            "bank",
            "atm",
            "post_office",
            "police",
            "fire_station",
            "townhall",
            "courthouse",
        ]),
        PoiCategory::Services,
    ),
    rule(
        "office",
        TagMatch::OneOf(&["government"]),
        PoiCategory::Services,
    ),
    // ── Generic retail after all specific shop rules ────────────────
    rule("shop", TagMatch::Any, PoiCategory::Shopping),
    // ── Pedestrian infrastructure ───────────────────────────────────
    rule(
        "footway",
        TagMatch::OneOf(&["sidewalk", "crossing"]),
        PoiCategory::Infrastructure,
    ),
    rule(
        "highway",
        TagMatch::OneOf(&[
            "footway",
            "pedestrian",
            "crossing",
            "living_street",
            "residential",
            "service",
            "tertiary",
            "secondary",
            "primary",
            "unclassified",
        ]),
        PoiCategory::Infrastructure,
    ),
    rule("crossing", TagMatch::Any, PoiCategory::Infrastructure),
    rule("sidewalk", TagMatch::Any, PoiCategory::Infrastructure),
    rule(
        "tactile_paving",
        TagMatch::OneOf(&["yes"]),
        PoiCategory::Infrastructure,
    ),
    rule(
        "kerb",
        TagMatch::OneOf(&["lowered", "flush"]),
        PoiCategory::Infrastructure,
    ),
];

/// Returns the first rule matching `tags` and the matched value.
fn first_match<'a>(
    tags: &'a std::collections::BTreeMap<String, String>,
) -> Option<(&'static Rule, &'a str)> {
    RULES.iter().find_map(|r| {
        tags.get(r.key)
            .filter(|value| r.values.matches(value))
            .map(|value| (r, value.as_str()))
    })
}

/// Classifies a raw provider record.
///
/// Never fails: records matching no rule are assigned
/// [`PoiCategory::Other`] and keep their tags for display.
#[must_use]
pub fn classify(raw: RawPoi) -> PointOfInterest {
    let (category, subcategory) = match first_match(&raw.tags) {
        Some((rule, value)) => (rule.category, Some(value.to_string())),
        None => (PoiCategory::Other, None),
    };

    let name = raw.tags.get("name").cloned();

    PointOfInterest {
        id: raw.id,
        name,
        category,
        subcategory,
        coordinate: raw.coordinate,
        tags: raw.tags,
    }
}

/// Returns the rules that can produce `category`, in rule order.
///
/// Providers use this to build a per-category query filter.
#[must_use]
pub fn rules_for(category: PoiCategory) -> Vec<&'static Rule> {
    RULES.iter().filter(|r| r.category == category).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use urbansight_poi_models::Coordinate;

    use super::*;

    fn raw(tags: &[(&str, &str)]) -> RawPoi {
        RawPoi {
            id: "node/1".to_string(),
            coordinate: Coordinate::new(0.0, 0.0),
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn maps_common_amenities() {
        assert_eq!(
            classify(raw(&[("amenity", "school")])).category,
            PoiCategory::School
        );
        assert_eq!(
            classify(raw(&[("amenity", "cafe")])).category,
            PoiCategory::Restaurant
        );
        assert_eq!(
            classify(raw(&[("shop", "supermarket")])).category,
            PoiCategory::Grocery
        );
        assert_eq!(
            classify(raw(&[("shop", "clothes")])).category,
            PoiCategory::Shopping
        );
        assert_eq!(
            classify(raw(&[("highway", "bus_stop")])).category,
            PoiCategory::Transport
        );
        assert_eq!(
            classify(raw(&[("leisure", "park")])).category,
            PoiCategory::Park
        );
        assert_eq!(
            classify(raw(&[("tourism", "museum")])).category,
            PoiCategory::Entertainment
        );
        assert_eq!(
            classify(raw(&[("amenity", "post_office")])).category,
            PoiCategory::Services
        );
    }

    #[test]
    fn pharmacy_that_is_also_a_shop_is_healthcare() {
        let poi = classify(raw(&[("shop", "chemist"), ("amenity", "pharmacy")]));
        assert_eq!(poi.category, PoiCategory::Healthcare);
        assert_eq!(poi.subcategory.as_deref(), Some("pharmacy"));
    }

    #[test]
    fn wildcard_rule_keeps_actual_value() {
        let poi = classify(raw(&[("shop", "hardware"), ("name", "Bolt Bros")]));
        assert_eq!(poi.subcategory.as_deref(), Some("hardware"));
        assert_eq!(poi.name.as_deref(), Some("Bolt Bros"));
    }

    #[test]
    fn infrastructure_and_roads() {
        assert_eq!(
            classify(raw(&[("highway", "crossing")])).category,
            PoiCategory::Infrastructure
        );
        assert_eq!(
            classify(raw(&[("highway", "residential"), ("sidewalk", "no")])).category,
            PoiCategory::Infrastructure
        );
        assert_eq!(
            classify(raw(&[("tactile_paving", "yes")])).category,
            PoiCategory::Infrastructure
        );
    }

    #[test]
    fn unknown_fallback() {
        let poi = classify(raw(&[("amenity", "parking")]));
        assert_eq!(poi.category, PoiCategory::Other);
        assert!(poi.subcategory.is_none());
        assert_eq!(poi.tags.get("amenity").map(String::as_str), Some("parking"));

        assert_eq!(classify(raw(&[])).category, PoiCategory::Other);
    }

    #[test]
    fn every_collectable_category_has_rules() {
        for category in PoiCategory::collectable() {
            assert!(
                !rules_for(*category).is_empty(),
                "{category:?} has no classification rules"
            );
        }
        assert!(rules_for(PoiCategory::Other).is_empty());
    }
}
