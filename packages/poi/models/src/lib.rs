#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-of-interest taxonomy and location types.
//!
//! This crate defines the closed category enumeration used across the
//! whole UrbanSight engine. Raw map-provider records are classified into
//! a [`PoiCategory`], and each category rolls up into a top-level
//! [`PoiGroup`] for display and prompting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// `highway` values of road segments surveyed for sidewalk data.
pub const ROAD_CLASSES: &[&str] = &[
    "living_street",
    "residential",
    "service",
    "tertiary",
    "secondary",
    "primary",
    "unclassified",
];

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and within the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Top-level amenity groupings.
///
/// Each [`PoiCategory`] belongs to exactly one group.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoiGroup {
    /// Schools, universities, libraries
    Education,
    /// Hospitals, clinics, pharmacies
    Healthcare,
    /// Groceries and general retail
    Shopping,
    /// Public transport stops and stations
    Transport,
    /// Parks, culture, sport
    Leisure,
    /// Banks, post offices, public services
    Services,
    /// Restaurants, cafes, bars
    Food,
    /// Sidewalks, crossings and roads
    Infrastructure,
    /// Anything not matching a rule
    Other,
}

impl PoiGroup {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Education,
            Self::Healthcare,
            Self::Shopping,
            Self::Transport,
            Self::Leisure,
            Self::Services,
            Self::Food,
            Self::Infrastructure,
            Self::Other,
        ]
    }
}

/// The fixed category enumeration every classified POI carries.
///
/// The first nine variants are the *scored* categories: each one gets a
/// statistics record and an availability score. [`Self::Infrastructure`]
/// is collected for the pedestrian score only, and [`Self::Other`] is
/// retained for display but never scored.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoiCategory {
    /// Supermarkets, convenience stores, marketplaces
    Grocery,
    /// Restaurants, cafes, bars, fast food
    Restaurant,
    /// General retail
    Shopping,
    /// Schools, kindergartens, universities, libraries
    School,
    /// Parks, gardens, playgrounds
    Park,
    /// Cinemas, theatres, museums, sports venues
    Entertainment,
    /// Hospitals, clinics, pharmacies, dentists
    Healthcare,
    /// Bus stops, stations, platforms
    Transport,
    /// Banks, post offices, police, fire stations
    Services,
    /// Sidewalks, crossings, footways and roads
    Infrastructure,
    /// Catch-all for unmatched records
    Other,
}

impl PoiCategory {
    /// Returns the parent [`PoiGroup`] for this category.
    #[must_use]
    pub const fn group(self) -> PoiGroup {
        match self {
            Self::Grocery | Self::Shopping => PoiGroup::Shopping,
            Self::Restaurant => PoiGroup::Food,
            Self::School => PoiGroup::Education,
            Self::Park | Self::Entertainment => PoiGroup::Leisure,
            Self::Healthcare => PoiGroup::Healthcare,
            Self::Transport => PoiGroup::Transport,
            Self::Services => PoiGroup::Services,
            Self::Infrastructure => PoiGroup::Infrastructure,
            Self::Other => PoiGroup::Other,
        }
    }

    /// Whether this category participates in category-specific scoring.
    #[must_use]
    pub const fn is_scored(self) -> bool {
        !matches!(self, Self::Infrastructure | Self::Other)
    }

    /// Human-readable label used in prompts and highlights.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grocery => "grocery stores",
            Self::Restaurant => "restaurants",
            Self::Shopping => "shops",
            Self::School => "schools",
            Self::Park => "parks",
            Self::Entertainment => "entertainment venues",
            Self::Healthcare => "healthcare facilities",
            Self::Transport => "public transport stops",
            Self::Services => "public services",
            Self::Infrastructure => "pedestrian infrastructure",
            Self::Other => "other places",
        }
    }

    /// Returns all categories belonging to the given group.
    #[must_use]
    pub fn for_group(group: PoiGroup) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|c| c.group() == group)
            .collect()
    }

    /// Returns the scored categories in enumeration order.
    #[must_use]
    pub const fn scored() -> &'static [Self] {
        &[
            Self::Grocery,
            Self::Restaurant,
            Self::Shopping,
            Self::School,
            Self::Park,
            Self::Entertainment,
            Self::Healthcare,
            Self::Transport,
            Self::Services,
        ]
    }

    /// Returns the categories the collector fetches by default: every
    /// scored category plus pedestrian infrastructure.
    #[must_use]
    pub const fn collectable() -> &'static [Self] {
        &[
            Self::Grocery,
            Self::Restaurant,
            Self::Shopping,
            Self::School,
            Self::Park,
            Self::Entertainment,
            Self::Healthcare,
            Self::Transport,
            Self::Services,
            Self::Infrastructure,
        ]
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Grocery,
            Self::Restaurant,
            Self::Shopping,
            Self::School,
            Self::Park,
            Self::Entertainment,
            Self::Healthcare,
            Self::Transport,
            Self::Services,
            Self::Infrastructure,
            Self::Other,
        ]
    }
}

/// An unclassified record as returned by a map data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoi {
    /// Provider-stable identifier (e.g. `"node/123"`).
    pub id: String,
    /// Location of the element (node position or way center).
    pub coordinate: Coordinate,
    /// Free-form key/value tags.
    pub tags: BTreeMap<String, String>,
}

/// A classified point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    /// Provider-stable identifier.
    pub id: String,
    /// Display name from the `name` tag, if any.
    pub name: Option<String>,
    /// Assigned category.
    pub category: PoiCategory,
    /// The tag value that matched the classification rule.
    pub subcategory: Option<String>,
    /// Location.
    pub coordinate: Coordinate,
    /// Tags carried through for infrastructure checks.
    pub tags: BTreeMap<String, String>,
}

impl PointOfInterest {
    /// Returns the value of a tag, if present.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
