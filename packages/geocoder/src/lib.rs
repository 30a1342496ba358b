#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for UrbanSight analyses.
//!
//! Converts a free-form street address into a WGS84 coordinate. The
//! engine only depends on the [`Geocoder`] trait; [`nominatim`] provides
//! the `OpenStreetMap` implementation used by the CLI.

pub mod nominatim;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use urbansight_poi_models::Coordinate;

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedAddress {
    /// Resolved location.
    pub coordinate: Coordinate,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
    /// Which provider resolved this address.
    pub provider: GeocodingProvider,
}

/// Which geocoding provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingProvider {
    /// Nominatim / OpenStreetMap.
    Nominatim,
    /// A fixed coordinate supplied by the caller or a test double.
    Static,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Resolves free-form addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves `address`.
    ///
    /// Returns `Ok(None)` when the provider has no match for the address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider cannot be reached or its
    /// response cannot be parsed.
    async fn resolve(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// A geocoder that always answers with the same coordinate.
///
/// Useful when the caller already knows the location (e.g. the CLI's
/// `--lat/--lon` flags) but still wants to run the full pipeline.
#[derive(Debug, Clone, Copy)]
pub struct StaticGeocoder {
    coordinate: Coordinate,
}

impl StaticGeocoder {
    /// Creates a geocoder pinned to `coordinate`.
    #[must_use]
    pub const fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        Ok(Some(GeocodedAddress {
            coordinate: self.coordinate,
            matched_address: None,
            provider: GeocodingProvider::Static,
        }))
    }
}
