#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! POI classification and map data provider abstraction.
//!
//! Each map data backend implements the [`PoiProvider`] trait to fetch
//! raw records around a coordinate for one category at a time. Raw
//! records are turned into [`urbansight_poi_models::PointOfInterest`]
//! values by [`classifier::classify`].

pub mod classifier;
pub mod overpass;

use async_trait::async_trait;
use urbansight_poi_models::{Coordinate, PoiCategory, RawPoi};

/// Errors that can occur while fetching POIs from a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with a non-success status.
    #[error("Provider returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The request did not complete within its time budget.
    #[error("Request timed out after {millis} ms")]
    Timeout {
        /// The budget that was exceeded.
        millis: u64,
    },

    /// The response was well-formed JSON but not in the expected shape.
    #[error("Malformed provider response: {message}")]
    Malformed {
        /// Description of what went wrong.
        message: String,
    },
}

impl ProviderError {
    /// Returns `true` if the error is likely transient and worth retrying.
    ///
    /// Timeouts, connection failures, HTTP 429 and HTTP 5xx are transient.
    /// Other 4xx responses and malformed bodies are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_request(),
            Self::Status { status } => *status == 429 || (500..600).contains(status),
            Self::Timeout { .. } => true,
            Self::Json(_) | Self::Malformed { .. } => false,
        }
    }
}

/// Trait that all map data providers must implement.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    /// Returns a unique identifier for this provider (e.g. `"overpass"`).
    fn id(&self) -> &str;

    /// Fetches raw records of `category` within `radius_m` meters of
    /// `origin`.
    ///
    /// Providers may return records that classify into other categories
    /// (a broad `shop=*` filter also returns supermarkets); callers
    /// classify and de-duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request fails or the response
    /// cannot be parsed.
    async fn fetch(
        &self,
        origin: Coordinate,
        radius_m: f64,
        category: PoiCategory,
    ) -> Result<Vec<RawPoi>, ProviderError>;
}
