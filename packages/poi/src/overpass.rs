//! Overpass API client for `OpenStreetMap` POI retrieval.
//!
//! Builds one query per category from the classifier's rule list, so the
//! provider only asks for elements that can plausibly classify into the
//! requested category. Ways and relations are reduced to their center
//! point (`out center`).
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API>

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use urbansight_poi_models::{Coordinate, PoiCategory, RawPoi};

use crate::classifier::{self, TagMatch};
use crate::{PoiProvider, ProviderError};

/// Default public Overpass endpoint.
pub const DEFAULT_BASE_URL: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query timeout, in seconds, embedded in every query.
const QUERY_TIMEOUT_SECS: u32 = 25;

/// Overpass API provider.
pub struct OverpassProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OverpassProvider {
    /// Creates a provider against `base_url` with the given `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: String, user_agent: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { base_url, client })
    }

    /// Creates a provider from `OVERPASS_URL` and `URBANSIGHT_USER_AGENT`,
    /// falling back to the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, ProviderError> {
        let base_url =
            std::env::var("OVERPASS_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let user_agent = std::env::var("URBANSIGHT_USER_AGENT")
            .unwrap_or_else(|_| concat!("urbansight/", env!("CARGO_PKG_VERSION")).to_string());
        Self::new(base_url, &user_agent)
    }
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Builds the Overpass QL query for one category.
#[must_use]
pub fn build_query(origin: Coordinate, radius_m: f64, category: PoiCategory) -> String {
    let around = format!(
        "around:{:.0},{:.6},{:.6}",
        radius_m, origin.latitude, origin.longitude
    );

    let mut statements = String::new();
    for rule in classifier::rules_for(category) {
        let filter = match rule.values {
            TagMatch::Any => format!("[\"{}\"]", rule.key),
            TagMatch::OneOf(values) => {
                format!("[\"{}\"~\"^({})$\"]", rule.key, values.join("|"))
            }
        };
        statements.push_str(&format!("  nwr{filter}({around});\n"));
    }

    format!("[out:json][timeout:{QUERY_TIMEOUT_SECS}];\n(\n{statements});\nout center tags;")
}

/// Converts the Overpass response into raw records, dropping elements
/// without a usable position.
fn parse_response(response: OverpassResponse) -> Vec<RawPoi> {
    response
        .elements
        .into_iter()
        .filter_map(|element| {
            let coordinate = match (element.lat, element.lon, element.center) {
                (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
                (_, _, Some(center)) => Coordinate::new(center.lat, center.lon),
                _ => {
                    log::debug!(
                        "Skipping {}/{} without coordinates",
                        element.element_type,
                        element.id
                    );
                    return None;
                }
            };

            Some(RawPoi {
                id: format!("{}/{}", element.element_type, element.id),
                coordinate,
                tags: element.tags,
            })
        })
        .collect()
}

#[async_trait]
impl PoiProvider for OverpassProvider {
    fn id(&self) -> &str {
        "overpass"
    }

    async fn fetch(
        &self,
        origin: Coordinate,
        radius_m: f64,
        category: PoiCategory,
    ) -> Result<Vec<RawPoi>, ProviderError> {
        let query = build_query(origin, radius_m, category);
        log::debug!("Overpass query for {category}:\n{query}");

        let resp = self
            .client
            .post(&self.base_url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let response: OverpassResponse = serde_json::from_str(&body)?;
        let pois = parse_response(response);

        log::debug!("Overpass returned {} elements for {category}", pois.len());

        Ok(pois)
    }
}
