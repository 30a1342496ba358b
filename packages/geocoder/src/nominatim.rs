//! Nominatim / OpenStreetMap geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance. An analysis issues a single geocoding request, so
//! no client-side throttling is done here.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;
use urbansight_poi_models::Coordinate;

use crate::{GeocodeError, GeocodedAddress, Geocoder, GeocodingProvider};

/// Default public Nominatim search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim free-form search client.
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    /// Creates a client for `base_url`.
    ///
    /// Nominatim's usage policy requires an identifying `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: String, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { base_url, client })
    }

    /// Creates a client from `NOMINATIM_URL` and `URBANSIGHT_USER_AGENT`,
    /// falling back to the public instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, GeocodeError> {
        let base_url =
            std::env::var("NOMINATIM_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let user_agent = std::env::var("URBANSIGHT_USER_AGENT")
            .unwrap_or_else(|_| concat!("urbansight/", env!("CARGO_PKG_VERSION")).to_string());
        Self::new(base_url, &user_agent)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;
        let result = parse_response(&body)?;

        match &result {
            Some(geocoded) => log::info!("Geocoded '{address}' to {}", geocoded.coordinate),
            None => log::warn!("Nominatim: no match for '{address}'"),
        }

        Ok(result)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        coordinate: Coordinate::new(lat, lon),
        matched_address: display_name,
        provider: GeocodingProvider::Nominatim,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "-23.5614",
            "lon": "-46.6559",
            "display_name": "Avenida Paulista, Bela Vista, São Paulo, Brasil"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.coordinate.latitude - -23.5614).abs() < 1e-4);
        assert!((result.coordinate.longitude - -46.6559).abs() < 1e-4);
        assert_eq!(result.provider, GeocodingProvider::Nominatim);
        assert!(result.matched_address.unwrap().starts_with("Avenida Paulista"));
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({"error": "bad request"});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
