//! Nominatim / `OpenStreetMap` reverse geocoder.
//!
//! The public instance allows **1 request per second**. The provider keeps
//! the time of its last request and sleeps before the next one if needed.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use std::time::{Duration, Instant};

use citywatch_geometry::Coordinate;
use tokio::sync::Mutex;

use crate::{GeocodeError, ReverseGeocoder, check_status};

/// Reverse geocoder backed by a Nominatim `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    language: Option<String>,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Creates a Nominatim provider.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        language: Option<String>,
        rate_limit_ms: u64,
    ) -> Self {
        Self {
            client,
            base_url,
            language,
            min_interval: Duration::from_millis(rate_limit_ms),
            last_request: Mutex::new(None),
        }
    }

    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    fn id(&self) -> &str {
        "nominatim"
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        self.throttle().await;

        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        let mut query = vec![
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
            ("format", "jsonv2"),
        ];
        if let Some(language) = &self.language {
            query.push(("accept-language", language.as_str()));
        }

        let resp = self.client.get(&self.base_url).query(&query).send().await?;
        let resp = check_status(resp)?;

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim reverse response.
///
/// Nominatim answers coordinates it cannot place (open sea, for instance)
/// with `{"error": "Unable to geocode"}` and a 200 status.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    if body.get("error").is_some() {
        return Ok(None);
    }

    let obj = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    Ok(obj
        .get("display_name")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from))
}
