//! Mapbox reverse geocoder.
//!
//! Uses the `mapbox.places` endpoint with the same access token the map
//! tiles are served with.
//!
//! See <https://docs.mapbox.com/api/search/geocoding-v5/#reverse-geocoding>

use citywatch_geometry::Coordinate;

use crate::{GeocodeError, ReverseGeocoder, check_status};

/// Reverse geocoder backed by the Mapbox Geocoding API.
pub struct MapboxGeocoder {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    language: Option<String>,
}

impl MapboxGeocoder {
    /// Creates a Mapbox provider.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        base_url: String,
        access_token: String,
        language: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            access_token,
            language,
        }
    }

    fn url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/{},{}.json",
            self.base_url.trim_end_matches('/'),
            coordinate.longitude,
            coordinate.latitude
        )
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for MapboxGeocoder {
    fn id(&self) -> &str {
        "mapbox"
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let mut query = vec![("access_token", self.access_token.as_str())];
        if let Some(language) = &self.language {
            query.push(("language", language.as_str()));
        }

        let resp = self
            .client
            .get(self.url(coordinate))
            .query(&query)
            .send()
            .await?;
        let resp = check_status(resp)?;

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Mapbox feature collection, taking the most specific feature.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Mapbox response has no features array".to_string(),
        })?;

    Ok(features
        .first()
        .and_then(|f| f["place_name"].as_str())
        .map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lng_lat_path() {
        let geocoder = MapboxGeocoder::new(
            reqwest::Client::new(),
            "https://api.mapbox.com/geocoding/v5/mapbox.places/".to_string(),
            "pk.test".to_string(),
            None,
        );
        let url = geocoder.url(Coordinate::new(21.15226, -101.71132).unwrap());
        assert_eq!(
            url,
            "https://api.mapbox.com/geocoding/v5/mapbox.places/-101.71132,21.15226.json"
        );
    }

    #[test]
    fn parses_first_feature() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "place_name": "Calle Madero 101, Centro, 37000 León, Guanajuato, México" },
                { "place_name": "Centro, León, Guanajuato, México" }
            ]
        });
        assert_eq!(
            parse_response(&body).unwrap().as_deref(),
            Some("Calle Madero 101, Centro, 37000 León, Guanajuato, México")
        );
    }

    #[test]
    fn parses_empty_collection() {
        let body = serde_json::json!({ "type": "FeatureCollection", "features": [] });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_error_body() {
        let body = serde_json::json!({ "message": "Not Authorized - Invalid Token" });
        assert!(parse_response(&body).is_err());
    }
}
