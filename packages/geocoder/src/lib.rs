#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for `CityWatch` reports.
//!
//! Turns a map coordinate into a human-readable address label using a
//! multi-provider strategy configured via TOML files in `services/`:
//!
//! 1. **Mapbox** (priority 1): needs the access token used for map tiles
//!    (`MAPBOX_TOKEN`). Skipped when no token is configured.
//! 2. **Nominatim / OpenStreetMap** (priority 2): free, 1 req/sec rate
//!    limit.
//!
//! Callers that only need a label should use [`resolve_address`], which
//! never fails: lookup errors are downgraded to a fallback label so they
//! cannot block a report submission.

pub mod mapbox;
pub mod nominatim;
pub mod service_registry;

use std::time::Duration;

use citywatch_geometry::Coordinate;
use thiserror::Error;

use crate::mapbox::MapboxGeocoder;
use crate::nominatim::NominatimGeocoder;
use crate::service_registry::{GeocodingService, ProviderConfig};

/// Label used when the geocoder answered but knows no address.
pub const NO_RESULT_LABEL: &str = "No address found";

/// Label used when the lookup itself failed.
pub const FAILED_LABEL: &str = "Address lookup failed";

/// Per-request timeout for provider HTTP calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status.
    #[error("Provider returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No usable provider could be configured.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// A reverse geocoding provider.
#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Service identifier, matching the registry `id`.
    fn id(&self) -> &str;

    /// Looks up the address at `coordinate`.
    ///
    /// Returns `Ok(None)` when the provider has no address for the location.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing fails.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError>;
}

/// Outcome of [`resolve_address`]. Always yields a displayable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressLabel {
    /// The provider returned an address.
    Found(String),
    /// The provider knows no address here.
    NoResult,
    /// The lookup failed.
    Failed,
}

impl AddressLabel {
    /// The text to display or submit.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Found(address) => address,
            Self::NoResult => NO_RESULT_LABEL.to_string(),
            Self::Failed => FAILED_LABEL.to_string(),
        }
    }
}

impl std::fmt::Display for AddressLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(address) => f.write_str(address),
            Self::NoResult => f.write_str(NO_RESULT_LABEL),
            Self::Failed => f.write_str(FAILED_LABEL),
        }
    }
}

/// Resolves an address label for `coordinate`. Never fails.
pub async fn resolve_address(geocoder: &dyn ReverseGeocoder, coordinate: Coordinate) -> AddressLabel {
    match geocoder.reverse(coordinate).await {
        Ok(Some(address)) => AddressLabel::Found(address),
        Ok(None) => {
            log::debug!("No address for {coordinate} from {}", geocoder.id());
            AddressLabel::NoResult
        }
        Err(e) => {
            log::warn!("Address lookup for {coordinate} via {} failed: {e}", geocoder.id());
            AddressLabel::Failed
        }
    }
}

/// Tries providers in priority order until one returns an address.
pub struct ChainGeocoder {
    providers: Vec<Box<dyn ReverseGeocoder>>,
}

impl ChainGeocoder {
    /// Creates a chain over already-constructed providers.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn ReverseGeocoder>>) -> Self {
        Self { providers }
    }

    /// IDs of the providers in the order they are tried.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for ChainGeocoder {
    fn id(&self) -> &str {
        "chain"
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let mut answered = false;
        let mut last_error = None;

        for provider in &self.providers {
            match provider.reverse(coordinate).await {
                Ok(Some(address)) => return Ok(Some(address)),
                Ok(None) => answered = true,
                Err(e) => {
                    log::warn!("Geocoder {} failed, trying next: {e}", provider.id());
                    last_error = Some(e);
                }
            }
        }

        if answered {
            return Ok(None);
        }
        Err(last_error.unwrap_or_else(|| GeocodeError::Config {
            message: "no geocoding providers configured".to_string(),
        }))
    }
}

/// Builds a provider chain from registry entries.
///
/// `only` restricts the chain to one service ID. Mapbox services are
/// skipped when `mapbox_token` is `None`.
///
/// # Errors
///
/// Returns [`GeocodeError::Config`] if `only` names an unknown service or
/// no provider is usable, and [`GeocodeError::Http`] if the HTTP client
/// cannot be built.
pub fn build_chain(
    services: &[GeocodingService],
    only: Option<&str>,
    mapbox_token: Option<&str>,
) -> Result<ChainGeocoder, GeocodeError> {
    if let Some(id) = only.filter(|id| !services.iter().any(|s| s.id == *id)) {
        return Err(GeocodeError::Config {
            message: format!("unknown geocoding service '{id}'"),
        });
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("citywatch/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let mut providers: Vec<Box<dyn ReverseGeocoder>> = Vec::new();
    for service in services.iter().filter(|s| only.is_none_or(|id| s.id == id)) {
        if service.provider.needs_token() && mapbox_token.is_none() {
            log::info!("Skipping {}: MAPBOX_TOKEN not set", service.name);
            continue;
        }
        match &service.provider {
            ProviderConfig::Mapbox { base_url, language } => {
                providers.push(Box::new(MapboxGeocoder::new(
                    client.clone(),
                    base_url.clone(),
                    mapbox_token.unwrap_or_default().to_string(),
                    language.clone(),
                )));
            }
            ProviderConfig::Nominatim {
                base_url,
                rate_limit_ms,
                language,
            } => {
                providers.push(Box::new(NominatimGeocoder::new(
                    client.clone(),
                    base_url.clone(),
                    language.clone(),
                    *rate_limit_ms,
                )));
            }
        }
    }

    if providers.is_empty() {
        return Err(GeocodeError::Config {
            message: "no usable geocoding provider (is MAPBOX_TOKEN set?)".to_string(),
        });
    }

    let chain = ChainGeocoder::new(providers);
    log::debug!("Geocoder chain: {:?}", chain.provider_ids());
    Ok(chain)
}

/// Maps provider HTTP statuses onto [`GeocodeError`].
fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GeocodeError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    if !status.is_success() {
        return Err(GeocodeError::Status {
            status: status.as_u16(),
        });
    }
    Ok(resp)
}
