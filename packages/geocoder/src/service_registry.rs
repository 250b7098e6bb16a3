//! Reverse geocoding providers known at build time.
//!
//! One TOML file per provider lives in `services/`. The files are embedded
//! with `include_str!` and parsed once, on first access.

use std::sync::LazyLock;

use serde::Deserialize;

/// One provider entry from `services/*.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Identifier used by the `GEOCODER` selection (`"mapbox"`,
    /// `"nominatim"`).
    pub id: String,
    /// Display name for logs.
    pub name: String,
    /// Disabled entries are never queried.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Lower values are queried first.
    pub priority: u32,
    /// Endpoint settings.
    pub provider: ProviderConfig,
}

/// Endpoint settings, selected by the `type` key of the `[provider]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Mapbox `mapbox.places` reverse lookup. Needs `MAPBOX_TOKEN`.
    Mapbox {
        /// Endpoint the `{lng},{lat}.json` path is appended to.
        base_url: String,
        /// `language` query parameter.
        #[serde(default)]
        language: Option<String>,
    },
    /// Nominatim `/reverse`.
    Nominatim {
        /// Reverse endpoint URL.
        base_url: String,
        /// Minimum spacing between requests, in milliseconds.
        rate_limit_ms: u64,
        /// `accept-language` query parameter.
        #[serde(default)]
        language: Option<String>,
    },
}

impl ProviderConfig {
    /// Whether the provider cannot be used without an access token.
    #[must_use]
    pub const fn needs_token(&self) -> bool {
        matches!(self, Self::Mapbox { .. })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::Mapbox { base_url, .. } | Self::Nominatim { base_url, .. } => base_url,
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

static SERVICE_FILES: &[(&str, &str)] = &[
    ("mapbox.toml", include_str!("../services/mapbox.toml")),
    ("nominatim.toml", include_str!("../services/nominatim.toml")),
];

static SERVICES: LazyLock<Vec<GeocodingService>> = LazyLock::new(|| {
    SERVICE_FILES
        .iter()
        .map(|(file, text)| {
            toml::from_str(text)
                .unwrap_or_else(|e| panic!("Embedded services/{file} is invalid: {e}"))
        })
        .collect()
});

/// Every registered provider, in file order.
///
/// # Panics
///
/// Panics if an embedded TOML file is malformed.
#[must_use]
pub fn all_services() -> &'static [GeocodingService] {
    &SERVICES
}

/// Enabled providers in query order.
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut services: Vec<GeocodingService> = all_services()
        .iter()
        .filter(|s| s.enabled)
        .cloned()
        .collect();
    services.sort_by_key(|s| s.priority);
    services
}

/// Looks up a provider by ID.
#[must_use]
pub fn find_service(id: &str) -> Option<&'static GeocodingService> {
    all_services().iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(services: &[GeocodingService]) -> Vec<&str> {
        services.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn embedded_files_parse() {
        assert_eq!(ids(all_services()), vec!["mapbox", "nominatim"]);
    }

    #[test]
    fn mapbox_is_queried_before_nominatim() {
        assert_eq!(ids(&enabled_services()), vec!["mapbox", "nominatim"]);
    }

    #[test]
    fn nominatim_is_throttled_to_one_request_per_second() {
        let ProviderConfig::Nominatim { rate_limit_ms, .. } =
            &find_service("nominatim").unwrap().provider
        else {
            panic!("nominatim entry has the wrong provider type");
        };
        assert_eq!(*rate_limit_ms, 1000);
    }

    #[test]
    fn only_mapbox_needs_a_token() {
        assert!(find_service("mapbox").unwrap().provider.needs_token());
        assert!(!find_service("nominatim").unwrap().provider.needs_token());
        assert!(find_service("google").is_none());
    }

    #[test]
    fn endpoints_use_https() {
        for service in all_services() {
            assert!(
                service.provider.base_url().starts_with("https://"),
                "{} endpoint is not https",
                service.id
            );
        }
    }
}
