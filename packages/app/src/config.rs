//! Environment-driven configuration.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `CITYWATCH_API_URL` | Report repository base URL | `http://localhost:3000` |
//! | `CITYWATCH_USER` | Signed-in user ID | none (read-only) |
//! | `MAPBOX_TOKEN` | Mapbox access token | none (Mapbox skipped) |
//! | `GEOCODER` | `mapbox`, `nominatim`, or `auto` | `auto` |

use citywatch_client::HttpReportRepository;
use citywatch_geocoder::{ChainGeocoder, GeocodeError, build_chain, service_registry};

use crate::AppError;

/// Repository URL used when `CITYWATCH_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Initial map centre as (latitude, longitude).
pub const DEFAULT_MAP_CENTER: (f64, f64) = (21.15226, -101.71132);

/// Initial map zoom level.
pub const DEFAULT_MAP_ZOOM: u8 = 13;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Report repository base URL.
    pub api_url: String,
    /// Signed-in user ID.
    pub user_id: Option<String>,
    /// Mapbox access token.
    pub mapbox_token: Option<String>,
    /// Restricts geocoding to one registry service.
    pub geocoder: Option<String>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_url: var("CITYWATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_id: var("CITYWATCH_USER"),
            mapbox_token: var("MAPBOX_TOKEN"),
            geocoder: var("GEOCODER").filter(|g| !g.eq_ignore_ascii_case("auto")),
        }
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when no user is configured.
    pub fn require_user(&self) -> Result<&str, AppError> {
        self.user_id.as_deref().ok_or_else(|| AppError::Validation {
            message: "no user signed in (set CITYWATCH_USER or pass --user)".to_string(),
        })
    }

    /// Builds the report repository client.
    #[must_use]
    pub fn repository(&self) -> HttpReportRepository {
        HttpReportRepository::new(&self.api_url)
    }

    /// Builds the geocoder chain from the enabled registry services.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if no provider is usable.
    pub fn geocoder(&self) -> Result<ChainGeocoder, GeocodeError> {
        build_chain(
            &service_registry::enabled_services(),
            self.geocoder.as_deref(),
            self.mapbox_token.as_deref(),
        )
    }
}
