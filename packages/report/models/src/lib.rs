#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report types exchanged with the `CityWatch` report repository.
//!
//! These mirror the JSON documents the repository stores. Geometry is kept
//! in `GeoJSON` interchange form; use [`Report::geometry`] to decode it for
//! rendering or editing.

use chrono::{DateTime, Utc};
use citywatch_geometry::{Geometry, GeometryError, GeometryKind, from_interchange, kind_of};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Maximum description length shown in list previews.
pub const DESCRIPTION_PREVIEW_LEN: usize = 50;

/// Incident category of a report.
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
pub enum ReportType {
    /// Damaged road surface
    Pothole,
    /// Broken or missing street lighting
    Streetlight,
    /// Uncollected garbage or illegal dumping
    Garbage,
    /// Vandalism on public or private walls
    Graffiti,
    /// Standing water or flooded streets
    Flooding,
    /// Traffic accident
    Accident,
    /// Anything not covered above
    Other,
    /// Area report. Reserved for polygon geometry.
    #[serde(alias = "Polígono")]
    #[strum(to_string = "Polygon", serialize = "Polígono")]
    Polygon,
}

impl ReportType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Pothole,
            Self::Streetlight,
            Self::Garbage,
            Self::Graffiti,
            Self::Flooding,
            Self::Accident,
            Self::Other,
            Self::Polygon,
        ]
    }

    /// Types a user may pick for a point report.
    #[must_use]
    pub fn selectable() -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|t| !t.is_geometry_locked())
            .collect()
    }

    /// Whether this type is tied to a geometry kind instead of chosen freely.
    #[must_use]
    pub const fn is_geometry_locked(self) -> bool {
        matches!(self, Self::Polygon)
    }

    /// Resolves the type to submit for a geometry of the given kind.
    ///
    /// Polygons always become [`ReportType::Polygon`]. Points need an
    /// explicit, non-locked type.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError`] if a point has no type or requests a
    /// geometry-locked one.
    pub const fn resolve(
        requested: Option<Self>,
        kind: GeometryKind,
    ) -> Result<Self, CategoryError> {
        match (kind, requested) {
            (GeometryKind::Polygon, _) => Ok(Self::Polygon),
            (GeometryKind::Point, None) => Err(CategoryError::Missing),
            (GeometryKind::Point, Some(t)) if t.is_geometry_locked() => {
                Err(CategoryError::GeometryLocked { requested: t })
            }
            (GeometryKind::Point, Some(t)) => Ok(t),
        }
    }
}

/// Error returned when a report type cannot be used for a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// No type was selected for a point report.
    #[error("select a report type")]
    Missing,
    /// The requested type is reserved for another geometry kind.
    #[error("report type {requested} is reserved for polygon reports")]
    GeometryLocked {
        /// The rejected type.
        requested: ReportType,
    },
}

/// A populated user document embedded in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User document ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// First name.
    #[serde(default)]
    pub name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// The owner of a report: either a bare ID or a populated user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Populated user document.
    Populated(UserSummary),
    /// Bare user ID.
    Id(String),
}

impl UserRef {
    /// Returns the user ID regardless of representation.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Populated(user) => &user.id,
            Self::Id(id) => id,
        }
    }

    /// Name to show for this user, falling back to a shortened ID.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Self::Populated(UserSummary {
            name: Some(name), ..
        }) = self
        {
            return name.clone();
        }
        let id = self.id();
        if id.chars().count() > 8 {
            format!("{}...", id.chars().take(8).collect::<String>())
        } else {
            id.to_string()
        }
    }
}

/// A stored report as returned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Repository document ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Incident category.
    #[serde(rename = "type")]
    pub report_type: ReportType,
    /// Free-text description.
    pub description: String,
    /// Reverse-geocoded address label.
    #[serde(default)]
    pub address: String,
    /// Geometry in `GeoJSON` interchange form.
    pub location: geojson::Geometry,
    /// Owning user.
    #[serde(default)]
    pub user: Option<UserRef>,
    /// Owning user ID, sent by some repository versions instead of `user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Shape of the stored geometry, `None` for unsupported geometries.
    #[must_use]
    pub const fn geometry_kind(&self) -> Option<GeometryKind> {
        kind_of(&self.location.value)
    }

    /// Decodes the stored geometry.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the stored geometry is not a valid point
    /// or polygon.
    pub fn geometry(&self) -> Result<Geometry, GeometryError> {
        from_interchange(&self.location)
    }

    /// ID of the owning user, if the report carries one.
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(UserRef::id)
            .or(self.user_id.as_deref())
    }

    /// Whether `user_id` owns this report.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id() == Some(user_id)
    }

    /// Whether `user_id` may edit this report. Only point reports are
    /// editable.
    #[must_use]
    pub fn is_editable_by(&self, user_id: &str) -> bool {
        self.is_owned_by(user_id) && self.geometry_kind() == Some(GeometryKind::Point)
    }

    /// Short human-readable location summary.
    #[must_use]
    pub fn location_summary(&self) -> String {
        match &self.location.value {
            geojson::Value::Point(position) => match position.as_slice() {
                [lng, lat, ..] => format!("Lat: {lat:.4}, Lng: {lng:.4}"),
                _ => "N/A".to_string(),
            },
            geojson::Value::Polygon(rings) => {
                format!("Polygon: {} vertices", rings.first().map_or(0, Vec::len))
            }
            _ => "Complex location".to_string(),
        }
    }

    /// Description truncated to [`DESCRIPTION_PREVIEW_LEN`] characters.
    #[must_use]
    pub fn description_preview(&self) -> String {
        if self.description.chars().count() > DESCRIPTION_PREVIEW_LEN {
            let head: String = self
                .description
                .chars()
                .take(DESCRIPTION_PREVIEW_LEN)
                .collect();
            format!("{head}...")
        } else {
            self.description.clone()
        }
    }
}

/// Filters `reports` down to those owned by `user_id`.
#[must_use]
pub fn reports_owned_by<'a>(reports: &'a [Report], user_id: &str) -> Vec<&'a Report> {
    reports.iter().filter(|r| r.is_owned_by(user_id)).collect()
}

/// Body sent to the repository when creating or updating a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Incident category.
    #[serde(rename = "type")]
    pub report_type: ReportType,
    /// Free-text description.
    pub description: String,
    /// Address label.
    pub address: String,
    /// Geometry in `GeoJSON` interchange form.
    pub location: geojson::Geometry,
    /// Submitting user ID.
    pub user: String,
}

impl ReportPayload {
    /// Shape of the payload geometry.
    #[must_use]
    pub const fn geometry_kind(&self) -> Option<GeometryKind> {
        kind_of(&self.location.value)
    }
}
