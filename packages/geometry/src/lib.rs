#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate and geometry types for `CityWatch` reports.
//!
//! Map interaction produces [`Coordinate`] values in `{latitude, longitude}`
//! order. Reports are persisted as `GeoJSON` geometries whose positions are
//! `[longitude, latitude]`. The [`interchange`] module converts between the
//! two and enforces polygon ring closure.

pub mod interchange;

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use interchange::{MIN_RING_POSITIONS, from_interchange, kind_of, to_interchange};

/// Minimum number of distinct vertices a polygon must be drawn with.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Errors from geometry construction and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A latitude or longitude is not finite or is out of range.
    #[error("Invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },

    /// A polygon was built from too few distinct vertices.
    #[error("A polygon needs at least 3 distinct vertices, got {distinct}")]
    InsufficientVertices {
        /// Number of distinct vertices supplied.
        distinct: usize,
    },

    /// The closed ring has fewer than [`MIN_RING_POSITIONS`] positions.
    #[error("Closed ring has {positions} positions, expected at least 4")]
    RingTooShort {
        /// Number of positions after closure.
        positions: usize,
    },

    /// The interchange geometry is not a `Point` or `Polygon`.
    #[error("Unsupported interchange geometry: {kind}")]
    UnsupportedInterchange {
        /// `GeoJSON` type name of the rejected geometry.
        kind: String,
    },

    /// A position could not be turned into a coordinate.
    #[error("Malformed position: {message}")]
    MalformedPosition {
        /// Description of the problem.
        message: String,
    },
}

/// A geographic point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, -90 to 90.
    pub latitude: f64,
    /// Longitude, -180 to 180.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidCoordinate`] if either value is not
    /// finite or falls outside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeometryError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(GeometryError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Bit-level identity used for distinct-vertex counting. Signed zeros
    /// share a key so the count agrees with `==`, which ring closure uses.
    fn key(self) -> (u64, u64) {
        (canonical_bits(self.latitude), canonical_bits(self.longitude))
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Self {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Self {
            latitude: c.y,
            longitude: c.x,
        }
    }
}

/// Parses `"lat,lng"` (whitespace around either value is ignored).
impl FromStr for Coordinate {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s.split_once(',').ok_or_else(|| GeometryError::MalformedPosition {
            message: format!("expected \"lat,lng\", got \"{s}\""),
        })?;

        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| GeometryError::MalformedPosition {
                    message: format!("\"{}\": {e}", part.trim()),
                })
        };

        Self::new(parse(lat)?, parse(lng)?)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// The two geometry shapes a report can carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum GeometryKind {
    /// A single coordinate.
    Point,
    /// A ring of coordinates.
    Polygon,
}

/// Spatial shape attached to a report.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single picked location.
    Point {
        /// The picked coordinate.
        coordinate: Coordinate,
    },
    /// A drawn area. The ring may or may not repeat its first vertex; closure
    /// happens on conversion to interchange form.
    Polygon {
        /// Vertices in drawing order.
        ring: Vec<Coordinate>,
    },
}

impl Geometry {
    /// Creates a point geometry.
    #[must_use]
    pub const fn point(coordinate: Coordinate) -> Self {
        Self::Point { coordinate }
    }

    /// Creates a polygon geometry from drawn vertices.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InsufficientVertices`] if fewer than
    /// [`MIN_POLYGON_VERTICES`] distinct vertices are supplied.
    pub fn polygon(vertices: Vec<Coordinate>) -> Result<Self, GeometryError> {
        let distinct = distinct_vertex_count(&vertices);
        if distinct < MIN_POLYGON_VERTICES {
            return Err(GeometryError::InsufficientVertices { distinct });
        }
        Ok(Self::Polygon { ring: vertices })
    }

    /// Returns which shape this is.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Point { .. } => GeometryKind::Point,
            Self::Polygon { .. } => GeometryKind::Polygon,
        }
    }

    /// The coordinate used to label this geometry with an address.
    ///
    /// For polygons this is the first vertex only; the label does not
    /// describe the whole shape.
    #[must_use]
    pub fn anchor(&self) -> Option<Coordinate> {
        match self {
            Self::Point { coordinate } => Some(*coordinate),
            Self::Polygon { ring } => ring.first().copied(),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0_f64 } else { value }.to_bits()
}

/// Counts vertices that differ bit-for-bit from every other vertex, with
/// `-0.0` and `0.0` treated as equal.
#[must_use]
pub fn distinct_vertex_count(vertices: &[Coordinate]) -> usize {
    vertices
        .iter()
        .copied()
        .map(Coordinate::key)
        .collect::<BTreeSet<_>>()
        .len()
}
