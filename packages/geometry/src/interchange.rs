//! Conversion between capture geometry and `GeoJSON` interchange form.
//!
//! Interchange positions are `[longitude, latitude]`. Polygons are emitted
//! as a single exterior ring that always repeats its first position as its
//! last. Decoding keeps the stored ring as-is, closing duplicate included.

use geo::{Coord, LineString};
use geojson::{PolygonType, Position, Value};

use crate::{Coordinate, Geometry, GeometryError, GeometryKind};

/// Minimum number of positions in a closed interchange ring (three distinct
/// vertices plus the repeated first vertex).
pub const MIN_RING_POSITIONS: usize = 4;

/// Converts a geometry to its `GeoJSON` interchange form.
///
/// # Errors
///
/// Returns [`GeometryError::RingTooShort`] if a polygon ring has fewer than
/// [`MIN_RING_POSITIONS`] positions after closure.
pub fn to_interchange(geometry: &Geometry) -> Result<geojson::Geometry, GeometryError> {
    let value = match geometry {
        Geometry::Point { coordinate } => Value::Point(to_position(*coordinate)),
        Geometry::Polygon { ring } => Value::Polygon(closed_ring(ring)?),
    };
    Ok(geojson::Geometry::new(value))
}

/// Converts a stored `GeoJSON` geometry back to capture form.
///
/// # Errors
///
/// Returns [`GeometryError::UnsupportedInterchange`] for anything other than
/// `Point` and `Polygon`, and [`GeometryError::MalformedPosition`] if a
/// position lacks two in-range values.
pub fn from_interchange(geometry: &geojson::Geometry) -> Result<Geometry, GeometryError> {
    match &geometry.value {
        Value::Point(position) => Ok(Geometry::point(from_position(position)?)),
        Value::Polygon(rings) => {
            let exterior = rings
                .first()
                .filter(|ring| !ring.is_empty())
                .ok_or_else(|| GeometryError::MalformedPosition {
                    message: "polygon has no exterior ring".to_string(),
                })?;
            let ring = exterior
                .iter()
                .map(|p| from_position(p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::Polygon { ring })
        }
        other => Err(GeometryError::UnsupportedInterchange {
            kind: other.type_name().to_string(),
        }),
    }
}

/// Returns the capture shape an interchange geometry decodes to, if any.
#[must_use]
pub const fn kind_of(value: &Value) -> Option<GeometryKind> {
    match value {
        Value::Point(_) => Some(GeometryKind::Point),
        Value::Polygon(_) => Some(GeometryKind::Polygon),
        _ => None,
    }
}

fn to_position(coordinate: Coordinate) -> Position {
    vec![coordinate.longitude, coordinate.latitude]
}

fn from_position(position: &[f64]) -> Result<Coordinate, GeometryError> {
    match position {
        [longitude, latitude, ..] => Coordinate::new(*latitude, *longitude),
        _ => Err(GeometryError::MalformedPosition {
            message: format!("expected [lng, lat], got {position:?}"),
        }),
    }
}

/// Builds the closed exterior ring for a polygon.
fn closed_ring(vertices: &[Coordinate]) -> Result<PolygonType, GeometryError> {
    let mut ring: LineString<f64> = vertices.iter().copied().map(Coord::from).collect();
    ring.close();

    let positions = ring.0.len();
    if positions < MIN_RING_POSITIONS {
        return Err(GeometryError::RingTooShort { positions });
    }

    Ok(vec![ring.coords().map(|c| vec![c.x, c.y]).collect()])
}
