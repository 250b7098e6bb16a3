//! Map rendering capability.
//!
//! The capture machine never talks to a map library directly. Front ends
//! implement [`MapSurface`] for whatever draws the map and feed clicks back
//! in as plain [`Coordinate`] values.

use citywatch_geometry::{Coordinate, Geometry};

use crate::{CaptureSession, CaptureState};

/// Something that can draw markers, rings, and popups on a map.
pub trait MapSurface {
    /// Draws a point marker with a label.
    fn render_marker(&mut self, coordinate: Coordinate, label: &str);

    /// Draws a polygon ring with a label. The ring is drawn exactly as given.
    fn render_polygon(&mut self, ring: &[Coordinate], label: &str);

    /// Shows the dismissible inspect popup.
    fn show_popup(&mut self, coordinate: Coordinate, text: &str);

    /// Removes the inspect popup, if shown.
    fn dismiss_popup(&mut self);
}

/// Draws a geometry as a marker or ring.
pub fn render_geometry(surface: &mut dyn MapSurface, geometry: &Geometry, label: &str) {
    match geometry {
        Geometry::Point { coordinate } => surface.render_marker(*coordinate, label),
        Geometry::Polygon { ring } => surface.render_polygon(ring, label),
    }
}

impl CaptureSession {
    /// Draws the in-progress capture, if any.
    pub fn render(&self, surface: &mut dyn MapSurface) {
        match self.state() {
            CaptureState::Idle | CaptureState::PickingPoint => {}
            CaptureState::DrawingPolygon { vertices } => {
                surface.render_polygon(vertices, &format!("{} vertices", vertices.len()));
            }
            CaptureState::ReadyToSubmit { geometry, address } => {
                render_geometry(surface, geometry, address.label());
            }
        }
    }
}
