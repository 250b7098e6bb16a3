#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry capture state machine.
//!
//! A [`CaptureSession`] tracks what a map click means right now: nothing
//! (idle clicks go to the inspect path), picking a single point, or adding
//! a polygon vertex. Completed captures wait in
//! [`CaptureState::ReadyToSubmit`] with an address label that is filled in
//! asynchronously.
//!
//! Every session carries a generation number. Address lookups are issued
//! with a [`LookupTicket`] for the generation that requested them, and
//! [`CaptureSession::apply_lookup`] drops any answer whose ticket no longer
//! matches, so a slow lookup for a cancelled session can never relabel the
//! current one.

pub mod surface;

use citywatch_geometry::{Coordinate, Geometry, GeometryError, GeometryKind};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use surface::{MapSurface, render_geometry};

/// Label shown while an address lookup is outstanding.
pub const PENDING_ADDRESS_LABEL: &str = "Looking up address...";

/// User-facing validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A polygon was finished with too few distinct vertices.
    #[error(
        "A polygon needs at least 3 distinct vertices but only {distinct} were drawn; start drawing again"
    )]
    InsufficientVertices {
        /// Distinct vertices drawn before finishing.
        distinct: usize,
    },

    /// Submission was attempted without a picked location.
    #[error("Pick a location on the map before submitting")]
    MissingSelection,
}

/// Named operations on a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CaptureAction {
    /// Begin placing a point.
    StartPoint,
    /// Begin drawing a polygon.
    StartPolygon,
    /// Close the polygon being drawn.
    FinishPolygon,
    /// Load an existing report for editing.
    BeginEdit,
    /// Pick a new location for a loaded point.
    Relocate,
    /// Mark the ready geometry as submitted.
    Complete,
}

/// Errors from capture operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user supplied insufficient input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation is not supported for this geometry.
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Description of what was refused.
        message: String,
    },

    /// The operation is not valid in the current state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// The attempted operation.
        action: CaptureAction,
        /// Name of the state the session was in.
        state: &'static str,
    },
}

/// Resolution status of the address label attached to a ready capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressStatus {
    /// A lookup is in flight.
    Pending,
    /// The lookup finished (with a real address or a fallback label).
    Resolved(String),
}

impl AddressStatus {
    /// The text to display or submit.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Pending => PENDING_ADDRESS_LABEL,
            Self::Resolved(label) => label,
        }
    }
}

/// Identifies the session an address lookup belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LookupTicket(u64);

/// An address lookup the caller must run and report back through
/// [`CaptureSession::apply_lookup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupRequest {
    /// Session the answer belongs to.
    pub ticket: LookupTicket,
    /// Where to look up.
    pub coordinate: Coordinate,
}

/// Current capture mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    /// No capture in progress.
    #[default]
    Idle,
    /// The next click places a point.
    PickingPoint,
    /// Each click adds a polygon vertex.
    DrawingPolygon {
        /// Vertices in click order.
        vertices: Vec<Coordinate>,
    },
    /// A geometry is complete and may be submitted.
    ReadyToSubmit {
        /// The captured geometry.
        geometry: Geometry,
        /// Address label for the geometry.
        address: AddressStatus,
    },
}

impl CaptureState {
    /// Short state name for messages and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PickingPoint => "picking a point",
            Self::DrawingPolygon { .. } => "drawing a polygon",
            Self::ReadyToSubmit { .. } => "ready to submit",
        }
    }
}

/// What a map click did.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// No capture is active; the click belongs to the inspect path.
    Inspect(Coordinate),
    /// A point was picked and its address must be looked up.
    PointPicked(LookupRequest),
    /// A polygon vertex was added.
    VertexAdded {
        /// Vertices drawn so far.
        count: usize,
    },
    /// The click has no meaning in the current state.
    Ignored,
}

/// The geometry capture state machine.
#[derive(Debug, Default)]
pub struct CaptureSession {
    state: CaptureState,
    generation: u64,
}

impl CaptureSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Whether a capture is in progress.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, CaptureState::Idle)
    }

    /// Vertices drawn so far (empty unless drawing a polygon).
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        match &self.state {
            CaptureState::DrawingPolygon { vertices } => vertices,
            _ => &[],
        }
    }

    /// `Idle → PickingPoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidTransition`] unless the session is idle.
    pub fn start_point(&mut self) -> Result<(), CaptureError> {
        self.require_idle(CaptureAction::StartPoint)?;
        self.transition(CaptureState::PickingPoint);
        Ok(())
    }

    /// `Idle → DrawingPolygon([])`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidTransition`] unless the session is idle.
    pub fn start_polygon(&mut self) -> Result<(), CaptureError> {
        self.require_idle(CaptureAction::StartPolygon)?;
        self.transition(CaptureState::DrawingPolygon {
            vertices: Vec::new(),
        });
        Ok(())
    }

    /// Routes a map click according to the current state.
    pub fn click(&mut self, coordinate: Coordinate) -> ClickOutcome {
        match &mut self.state {
            CaptureState::Idle => ClickOutcome::Inspect(coordinate),
            CaptureState::PickingPoint => {
                self.transition(CaptureState::ReadyToSubmit {
                    geometry: Geometry::point(coordinate),
                    address: AddressStatus::Pending,
                });
                let ticket = self.ticket();
                log::debug!("Point picked at {coordinate} (session {})", ticket.0);
                ClickOutcome::PointPicked(LookupRequest { ticket, coordinate })
            }
            CaptureState::DrawingPolygon { vertices } => {
                vertices.push(coordinate);
                ClickOutcome::VertexAdded {
                    count: vertices.len(),
                }
            }
            CaptureState::ReadyToSubmit { .. } => ClickOutcome::Ignored,
        }
    }

    /// Whether [`Self::finish_polygon`] is currently enabled.
    #[must_use]
    pub fn can_finish(&self) -> bool {
        matches!(&self.state, CaptureState::DrawingPolygon { vertices }
            if vertices.len() >= citywatch_geometry::MIN_POLYGON_VERTICES)
    }

    /// `DrawingPolygon → ReadyToSubmit`.
    ///
    /// The returned lookup targets the first vertex only.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidTransition`] when not drawing. Returns
    /// [`ValidationError::InsufficientVertices`] when fewer than three
    /// distinct vertices were drawn; the session is then reset to idle and
    /// the vertices are discarded.
    pub fn finish_polygon(&mut self) -> Result<LookupRequest, CaptureError> {
        let CaptureState::DrawingPolygon { vertices } = &mut self.state else {
            return Err(self.invalid(CaptureAction::FinishPolygon));
        };
        let vertices = std::mem::take(vertices);

        match Geometry::polygon(vertices) {
            Ok(geometry) => {
                let coordinate = geometry
                    .anchor()
                    .ok_or(ValidationError::InsufficientVertices { distinct: 0 })?;
                self.transition(CaptureState::ReadyToSubmit {
                    geometry,
                    address: AddressStatus::Pending,
                });
                Ok(LookupRequest {
                    ticket: self.ticket(),
                    coordinate,
                })
            }
            Err(GeometryError::InsufficientVertices { distinct }) => {
                log::debug!("Polygon finished with {distinct} distinct vertices, resetting");
                self.transition(CaptureState::Idle);
                Err(ValidationError::InsufficientVertices { distinct }.into())
            }
            Err(e) => {
                self.transition(CaptureState::Idle);
                Err(CaptureError::UnsupportedOperation {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Applies an address lookup result.
    ///
    /// Returns `false` and leaves the session untouched if the ticket belongs
    /// to a superseded session or nothing is waiting for an address.
    pub fn apply_lookup(&mut self, ticket: LookupTicket, label: impl Into<String>) -> bool {
        if ticket != self.ticket() {
            log::debug!(
                "Discarding stale address lookup for session {} (current {})",
                ticket.0,
                self.generation
            );
            return false;
        }
        match &mut self.state {
            CaptureState::ReadyToSubmit { address, .. } => {
                *address = AddressStatus::Resolved(label.into());
                true
            }
            _ => false,
        }
    }

    /// The completed geometry and its address, if ready to submit.
    #[must_use]
    pub const fn ready(&self) -> Option<(&Geometry, &AddressStatus)> {
        match &self.state {
            CaptureState::ReadyToSubmit { geometry, address } => Some((geometry, address)),
            _ => None,
        }
    }

    /// Loads a stored geometry for editing.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::UnsupportedOperation`] for polygon geometry,
    /// leaving the session unchanged, and [`CaptureError::InvalidTransition`]
    /// unless the session is idle.
    pub fn begin_edit(&mut self, geometry: Geometry, address: String) -> Result<(), CaptureError> {
        if geometry.kind() == GeometryKind::Polygon {
            return Err(CaptureError::UnsupportedOperation {
                message: "polygon reports cannot be edited".to_string(),
            });
        }
        self.require_idle(CaptureAction::BeginEdit)?;
        self.transition(CaptureState::ReadyToSubmit {
            geometry,
            address: AddressStatus::Resolved(address),
        });
        Ok(())
    }

    /// `ReadyToSubmit(Point) → PickingPoint`, to move a point before
    /// submitting it.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidTransition`] unless a point is ready,
    /// and [`CaptureError::UnsupportedOperation`] for a ready polygon.
    pub fn relocate(&mut self) -> Result<(), CaptureError> {
        match &self.state {
            CaptureState::ReadyToSubmit {
                geometry: Geometry::Point { .. },
                ..
            } => {
                self.transition(CaptureState::PickingPoint);
                Ok(())
            }
            CaptureState::ReadyToSubmit { .. } => Err(CaptureError::UnsupportedOperation {
                message: "polygon vertices cannot be moved".to_string(),
            }),
            _ => Err(self.invalid(CaptureAction::Relocate)),
        }
    }

    /// `ReadyToSubmit → Idle` after a successful submission.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidTransition`] if nothing was ready.
    pub fn complete(&mut self) -> Result<(), CaptureError> {
        if self.ready().is_none() {
            return Err(self.invalid(CaptureAction::Complete));
        }
        self.transition(CaptureState::Idle);
        Ok(())
    }

    /// `Any → Idle`, discarding in-progress geometry.
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::debug!(
                "Cancelling capture while {} ({} vertices discarded)",
                self.state.name(),
                self.vertices().len()
            );
        }
        self.transition(CaptureState::Idle);
    }

    const fn ticket(&self) -> LookupTicket {
        LookupTicket(self.generation)
    }

    fn transition(&mut self, next: CaptureState) {
        self.generation += 1;
        log::debug!(
            "Capture {} -> {} (session {})",
            self.state.name(),
            next.name(),
            self.generation
        );
        self.state = next;
    }

    fn require_idle(&self, action: CaptureAction) -> Result<(), CaptureError> {
        if self.is_active() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    const fn invalid(&self, action: CaptureAction) -> CaptureError {
        CaptureError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use citywatch_geometry::to_interchange;
    use geojson::Value;

    use super::*;

    fn c(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    fn drawing(points: &[(f64, f64)]) -> CaptureSession {
        let mut session = CaptureSession::new();
        session.start_polygon().unwrap();
        for (lat, lng) in points {
            session.click(c(*lat, *lng));
        }
        session
    }

    #[test]
    fn idle_clicks_go_to_inspect() {
        let mut session = CaptureSession::new();
        assert_eq!(
            session.click(c(21.0, -101.0)),
            ClickOutcome::Inspect(c(21.0, -101.0))
        );
        assert!(!session.is_active());
    }

    #[test]
    fn point_pick_issues_lookup_and_waits() {
        let mut session = CaptureSession::new();
        session.start_point().unwrap();

        let ClickOutcome::PointPicked(request) = session.click(c(21.15, -101.71)) else {
            panic!("expected a picked point");
        };
        assert_eq!(request.coordinate, c(21.15, -101.71));

        let (geometry, address) = session.ready().unwrap();
        assert_eq!(geometry, &Geometry::point(c(21.15, -101.71)));
        assert_eq!(address.label(), PENDING_ADDRESS_LABEL);

        assert!(session.apply_lookup(request.ticket, "Centro, León"));
        assert_eq!(session.ready().unwrap().1.label(), "Centro, León");
        assert_eq!(session.click(c(0.0, 0.0)), ClickOutcome::Ignored);
    }

    #[test]
    fn finishing_closes_the_ring_on_first_vertex() {
        let mut session = drawing(&[(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)]);
        assert!(session.can_finish());

        let request = session.finish_polygon().unwrap();
        assert_eq!(request.coordinate, c(21.0, -101.0));

        let (geometry, _) = session.ready().unwrap();
        let interchange = to_interchange(geometry).unwrap();
        assert_eq!(
            interchange.value,
            Value::Polygon(vec![vec![
                vec![-101.0, 21.0],
                vec![-101.0, 21.1],
                vec![-101.1, 21.1],
                vec![-101.0, 21.0],
            ]])
        );
    }

    #[test]
    fn ring_length_is_vertices_plus_one() {
        for n in 3..12u32 {
            let points: Vec<(f64, f64)> = (0..n)
                .map(|i| {
                    let angle = f64::from(i) * std::f64::consts::TAU / f64::from(n);
                    (21.0 + 0.01 * angle.sin(), -101.0 + 0.01 * angle.cos())
                })
                .collect();
            let mut session = drawing(&points);
            session.finish_polygon().unwrap();

            let interchange = to_interchange(session.ready().unwrap().0).unwrap();
            let Value::Polygon(rings) = interchange.value else {
                panic!("expected polygon");
            };
            assert_eq!(rings[0].len(), points.len() + 1);
            assert_eq!(rings[0].first(), rings[0].last());
        }
    }

    #[test]
    fn short_polygon_resets_to_idle() {
        let mut session = drawing(&[(21.0, -101.0), (21.1, -101.0)]);
        assert!(!session.can_finish());

        assert_eq!(
            session.finish_polygon(),
            Err(CaptureError::Validation(
                ValidationError::InsufficientVertices { distinct: 2 }
            ))
        );
        assert_eq!(session.state(), &CaptureState::Idle);
        assert!(session.vertices().is_empty());

        // Restarting begins from scratch.
        session.start_polygon().unwrap();
        assert!(session.vertices().is_empty());
    }

    #[test]
    fn repeated_clicks_do_not_count_as_distinct() {
        let mut session = drawing(&[(21.0, -101.0), (21.1, -101.0), (21.0, -101.0)]);
        assert!(session.can_finish());
        assert!(matches!(
            session.finish_polygon(),
            Err(CaptureError::Validation(
                ValidationError::InsufficientVertices { distinct: 2 }
            ))
        ));
        assert!(!session.is_active());
    }

    #[test]
    fn signed_zero_repeat_is_rejected_at_finish() {
        let mut session = drawing(&[(0.0, 0.0), (0.0, 1.0), (-0.0, -0.0)]);
        assert!(matches!(
            session.finish_polygon(),
            Err(CaptureError::Validation(
                ValidationError::InsufficientVertices { distinct: 2 }
            ))
        ));
        assert_eq!(session.state(), &CaptureState::Idle);
    }

    #[test]
    fn finished_polygon_always_converts() {
        let mut session = drawing(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (-0.0, 0.0)]);
        session.finish_polygon().unwrap();
        let Value::Polygon(rings) = to_interchange(session.ready().unwrap().0).unwrap().value
        else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].len(), 4);
    }

    #[test]
    fn cancel_from_every_state_discards() {
        let mut picking = CaptureSession::new();
        picking.start_point().unwrap();

        let mut drawing_session = drawing(&[(21.0, -101.0), (21.1, -101.0)]);

        let mut ready = drawing(&[(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)]);
        ready.finish_polygon().unwrap();

        for session in [&mut picking, &mut drawing_session, &mut ready] {
            session.cancel();
            assert_eq!(session.state(), &CaptureState::Idle);
            assert!(session.vertices().is_empty());
            assert!(session.ready().is_none());
        }
    }

    #[test]
    fn stale_lookup_is_discarded() {
        let mut session = CaptureSession::new();
        session.start_point().unwrap();
        let ClickOutcome::PointPicked(stale) = session.click(c(21.0, -101.0)) else {
            panic!("expected a picked point");
        };

        session.cancel();
        session.start_point().unwrap();
        let ClickOutcome::PointPicked(current) = session.click(c(21.2, -101.2)) else {
            panic!("expected a picked point");
        };

        assert!(!session.apply_lookup(stale.ticket, "Old street"));
        assert_eq!(session.ready().unwrap().1, &AddressStatus::Pending);

        assert!(session.apply_lookup(current.ticket, "New street"));
        assert_eq!(session.ready().unwrap().1.label(), "New street");
    }

    #[test]
    fn lookup_after_cancel_is_discarded() {
        let mut session = drawing(&[(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)]);
        let request = session.finish_polygon().unwrap();
        session.cancel();
        assert!(!session.apply_lookup(request.ticket, "Late answer"));
        assert_eq!(session.state(), &CaptureState::Idle);
    }

    #[test]
    fn editing_polygons_is_unsupported() {
        let mut session = CaptureSession::new();
        let polygon = Geometry::Polygon {
            ring: vec![c(21.0, -101.0), c(21.1, -101.0), c(21.1, -101.1)],
        };
        assert!(matches!(
            session.begin_edit(polygon, "Somewhere".to_string()),
            Err(CaptureError::UnsupportedOperation { .. })
        ));
        assert_eq!(session.state(), &CaptureState::Idle);
    }

    #[test]
    fn edited_point_can_be_relocated() {
        let mut session = CaptureSession::new();
        session
            .begin_edit(Geometry::point(c(21.0, -101.0)), "Old".to_string())
            .unwrap();
        assert_eq!(session.ready().unwrap().1.label(), "Old");

        session.relocate().unwrap();
        assert_eq!(session.state(), &CaptureState::PickingPoint);
        assert!(matches!(
            session.click(c(21.3, -101.3)),
            ClickOutcome::PointPicked(_)
        ));
        session.complete().unwrap();
        assert!(!session.is_active());
    }

    #[test]
    fn transitions_require_idle() {
        let mut session = CaptureSession::new();
        session.start_point().unwrap();
        assert_eq!(
            session.start_polygon(),
            Err(CaptureError::InvalidTransition {
                action: CaptureAction::StartPolygon,
                state: "picking a point",
            })
        );
        assert!(matches!(
            session.finish_polygon(),
            Err(CaptureError::InvalidTransition { .. })
        ));
        assert!(session.complete().is_err());
    }
}
