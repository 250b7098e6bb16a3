//! Map click routing.
//!
//! [`MapController`] owns the capture session and the map surface. Clicks
//! during a capture feed the state machine. Clicks while idle go to the
//! read-only inspect path, which is suppressed while a modal is open.

use citywatch_capture::{
    CaptureError, CaptureSession, ClickOutcome, LookupRequest, LookupTicket, MapSurface,
    render_geometry,
};
use citywatch_geocoder::{ReverseGeocoder, resolve_address};
use citywatch_geometry::Coordinate;
use citywatch_report_models::Report;

/// What the front end should do after a map click.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Run this address lookup and hand the answer to
    /// [`MapController::apply_lookup`].
    Lookup(LookupRequest),
    /// Look up the address here and show it with
    /// [`MapController::show_inspect`].
    Inspect(Coordinate),
    /// A polygon vertex was added.
    VertexAdded(usize),
    /// Nothing happens.
    Ignored,
    /// An inspect click arrived while a modal was open.
    Suppressed,
}

/// A finished address lookup for a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResponse {
    /// Session the lookup was issued for.
    pub ticket: LookupTicket,
    /// Resolved label (or fallback label).
    pub label: String,
}

/// Runs a capture address lookup. Never fails.
pub async fn lookup(geocoder: &dyn ReverseGeocoder, request: LookupRequest) -> LookupResponse {
    let label = resolve_address(geocoder, request.coordinate).await;
    LookupResponse {
        ticket: request.ticket,
        label: label.into_text(),
    }
}

/// The dismissible popup shown for inspect clicks.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectPopup {
    /// Where the user clicked.
    pub coordinate: Coordinate,
    /// Address label for that location.
    pub label: String,
}

/// Owns the capture session and routes map events to it.
pub struct MapController<S: MapSurface> {
    session: CaptureSession,
    surface: S,
    modal_open: bool,
    popup: Option<InspectPopup>,
}

impl<S: MapSurface> MapController<S> {
    /// Creates a controller with an idle session.
    pub fn new(surface: S) -> Self {
        Self {
            session: CaptureSession::new(),
            surface,
            modal_open: false,
            popup: None,
        }
    }

    /// The capture session.
    pub const fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Mutable access to the capture session.
    pub const fn session_mut(&mut self) -> &mut CaptureSession {
        &mut self.session
    }

    /// The map surface.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// The inspect popup currently shown.
    pub const fn popup(&self) -> Option<&InspectPopup> {
        self.popup.as_ref()
    }

    /// Marks a modal (report list, confirmation dialog) as open or closed.
    pub fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
        if open {
            self.dismiss_inspect();
        }
    }

    /// Begins placing a point.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] unless the session is idle.
    pub fn start_point(&mut self) -> Result<(), CaptureError> {
        self.dismiss_inspect();
        self.session.start_point()
    }

    /// Begins drawing a polygon.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] unless the session is idle.
    pub fn start_polygon(&mut self) -> Result<(), CaptureError> {
        self.dismiss_inspect();
        self.session.start_polygon()
    }

    /// Routes a map click.
    pub fn on_map_click(&mut self, coordinate: Coordinate) -> ClickAction {
        match self.session.click(coordinate) {
            ClickOutcome::Inspect(c) if self.modal_open => {
                log::debug!("Inspect click at {c} suppressed while a modal is open");
                ClickAction::Suppressed
            }
            ClickOutcome::Inspect(c) => ClickAction::Inspect(c),
            ClickOutcome::PointPicked(request) => {
                self.redraw();
                ClickAction::Lookup(request)
            }
            ClickOutcome::VertexAdded { count } => {
                self.redraw();
                ClickAction::VertexAdded(count)
            }
            ClickOutcome::Ignored => ClickAction::Ignored,
        }
    }

    /// Closes the polygon being drawn.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if not drawing or too few vertices were
    /// drawn; in the latter case the session is back to idle.
    pub fn finish_polygon(&mut self) -> Result<LookupRequest, CaptureError> {
        let result = self.session.finish_polygon();
        self.redraw();
        result
    }

    /// Applies a capture lookup answer. Stale answers are dropped.
    pub fn apply_lookup(&mut self, response: LookupResponse) -> bool {
        let applied = self.session.apply_lookup(response.ticket, response.label);
        if applied {
            self.redraw();
        }
        applied
    }

    /// Shows an inspect answer, unless a capture or modal started since the
    /// click.
    pub fn show_inspect(&mut self, coordinate: Coordinate, label: String) -> bool {
        if self.session.is_active() || self.modal_open {
            log::debug!("Dropping inspect answer for {coordinate}: map is busy");
            return false;
        }
        self.surface.show_popup(coordinate, &label);
        self.popup = Some(InspectPopup { coordinate, label });
        true
    }

    /// Hides the inspect popup.
    pub fn dismiss_inspect(&mut self) {
        if self.popup.take().is_some() {
            self.surface.dismiss_popup();
        }
    }

    /// Discards any capture in progress.
    pub fn cancel(&mut self) {
        self.session.cancel();
    }

    /// Draws the current capture.
    pub fn redraw(&mut self) {
        self.session.render(&mut self.surface);
    }

    /// Draws stored reports, returning how many were drawn.
    pub fn render_reports(&mut self, reports: &[Report]) -> usize {
        render_reports(&mut self.surface, reports)
    }
}

/// Draws stored reports on a surface. Reports whose geometry cannot be
/// decoded are skipped.
pub fn render_reports(surface: &mut dyn MapSurface, reports: &[Report]) -> usize {
    let mut drawn = 0;
    for report in reports {
        match report.geometry() {
            Ok(geometry) => {
                let label = format!("{}: {}", report.report_type, report.address);
                render_geometry(surface, &geometry, &label);
                drawn += 1;
            }
            Err(e) => log::warn!("Skipping report {}: {e}", report.id),
        }
    }
    drawn
}
