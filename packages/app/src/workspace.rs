//! The assembled front end: map controller, report form, repository, and
//! geocoder, with the signed-in user.

use citywatch_capture::{CaptureError, MapSurface};
use citywatch_client::ReportRepository;
use citywatch_geocoder::{ReverseGeocoder, resolve_address};
use citywatch_geometry::Coordinate;
use citywatch_report_models::{Report, reports_owned_by};

use crate::AppError;
use crate::controller::{ClickAction, MapController, lookup};
use crate::form::{ReportForm, delete_report};

/// Everything a report-capture front end needs.
pub struct Workspace<S: MapSurface> {
    user_id: Option<String>,
    repository: Box<dyn ReportRepository>,
    geocoder: Box<dyn ReverseGeocoder>,
    controller: MapController<S>,
    form: ReportForm,
}

#[allow(clippy::future_not_send)]
impl<S: MapSurface> Workspace<S> {
    /// Assembles a workspace.
    pub fn new(
        user_id: Option<String>,
        repository: Box<dyn ReportRepository>,
        geocoder: Box<dyn ReverseGeocoder>,
        surface: S,
    ) -> Self {
        Self {
            user_id,
            repository,
            geocoder,
            controller: MapController::new(surface),
            form: ReportForm::new(),
        }
    }

    /// Signed-in user.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// The map controller.
    pub const fn controller(&self) -> &MapController<S> {
        &self.controller
    }

    /// Mutable access to the map controller.
    pub const fn controller_mut(&mut self) -> &mut MapController<S> {
        &mut self.controller
    }

    /// The report form.
    pub const fn form(&self) -> &ReportForm {
        &self.form
    }

    /// Mutable access to the report form.
    pub const fn form_mut(&mut self) -> &mut ReportForm {
        &mut self.form
    }

    fn require_user(&self) -> Result<String, AppError> {
        self.user_id.clone().ok_or_else(|| AppError::Validation {
            message: "sign in to create, edit, or delete reports".to_string(),
        })
    }

    /// Handles a map click, running whatever address lookup it triggers.
    pub async fn click(&mut self, coordinate: Coordinate) -> ClickAction {
        let action = self.controller.on_map_click(coordinate);
        match &action {
            ClickAction::Lookup(request) => {
                let response = lookup(self.geocoder.as_ref(), *request).await;
                self.controller.apply_lookup(response);
            }
            ClickAction::Inspect(at) => {
                let label = resolve_address(self.geocoder.as_ref(), *at).await;
                self.controller.show_inspect(*at, label.into_text());
            }
            ClickAction::VertexAdded(_) | ClickAction::Ignored | ClickAction::Suppressed => {}
        }
        action
    }

    /// Begins placing a new point report.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when nobody is signed in and
    /// [`CaptureError`] unless the session is idle.
    pub fn start_point(&mut self) -> Result<(), AppError> {
        self.require_user()?;
        self.controller.start_point()?;
        Ok(())
    }

    /// Begins drawing a new polygon report.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when nobody is signed in and
    /// [`CaptureError`] unless the session is idle.
    pub fn start_polygon(&mut self) -> Result<(), AppError> {
        self.require_user()?;
        self.controller.start_polygon()?;
        Ok(())
    }

    /// Closes the polygon and resolves its address.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if not drawing or too few distinct vertices
    /// were drawn.
    pub async fn finish_polygon(&mut self) -> Result<(), AppError> {
        let request = self.controller.finish_polygon()?;
        let response = lookup(self.geocoder.as_ref(), request).await;
        self.controller.apply_lookup(response);
        Ok(())
    }

    /// Loads one of the user's point reports for editing.
    ///
    /// # Errors
    ///
    /// See [`ReportForm::begin_edit`].
    pub fn begin_edit(&mut self, report: &Report) -> Result<(), AppError> {
        let user_id = self.require_user()?;
        self.controller.dismiss_inspect();
        self.form
            .begin_edit(report, &user_id, self.controller.session_mut())?;
        self.controller.redraw();
        Ok(())
    }

    /// Moves the point being edited; the next click picks the new spot.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] unless a point is ready.
    pub fn relocate(&mut self) -> Result<(), CaptureError> {
        self.controller.session_mut().relocate()
    }

    /// Submits the form.
    ///
    /// # Errors
    ///
    /// See [`ReportForm::submit`].
    pub async fn submit(&mut self) -> Result<Report, AppError> {
        let user_id = self.require_user()?;
        self.form
            .submit(
                self.controller.session_mut(),
                self.repository.as_ref(),
                &user_id,
            )
            .await
    }

    /// Discards the form and any capture in progress.
    pub fn cancel(&mut self) {
        self.form.cancel(self.controller.session_mut());
    }

    /// Lists every stored report.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Client`] if the repository call fails.
    pub async fn reports(&self) -> Result<Vec<Report>, AppError> {
        Ok(self.repository.list().await?)
    }

    /// Lists the signed-in user's reports.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when nobody is signed in, or
    /// [`AppError::Client`] if the repository call fails.
    pub async fn my_reports(&self) -> Result<Vec<Report>, AppError> {
        let user_id = self.require_user()?;
        let reports = self.reports().await?;
        Ok(reports_owned_by(&reports, &user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Finds a stored report by ID.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] for unknown IDs.
    pub async fn find(&self, id: &str) -> Result<Report, AppError> {
        self.reports()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound { id: id.to_string() })
    }

    /// Deletes one of the user's reports.
    ///
    /// # Errors
    ///
    /// See [`delete_report`].
    pub async fn delete(&mut self, report: &Report) -> Result<(), AppError> {
        let user_id = self.require_user()?;
        delete_report(self.repository.as_ref(), report, &user_id).await
    }

    /// Draws every stored report on the map.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Client`] if the repository call fails.
    pub async fn show_reports(&mut self) -> Result<usize, AppError> {
        let reports = self.reports().await?;
        Ok(self.controller.render_reports(&reports))
    }
}

#[cfg(test)]
mod tests {
    use citywatch_capture::{CaptureState, ValidationError};
    use citywatch_client::ClientError;
    use citywatch_geocoder::{FAILED_LABEL, GeocodeError};
    use citywatch_report_models::ReportType;

    use super::*;
    use crate::controller::tests::RecordingSurface;
    use crate::form::tests::{FakeRepository, point_report, polygon_report};

    struct FixedGeocoder(Option<&'static str>);

    #[async_trait::async_trait]
    impl ReverseGeocoder for FixedGeocoder {
        fn id(&self) -> &str {
            "fixed"
        }

        async fn reverse(&self, _coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
            self.0
                .map(|address| Some(address.to_string()))
                .ok_or(GeocodeError::RateLimited)
        }
    }

    fn workspace(
        repository: FakeRepository,
        geocoder: FixedGeocoder,
    ) -> Workspace<RecordingSurface> {
        Workspace::new(
            Some("u-1".to_string()),
            Box::new(repository),
            Box::new(geocoder),
            RecordingSurface::default(),
        )
    }

    fn c(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[tokio::test]
    async fn point_report_end_to_end() {
        let mut ws = workspace(FakeRepository::default(), FixedGeocoder(Some("Centro")));
        ws.start_point().unwrap();
        assert!(matches!(
            ws.click(c(21.12, -101.68)).await,
            ClickAction::Lookup(_)
        ));
        assert_eq!(ws.controller().session().ready().unwrap().1.label(), "Centro");

        ws.form_mut().report_type = Some(ReportType::Accident);
        ws.form_mut().description = "Two cars".to_string();
        let report = ws.submit().await.unwrap();

        assert_eq!(report.address, "Centro");
        assert_eq!(report.location_summary(), "Lat: 21.1200, Lng: -101.6800");
        assert_eq!(ws.controller().session().state(), &CaptureState::Idle);
    }

    #[tokio::test]
    async fn polygon_report_uses_fallback_label_when_lookup_fails() {
        let mut ws = workspace(FakeRepository::default(), FixedGeocoder(None));
        ws.start_polygon().unwrap();
        for (lat, lng) in [(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)] {
            ws.click(c(lat, lng)).await;
        }
        ws.finish_polygon().await.unwrap();

        ws.form_mut().description = "Flooded block".to_string();
        let report = ws.submit().await.unwrap();
        assert_eq!(report.report_type, ReportType::Polygon);
        assert_eq!(report.address, FAILED_LABEL);
        assert_eq!(report.location_summary(), "Polygon: 4 vertices");
    }

    #[tokio::test]
    async fn blank_description_keeps_the_drawn_polygon() {
        let mut ws = workspace(FakeRepository::default(), FixedGeocoder(Some("Centro")));
        ws.start_polygon().unwrap();
        for (lat, lng) in [(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)] {
            ws.click(c(lat, lng)).await;
        }
        ws.finish_polygon().await.unwrap();

        ws.form_mut().description = "  ".to_string();
        assert!(matches!(
            ws.submit().await,
            Err(AppError::Validation { .. })
        ));
        assert!(ws.controller().session().ready().is_some());

        ws.form_mut().description = "Flooded block".to_string();
        let report = ws.submit().await.unwrap();
        assert_eq!(report.location_summary(), "Polygon: 4 vertices");
        assert_eq!(ws.controller().session().state(), &CaptureState::Idle);
    }

    #[tokio::test]
    async fn short_polygon_returns_to_idle() {
        let mut ws = workspace(FakeRepository::default(), FixedGeocoder(Some("Centro")));
        ws.start_polygon().unwrap();
        ws.click(c(21.0, -101.0)).await;
        ws.click(c(21.0, -101.0)).await;
        ws.click(c(21.1, -101.0)).await;

        assert!(matches!(
            ws.finish_polygon().await,
            Err(AppError::Capture(CaptureError::Validation(
                ValidationError::InsufficientVertices { distinct: 2 }
            )))
        ));
        assert_eq!(ws.controller().session().state(), &CaptureState::Idle);
    }

    #[tokio::test]
    async fn submit_without_selection_is_a_validation_error() {
        let repository = FakeRepository::default();
        let mut ws = workspace(repository, FixedGeocoder(Some("Centro")));
        ws.form_mut().description = "Lamp out".to_string();
        ws.form_mut().report_type = Some(ReportType::Streetlight);

        assert!(matches!(
            ws.submit().await,
            Err(AppError::Capture(CaptureError::Validation(
                ValidationError::MissingSelection
            )))
        ));
    }

    #[tokio::test]
    async fn idle_clicks_show_inspect_popup() {
        let mut ws = workspace(FakeRepository::default(), FixedGeocoder(Some("Centro")));
        assert!(matches!(
            ws.click(c(21.0, -101.0)).await,
            ClickAction::Inspect(_)
        ));
        assert_eq!(ws.controller().popup().unwrap().label, "Centro");

        ws.controller_mut().dismiss_inspect();
        ws.controller_mut().set_modal_open(true);
        assert_eq!(ws.click(c(21.0, -101.0)).await, ClickAction::Suppressed);
        assert_eq!(ws.controller().surface().popups.len(), 1);
    }

    #[tokio::test]
    async fn edit_and_relocate_point() {
        let repository = FakeRepository::with_reports(vec![point_report("r-1", "u-1")]);
        let mut ws = workspace(repository, FixedGeocoder(Some("Nueva dirección")));

        let report = ws.find("r-1").await.unwrap();
        ws.begin_edit(&report).unwrap();
        ws.relocate().unwrap();
        ws.click(c(21.2, -101.7)).await;

        let updated = ws.submit().await.unwrap();
        assert_eq!(updated.id, "r-1");
        assert_eq!(updated.address, "Nueva dirección");
        assert_eq!(updated.report_type, ReportType::Pothole);
        assert_eq!(updated.location_summary(), "Lat: 21.2000, Lng: -101.7000");
    }

    #[tokio::test]
    async fn polygon_edit_never_reaches_repository() {
        let repository = FakeRepository::with_reports(vec![polygon_report("r-2", "u-1")]);
        let mut ws = workspace(repository, FixedGeocoder(Some("Centro")));

        let report = ws.find("r-2").await.unwrap();
        assert!(matches!(
            ws.begin_edit(&report),
            Err(AppError::Capture(CaptureError::UnsupportedOperation { .. }))
        ));
        assert!(matches!(
            ws.submit().await,
            Err(AppError::Capture(CaptureError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn my_reports_filters_by_owner() {
        let repository = FakeRepository::with_reports(vec![
            point_report("r-1", "u-1"),
            point_report("r-2", "u-2"),
            polygon_report("r-3", "u-1"),
        ]);
        let ws = workspace(repository, FixedGeocoder(Some("Centro")));

        let mine: Vec<String> = ws
            .my_reports()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, vec!["r-1", "r-3"]);
        assert!(matches!(
            ws.find("r-9").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn anonymous_users_cannot_capture() {
        let mut ws = Workspace::new(
            None,
            Box::new(FakeRepository::default()),
            Box::new(FixedGeocoder(Some("Centro"))),
            RecordingSurface::default(),
        );
        assert!(matches!(
            ws.start_point(),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(ws.show_reports().await, Ok(0)));
    }

    #[tokio::test]
    async fn failed_delete_is_reported() {
        let repository = FakeRepository::with_reports(vec![point_report("r-1", "u-1")]);
        *repository.fail_writes.lock().unwrap() = true;
        let mut ws = workspace(repository, FixedGeocoder(Some("Centro")));

        let report = ws.find("r-1").await.unwrap();
        assert!(matches!(
            ws.delete(&report).await,
            Err(AppError::Client(ClientError::Status { status: 503, .. }))
        ));
        assert_eq!(ws.reports().await.unwrap().len(), 1);
    }
}
