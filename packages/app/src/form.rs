//! The report form shown next to the map.
//!
//! Collects the category and description for the geometry the capture
//! session has ready, and submits it as a create or an update. A failed
//! submission leaves both the form and the captured geometry untouched so
//! the user can retry.

use citywatch_capture::{CaptureError, CaptureSession, ValidationError};
use citywatch_client::ReportRepository;
use citywatch_geometry::{GeometryKind, to_interchange};
use citywatch_report_models::{Report, ReportPayload, ReportType};

use crate::AppError;

/// Form fields for the report being created or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportForm {
    /// Selected category. Ignored for polygons.
    pub report_type: Option<ReportType>,
    /// Free-text description.
    pub description: String,
    editing: Option<String>,
}

impl ReportForm {
    /// Creates an empty form for a new report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ID of the report being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    /// Clears every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Loads an existing point report into the form and the capture session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotOwner`] unless `user_id` owns the report,
    /// [`CaptureError::UnsupportedOperation`] for polygon reports, and
    /// [`AppError::Geometry`] if the stored location cannot be decoded. No
    /// state changes on error.
    pub fn begin_edit(
        &mut self,
        report: &Report,
        user_id: &str,
        session: &mut CaptureSession,
    ) -> Result<(), AppError> {
        if !report.is_owned_by(user_id) {
            return Err(AppError::NotOwner {
                id: report.id.clone(),
            });
        }
        if report.geometry_kind() != Some(GeometryKind::Point) {
            return Err(CaptureError::UnsupportedOperation {
                message: format!("report {} is not a point and cannot be edited", report.id),
            }
            .into());
        }

        session.begin_edit(report.geometry()?, report.address.clone())?;

        self.report_type = Some(report.report_type);
        self.description.clone_from(&report.description);
        self.editing = Some(report.id.clone());
        log::debug!("Editing report {}", report.id);
        Ok(())
    }

    /// Builds the request body for the geometry the session has ready.
    ///
    /// An address lookup still in flight is submitted as its placeholder
    /// label.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingSelection`] when nothing is ready,
    /// and [`AppError::Validation`] for an empty description or an unusable
    /// category.
    pub fn payload(&self, session: &CaptureSession, user_id: &str) -> Result<ReportPayload, AppError> {
        let (geometry, address) = session.ready().ok_or(ValidationError::MissingSelection)?;

        let description = self.description.trim();
        if description.is_empty() {
            return Err(AppError::Validation {
                message: "description must not be empty".to_string(),
            });
        }

        Ok(ReportPayload {
            report_type: ReportType::resolve(self.report_type, geometry.kind())?,
            description: description.to_string(),
            address: address.label().to_string(),
            location: to_interchange(geometry)?,
            user: user_id.to_string(),
        })
    }

    /// Creates or updates the report, then returns the session to idle.
    ///
    /// # Errors
    ///
    /// Returns the [`ReportForm::payload`] errors, or [`AppError::Client`]
    /// if the repository call fails. The form and session are unchanged on
    /// error.
    pub async fn submit(
        &mut self,
        session: &mut CaptureSession,
        repository: &dyn ReportRepository,
        user_id: &str,
    ) -> Result<Report, AppError> {
        let payload = self.payload(session, user_id)?;

        let result = match &self.editing {
            Some(id) => repository.update(id, &payload).await,
            None => repository.create(&payload).await,
        };

        let report = result.inspect_err(|e| log::error!("Failed to submit report: {e}"))?;

        session.complete()?;
        log::info!(
            "Submitted {} report {} at {}",
            report.report_type,
            report.id,
            report.location_summary()
        );
        self.reset();
        Ok(report)
    }

    /// Discards the form and any capture in progress.
    pub fn cancel(&mut self, session: &mut CaptureSession) {
        session.cancel();
        self.reset();
    }
}

/// Deletes a report owned by `user_id`.
///
/// # Errors
///
/// Returns [`AppError::NotOwner`] for someone else's report, or
/// [`AppError::Client`] if the repository call fails.
pub async fn delete_report(
    repository: &dyn ReportRepository,
    report: &Report,
    user_id: &str,
) -> Result<(), AppError> {
    if !report.is_owned_by(user_id) {
        return Err(AppError::NotOwner {
            id: report.id.clone(),
        });
    }
    repository.delete(&report.id).await?;
    log::info!("Deleted report {}", report.id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use citywatch_capture::{CaptureState, ClickOutcome};
    use citywatch_client::ClientError;
    use citywatch_geometry::Coordinate;

    use super::*;

    /// In-memory repository that records every call.
    #[derive(Default)]
    pub(crate) struct FakeRepository {
        pub reports: Mutex<Vec<Report>>,
        pub calls: Mutex<Vec<String>>,
        pub fail_writes: Mutex<bool>,
    }

    impl FakeRepository {
        pub fn with_reports(reports: Vec<Report>) -> Self {
            Self {
                reports: Mutex::new(reports),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn write(&self, call: String) -> Result<(), ClientError> {
            self.calls.lock().unwrap().push(call);
            if *self.fail_writes.lock().unwrap() {
                return Err(ClientError::Status {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn stored(id: &str, payload: &ReportPayload) -> Report {
            Report {
                id: id.to_string(),
                report_type: payload.report_type,
                description: payload.description.clone(),
                address: payload.address.clone(),
                location: payload.location.clone(),
                user: Some(citywatch_report_models::UserRef::Id(payload.user.clone())),
                user_id: None,
                created_at: None,
            }
        }
    }

    #[async_trait::async_trait]
    impl ReportRepository for FakeRepository {
        async fn list(&self) -> Result<Vec<Report>, ClientError> {
            self.calls.lock().unwrap().push("list".to_string());
            Ok(self.reports.lock().unwrap().clone())
        }

        async fn create(&self, payload: &ReportPayload) -> Result<Report, ClientError> {
            self.write("create".to_string())?;
            let mut reports = self.reports.lock().unwrap();
            let report = Self::stored(&format!("r-{}", reports.len() + 1), payload);
            reports.push(report.clone());
            Ok(report)
        }

        async fn update(&self, id: &str, payload: &ReportPayload) -> Result<Report, ClientError> {
            citywatch_client::ensure_updatable(payload)?;
            self.write(format!("update {id}"))?;
            let report = Self::stored(id, payload);
            let mut reports = self.reports.lock().unwrap();
            if let Some(existing) = reports.iter_mut().find(|r| r.id == id) {
                *existing = report.clone();
            }
            Ok(report)
        }

        async fn delete(&self, id: &str) -> Result<(), ClientError> {
            self.write(format!("delete {id}"))?;
            self.reports.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }
    }

    pub(crate) fn point_report(id: &str, owner: &str) -> Report {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "type": "Pothole",
            "description": "Deep pothole",
            "address": "Blvd. López Mateos 100, Centro",
            "location": { "type": "Point", "coordinates": [-101.68, 21.12] },
            "user": { "_id": owner, "name": "Ana" }
        }))
        .unwrap()
    }

    pub(crate) fn polygon_report(id: &str, owner: &str) -> Report {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "type": "Polygon",
            "description": "Flooded block",
            "address": "Centro",
            "location": {
                "type": "Polygon",
                "coordinates": [[[-101.0, 21.0], [-101.0, 21.1], [-101.1, 21.1], [-101.0, 21.0]]]
            },
            "user": owner
        }))
        .unwrap()
    }

    fn c(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    fn ready_point(session: &mut CaptureSession) {
        session.start_point().unwrap();
        let ClickOutcome::PointPicked(request) = session.click(c(21.12, -101.68)) else {
            panic!("expected a picked point");
        };
        assert!(session.apply_lookup(request.ticket, "Centro"));
    }

    #[test]
    fn payload_requires_a_selection() {
        let form = ReportForm {
            description: "Lamp out".to_string(),
            report_type: Some(ReportType::Streetlight),
            ..ReportForm::default()
        };
        assert!(matches!(
            form.payload(&CaptureSession::new(), "u-1"),
            Err(AppError::Capture(CaptureError::Validation(
                ValidationError::MissingSelection
            )))
        ));
    }

    #[test]
    fn payload_validates_description_and_category() {
        let mut session = CaptureSession::new();
        ready_point(&mut session);

        let mut form = ReportForm {
            report_type: Some(ReportType::Polygon),
            description: "   ".to_string(),
            ..ReportForm::default()
        };
        assert!(matches!(
            form.payload(&session, "u-1"),
            Err(AppError::Validation { .. })
        ));

        form.description = "Lamp out".to_string();
        assert!(matches!(
            form.payload(&session, "u-1"),
            Err(AppError::Validation { .. })
        ));

        form.report_type = Some(ReportType::Streetlight);
        let payload = form.payload(&session, "u-1").unwrap();
        assert_eq!(payload.address, "Centro");
        assert_eq!(payload.geometry_kind(), Some(GeometryKind::Point));
    }

    #[test]
    fn polygon_payload_is_always_polygon_typed() {
        let mut session = CaptureSession::new();
        session.start_polygon().unwrap();
        for (lat, lng) in [(21.0, -101.0), (21.1, -101.0), (21.1, -101.1)] {
            session.click(c(lat, lng));
        }
        session.finish_polygon().unwrap();

        let form = ReportForm {
            report_type: Some(ReportType::Graffiti),
            description: "Flooding".to_string(),
            ..ReportForm::default()
        };
        let payload = form.payload(&session, "u-1").unwrap();
        assert_eq!(payload.report_type, ReportType::Polygon);
        // Lookup still pending: the placeholder is submitted.
        assert_eq!(payload.address, citywatch_capture::PENDING_ADDRESS_LABEL);
    }

    #[tokio::test]
    async fn successful_submit_resets_form_and_session() {
        let repository = FakeRepository::default();
        let mut session = CaptureSession::new();
        ready_point(&mut session);
        let mut form = ReportForm {
            report_type: Some(ReportType::Garbage),
            description: "Overflowing bins".to_string(),
            ..ReportForm::default()
        };

        let report = form.submit(&mut session, &repository, "u-1").await.unwrap();
        assert_eq!(report.report_type, ReportType::Garbage);
        assert_eq!(session.state(), &CaptureState::Idle);
        assert_eq!(form, ReportForm::default());
        assert_eq!(repository.calls(), vec!["create"]);
    }

    #[tokio::test]
    async fn failed_submit_keeps_state_for_retry() {
        let repository = FakeRepository::default();
        *repository.fail_writes.lock().unwrap() = true;
        let mut session = CaptureSession::new();
        ready_point(&mut session);
        let mut form = ReportForm {
            report_type: Some(ReportType::Garbage),
            description: "Overflowing bins".to_string(),
            ..ReportForm::default()
        };

        assert!(matches!(
            form.submit(&mut session, &repository, "u-1").await,
            Err(AppError::Client(ClientError::Status { status: 503, .. }))
        ));
        assert!(session.ready().is_some());
        assert_eq!(form.description, "Overflowing bins");

        *repository.fail_writes.lock().unwrap() = false;
        assert!(form.submit(&mut session, &repository, "u-1").await.is_ok());
        assert_eq!(repository.calls(), vec!["create", "create"]);
    }

    #[tokio::test]
    async fn edit_submits_an_update() {
        let repository = FakeRepository::with_reports(vec![point_report("r-7", "u-1")]);
        let report = point_report("r-7", "u-1");
        let mut session = CaptureSession::new();
        let mut form = ReportForm::new();

        form.begin_edit(&report, "u-1", &mut session).unwrap();
        assert_eq!(form.editing(), Some("r-7"));
        assert_eq!(
            session.ready().unwrap().1.label(),
            "Blvd. López Mateos 100, Centro"
        );

        form.description = "Pothole patched badly".to_string();
        let updated = form.submit(&mut session, &repository, "u-1").await.unwrap();
        assert_eq!(updated.id, "r-7");
        assert_eq!(repository.calls(), vec!["update r-7"]);
    }

    #[test]
    fn polygon_edit_is_refused_without_state_change() {
        let mut session = CaptureSession::new();
        let mut form = ReportForm::new();

        let result = form.begin_edit(&polygon_report("r-2", "u-1"), "u-1", &mut session);
        assert!(matches!(
            result,
            Err(AppError::Capture(CaptureError::UnsupportedOperation { .. }))
        ));
        assert_eq!(session.state(), &CaptureState::Idle);
        assert_eq!(form, ReportForm::default());
    }

    #[test]
    fn editing_someone_elses_report_is_refused() {
        let mut session = CaptureSession::new();
        let mut form = ReportForm::new();
        assert!(matches!(
            form.begin_edit(&point_report("r-1", "u-2"), "u-1", &mut session),
            Err(AppError::NotOwner { .. })
        ));
    }

    #[tokio::test]
    async fn delete_checks_ownership() {
        let repository = FakeRepository::with_reports(vec![point_report("r-1", "u-1")]);
        let report = point_report("r-1", "u-1");

        assert!(matches!(
            delete_report(&repository, &report, "u-2").await,
            Err(AppError::NotOwner { .. })
        ));
        assert!(repository.calls().is_empty());

        delete_report(&repository, &report, "u-1").await.unwrap();
        assert_eq!(repository.calls(), vec!["delete r-1"]);
        assert!(repository.reports.lock().unwrap().is_empty());
    }
}
