#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the `CityWatch` report repository.
//!
//! [`ReportRepository`] is the seam the report form talks to;
//! [`http::HttpReportRepository`] implements it against the REST backend.
//! Failed calls never retry and never partially apply.

pub mod http;

use citywatch_geometry::GeometryKind;
use citywatch_report_models::{Report, ReportPayload};
use thiserror::Error;

pub use http::HttpReportRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The repository answered with an error status.
    #[error("Repository returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or the status reason.
        message: String,
    },

    /// The operation is refused for this report.
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Description of what was refused.
        message: String,
    },
}

/// Create, list, update, and delete access to stored reports.
#[async_trait::async_trait]
pub trait ReportRepository: Send + Sync {
    /// Lists every stored report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn list(&self) -> Result<Vec<Report>, ClientError>;

    /// Stores a new report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn create(&self, payload: &ReportPayload) -> Result<Report, ClientError>;

    /// Replaces a stored point report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedOperation`] for polygon payloads,
    /// before any request is made, or [`ClientError`] if the request fails.
    async fn update(&self, id: &str, payload: &ReportPayload) -> Result<Report, ClientError>;

    /// Deletes a stored report.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}

/// Refuses updates to anything but point geometry.
///
/// # Errors
///
/// Returns [`ClientError::UnsupportedOperation`] unless the payload carries
/// a point.
pub fn ensure_updatable(payload: &ReportPayload) -> Result<(), ClientError> {
    match payload.geometry_kind() {
        Some(GeometryKind::Point) => Ok(()),
        Some(GeometryKind::Polygon) => Err(ClientError::UnsupportedOperation {
            message: "polygon reports cannot be updated".to_string(),
        }),
        None => Err(ClientError::UnsupportedOperation {
            message: "only point reports can be updated".to_string(),
        }),
    }
}
