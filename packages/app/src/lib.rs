#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `CityWatch` report capture front end.
//!
//! Wires the capture state machine, the reverse geocoder, and the report
//! repository together behind a [`workspace::Workspace`], which both the
//! command-line subcommands and the interactive mode drive.

pub mod config;
pub mod controller;
pub mod form;
pub mod interactive;
pub mod terminal;
pub mod workspace;

use citywatch_capture::{CaptureError, ValidationError};
use citywatch_client::ClientError;
use citywatch_geocoder::GeocodeError;
use citywatch_geometry::GeometryError;
use citywatch_report_models::CategoryError;
use thiserror::Error;

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum AppError {
    /// Capture state machine error.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Report repository error.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Geocoder configuration error.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// Invalid or undecodable geometry.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The form is incomplete or inconsistent.
    #[error("Validation error: {message}")]
    Validation {
        /// What the user must fix.
        message: String,
    },

    /// The signed-in user may not touch this report.
    #[error("Report {id} belongs to another user")]
    NotOwner {
        /// Report ID.
        id: String,
    },

    /// No stored report has this ID.
    #[error("Report {id} not found")]
    NotFound {
        /// Report ID.
        id: String,
    },

    /// Interactive prompt failed.
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::Capture(e.into())
    }
}

impl From<CategoryError> for AppError {
    fn from(e: CategoryError) -> Self {
        Self::Validation {
            message: e.to_string(),
        }
    }
}
