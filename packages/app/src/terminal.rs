//! Terminal output: a [`MapSurface`] that prints what would be drawn, and
//! the report table.

use citywatch_capture::MapSurface;
use citywatch_geometry::Coordinate;
use citywatch_report_models::{Report, UserRef};

use crate::config::{DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM};

/// Prints map drawing operations to stdout.
#[derive(Debug)]
pub struct TerminalSurface {
    center: Coordinate,
    zoom: u8,
}

impl TerminalSurface {
    /// Creates a surface centred on `center`.
    #[must_use]
    pub const fn new(center: Coordinate, zoom: u8) -> Self {
        Self { center, zoom }
    }
}

impl std::fmt::Display for TerminalSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "map centred on {} at zoom {}", self.center, self.zoom)
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        let (latitude, longitude) = DEFAULT_MAP_CENTER;
        Self::new(
            Coordinate {
                latitude,
                longitude,
            },
            DEFAULT_MAP_ZOOM,
        )
    }
}

impl MapSurface for TerminalSurface {
    fn render_marker(&mut self, coordinate: Coordinate, label: &str) {
        println!("  [marker]  {coordinate}  {label}");
    }

    fn render_polygon(&mut self, ring: &[Coordinate], label: &str) {
        let vertices: Vec<String> = ring.iter().map(ToString::to_string).collect();
        println!("  [polygon] {}  {label}", vertices.join(" -> "));
    }

    fn show_popup(&mut self, coordinate: Coordinate, text: &str) {
        println!("  [popup]   {coordinate}  {text}");
    }

    fn dismiss_popup(&mut self) {}
}

/// Shown in place of a creation date the repository did not send.
pub const UNKNOWN_DATE_LABEL: &str = "unknown date";

/// Creation date of `report` for listings, in UTC.
#[must_use]
pub fn created_label(report: &Report) -> String {
    report.created_at.map_or_else(
        || UNKNOWN_DATE_LABEL.to_string(),
        |at| at.format("%d %b %Y %H:%M").to_string(),
    )
}

/// Prints reports as a table. Reports owned by `user_id` are starred.
pub fn print_reports(reports: &[Report], user_id: Option<&str>) {
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }

    println!(
        "  {:<26} {:<12} {:<30} {:<14} {:<17} DESCRIPTION",
        "ID", "TYPE", "LOCATION", "USER", "CREATED"
    );
    println!("{}", "-".repeat(138));

    for report in reports {
        let owned = user_id.is_some_and(|id| report.is_owned_by(id));
        let user = report
            .user
            .as_ref()
            .map_or_else(|| "-".to_string(), UserRef::display_name);
        println!(
            "{} {:<26} {:<12} {:<30} {:<14} {:<17} {}",
            if owned { "*" } else { " " },
            report.id,
            report.report_type.as_ref(),
            report.location_summary(),
            user,
            created_label(report),
            report.description_preview()
        );
        if !report.address.is_empty() {
            println!("  {:<26} {}", "", report.address);
        }
    }

    println!("\n{} report(s)", reports.len());
}
