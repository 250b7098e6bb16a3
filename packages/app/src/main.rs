#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the `CityWatch` report client.

use citywatch_app::config::AppConfig;
use citywatch_app::interactive;
use citywatch_app::terminal::{TerminalSurface, print_reports};
use citywatch_app::workspace::Workspace;
use citywatch_geocoder::ChainGeocoder;
use citywatch_geometry::Coordinate;
use citywatch_report_models::ReportType;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "citywatch", about = "Report and browse city incidents on a map")]
struct Cli {
    /// Report repository base URL (overrides `CITYWATCH_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Signed-in user ID (overrides `CITYWATCH_USER`)
    #[arg(long, global = true)]
    user: Option<String>,
    /// Geocoding service: "mapbox", "nominatim", or "auto" (overrides `GEOCODER`)
    #[arg(long, global = true)]
    geocoder: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored reports
    List {
        /// Only list reports owned by the signed-in user
        #[arg(long)]
        mine: bool,
    },
    /// Submit a new report
    Report {
        #[command(subcommand)]
        kind: ReportCommand,
    },
    /// Edit one of your point reports
    Edit {
        /// Report ID
        id: String,
        /// New location as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinate>,
        /// New report type
        #[arg(long = "type")]
        report_type: Option<ReportType>,
        /// New description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete one of your reports
    Delete {
        /// Report ID
        id: String,
    },
    /// Look up the address at a location
    Inspect {
        /// Location as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        at: Coordinate,
    },
}

#[derive(Subcommand)]
enum ReportCommand {
    /// Report an incident at a single location
    Point {
        /// Location as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        at: Coordinate,
        /// Report type (e.g., "Pothole", "Streetlight")
        #[arg(long = "type")]
        report_type: ReportType,
        /// What happened
        #[arg(long)]
        description: String,
    },
    /// Report an area; pass `--vertex` at least three times
    Polygon {
        /// Polygon vertex as "lat,lng", in drawing order
        #[arg(long = "vertex", required = true, allow_hyphen_values = true)]
        vertices: Vec<Coordinate>,
        /// What happened
        #[arg(long)]
        description: String,
    },
}

/// Whether `command` can click the map and so trigger an address lookup.
/// Interactive mode always can.
const fn needs_geocoder(command: Option<&Commands>) -> bool {
    match command {
        None | Some(Commands::Report { .. } | Commands::Inspect { .. }) => true,
        Some(Commands::Edit { at, .. }) => at.is_some(),
        Some(Commands::List { .. } | Commands::Delete { .. }) => false,
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(user) = cli.user {
        config.user_id = Some(user);
    }
    if let Some(geocoder) = cli.geocoder {
        config.geocoder = Some(geocoder).filter(|g| !g.eq_ignore_ascii_case("auto"));
    }
    log::debug!("Using report repository at {}", config.api_url);

    let geocoder = if needs_geocoder(cli.command.as_ref()) {
        config.geocoder()?
    } else {
        ChainGeocoder::new(Vec::new())
    };

    let mut workspace = Workspace::new(
        config.user_id.clone(),
        Box::new(config.repository()),
        Box::new(geocoder),
        TerminalSurface::default(),
    );

    let Some(command) = cli.command else {
        log::info!("Interactive session, {}", workspace.controller().surface());
        return Ok(interactive::run(&mut workspace).await?);
    };

    match command {
        Commands::List { mine } => {
            let reports = if mine {
                workspace.my_reports().await?
            } else {
                workspace.reports().await?
            };
            print_reports(&reports, workspace.user_id());
        }
        Commands::Report { kind } => {
            match kind {
                ReportCommand::Point {
                    at,
                    report_type,
                    description,
                } => {
                    workspace.start_point()?;
                    workspace.click(at).await;
                    workspace.form_mut().report_type = Some(report_type);
                    workspace.form_mut().description = description;
                }
                ReportCommand::Polygon {
                    vertices,
                    description,
                } => {
                    workspace.start_polygon()?;
                    for vertex in vertices {
                        workspace.click(vertex).await;
                    }
                    workspace.finish_polygon().await?;
                    workspace.form_mut().description = description;
                }
            }
            let report = workspace.submit().await?;
            println!(
                "Created {} report {} at {} ({})",
                report.report_type,
                report.id,
                report.location_summary(),
                report.address
            );
        }
        Commands::Edit {
            id,
            at,
            report_type,
            description,
        } => {
            let report = workspace.find(&id).await?;
            workspace.begin_edit(&report)?;
            if let Some(at) = at {
                workspace.relocate()?;
                workspace.click(at).await;
            }
            if let Some(report_type) = report_type {
                workspace.form_mut().report_type = Some(report_type);
            }
            if let Some(description) = description {
                workspace.form_mut().description = description;
            }
            let report = workspace.submit().await?;
            println!(
                "Updated report {} at {} ({})",
                report.id,
                report.location_summary(),
                report.address
            );
        }
        Commands::Delete { id } => {
            let report = workspace.find(&id).await?;
            workspace.delete(&report).await?;
            println!("Deleted report {id}");
        }
        Commands::Inspect { at } => {
            workspace.click(at).await;
        }
    }

    Ok(())
}
