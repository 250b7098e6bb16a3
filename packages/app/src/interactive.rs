//! Interactive mode.
//!
//! A menu loop over the [`Workspace`]: map clicks are entered as
//! `lat,lng` coordinates and the report form is filled in through prompts.

use citywatch_capture::MapSurface;
use citywatch_geometry::Coordinate;
use citywatch_report_models::{Report, ReportType};
use dialoguer::{Confirm, Input, Select};

use crate::AppError;
use crate::controller::ClickAction;
use crate::terminal::print_reports;
use crate::workspace::Workspace;

/// Top-level actions in the interactive menu.
#[derive(Clone, Copy)]
enum MenuAction {
    ShowMap,
    ListAll,
    ListMine,
    ReportPoint,
    ReportArea,
    Edit,
    Delete,
    Inspect,
    Quit,
}

impl MenuAction {
    const ALL: &[Self] = &[
        Self::ShowMap,
        Self::ListAll,
        Self::ListMine,
        Self::ReportPoint,
        Self::ReportArea,
        Self::Edit,
        Self::Delete,
        Self::Inspect,
        Self::Quit,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::ShowMap => "Show reports on the map",
            Self::ListAll => "List all reports",
            Self::ListMine => "List my reports",
            Self::ReportPoint => "Report an incident at a point",
            Self::ReportArea => "Report an area (polygon)",
            Self::Edit => "Edit one of my reports",
            Self::Delete => "Delete one of my reports",
            Self::Inspect => "Look up an address",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the interactive menu until the user quits.
///
/// Failed actions are reported and the menu is shown again.
///
/// # Errors
///
/// Returns [`AppError::Prompt`] if the terminal prompt fails.
#[allow(clippy::future_not_send)]
pub async fn run<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    println!("CityWatch");
    match workspace.user_id() {
        Some(user) => println!("Signed in as {user}"),
        None => println!("Not signed in: reports are read-only (set CITYWATCH_USER)"),
    }
    println!();

    let labels: Vec<&str> = MenuAction::ALL.iter().map(|a| a.label()).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        let action = MenuAction::ALL[idx];
        let result = match action {
            MenuAction::ShowMap => workspace.show_reports().await.map(|n| {
                println!("{n} report(s) drawn");
            }),
            MenuAction::ListAll => handle_list(workspace, false).await,
            MenuAction::ListMine => handle_list(workspace, true).await,
            MenuAction::ReportPoint => handle_report_point(workspace).await,
            MenuAction::ReportArea => handle_report_area(workspace).await,
            MenuAction::Edit => handle_edit(workspace).await,
            MenuAction::Delete => handle_delete(workspace).await,
            MenuAction::Inspect => handle_inspect(workspace).await,
            MenuAction::Quit => return Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(AppError::Prompt(e)) => return Err(AppError::Prompt(e)),
            Err(e) => {
                log::debug!("Interactive action failed: {e:?}");
                println!("Error: {e}");
                workspace.cancel();
            }
        }
        println!();
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[allow(clippy::future_not_send)]
async fn handle_list<S: MapSurface>(
    workspace: &mut Workspace<S>,
    mine: bool,
) -> Result<(), AppError> {
    workspace.controller_mut().set_modal_open(true);
    let reports = if mine {
        workspace.my_reports().await
    } else {
        workspace.reports().await
    };
    if let Ok(reports) = &reports {
        print_reports(reports, workspace.user_id());
    }
    workspace.controller_mut().set_modal_open(false);
    reports.map(|_| ())
}

#[allow(clippy::future_not_send)]
async fn handle_report_point<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    workspace.start_point()?;
    let at = prompt_coordinate("Click the map at (lat,lng)")?;
    workspace.click(at).await;

    let types = ReportType::selectable();
    let labels: Vec<&str> = types.iter().map(AsRef::as_ref).collect();
    let idx = Select::new()
        .with_prompt("Report type")
        .items(&labels)
        .default(0)
        .interact()?;
    workspace.form_mut().report_type = Some(types[idx]);
    workspace.form_mut().description = prompt_description(None)?;

    submit_with_retry(workspace).await
}

#[allow(clippy::future_not_send)]
async fn handle_report_area<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    workspace.start_polygon()?;
    println!("Enter vertices one at a time; leave empty to finish.");

    loop {
        let prompt = format!(
            "Vertex {} (lat,lng)",
            workspace.controller().session().vertices().len() + 1
        );
        let Some(at) = prompt_optional_coordinate(&prompt)? else {
            break;
        };
        workspace.click(at).await;
    }

    workspace.finish_polygon().await?;
    workspace.form_mut().description = prompt_description(None)?;

    submit_with_retry(workspace).await
}

#[allow(clippy::future_not_send)]
async fn handle_edit<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    let Some(report) = pick_own_report(workspace, "Report to edit", true).await? else {
        return Ok(());
    };
    workspace.begin_edit(&report)?;

    if Confirm::new()
        .with_prompt("Move the report to a new location?")
        .default(false)
        .interact()?
    {
        workspace.relocate()?;
        let at = prompt_coordinate("Click the map at (lat,lng)")?;
        workspace.click(at).await;
    }

    let types = ReportType::selectable();
    let labels: Vec<&str> = types.iter().map(AsRef::as_ref).collect();
    let current = types
        .iter()
        .position(|t| *t == report.report_type)
        .unwrap_or(0);
    let idx = Select::new()
        .with_prompt("Report type")
        .items(&labels)
        .default(current)
        .interact()?;
    workspace.form_mut().report_type = Some(types[idx]);
    workspace.form_mut().description = prompt_description(Some(&report.description))?;

    submit_with_retry(workspace).await
}

#[allow(clippy::future_not_send)]
async fn handle_delete<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    let Some(report) = pick_own_report(workspace, "Report to delete", false).await? else {
        return Ok(());
    };

    workspace.controller_mut().set_modal_open(true);
    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Delete {} report '{}'?",
            report.report_type,
            report.description_preview()
        ))
        .default(false)
        .interact();
    workspace.controller_mut().set_modal_open(false);

    if !confirmed? {
        println!("Cancelled.");
        return Ok(());
    }
    workspace.delete(&report).await?;
    println!("Report {} deleted.", report.id);
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn handle_inspect<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    let at = prompt_coordinate("Click the map at (lat,lng)")?;
    if workspace.click(at).await == ClickAction::Suppressed {
        println!("Close the open dialog first.");
    }
    workspace.controller_mut().dismiss_inspect();
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Submits the form, asking again for a missing description and offering a
/// retry on repository failures. Declining the retry discards the capture.
#[allow(clippy::future_not_send)]
async fn submit_with_retry<S: MapSurface>(workspace: &mut Workspace<S>) -> Result<(), AppError> {
    loop {
        match workspace.submit().await {
            Ok(report) => {
                println!(
                    "Saved {} report {} ({})",
                    report.report_type,
                    report.id,
                    report.address
                );
                return Ok(());
            }
            Err(e @ AppError::Validation { .. })
                if workspace.form().description.trim().is_empty() =>
            {
                println!("Error: {e}");
                let description = prompt_description(None)?;
                workspace.form_mut().description = description;
            }
            Err(e @ AppError::Client(_)) => {
                println!("Error: {e}");
                if !Confirm::new()
                    .with_prompt("Retry submission?")
                    .default(true)
                    .interact()?
                {
                    workspace.cancel();
                    println!("Discarded.");
                    return Ok(());
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Lets the user pick one of their own reports. `editable_only` limits the
/// choice to point reports.
#[allow(clippy::future_not_send)]
async fn pick_own_report<S: MapSurface>(
    workspace: &mut Workspace<S>,
    prompt: &str,
    editable_only: bool,
) -> Result<Option<Report>, AppError> {
    let user_id = workspace.user_id().map(String::from);
    let mut reports = workspace.my_reports().await?;
    if editable_only {
        reports.retain(|r| user_id.as_deref().is_some_and(|u| r.is_editable_by(u)));
    }
    if reports.is_empty() {
        println!("You have no reports to choose from.");
        return Ok(None);
    }

    let labels: Vec<String> = reports
        .iter()
        .map(|r| {
            format!(
                "{:<12} {:<30} {}",
                r.report_type.as_ref(),
                r.location_summary(),
                r.description_preview()
            )
        })
        .collect();

    workspace.controller_mut().set_modal_open(true);
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt();
    workspace.controller_mut().set_modal_open(false);

    Ok(idx?.map(|i| reports.swap_remove(i)))
}

fn prompt_coordinate(prompt: &str) -> Result<Coordinate, AppError> {
    let text: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| input.parse::<Coordinate>().map(|_| ()))
        .interact_text()?;
    Ok(text.parse()?)
}

fn prompt_optional_coordinate(prompt: &str) -> Result<Option<Coordinate>, AppError> {
    let text: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Ok(())
            } else {
                input.parse::<Coordinate>().map(|_| ())
            }
        })
        .interact_text()?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(text.parse()?))
}

#[allow(clippy::ptr_arg)]
fn validate_description(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Description must not be empty")
    } else {
        Ok(())
    }
}

fn prompt_description(current: Option<&str>) -> Result<String, AppError> {
    let mut input = Input::<String>::new()
        .with_prompt("Description")
        .validate_with(validate_description);
    if let Some(current) = current {
        input = input.default(current.to_string());
    }
    Ok(input.interact_text()?)
}
