//! Project command handlers.

use serde::Serialize;

use meshplan_core::Notice;

use super::{Context, util};
use crate::cli::{ProjectArgs, ProjectCommand};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    path: String,
    loops: usize,
    devices: usize,
    missing: usize,
    buildings: usize,
    floors: usize,
    placements: usize,
    notices: Vec<Notice>,
}

fn check_detail(r: &CheckReport) -> String {
    let mut lines = vec![
        format!("Project:     {}", r.path),
        format!("Loops:       {}", r.loops),
        format!("Devices:     {} ({} missing)", r.devices, r.missing),
        format!("Buildings:   {}", r.buildings),
        format!("Floors:      {}", r.floors),
        format!("Placements:  {}", r.placements),
    ];
    if r.notices.is_empty() {
        lines.push("No inconsistencies".into());
    } else {
        lines.push(format!("Notices:     {}", r.notices.len()));
        lines.extend(r.notices.iter().map(|n| format!("  - {n}")));
    }
    lines.join("\n")
}

pub fn handle(args: ProjectArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        ProjectCommand::New => {
            // A broken file can still be replaced.
            let mut project = util::load_project(ctx).unwrap_or_default();
            if ctx.project_path.exists()
                && !util::confirm(
                    &format!("Replace {} with an empty project?", ctx.project_path.display()),
                    "project new",
                    ctx.yes,
                )?
            {
                return Ok(());
            }
            project.clear();
            util::save_project(ctx, &project)?;
            output::print_status(
                &format!("Empty project written to {}", ctx.project_path.display()),
                ctx.quiet,
            );
            Ok(())
        }

        ProjectCommand::Check => {
            let project = util::load_project(ctx)?;
            let topology = project.topology().state();
            let site = project.site().state();
            let report = CheckReport {
                path: ctx.project_path.display().to_string(),
                loops: topology.active_loops().len(),
                devices: topology.devices().len(),
                missing: topology.devices().iter().filter(|d| d.is_missing()).count(),
                buildings: site.buildings().len(),
                floors: site.floors().count(),
                placements: site.placements().count(),
                notices: project.consistency_notices(),
            };
            let out = output::render_single(ctx.output, &report, check_detail, |r| {
                r.notices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            output::print_output(&out, ctx.quiet);
            Ok(())
        }
    }
}
