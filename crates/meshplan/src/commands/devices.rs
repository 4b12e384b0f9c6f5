//! Device command handlers.

use std::collections::BTreeSet;

use serde::Serialize;
use tabled::Tabled;

use meshplan_core::{Device, Location, MacAddress, NodeLocation, SiteState};

use super::{Context, loops, util};
use crate::cli::{DevicesArgs, DevicesCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Loop")]
    loop_id: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Placed")]
    placed: String,
}

impl DeviceRow {
    fn new(d: &Device, site: &SiteState, color: bool) -> Self {
        let mut status = output::paint_status(d.status, color);
        if d.is_new {
            status.push_str(" (new)");
        }
        Self {
            mac: d.mac.to_string(),
            loop_id: d.loop_id.to_string(),
            role: output::paint_role(d.role, color),
            status,
            label: d.label.clone().unwrap_or_default(),
            alias: site
                .find_node_description(&d.mac)
                .unwrap_or_default()
                .to_owned(),
            placed: if site.is_node_deployed(&d.mac) {
                "yes".into()
            } else {
                String::new()
            },
        }
    }
}

// ── Locate view ─────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateView {
    mac: MacAddress,
    #[serde(flatten)]
    location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
}

fn locate_detail(v: &LocateView) -> String {
    let placed_at = |loc: &NodeLocation| {
        format!(
            "{} / {} at ({}, {})",
            v.building.as_deref().unwrap_or("?"),
            v.floor.as_deref().unwrap_or("?"),
            loc.x,
            loc.y
        )
    };
    let mut lines = vec![format!("MAC:      {}", v.mac)];
    match &v.location {
        Location::Placed(loc) => lines.push(format!("Placed:   {}", placed_at(loc))),
        Location::Orphaned(loc) => {
            lines.push(format!("Placed:   {}", placed_at(loc)));
            lines.push("Warning:  no loop knows this device".into());
        }
        Location::NotDeployed => lines.push("Placed:   not deployed".into()),
    }
    if let Some(alias) = &v.alias {
        lines.push(format!("Alias:    {alias}"));
    }
    lines.join("\n")
}

fn location_id(v: &LocateView) -> String {
    match &v.location {
        Location::Placed(loc) | Location::Orphaned(loc) => loc.floor_id.to_string(),
        Location::NotDeployed => String::new(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: DevicesArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { loop_id, missing } => {
            let project = util::load_project(ctx)?;
            let topology = project.topology().state();
            let site = project.site().state();
            let devices: Vec<&Device> = topology
                .devices()
                .iter()
                .filter(|d| loop_id.is_none_or(|id| d.loop_id == id))
                .filter(|d| !missing || d.is_missing())
                .collect();
            let color = ctx.color_enabled();
            let out = output::render_list(
                ctx.output,
                &devices,
                |d| DeviceRow::new(d, &site, color),
                |d| d.mac.to_string(),
            );
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        DevicesCommand::Locate { mac } => {
            let project = util::load_project(ctx)?;
            let location = project.locate(&mac);
            let known = project.topology().state().device(&mac).is_some();
            if !known && location == Location::NotDeployed {
                return Err(CliError::NotFound {
                    resource_type: "device".into(),
                    identifier: mac.to_string(),
                    list_command: "devices list".into(),
                });
            }

            let site = project.site().state();
            let (building, floor) = match location {
                Location::Placed(loc) | Location::Orphaned(loc) => (
                    site.building(loc.building_id).map(|b| b.name.clone()),
                    site.floor(loc.floor_id).map(|f| f.name.clone()),
                ),
                Location::NotDeployed => (None, None),
            };
            let view = LocateView {
                alias: site.find_node_description(&mac).map(str::to_owned),
                mac,
                location,
                building,
                floor,
            };
            let out = output::render_single(ctx.output, &view, locate_detail, location_id);
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        DevicesCommand::Remove { macs } => {
            let mut project = util::load_project(ctx)?;
            let touched_loops: BTreeSet<_> = {
                let state = project.topology().state();
                macs.iter()
                    .filter_map(|mac| state.device(mac).map(|d| d.loop_id))
                    .collect()
            };
            if !util::confirm(
                &format!("Remove {} device(s) and their floor placements?", macs.len()),
                "devices remove",
                ctx.yes,
            )? {
                return Ok(());
            }

            let report = project.remove_devices(&macs);
            util::save_project(ctx, &project)?;
            for loop_id in touched_loops {
                util::push_loop(ctx, &project, loop_id).await;
            }

            let out = output::render_single(
                ctx.output,
                &report,
                loops::removal_detail,
                loops::removal_ids,
            );
            output::print_output(&out, ctx.quiet);
            Ok(())
        }
    }
}
