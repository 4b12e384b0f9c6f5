//! Site command handlers: buildings, floors and placements.

use serde::Serialize;
use tabled::Tabled;
use tracing::warn;
use uuid::Uuid;

use meshplan_core::SiteState;

use super::{Context, util};
use crate::cli::{SiteArgs, SiteCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

/// One floor (or a floorless building) of the site listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FloorEntry {
    building_id: Uuid,
    building: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    floor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<i32>,
    devices: usize,
}

#[derive(Tabled)]
struct FloorRow {
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "Floor")]
    floor: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Devices")]
    devices: usize,
    #[tabled(rename = "Floor ID")]
    floor_id: String,
}

impl From<&FloorEntry> for FloorRow {
    fn from(e: &FloorEntry) -> Self {
        Self {
            building: format!("{} ({})", e.building, e.building_id),
            floor: e.floor.clone().unwrap_or_else(|| "-".into()),
            level: e.level.map(|l| l.to_string()).unwrap_or_default(),
            devices: e.devices,
            floor_id: e.floor_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

fn floor_entries(site: &SiteState) -> Vec<FloorEntry> {
    let mut entries = Vec::new();
    for building in site.buildings() {
        if building.floors.is_empty() {
            entries.push(FloorEntry {
                building_id: building.id,
                building: building.name.clone(),
                floor_id: None,
                floor: None,
                level: None,
                devices: 0,
            });
        }
        entries.extend(building.floors.iter().map(|floor| FloorEntry {
            building_id: building.id,
            building: building.name.clone(),
            floor_id: Some(floor.id),
            floor: Some(floor.name.clone()),
            level: Some(floor.level_index),
            devices: floor.nodes.len(),
        }));
    }
    entries
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: SiteArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        SiteCommand::List => {
            let project = util::load_project(ctx)?;
            let entries = floor_entries(&project.site().state());
            let out = output::render_list(ctx.output, &entries, |e| FloorRow::from(e), |e| {
                e.floor_id
                    .map_or_else(|| e.building_id.to_string(), |id| id.to_string())
            });
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        SiteCommand::AddBuilding { name } => {
            let mut project = util::load_project(ctx)?;
            let id = project.site_mut().add_building(name.as_deref());
            util::save_project(ctx, &project)?;
            // The id goes to stdout so scripts can capture it.
            output::print_output(&id.to_string(), ctx.quiet);
            Ok(())
        }

        SiteCommand::AddFloor { building, name } => {
            let mut project = util::load_project(ctx)?;
            let id = project.site_mut().add_floor(building, name.as_deref())?;
            util::save_project(ctx, &project)?;
            output::print_output(&id.to_string(), ctx.quiet);
            Ok(())
        }

        SiteCommand::Place { floor, mac, x, y } => {
            let mut project = util::load_project(ctx)?;
            if project.topology().state().device(&mac).is_none() {
                warn!(%mac, "placing a device no loop knows about");
            }
            project.site_mut().place_node(floor, &mac, x, y)?;
            util::save_project(ctx, &project)?;
            output::print_status(&format!("Placed {mac} at ({x}, {y})"), ctx.quiet);
            Ok(())
        }

        SiteCommand::Unplace { floor, mac } => {
            let mut project = util::load_project(ctx)?;
            if !project.site_mut().remove_node_from_floor(floor, &mac)? {
                return Err(CliError::NotFound {
                    resource_type: "placement".into(),
                    identifier: format!("{mac} on {floor}"),
                    list_command: format!("devices locate {mac}"),
                });
            }
            util::save_project(ctx, &project)?;
            output::print_status(&format!("Removed {mac} from floor"), ctx.quiet);
            Ok(())
        }

        SiteCommand::Alias { floor, mac, alias } => {
            let mut project = util::load_project(ctx)?;
            project.site_mut().set_node_description(floor, &mac, &alias)?;
            util::save_project(ctx, &project)?;
            let message = if alias.trim().is_empty() {
                format!("Cleared alias of {mac}")
            } else {
                format!("Alias of {mac} set to \"{}\"", alias.trim())
            };
            output::print_status(&message, ctx.quiet);
            Ok(())
        }
    }
}
