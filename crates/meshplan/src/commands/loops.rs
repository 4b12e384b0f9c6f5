//! Loop command handlers.

use std::fmt::Write as _;

use tabled::Tabled;
use tracing::info;

use meshplan_core::parse::read_topology;
use meshplan_core::{
    ImportSummary, LoopStats, RemovalReport, TopologyTreeNode, TreeResult, build_topology_tree,
    filter_topology_nodes,
};

use super::{Context, util};
use crate::cli::{LoopsArgs, LoopsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LoopRow {
    #[tabled(rename = "Loop")]
    id: String,
    #[tabled(rename = "Active")]
    active: usize,
    #[tabled(rename = "Missing")]
    missing: usize,
    #[tabled(rename = "New")]
    new: usize,
    #[tabled(rename = "Edges")]
    edges: usize,
}

impl From<&LoopStats> for LoopRow {
    fn from(s: &LoopStats) -> Self {
        Self {
            id: s.loop_id.to_string(),
            active: s.active,
            missing: s.missing,
            new: s.new,
            edges: s.edges,
        }
    }
}

// ── Detail views ────────────────────────────────────────────────────

fn import_detail(s: &ImportSummary) -> String {
    let mut lines = vec![
        format!("Loop:     {}", s.loop_id),
        format!("Updated:  {}", s.updated.len()),
        format!("Added:    {}", s.added.len()),
        format!("Missing:  {}", s.missing.len()),
        format!("Edges:    {}", s.edges),
    ];
    lines.extend(s.missing.iter().map(|mac| format!("  missing {mac}")));
    lines.join("\n")
}

pub(super) fn removal_detail(r: &RemovalReport) -> String {
    let mut lines = vec![
        format!("Devices removed:     {}", r.devices_removed.len()),
        format!("Edges removed:       {}", r.edges_removed),
        format!("Placements removed:  {}", r.placements_removed),
    ];
    if r.loop_removed {
        lines.push("Loop unregistered".into());
    }
    lines.join("\n")
}

pub(super) fn removal_ids(r: &RemovalReport) -> String {
    r.devices_removed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn tree_text(tree: &TreeResult, ctx: &Context) -> String {
    let color = ctx.color_enabled();
    let mut out = String::new();
    for root in &tree.roots {
        write_node(&mut out, root, 0, color);
    }
    if !tree.orphans.is_empty() {
        let _ = writeln!(out, "Unconnected:");
        for orphan in &tree.orphans {
            write_node(&mut out, orphan, 1, color);
        }
    }
    out.trim_end().to_owned()
}

fn write_node(out: &mut String, node: &TopologyTreeNode, depth: usize, color: bool) {
    let indent = "  ".repeat(depth);
    let branch = if depth == 0 { "" } else { "└─ " };
    let _ = write!(
        out,
        "{indent}{branch}{} {}",
        output::paint_role(node.role, color),
        node.mac
    );
    if let Some(label) = &node.label {
        let _ = write!(out, " \"{label}\"");
    }
    if let Some(rssi) = node.uplink_rssi {
        let _ = write!(out, " ({rssi} dBm)");
    }
    let _ = writeln!(out);
    for child in &node.children {
        write_node(out, child, depth + 1, color);
    }
}

fn tree_macs(nodes: &[TopologyTreeNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.mac.to_string());
        tree_macs(&node.children, out);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: LoopsArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        LoopsCommand::List => {
            let project = util::load_project(ctx)?;
            let state = project.topology().state();
            let stats: Vec<LoopStats> = state
                .active_loops()
                .iter()
                .map(|&id| state.loop_stats(id))
                .collect();
            let out = output::render_list(ctx.output, &stats, |s| LoopRow::from(s), |s| {
                s.loop_id.to_string()
            });
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        LoopsCommand::Add { loop_id } => {
            let mut project = util::load_project(ctx)?;
            if project.add_loop(loop_id)? {
                util::save_project(ctx, &project)?;
                output::print_status(&format!("Loop {loop_id} registered"), ctx.quiet);
            } else {
                output::print_status(&format!("Loop {loop_id} is already registered"), ctx.quiet);
            }
            Ok(())
        }

        LoopsCommand::Import { loop_id, file } => {
            let mut project = util::load_project(ctx)?;
            let parsed = read_topology(&file)?;
            // A conflict returns here, before anything is written.
            let summary = project.import_loop(loop_id, parsed)?;
            util::save_project(ctx, &project)?;
            info!(%loop_id, file = %file.display(), "import saved");
            util::push_loop(ctx, &project, loop_id).await;

            let out = output::render_single(ctx.output, &summary, import_detail, |s| {
                s.loop_id.to_string()
            });
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        LoopsCommand::Delete { loop_id } => {
            let mut project = util::load_project(ctx)?;
            let known = {
                let state = project.topology().state();
                state.is_loop_active(loop_id) || state.loop_devices(loop_id).next().is_some()
            };
            if !known {
                output::print_status(&format!("Loop {loop_id} does not exist"), ctx.quiet);
                return Ok(());
            }
            if !util::confirm(
                &format!("Delete loop {loop_id} and all of its floor placements?"),
                "loops delete",
                ctx.yes,
            )? {
                return Ok(());
            }

            let report = project.delete_loop(loop_id);
            util::save_project(ctx, &project)?;
            util::delete_remote_loop(ctx, loop_id).await;

            let out = output::render_single(ctx.output, &report, removal_detail, removal_ids);
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        LoopsCommand::ClearMissing { loop_id } => {
            let mut project = util::load_project(ctx)?;
            let missing = project.topology().state().loop_stats(loop_id).missing;
            if missing == 0 {
                output::print_status(
                    &format!("Loop {loop_id} has no missing devices"),
                    ctx.quiet,
                );
                return Ok(());
            }
            if !util::confirm(
                &format!("Remove {missing} missing device(s) from loop {loop_id}?"),
                "loops clear-missing",
                ctx.yes,
            )? {
                return Ok(());
            }

            let report = project.clear_missing(loop_id);
            util::save_project(ctx, &project)?;
            util::push_loop(ctx, &project, loop_id).await;

            let out = output::render_single(ctx.output, &report, removal_detail, removal_ids);
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        LoopsCommand::Tree { loop_id, search } => {
            let project = util::load_project(ctx)?;
            let state = project.topology().state();
            let devices: Vec<_> = state.loop_devices(loop_id).cloned().collect();
            let edges: Vec<_> = state.loop_edges(loop_id).cloned().collect();
            let mut tree = build_topology_tree(&devices, &edges);

            if let Some(query) = search.as_deref() {
                let aliases = project.site().state().all_node_descriptions();
                tree = TreeResult {
                    roots: filter_topology_nodes(&tree.roots, query, &aliases),
                    orphans: filter_topology_nodes(&tree.orphans, query, &aliases),
                };
            }

            let out = output::render_single(
                ctx.output,
                &tree,
                |t| tree_text(t, ctx),
                |t| {
                    let mut macs = Vec::with_capacity(t.len());
                    tree_macs(&t.roots, &mut macs);
                    tree_macs(&t.orphans, &mut macs);
                    macs.join("\n")
                },
            );
            output::print_output(&out, ctx.quiet);
            Ok(())
        }
    }
}
