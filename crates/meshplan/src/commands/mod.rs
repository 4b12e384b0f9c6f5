//! Command dispatch: bridges CLI args -> project operations -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod loops;
pub mod project;
pub mod site;
pub mod util;

use std::path::PathBuf;

use meshplan_core::TopologySync;

use crate::cli::{ColorMode, Command, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Everything a project-bound command needs, resolved from flags and config.
#[derive(Debug)]
pub struct Context {
    pub project_path: PathBuf,
    pub output: OutputFormat,
    pub color: ColorMode,
    pub quiet: bool,
    pub yes: bool,
    /// Present when topology changes should be mirrored to a backend.
    pub sync: Option<TopologySync>,
}

impl Context {
    pub fn color_enabled(&self) -> bool {
        output::should_color(self.color)
    }
}

/// Dispatch a project-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Loops(args) => loops::handle(args, ctx).await,
        Command::Devices(args) => devices::handle(args, ctx).await,
        Command::Site(args) => site::handle(args, ctx),
        Command::Project(args) => project::handle(args, ctx),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
