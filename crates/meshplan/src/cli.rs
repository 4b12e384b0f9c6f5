//! Clap derive structures for the `meshplan` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use meshplan_core::{LoopId, MacAddress};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// meshplan -- manage mesh topology floor-plan projects
#[derive(Debug, Parser)]
#[command(
    name = "meshplan",
    version,
    about = "Reconcile mesh network topology exports with floor-plan placements",
    long_about = "Import per-loop topology exports into a floor-plan project, track devices\n\
        that disappear between imports, and keep floor placements consistent\n\
        when loops or devices are removed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Project file to operate on (overrides config)
    #[arg(long, short = 'p', env = "MESHPLAN_PROJECT", global = true)]
    pub project: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', env = "MESHPLAN_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output (overrides config)
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Mirror topology changes to this backend API base URL
    #[arg(long, env = "MESHPLAN_SYNC_URL", global = true)]
    pub sync_url: Option<String>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register, import, inspect and delete topology loops
    #[command(alias = "l")]
    Loops(LoopsArgs),

    /// Inspect and remove devices across loops
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage buildings, floors and device placements
    Site(SiteArgs),

    /// Create and check project files
    Project(ProjectArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOOPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoopsArgs {
    #[command(subcommand)]
    pub command: LoopsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LoopsCommand {
    /// List registered loops with device counts
    #[command(alias = "ls")]
    List,

    /// Register an empty loop
    Add {
        /// Loop number (1-24)
        #[arg(value_name = "LOOP")]
        loop_id: LoopId,
    },

    /// Import a topology export (JSON or HTML) into a loop
    Import {
        /// Loop number (1-24)
        #[arg(value_name = "LOOP")]
        loop_id: LoopId,

        /// Export file
        file: PathBuf,
    },

    /// Delete a loop, its devices, its edges and their floor placements
    #[command(alias = "rm")]
    Delete {
        #[arg(value_name = "LOOP")]
        loop_id: LoopId,
    },

    /// Remove a loop's missing devices and their floor placements
    ClearMissing {
        #[arg(value_name = "LOOP")]
        loop_id: LoopId,
    },

    /// Show a loop's device hierarchy
    Tree {
        #[arg(value_name = "LOOP")]
        loop_id: LoopId,

        /// Keep only nodes matching MAC, role, label or alias
        #[arg(long, short = 's')]
        search: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only devices of this loop
        #[arg(long = "loop", short = 'l', value_name = "LOOP")]
        loop_id: Option<LoopId>,

        /// Only devices missing from their loop's latest import
        #[arg(long)]
        missing: bool,
    },

    /// Show where a device is placed
    Locate {
        #[arg(value_name = "MAC")]
        mac: MacAddress,
    },

    /// Remove devices and their floor placements
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "MAC", required = true)]
        macs: Vec<MacAddress>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SiteArgs {
    #[command(subcommand)]
    pub command: SiteCommand,
}

#[derive(Debug, Subcommand)]
pub enum SiteCommand {
    /// List buildings and floors
    #[command(alias = "ls")]
    List,

    /// Add a building
    AddBuilding {
        /// Building name (auto-numbered if omitted)
        name: Option<String>,
    },

    /// Add a floor to a building
    AddFloor {
        /// Building ID
        building: Uuid,

        /// Floor name (auto-numbered if omitted)
        name: Option<String>,
    },

    /// Place a device on a floor (moves it if placed elsewhere)
    Place {
        /// Floor ID
        floor: Uuid,
        #[arg(value_name = "MAC")]
        mac: MacAddress,
        x: f64,
        y: f64,
    },

    /// Take a device off a floor
    Unplace {
        /// Floor ID
        floor: Uuid,
        #[arg(value_name = "MAC")]
        mac: MacAddress,
    },

    /// Set a placed device's alias (empty string clears it)
    Alias {
        /// Floor ID
        floor: Uuid,
        #[arg(value_name = "MAC")]
        mac: MacAddress,
        alias: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROJECT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Write an empty project (replaces an existing one)
    New,

    /// Summarize the project and report inconsistencies
    Check,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a config file (interactive unless --yes)
    Init,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
