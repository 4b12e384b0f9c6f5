//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn format_config(cfg: &Config) -> String {
    toml::to_string_pretty(cfg)
        .map(|s| s.trim_end().to_owned())
        .unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_config(defaults: Config) -> Result<Config, CliError> {
    let current_project = defaults
        .default_project
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let project: String = Input::new()
        .with_prompt("Default project file")
        .default(current_project)
        .interact_text()
        .map_err(prompt_err)?;

    let enabled = Confirm::new()
        .with_prompt("Mirror topology changes to a backend?")
        .default(defaults.sync.enabled)
        .interact()
        .map_err(prompt_err)?;

    let mut sync = defaults.sync;
    sync.enabled = enabled;
    if enabled {
        let url: String = Input::new()
            .with_prompt("Backend API base URL")
            .default(
                sync.url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:3000/api".into()),
            )
            .interact_text()
            .map_err(prompt_err)?;
        sync.url = Some(url);
    }

    let cfg = Config {
        default_project: Some(PathBuf::from(project)),
        defaults: defaults.defaults,
        sync,
    };
    // Reject a bad URL before it is written.
    meshplan_config::resolve_sync(&cfg, None)?;
    Ok(cfg)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let cfg = if global.yes {
                Config::default()
            } else {
                eprintln!("meshplan configuration");
                eprintln!("   Config path: {}\n", config_path.display());
                prompt_config(config::load_config_or_default())?
            };

            let written = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", written.display());
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = meshplan_config::load_config()?;
            let format = global.output.unwrap_or(OutputFormat::Table);
            let out = output::render_single(format, &cfg, format_config, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
