//! CLI configuration: thin wrapper around `meshplan_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--project, --output, --sync-url).

use std::path::PathBuf;

use clap::ValueEnum;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::commands::Context;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use meshplan_config::{Config, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Translate config + global flags into the context every command runs in.
///
/// CLI flag overrides take priority over config values.
pub fn resolve_context(global: &GlobalOpts, cfg: &Config) -> Result<Context, CliError> {
    // 1. Project path (flag > env > config)
    let project_path = global
        .project
        .clone()
        .or_else(|| cfg.default_project.clone())
        .unwrap_or_else(|| PathBuf::from("meshplan.json"));

    // 2. Presentation
    let output = match global.output {
        Some(output) => output,
        None => parse_enum::<OutputFormat>("defaults.output", &cfg.defaults.output)?,
    };
    let color = match global.color {
        Some(color) => color,
        None => parse_enum::<ColorMode>("defaults.color", &cfg.defaults.color)?,
    };

    // 3. Backend sync
    let sync = meshplan_config::resolve_sync(cfg, global.sync_url.as_deref())?
        .map(meshplan_core::TopologySync::new)
        .transpose()?;

    Ok(Context {
        project_path,
        output,
        color,
        quiet: global.quiet,
        yes: global.yes,
        sync,
    })
}

fn parse_enum<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn global() -> GlobalOpts {
        GlobalOpts {
            project: None,
            output: None,
            color: None,
            verbose: 0,
            quiet: false,
            yes: false,
            sync_url: None,
        }
    }

    #[test]
    fn config_supplies_defaults() {
        let mut cfg = Config::default();
        cfg.default_project = Some(PathBuf::from("/plans/hq.json"));
        cfg.defaults.output = "yaml".into();

        let ctx = resolve_context(&global(), &cfg).unwrap();
        assert_eq!(ctx.project_path, PathBuf::from("/plans/hq.json"));
        assert_eq!(ctx.output, OutputFormat::Yaml);
        assert_eq!(ctx.color, ColorMode::Auto);
        assert!(ctx.sync.is_none());
    }

    #[test]
    fn flags_override_config() {
        let mut opts = global();
        opts.project = Some(PathBuf::from("other.json"));
        opts.output = Some(OutputFormat::Plain);
        opts.sync_url = Some("http://localhost:3000/api".into());

        let ctx = resolve_context(&opts, &Config::default()).unwrap();
        assert_eq!(ctx.project_path, PathBuf::from("other.json"));
        assert_eq!(ctx.output, OutputFormat::Plain);
        assert!(ctx.sync.is_some());
    }

    #[test]
    fn unknown_output_in_config_is_rejected() {
        let mut cfg = Config::default();
        cfg.defaults.output = "xml".into();
        assert!(matches!(
            resolve_context(&global(), &cfg),
            Err(CliError::Validation { .. })
        ));
    }
}
