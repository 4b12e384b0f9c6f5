//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use meshplan_config::ConfigError;
use meshplan_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Identity ─────────────────────────────────────────────────────

    #[error("MAC {mac} already belongs to loop {owner}")]
    #[diagnostic(
        code(meshplan::mac_conflict),
        help(
            "A device can only belong to one loop. Nothing was imported.\n\
             Delete it from loop {owner} first, or import into loop {owner}.\n\
             Try: meshplan devices locate {mac}"
        )
    )]
    MacConflict { mac: String, owner: String },

    #[error("Alias \"{alias}\" is already in use")]
    #[diagnostic(
        code(meshplan::alias_taken),
        help("Aliases are unique across all floors. Choose another one.")
    )]
    AliasTaken { alias: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(meshplan::not_found),
        help("Run: meshplan {list_command}")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Could not read topology export: {message}")]
    #[diagnostic(
        code(meshplan::parse),
        help("Exports must be JSON or HTML holding device and edge arrays.")
    )]
    Parse { message: String },

    #[error("Project file {path} is invalid: {message}")]
    #[diagnostic(
        code(meshplan::project),
        help("Restore a backup, or start over with: meshplan project new")
    )]
    Project { path: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(meshplan::validation))]
    Validation { field: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(meshplan::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Sync ─────────────────────────────────────────────────────────

    #[error("Backend sync failed: {message}")]
    #[diagnostic(
        code(meshplan::sync),
        help("Local changes are saved. Check --sync-url or [sync] in your config.")
    )]
    Sync { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(meshplan::config),
        help("Inspect it with: meshplan config show")
    )]
    Config { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MacConflict { .. } | Self::AliasTaken { .. } => exit_code::CONFLICT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Sync { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MacConflict { mac, owner } => CliError::MacConflict {
                mac,
                owner: owner.to_string(),
            },

            CoreError::AliasTaken { alias } => CliError::AliasTaken { alias },

            err @ (CoreError::InvalidLoop { .. } | CoreError::LoopLimit { .. }) => {
                CliError::Validation {
                    field: "loop".into(),
                    reason: err.to_string(),
                }
            }

            CoreError::BuildingNotFound { id } => CliError::NotFound {
                resource_type: "building".into(),
                identifier: id,
                list_command: "site list".into(),
            },

            CoreError::FloorNotFound { id } => CliError::NotFound {
                resource_type: "floor".into(),
                identifier: id,
                list_command: "site list".into(),
            },

            CoreError::NodeNotPlaced { mac, floor } => CliError::NotFound {
                resource_type: "placement".into(),
                identifier: format!("{mac} on {floor}"),
                list_command: format!("devices locate {mac}"),
            },

            CoreError::Parse { message } => CliError::Parse { message },

            CoreError::Project { message } => CliError::Project {
                path: "(project)".into(),
                message,
            },

            CoreError::Sync { message, .. } => CliError::Sync { message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Io(err) => CliError::Io(err),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(err) => CliError::Io(err),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use meshplan_core::LoopId;

    use super::*;

    #[test]
    fn mac_conflict_exits_with_conflict_code() {
        let err = CliError::from(CoreError::MacConflict {
            mac: "aa:bb".into(),
            owner: LoopId::new(4).unwrap(),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert_eq!(err.to_string(), "MAC aa:bb already belongs to loop 4");
    }

    #[test]
    fn missing_floor_is_not_found() {
        let err = CliError::from(CoreError::FloorNotFound { id: "f1".into() });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn invalid_loop_is_usage_error() {
        let err = CliError::from(CoreError::InvalidLoop { value: 30 });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn config_validation_keeps_field() {
        let err = CliError::from(ConfigError::Validation {
            field: "sync.url".into(),
            reason: "bad".into(),
        });
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "sync.url"));
    }
}
