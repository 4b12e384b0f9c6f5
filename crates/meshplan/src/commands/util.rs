//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use meshplan_core::{CoreError, LoopId, Project, SyncPayload};

use super::Context;
use crate::error::CliError;

// ── Project file ────────────────────────────────────────────────────

/// Load the project, treating a missing file as an empty project.
pub fn load_project(ctx: &Context) -> Result<Project, CliError> {
    let path = &ctx.project_path;
    if !path.exists() {
        debug!(path = %path.display(), "no project file yet, starting empty");
        return Ok(Project::new());
    }
    Project::load(path).map_err(|e| project_error(path, e))
}

pub fn save_project(ctx: &Context, project: &Project) -> Result<(), CliError> {
    project
        .save(&ctx.project_path)
        .map_err(|e| project_error(&ctx.project_path, e))
}

fn project_error(path: &Path, err: CoreError) -> CliError {
    match err {
        CoreError::Project { message } => CliError::Project {
            path: path.display().to_string(),
            message,
        },
        other => other.into(),
    }
}

// ── Confirmation ────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

// ── Backend sync ────────────────────────────────────────────────────

/// Mirror a loop's committed state to the backend, if sync is configured.
pub async fn push_loop(ctx: &Context, project: &Project, loop_id: LoopId) {
    let Some(sync) = &ctx.sync else {
        return;
    };
    let payload = SyncPayload::for_loop(&project.topology().state(), loop_id);
    let timeout = sync.config().timeout;
    finish(sync.push_detached(payload), timeout).await;
}

/// Tell the backend a loop is gone, if sync is configured.
pub async fn delete_remote_loop(ctx: &Context, loop_id: LoopId) {
    let Some(sync) = &ctx.sync else {
        return;
    };
    let timeout = sync.config().timeout;
    finish(sync.delete_loop_detached(loop_id), timeout).await;
}

/// Give a detached sync task a bounded chance to finish before exit.
async fn finish(handle: JoinHandle<()>, timeout: Duration) {
    let grace = timeout + Duration::from_secs(1);
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "sync task aborted"),
        Err(_) => warn!(seconds = grace.as_secs(), "sync still pending at exit, abandoned"),
    }
}
