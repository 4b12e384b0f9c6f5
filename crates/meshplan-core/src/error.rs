// ── Core error types ──
//
// Every error from this crate is local and recoverable: the operation that
// raised it has not committed anything, so callers degrade to a no-op plus
// a surfaced message.

use thiserror::Error;

use crate::model::LoopId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Identity errors ──────────────────────────────────────────────
    #[error("MAC conflict: {mac} already exists in loop {owner}")]
    MacConflict { mac: String, owner: LoopId },

    #[error("Alias \"{alias}\" is already in use")]
    AliasTaken { alias: String },

    // ── Loop errors ──────────────────────────────────────────────────
    #[error("Loop id {value} is out of range (expected 1-{})", crate::model::MAX_LOOPS)]
    InvalidLoop { value: i64 },

    #[error("Cannot register more than {max} loops")]
    LoopLimit { max: usize },

    // ── Site errors ──────────────────────────────────────────────────
    #[error("Building not found: {id}")]
    BuildingNotFound { id: String },

    #[error("Floor not found: {id}")]
    FloorNotFound { id: String },

    #[error("Device {mac} is not placed on floor {floor}")]
    NodeNotPlaced { mac: String, floor: String },

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Invalid project file: {message}")]
    Project { message: String },

    // ── Sync errors (never fatal to local state) ─────────────────────
    #[error("Backend sync failed: {message}")]
    Sync {
        message: String,
        /// HTTP status code (if the backend answered).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Sync {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
