// ── Runtime sync configuration ──
//
// Describes *where* topology changes are mirrored. Never touches disk:
// the CLI resolves a `SyncConfig` from its config file and hands it in.

use std::time::Duration;

use url::Url;

use crate::error::CoreError;

/// Default request timeout for backend sync calls.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the topology backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// API base, e.g. `http://localhost:3000/api`.
    pub url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SyncConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }

    /// Parse a base URL string.
    pub fn parse(url: &str) -> Result<Self, CoreError> {
        let url = Url::parse(url).map_err(|e| CoreError::Config {
            message: format!("invalid sync URL '{url}': {e}"),
        })?;
        Ok(Self::new(url))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join `path` onto the base URL, keeping any base path segments.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, CoreError> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| CoreError::Config {
                message: format!("cannot build sync URL for '{path}': {e}"),
            })
    }
}
