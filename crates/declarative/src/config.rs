//! Core configuration keys
//!
//! The core reads only `treat_deprecation_warnings_as_errors`. The file keys
//! and `why_run` are carried unchanged to providers through
//! [`ActionContext::config`](crate::context::ActionContext::config).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Agent configuration seen by the resolution core and providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raise every warning as `Error::Deprecation`
    pub treat_deprecation_warnings_as_errors: bool,

    /// Write files through a staged temporary file and rename
    pub file_atomic_update: bool,

    /// Stage temporary files next to the destination
    pub file_staging_uses_destdir: bool,

    /// Directory for backups of replaced files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_backup_path: Option<PathBuf>,

    /// Report what would change without changing it
    pub why_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            treat_deprecation_warnings_as_errors: false,
            file_atomic_update: true,
            file_staging_uses_destdir: true,
            file_backup_path: None,
            why_run: false,
        }
    }
}
