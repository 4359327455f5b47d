//! Shared filesystem locations and the atomic write helper.
//!
//! The config file always lives at `~/.config/gd-harvest/config.toml` (or the
//! platform equivalent) so the CLI and library agree on where to look.

use std::io;
use std::path::{Path, PathBuf};

/// Canonical path of the harvest config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gd-harvest").join("config.toml"))
}

/// Resolve the output root using a priority chain:
///
/// 1. CLI override (if `Some`)
/// 2. Configured value (env var or config file)
/// 3. Current working directory
pub fn resolve_output_dir(cli_override: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
    cli_override
        .or(configured)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// reader never observes a half-written file.
pub fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
