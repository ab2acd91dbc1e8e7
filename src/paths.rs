//! XDG directory helpers for config/log locations.

use std::path::PathBuf;

/// Base directory for configuration files.
///
/// Uses `REGATTA_CONFIG_DIR` if set, otherwise `$XDG_CONFIG_HOME/regatta` or
/// `~/.config/regatta`.
pub(crate) fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REGATTA_CONFIG_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("regatta")
}

/// Base directory for persistent data (log files).
///
/// Uses `REGATTA_DATA_DIR` if set, otherwise `$XDG_DATA_HOME/regatta` or
/// `~/.local/share/regatta`.
pub(crate) fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REGATTA_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local")
                .join("share")
        })
        .join("regatta")
}

/// Default directory for file logs.
pub(crate) fn log_dir() -> PathBuf {
    data_dir().join("logs")
}
