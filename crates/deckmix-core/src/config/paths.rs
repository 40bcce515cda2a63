//! Standard location of the engine configuration file

use std::path::PathBuf;

/// Directory name under the platform config directory
pub const CONFIG_DIR_NAME: &str = "deckmix";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Get the default config file path
///
/// Returns: `<config dir>/deckmix/config.yaml` (e.g. `~/.config/deckmix/config.yaml`),
/// falling back to the working directory when no config dir is known.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}
