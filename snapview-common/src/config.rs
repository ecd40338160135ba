// Centralized configuration for snapview

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// snapview configuration with support for a TOML file and environment overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapviewConfig {
    /// Snapper config selected at start (default: root)
    pub default_config: String,

    /// Program used for unified file diffs (default: /usr/bin/diff)
    pub diff_command: PathBuf,

    /// Program used to copy files back from a snapshot (default: /bin/cp)
    pub copy_command: PathBuf,

    /// strftime pattern for snapshot dates (default: %c)
    pub date_format: String,

    /// Colorize diff output
    pub color: bool,
}

impl Default for SnapviewConfig {
    fn default() -> Self {
        Self {
            default_config: "root".to_string(),
            diff_command: PathBuf::from("/usr/bin/diff"),
            copy_command: PathBuf::from("/bin/cp"),
            date_format: "%c".to_string(),
            color: true,
        }
    }
}

impl SnapviewConfig {
    /// Create a configuration from the config file and environment overrides
    ///
    /// The file is read from `SNAPVIEW_CONFIG_FILE` or
    /// `$XDG_CONFIG_HOME/snapview/config.toml`. A missing file is not an error.
    ///
    /// Supported environment variables:
    /// - SNAPVIEW_DEFAULT_CONFIG: Override the snapper config selected at start
    /// - SNAPVIEW_DIFF_COMMAND: Override the diff program
    /// - SNAPVIEW_COPY_COMMAND: Override the copy program
    /// - SNAPVIEW_DATE_FORMAT: Override the date format
    /// - SNAPVIEW_NO_COLOR: Disable colored diffs when set
    pub fn new() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a configuration file; keys that are absent keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Location of the configuration file
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SNAPVIEW_CONFIG_FILE") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("snapview").join("config.toml"))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(name) = var("SNAPVIEW_DEFAULT_CONFIG") {
            self.default_config = name;
        }

        if let Some(cmd) = var("SNAPVIEW_DIFF_COMMAND") {
            self.diff_command = PathBuf::from(cmd);
        }

        if let Some(cmd) = var("SNAPVIEW_COPY_COMMAND") {
            self.copy_command = PathBuf::from(cmd);
        }

        if let Some(format) = var("SNAPVIEW_DATE_FORMAT") {
            self.date_format = format;
        }

        if var("SNAPVIEW_NO_COLOR").is_some() {
            self.color = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SnapviewConfig::default();
        assert_eq!(config.default_config, "root");
        assert_eq!(config.diff_command, PathBuf::from("/usr/bin/diff"));
        assert_eq!(config.copy_command, PathBuf::from("/bin/cp"));
        assert_eq!(config.date_format, "%c");
        assert!(config.color);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SNAPVIEW_DEFAULT_CONFIG", "home"),
            ("SNAPVIEW_DIFF_COMMAND", "/opt/bin/diff"),
            ("SNAPVIEW_NO_COLOR", "1"),
        ]);

        let mut config = SnapviewConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.default_config, "home");
        assert_eq!(config.diff_command, PathBuf::from("/opt/bin/diff"));
        assert_eq!(config.copy_command, PathBuf::from("/bin/cp"));
        assert!(!config.color);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SnapviewConfig = toml::from_str("date_format = \"%F %T\"\n").unwrap();
        assert_eq!(config.date_format, "%F %T");
        assert_eq!(config.default_config, "root");
    }
}
