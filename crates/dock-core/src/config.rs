// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves layout settings from TOML config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default pixel height of a stack's tab header
pub const DEFAULT_HEADER_HEIGHT: f64 = 20.0;

/// Settings that influence how the layout tree computes pixel sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Whether stacks reserve space for a tab header
    pub has_headers: bool,
    /// Header height in pixels, taken off the height of stack children
    pub header_height: f64,
}

impl LayoutSettings {
    /// Vertical space a stack keeps for itself
    pub fn stack_header_height(&self) -> f64 {
        if self.has_headers {
            self.header_height.max(0.0)
        } else {
            0.0
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            has_headers: true,
            header_height: DEFAULT_HEADER_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout computation settings
    pub settings: LayoutSettings,

    /// Window dimensions handed to the layout root
    pub window_width: u32,
    pub window_height: u32,

    /// Restore the last saved layout on startup
    pub restore_session: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: LayoutSettings::default(),
            window_width: 1200,
            window_height: 800,
            restore_session: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

impl Config {
    /// Get the default config file path (~/.config/dock-layout/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dock-layout").join("config.toml"))
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to default path
    pub fn save_to_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)?;
        Ok(path)
    }
}
