// ABOUTME: Session state persistence for layout restoration.
// ABOUTME: Saves the whole layout tree, including component state, to disk.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::LayoutConfig;

/// Complete session data for a layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub version: u32,
    pub layout: LayoutConfig,
}

impl SessionData {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            layout,
        }
    }

    /// Get the default session file path (~/.local/state/dock-layout/session.bin)
    pub fn default_path() -> Option<PathBuf> {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|p| p.join("dock-layout").join("session.bin"))
    }

    /// Save session data to disk
    pub fn save(&self, path: &std::path::Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Serialize to JSON then compress with zstd
        let json = serde_json::to_vec(self)?;
        let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        std::fs::write(path, compressed)?;
        tracing::debug!("Saved session to {}", path.display());
        Ok(())
    }

    /// Save session to default path
    pub fn save_to_default(&self) -> Result<PathBuf, SessionError> {
        let path = Self::default_path().ok_or(SessionError::NoStatePath)?;
        self.save(&path)?;
        Ok(path)
    }

    /// Load session data from disk
    pub fn load(path: &std::path::Path) -> Result<Self, SessionError> {
        let compressed = std::fs::read(path)?;

        let mut decoder = zstd::Decoder::new(&compressed[..])?;
        let mut json = Vec::new();
        decoder.read_to_end(&mut json)?;

        let session: SessionData = serde_json::from_slice(&json)?;

        if session.version > Self::CURRENT_VERSION {
            return Err(SessionError::UnsupportedVersion(session.version));
        }

        Ok(session)
    }

    /// Load session from default path, returns None if not found or invalid
    pub fn load_from_default() -> Option<Self> {
        let path = Self::default_path()?;
        match Self::load(&path) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("No usable session at {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Delete the session file
    pub fn clear_default() -> Result<(), SessionError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not determine state directory")]
    NoStatePath,

    #[error("Unsupported session version: {0}")]
    UnsupportedVersion(u32),
}
