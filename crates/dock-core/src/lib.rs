// ABOUTME: Shared types and configuration for dock-layout.
// ABOUTME: Defines settings, serialisable layout configs, state merging and sessions.

pub mod config;
pub mod layout_config;
pub mod session;
pub mod state;

pub use config::{Config, ConfigError, LayoutSettings};
pub use layout_config::{ItemConfig, ItemType, LayoutConfig, LayoutConfigError};
pub use session::{SessionData, SessionError};
pub use state::{deep_merge, merged};
