// ABOUTME: Main application entry point.
// ABOUTME: Loads a layout, lays it out for the configured window and saves the session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use dock_core::{Config, ItemConfig, LayoutConfig, SessionData};
use dock_layout::{ContainerEvent, LayoutEvent, LayoutTree};
use serde_json::json;

/// Layout used when neither a file nor a saved session is available
fn default_layout(config: &Config) -> LayoutConfig {
    let mut layout = LayoutConfig::new(vec![ItemConfig::row(vec![
        ItemConfig::stack(vec![
            ItemConfig::component("editor").with_state(json!({"file": null})),
            ItemConfig::component("preview"),
        ])
        .with_width(60.0),
        ItemConfig::column(vec![
            ItemConfig::component("terminal").with_height(70.0),
            ItemConfig::component("log").with_height(30.0).closable(false),
        ])
        .with_width(40.0),
    ])]);
    layout.settings = config.settings.clone();
    layout
}

/// The saved tree, laid out with the settings currently in the config file
fn restored_layout(session: SessionData, config: &Config) -> LayoutConfig {
    let mut layout = session.layout;
    layout.settings = config.settings.clone();
    layout
}

fn load_layout(config: &Config) -> Result<LayoutConfig> {
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        tracing::info!("Loading layout from {}", path.display());
        return LayoutConfig::load(&path)
            .with_context(|| format!("Failed to load layout {}", path.display()));
    }
    if config.restore_session {
        if let Some(session) = SessionData::load_from_default() {
            tracing::info!("Restoring saved session");
            return Ok(restored_layout(session, config));
        }
    }
    Ok(default_layout(config))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting dock-layout");

    let config = Config::load_or_default();
    let layout = load_layout(&config)?;
    let mut tree = LayoutTree::from_config(&layout)?;

    for id in tree.components() {
        if let Some(container) = tree.container_mut(id) {
            let title = container.title().to_string();
            container.on(move |n| match n.event {
                ContainerEvent::Resize => tracing::debug!(
                    "{} resized to {:?} x {:?}",
                    title,
                    n.width,
                    n.height
                ),
                other => tracing::debug!("{}: {:?} (hidden: {})", title, other, n.is_hidden),
            });
        }
    }
    let root = tree.root();
    tree.on_item_event(root, |event| {
        if event.event == LayoutEvent::StateChanged {
            tracing::debug!("State changed in {:?}", event.origin);
        }
    })?;

    tree.set_root_size(config.window_width as f64, config.window_height as f64);

    for id in tree.components() {
        if let Some(container) = tree.container(id) {
            println!(
                "{:<16} {:>8.1} x {:<8.1} {}",
                container.title(),
                container.width().unwrap_or(0.0),
                container.height().unwrap_or(0.0),
                if container.is_hidden() { "(hidden)" } else { "" }
            );
        }
    }

    let session = SessionData::new(tree.to_config());
    match session.save_to_default() {
        Ok(path) => tracing::info!("Session saved to {}", path.display()),
        Err(e) => tracing::error!("Failed to save session: {}", e),
    }

    Ok(())
}
