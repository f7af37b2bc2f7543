// ABOUTME: Serialisable description of a layout tree.
// ABOUTME: Rows, columns, stacks and components with percentage sizes and opaque state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::LayoutSettings;

/// Kind of an item in the layout tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Root,
    /// Children laid out left to right, sized by `width`
    Row,
    /// Children laid out top to bottom, sized by `height`
    Column,
    /// Tabbed children, one visible at a time
    Stack,
    /// Leaf hosting a single container
    Component,
}

fn default_closable() -> bool {
    true
}

fn empty_state() -> Value {
    Value::Object(serde_json::Map::new())
}

fn is_true(value: &bool) -> bool {
    *value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConfig {
    #[serde(rename = "type")]
    pub item_type: ItemType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ItemConfig>,

    /// Share of the parent row's width, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    /// Share of the parent column's height, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,

    #[serde(default = "default_closable", skip_serializing_if = "is_true")]
    pub is_closable: bool,

    /// Caller-defined state, passed through untouched
    #[serde(default = "empty_state")]
    pub component_state: Value,

    /// Index of the visible child of a stack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_item_index: Option<usize>,
}

impl ItemConfig {
    fn new(item_type: ItemType, content: Vec<ItemConfig>) -> Self {
        Self {
            item_type,
            content,
            width: None,
            height: None,
            title: None,
            component_name: None,
            is_closable: true,
            component_state: empty_state(),
            active_item_index: None,
        }
    }

    pub fn row(content: Vec<ItemConfig>) -> Self {
        Self::new(ItemType::Row, content)
    }

    pub fn column(content: Vec<ItemConfig>) -> Self {
        Self::new(ItemType::Column, content)
    }

    pub fn stack(content: Vec<ItemConfig>) -> Self {
        Self::new(ItemType::Stack, content)
    }

    pub fn component(component_name: impl Into<String>) -> Self {
        let mut config = Self::new(ItemType::Component, Vec::new());
        config.component_name = Some(component_name.into());
        config
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_state(mut self, state: Value) -> Self {
        self.component_state = state;
        self
    }

    pub fn closable(mut self, is_closable: bool) -> Self {
        self.is_closable = is_closable;
        self
    }

    /// Title shown for this item, falling back to the component name
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.component_name.clone())
            .unwrap_or_default()
    }
}

/// A full layout: settings plus the items below the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub settings: LayoutSettings,
    #[serde(default)]
    pub content: Vec<ItemConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutConfigError {
    #[error("Failed to read layout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LayoutConfig {
    pub fn new(content: Vec<ItemConfig>) -> Self {
        Self {
            settings: LayoutSettings::default(),
            content,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, LayoutConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, LayoutConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a layout from a JSON file
    pub fn load(path: &Path) -> Result<Self, LayoutConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
