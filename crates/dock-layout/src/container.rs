// ABOUTME: Leaf pane slot hosting one component's content.
// ABOUTME: Tracks size, visibility and opaque state; notifies content through events.

use serde_json::Value;

use crate::event::{ContainerEvent, ContainerNotification, EventHub, SubscriptionId};
use crate::ItemId;

/// Headless stand-in for the element content is rendered into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentSurface {
    pub visible: bool,
    pub outer_width: Option<f64>,
    pub outer_height: Option<f64>,
}

impl ContentSurface {
    fn new() -> Self {
        Self {
            visible: true,
            outer_width: None,
            outer_height: None,
        }
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn set_outer_size(&mut self, width: f64, height: f64) {
        self.outer_width = Some(width);
        self.outer_height = Some(height);
    }
}

/// Per-component settings carried by a container
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentConfig {
    pub component_name: String,
    pub is_closable: bool,
    pub component_state: Value,
}

#[derive(Debug)]
pub struct Container {
    width: Option<f64>,
    height: Option<f64>,
    title: String,
    parent: ItemId,
    is_hidden: bool,
    config: ComponentConfig,
    element: ContentSurface,
    events: EventHub<ContainerNotification>,
}

impl Container {
    pub fn new(config: ComponentConfig, parent: ItemId) -> Self {
        Self {
            width: None,
            height: None,
            title: config.component_name.clone(),
            parent,
            is_hidden: false,
            config,
            element: ContentSurface::new(),
            events: EventHub::new(),
        }
    }

    /// Surface the content is meant to live in
    pub fn element(&self) -> &ContentSurface {
        &self.element
    }

    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub fn height(&self) -> Option<f64> {
        self.height
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Component item this container belongs to
    pub fn parent(&self) -> ItemId {
        self.parent
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    pub fn on(&mut self, callback: impl FnMut(&ContainerNotification) + 'static) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Notify the content, then hide the surface.
    ///
    /// Calling this on an already hidden container notifies again.
    pub fn hide(&mut self) {
        self.notify(ContainerEvent::Hide);
        self.is_hidden = true;
        self.element.hide();
    }

    /// Notify the content, then show the surface. `Shown` follows only when
    /// the container has a non-zero dimension.
    pub fn show(&mut self) {
        self.notify(ContainerEvent::Show);
        self.is_hidden = false;
        self.element.show();
        if self.height.unwrap_or(0.0) != 0.0 || self.width.unwrap_or(0.0) != 0.0 {
            self.notify(ContainerEvent::Shown);
        }
    }

    pub fn get_state(&self) -> &Value {
        &self.config.component_state
    }

    /// Host-driven resize. Does nothing when the size is unchanged.
    pub fn set_pixel_size(&mut self, width: f64, height: f64) {
        if self.width == Some(width) && self.height == Some(height) {
            return;
        }
        self.width = Some(width);
        self.height = Some(height);
        self.element.set_outer_size(width, height);
        self.notify(ContainerEvent::Resize);
    }

    pub(crate) fn notify(&mut self, event: ContainerEvent) {
        let notification = ContainerNotification {
            event,
            width: self.width,
            height: self.height,
            is_hidden: self.is_hidden,
        };
        self.events.emit(&notification);
    }

    pub(crate) fn replace_state(&mut self, state: Value) {
        self.config.component_state = state;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }
}
