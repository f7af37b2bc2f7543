// ABOUTME: Docking pane layout for dock-layout hosts.
// ABOUTME: Rows, columns and stacks of containers sized by percentage shares.

mod container;
mod event;
mod tree;

pub use container::{ComponentConfig, Container, ContentSurface};
pub use event::{
    BubblingEvent, ContainerEvent, ContainerNotification, EventHub, LayoutEvent, SubscriptionId,
};
pub use tree::{Item, ItemId, ItemProps, LayoutError, LayoutTree};
