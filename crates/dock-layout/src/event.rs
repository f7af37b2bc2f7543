// ABOUTME: Subscribe/emit notification hubs for containers and tree items.
// ABOUTME: Callbacks run synchronously, in subscription order, on the calling turn.

use std::fmt;

use crate::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Notifications a container sends to the content it hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerEvent {
    /// About to be hidden
    Hide,
    /// About to be shown
    Show,
    /// Visible and has a usable size
    Shown,
    /// Pixel size changed
    Resize,
    /// About to be closed
    Close,
}

/// A [`ContainerEvent`] together with the container's state at the moment it
/// was sent. `Hide` and `Show` go out before the visibility flips, `Resize`
/// after the new size is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerNotification {
    pub event: ContainerEvent,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub is_hidden: bool,
}

/// Notifications that travel up the tree from the item that raised them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutEvent {
    StateChanged,
    /// Content of a container was selected by the user
    Selection,
    TitleChanged,
    ItemDestroyed,
}

/// A [`LayoutEvent`] as seen by an ancestor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BubblingEvent {
    pub event: LayoutEvent,
    /// Item that raised the event
    pub origin: ItemId,
    /// Ancestor currently being notified
    pub current: ItemId,
}

type Callback<E> = Box<dyn FnMut(&E)>;

pub struct EventHub<E> {
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
    next_id: u64,
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription, returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
