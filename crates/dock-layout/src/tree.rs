// ABOUTME: Arena tree of root, row, column, stack and component items.
// ABOUTME: Percentage sizing, proportional resize, bubbling events and item removal.

use dock_core::{deep_merge, ItemConfig, ItemType, LayoutConfig, LayoutSettings};
use serde_json::Value;

use crate::container::{ComponentConfig, Container};
use crate::event::{BubblingEvent, ContainerEvent, EventHub, LayoutEvent, SubscriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl ItemId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Tolerance used when checking that sibling shares add up to 100
const PERCENT_EPSILON: f64 = 1e-9;

/// Per-item settings that survive serialisation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemProps {
    /// Share of the parent row's width, in percent
    pub width: Option<f64>,
    /// Share of the parent column's height, in percent
    pub height: Option<f64>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Width,
    Height,
}

impl Dimension {
    fn of(self, props: &ItemProps) -> Option<f64> {
        match self {
            Dimension::Width => props.width,
            Dimension::Height => props.height,
        }
    }

    fn set(self, props: &mut ItemProps, value: f64) {
        match self {
            Dimension::Width => props.width = Some(value),
            Dimension::Height => props.height = Some(value),
        }
    }

    fn pick<T>(self, width: T, height: T) -> T {
        match self {
            Dimension::Width => width,
            Dimension::Height => height,
        }
    }
}

#[derive(Debug)]
pub struct Item {
    kind: ItemType,
    parent: Option<ItemId>,
    content_items: Vec<ItemId>,
    props: ItemProps,
    element_size: Option<(f64, f64)>,
    active_item: Option<ItemId>,
    container: Option<Container>,
    events: EventHub<BubblingEvent>,
}

impl Item {
    fn new(kind: ItemType, parent: Option<ItemId>, props: ItemProps) -> Self {
        Self {
            kind,
            parent,
            content_items: Vec::new(),
            props,
            element_size: None,
            active_item: None,
            container: None,
            events: EventHub::new(),
        }
    }

    pub fn kind(&self) -> ItemType {
        self.kind
    }

    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    pub fn content_items(&self) -> &[ItemId] {
        &self.content_items
    }

    pub fn props(&self) -> &ItemProps {
        &self.props
    }

    /// Pixel size from the last layout pass
    pub fn element_size(&self) -> Option<(f64, f64)> {
        self.element_size
    }

    /// Visible child of a stack
    pub fn active_item(&self) -> Option<ItemId> {
        self.active_item
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    /// Which sibling share a row or column distributes
    fn dimension(&self) -> Option<Dimension> {
        match self.kind {
            ItemType::Row => Some(Dimension::Width),
            ItemType::Column => Some(Dimension::Height),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Item {0:?} does not exist")]
    MissingItem(ItemId),

    #[error("Item {0:?} is not a component")]
    NotAComponent(ItemId),

    #[error("Item {0:?} is not a stack")]
    NotAStack(ItemId),

    #[error("Item {child:?} is not a child of {parent:?}")]
    NotAChild { parent: ItemId, child: ItemId },

    #[error("Item {0:?} cannot hold children")]
    CannotHoldChildren(ItemId),

    #[error("Component configs cannot have content")]
    ComponentWithContent,

    #[error("A root item can only be the top of a layout")]
    NestedRoot,

    #[error("The root can hold only one item")]
    RootOccupied,

    #[error("The root item cannot be closed")]
    CannotCloseRoot,
}

#[derive(Debug)]
pub struct LayoutTree {
    items: Vec<Option<Item>>,
    /// Vacated slots, reused before the arena grows
    free: Vec<ItemId>,
    root: ItemId,
    settings: LayoutSettings,
}

impl LayoutTree {
    /// Create a tree holding only an empty root
    pub fn new(settings: LayoutSettings) -> Self {
        Self {
            items: vec![Some(Item::new(ItemType::Root, None, ItemProps::default()))],
            free: Vec::new(),
            root: ItemId(0),
            settings,
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Result<Self, LayoutError> {
        let mut tree = Self::new(config.settings.clone());
        if config.content.len() > 1 {
            return Err(LayoutError::RootOccupied);
        }
        for item in &config.content {
            let root = tree.root;
            tree.build(root, item)?;
        }
        Ok(tree)
    }

    /// Snapshot of the current tree, including container state
    pub fn to_config(&self) -> LayoutConfig {
        LayoutConfig {
            settings: self.settings.clone(),
            content: self
                .content_items(self.root)
                .iter()
                .filter_map(|&child| self.item_config(child))
                .collect(),
        }
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn item(&self, id: ItemId) -> Result<&Item, LayoutError> {
        self.get(id).ok_or(LayoutError::MissingItem(id))
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, LayoutError> {
        self.get_mut(id).ok_or(LayoutError::MissingItem(id))
    }

    fn kind(&self, id: ItemId) -> Option<ItemType> {
        self.get(id).map(|item| item.kind)
    }

    pub fn is_root(&self, id: ItemId) -> bool {
        self.kind(id) == Some(ItemType::Root)
    }

    pub fn is_row(&self, id: ItemId) -> bool {
        self.kind(id) == Some(ItemType::Row)
    }

    pub fn is_column(&self, id: ItemId) -> bool {
        self.kind(id) == Some(ItemType::Column)
    }

    pub fn is_stack(&self, id: ItemId) -> bool {
        self.kind(id) == Some(ItemType::Stack)
    }

    pub fn is_component(&self, id: ItemId) -> bool {
        self.kind(id) == Some(ItemType::Component)
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.get(id).and_then(|item| item.parent)
    }

    pub fn content_items(&self, id: ItemId) -> &[ItemId] {
        self.get(id).map(|item| item.content_items()).unwrap_or(&[])
    }

    pub fn props(&self, id: ItemId) -> Option<&ItemProps> {
        self.get(id).map(|item| &item.props)
    }

    pub fn props_mut(&mut self, id: ItemId) -> Option<&mut ItemProps> {
        self.get_mut(id).map(|item| &mut item.props)
    }

    pub fn container(&self, id: ItemId) -> Option<&Container> {
        self.get(id).and_then(|item| item.container.as_ref())
    }

    pub fn container_mut(&mut self, id: ItemId) -> Option<&mut Container> {
        self.get_mut(id).and_then(|item| item.container.as_mut())
    }

    fn container_or_err(&mut self, id: ItemId) -> Result<&mut Container, LayoutError> {
        let item = self.item_mut(id)?;
        item.container.as_mut().ok_or(LayoutError::NotAComponent(id))
    }

    /// All component items, in tree order
    pub fn components(&self) -> Vec<ItemId> {
        let mut result = Vec::new();
        self.collect_components(self.root, &mut result);
        result
    }

    fn collect_components(&self, id: ItemId, out: &mut Vec<ItemId>) {
        if self.is_component(id) {
            out.push(id);
        }
        for &child in self.content_items(id) {
            self.collect_components(child, out);
        }
    }

    /// Insert `config` as a child of `parent`, at `index` or at the end
    pub fn add_child(
        &mut self,
        parent: ItemId,
        config: &ItemConfig,
        index: Option<usize>,
    ) -> Result<ItemId, LayoutError> {
        let parent_item = self.item(parent)?;
        match parent_item.kind {
            ItemType::Component => return Err(LayoutError::CannotHoldChildren(parent)),
            ItemType::Root if !parent_item.content_items.is_empty() => {
                return Err(LayoutError::RootOccupied)
            }
            _ => {}
        }
        let dimension = parent_item.dimension();
        let sibling_count = parent_item.content_items.len();

        let child = self.build_detached(parent, config)?;

        // New row/column members take an equal share; existing ones shrink to fit
        if let Some(dimension) = dimension {
            let share = dimension
                .of(&self.item(child)?.props)
                .unwrap_or(100.0 / (sibling_count + 1) as f64);
            let siblings = self.content_items(parent).to_vec();
            for sibling in siblings {
                if let Some(props) = self.props_mut(sibling) {
                    if let Some(current) = dimension.of(props) {
                        dimension.set(props, current * (100.0 - share) / 100.0);
                    }
                }
            }
            if let Some(props) = self.props_mut(child) {
                dimension.set(props, share);
            }
        }

        let parent_item = self.item_mut(parent)?;
        let index = index
            .unwrap_or(parent_item.content_items.len())
            .min(parent_item.content_items.len());
        parent_item.content_items.insert(index, child);

        if self.is_stack(parent) {
            self.activate(parent, child);
        }

        tracing::debug!("Added {:?} to {:?} at index {}", child, parent, index);
        self.call_downwards_set_size(parent);
        self.emit_bubbling_event(parent, LayoutEvent::StateChanged);
        Ok(child)
    }

    fn build(&mut self, parent: ItemId, config: &ItemConfig) -> Result<ItemId, LayoutError> {
        let child = self.build_detached(parent, config)?;
        self.item_mut(parent)?.content_items.push(child);
        Ok(child)
    }

    /// Create the subtree for `config` with its parent link set, but not yet
    /// listed among the parent's content items
    fn build_detached(&mut self, parent: ItemId, config: &ItemConfig) -> Result<ItemId, LayoutError> {
        match config.item_type {
            ItemType::Root => return Err(LayoutError::NestedRoot),
            ItemType::Component if !config.content.is_empty() => {
                return Err(LayoutError::ComponentWithContent)
            }
            _ => {}
        }

        let id = self.allocate();
        let props = ItemProps {
            width: config.width,
            height: config.height,
            title: config.title.clone(),
        };
        let mut item = Item::new(config.item_type, Some(parent), props);
        if config.item_type == ItemType::Component {
            let mut container = Container::new(
                ComponentConfig {
                    component_name: config.component_name.clone().unwrap_or_default(),
                    is_closable: config.is_closable,
                    component_state: config.component_state.clone(),
                },
                id,
            );
            container.set_title(config.display_title());
            item.container = Some(container);
        }
        self.items[id.index()] = Some(item);

        for child in &config.content {
            self.build(id, child)?;
        }

        if config.item_type == ItemType::Stack {
            let children = self.content_items(id).to_vec();
            if !children.is_empty() {
                let active_index = config.active_item_index.unwrap_or(0).min(children.len() - 1);
                for (i, &child) in children.iter().enumerate() {
                    if i != active_index {
                        self.set_subtree_hidden(child, true);
                    }
                }
                self.item_mut(id)?.active_item = Some(children[active_index]);
            }
        }

        Ok(id)
    }

    fn item_config(&self, id: ItemId) -> Option<ItemConfig> {
        let item = self.get(id)?;
        let content: Vec<ItemConfig> = item
            .content_items
            .iter()
            .filter_map(|&child| self.item_config(child))
            .collect();
        let active_item_index = item
            .active_item
            .and_then(|active| item.content_items.iter().position(|&c| c == active));

        let mut config = match &item.container {
            Some(container) => {
                let component = container.config();
                ItemConfig::component(component.component_name.clone())
                    .closable(component.is_closable)
                    .with_state(component.component_state.clone())
            }
            None => match item.kind {
                ItemType::Row => ItemConfig::row(content),
                ItemType::Column => ItemConfig::column(content),
                _ => ItemConfig::stack(content),
            },
        };
        config.width = item.props.width;
        config.height = item.props.height;
        config.title = item.props.title.clone();
        config.active_item_index = active_item_index;
        Some(config)
    }

    /// Host-driven resize of the whole layout
    pub fn set_root_size(&mut self, width: f64, height: f64) {
        let root = self.root;
        if let Some(item) = self.get_mut(root) {
            item.element_size = Some((width, height));
        }
        self.call_downwards_set_size(root);
    }

    /// Recompute pixel sizes for `id` and everything below it
    pub fn call_downwards_set_size(&mut self, id: ItemId) {
        let Some(item) = self.get(id) else {
            return;
        };
        let Some((width, height)) = item.element_size else {
            return;
        };
        let kind = item.kind;
        let dimension = item.dimension();
        let children = item.content_items.clone();

        match kind {
            ItemType::Component => {
                if let Some(container) = self.container_mut(id) {
                    container.set_pixel_size(width, height);
                }
                return;
            }
            ItemType::Root => {
                for &child in &children {
                    self.set_element_size(child, width, height);
                }
            }
            ItemType::Stack => {
                let inner_height = (height - self.settings.stack_header_height()).max(0.0);
                for &child in &children {
                    self.set_element_size(child, width, inner_height);
                }
            }
            ItemType::Row | ItemType::Column => {
                self.calculate_relative_sizes(id);
                if let Some(dimension) = dimension {
                    let span = dimension.pick(width, height);
                    for &child in &children {
                        let share = self
                            .props(child)
                            .and_then(|props| dimension.of(props))
                            .unwrap_or(0.0);
                        let size = span * share / 100.0;
                        match dimension {
                            Dimension::Width => self.set_element_size(child, size, height),
                            Dimension::Height => self.set_element_size(child, width, size),
                        }
                    }
                }
            }
        }

        for child in children {
            self.call_downwards_set_size(child);
        }
    }

    fn set_element_size(&mut self, id: ItemId, width: f64, height: f64) {
        if let Some(item) = self.get_mut(id) {
            item.element_size = Some((width, height));
        }
    }

    /// Give row/column members without a share the leftover, then scale all
    /// shares so they add up to 100
    fn calculate_relative_sizes(&mut self, id: ItemId) {
        if let Some((dimension, shares)) = self.relative_shares(id) {
            self.write_shares(dimension, &shares);
        }
    }

    /// Normalised shares of a row or column's members, without storing them
    fn relative_shares(&self, id: ItemId) -> Option<(Dimension, Vec<(ItemId, f64)>)> {
        let dimension = self.get(id).and_then(Item::dimension)?;
        let children = self.content_items(id);
        if children.is_empty() {
            return None;
        }

        let current: Vec<Option<f64>> = children
            .iter()
            .map(|&child| self.props(child).and_then(|props| dimension.of(props)))
            .collect();
        let total: f64 = current.iter().flatten().sum();
        let without_share = current.iter().filter(|share| share.is_none()).count();
        let fill = if without_share == 0 {
            0.0
        } else if total < 100.0 {
            (100.0 - total) / without_share as f64
        } else {
            100.0 / children.len() as f64
        };

        let filled: Vec<f64> = current.iter().map(|share| share.unwrap_or(fill)).collect();
        let total: f64 = filled.iter().sum();
        let even = 100.0 / children.len() as f64;
        let shares = children
            .iter()
            .zip(filled)
            .map(|(&child, share)| {
                let share = if (total - 100.0).abs() <= PERCENT_EPSILON {
                    share
                } else if total > 0.0 {
                    share / total * 100.0
                } else {
                    even
                };
                (child, share)
            })
            .collect();
        Some((dimension, shares))
    }

    fn write_shares(&mut self, dimension: Dimension, shares: &[(ItemId, f64)]) {
        for &(child, share) in shares {
            if let Some(props) = self.props_mut(child) {
                dimension.set(props, share);
            }
        }
    }

    /// Resize a container from within by adjusting the shares of its nearest
    /// row or column ancestor.
    ///
    /// Returns false, leaving every share untouched, when the container has
    /// no row or column above it or the ancestor's span cannot be determined.
    pub fn set_size(&mut self, id: ItemId, width: f64, height: f64) -> bool {
        let Some(container) = self.container(id) else {
            return false;
        };
        let (current_width, current_height) = (container.width(), container.height());

        let mut row_or_column_child = id;
        let mut row_or_column = container.parent();
        while !self.is_row(row_or_column) && !self.is_column(row_or_column) {
            row_or_column_child = row_or_column;
            row_or_column = match self.parent(row_or_column) {
                Some(parent) => parent,
                None => return false,
            };
            if self.is_root(row_or_column) {
                tracing::debug!("No row or column above {:?}, resize ignored", id);
                return false;
            }
        }

        let Some((dimension, mut shares)) = self.relative_shares(row_or_column) else {
            return false;
        };
        let new_size = dimension.pick(width, height);
        let old_percentage = shares
            .iter()
            .find(|(child, _)| *child == row_or_column_child)
            .map(|&(_, share)| share)
            .unwrap_or(0.0);
        let current_pixels = dimension.pick(current_width, current_height).unwrap_or(0.0);

        // A pane squeezed to nothing cannot tell the span, the row or column can
        let inferred = current_pixels * (1.0 / (old_percentage / 100.0));
        let total_pixel = if inferred.is_finite() && inferred > 0.0 {
            inferred
        } else {
            self.get(row_or_column)
                .and_then(Item::element_size)
                .map(|(w, h)| dimension.pick(w, h))
                .unwrap_or(0.0)
        };
        if !total_pixel.is_finite() || total_pixel <= 0.0 || !new_size.is_finite() {
            tracing::warn!(
                "Cannot resize {:?}: span of {:?} is unknown ({} px at {}%)",
                id,
                row_or_column,
                current_pixels,
                old_percentage
            );
            return false;
        }
        let percentage = (new_size / total_pixel) * 100.0;

        if shares.len() == 1 {
            shares[0].1 = 100.0;
        } else {
            let delta = (old_percentage - percentage) / (shares.len() - 1) as f64;
            for (sibling, share) in shares.iter_mut() {
                if *sibling == row_or_column_child {
                    *share = percentage;
                } else {
                    *share += delta;
                }
            }
        }
        self.write_shares(dimension, &shares);

        self.call_downwards_set_size(row_or_column);
        true
    }

    /// Deliver `event` to `from` and every ancestor up to the root
    pub fn emit_bubbling_event(&mut self, from: ItemId, event: LayoutEvent) {
        let mut current = Some(from);
        while let Some(id) = current {
            let Some(item) = self.get_mut(id) else {
                break;
            };
            item.events.emit(&BubblingEvent {
                event,
                origin: from,
                current: id,
            });
            current = item.parent;
        }
    }

    pub fn on_item_event(
        &mut self,
        id: ItemId,
        callback: impl FnMut(&BubblingEvent) + 'static,
    ) -> Result<SubscriptionId, LayoutError> {
        Ok(self.item_mut(id)?.events.subscribe(callback))
    }

    pub fn off_item_event(&mut self, id: ItemId, subscription: SubscriptionId) -> bool {
        self.get_mut(id)
            .map(|item| item.events.unsubscribe(subscription))
            .unwrap_or(false)
    }

    /// Close the container of component `id`, if it is closable
    pub fn close_container(&mut self, id: ItemId) -> Result<(), LayoutError> {
        let container = self.container_or_err(id)?;
        if !container.config().is_closable {
            return Ok(());
        }
        container.notify(ContainerEvent::Close);
        let item = container.parent();
        self.close_item(item)
    }

    /// Remove `id` from its parent, letting the parent restructure
    pub fn close_item(&mut self, id: ItemId) -> Result<(), LayoutError> {
        let parent = self.item(id)?.parent.ok_or(LayoutError::CannotCloseRoot)?;
        self.remove_child(parent, id)
    }

    pub fn get_state(&self, id: ItemId) -> Option<&Value> {
        self.container(id).map(Container::get_state)
    }

    /// Merge `partial` into the container's state, then store the result
    pub fn extend_state(&mut self, id: ItemId, partial: &Value) -> Result<(), LayoutError> {
        let mut state = self.container_or_err(id)?.get_state().clone();
        deep_merge(&mut state, partial);
        self.set_state(id, state)
    }

    /// Replace the container's state and let the tree know about it
    pub fn set_state(&mut self, id: ItemId, state: Value) -> Result<(), LayoutError> {
        let container = self.container_or_err(id)?;
        container.replace_state(state);
        let item = container.parent();
        self.emit_bubbling_event(item, LayoutEvent::StateChanged);
        Ok(())
    }

    /// Title requests from a container go through its component item
    pub fn set_container_title(&mut self, id: ItemId, title: &str) -> Result<(), LayoutError> {
        let item = self.container_or_err(id)?.parent();
        self.set_item_title(item, title)
    }

    pub fn set_item_title(&mut self, id: ItemId, title: &str) -> Result<(), LayoutError> {
        let item = self.item_mut(id)?;
        item.props.title = Some(title.to_string());
        if let Some(container) = item.container.as_mut() {
            container.set_title(title.to_string());
        }
        self.emit_bubbling_event(id, LayoutEvent::TitleChanged);
        self.emit_bubbling_event(id, LayoutEvent::StateChanged);
        Ok(())
    }

    /// The user picked the content of this container
    pub fn select_container(&mut self, id: ItemId) -> Result<(), LayoutError> {
        let item = self.container_or_err(id)?.parent();
        self.emit_bubbling_event(item, LayoutEvent::Selection);
        Ok(())
    }

    /// Make `child` the visible item of `stack`
    pub fn set_active_content_item(&mut self, stack: ItemId, child: ItemId) -> Result<(), LayoutError> {
        let item = self.item(stack)?;
        if item.kind != ItemType::Stack {
            return Err(LayoutError::NotAStack(stack));
        }
        if !item.content_items.contains(&child) {
            return Err(LayoutError::NotAChild { parent: stack, child });
        }
        if item.active_item == Some(child) {
            return Ok(());
        }
        self.activate(stack, child);
        self.emit_bubbling_event(stack, LayoutEvent::StateChanged);
        Ok(())
    }

    fn activate(&mut self, stack: ItemId, child: ItemId) {
        let previous = self.get(stack).and_then(|item| item.active_item);
        if previous == Some(child) {
            return;
        }
        if let Some(previous) = previous {
            self.set_subtree_hidden(previous, true);
        }
        if let Some(item) = self.get_mut(stack) {
            item.active_item = Some(child);
        }
        self.set_subtree_hidden(child, false);
    }

    /// Hide or show the containers in a subtree, following only the active
    /// item of nested stacks
    fn set_subtree_hidden(&mut self, id: ItemId, hidden: bool) {
        let Some(item) = self.get_mut(id) else {
            return;
        };
        if let Some(container) = item.container.as_mut() {
            if hidden {
                container.hide();
            } else {
                container.show();
            }
            return;
        }
        let children = match (item.kind, item.active_item) {
            (ItemType::Stack, Some(active)) => vec![active],
            _ => item.content_items.clone(),
        };
        for child in children {
            self.set_subtree_hidden(child, hidden);
        }
    }

    /// Destroy `child` and restructure `parent` around the gap
    pub fn remove_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), LayoutError> {
        let survivor = self.detach(parent, child)?;
        tracing::info!("Removed {:?} from {:?}", child, parent);
        self.call_downwards_set_size(survivor);
        self.emit_bubbling_event(survivor, LayoutEvent::StateChanged);
        Ok(())
    }

    /// Returns the closest item still in the tree whose layout changed
    fn detach(&mut self, parent: ItemId, child: ItemId) -> Result<ItemId, LayoutError> {
        let parent_item = self.item(parent)?;
        let index = parent_item
            .content_items
            .iter()
            .position(|&c| c == child)
            .ok_or(LayoutError::NotAChild { parent, child })?;
        let kind = parent_item.kind;
        let dimension = parent_item.dimension();
        let was_active = parent_item.active_item == Some(child);

        self.emit_bubbling_event(child, LayoutEvent::ItemDestroyed);
        let removed_share = dimension.and_then(|d| self.props(child).and_then(|props| d.of(props)));
        self.destroy_subtree(child);

        let parent_item = self.item_mut(parent)?;
        parent_item.content_items.remove(index);
        if was_active {
            parent_item.active_item = None;
        }
        let remaining = parent_item.content_items.clone();

        match kind {
            ItemType::Row | ItemType::Column => {
                if remaining.is_empty() {
                    return self.detach_from_parent(parent);
                }
                if let (Some(dimension), Some(share)) = (dimension, removed_share) {
                    let extra = share / remaining.len() as f64;
                    for &sibling in &remaining {
                        if let Some(props) = self.props_mut(sibling) {
                            if let Some(current) = dimension.of(props) {
                                dimension.set(props, current + extra);
                            }
                        }
                    }
                }
                if remaining.len() == 1 {
                    return self.collapse(parent);
                }
                Ok(parent)
            }
            ItemType::Stack => {
                if remaining.is_empty() {
                    return self.detach_from_parent(parent);
                }
                if was_active {
                    let next = remaining[index.min(remaining.len() - 1)];
                    self.activate(parent, next);
                }
                Ok(parent)
            }
            _ => Ok(parent),
        }
    }

    fn detach_from_parent(&mut self, id: ItemId) -> Result<ItemId, LayoutError> {
        match self.parent(id) {
            Some(parent) => self.detach(parent, id),
            None => Ok(id),
        }
    }

    /// Replace a row or column holding a single item with that item, which
    /// takes over the row or column's own sizing
    fn collapse(&mut self, id: ItemId) -> Result<ItemId, LayoutError> {
        let Some(grandparent) = self.parent(id) else {
            return Ok(id);
        };
        let item = self.item(id)?;
        let only = item.content_items[0];
        let props = item.props.clone();

        let slot = self.item_mut(grandparent)?;
        for c in slot.content_items.iter_mut() {
            if *c == id {
                *c = only;
            }
        }
        if slot.active_item == Some(id) {
            slot.active_item = Some(only);
        }

        let only_item = self.item_mut(only)?;
        only_item.parent = Some(grandparent);
        only_item.props.width = props.width;
        only_item.props.height = props.height;

        self.release(id);
        tracing::debug!("Collapsed {:?} into {:?}", id, only);
        Ok(grandparent)
    }

    fn destroy_subtree(&mut self, id: ItemId) {
        let children = self.content_items(id).to_vec();
        for child in children {
            self.destroy_subtree(child);
        }
        self.release(id);
    }

    /// Reserve a slot for a new item. Ids of removed items are handed out
    /// again, so ids held past removal may name a different item later.
    fn allocate(&mut self) -> ItemId {
        match self.free.pop() {
            Some(id) => id,
            None => {
                self.items.push(None);
                ItemId((self.items.len() - 1) as u64)
            }
        }
    }

    fn release(&mut self, id: ItemId) {
        if let Some(slot) = self.items.get_mut(id.index()) {
            if slot.take().is_some() {
                self.free.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn share(tree: &LayoutTree, id: ItemId, dimension: Dimension) -> f64 {
        dimension.of(tree.props(id).unwrap()).unwrap()
    }

    fn sum_of_shares(tree: &LayoutTree, parent: ItemId, dimension: Dimension) -> f64 {
        tree.content_items(parent)
            .iter()
            .map(|&child| share(tree, child, dimension))
            .sum()
    }

    fn three_stack_row() -> (LayoutTree, ItemId, Vec<ItemId>) {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::stack(vec![ItemConfig::component("a")]).with_width(50.0),
            ItemConfig::stack(vec![ItemConfig::component("b")]).with_width(30.0),
            ItemConfig::stack(vec![ItemConfig::component("c")]).with_width(20.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(1000.0, 500.0);
        let row = tree.content_items(tree.root())[0];
        let components = tree.components();
        (tree, row, components)
    }

    fn record_layout_events(tree: &mut LayoutTree, id: ItemId) -> Rc<RefCell<Vec<BubblingEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        tree.on_item_event(id, move |e| sink.borrow_mut().push(*e)).unwrap();
        events
    }

    #[test]
    fn layout_pass_assigns_pixel_sizes() {
        let (tree, row, components) = three_stack_row();
        let stacks = tree.content_items(row);

        assert_eq!(tree.get(stacks[0]).unwrap().element_size(), Some((500.0, 500.0)));
        assert_eq!(tree.get(stacks[2]).unwrap().element_size(), Some((200.0, 500.0)));

        let a = tree.container(components[0]).unwrap();
        assert_eq!(a.width(), Some(500.0));
        assert_eq!(a.height(), Some(480.0));
    }

    #[test]
    fn set_size_redistributes_evenly_across_siblings() {
        let (mut tree, row, components) = three_stack_row();
        let stacks = tree.content_items(row).to_vec();

        assert!(tree.set_size(components[0], 400.0, 480.0));

        assert!(approx(share(&tree, stacks[0], Dimension::Width), 40.0));
        assert!(approx(share(&tree, stacks[1], Dimension::Width), 35.0));
        assert!(approx(share(&tree, stacks[2], Dimension::Width), 25.0));
        assert!(approx(sum_of_shares(&tree, row, Dimension::Width), 100.0));
        assert!(approx(tree.container(components[0]).unwrap().width().unwrap(), 400.0));
        assert!(approx(tree.container(components[1]).unwrap().width().unwrap(), 350.0));
    }

    #[test]
    fn set_size_in_column_uses_height() {
        let config = LayoutConfig::new(vec![ItemConfig::column(vec![
            ItemConfig::component("top").with_height(60.0),
            ItemConfig::component("bottom").with_height(40.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(800.0, 1000.0);
        let column = tree.content_items(tree.root())[0];
        let components = tree.components();

        assert!(tree.set_size(components[0], 800.0, 300.0));

        assert!(approx(share(&tree, components[0], Dimension::Height), 30.0));
        assert!(approx(share(&tree, components[1], Dimension::Height), 70.0));
        assert!(approx(sum_of_shares(&tree, column, Dimension::Height), 100.0));
        assert!(approx(tree.container(components[1]).unwrap().height().unwrap(), 700.0));
    }

    #[test]
    fn set_size_without_row_or_column_returns_false() {
        let config = LayoutConfig::new(vec![ItemConfig::stack(vec![
            ItemConfig::component("lonely").with_width(70.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(640.0, 480.0);
        let component = tree.components()[0];
        let stack = tree.parent(component).unwrap();

        assert!(!tree.set_size(component, 100.0, 100.0));
        assert_eq!(tree.props(component).unwrap().width, Some(70.0));
        assert_eq!(tree.props(stack).unwrap().width, None);

        let direct = LayoutConfig::new(vec![ItemConfig::component("direct")]);
        let mut tree = LayoutTree::from_config(&direct).unwrap();
        tree.set_root_size(640.0, 480.0);
        let component = tree.components()[0];
        assert!(!tree.set_size(component, 100.0, 100.0));
    }

    #[test]
    fn set_size_with_single_child_keeps_full_share() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![ItemConfig::stack(vec![
            ItemConfig::component("only"),
        ])])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(800.0, 600.0);
        let row = tree.content_items(tree.root())[0];
        let stack = tree.content_items(row)[0];
        let component = tree.components()[0];

        assert!(tree.set_size(component, 400.0, 580.0));

        let width = share(&tree, stack, Dimension::Width);
        assert!(width.is_finite());
        assert!(approx(width, 100.0));
        assert_eq!(tree.container(component).unwrap().width(), Some(800.0));
    }

    #[test]
    fn set_size_before_layout_is_refused() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("a"),
            ItemConfig::component("b"),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        let components = tree.components();
        assert!(!tree.set_size(components[0], 100.0, 100.0));
        assert!(!tree.set_size(ItemId(999), 100.0, 100.0));
    }

    #[test]
    fn refused_set_size_leaves_shares_alone() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("a").with_width(70.0),
            ItemConfig::component("b").with_width(70.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        let components = tree.components();

        assert!(!tree.set_size(components[0], 200.0, 100.0));
        assert_eq!(tree.props(components[0]).unwrap().width, Some(70.0));
        assert_eq!(tree.props(components[1]).unwrap().width, Some(70.0));
    }

    #[test]
    fn pane_squeezed_to_zero_can_grow_again() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("a").with_width(50.0),
            ItemConfig::component("b").with_width(50.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(1000.0, 100.0);
        let components = tree.components();

        assert!(tree.set_size(components[0], 1000.0, 100.0));
        assert!(approx(share(&tree, components[1], Dimension::Width), 0.0));
        assert!(approx(tree.container(components[1]).unwrap().width().unwrap(), 0.0));

        assert!(tree.set_size(components[1], 500.0, 100.0));
        assert!(approx(share(&tree, components[0], Dimension::Width), 50.0));
        assert!(approx(share(&tree, components[1], Dimension::Width), 50.0));
        assert!(approx(tree.container(components[1]).unwrap().width().unwrap(), 500.0));
    }

    #[test]
    fn unsized_members_share_the_remainder() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("a").with_width(40.0),
            ItemConfig::component("b"),
            ItemConfig::component("c"),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(1000.0, 100.0);
        let components = tree.components();

        assert!(approx(share(&tree, components[1], Dimension::Width), 30.0));
        assert!(approx(share(&tree, components[2], Dimension::Width), 30.0));
        assert_eq!(tree.container(components[2]).unwrap().width(), Some(300.0));
    }

    #[test]
    fn oversized_shares_are_scaled_down() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("a").with_width(100.0),
            ItemConfig::component("b").with_width(100.0),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(1000.0, 100.0);
        let components = tree.components();
        assert!(approx(share(&tree, components[0], Dimension::Width), 50.0));
        assert!(approx(share(&tree, components[1], Dimension::Width), 50.0));
    }

    #[test]
    fn stack_children_lose_header_height() {
        let mut config = LayoutConfig::new(vec![ItemConfig::stack(vec![ItemConfig::component("x")])]);
        config.settings.header_height = 30.0;
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(400.0, 300.0);
        let container = tree.container(tree.components()[0]).unwrap();
        assert_eq!(container.height(), Some(270.0));

        config.settings.has_headers = false;
        let mut tree = LayoutTree::from_config(&config).unwrap();
        tree.set_root_size(400.0, 300.0);
        let container = tree.container(tree.components()[0]).unwrap();
        assert_eq!(container.height(), Some(300.0));
    }

    #[test]
    fn stack_shows_only_active_item() {
        let mut stack = ItemConfig::stack(vec![
            ItemConfig::component("first"),
            ItemConfig::component("second"),
        ]);
        stack.active_item_index = Some(1);
        let mut tree = LayoutTree::from_config(&LayoutConfig::new(vec![stack])).unwrap();
        tree.set_root_size(400.0, 300.0);
        let components = tree.components();
        let stack = tree.parent(components[0]).unwrap();

        assert!(tree.container(components[0]).unwrap().is_hidden());
        assert!(!tree.container(components[1]).unwrap().is_hidden());

        let shown = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&shown);
        tree.container_mut(components[0])
            .unwrap()
            .on(move |n| sink.borrow_mut().push(n.event));

        tree.set_active_content_item(stack, components[0]).unwrap();
        assert!(!tree.container(components[0]).unwrap().is_hidden());
        assert!(tree.container(components[1]).unwrap().is_hidden());
        assert_eq!(*shown.borrow(), vec![ContainerEvent::Show, ContainerEvent::Shown]);

        assert_eq!(
            tree.set_active_content_item(components[0], components[1]),
            Err(LayoutError::NotAStack(components[0]))
        );
    }

    #[test]
    fn extend_state_merges_and_bubbles_each_time() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![ItemConfig::component("chart")])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        let component = tree.components()[0];
        let root = tree.root();
        let events = record_layout_events(&mut tree, root);

        tree.extend_state(component, &json!({"a": 1})).unwrap();
        tree.extend_state(component, &json!({"b": 2})).unwrap();

        assert_eq!(tree.get_state(component), Some(&json!({"a": 1, "b": 2})));
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| e.event == LayoutEvent::StateChanged && e.origin == component && e.current == root));
    }

    #[test]
    fn bubbling_reaches_every_ancestor_in_order() {
        let (mut tree, row, components) = three_stack_row();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let stack = tree.parent(components[1]).unwrap();
        for id in [components[1], stack, row, tree.root()] {
            let sink = Rc::clone(&seen);
            tree.on_item_event(id, move |e| sink.borrow_mut().push(e.current)).unwrap();
        }

        tree.select_container(components[1]).unwrap();
        assert_eq!(*seen.borrow(), vec![components[1], stack, row, tree.root()]);
    }

    #[test]
    fn container_title_goes_through_component_item() {
        let (mut tree, _, components) = three_stack_row();
        let root = tree.root();
        let events = record_layout_events(&mut tree, root);

        tree.set_container_title(components[0], "Renamed").unwrap();

        assert_eq!(tree.container(components[0]).unwrap().title(), "Renamed");
        assert_eq!(tree.props(components[0]).unwrap().title.as_deref(), Some("Renamed"));
        assert_eq!(events.borrow()[0].event, LayoutEvent::TitleChanged);
    }

    #[test]
    fn closing_spreads_share_over_remaining_siblings() {
        let (mut tree, row, components) = three_stack_row();
        let container_events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&container_events);
        tree.container_mut(components[0])
            .unwrap()
            .on(move |n| sink.borrow_mut().push(n.event));

        tree.close_container(components[0]).unwrap();

        assert_eq!(*container_events.borrow(), vec![ContainerEvent::Close]);
        assert!(tree.get(components[0]).is_none());
        let stacks = tree.content_items(row).to_vec();
        assert_eq!(stacks.len(), 2);
        assert!(approx(share(&tree, stacks[0], Dimension::Width), 55.0));
        assert!(approx(share(&tree, stacks[1], Dimension::Width), 45.0));
        assert_eq!(tree.container(components[1]).unwrap().width(), Some(550.0));
    }

    #[test]
    fn removed_items_announce_their_own_destruction() {
        let (mut tree, _, components) = three_stack_row();
        let root = tree.root();
        let stack = tree.parent(components[0]).unwrap();
        let events = record_layout_events(&mut tree, root);

        tree.close_container(components[0]).unwrap();

        let destroyed: Vec<_> = events
            .borrow()
            .iter()
            .filter(|e| e.event == LayoutEvent::ItemDestroyed)
            .map(|e| (e.origin, e.current))
            .collect();
        assert_eq!(destroyed, vec![(components[0], root), (stack, root)]);
    }

    #[test]
    fn slots_of_removed_items_are_reused() {
        let (mut tree, row, _) = three_stack_row();
        let first = tree
            .add_child(row, &ItemConfig::component("scratch"), None)
            .unwrap();
        let slots = tree.items.len();

        for _ in 0..5 {
            let last = *tree.components().last().unwrap();
            tree.close_container(last).unwrap();
            let added = tree
                .add_child(row, &ItemConfig::component("scratch"), None)
                .unwrap();
            assert_eq!(added, first);
        }

        assert_eq!(tree.items.len(), slots);
        assert_eq!(tree.components().len(), 4);
    }

    #[test]
    fn closing_down_to_one_child_collapses_row() {
        let (mut tree, row, components) = three_stack_row();
        let root = tree.root();
        let remaining_stack = tree.parent(components[2]).unwrap();

        tree.close_container(components[0]).unwrap();
        tree.close_container(components[1]).unwrap();

        assert!(tree.get(row).is_none());
        assert_eq!(tree.content_items(root), &[remaining_stack]);
        assert_eq!(tree.parent(remaining_stack), Some(root));
        assert_eq!(tree.container(components[2]).unwrap().width(), Some(1000.0));
        assert_eq!(tree.components(), vec![components[2]]);
    }

    #[test]
    fn closing_active_tab_activates_neighbour() {
        let config = LayoutConfig::new(vec![ItemConfig::stack(vec![
            ItemConfig::component("one"),
            ItemConfig::component("two"),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        let components = tree.components();
        assert!(tree.container(components[1]).unwrap().is_hidden());

        tree.close_container(components[0]).unwrap();

        let stack = tree.parent(components[1]).unwrap();
        assert_eq!(tree.get(stack).unwrap().active_item(), Some(components[1]));
        assert!(!tree.container(components[1]).unwrap().is_hidden());
    }

    #[test]
    fn unclosable_container_ignores_close() {
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("pinned").closable(false),
            ItemConfig::component("other"),
        ])]);
        let mut tree = LayoutTree::from_config(&config).unwrap();
        let pinned = tree.components()[0];

        tree.close_container(pinned).unwrap();
        assert!(tree.container(pinned).is_some());
        assert_eq!(tree.components().len(), 2);
    }

    #[test]
    fn add_child_takes_equal_share() {
        let (mut tree, row, _) = three_stack_row();
        let added = tree
            .add_child(row, &ItemConfig::component("new"), Some(1))
            .unwrap();

        assert_eq!(tree.content_items(row)[1], added);
        assert!(approx(share(&tree, added, Dimension::Width), 25.0));
        assert!(approx(sum_of_shares(&tree, row, Dimension::Width), 100.0));
        assert_eq!(tree.container(added).unwrap().width(), Some(250.0));

        let component = tree.components()[0];
        assert_eq!(
            tree.add_child(component, &ItemConfig::component("x"), None),
            Err(LayoutError::CannotHoldChildren(component))
        );
        let root = tree.root();
        assert_eq!(
            tree.add_child(root, &ItemConfig::component("x"), None),
            Err(LayoutError::RootOccupied)
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut component = ItemConfig::component("x");
        component.content.push(ItemConfig::component("y"));
        assert_eq!(
            LayoutTree::from_config(&LayoutConfig::new(vec![component])).unwrap_err(),
            LayoutError::ComponentWithContent
        );

        let mut nested = ItemConfig::row(Vec::new());
        nested.item_type = ItemType::Root;
        assert_eq!(
            LayoutTree::from_config(&LayoutConfig::new(vec![nested])).unwrap_err(),
            LayoutError::NestedRoot
        );

        let two = LayoutConfig::new(vec![ItemConfig::component("a"), ItemConfig::component("b")]);
        assert_eq!(LayoutTree::from_config(&two).unwrap_err(), LayoutError::RootOccupied);
    }

    #[test]
    fn config_snapshot_preserves_structure_and_state() {
        let mut stack = ItemConfig::stack(vec![
            ItemConfig::component("log").closable(false),
            ItemConfig::component("chart")
                .with_title("CPU")
                .with_state(json!({"series": ["user", "system"]})),
        ])
        .with_width(40.0);
        stack.active_item_index = Some(1);
        let config = LayoutConfig::new(vec![ItemConfig::row(vec![
            ItemConfig::component("editor").with_width(60.0),
            stack,
        ])]);

        let mut tree = LayoutTree::from_config(&config).unwrap();
        assert_eq!(tree.to_config(), config);

        let editor = tree.components()[0];
        tree.set_state(editor, json!({"file": "main.rs"})).unwrap();
        let snapshot = tree.to_config();
        assert_eq!(snapshot.content[0].content[0].component_state, json!({"file": "main.rs"}));
    }
}
