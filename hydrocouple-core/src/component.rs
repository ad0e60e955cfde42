//! The capability interface every participant of a composition implements.
//!
//! Components are shared between the group that owns them and the links that reference them,
//! so they are held behind an `Arc<RwLock<_>>`. Links only keep weak references which means a
//! component is dropped as soon as its owning group lets go of it.

use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::ExchangeItem;
use crate::link::{Link, LinkId};
use crate::time::{Instant, Time, TimeHorizon};
use crate::values::ValueSet;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Identifier of a component within a composition.
pub type ComponentId = String;

/// Free form initialisation arguments.
pub type Arguments = HashMap<String, String>;

/// A component shared between a group and the links that reference it.
pub type SharedComponent = Arc<RwLock<dyn LinkableComponent>>;

/// A non-owning reference to a shared component.
pub type WeakComponent = Weak<RwLock<dyn LinkableComponent>>;

/// Wrap a component so that it can be added to a group and referenced by links.
pub fn into_shared<C: LinkableComponent + 'static>(component: C) -> SharedComponent {
    Arc::new(RwLock::new(component))
}

/// A component that can be wired into a pull-driven computation graph.
///
/// The exchange item accessors take `&mut self` because aggregating components, such as
/// groups, lazily rebuild their exposed items when they are queried.
pub trait LinkableComponent: Send + Sync + Debug {
    /// Unique identifier of the component.
    fn component_id(&self) -> &str;

    /// Human readable name, defaults to the identifier.
    fn caption(&self) -> &str {
        self.component_id()
    }

    fn initialize(&mut self, _arguments: &Arguments) -> CouplingResult<()> {
        Ok(())
    }

    /// Called once before the first time step.
    fn prepare(&mut self) -> CouplingResult<()> {
        Ok(())
    }

    /// Values for the link's source item at the requested time.
    ///
    /// Called by the consumer at the other end of the link.
    fn get_values(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet>;

    /// Notification that a link now references one of this component's items.
    fn add_link(&mut self, link: Link) -> CouplingResult<()>;

    /// Notification that a link no longer exists.
    fn remove_link(&mut self, link_id: &str);

    /// Called once after the last time step.
    fn finish(&mut self) -> CouplingResult<()> {
        Ok(())
    }

    fn input_exchange_item_count(&mut self) -> usize;

    fn input_exchange_item(&mut self, index: usize) -> Option<ExchangeItem>;

    fn output_exchange_item_count(&mut self) -> usize;

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem>;

    fn input_exchange_items(&mut self) -> Vec<ExchangeItem> {
        (0..self.input_exchange_item_count())
            .filter_map(|index| self.input_exchange_item(index))
            .collect()
    }

    fn output_exchange_items(&mut self) -> Vec<ExchangeItem> {
        (0..self.output_exchange_item_count())
            .filter_map(|index| self.output_exchange_item(index))
            .collect()
    }

    /// The span of time this component can provide values for, if bounded.
    fn time_horizon(&self) -> Option<TimeHorizon> {
        None
    }

    /// The earliest time this component may still request input values for.
    ///
    /// Producers may discard buffered values before this time.
    fn earliest_input_time(&self) -> Option<Instant> {
        None
    }

    /// Diagnostics about the component's configuration. Empty if valid.
    fn validate(&mut self) -> String {
        String::new()
    }
}

/// Acquire a shared read lock on a component.
pub fn read_component(
    component: &SharedComponent,
) -> CouplingResult<RwLockReadGuard<'_, dyn LinkableComponent + 'static>> {
    component
        .read()
        .map_err(|e| CouplingError::LockPoisoned(e.into_inner().component_id().to_string()))
}

/// Acquire an exclusive lock on a component.
pub fn write_component(
    component: &SharedComponent,
) -> CouplingResult<RwLockWriteGuard<'_, dyn LinkableComponent + 'static>> {
    component
        .write()
        .map_err(|e| CouplingError::LockPoisoned(e.into_inner().component_id().to_string()))
}

/// The links attached to a component.
///
/// A small helper for component implementations which need to remember the links they were
/// told about in [`LinkableComponent::add_link`].
#[derive(Debug, Clone, Default)]
pub struct ComponentLinks {
    links: Vec<Link>,
}

impl ComponentLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link, replacing any link with the same id.
    pub fn add(&mut self, link: Link) {
        match self.links.iter_mut().find(|l| l.id() == link.id()) {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
    }

    pub fn remove(&mut self, link_id: &str) -> Option<Link> {
        let position = self.links.iter().position(|l| l.id() == link_id)?;
        Some(self.links.remove(position))
    }

    pub fn get(&self, link_id: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.id() == link_id)
    }

    pub fn contains(&self, link_id: &str) -> bool {
        self.get(link_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn ids(&self) -> Vec<LinkId> {
        self.links.iter().map(|l| l.id().to_string()).collect()
    }

    /// Links whose target item is owned by the given component.
    pub fn incoming<'a>(&'a self, component_id: &'a str) -> impl Iterator<Item = &'a Link> {
        self.links
            .iter()
            .filter(move |l| l.target_item().map(|i| i.component.as_str()) == Some(component_id))
    }

    /// The link feeding the given input item, if any.
    pub fn incoming_to(&self, item: &ExchangeItem) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.target_item().is_some_and(|target| target.same_slot(item)))
    }
}
