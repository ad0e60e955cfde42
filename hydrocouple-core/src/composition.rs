//! The top level group of a simulation, holding its triggers.

use crate::component::{
    write_component, Arguments, ComponentId, LinkableComponent, SharedComponent,
};
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::{ExchangeItem, LinkCompatibility};
use crate::group::ComponentGroup;
use crate::link::{Link, LinkId};
use crate::link_manager::LinkManager;
use crate::time::{Instant, Time, TimeHorizon};
use crate::trigger::Trigger;
use crate::values::ValueSet;
use log::{debug, info};
use std::sync::{Arc, RwLock};

/// A [`ComponentGroup`] which also keeps track of the [`Trigger`]s that drive it.
///
/// Links into a trigger adapt the trigger's input to the linked output before the usual
/// compatibility check, so a trigger can be attached to any producer.
#[derive(Debug)]
pub struct Composition {
    group: ComponentGroup,
    triggers: Vec<(ComponentId, Arc<RwLock<Trigger>>)>,
}

impl Composition {
    pub fn new(id: &str) -> Self {
        Self {
            group: ComponentGroup::new(id),
            triggers: vec![],
        }
    }

    pub fn group(&self) -> &ComponentGroup {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut ComponentGroup {
        &mut self.group
    }

    pub fn set_compatibility(&mut self, compatibility: Box<dyn LinkCompatibility>) {
        self.group.set_compatibility(compatibility);
    }

    pub fn add_component(&mut self, component: SharedComponent) -> CouplingResult<()> {
        self.group.add_component(component)
    }

    pub fn remove_component(&mut self, component_id: &str) -> CouplingResult<bool> {
        let removed = self.group.remove_component(component_id)?;
        if removed {
            self.triggers.retain(|(id, _)| id != component_id);
        }
        Ok(removed)
    }

    /// Add a trigger as a member of the composition.
    ///
    /// The returned handle gives access to the values fetched by the trigger.
    pub fn add_trigger(&mut self, trigger: Trigger) -> CouplingResult<Arc<RwLock<Trigger>>> {
        let trigger_id = trigger.component_id().to_string();
        let trigger = Arc::new(RwLock::new(trigger));
        self.group.add_component(trigger.clone())?;
        self.triggers.push((trigger_id, trigger.clone()));
        Ok(trigger)
    }

    pub fn trigger_ids(&self) -> Vec<ComponentId> {
        self.triggers.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn trigger(&self, trigger_id: &str) -> Option<Arc<RwLock<Trigger>>> {
        self.triggers
            .iter()
            .find(|(id, _)| id == trigger_id)
            .map(|(_, trigger)| trigger.clone())
    }

    fn trigger_or_err(&self, trigger_id: &str) -> CouplingResult<Arc<RwLock<Trigger>>> {
        self.trigger(trigger_id).ok_or_else(|| {
            CouplingError::Configuration(format!("Unknown trigger '{}'", trigger_id))
        })
    }

    /// Link an output of one member to an input of another.
    ///
    /// When the target is a trigger, it is adapted to `source_item`, whatever input item was
    /// requested, and detached from its previous source once the new link is in place. A
    /// rejected request leaves the trigger and its existing link untouched.
    pub fn create_link(
        &mut self,
        source_id: &str,
        source_item: &ExchangeItem,
        target_id: &str,
        target_item: &ExchangeItem,
    ) -> CouplingResult<LinkId> {
        let Some(trigger) = self.trigger(target_id) else {
            return self
                .group
                .create_link(source_id, source_item, target_id, target_item);
        };

        let (previous, adapted) = {
            let mut trigger = trigger
                .write()
                .map_err(|_| CouplingError::LockPoisoned(target_id.to_string()))?;
            let previous = trigger.input_item().clone();
            trigger.adapt_to(source_item)?;
            (previous, trigger.input_item().clone())
        };

        let link_id = match self
            .group
            .create_link(source_id, source_item, target_id, &adapted)
        {
            Ok(link_id) => link_id,
            Err(e) => {
                let mut trigger = trigger
                    .write()
                    .map_err(|_| CouplingError::LockPoisoned(target_id.to_string()))?;
                trigger.set_input_item(previous);
                return Err(e);
            }
        };

        let stale: Vec<LinkId> = self
            .group
            .link_manager()
            .links()
            .iter()
            .filter(|l| l.id() != link_id)
            .filter(|l| l.target().is_some_and(|t| t.component_id() == target_id))
            .map(|l| l.id().to_string())
            .collect();
        for id in stale.iter() {
            debug!("Detaching trigger '{}' from link '{}'", target_id, id);
            self.group.destroy_link(id)?;
        }
        Ok(link_id)
    }

    /// Link two members by the ids of the exchanged quantities.
    ///
    /// For a trigger target the quantity is ignored.
    pub fn create_link_by_quantity(
        &mut self,
        source_id: &str,
        source_quantity: &str,
        target_id: &str,
        target_quantity: &str,
    ) -> CouplingResult<LinkId> {
        if self.trigger(target_id).is_none() {
            return self.group.create_link_by_quantity(
                source_id,
                source_quantity,
                target_id,
                target_quantity,
            );
        }
        let outputs = match self.group.component(source_id) {
            Some(source) => write_component(&source)?.output_exchange_items(),
            None => vec![],
        };
        let source_item = outputs
            .into_iter()
            .find(|item| item.quantity.id == source_quantity)
            .ok_or_else(|| {
                CouplingError::Configuration(format!(
                    "'{}' has no output for quantity '{}'",
                    source_id, source_quantity
                ))
            })?;
        let trigger = self.trigger_or_err(target_id)?;
        let target_item = trigger
            .read()
            .map_err(|_| CouplingError::LockPoisoned(target_id.to_string()))?
            .input_item()
            .clone();
        self.create_link(source_id, &source_item, target_id, &target_item)
    }

    pub fn destroy_link(&mut self, link_id: &str) -> CouplingResult<bool> {
        self.group.destroy_link(link_id)
    }

    pub fn link_manager(&self) -> &LinkManager {
        self.group.link_manager()
    }

    /// Pull a trigger at the given time.
    pub fn pull(&mut self, trigger_id: &str, time: &Time) -> CouplingResult<()> {
        let trigger = self.trigger_or_err(trigger_id)?;
        let mut trigger = trigger
            .write()
            .map_err(|_| CouplingError::LockPoisoned(trigger_id.to_string()))?;
        trigger.pull(time)
    }

    /// Values fetched by the trigger's most recent pull.
    pub fn last_values(&self, trigger_id: &str) -> CouplingResult<Option<ValueSet>> {
        let trigger = self.trigger_or_err(trigger_id)?;
        let trigger = trigger
            .read()
            .map_err(|_| CouplingError::LockPoisoned(trigger_id.to_string()))?;
        Ok(trigger.last_calculated_values().cloned())
    }

    pub fn as_dot(&self) -> CouplingResult<String> {
        self.group.as_dot()
    }
}

impl LinkableComponent for Composition {
    fn component_id(&self) -> &str {
        self.group.component_id()
    }

    fn caption(&self) -> &str {
        self.group.caption()
    }

    fn initialize(&mut self, arguments: &Arguments) -> CouplingResult<()> {
        self.group.initialize(arguments)
    }

    fn prepare(&mut self) -> CouplingResult<()> {
        info!(
            "Preparing composition '{}' with {} triggers",
            self.component_id(),
            self.triggers.len()
        );
        self.group.prepare()
    }

    fn get_values(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        self.group.get_values(time, link_id)
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.group.add_link(link)
    }

    fn remove_link(&mut self, link_id: &str) {
        self.group.remove_link(link_id)
    }

    fn finish(&mut self) -> CouplingResult<()> {
        info!("Finishing composition '{}'", self.component_id());
        self.group.finish()
    }

    fn input_exchange_item_count(&mut self) -> usize {
        self.group.input_exchange_item_count()
    }

    fn input_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        self.group.input_exchange_item(index)
    }

    fn output_exchange_item_count(&mut self) -> usize {
        self.group.output_exchange_item_count()
    }

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        self.group.output_exchange_item(index)
    }

    fn time_horizon(&self) -> Option<TimeHorizon> {
        self.group.time_horizon()
    }

    fn earliest_input_time(&self) -> Option<Instant> {
        self.group.earliest_input_time()
    }

    fn validate(&mut self) -> String {
        self.group.validate()
    }
}
