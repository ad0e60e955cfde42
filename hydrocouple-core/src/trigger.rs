//! Sinks which start the evaluation of everything upstream of them.

use crate::component::{ComponentLinks, LinkableComponent};
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::{ElementSet, ExchangeItem, Quantity};
use crate::link::Link;
use crate::time::Time;
use crate::values::ValueSet;
use log::{debug, warn};

/// Quantity declared by a trigger before it has been adapted to a producer.
pub const TRIGGER_QUANTITY: &str = "trigger";

/// A single-input sink.
///
/// Pulling a trigger asks the source of its one link for values, which in turn makes that
/// source pull from its own inputs. The deployer pulls every registered trigger once per step.
#[derive(Debug)]
pub struct Trigger {
    id: String,
    input: ExchangeItem,
    links: ComponentLinks,
    last_calculated_values: Option<ValueSet>,
}

impl Trigger {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            input: ExchangeItem::input(
                id,
                Quantity::scalar(TRIGGER_QUANTITY, "-"),
                ElementSet::single(TRIGGER_QUANTITY),
            ),
            links: ComponentLinks::new(),
            last_calculated_values: None,
        }
    }

    /// The trigger's only input item.
    pub fn input_item(&self) -> &ExchangeItem {
        &self.input
    }

    pub(crate) fn set_input_item(&mut self, input: ExchangeItem) {
        self.input = input;
    }

    /// Values fetched by the most recent [`Trigger::pull`].
    ///
    /// `None` if the trigger has never been pulled. An empty value set means the last pull
    /// found no single link to fetch from.
    pub fn last_calculated_values(&self) -> Option<&ValueSet> {
        self.last_calculated_values.as_ref()
    }

    /// Fetch values at `time` from the source of the attached link.
    ///
    /// Without exactly one attached link nothing is fetched and the stored values are emptied.
    pub fn pull(&mut self, time: &Time) -> CouplingResult<()> {
        let values = match self.links.len() {
            1 => match self.links.iter().next() {
                Some(link) => link.fetch_values(time)?,
                None => ValueSet::empty(),
            },
            count => {
                warn!(
                    "Trigger '{}' has {} links, expected exactly one. Nothing was pulled",
                    self.id, count
                );
                ValueSet::empty()
            }
        };
        debug!("Trigger '{}' pulled {} values at {}", self.id, values.count(), time);
        self.last_calculated_values = Some(values);
        Ok(())
    }

    /// Whether the trigger can reshape its input to accept values from `source`.
    pub fn can_adapt_to(&self, _source: &ExchangeItem) -> bool {
        true
    }

    /// Reshape the input item to match a candidate producer.
    pub fn adapt_to(&mut self, source: &ExchangeItem) -> CouplingResult<()> {
        if !self.can_adapt_to(source) {
            return Err(CouplingError::Configuration(format!(
                "Trigger '{}' cannot accept values from {}",
                self.id, source
            )));
        }
        self.input = ExchangeItem::input(
            &self.id,
            source.quantity.clone(),
            source.element_set.clone(),
        );
        Ok(())
    }
}

impl LinkableComponent for Trigger {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn get_values(&mut self, _time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        Err(CouplingError::Configuration(format!(
            "Trigger '{}' produces no values (requested through link '{}')",
            self.id, link_id
        )))
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.links.add(link);
        Ok(())
    }

    fn remove_link(&mut self, link_id: &str) {
        self.links.remove(link_id);
    }

    fn input_exchange_item_count(&mut self) -> usize {
        1
    }

    fn input_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        (index == 0).then(|| self.input.clone())
    }

    fn output_exchange_item_count(&mut self) -> usize {
        0
    }

    fn output_exchange_item(&mut self, _index: usize) -> Option<ExchangeItem> {
        None
    }

    fn validate(&mut self) -> String {
        match self.links.len() {
            1 => String::new(),
            count => format!("Trigger '{}' has {} links, expected one\n", self.id, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::into_shared;
    use crate::example_components::{flow_output, ConstantComponent};
    use crate::link::LinkEndpoint;
    use crate::link_manager::LinkManager;
    use std::sync::{Arc, RwLock};

    #[test]
    fn pull_without_links_stores_empty_values() {
        let mut trigger = Trigger::new("T");
        assert!(trigger.last_calculated_values().is_none());

        trigger.pull(&Time::instant(1.0)).unwrap();
        assert!(trigger.last_calculated_values().unwrap().is_empty());
    }

    #[test]
    fn adapting_copies_the_producer_shape() {
        let mut trigger = Trigger::new("T");
        assert_eq!(trigger.input_item().quantity.id, TRIGGER_QUANTITY);

        let source = flow_output("A");
        assert!(trigger.can_adapt_to(&source));
        trigger.adapt_to(&source).unwrap();

        let input = trigger.input_exchange_item(0).unwrap();
        assert_eq!(input.component, "T");
        assert_eq!(input.quantity, source.quantity);
        assert_eq!(input.element_set, source.element_set);
        assert!(trigger.input_exchange_item(1).is_none());
    }

    #[test]
    fn pull_fetches_from_the_single_link() {
        let source = into_shared(ConstantComponent::new("A", 2.5));
        let trigger = Arc::new(RwLock::new(Trigger::new("T")));
        let shared: crate::component::SharedComponent = trigger.clone();

        trigger.write().unwrap().adapt_to(&flow_output("A")).unwrap();
        let target_item = trigger.read().unwrap().input_item().clone();

        let mut manager = LinkManager::new();
        let mut link = manager.create_link();
        link.connect(
            LinkEndpoint::new("A", &source, flow_output("A")),
            LinkEndpoint::new("T", &shared, target_item),
        )
        .unwrap();
        manager.add_link(link).unwrap();

        trigger.write().unwrap().pull(&Time::instant(3.0)).unwrap();
        let guard = trigger.read().unwrap();
        let values = guard.last_calculated_values().unwrap();
        assert_eq!(values.scalar(0), Some(2.5));
    }

    #[test]
    fn triggers_produce_nothing() {
        let mut trigger = Trigger::new("T");
        assert!(matches!(
            trigger.get_values(&Time::instant(0.0), "link-1"),
            Err(CouplingError::Configuration(_))
        ));
    }
}
