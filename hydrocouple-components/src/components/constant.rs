//! A source which provides the same values at any time.

use super::check_outgoing;
use hydrocouple_core::component::{ComponentLinks, LinkableComponent};
use hydrocouple_core::errors::CouplingResult;
use hydrocouple_core::exchange::{ElementSet, ElementType, ExchangeItem, Quantity};
use hydrocouple_core::link::Link;
use hydrocouple_core::time::Time;
use hydrocouple_core::values::ValueSet;
use serde::{Deserialize, Serialize};

/// Parameters for the constant source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantSourceParameters {
    pub quantity: Quantity,
    /// Identifier of the element set, one element per value
    pub element_set: String,
    pub values: Vec<f64>,
}

/// Provides a fixed value per element, for example a constant boundary condition.
#[derive(Debug)]
pub struct ConstantSource {
    id: String,
    parameters: ConstantSourceParameters,
    links: ComponentLinks,
}

impl ConstantSource {
    pub fn from_parameters(id: &str, parameters: ConstantSourceParameters) -> Self {
        Self {
            id: id.to_string(),
            parameters,
            links: ComponentLinks::new(),
        }
    }

    /// A single element source of a scalar quantity.
    pub fn scalar(id: &str, quantity: &str, unit: &str, value: f64) -> Self {
        Self::from_parameters(
            id,
            ConstantSourceParameters {
                quantity: Quantity::scalar(quantity, unit),
                element_set: id.to_string(),
                values: vec![value],
            },
        )
    }

    pub fn output_item(&self) -> ExchangeItem {
        ExchangeItem::output(
            &self.id,
            self.parameters.quantity.clone(),
            ElementSet::new(
                &self.parameters.element_set,
                ElementType::IdBased,
                self.parameters.values.len(),
            ),
        )
    }
}

impl LinkableComponent for ConstantSource {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn get_values(&mut self, _time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        check_outgoing(&self.links, link_id, &self.output_item())?;
        Ok(ValueSet::scalars(self.parameters.values.clone()))
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.links.add(link);
        Ok(())
    }

    fn remove_link(&mut self, link_id: &str) {
        self.links.remove(link_id);
    }

    fn input_exchange_item_count(&mut self) -> usize {
        0
    }

    fn input_exchange_item(&mut self, _index: usize) -> Option<ExchangeItem> {
        None
    }

    fn output_exchange_item_count(&mut self) -> usize {
        1
    }

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        (index == 0).then(|| self.output_item())
    }
}
