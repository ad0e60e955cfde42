use crate::component::{ComponentLinks, LinkableComponent};
use crate::errors::{CouplingError, CouplingResult};
use crate::exchange::{ElementSet, ExchangeItem, Quantity};
use crate::link::Link;
use crate::time::{Instant, Time, TimeHorizon};
use crate::values::ValueSet;

// ============================================================================
// Exchange items shared by the test components
// ============================================================================

pub(crate) fn flow_output(component: &str) -> ExchangeItem {
    output(component, "flow")
}

pub(crate) fn flow_input(component: &str) -> ExchangeItem {
    ExchangeItem::input(
        component,
        Quantity::scalar("flow", "m3/s"),
        ElementSet::single("outlet"),
    )
}

pub(crate) fn output(component: &str, quantity: &str) -> ExchangeItem {
    ExchangeItem::output(
        component,
        Quantity::scalar(quantity, "m3/s"),
        ElementSet::single("outlet"),
    )
}

// ============================================================================
// ConstantComponent - a leaf producing the same value for any time
// ============================================================================

/// Leaf with a single `flow` output
#[derive(Debug)]
pub(crate) struct ConstantComponent {
    id: String,
    value: f64,
    links: ComponentLinks,
    horizon: Option<TimeHorizon>,
    /// Number of `get_values` calls answered
    pub requests: usize,
    /// Times requested, in order
    pub requested: Vec<Time>,
    pub prepared: bool,
    pub finished: bool,
}

impl ConstantComponent {
    pub fn new(id: &str, value: f64) -> Self {
        Self {
            id: id.to_string(),
            value,
            links: ComponentLinks::new(),
            horizon: None,
            requests: 0,
            requested: vec![],
            prepared: false,
            finished: false,
        }
    }

    pub fn with_horizon(mut self, start: f64, end: f64) -> Self {
        self.horizon = Some(TimeHorizon::new(start, end));
        self
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl LinkableComponent for ConstantComponent {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn prepare(&mut self) -> CouplingResult<()> {
        self.prepared = true;
        Ok(())
    }

    fn get_values(&mut self, time: &Time, _link_id: &str) -> CouplingResult<ValueSet> {
        self.requests += 1;
        self.requested.push(*time);
        Ok(ValueSet::scalars(vec![self.value]))
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.links.add(link);
        Ok(())
    }

    fn remove_link(&mut self, link_id: &str) {
        self.links.remove(link_id);
    }

    fn finish(&mut self) -> CouplingResult<()> {
        self.finished = true;
        Ok(())
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
        (index == 0).then(|| flow_output(&self.id))
    }

    fn time_horizon(&self) -> Option<TimeHorizon> {
        self.horizon
    }
}

// ============================================================================
// PassThrough - forwards the value of its `flow` input
// ============================================================================

/// Component with a `flow` input whose values are republished on one output
#[derive(Debug)]
pub(crate) struct PassThrough {
    id: String,
    output_quantity: String,
    links: ComponentLinks,
    earliest: Option<Instant>,
    /// When false, new links are refused
    pub accepts_links: bool,
}

impl PassThrough {
    /// Publishes its input as `flow`
    pub fn new(id: &str) -> Self {
        Self::with_output(id, "flow")
    }

    pub fn with_output(id: &str, quantity: &str) -> Self {
        Self {
            id: id.to_string(),
            output_quantity: quantity.to_string(),
            links: ComponentLinks::new(),
            earliest: None,
            accepts_links: true,
        }
    }

    pub fn with_earliest_input_time(mut self, time: f64) -> Self {
        self.earliest = Some(Instant(time));
        self
    }
}

impl LinkableComponent for PassThrough {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn get_values(&mut self, time: &Time, _link_id: &str) -> CouplingResult<ValueSet> {
        let link = self.links.incoming_to(&flow_input(&self.id)).ok_or_else(|| {
            CouplingError::Configuration(format!("{} has no input link", self.id))
        })?;
        link.fetch_values(time)
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        if !self.accepts_links {
            return Err(CouplingError::Configuration(format!(
                "{} refuses link '{}'",
                self.id,
                link.id()
            )));
        }
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
        (index == 0).then(|| flow_input(&self.id))
    }

    fn output_exchange_item_count(&mut self) -> usize {
        1
    }

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        (index == 0).then(|| output(&self.id, &self.output_quantity))
    }

    fn earliest_input_time(&self) -> Option<Instant> {
        self.earliest
    }

    fn validate(&mut self) -> String {
        let input = flow_input(&self.id);
        match self.links.incoming_to(&input) {
            Some(_) => String::new(),
            None => format!("Input {} is not connected\n", input),
        }
    }
}
