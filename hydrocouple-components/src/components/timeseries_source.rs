//! A source which replays recorded values, interpolating between them.

use super::check_outgoing;
use hydrocouple_core::buffer::SmartBuffer;
use hydrocouple_core::component::{ComponentLinks, LinkableComponent};
use hydrocouple_core::errors::CouplingResult;
use hydrocouple_core::exchange::{ElementSet, ExchangeItem, Quantity};
use hydrocouple_core::link::Link;
use hydrocouple_core::time::{Time, TimeHorizon};
use hydrocouple_core::values::ValueSet;
use log::debug;
use serde::{Deserialize, Serialize};

/// One recorded entry of a series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSample {
    pub time: Time,
    pub values: Vec<f64>,
}

/// Parameters for the time series source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesParameters {
    pub quantity: Quantity,
    pub element_set: ElementSet,
    /// Damping of extrapolation beyond the recorded range, `0` holds the boundary value
    #[serde(default)]
    pub relaxation_factor: f64,
    pub samples: Vec<SeriesSample>,
}

/// Provides values from a recorded series.
///
/// Requests between samples are interpolated and requests outside of the recorded range are
/// extrapolated by the underlying [`SmartBuffer`].
#[derive(Debug)]
pub struct TimeSeriesSource {
    id: String,
    item: ExchangeItem,
    buffer: SmartBuffer,
    links: ComponentLinks,
}

impl TimeSeriesSource {
    /// An empty series. Samples are added with [`TimeSeriesSource::add_sample`].
    pub fn new(id: &str, quantity: Quantity, element_set: ElementSet) -> Self {
        Self {
            id: id.to_string(),
            item: ExchangeItem::output(id, quantity, element_set),
            buffer: SmartBuffer::new(),
            links: ComponentLinks::new(),
        }
    }

    pub fn from_parameters(id: &str, parameters: TimeSeriesParameters) -> CouplingResult<Self> {
        let mut source = Self::new(id, parameters.quantity, parameters.element_set);
        source
            .buffer
            .set_relaxation_factor(parameters.relaxation_factor)?;
        for sample in parameters.samples.iter() {
            source.add_sample(&sample.time, &ValueSet::scalars(sample.values.clone()))?;
        }
        Ok(source)
    }

    /// Append a recorded sample. Samples must be added in time order.
    pub fn add_sample(&mut self, time: &Time, values: &ValueSet) -> CouplingResult<()> {
        self.buffer.add_values(time, values)
    }

    pub fn buffer(&self) -> &SmartBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut SmartBuffer {
        &mut self.buffer
    }
}

impl LinkableComponent for TimeSeriesSource {
    fn component_id(&self) -> &str {
        &self.id
    }

    fn get_values(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        check_outgoing(&self.links, link_id, &self.item)?;
        debug!("'{}' answering request for {}", self.id, time);
        self.buffer.get_values(time)
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
        (index == 0).then(|| self.item.clone())
    }

    /// The recorded range
    fn time_horizon(&self) -> Option<TimeHorizon> {
        let first = self.buffer.samples().first()?;
        let last = self.buffer.samples().last()?;
        Some(TimeHorizon::new(first.time().start(), last.time().end()))
    }

    fn validate(&mut self) -> String {
        match self.buffer.check_buffer() {
            Ok(()) => String::new(),
            Err(e) => format!("Series '{}' is invalid: {}\n", self.id, e),
        }
    }
}
