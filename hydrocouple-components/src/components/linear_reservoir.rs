//! Linear reservoir routing
//!
//! The reservoir's outflow is proportional to its storage, $Q = S / k$, where $k$ is the mean
//! residence time. For a constant inflow $I$ over a step of length $\Delta t$ the storage
//! equation $dS/dt = I - S/k$ has the exact solution
//! $$ S(t + \Delta t) = I k + (S(t) - I k) e^{-\Delta t / k} $$

use super::check_outgoing;
use hydrocouple_core::buffer::SmartBuffer;
use hydrocouple_core::component::{Arguments, ComponentLinks, LinkableComponent};
use hydrocouple_core::errors::{CouplingError, CouplingResult};
use hydrocouple_core::exchange::{ElementSet, ExchangeItem, Quantity};
use hydrocouple_core::link::{Link, LinkId};
use hydrocouple_core::time::{Instant, Time, TimeInterval, SECONDS_PER_DAY};
use hydrocouple_core::values::ValueSet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const QUANTITY: &str = "discharge";
const UNIT: &str = "m3/s";

/// Parameters for the linear reservoir
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearReservoirParameters {
    /// Mean residence time of water in the reservoir
    /// unit: days
    pub residence_time: f64,
    /// Storage at the start time
    /// unit: m^3
    pub initial_storage: f64,
    /// unit: day count
    pub start_time: f64,
    /// Internal time step
    /// unit: s
    pub time_step: f64,
}

/// A single storage draining into its outflow.
///
/// The reservoir steps itself forward until it reaches the time requested by its consumer,
/// pulling the mean inflow for each step through its input link. Without an input link the
/// inflow is zero. Outflow is recorded at the end of each step and requests are answered by
/// interpolating those records. Records older than every consumer's latest request are
/// dropped, keeping one to interpolate from.
#[derive(Debug)]
pub struct LinearReservoir {
    id: String,
    parameters: LinearReservoirParameters,
    links: ComponentLinks,
    current_time: Instant,
    storage: f64,
    outflow: SmartBuffer,
    /// Start of the latest request made through each outgoing link
    requested: HashMap<LinkId, Instant>,
}

impl LinearReservoir {
    pub fn from_parameters(id: &str, parameters: LinearReservoirParameters) -> Self {
        let mut reservoir = Self {
            id: id.to_string(),
            current_time: Instant(parameters.start_time),
            storage: parameters.initial_storage,
            parameters,
            links: ComponentLinks::new(),
            outflow: SmartBuffer::new(),
            requested: HashMap::new(),
        };
        reservoir.reset();
        reservoir
    }

    pub fn parameters(&self) -> &LinearReservoirParameters {
        &self.parameters
    }

    pub fn storage(&self) -> f64 {
        self.storage
    }

    /// Recorded outflow still available to consumers.
    pub fn outflow(&self) -> &SmartBuffer {
        &self.outflow
    }

    /// Time up to which the reservoir has been computed.
    pub fn current_time(&self) -> Instant {
        self.current_time
    }

    pub fn input_item(&self) -> ExchangeItem {
        ExchangeItem::input(
            &self.id,
            Quantity::scalar(QUANTITY, UNIT),
            ElementSet::single("inflow"),
        )
    }

    pub fn output_item(&self) -> ExchangeItem {
        ExchangeItem::output(
            &self.id,
            Quantity::scalar(QUANTITY, UNIT),
            ElementSet::single("outflow"),
        )
    }

    fn residence_time_seconds(&self) -> f64 {
        self.parameters.residence_time * SECONDS_PER_DAY
    }

    /// Storage after a step of `dt` seconds with constant `inflow`.
    ///
    /// This is the core physics calculation, extracted for testability.
    pub fn calculate_storage(&self, storage: f64, inflow: f64, dt: f64) -> f64 {
        let k = self.residence_time_seconds();
        let equilibrium = inflow * k;
        equilibrium + (storage - equilibrium) * (-dt / k).exp()
    }

    /// Outflow for a given storage.
    pub fn calculate_outflow(&self, storage: f64) -> f64 {
        storage / self.residence_time_seconds()
    }

    /// Return to the initial state.
    fn reset(&mut self) {
        self.current_time = Instant(self.parameters.start_time);
        self.storage = self.parameters.initial_storage;
        self.outflow = SmartBuffer::new();
        self.requested.clear();
        let initial = ValueSet::scalars(vec![self.calculate_outflow(self.storage)]);
        if let Err(e) = self
            .outflow
            .add_values(&Time::Instant(self.current_time), &initial)
        {
            debug!("Could not record initial outflow of '{}': {}", self.id, e);
        }
    }

    fn mean_inflow(&self, interval: &TimeInterval) -> CouplingResult<f64> {
        let Some(link) = self.links.incoming_to(&self.input_item()) else {
            return Ok(0.0);
        };
        let values = link.fetch_values(&Time::Interval(*interval))?;
        values.scalar(0).ok_or_else(|| {
            CouplingError::Validation(format!(
                "'{}' expected one scalar inflow value from link '{}'",
                self.id,
                link.id()
            ))
        })
    }

    /// Advance the reservoir by one internal step.
    fn step(&mut self) -> CouplingResult<()> {
        let next = self.current_time.plus_seconds(self.parameters.time_step);
        let interval = TimeInterval::new(self.current_time, next)?;
        let inflow = self.mean_inflow(&interval)?;

        self.storage = self.calculate_storage(self.storage, inflow, self.parameters.time_step);
        let outflow = self.calculate_outflow(self.storage);
        self.outflow
            .add_values(&Time::Instant(next), &ValueSet::scalars(vec![outflow]))?;
        self.current_time = next;

        debug!(
            "'{}' at {}: inflow {:.3}, storage {:.1}, outflow {:.3}",
            self.id, next, inflow, self.storage, outflow
        );
        Ok(())
    }

    /// Drop outflow records that no consumer can ask for any more.
    ///
    /// Consumers request increasing times, so everything before the earliest of their latest
    /// requests is discarded. Nothing is dropped while a consumer has not asked yet.
    fn trim_outflow(&mut self) -> CouplingResult<()> {
        let output = self.output_item();
        let mut earliest: Option<f64> = None;
        for link in self.links.iter() {
            if !link.source_item().is_some_and(|item| item.same_slot(&output)) {
                continue;
            }
            let Some(requested) = self.requested.get(link.id()) else {
                return Ok(());
            };
            earliest = Some(earliest.map_or(requested.days(), |e| e.min(requested.days())));
        }
        match earliest {
            Some(earliest) => self.outflow.clear_before(Instant(earliest)),
            None => Ok(()),
        }
    }

    /// Step until the reservoir has reached `until`.
    pub fn advance_to(&mut self, until: Instant) -> CouplingResult<()> {
        while self.current_time.days() < until.days() {
            self.step()?;
        }
        Ok(())
    }
}

fn parse_argument(arguments: &Arguments, name: &str) -> CouplingResult<Option<f64>> {
    arguments
        .get(name)
        .map(|value| {
            value.trim().parse::<f64>().map_err(|e| {
                CouplingError::Validation(format!("Invalid value '{}' for {}: {}", value, name, e))
            })
        })
        .transpose()
}

impl LinkableComponent for LinearReservoir {
    fn component_id(&self) -> &str {
        &self.id
    }

    /// Overrides `residence_time` and `initial_storage` if given.
    fn initialize(&mut self, arguments: &Arguments) -> CouplingResult<()> {
        if let Some(value) = parse_argument(arguments, "residence_time")? {
            self.parameters.residence_time = value;
        }
        if let Some(value) = parse_argument(arguments, "initial_storage")? {
            self.parameters.initial_storage = value;
        }
        self.reset();
        Ok(())
    }

    fn prepare(&mut self) -> CouplingResult<()> {
        if !(self.parameters.residence_time > 0.0 && self.parameters.time_step > 0.0) {
            return Err(CouplingError::Validation(format!(
                "'{}' needs a positive residence time and time step",
                self.id
            )));
        }
        self.reset();
        Ok(())
    }

    fn get_values(&mut self, time: &Time, link_id: &str) -> CouplingResult<ValueSet> {
        check_outgoing(&self.links, link_id, &self.output_item())?;
        self.advance_to(time.end())?;
        let values = self.outflow.get_values(time)?;
        self.requested.insert(link_id.to_string(), time.start());
        self.trim_outflow()?;
        Ok(values)
    }

    fn add_link(&mut self, link: Link) -> CouplingResult<()> {
        self.links.add(link);
        Ok(())
    }

    fn remove_link(&mut self, link_id: &str) {
        self.links.remove(link_id);
        self.requested.remove(link_id);
    }

    fn input_exchange_item_count(&mut self) -> usize {
        1
    }

    fn input_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        (index == 0).then(|| self.input_item())
    }

    fn output_exchange_item_count(&mut self) -> usize {
        1
    }

    fn output_exchange_item(&mut self, index: usize) -> Option<ExchangeItem> {
        (index == 0).then(|| self.output_item())
    }

    /// Inflow is never requested for times the reservoir has already computed
    fn earliest_input_time(&self) -> Option<Instant> {
        Some(self.current_time)
    }

    fn validate(&mut self) -> String {
        let mut diagnostics = String::new();
        if self.parameters.residence_time <= 0.0 {
            diagnostics.push_str(&format!(
                "'{}' has a non-positive residence time\n",
                self.id
            ));
        }
        if self.links.incoming_to(&self.input_item()).is_none() {
            diagnostics.push_str(&format!("Input {} is not connected\n", self.input_item()));
        }
        diagnostics
    }
}
