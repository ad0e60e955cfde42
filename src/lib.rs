//! Couple independently built simulation components and run them through time.
//!
//! Components implement [`LinkableComponent`] and are wired together inside a [`Composition`].
//! Consumers pull values from producers through links; each producer answers for the time the
//! consumer asked for, interpolating or aggregating its own results with a [`SmartBuffer`].
//! A [`Deployer`] advances the composition step by step by pulling its [`Trigger`]s.

pub use hydrocouple_components;
pub use hydrocouple_core;

pub use hydrocouple_core::buffer::SmartBuffer;
pub use hydrocouple_core::component::{into_shared, LinkableComponent, SharedComponent};
pub use hydrocouple_core::composition::Composition;
pub use hydrocouple_core::config::DeployerConfig;
pub use hydrocouple_core::deployer::Deployer;
pub use hydrocouple_core::errors::{CouplingError, CouplingResult};
pub use hydrocouple_core::event::{Event, EventCollector, EventListener, EventType};
pub use hydrocouple_core::group::ComponentGroup;
pub use hydrocouple_core::time::{Instant, Time, TimeInterval};
pub use hydrocouple_core::trigger::Trigger;
pub use hydrocouple_core::values::ValueSet;
