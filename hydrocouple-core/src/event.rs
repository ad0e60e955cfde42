//! Notifications published by the deployer while a composition runs.
//!
//! Delivery is synchronous and in-process. Listeners are called on the thread that runs the
//! composition, so they should return quickly.

use crate::time::Instant;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Lifecycle changes and failures
    Informative,
    /// A time step is about to complete
    TimeStepProgress,
    /// A time step completed and new values are available
    DataChanged,
}

impl EventType {
    pub const ALL: [EventType; 3] = [
        EventType::Informative,
        EventType::TimeStepProgress,
        EventType::DataChanged,
    ];
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub description: String,
    /// Identifier of the publisher
    pub sender: String,
    /// Simulation time the event refers to, if any
    pub simulation_time: Option<Instant>,
}

impl Event {
    pub fn new(event_type: EventType, sender: &str, description: impl Into<String>) -> Self {
        Self {
            event_type,
            description: description.into(),
            sender: sender.to_string(),
            simulation_time: None,
        }
    }

    pub fn at(mut self, time: Instant) -> Self {
        self.simulation_time = Some(time);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.simulation_time {
            Some(time) => write!(
                f,
                "[{:?}] {} at {}: {}",
                self.event_type, self.sender, time, self.description
            ),
            None => write!(
                f,
                "[{:?}] {}: {}",
                self.event_type, self.sender, self.description
            ),
        }
    }
}

/// Receives events from an [`EventPublisher`].
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);

    /// The event types this listener wants to receive.
    fn accepted_event_types(&self) -> Vec<EventType> {
        EventType::ALL.to_vec()
    }
}

/// Fans events out to registered listeners.
#[derive(Default)]
pub struct EventPublisher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deliver an event to every listener accepting its type.
    pub fn publish(&self, event: &Event) {
        // Clone the list so listeners may subscribe or unsubscribe while being notified
        let listeners: Vec<Arc<dyn EventListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            if listener.accepted_event_types().contains(&event.event_type) {
                listener.on_event(event);
            }
        }
    }
}

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<Event>>,
    accepted: Option<Vec<EventType>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only collect events of the given types.
    pub fn with_types(types: &[EventType]) -> Self {
        Self {
            events: Mutex::new(vec![]),
            accepted: Some(types.to_vec()),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of collected events of a type.
    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl EventListener for EventCollector {
    fn on_event(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }

    fn accepted_event_types(&self) -> Vec<EventType> {
        match &self.accepted {
            Some(types) => types.clone(),
            None => EventType::ALL.to_vec(),
        }
    }
}

/// Forwards events to the `log` facade at info level.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_event(&self, event: &Event) {
        info!("{}", event);
    }
}
