//! Time-stepped execution of a [`Composition`].
//!
//! Every step advances the current time by the time step and pulls each trigger at the new
//! time, which evaluates everything upstream of the triggers. The deployer moves through
//! `Idle -> Preparing -> Running (stepping <-> paused) -> Finishing -> Idle`.
//!
//! Pausing and stopping are requests which are honoured between steps; a step in progress is
//! always completed. In blocking mode the steps run on the thread that called
//! [`Deployer::start`] or [`Deployer::resume`], otherwise on a single worker thread.

use crate::component::LinkableComponent;
use crate::composition::Composition;
use crate::config::DeployerConfig;
use crate::errors::{CouplingError, CouplingResult};
use crate::event::{Event, EventListener, EventPublisher, EventType};
use crate::time::{Instant, Time, SECONDS_PER_DAY};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

const SENDER: &str = "deployer";

#[derive(Debug, Clone)]
struct RunSettings {
    start_time: Instant,
    end_time: Instant,
    /// Seconds
    time_step: f64,
    blocking: bool,
    triggers: Vec<String>,
    current_time: Instant,
    step_index: u64,
}

/// State shared between the deployer and its worker thread.
#[derive(Debug)]
struct Shared {
    composition: Mutex<Composition>,
    settings: Mutex<RunSettings>,
    running: AtomicBool,
    paused: AtomicBool,
    /// Bumped by every start and kill. A run loop exits once its generation is stale.
    generation: AtomicU64,
    publisher: EventPublisher,
    last_error: Mutex<Option<CouplingError>>,
}

impl Shared {
    fn settings(&self) -> CouplingResult<MutexGuard<'_, RunSettings>> {
        self.settings
            .lock()
            .map_err(|_| CouplingError::LockPoisoned(SENDER.to_string()))
    }

    fn composition(&self) -> CouplingResult<MutexGuard<'_, Composition>> {
        self.composition
            .lock()
            .map_err(|_| CouplingError::LockPoisoned("composition".to_string()))
    }

    fn publish(&self, event: Event) {
        self.publisher.publish(&event);
    }

    fn record_error(&self, err: &CouplingError) {
        let mut last_error = self.last_error.lock().unwrap_or_else(|e| e.into_inner());
        *last_error = Some(err.clone());
    }

    fn is_current(&self, generation: u64) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Step until the end time is reached or a pause or stop is requested.
    fn run_loop(&self, generation: u64) -> CouplingResult<()> {
        loop {
            if !self.is_current(generation) {
                debug!("Run loop exiting, deployer stopped");
                return Ok(());
            }
            if self.paused.load(Ordering::SeqCst) {
                info!("Run paused");
                return Ok(());
            }

            let outcome = match self.reached_end() {
                Ok(false) => self.run_step(generation),
                other => other,
            };
            if !self.is_current(generation) {
                return outcome.map(|_| ());
            }
            match outcome {
                Ok(true) => return self.stop("Run completed"),
                Ok(false) => {}
                Err(e) => {
                    error!("Time step failed: {}", e);
                    self.record_error(&e);
                    let reason = format!("Run stopped after an error: {}", e);
                    if let Err(finish_error) = self.stop(&reason) {
                        warn!("Failed to finish composition: {}", finish_error);
                    }
                    return Err(e);
                }
            }
        }
    }

    fn reached_end(&self) -> CouplingResult<bool> {
        let settings = self.settings()?;
        Ok(settings.current_time.days() >= settings.end_time.days())
    }

    /// Advance by one step and pull every trigger. Returns true once the end time is reached.
    fn run_step(&self, generation: u64) -> CouplingResult<bool> {
        let (step_index, time, triggers) = {
            let settings = self.settings()?;
            (
                settings.step_index + 1,
                settings.current_time.plus_seconds(settings.time_step),
                settings.triggers.clone(),
            )
        };

        {
            let mut composition = self.composition()?;
            // A stop or kill may have ended the run while this step waited for the lock
            if !self.is_current(generation) {
                return Ok(false);
            }
            let triggers = match triggers.is_empty() {
                true => composition.trigger_ids(),
                false => triggers,
            };
            debug!("Step {} at {}: pulling {} triggers", step_index, time, triggers.len());
            for trigger in triggers.iter() {
                composition.pull(trigger, &Time::Instant(time))?;
            }
        }

        let end_time = {
            let mut settings = self.settings()?;
            settings.step_index = step_index;
            settings.current_time = time;
            settings.end_time
        };
        self.publish(
            Event::new(
                EventType::TimeStepProgress,
                SENDER,
                format!("Completed step {}", step_index),
            )
            .at(time),
        );
        Ok(self.time_step_done(time, end_time))
    }

    fn time_step_done(&self, time: Instant, end_time: Instant) -> bool {
        self.publish(Event::new(EventType::DataChanged, SENDER, "New values available").at(time));
        time.days() >= end_time.days()
    }

    /// Mark the run as stopped and finish the composition, once.
    fn stop(&self, reason: &str) -> CouplingResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.paused.store(false, Ordering::SeqCst);
        let result = self.composition()?.finish();
        let current_time = self.settings()?.current_time;
        info!("{} at {}", reason, current_time);
        self.publish(Event::new(EventType::Informative, SENDER, reason).at(current_time));
        result
    }
}

/// Runs a [`Composition`] over a range of time.
#[derive(Debug)]
pub struct Deployer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<CouplingResult<()>>>>,
}

impl Deployer {
    /// Create an idle deployer. The time step defaults to one day and runs are blocking.
    pub fn new(composition: Composition) -> Self {
        Self {
            shared: Arc::new(Shared {
                composition: Mutex::new(composition),
                settings: Mutex::new(RunSettings {
                    start_time: Instant(0.0),
                    end_time: Instant(0.0),
                    time_step: SECONDS_PER_DAY,
                    blocking: true,
                    triggers: vec![],
                    current_time: Instant(0.0),
                    step_index: 0,
                }),
                running: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                publisher: EventPublisher::new(),
                last_error: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn from_config(composition: Composition, config: &DeployerConfig) -> Self {
        let deployer = Self::new(composition);
        deployer.set_start_time(config.start_time);
        deployer.set_end_time(config.end_time);
        deployer.set_time_step(config.time_step);
        deployer.set_blocking(config.blocking);
        deployer.set_triggers(config.triggers.clone());
        deployer
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.shared.publisher.subscribe(listener);
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.shared.publisher
    }

    /// Run a closure with exclusive access to the composition.
    ///
    /// Blocks until the current step, if any, has completed.
    pub fn with_composition<R>(&self, f: impl FnOnce(&mut Composition) -> R) -> CouplingResult<R> {
        let mut composition = self.shared.composition()?;
        Ok(f(&mut *composition))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.is_running() && self.shared.paused.load(Ordering::SeqCst)
    }

    /// The error which ended the most recent run, if it failed.
    pub fn last_error(&self) -> Option<CouplingError> {
        self.shared
            .last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn read_settings<R>(&self, f: impl FnOnce(&RunSettings) -> R) -> R {
        let settings = self.shared.settings.lock().unwrap_or_else(|e| e.into_inner());
        f(&settings)
    }

    pub fn start_time(&self) -> Instant {
        self.read_settings(|s| s.start_time)
    }

    pub fn end_time(&self) -> Instant {
        self.read_settings(|s| s.end_time)
    }

    /// Length of a step in seconds.
    pub fn time_step(&self) -> f64 {
        self.read_settings(|s| s.time_step)
    }

    pub fn blocking(&self) -> bool {
        self.read_settings(|s| s.blocking)
    }

    pub fn triggers(&self) -> Vec<String> {
        self.read_settings(|s| s.triggers.clone())
    }

    /// Time of the most recently completed step.
    pub fn current_time(&self) -> Instant {
        self.read_settings(|s| s.current_time)
    }

    /// Number of steps completed in the current or last run.
    pub fn step_index(&self) -> u64 {
        self.read_settings(|s| s.step_index)
    }

    /// Apply a settings change if the deployer's state allows it.
    fn update_settings(
        &self,
        name: &str,
        allowed_while_paused: bool,
        apply: impl FnOnce(&mut RunSettings),
    ) -> bool {
        if self.is_running() && !(allowed_while_paused && self.is_paused()) {
            warn!("Ignoring change of {} while the deployer is running", name);
            return false;
        }
        let mut settings = self.shared.settings.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut settings);
        true
    }

    pub fn set_start_time(&self, start_time: Instant) -> bool {
        self.update_settings("start time", false, |s| s.start_time = start_time)
    }

    pub fn set_end_time(&self, end_time: Instant) -> bool {
        self.update_settings("end time", true, |s| s.end_time = end_time)
    }

    /// Set the step length in seconds. Non-positive steps are ignored.
    pub fn set_time_step(&self, time_step: f64) -> bool {
        if !(time_step > 0.0 && time_step.is_finite()) {
            warn!("Ignoring invalid time step {}", time_step);
            return false;
        }
        self.update_settings("time step", true, |s| s.time_step = time_step)
    }

    /// Triggers to pull each step. An empty list pulls every trigger of the composition.
    pub fn set_triggers(&self, triggers: Vec<String>) -> bool {
        self.update_settings("triggers", true, |s| s.triggers = triggers)
    }

    pub fn set_blocking(&self, blocking: bool) -> bool {
        self.update_settings("blocking", false, |s| s.blocking = blocking)
    }

    /// Run from `start_time` to `end_time` in steps of `time_step` seconds.
    pub fn start(&self, start_time: Instant, end_time: Instant, time_step: f64) -> CouplingResult<()> {
        if self.is_running() {
            return Err(CouplingError::configuration("Deployer is already running"));
        }
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(CouplingError::validation(format!(
                "Time step must be positive, got {}",
                time_step
            )));
        }
        if end_time.days() < start_time.days() {
            return Err(CouplingError::validation(format!(
                "End time {} is before start time {}",
                end_time, start_time
            )));
        }
        self.set_start_time(start_time);
        self.set_end_time(end_time);
        self.set_time_step(time_step);
        self.start_configured()
    }

    /// Run with the current settings.
    pub fn start_configured(&self) -> CouplingResult<()> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CouplingError::configuration("Deployer is already running"));
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        // A worker left over from a previous run has already stopped
        if let Some(handle) = self.take_worker() {
            let _ = handle.join();
        }

        match self.prepare() {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to prepare run: {}", e);
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.record_error(&e);
                return Err(e);
            }
        }

        let (start_time, end_time) = self.read_settings(|s| (s.start_time, s.end_time));
        info!("Starting run from {} to {}", start_time, end_time);
        self.shared.publish(
            Event::new(
                EventType::Informative,
                SENDER,
                format!("Run started from {} to {}", start_time, end_time),
            )
            .at(start_time),
        );

        self.shared.paused.store(true, Ordering::SeqCst);
        self.resume()
    }

    /// Reset the run state and prepare the composition.
    fn prepare(&self) -> CouplingResult<()> {
        let (start_time, end_time, time_step, triggers) = {
            let mut settings = self.shared.settings()?;
            settings.current_time = settings.start_time;
            settings.step_index = 0;
            (
                settings.start_time,
                settings.end_time,
                settings.time_step,
                settings.triggers.clone(),
            )
        };
        if !(time_step > 0.0) || end_time.days() < start_time.days() {
            return Err(CouplingError::validation(format!(
                "Invalid run from {} to {} in steps of {}s",
                start_time, end_time, time_step
            )));
        }
        {
            let mut last_error = self.shared.last_error.lock().unwrap_or_else(|e| e.into_inner());
            *last_error = None;
        }

        let mut composition = self.shared.composition()?;
        let known = composition.trigger_ids();
        if let Some(missing) = triggers.iter().find(|t| !known.contains(t)) {
            return Err(CouplingError::configuration(format!(
                "Unknown trigger '{}'",
                missing
            )));
        }
        composition.prepare()
    }

    /// Continue a paused run.
    ///
    /// In blocking mode this returns once the run is paused again or has ended.
    pub fn resume(&self) -> CouplingResult<()> {
        if !self.is_running() {
            return Err(CouplingError::configuration("Deployer is not running"));
        }
        if !self.shared.paused.load(Ordering::SeqCst) {
            debug!("Deployer is not paused");
            return Ok(());
        }

        let generation = self.shared.generation.load(Ordering::SeqCst);
        if self.blocking() {
            self.shared.paused.store(false, Ordering::SeqCst);
            return self.shared.run_loop(generation);
        }

        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        // The previous worker observes the pause at its next step boundary
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }
        self.shared.paused.store(false, Ordering::SeqCst);
        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("hydrocouple-deployer".to_string())
            .spawn(move || shared.run_loop(generation))
            .map_err(|e| CouplingError::configuration(format!("Could not spawn worker: {}", e)))?;
        *worker = Some(handle);
        Ok(())
    }

    /// Request a pause at the next step boundary. Returns false if nothing is running.
    pub fn pause(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        info!("Pause requested");
        self.shared.paused.store(true, Ordering::SeqCst);
        true
    }

    /// End the run and finish the composition.
    ///
    /// A step in progress on the worker thread is completed first.
    pub fn stop(&self) -> CouplingResult<()> {
        self.shared.stop("Run stopped")
    }

    /// Abandon the run without waiting for the worker or finishing the composition.
    ///
    /// The worker is detached and may still complete the step it is in, but it never starts
    /// another one, even if a new run is started meanwhile.
    pub fn kill(&self) {
        warn!("Killing deployer");
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        drop(self.take_worker());
        self.shared
            .publish(Event::new(EventType::Informative, SENDER, "Run killed"));
    }

    /// Wait for the worker thread to exit and return the outcome of its run.
    pub fn join(&self) -> CouplingResult<()> {
        match self.take_worker() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(CouplingError::configuration("Deployer worker panicked"))),
            None => Ok(()),
        }
    }

    fn take_worker(&self) -> Option<JoinHandle<CouplingResult<()>>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::into_shared;
    use crate::event::EventCollector;
    use crate::example_components::{ConstantComponent, PassThrough};
    use crate::trigger::Trigger;
    use std::sync::{RwLock, Weak};

    fn constant_composition() -> (Composition, Arc<RwLock<ConstantComponent>>) {
        let source = Arc::new(RwLock::new(ConstantComponent::new("A", 1.5)));
        let mut composition = Composition::new("model");
        composition.add_component(source.clone()).unwrap();
        composition.add_trigger(Trigger::new("T")).unwrap();
        composition
            .create_link_by_quantity("A", "flow", "T", "trigger")
            .unwrap();
        (composition, source)
    }

    /// Calls back into the deployer when a DataChanged event for a given step arrives
    struct OnStep {
        deployer: Weak<Deployer>,
        step: f64,
        action: fn(&Deployer),
    }

    impl OnStep {
        fn attach(deployer: &Arc<Deployer>, step: f64, action: fn(&Deployer)) {
            deployer.subscribe(Arc::new(OnStep {
                deployer: Arc::downgrade(deployer),
                step,
                action,
            }));
        }
    }

    impl EventListener for OnStep {
        fn on_event(&self, event: &Event) {
            if event.simulation_time != Some(Instant(self.step)) {
                return;
            }
            if let Some(deployer) = self.deployer.upgrade() {
                (self.action)(&deployer);
            }
        }

        fn accepted_event_types(&self) -> Vec<EventType> {
            vec![EventType::DataChanged]
        }
    }

    #[test]
    fn blocking_run_steps_to_the_end() {
        let (composition, source) = constant_composition();
        let deployer = Deployer::new(composition);
        let events = Arc::new(EventCollector::new());
        deployer.subscribe(events.clone());

        deployer
            .start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY)
            .unwrap();

        assert_eq!(events.count(EventType::DataChanged), 3);
        assert_eq!(events.count(EventType::TimeStepProgress), 3);
        assert_eq!(events.count(EventType::Informative), 2);
        assert_eq!(deployer.current_time(), Instant(3.0));
        assert_eq!(deployer.step_index(), 3);
        assert!(!deployer.is_running());
        assert!(deployer.last_error().is_none());

        let source = source.read().unwrap();
        assert!(source.prepared);
        assert!(source.finished);
        assert_eq!(
            source.requested,
            vec![Time::instant(1.0), Time::instant(2.0), Time::instant(3.0)]
        );

        let values = deployer
            .with_composition(|c| c.last_values("T"))
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(values.scalar(0), Some(1.5));
    }

    #[test]
    fn sub_daily_steps() {
        let (composition, source) = constant_composition();
        let deployer = Deployer::new(composition);
        deployer.start(Instant(10.0), Instant(11.0), 6.0 * 3600.0).unwrap();

        assert_eq!(deployer.step_index(), 4);
        assert_eq!(deployer.current_time(), Instant(11.0));
        assert_eq!(source.read().unwrap().requests, 4);
    }

    #[test]
    fn empty_run_pulls_nothing() {
        let (composition, source) = constant_composition();
        let deployer = Deployer::new(composition);
        deployer.start(Instant(2.0), Instant(2.0), SECONDS_PER_DAY).unwrap();

        assert_eq!(deployer.step_index(), 0);
        assert_eq!(source.read().unwrap().requests, 0);
        assert!(source.read().unwrap().finished);
    }

    #[test]
    fn invalid_run_parameters() {
        let (composition, _) = constant_composition();
        let deployer = Deployer::new(composition);

        let res = deployer.start(Instant(0.0), Instant(3.0), 0.0);
        assert!(matches!(res, Err(CouplingError::Validation(_))));
        let res = deployer.start(Instant(3.0), Instant(0.0), SECONDS_PER_DAY);
        assert!(matches!(res, Err(CouplingError::Validation(_))));
        assert!(!deployer.is_running());
    }

    #[test]
    fn unknown_triggers_are_rejected() {
        let (composition, _) = constant_composition();
        let deployer = Deployer::new(composition);
        assert!(deployer.set_triggers(vec!["missing".to_string()]));

        let res = deployer.start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY);
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
        assert!(!deployer.is_running());
    }

    #[test]
    fn failed_steps_stop_the_run() {
        let mut composition = Composition::new("model");
        composition
            .add_component(into_shared(PassThrough::new("B")))
            .unwrap();
        composition.add_trigger(Trigger::new("T")).unwrap();
        composition
            .create_link_by_quantity("B", "flow", "T", "trigger")
            .unwrap();

        let deployer = Deployer::new(composition);
        let events = Arc::new(EventCollector::with_types(&[EventType::Informative]));
        deployer.subscribe(events.clone());

        let res = deployer.start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY);
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
        assert!(matches!(
            deployer.last_error(),
            Some(CouplingError::Configuration(_))
        ));
        assert!(!deployer.is_running());
        assert_eq!(deployer.step_index(), 0);
        assert!(events
            .events()
            .last()
            .unwrap()
            .description
            .starts_with("Run stopped after an error"));
    }

    #[test]
    fn pause_and_resume() {
        let (composition, source) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        let events = Arc::new(EventCollector::with_types(&[EventType::DataChanged]));
        deployer.subscribe(events.clone());
        OnStep::attach(&deployer, 2.0, |d| {
            d.pause();
        });

        deployer
            .start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY)
            .unwrap();
        assert!(deployer.is_paused());
        assert_eq!(deployer.current_time(), Instant(2.0));
        assert_eq!(events.count(EventType::DataChanged), 2);

        // Only end time, time step and triggers may change while paused
        assert!(!deployer.set_start_time(Instant(1.0)));
        assert!(!deployer.set_blocking(false));
        assert!(deployer.set_end_time(Instant(4.0)));
        assert!(!source.read().unwrap().finished);

        deployer.resume().unwrap();
        assert!(!deployer.is_running());
        assert_eq!(deployer.current_time(), Instant(4.0));
        assert_eq!(events.count(EventType::DataChanged), 4);
        assert!(source.read().unwrap().finished);

        let res = deployer.resume();
        assert!(matches!(res, Err(CouplingError::Configuration(_))));
    }

    #[test]
    fn changing_the_step_while_paused_keeps_time_moving_forward() {
        let (composition, _) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        let events = Arc::new(EventCollector::with_types(&[EventType::DataChanged]));
        deployer.subscribe(events.clone());
        OnStep::attach(&deployer, 2.0, |d| {
            d.pause();
        });

        deployer
            .start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY)
            .unwrap();
        assert!(deployer.set_time_step(SECONDS_PER_DAY / 2.0));
        deployer.resume().unwrap();

        let times: Vec<f64> = events
            .events()
            .iter()
            .filter_map(|e| e.simulation_time)
            .map(|t| t.days())
            .collect();
        assert_eq!(times, vec![1.0, 2.0, 2.5, 3.0]);
        assert_eq!(deployer.step_index(), 4);
        assert_eq!(deployer.current_time(), Instant(3.0));
    }

    #[test]
    fn stop_ends_the_run_between_steps() {
        let (composition, source) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        OnStep::attach(&deployer, 1.0, |d| {
            d.stop().unwrap();
        });

        deployer
            .start(Instant(0.0), Instant(10.0), SECONDS_PER_DAY)
            .unwrap();
        assert!(!deployer.is_running());
        assert_eq!(deployer.step_index(), 1);
        assert!(source.read().unwrap().finished);
    }

    #[test]
    fn start_is_rejected_while_running() {
        let (composition, _) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        let rejected = Arc::new(AtomicBool::new(false));

        struct Restart {
            deployer: Weak<Deployer>,
            rejected: Arc<AtomicBool>,
        }
        impl EventListener for Restart {
            fn on_event(&self, _event: &Event) {
                if let Some(deployer) = self.deployer.upgrade() {
                    let res = deployer.start(Instant(0.0), Instant(1.0), SECONDS_PER_DAY);
                    if matches!(res, Err(CouplingError::Configuration(_))) {
                        self.rejected.store(true, Ordering::SeqCst);
                    }
                }
            }
            fn accepted_event_types(&self) -> Vec<EventType> {
                vec![EventType::DataChanged]
            }
        }
        deployer.subscribe(Arc::new(Restart {
            deployer: Arc::downgrade(&deployer),
            rejected: rejected.clone(),
        }));

        deployer
            .start(Instant(0.0), Instant(2.0), SECONDS_PER_DAY)
            .unwrap();
        assert!(rejected.load(Ordering::SeqCst));
        assert_eq!(deployer.current_time(), Instant(2.0));
    }

    #[test]
    fn setters_apply_while_idle() {
        let (composition, _) = constant_composition();
        let deployer = Deployer::new(composition);
        assert!(deployer.set_start_time(Instant(5.0)));
        assert!(deployer.set_end_time(Instant(6.0)));
        assert!(deployer.set_time_step(3600.0));
        assert!(!deployer.set_time_step(-1.0));
        assert!(deployer.set_blocking(false));
        assert_eq!(deployer.start_time(), Instant(5.0));
        assert_eq!(deployer.end_time(), Instant(6.0));
        assert_eq!(deployer.time_step(), 3600.0);
        assert!(!deployer.blocking());
    }

    #[test]
    fn worker_thread_run() {
        let (composition, source) = constant_composition();
        let deployer = Deployer::new(composition);
        let events = Arc::new(EventCollector::new());
        deployer.subscribe(events.clone());
        deployer.set_blocking(false);

        deployer
            .start(Instant(0.0), Instant(3.0), SECONDS_PER_DAY)
            .unwrap();
        deployer.join().unwrap();

        assert!(!deployer.is_running());
        assert_eq!(events.count(EventType::DataChanged), 3);
        assert_eq!(deployer.current_time(), Instant(3.0));
        assert!(source.read().unwrap().finished);
    }

    #[test]
    fn worker_pause_resume_and_kill() {
        let (composition, source) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        deployer.set_blocking(false);
        OnStep::attach(&deployer, 1.0, |d| {
            d.pause();
        });

        deployer
            .start(Instant(0.0), Instant(5.0), SECONDS_PER_DAY)
            .unwrap();
        // The worker exits once it observes the pause
        deployer.join().unwrap();
        assert!(deployer.is_paused());
        assert_eq!(deployer.step_index(), 1);

        deployer.kill();
        assert!(!deployer.is_running());
        // Killing does not finish the composition
        assert!(!source.read().unwrap().finished);
    }

    #[test]
    fn killed_run_loops_do_not_step_a_later_run() {
        let (composition, source) = constant_composition();
        let deployer = Arc::new(Deployer::new(composition));
        OnStep::attach(&deployer, 1.0, |d| {
            d.pause();
        });

        deployer
            .start(Instant(0.0), Instant(5.0), SECONDS_PER_DAY)
            .unwrap();
        let killed = deployer.shared.generation.load(Ordering::SeqCst);
        deployer.kill();

        deployer
            .start(Instant(0.0), Instant(5.0), SECONDS_PER_DAY)
            .unwrap();
        assert!(deployer.is_paused());
        assert_eq!(source.read().unwrap().requests, 2);

        // A loop left over from the killed run finds the deployer running and unpaused
        deployer.shared.paused.store(false, Ordering::SeqCst);
        deployer.shared.run_loop(killed).unwrap();
        assert_eq!(deployer.step_index(), 1);
        assert_eq!(source.read().unwrap().requests, 2);
        assert!(deployer.is_running());
    }

    #[test]
    fn from_config() {
        let (composition, _) = constant_composition();
        let config = DeployerConfig::from_toml_str(
            r#"
start_time = 1.0
end_time = 2.0
time_step = 43200.0
triggers = ["T"]
"#,
        )
        .unwrap();
        let deployer = Deployer::from_config(composition, &config);
        assert_eq!(deployer.triggers(), vec!["T".to_string()]);

        deployer.start_configured().unwrap();
        assert_eq!(deployer.step_index(), 2);
        assert_eq!(deployer.current_time(), Instant(2.0));
    }
}
