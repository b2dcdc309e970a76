//! Simulation engine: the playback state machine.
//!
//! `SimulationEngine` owns the [`SimulationState`], its clock, the playback
//! driver and the event bus. Every operation is total: a call that does not
//! apply in the current status is a logged no-op, never an error.
//!
//! Time only moves through the clock. Nothing fires until [`SimulationEngine::poll`]
//! is called, so a single-threaded caller (or the worker in [`crate::runtime`])
//! decides when scheduled advancements happen.

/// Watermark and pending-timer bookkeeping.
pub mod driver;

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::agent::{AgentDisplay, AgentId, AgentMetadata, AgentRegistry};
use crate::clock::{Clock, ManualClock, SystemClock};
use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::events::{EngineEvent, EventBus, EventStream};
use crate::processor::{self, ProcessContext};
use crate::scenario::{Scenario, Step};
use crate::state::{LossReport, RunId, SimulationState, SimulationStatus, SimulationSummary, UserProfile};

use driver::{scaled_delay_ms, PendingAdvance, PlaybackDriver};

/// The scenario playback engine.
#[derive(Debug)]
pub struct SimulationEngine {
    config: EngineConfig,
    registry: AgentRegistry,
    clock: Arc<dyn Clock>,
    state: SimulationState,
    driver: PlaybackDriver,
    events: EventBus,
}

impl SimulationEngine {
    /// Creates an idle engine on the system clock.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `config` is invalid.
    pub fn new(config: EngineConfig, registry: AgentRegistry) -> Result<Self, ValidationError> {
        Self::with_clock(config, registry, Arc::new(SystemClock::new()))
    }

    /// Creates an idle engine on the given clock.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `config` is invalid.
    pub fn with_clock(
        config: EngineConfig,
        registry: AgentRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self::build(config, registry, clock))
    }

    fn build(config: EngineConfig, registry: AgentRegistry, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: SimulationState::new(config.default_speed),
            events: EventBus::new(config.event_capacity),
            driver: PlaybackDriver::new(),
            config,
            registry,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SimulationState {
        self.state.clone()
    }

    /// `steps[current_step_index]` of the loaded scenario.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.state.current_step()
    }

    /// Playing or paused.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Agent roster used for display lookups.
    #[must_use]
    pub const fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Render data for `agent` under its current alignment.
    #[must_use]
    pub fn get_agent_display_data(&self, agent: &AgentMetadata) -> AgentDisplay {
        self.registry.display(agent, self.state.alignment_of(&agent.id))
    }

    /// Render data for a registered agent, looked up by id.
    #[must_use]
    pub fn agent_display(&self, id: &AgentId) -> Option<AgentDisplay> {
        self.registry.get(id).map(|agent| self.get_agent_display_data(agent))
    }

    /// Agents of the registry in roster order, each with its current display.
    #[must_use]
    pub fn roster(&self) -> Vec<AgentDisplay> {
        self.registry.iter().map(|agent| self.get_agent_display_data(agent)).collect()
    }

    /// Agent currently mid-transformation.
    #[must_use]
    pub const fn transforming_agent(&self) -> Option<&AgentId> {
        self.state.transforming_agent.as_ref()
    }

    /// Share of the scenario reached, 0 to 100.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.state.progress_percent()
    }

    /// Money lost so far.
    #[must_use]
    pub fn loss_report(&self) -> LossReport {
        self.state.loss_report()
    }

    /// Time since the scenario started, frozen at completion.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.state.elapsed(self.clock.now_utc())
    }

    /// Post-scenario recap in the configured locale.
    #[must_use]
    pub fn summary(&self) -> Option<SimulationSummary> {
        self.state.summary(self.config.locale)
    }

    /// Clock time (ms) at which the pending timer fires.
    #[must_use]
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.driver.pending().map(|t| t.due_at_ms)
    }

    /// The armed advance timer, if any.
    #[must_use]
    pub const fn pending_timer(&self) -> Option<&PendingAdvance> {
        self.driver.pending()
    }

    /// Whether an advance timer is armed.
    #[must_use]
    pub const fn has_pending_timer(&self) -> bool {
        self.driver.pending().is_some()
    }

    /// Index of the last processed step.
    #[must_use]
    pub const fn watermark(&self) -> Option<usize> {
        self.driver.watermark()
    }

    /// Clock time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&mut self) -> EventStream {
        self.events.subscribe()
    }

    /// Events lost to full subscriber buffers.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped_events()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// idle/completed → setup.
    pub fn start_setup(&mut self) {
        match self.state.status {
            SimulationStatus::Idle | SimulationStatus::Completed => {
                self.set_status(SimulationStatus::Setup);
            }
            other => debug!(status = %other, "start_setup ignored"),
        }
    }

    /// Sets the victim's name and starting money. Only valid during setup.
    pub fn set_user_profile(&mut self, name: impl Into<String>, money: u64) {
        if self.state.status != SimulationStatus::Setup {
            debug!(status = %self.state.status, "set_user_profile ignored");
            return;
        }
        self.state.user_profile = UserProfile::new(name, money);
        debug!(money, "user profile set");
    }

    /// Loads `scenario` and starts playing it from the first step.
    ///
    /// Reloading from any status restarts playback with a new run id. A scenario
    /// that fails validation is ignored. A profile without money falls back to
    /// the scenario's victim defaults.
    pub fn load_and_play(&mut self, scenario: Arc<Scenario>) {
        let mut warnings = match scenario.validate() {
            Ok(warnings) => warnings,
            Err(err) => {
                warn!(scenario = %scenario.id, error = %err, "load_and_play ignored: invalid scenario");
                return;
            }
        };
        warnings.extend(scenario.unknown_agents(&self.registry));

        self.driver.reset();

        let profile = &mut self.state.user_profile;
        if profile.money == 0 {
            *profile = UserProfile::new(
                scenario.victim_setup.default_name.clone(),
                scenario.victim_setup.default_money,
            );
        } else {
            if profile.name.trim().is_empty() {
                profile.name.clone_from(&scenario.victim_setup.default_name);
            }
            profile.money_remaining = profile.money;
        }

        let run_id = RunId::new();
        self.state.run_id = Some(run_id);
        self.state.current_scenario = Some(Arc::clone(&scenario));
        self.state.current_step_index = Some(0);
        self.state.timeline.clear();
        self.state.agent_alignments.clear();
        self.state.transforming_agent = None;
        self.state.started_at = Some(self.clock.now_utc());
        self.state.completed_at = None;

        info!(
            scenario = %scenario.id,
            run_id = %run_id,
            steps = scenario.len(),
            money = self.state.user_profile.money,
            "scenario loaded"
        );

        self.events.publish(EngineEvent::ScenarioLoaded {
            run_id,
            scenario_id: scenario.id.clone(),
            steps: scenario.len(),
        });
        for warning in warnings {
            warn!(scenario = %scenario.id, %warning, "scenario data warning");
            self.events.publish(EngineEvent::DataWarning { warning });
        }
        self.set_status(SimulationStatus::Playing);
        self.events.publish(EngineEvent::StepChanged { index: 0 });
        self.drive();
    }

    /// Processes `step` if it is the current, not yet processed step.
    ///
    /// Valid while playing or paused. Processing a reveal step pauses.
    pub fn process_step(&mut self, step: &Step) {
        if !self.is_active() {
            debug!(step = %step.id, status = %self.state.status, "process_step ignored: not active");
            return;
        }
        let Some(index) = self.state.current_step_index else {
            return;
        };
        let is_current = self.current_step().is_some_and(|current| current.id == step.id);
        if !is_current || !self.driver.needs_processing(index) {
            debug!(step = %step.id, index, "process_step ignored: not the pending current step");
            return;
        }

        self.process_current(index);
        self.drive();
    }

    /// Moves to the next step. On the last step this is a no-op; the driver
    /// completes the scenario instead.
    ///
    /// While playing the new step is processed immediately; while paused it is
    /// processed on resume or by [`Self::step_once`].
    pub fn advance_step(&mut self) {
        if !self.is_active() {
            debug!(status = %self.state.status, "advance_step ignored: not active");
            return;
        }
        if self.state.is_last_step() {
            debug!("advance_step ignored: already on the last step");
            return;
        }
        self.move_to_next_step();
        self.drive();
    }

    /// playing → paused. Cancels the pending timer.
    pub fn pause(&mut self) {
        if self.state.status != SimulationStatus::Playing {
            debug!(status = %self.state.status, "pause ignored");
            return;
        }
        self.cancel_timer();
        self.set_status(SimulationStatus::Paused);
    }

    /// paused → playing.
    ///
    /// The current step gets its full scaled duration again; time already spent
    /// on it before the pause is not credited.
    pub fn resume(&mut self) {
        if self.state.status != SimulationStatus::Paused {
            debug!(status = %self.state.status, "resume ignored");
            return;
        }
        self.set_status(SimulationStatus::Playing);
        self.drive();
    }

    /// playing/paused → completed.
    pub fn complete(&mut self) {
        if !self.is_active() {
            debug!(status = %self.state.status, "complete ignored");
            return;
        }
        self.cancel_timer();
        self.state.completed_at = Some(self.clock.now_utc());
        let loss = self.state.loss_report();
        info!(
            scenario = self.state.current_scenario.as_ref().map_or("", |s| s.id.as_str()),
            events = self.state.timeline.len(),
            lost = loss.lost,
            loss_percent = loss.loss_percent,
            "scenario completed"
        );
        self.set_status(SimulationStatus::Completed);
    }

    /// Any status → idle, clearing the scenario, ledger, alignments and timeline.
    ///
    /// The speed setting survives. Calling it twice is the same as calling it once.
    pub fn reset(&mut self) {
        self.reset_into(SimulationStatus::Idle);
    }

    /// Like [`Self::reset`] but lands directly in setup.
    pub fn reset_to_setup(&mut self) {
        self.reset_into(SimulationStatus::Setup);
    }

    /// Changes the speed multiplier.
    ///
    /// The request is clamped into the configured range; non-finite or
    /// non-positive values are ignored. A pending timer is re-armed from now
    /// with the new scaling.
    pub fn set_speed(&mut self, speed: f64) {
        let Some(speed) = self.config.clamp_speed(speed) else {
            warn!(speed, "set_speed ignored: speed must be positive and finite");
            return;
        };
        if (self.state.speed - speed).abs() < f64::EPSILON {
            return;
        }
        self.state.speed = speed;
        debug!(speed, "speed changed");
        self.events.publish(EngineEvent::SpeedChanged { speed });
        if self.driver.pending().is_some() {
            self.drive();
        }
    }

    /// Cancels the pending advancement, if any.
    pub fn clear_timer(&mut self) {
        self.cancel_timer();
    }

    /// Manual single step.
    ///
    /// Pauses, then moves past the current step if it has been processed (or
    /// completes on the last step), then processes the new current step. Leaves
    /// no timer pending.
    pub fn step_once(&mut self) {
        if !self.is_active() {
            debug!(status = %self.state.status, "step_once ignored: not active");
            return;
        }
        self.cancel_timer();
        self.set_status(SimulationStatus::Paused);

        let Some(mut index) = self.state.current_step_index else {
            return;
        };
        if !self.driver.needs_processing(index) {
            if self.state.is_last_step() {
                self.complete();
                return;
            }
            index = self.move_to_next_step();
        }
        self.process_current(index);
    }

    /// Fires the pending timer if its deadline has passed.
    ///
    /// Returns whether a timer fired.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_ms();
        let Some(timer) = self.driver.take_due(now) else {
            return false;
        };
        if self.state.status != SimulationStatus::Playing || self.state.current_step_index != Some(timer.step_index) {
            debug!(token = timer.token, "stale timer discarded");
            return false;
        }
        debug!(token = timer.token, step_index = timer.step_index, now, "timer fired");

        if self.state.is_last_step() {
            self.complete();
        } else {
            self.move_to_next_step();
            self.drive();
        }
        true
    }

    /// Fast-forwards `clock` from deadline to deadline until the scenario completes.
    ///
    /// Reveal pauses are dismissed immediately. `clock` must be the clock this
    /// engine was built with. Stops after `max_polls` polls; returns the number
    /// of timers that fired.
    pub fn run_to_completion(&mut self, clock: &ManualClock, max_polls: usize) -> usize {
        let mut fired = 0;
        for _ in 0..max_polls {
            match self.state.status {
                SimulationStatus::Paused => self.resume(),
                SimulationStatus::Playing => {}
                _ => break,
            }
            let Some(deadline) = self.next_deadline_ms() else {
                break;
            };
            clock.advance_to(deadline);
            if self.poll() {
                fired += 1;
            }
        }
        fired
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn set_status(&mut self, to: SimulationStatus) {
        let from = self.state.status;
        if from == to {
            return;
        }
        self.state.status = to;
        debug!(%from, %to, "status changed");
        self.events.publish(EngineEvent::StatusChanged { from, to });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.driver.cancel() {
            debug!(token = timer.token, step_index = timer.step_index, "timer cancelled");
        }
    }

    fn reset_into(&mut self, status: SimulationStatus) {
        self.cancel_timer();
        self.driver.reset();

        let speed = self.state.speed;
        let previous = std::mem::replace(&mut self.state, SimulationState::new(speed));
        self.state.status = previous.status;

        info!(to = %status, "simulation reset");
        self.events.publish(EngineEvent::Reset);
        self.set_status(status);
    }

    /// Increments the index and returns the new one. Caller checks bounds.
    fn move_to_next_step(&mut self) -> usize {
        let next = self.state.current_step_index.map_or(0, |i| i + 1);
        self.state.current_step_index = Some(next);
        self.events.publish(EngineEvent::StepChanged { index: next });
        next
    }

    /// Runs the step processor on step `index` and records it in the watermark.
    /// Returns whether the step forces a pause.
    fn process_current(&mut self, index: usize) -> bool {
        let Some(scenario) = self.state.current_scenario.clone() else {
            return false;
        };
        let Some(step) = scenario.step(index) else {
            return false;
        };

        let ctx = ProcessContext {
            step_index: index,
            locale: self.config.locale,
            unmask_on_reveal: self.config.unmask_on_reveal,
            now: self.clock.now_utc(),
        };
        let delta = processor::compute(&self.state, step, ctx);
        processor::apply(&mut self.state, &delta);
        self.driver.mark_processed(index);

        debug!(
            index,
            step = %step.id,
            step_type = %step.step_type,
            agent = %step.agent_id,
            money_remaining = self.state.user_profile.money_remaining,
            "step processed"
        );

        self.events.publish(EngineEvent::StepProcessed { entry: delta.entry });
        if let Some(money) = delta.money {
            self.events.publish(EngineEvent::MoneyChanged {
                previous: money.previous,
                current: money.current,
            });
        }
        for change in delta.alignment_changes {
            self.events.publish(EngineEvent::AlignmentChanged {
                agent: change.agent,
                from: change.from,
                to: change.to,
            });
        }

        if delta.forces_pause {
            self.cancel_timer();
            self.set_status(SimulationStatus::Paused);
        }
        delta.forces_pause
    }

    /// One driver tick: tear down the pending timer, process the current step
    /// if the watermark has not reached it, then arm the next advancement.
    fn drive(&mut self) {
        self.cancel_timer();
        if self.state.status != SimulationStatus::Playing {
            return;
        }
        let Some(index) = self.state.current_step_index else {
            return;
        };
        let Some(duration_ms) = self.current_step().map(|s| s.duration_ms) else {
            return;
        };

        if self.driver.needs_processing(index) && self.process_current(index) {
            return;
        }

        let delay = scaled_delay_ms(duration_ms, self.state.speed);
        let due_at_ms = self.clock.now_ms().saturating_add(delay);
        let timer = self.driver.arm(index, due_at_ms);
        debug!(token = timer.token, step_index = index, delay_ms = delay, "timer armed");
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::build(
            EngineConfig::default(),
            AgentRegistry::builtin(),
            Arc::new(SystemClock::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::Alignment;
    use crate::scenario::{Difficulty, FraudCategory, LocalizedText, StepType, VictimSetup};

    fn scenario(steps: Vec<Step>) -> Arc<Scenario> {
        Arc::new(Scenario {
            id: "unit-001".to_string(),
            title: LocalizedText::new("ทดสอบ", "Unit"),
            category: FraudCategory::CallCenter,
            difficulty: Difficulty::Beginner,
            estimated_duration_secs: 10,
            description: LocalizedText::default(),
            involved_agents: vec![AgentId::from("a0"), AgentId::from("a1")],
            evil_agents: vec![AgentId::from("a0")],
            victim_setup: VictimSetup {
                default_name: "Somchai".to_string(),
                default_money: 10_000,
                context: LocalizedText::default(),
            },
            steps,
            money_at_risk: 0,
            educational_points: Vec::new(),
            real_world_cases: Vec::new(),
        })
    }

    fn three_steps() -> Arc<Scenario> {
        scenario(vec![
            Step::new("s0", 1, StepType::Action, "a0", Alignment::Good, 1_000),
            Step::new("s1", 2, StepType::MoneyFlow, "a1", Alignment::Good, 2_000).with_money_change(-500),
            Step::new("s2", 3, StepType::Education, "a1", Alignment::Good, 500),
        ])
    }

    fn engine() -> (SimulationEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let engine =
            SimulationEngine::with_clock(EngineConfig::default(), AgentRegistry::builtin(), clock.clone()).unwrap();
        (engine, clock)
    }

    #[test]
    fn setup_then_load_processes_first_step_and_arms_timer() {
        let (mut engine, _clock) = engine();
        engine.start_setup();
        assert_eq!(engine.state().status, SimulationStatus::Setup);

        engine.set_user_profile("Nok", 2_000);
        engine.load_and_play(three_steps());

        let state = engine.state();
        assert_eq!(state.status, SimulationStatus::Playing);
        assert_eq!(state.current_step_index, Some(0));
        assert_eq!(state.timeline.len(), 1);
        assert_eq!(state.user_profile.name, "Nok");
        assert_eq!(state.user_profile.money_remaining, 2_000);
        assert_eq!(engine.watermark(), Some(0));
        assert_eq!(engine.next_deadline_ms(), Some(1_000));
    }

    #[test]
    fn load_without_profile_uses_victim_defaults() {
        let (mut engine, _clock) = engine();
        engine.load_and_play(three_steps());
        assert_eq!(engine.state().user_profile.name, "Somchai");
        assert_eq!(engine.state().user_profile.money, 10_000);
    }

    #[test]
    fn invalid_scenario_is_ignored() {
        let (mut engine, _clock) = engine();
        engine.start_setup();
        engine.load_and_play(scenario(Vec::new()));
        assert_eq!(engine.state().status, SimulationStatus::Setup);
        assert!(engine.state().current_scenario.is_none());
    }

    #[test]
    fn timers_advance_and_complete_on_last_step() {
        let (mut engine, clock) = engine();
        engine.load_and_play(three_steps());

        clock.advance(999);
        assert!(!engine.poll());
        clock.advance(1);
        assert!(engine.poll());
        assert_eq!(engine.state().current_step_index, Some(1));
        assert_eq!(engine.state().user_profile.money_remaining, 9_500);

        clock.advance(2_000);
        assert!(engine.poll());
        clock.advance(500);
        assert!(engine.poll());

        assert_eq!(engine.state().status, SimulationStatus::Completed);
        assert_eq!(engine.state().current_step_index, Some(2));
        assert_eq!(engine.state().timeline.len(), 3);
        assert!(!engine.has_pending_timer());
        assert!(engine.state().completed_at.is_some());
    }

    #[test]
    fn speed_change_rearms_without_reprocessing() {
        let (mut engine, clock) = engine();
        engine.load_and_play(three_steps());
        clock.advance(400);

        engine.set_speed(2.0);
        assert_eq!(engine.next_deadline_ms(), Some(900));
        assert_eq!(engine.state().timeline.len(), 1);

        engine.set_speed(f64::NAN);
        engine.set_speed(-1.0);
        assert!((engine.state().speed - 2.0).abs() < f64::EPSILON);

        engine.set_speed(100.0);
        assert!((engine.state().speed - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resume_restarts_full_scaled_duration() {
        let (mut engine, clock) = engine();
        engine.load_and_play(three_steps());

        clock.advance(900);
        engine.pause();
        assert!(!engine.has_pending_timer());

        clock.advance(5_000);
        assert!(!engine.poll());
        engine.resume();
        assert_eq!(engine.next_deadline_ms(), Some(5_900 + 1_000));
        assert_eq!(engine.state().timeline.len(), 1);
    }

    #[test]
    fn reveal_pauses_without_timer_and_unmasks() {
        let (mut engine, clock) = engine();
        engine.load_and_play(scenario(vec![
            Step::new("t", 1, StepType::Transformation, "a0", Alignment::Evil, 100),
            Step::new("r", 2, StepType::Reveal, "a1", Alignment::Good, 100),
            Step::new("e", 3, StepType::Education, "a1", Alignment::Good, 100),
        ]));
        assert_eq!(engine.state().alignment_of(&AgentId::from("a0")), Alignment::Evil);

        clock.advance(100);
        engine.poll();
        assert_eq!(engine.state().status, SimulationStatus::Paused);
        assert!(!engine.has_pending_timer());
        assert_eq!(engine.state().alignment_of(&AgentId::from("a0")), Alignment::Good);

        engine.resume();
        assert_eq!(engine.state().timeline.len(), 2);
        assert_eq!(engine.next_deadline_ms(), Some(200));
    }

    #[test]
    fn step_once_pauses_and_walks_forward() {
        let (mut engine, _clock) = engine();
        engine.load_and_play(three_steps());

        engine.step_once();
        assert_eq!(engine.state().status, SimulationStatus::Paused);
        assert_eq!(engine.state().current_step_index, Some(1));
        assert_eq!(engine.state().timeline.len(), 2);
        assert!(!engine.has_pending_timer());

        engine.step_once();
        engine.step_once();
        assert_eq!(engine.state().status, SimulationStatus::Completed);
        assert_eq!(engine.state().timeline.len(), 3);
    }

    #[test]
    fn advance_while_paused_defers_processing() {
        let (mut engine, _clock) = engine();
        engine.load_and_play(three_steps());
        engine.pause();

        engine.advance_step();
        assert_eq!(engine.state().current_step_index, Some(1));
        assert_eq!(engine.state().timeline.len(), 1);

        let step = engine.current_step().cloned().unwrap();
        engine.process_step(&step);
        engine.process_step(&step);
        assert_eq!(engine.state().timeline.len(), 2);
        assert_eq!(engine.state().status, SimulationStatus::Paused);
    }

    #[test]
    fn process_step_rejects_other_steps() {
        let (mut engine, _clock) = engine();
        engine.process_step(&Step::new("s0", 1, StepType::Action, "a0", Alignment::Good, 1));
        assert!(engine.state().timeline.is_empty());

        let scenario = three_steps();
        engine.load_and_play(Arc::clone(&scenario));
        engine.process_step(&scenario.steps[2]);
        assert_eq!(engine.state().timeline.len(), 1);
    }

    #[test]
    fn reset_clears_everything_and_is_idempotent() {
        let (mut engine, clock) = engine();
        engine.set_speed(2.0);
        engine.load_and_play(three_steps());
        clock.advance(500);
        engine.poll();

        engine.reset();
        let once = engine.snapshot();
        engine.reset();
        assert_eq!(engine.snapshot(), once);

        assert_eq!(once.status, SimulationStatus::Idle);
        assert!(once.timeline.is_empty());
        assert!(once.current_scenario.is_none());
        assert_eq!(once.current_step_index, None);
        assert!((once.speed - 2.0).abs() < f64::EPSILON);
        assert!(!engine.has_pending_timer());

        engine.reset_to_setup();
        assert_eq!(engine.state().status, SimulationStatus::Setup);
    }

    #[test]
    fn clear_timer_is_idempotent() {
        let (mut engine, clock) = engine();
        engine.clear_timer();
        engine.load_and_play(three_steps());
        engine.clear_timer();
        engine.clear_timer();
        clock.advance(10_000);
        assert!(!engine.poll());
        assert_eq!(engine.state().current_step_index, Some(0));
    }

    #[test]
    fn events_follow_state_changes() {
        let (mut engine, clock) = engine();
        let stream = engine.subscribe();
        engine.start_setup();
        engine.load_and_play(three_steps());
        clock.advance(1_000);
        engine.poll();

        let events = stream.drain();
        assert!(matches!(
            events[0],
            EngineEvent::StatusChanged {
                from: SimulationStatus::Idle,
                to: SimulationStatus::Setup
            }
        ));
        assert!(events.iter().any(|e| matches!(e, EngineEvent::ScenarioLoaded { steps: 3, .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, EngineEvent::MoneyChanged { previous: 10_000, current: 9_500 })));
        let processed = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::StepProcessed { .. }))
            .count();
        assert_eq!(processed, 2);
    }

    #[test]
    fn run_to_completion_fast_forwards() {
        let (mut engine, clock) = engine();
        engine.load_and_play(three_steps());
        let fired = engine.run_to_completion(&clock, 100);
        assert_eq!(fired, 3);
        assert_eq!(engine.state().status, SimulationStatus::Completed);
        assert_eq!(clock.now_ms(), 3_500);
        assert_eq!(engine.elapsed().map(|d| d.num_milliseconds()), Some(3_500));
        assert!((engine.progress_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn run_to_completion_is_bounded_on_a_foreign_clock() {
        let (mut engine, _clock) = engine();
        engine.load_and_play(three_steps());

        let other = ManualClock::new();
        assert_eq!(engine.run_to_completion(&other, 50), 0);
        assert_eq!(engine.state().status, SimulationStatus::Playing);
        assert_eq!(engine.state().current_step_index, Some(0));
    }

    #[test]
    fn zero_duration_step_loads_and_plays() {
        let (mut engine, _clock) = engine();
        let stream = engine.subscribe();
        engine.start_setup();
        engine.load_and_play(scenario(vec![
            Step::new("z0", 1, StepType::Action, "a0", Alignment::Good, 0),
            Step::new("z1", 2, StepType::Education, "a1", Alignment::Good, 100),
        ]));
        assert_eq!(engine.state().status, SimulationStatus::Playing);
        assert_eq!(engine.next_deadline_ms(), Some(0));
        assert!(stream.drain().iter().any(|e| matches!(e, EngineEvent::DataWarning { .. })));

        assert!(engine.poll());
        assert_eq!(engine.state().current_step_index, Some(1));
        assert_eq!(engine.state().timeline.len(), 2);
    }

    #[test]
    fn reveal_owner_declared_evil_ends_good() {
        let (mut engine, _clock) = engine();
        engine.load_and_play(scenario(vec![Step::new("r", 1, StepType::Reveal, "a0", Alignment::Evil, 100)]));
        assert_eq!(engine.state().status, SimulationStatus::Paused);
        assert_eq!(engine.state().alignment_of(&AgentId::from("a0")), Alignment::Good);
    }

    #[test]
    fn display_data_follows_alignment() {
        let (mut engine, _clock) = engine();
        let a0 = AgentId::from("a0");
        let base = engine.agent_display(&a0).unwrap();
        assert!(!base.shows_evil_identity());

        engine.load_and_play(scenario(vec![
            Step::new("t", 1, StepType::Transformation, "a0", Alignment::Transitioning, 100),
            Step::new("e", 2, StepType::Dialogue, "a0", Alignment::Evil, 100),
        ]));
        assert_eq!(engine.transforming_agent(), Some(&a0));
        let turned = engine.agent_display(&a0).unwrap();
        assert!(turned.shows_evil_identity());
        assert_ne!(turned.name, base.name);
    }
}
