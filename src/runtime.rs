//! Threaded playback runtime.
//!
//! [`SimulationEngine`] is single-owner and only moves when polled. This
//! module gives it a home: one worker thread owns the engine, receives
//! commands over a bounded channel and sleeps exactly until the next
//! scheduled advancement. UI code talks to it through a cloneable
//! [`PlaybackHandle`] and listens to [`EventStream`]s.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::agent::{AgentDisplay, AgentId, AgentRegistry};
use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, RuntimeConfig};
use crate::engine::SimulationEngine;
use crate::error::{RuntimeError, SimResult};
use crate::events::EventStream;
use crate::scenario::{Scenario, Step};
use crate::state::{SimulationState, SimulationSummary};

enum Command {
    StartSetup,
    SetUserProfile { name: String, money: u64 },
    LoadAndPlay { scenario: Arc<Scenario> },
    ProcessStep { step: Step },
    AdvanceStep,
    StepOnce,
    Pause,
    Resume,
    Complete,
    Reset,
    ResetToSetup,
    SetSpeed { speed: f64 },
    ClearTimer,

    Tick { reply: Sender<bool> },
    Snapshot { reply: Sender<SimulationState> },
    AgentDisplay { id: AgentId, reply: Sender<Option<AgentDisplay>> },
    Summary { reply: Sender<Option<SimulationSummary>> },
    Subscribe { reply: Sender<EventStream> },

    Shutdown,
}

/// Owns the worker thread. Dropping it stops the worker and joins it.
pub struct PlaybackRuntime {
    handle: PlaybackHandle,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackRuntime {
    /// Starts a worker owning a fresh engine on the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid or the thread
    /// cannot be spawned.
    pub fn spawn(engine: EngineConfig, runtime: RuntimeConfig, registry: AgentRegistry) -> SimResult<Self> {
        Self::spawn_with_clock(engine, runtime, registry, Arc::new(SystemClock::new()))
    }

    /// Starts a worker owning a fresh engine on `clock`.
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid or the thread
    /// cannot be spawned.
    pub fn spawn_with_clock(
        engine: EngineConfig,
        runtime: RuntimeConfig,
        registry: AgentRegistry,
        clock: Arc<dyn Clock>,
    ) -> SimResult<Self> {
        runtime.validate()?;
        let engine = SimulationEngine::with_clock(engine, registry, clock)?;

        let capacity = runtime.command_queue_capacity;
        let (tx, rx) = bounded::<Command>(capacity);

        let worker = thread::Builder::new()
            .name("fraudsim-playback".to_string())
            .spawn(move || run_worker(engine, rx))
            .map_err(|e| RuntimeError::Spawn { message: e.to_string() })?;

        Ok(Self {
            handle: PlaybackHandle {
                tx,
                capacity,
                reply_timeout: Duration::from_millis(runtime.reply_timeout_ms),
            },
            worker: Some(worker),
        })
    }

    /// A handle for issuing commands. Handles outliving the runtime report
    /// `Disconnected`.
    #[must_use]
    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }
}

impl std::fmt::Debug for PlaybackRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackRuntime")
            .field("handle", &self.handle)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl std::ops::Deref for PlaybackRuntime {
    type Target = PlaybackHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for PlaybackRuntime {
    fn drop(&mut self) {
        // Blocking send: the worker drains queued commands before it sees this.
        let _ = self.handle.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(mut engine: SimulationEngine, rx: Receiver<Command>) {
    debug!("playback worker started");
    loop {
        let wait = engine
            .next_deadline_ms()
            .map(|due| Duration::from_millis(due.saturating_sub(engine.now_ms())));

        let received = match wait {
            Some(timeout) => select! {
                recv(rx) -> msg => Some(msg),
                default(timeout) => None,
            },
            None => Some(rx.recv()),
        };

        match received {
            Some(Ok(Command::Shutdown) | Err(_)) => break,
            Some(Ok(cmd)) => handle_command(&mut engine, cmd),
            None => {}
        }
        engine.poll();
    }
    debug!("playback worker stopped");
}

fn handle_command(engine: &mut SimulationEngine, cmd: Command) {
    match cmd {
        Command::StartSetup => engine.start_setup(),
        Command::SetUserProfile { name, money } => engine.set_user_profile(name, money),
        Command::LoadAndPlay { scenario } => engine.load_and_play(scenario),
        Command::ProcessStep { step } => engine.process_step(&step),
        Command::AdvanceStep => engine.advance_step(),
        Command::StepOnce => engine.step_once(),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Complete => engine.complete(),
        Command::Reset => engine.reset(),
        Command::ResetToSetup => engine.reset_to_setup(),
        Command::SetSpeed { speed } => engine.set_speed(speed),
        Command::ClearTimer => engine.clear_timer(),
        Command::Tick { reply } => {
            let _ = reply.send(engine.poll());
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        Command::AgentDisplay { id, reply } => {
            let _ = reply.send(engine.agent_display(&id));
        }
        Command::Summary { reply } => {
            let _ = reply.send(engine.summary());
        }
        Command::Subscribe { reply } => {
            let _ = reply.send(engine.subscribe());
        }
        Command::Shutdown => {}
    }
}

/// Cloneable command sender for a [`PlaybackRuntime`].
///
/// Commands are queued without blocking; queries wait for the worker's reply
/// up to the configured timeout.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: Sender<Command>,
    capacity: usize,
    reply_timeout: Duration,
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("capacity", &self.capacity)
            .field("reply_timeout", &self.reply_timeout)
            .finish_non_exhaustive()
    }
}

impl PlaybackHandle {
    fn submit(&self, cmd: Command) -> Result<(), RuntimeError> {
        match self.tx.try_send(cmd) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RuntimeError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(RuntimeError::Disconnected {
                channel: "commands".to_string(),
            }),
        }
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (reply, rx) = bounded::<T>(1);
        self.submit(make(reply))?;
        rx.recv_timeout(self.reply_timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => RuntimeError::Timeout {
                duration_ms: self.reply_timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            },
            RecvTimeoutError::Disconnected => RuntimeError::Disconnected {
                channel: "reply".to_string(),
            },
        })
    }

    /// See [`SimulationEngine::start_setup`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn start_setup(&self) -> Result<(), RuntimeError> {
        self.submit(Command::StartSetup)
    }

    /// See [`SimulationEngine::set_user_profile`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn set_user_profile(&self, name: impl Into<String>, money: u64) -> Result<(), RuntimeError> {
        self.submit(Command::SetUserProfile {
            name: name.into(),
            money,
        })
    }

    /// See [`SimulationEngine::load_and_play`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn load_and_play(&self, scenario: Arc<Scenario>) -> Result<(), RuntimeError> {
        self.submit(Command::LoadAndPlay { scenario })
    }

    /// See [`SimulationEngine::process_step`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn process_step(&self, step: Step) -> Result<(), RuntimeError> {
        self.submit(Command::ProcessStep { step })
    }

    /// See [`SimulationEngine::advance_step`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn advance_step(&self) -> Result<(), RuntimeError> {
        self.submit(Command::AdvanceStep)
    }

    /// See [`SimulationEngine::step_once`].
    ///
    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn step_once(&self) -> Result<(), RuntimeError> {
        self.submit(Command::StepOnce)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn pause(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Pause)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn resume(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Resume)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn complete(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Complete)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn reset(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Reset)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn reset_to_setup(&self) -> Result<(), RuntimeError> {
        self.submit(Command::ResetToSetup)
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn set_speed(&self, speed: f64) -> Result<(), RuntimeError> {
        self.submit(Command::SetSpeed { speed })
    }

    /// # Errors
    ///
    /// `QueueFull` or `Disconnected`.
    pub fn clear_timer(&self) -> Result<(), RuntimeError> {
        self.submit(Command::ClearTimer)
    }

    /// Fires the pending timer now if it is due; returns whether it fired.
    ///
    /// # Errors
    ///
    /// `QueueFull`, `Disconnected` or `Timeout`.
    pub fn tick(&self) -> Result<bool, RuntimeError> {
        self.request(|reply| Command::Tick { reply })
    }

    /// Copy of the engine state after all previously queued commands.
    ///
    /// # Errors
    ///
    /// `QueueFull`, `Disconnected` or `Timeout`.
    pub fn snapshot(&self) -> Result<SimulationState, RuntimeError> {
        self.request(|reply| Command::Snapshot { reply })
    }

    /// # Errors
    ///
    /// `QueueFull`, `Disconnected` or `Timeout`.
    pub fn agent_display(&self, id: impl Into<AgentId>) -> Result<Option<AgentDisplay>, RuntimeError> {
        let id = id.into();
        self.request(|reply| Command::AgentDisplay { id, reply })
    }

    /// # Errors
    ///
    /// `QueueFull`, `Disconnected` or `Timeout`.
    pub fn summary(&self) -> Result<Option<SimulationSummary>, RuntimeError> {
        self.request(|reply| Command::Summary { reply })
    }

    /// Subscribe to engine events.
    ///
    /// # Errors
    ///
    /// `QueueFull`, `Disconnected` or `Timeout`.
    pub fn subscribe(&self) -> Result<EventStream, RuntimeError> {
        self.request(|reply| Command::Subscribe { reply })
    }
}
