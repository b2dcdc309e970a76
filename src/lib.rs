//! # fraudsim - Scripted fraud-awareness scenario player
//!
//! fraudsim walks a user through a scripted scam, one beat at a time. A
//! scenario is an ordered list of steps; each step belongs to an agent,
//! carries a display duration and may drain the victim's fictional money or
//! turn an agent evil. Reveal steps pause playback so the lesson can sink in.
//!
//! ## Core Concepts
//!
//! - **Scenario**: immutable, pre-authored script of steps
//! - **SimulationEngine**: the playback state machine and its single advancement timer
//! - **Step processor**: pure `(state, step) -> delta` ledger rules
//! - **EventBus**: change notifications for UI layers
//! - **PlaybackRuntime**: a worker thread that owns an engine and keeps real time
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fraudsim::{AgentRegistry, EngineConfig, ManualClock, ScenarioCatalog, SimulationEngine};
//!
//! let catalog = ScenarioCatalog::builtin()?;
//! let clock = Arc::new(ManualClock::new());
//! let mut engine = SimulationEngine::with_clock(EngineConfig::default(), AgentRegistry::builtin(), clock.clone())?;
//!
//! engine.start_setup();
//! engine.set_user_profile("Somchai", 500_000);
//! engine.load_and_play(catalog.require("call-center-001")?);
//!
//! // Jump from deadline to deadline until the scenario completes.
//! engine.run_to_completion(&clock, 1_000);
//! println!("{:?}", engine.loss_report());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod agent;
pub mod alignment;
pub mod catalog;
pub mod error;
pub mod scenario;
pub mod state;

// Playback
pub mod clock;
pub mod config;
pub mod engine;
pub mod events;
pub mod processor;
pub mod runtime;

pub use agent::{AgentDisplay, AgentId, AgentMetadata, AgentRegistry, AgentRole, EvilVariant};
pub use alignment::Alignment;
pub use catalog::ScenarioCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, RuntimeConfig};
pub use engine::SimulationEngine;
pub use error::{CatalogError, RuntimeError, SimError, SimResult, ValidationError};
pub use events::{EngineEvent, EventBus, EventStream};
pub use runtime::{PlaybackHandle, PlaybackRuntime};
pub use scenario::{DataWarning, Locale, LocalizedText, Scenario, Step, StepType};
pub use state::{LossReport, SimulationState, SimulationStatus, SimulationSummary, TimelineEntry, UserProfile};
