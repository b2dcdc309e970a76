//! Change notifications emitted by the engine.
//!
//! Consumers subscribe instead of polling the state on every render. Events
//! are published synchronously by the engine right after the state changes,
//! so a consumer that reads a snapshot after receiving an event sees at least
//! that change.

/// Subscriber fan-out.
pub mod bus;

pub use bus::{EventBus, EventStream};

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::alignment::Alignment;
use crate::scenario::DataWarning;
use crate::state::{RunId, SimulationStatus, TimelineEntry};

/// A state change notification.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// `status` moved.
    StatusChanged {
        from: SimulationStatus,
        to: SimulationStatus,
    },

    /// A scenario was loaded and playback started.
    ScenarioLoaded {
        run_id: RunId,
        scenario_id: String,
        steps: usize,
    },

    /// `current_step_index` moved.
    StepChanged {
        index: usize,
    },

    /// A step was processed and appended to the timeline.
    StepProcessed {
        entry: TimelineEntry,
    },

    /// The balance dropped.
    MoneyChanged {
        previous: u64,
        current: u64,
    },

    /// An agent's alignment changed.
    AlignmentChanged {
        agent: AgentId,
        from: Alignment,
        to: Alignment,
    },

    /// Speed multiplier changed.
    SpeedChanged {
        speed: f64,
    },

    /// Loaded scenario data is inconsistent but playable.
    DataWarning {
        warning: DataWarning,
    },

    /// All ledger state was cleared.
    Reset,
}
