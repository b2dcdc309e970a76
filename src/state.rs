//! Runtime simulation state and its derived read models.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::alignment::Alignment;
use crate::scenario::{Locale, Scenario, Step, StepType};

/// Playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    /// Nothing loaded.
    #[default]
    Idle,
    /// Collecting name, money and scenario choice.
    Setup,
    /// Steps advance on their own.
    Playing,
    /// Position held; no timer pending.
    Paused,
    /// Terminal until reset.
    Completed,
}

impl SimulationStatus {
    /// Playing or paused.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Setup => "setup",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one play of a scenario. A new id is minted by every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Mints a random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The victim's fictional account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Starting total, fixed at setup.
    pub money: u64,
    /// Running balance. Only ever decreases, except on reset or reload.
    pub money_remaining: u64,
}

impl UserProfile {
    /// A profile with the full balance remaining.
    #[must_use]
    pub fn new(name: impl Into<String>, money: u64) -> Self {
        Self {
            name: name.into(),
            money,
            money_remaining: money,
        }
    }
}

/// One processed step in the timeline log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Array index of the step within the scenario.
    pub step_index: usize,
    /// Id of the processed step.
    pub step_id: String,
    /// Kind of the processed step.
    pub step_type: StepType,
    /// Agent that owns the step.
    pub agent_id: AgentId,
    /// Step content in the configured locale.
    pub content: String,
    /// Money delta as authored, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_change: Option<i64>,
    /// When the step was processed.
    pub timestamp: DateTime<Utc>,
}

/// The engine's full mutable state, exposed to consumers as a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Lifecycle status.
    pub status: SimulationStatus,
    /// Id of the current play. `None` until a scenario is loaded.
    pub run_id: Option<RunId>,
    /// Scenario being played.
    pub current_scenario: Option<Arc<Scenario>>,
    /// Array index of the current step. `None` before play starts.
    pub current_step_index: Option<usize>,
    /// Playback multiplier, clamped to the configured range.
    pub speed: f64,
    /// The victim's account.
    pub user_profile: UserProfile,
    /// Only agents touched by an alignment change appear here; absence means good.
    pub agent_alignments: BTreeMap<AgentId, Alignment>,
    /// Agent currently mid-transformation, if any.
    pub transforming_agent: Option<AgentId>,
    /// Processed steps in order, at most one per step index.
    pub timeline: Vec<TimelineEntry>,
    /// Wall time of the load that started this play.
    pub started_at: Option<DateTime<Utc>>,
    /// Wall time of completion.
    pub completed_at: Option<DateTime<Utc>>,
}

impl SimulationState {
    /// A fresh idle state.
    #[must_use]
    pub fn new(speed: f64) -> Self {
        Self {
            status: SimulationStatus::Idle,
            run_id: None,
            current_scenario: None,
            current_step_index: None,
            speed,
            user_profile: UserProfile::default(),
            agent_alignments: BTreeMap::new(),
            transforming_agent: None,
            timeline: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// The step at the current index, if a scenario is loaded and the index is in range.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        let scenario = self.current_scenario.as_ref()?;
        scenario.step(self.current_step_index?)
    }

    /// Playing or paused.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// An agent's alignment; absent entries are good.
    #[must_use]
    pub fn alignment_of(&self, agent: &AgentId) -> Alignment {
        self.agent_alignments.get(agent).copied().unwrap_or_default()
    }

    /// Whether the current index is the scenario's final step.
    #[must_use]
    pub fn is_last_step(&self) -> bool {
        match (&self.current_scenario, self.current_step_index) {
            (Some(s), Some(i)) => s.last_index() == Some(i),
            _ => false,
        }
    }

    /// Playback progress in percent.
    ///
    /// 100 once completed; otherwise the share of steps reached, counting the current one.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.status == SimulationStatus::Completed {
            return 100.0;
        }
        let total = self.current_scenario.as_ref().map_or(0, |s| s.len());
        match self.current_step_index {
            Some(i) if total > 0 => (((i + 1) as f64 / total as f64) * 100.0).min(100.0),
            _ => 0.0,
        }
    }

    /// Money lost so far.
    #[must_use]
    pub fn loss_report(&self) -> LossReport {
        LossReport::new(self.user_profile.money, self.user_profile.money_remaining)
    }

    /// Time from start to completion, or to `now` while still running.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or(now);
        Some(end - start)
    }

    /// Post-scenario recap.
    #[must_use]
    pub fn summary(&self, locale: Locale) -> Option<SimulationSummary> {
        let scenario = self.current_scenario.as_ref()?;
        Some(SimulationSummary {
            scenario_id: scenario.id.clone(),
            title: scenario.title.get(locale).to_string(),
            status: self.status,
            victim_name: self.user_profile.name.clone(),
            loss: self.loss_report(),
            event_count: self.timeline.len(),
            steps_total: scenario.len(),
            duration_ms: self
                .started_at
                .zip(self.completed_at)
                .map(|(start, end)| (end - start).num_milliseconds().max(0)),
            educational_points: scenario
                .educational_points
                .iter()
                .map(|p| p.get(locale).to_string())
                .collect(),
            real_world_cases: scenario.real_world_cases.clone(),
        })
    }
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Ledger summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossReport {
    /// Balance at the start of the play.
    pub starting: u64,
    /// Balance now.
    pub remaining: u64,
    /// `starting - remaining`.
    pub lost: u64,
    /// `lost / starting` as a whole percentage, rounded to nearest.
    pub loss_percent: u8,
}

impl LossReport {
    /// Builds a report. `remaining` is capped at `starting`.
    #[must_use]
    pub fn new(starting: u64, remaining: u64) -> Self {
        let remaining = remaining.min(starting);
        let lost = starting - remaining;
        let loss_percent = if starting == 0 {
            0
        } else {
            // Integer round-half-up of lost * 100 / starting, bounded to 100.
            let pct = (u128::from(lost) * 200 + u128::from(starting)) / (u128::from(starting) * 2);
            pct.min(100) as u8
        };
        Self {
            starting,
            remaining,
            lost,
            loss_percent,
        }
    }
}

/// Recap shown after a scenario ends.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub scenario_id: String,
    pub title: String,
    pub status: SimulationStatus,
    pub victim_name: String,
    pub loss: LossReport,
    pub event_count: usize,
    pub steps_total: usize,
    pub duration_ms: Option<i64>,
    pub educational_points: Vec<String>,
    pub real_world_cases: Vec<String>,
}
