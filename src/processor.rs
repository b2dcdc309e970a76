//! Step processor.
//!
//! [`compute`] maps `(state, step)` to a [`StepDelta`] without touching the
//! state; [`apply`] folds the delta in. The engine always runs the two back to
//! back, but keeping them apart lets callers preview a step and keeps the
//! ledger rules testable in isolation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::alignment::Alignment;
use crate::scenario::{Locale, Step};
use crate::state::{SimulationState, TimelineEntry};

/// Inputs to [`compute`] that do not come from the state or the step.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    /// Array index of the step being processed.
    pub step_index: usize,
    /// Language used for the timeline entry's content.
    pub locale: Locale,
    /// Reveal steps return compromised agents to good.
    pub unmask_on_reveal: bool,
    /// Timestamp stamped on the timeline entry.
    pub now: DateTime<Utc>,
}

/// A balance change.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyChange {
    pub previous: u64,
    pub current: u64,
}

impl MoneyChange {
    /// Amount actually removed from the balance.
    #[must_use]
    pub const fn lost(&self) -> u64 {
        self.previous.saturating_sub(self.current)
    }
}

/// One agent's alignment moving from `from` to `to`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentChange {
    pub agent: AgentId,
    pub from: Alignment,
    pub to: Alignment,
}

/// Everything processing one step changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDelta {
    /// Timeline entry for the step.
    pub entry: TimelineEntry,
    /// Balance change, if the step moved any money.
    pub money: Option<MoneyChange>,
    /// Applied in order; later changes to the same agent win.
    pub alignment_changes: Vec<AlignmentChange>,
    /// The step is a reveal checkpoint.
    pub forces_pause: bool,
}

/// Compute the effect of processing `step` against `state`.
#[must_use]
pub fn compute(state: &SimulationState, step: &Step, ctx: ProcessContext) -> StepDelta {
    let entry = TimelineEntry {
        step_index: ctx.step_index,
        step_id: step.id.clone(),
        step_type: step.step_type,
        agent_id: step.agent_id.clone(),
        content: step.content.get(ctx.locale).to_string(),
        money_change: step.money_change,
        timestamp: ctx.now,
    };

    let money = step.money_change.and_then(|amount| {
        let previous = state.user_profile.money_remaining;
        let current = previous.saturating_sub(amount.unsigned_abs());
        (current != previous).then_some(MoneyChange { previous, current })
    });

    let mut alignment_changes = Vec::new();
    let owner_from = state.alignment_of(&step.agent_id);
    if owner_from != step.alignment {
        alignment_changes.push(AlignmentChange {
            agent: step.agent_id.clone(),
            from: owner_from,
            to: step.alignment,
        });
    }

    if step.is_reveal() && ctx.unmask_on_reveal {
        for (agent, &current) in &state.agent_alignments {
            // The owner's declared alignment has already been queued above.
            let effective = if agent == &step.agent_id { step.alignment } else { current };
            if effective.is_compromised() {
                alignment_changes.push(AlignmentChange {
                    agent: agent.clone(),
                    from: effective,
                    to: Alignment::Good,
                });
            }
        }
        if !state.agent_alignments.contains_key(&step.agent_id) && step.alignment.is_compromised() {
            alignment_changes.push(AlignmentChange {
                agent: step.agent_id.clone(),
                from: step.alignment,
                to: Alignment::Good,
            });
        }
    }

    StepDelta {
        entry,
        money,
        alignment_changes,
        forces_pause: step.is_reveal(),
    }
}

/// Fold a delta into the state.
pub fn apply(state: &mut SimulationState, delta: &StepDelta) {
    state.timeline.push(delta.entry.clone());

    if let Some(money) = delta.money {
        // Clamp against the live balance so a stale delta can never raise it.
        state.user_profile.money_remaining = state.user_profile.money_remaining.min(money.current);
    }

    for change in &delta.alignment_changes {
        state.agent_alignments.insert(change.agent.clone(), change.to);
        state.transforming_agent = (change.to == Alignment::Transitioning).then(|| change.agent.clone());
    }
}
