//! Narrative alignment of an agent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An agent's narrative role at a point in time.
///
/// Agents start out `Good`. A transformation beat moves them through
/// `Transitioning` to `Evil`; a reveal or a reset brings them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Acting in the user's interest.
    #[default]
    Good,
    /// Taken over by the scammer role.
    Evil,
    /// Mid-transformation.
    Transitioning,
}

impl Alignment {
    /// Returns true when the agent is shown with its evil identity.
    #[must_use]
    pub const fn is_compromised(self) -> bool {
        matches!(self, Self::Evil | Self::Transitioning)
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Evil => "evil",
            Self::Transitioning => "transitioning",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
