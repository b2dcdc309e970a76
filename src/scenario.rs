//! Scenario definitions: the immutable, pre-authored script a playback runs.
//!
//! A [`Scenario`] is pure data. The array position of a [`Step`] is the
//! authoritative sequence; the `order` field is display metadata and is only
//! checked for consistency by [`Scenario::validate`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, AgentRegistry};
use crate::alignment::Alignment;
use crate::error::ValidationError;

/// Content language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    /// Thai.
    #[default]
    Th,
    /// English.
    En,
}

impl FromStr for Locale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "th" => Ok(Self::Th),
            "en" => Ok(Self::En),
            _ => Err(ValidationError::UnknownLocale { value: s.to_string() }),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Th => f.write_str("th"),
            Self::En => f.write_str("en"),
        }
    }
}

/// Text authored in both supported languages.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    pub th: String,
    pub en: String,
}

impl LocalizedText {
    /// Creates a localized text.
    #[must_use]
    pub fn new(th: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            th: th.into(),
            en: en.into(),
        }
    }

    /// Returns the text for `locale`, falling back to the other language when empty.
    #[must_use]
    pub fn get(&self, locale: Locale) -> &str {
        let (primary, fallback) = match locale {
            Locale::Th => (&self.th, &self.en),
            Locale::En => (&self.en, &self.th),
        };
        if primary.is_empty() {
            fallback
        } else {
            primary
        }
    }
}

/// Kind of narrative beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Something happens (a call, a scan).
    Action,
    /// An agent speaks.
    Dialogue,
    /// An agent changes sides.
    Transformation,
    /// Money leaves the victim's account.
    MoneyFlow,
    /// The scam is exposed; playback pauses until dismissed.
    Reveal,
    /// A takeaway for the user.
    Education,
}

impl StepType {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Dialogue => "dialogue",
            Self::Transformation => "transformation",
            Self::MoneyFlow => "money_flow",
            Self::Reveal => "reveal",
            Self::Education => "education",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual style of an edge animation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    DataFlow,
    MoneyFlow,
    Alert,
}

/// Presentation-only hint for an animated edge between two agents.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAnimation {
    pub source: AgentId,
    pub target: AgentId,
    pub style: EdgeStyle,
}

/// One beat of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique within the scenario.
    pub id: String,
    /// Display ordinal. Not used for sequencing.
    pub order: u32,
    /// Kind of beat.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Agent that owns the beat.
    pub agent_id: AgentId,
    /// Alignment the owning agent has at this beat.
    pub alignment: Alignment,
    /// Text shown while the beat is current.
    pub content: LocalizedText,
    /// Display time at speed 1.0.
    pub duration_ms: u64,
    /// Signed money delta; negative is a loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_change: Option<i64>,
    /// Transfer arrow drawn between two agents. Presentation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_animation: Option<EdgeAnimation>,
    /// Media reference for the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_hint: Option<String>,
}

impl Step {
    /// Creates a step with no money change and no presentation hints.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        order: u32,
        step_type: StepType,
        agent_id: impl Into<AgentId>,
        alignment: Alignment,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            step_type,
            agent_id: agent_id.into(),
            alignment,
            content: LocalizedText::default(),
            duration_ms,
            money_change: None,
            edge_animation: None,
            media_hint: None,
        }
    }

    /// Sets the localized content.
    #[must_use]
    pub fn with_content(mut self, content: LocalizedText) -> Self {
        self.content = content;
        self
    }

    /// Sets the money delta.
    #[must_use]
    pub fn with_money_change(mut self, amount: i64) -> Self {
        self.money_change = Some(amount);
        self
    }

    /// Whether this step is a reveal checkpoint.
    #[must_use]
    pub const fn is_reveal(&self) -> bool {
        matches!(self.step_type, StepType::Reveal)
    }
}

/// Fraud category.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudCategory {
    CallCenter,
    SmsPhishing,
    RomanceScam,
    SocialImpersonation,
    QrScam,
    PonziScheme,
    FakeInvestment,
    JobScam,
    LoanApp,
    SimSwap,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Defaults for the victim profile when the user does not provide one.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictimSetup {
    pub default_name: String,
    pub default_money: u64,
    pub context: LocalizedText,
}

/// Immutable scenario definition.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title: LocalizedText,
    pub category: FraudCategory,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub estimated_duration_secs: u32,
    #[serde(default)]
    pub description: LocalizedText,
    pub involved_agents: Vec<AgentId>,
    #[serde(default)]
    pub evil_agents: Vec<AgentId>,
    pub victim_setup: VictimSetup,
    pub steps: Vec<Step>,
    /// Total amount the script drains from a default victim.
    pub money_at_risk: u64,
    #[serde(default)]
    pub educational_points: Vec<LocalizedText>,
    #[serde(default)]
    pub real_world_cases: Vec<String>,
}

/// Non-fatal data problem found when a scenario is loaded.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataWarning {
    /// `order` does not increase over the previous step.
    OrderMismatch {
        index: usize,
        step_id: String,
        order: u32,
        previous_order: u32,
    },
    /// A money delta is positive; the ledger treats it as a loss of its absolute value.
    PositiveMoneyChange {
        step_id: String,
        amount: i64,
    },
    /// A step has no duration; its timer fires on the next poll.
    ZeroDuration {
        step_id: String,
    },
    /// A step references an agent the registry does not know.
    UnknownAgent {
        step_id: String,
        agent_id: AgentId,
    },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderMismatch {
                index,
                step_id,
                order,
                previous_order,
            } => write!(
                f,
                "step '{step_id}' at index {index} has order {order} after order {previous_order}"
            ),
            Self::PositiveMoneyChange { step_id, amount } => {
                write!(f, "step '{step_id}' has positive money change {amount}")
            }
            Self::ZeroDuration { step_id } => write!(f, "step '{step_id}' has a zero duration"),
            Self::UnknownAgent { step_id, agent_id } => {
                write!(f, "step '{step_id}' references unknown agent '{agent_id}'")
            }
        }
    }
}

impl Scenario {
    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at an array index.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Index of the final step, if any.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    /// Sum of every money delta's absolute value.
    #[must_use]
    pub fn scripted_loss(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(|s| s.money_change)
            .map(i64::unsigned_abs)
            .sum()
    }

    /// Total display time at speed 1.0.
    #[must_use]
    pub fn total_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }

    /// Validate structural invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for data the engine cannot play: an empty
    /// id, no steps, or an empty or duplicate step id.
    /// Inconsistencies that do not affect playback are returned as warnings.
    pub fn validate(&self) -> Result<Vec<DataWarning>, ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyScenarioId);
        }
        if self.steps.is_empty() {
            return Err(ValidationError::NoSteps {
                scenario_id: self.id.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.steps.len());
        let mut warnings = Vec::new();
        let mut previous_order: Option<u32> = None;

        for (index, step) in self.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                return Err(ValidationError::EmptyStepId { index });
            }
            if !seen.insert(step.id.as_str()) {
                return Err(ValidationError::DuplicateStepId {
                    step_id: step.id.clone(),
                });
            }
            if step.duration_ms == 0 {
                warnings.push(DataWarning::ZeroDuration {
                    step_id: step.id.clone(),
                });
            }

            if let Some(prev) = previous_order {
                if step.order <= prev {
                    warnings.push(DataWarning::OrderMismatch {
                        index,
                        step_id: step.id.clone(),
                        order: step.order,
                        previous_order: prev,
                    });
                }
            }
            previous_order = Some(step.order);

            if let Some(amount) = step.money_change {
                if amount > 0 {
                    warnings.push(DataWarning::PositiveMoneyChange {
                        step_id: step.id.clone(),
                        amount,
                    });
                }
            }
        }

        Ok(warnings)
    }

    /// Warnings for agents referenced by steps but absent from `registry`.
    #[must_use]
    pub fn unknown_agents(&self, registry: &AgentRegistry) -> Vec<DataWarning> {
        self.steps
            .iter()
            .filter(|s| !registry.contains(&s.agent_id))
            .map(|s| DataWarning::UnknownAgent {
                step_id: s.id.clone(),
                agent_id: s.agent_id.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(steps: Vec<Step>) -> Scenario {
        Scenario {
            id: "test-001".to_string(),
            title: LocalizedText::new("ทดสอบ", "Test"),
            category: FraudCategory::CallCenter,
            difficulty: Difficulty::Beginner,
            estimated_duration_secs: 10,
            description: LocalizedText::default(),
            involved_agents: vec![AgentId::from("a0")],
            evil_agents: vec![AgentId::from("a0")],
            victim_setup: VictimSetup {
                default_name: "Somchai".to_string(),
                default_money: 1000,
                context: LocalizedText::default(),
            },
            steps,
            money_at_risk: 0,
            educational_points: Vec::new(),
            real_world_cases: Vec::new(),
        }
    }

    #[test]
    fn localized_text_falls_back_when_empty() {
        let text = LocalizedText::new("", "hello");
        assert_eq!(text.get(Locale::Th), "hello");
        assert_eq!(text.get(Locale::En), "hello");

        let both = LocalizedText::new("สวัสดี", "hello");
        assert_eq!(both.get(Locale::Th), "สวัสดี");
    }

    #[test]
    fn locale_parses_case_insensitively() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!(" th ".parse::<Locale>().unwrap(), Locale::Th);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_scenario() {
        let s = scenario(vec![
            Step::new("s1", 1, StepType::Action, "a0", Alignment::Good, 1000),
            Step::new("s2", 2, StepType::MoneyFlow, "a0", Alignment::Evil, 1000).with_money_change(-10),
        ]);
        assert!(s.validate().unwrap().is_empty());
        assert_eq!(s.scripted_loss(), 10);
        assert_eq!(s.total_duration_ms(), 2000);
        assert_eq!(s.last_index(), Some(1));
    }

    #[test]
    fn validate_rejects_unplayable_data() {
        assert_eq!(
            scenario(Vec::new()).validate().unwrap_err(),
            ValidationError::NoSteps {
                scenario_id: "test-001".to_string()
            }
        );

        let dup = scenario(vec![
            Step::new("s1", 1, StepType::Action, "a0", Alignment::Good, 1000),
            Step::new("s1", 2, StepType::Action, "a0", Alignment::Good, 1000),
        ]);
        assert!(matches!(dup.validate(), Err(ValidationError::DuplicateStepId { .. })));
    }

    #[test]
    fn zero_duration_is_a_warning() {
        let zero = scenario(vec![Step::new("s1", 1, StepType::Action, "a0", Alignment::Good, 0)]);
        assert_eq!(
            zero.validate().unwrap(),
            vec![DataWarning::ZeroDuration {
                step_id: "s1".to_string()
            }]
        );
    }

    #[test]
    fn repeated_order_is_flagged() {
        let s = scenario(vec![
            Step::new("s1", 1, StepType::Action, "a0", Alignment::Good, 1000),
            Step::new("s2", 1, StepType::Dialogue, "a0", Alignment::Good, 1000),
        ]);
        let warnings = s.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], DataWarning::OrderMismatch { index: 1, order: 1, previous_order: 1, .. }));
    }

    #[test]
    fn validate_warns_on_order_out_of_sync() {
        let s = scenario(vec![
            Step::new("s1", 2, StepType::Action, "a0", Alignment::Good, 1000),
            Step::new("s2", 1, StepType::Dialogue, "a0", Alignment::Good, 1000),
            Step::new("s3", 3, StepType::MoneyFlow, "a0", Alignment::Evil, 1000).with_money_change(50),
        ]);

        let warnings = s.validate().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], DataWarning::OrderMismatch { index: 1, order: 1, previous_order: 2, .. }));
        assert!(matches!(warnings[1], DataWarning::PositiveMoneyChange { amount: 50, .. }));
    }

    #[test]
    fn unknown_agents_are_reported() {
        let s = scenario(vec![Step::new("s1", 1, StepType::Action, "zz", Alignment::Good, 1000)]);
        let warnings = s.unknown_agents(&AgentRegistry::builtin());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("zz"));
    }

    #[test]
    fn step_type_field_is_named_type_on_the_wire() {
        let step = Step::new("s1", 1, StepType::MoneyFlow, "a0", Alignment::Evil, 1000).with_money_change(-5);
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "money_flow");
        assert_eq!(json["money_change"], -5);
        assert!(json.get("edge_animation").is_none());
    }
}
