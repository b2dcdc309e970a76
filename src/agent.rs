//! Agent registry and evil-variant display substitution.
//!
//! Agents are the cast of a scenario. The registry is static reference data:
//! base metadata for every agent plus an optional alternate "evil identity"
//! used while the agent is compromised. The engine never mutates it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;

/// Stable agent identifier as used by authored scenario data (e.g. `a0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an agent ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AgentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role an agent plays in the defense team.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Commander,
    Scout,
    Memory,
    Guardian,
    Trainer,
    FinanceGuard,
    Alert,
}

/// Accent colors for a compromised agent.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTheme {
    pub primary: String,
    pub glow: String,
    pub border: String,
}

/// Base display metadata for an agent.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub id: AgentId,
    pub name: String,
    pub role: AgentRole,
    pub description: String,
    pub avatar: String,
    pub trust_score: u8,
    #[serde(default)]
    pub traits: Vec<String>,
}

/// Alternate identity shown while an agent is evil or transitioning.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvilVariant {
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub trust_score: u8,
    #[serde(default)]
    pub traits: Vec<String>,
    pub color_theme: ColorTheme,
}

/// Render data for one agent at the current alignment.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDisplay {
    pub id: AgentId,
    pub role: AgentRole,
    pub alignment: Alignment,
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub trust_score: u8,
    pub traits: Vec<String>,
    /// Present only when the evil identity is shown.
    pub color_theme: Option<ColorTheme>,
}

impl AgentDisplay {
    /// True when the evil-variant identity was substituted.
    #[must_use]
    pub const fn shows_evil_identity(&self) -> bool {
        self.color_theme.is_some()
    }
}

/// Agent metadata plus the evil-variant substitution table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistry {
    agents: Vec<AgentMetadata>,
    evil_variants: HashMap<AgentId, EvilVariant>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an agent.
    pub fn insert(&mut self, agent: AgentMetadata) {
        if let Some(existing) = self.agents.iter_mut().find(|a| a.id == agent.id) {
            *existing = agent;
        } else {
            self.agents.push(agent);
        }
    }

    /// Registers the evil identity for an agent.
    pub fn insert_evil_variant(&mut self, id: AgentId, variant: EvilVariant) {
        self.evil_variants.insert(id, variant);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_agent(mut self, agent: AgentMetadata) -> Self {
        self.insert(agent);
        self
    }

    /// Builder-style [`insert_evil_variant`](Self::insert_evil_variant).
    #[must_use]
    pub fn with_evil_variant(mut self, id: impl Into<AgentId>, variant: EvilVariant) -> Self {
        self.insert_evil_variant(id.into(), variant);
        self
    }

    /// Looks up an agent by id.
    #[must_use]
    pub fn get(&self, id: &AgentId) -> Option<&AgentMetadata> {
        self.agents.iter().find(|a| &a.id == id)
    }

    /// The agent's evil identity, if it has one.
    #[must_use]
    pub fn evil_variant(&self, id: &AgentId) -> Option<&EvilVariant> {
        self.evil_variants.get(id)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &AgentId) -> bool {
        self.get(id).is_some()
    }

    /// Agents in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentMetadata> {
        self.agents.iter()
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Overlay an agent's metadata with its alignment.
    ///
    /// Compromised agents (evil or transitioning) with an entry in the variant
    /// table are shown with the evil name, avatar, description, traits and
    /// trust score. Agents without a variant keep their base identity.
    #[must_use]
    pub fn display(&self, agent: &AgentMetadata, alignment: Alignment) -> AgentDisplay {
        if alignment.is_compromised() {
            if let Some(evil) = self.evil_variants.get(&agent.id) {
                return AgentDisplay {
                    id: agent.id.clone(),
                    role: agent.role,
                    alignment,
                    name: evil.name.clone(),
                    description: evil.description.clone(),
                    avatar: evil.avatar.clone(),
                    trust_score: evil.trust_score,
                    traits: evil.traits.clone(),
                    color_theme: Some(evil.color_theme.clone()),
                };
            }
        }

        AgentDisplay {
            id: agent.id.clone(),
            role: agent.role,
            alignment,
            name: agent.name.clone(),
            description: agent.description.clone(),
            avatar: agent.avatar.clone(),
            trust_score: agent.trust_score,
            traits: agent.traits.clone(),
            color_theme: None,
        }
    }

    /// The seven-agent defense team used by the built-in scenarios.
    #[must_use]
    pub fn builtin() -> Self {
        let roster = [
            ("a0", "Big Boss", AgentRole::Commander, "The strategic mastermind coordinating all defense operations", 100, &["Authoritative", "Strategic", "Protective"][..]),
            ("a1", "Hawk Eye", AgentRole::Scout, "Sharp-eyed scanner detecting new fraud patterns before they spread", 98, &["Alert", "Vigilant", "Fast"][..]),
            ("a2", "Memory Bank", AgentRole::Memory, "The knowledge vault storing scam fingerprints and matching suspicious patterns", 99, &["Wise", "Methodical", "Detailed"][..]),
            ("a3", "Guardian Angel", AgentRole::Guardian, "Friendly companion protecting citizens from SMS scams and suspicious calls", 85, &["Friendly", "Quick", "Approachable"][..]),
            ("a4", "Scam Trainer", AgentRole::Trainer, "Interactive educator creating realistic scam simulations", 100, &["Educator", "Creative", "Engaging"][..]),
            ("a5", "Money Guard", AgentRole::FinanceGuard, "Business protector detecting fake invoices and payment fraud", 96, &["Careful", "Precise", "Skeptical"][..]),
            ("a6", "Lightning Alert", AgentRole::Alert, "Ultra-fast alert system broadcasting emergency warnings", 42, &["Loud", "Urgent", "Relentless"][..]),
        ];

        let mut registry = Self::new();
        for (id, name, role, description, trust_score, traits) in roster {
            registry.insert(AgentMetadata {
                id: AgentId::from(id),
                name: name.to_string(),
                role,
                description: description.to_string(),
                avatar: format!("avatars/{id}.json"),
                trust_score,
                traits: traits.iter().map(|t| (*t).to_string()).collect(),
            });
        }

        let variants = [
            ("a0", "Fake Pol. Col. Somchai", "Impersonates a senior police officer and threatens arrest over invented money laundering", 12),
            ("a1", "Fake Bank Officer", "Poses as bank staff to confirm the fake police story", 18),
            ("a2", "Rogue Archivist", "Feeds the victim forged case numbers", 20),
            ("a3", "Fake Support Agent", "Offers 'help' that walks the victim into a transfer", 15),
            ("a4", "Fake Trainer", "Sells a bogus course that ends in a deposit request", 22),
            ("a5", "Fake QR Merchant", "Pastes a counterfeit payment QR code over the real one", 10),
            ("a6", "Panic Broadcaster", "Spams urgent warnings to rush victims into mistakes", 5),
        ];

        for (id, name, description, trust_score) in variants {
            registry.insert_evil_variant(
                AgentId::from(id),
                EvilVariant {
                    name: name.to_string(),
                    description: description.to_string(),
                    avatar: format!("avatars/{id}-evil.json"),
                    trust_score,
                    traits: vec!["Deceptive".to_string(), "Pushy".to_string()],
                    color_theme: ColorTheme {
                        primary: "#FF4444".to_string(),
                        glow: "rgba(255, 68, 68, 0.6)".to_string(),
                        border: "#FF4444".to_string(),
                    },
                },
            );
        }

        registry
    }
}
