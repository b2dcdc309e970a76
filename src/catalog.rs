//! Scenario catalog: built-in scripts and JSON loading.
//!
//! Built-in scenarios are embedded at compile time from `assets/scenarios/`.
//! Every scenario is validated when it enters the catalog, so anything the
//! catalog hands out is playable.

use std::path::Path;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::scenario::{DataWarning, Scenario};

const CALL_CENTER_JSON: &str = include_str!("../assets/scenarios/call_center.json");
const QR_SCAM_JSON: &str = include_str!("../assets/scenarios/qr_scam.json");

/// Parse and validate a single scenario from JSON.
///
/// # Errors
///
/// Returns `CatalogError::Parse` for malformed JSON and `CatalogError::Invalid`
/// when the scenario fails [`Scenario::validate`].
pub fn parse_scenario(json: &str) -> Result<(Scenario, Vec<DataWarning>), CatalogError> {
    let scenario: Scenario = serde_json::from_str(json).map_err(|e| CatalogError::Parse {
        message: e.to_string(),
    })?;
    let warnings = scenario.validate().map_err(|source| CatalogError::Invalid {
        scenario_id: scenario.id.clone(),
        source,
    })?;
    Ok((scenario, warnings))
}

/// An ordered set of playable scenarios.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Arc<Scenario>>,
}

impl ScenarioCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The scenarios shipped with the crate.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded data is corrupt.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for json in [CALL_CENTER_JSON, QR_SCAM_JSON] {
            catalog.insert_json(json)?;
        }
        Ok(catalog)
    }

    /// Adds a validated scenario, replacing any scenario with the same id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the scenario cannot be played.
    pub fn insert(&mut self, scenario: Scenario) -> Result<Vec<DataWarning>, CatalogError> {
        let warnings = scenario.validate().map_err(|source| CatalogError::Invalid {
            scenario_id: scenario.id.clone(),
            source,
        })?;
        for w in &warnings {
            tracing::warn!(scenario_id = %scenario.id, "scenario data warning: {w}");
        }

        let scenario = Arc::new(scenario);
        match self.scenarios.iter_mut().find(|s| s.id == scenario.id) {
            Some(slot) => *slot = scenario,
            None => self.scenarios.push(scenario),
        }
        Ok(warnings)
    }

    /// Parses, validates and adds a scenario from JSON.
    ///
    /// # Errors
    ///
    /// See [`parse_scenario`].
    pub fn insert_json(&mut self, json: &str) -> Result<Vec<DataWarning>, CatalogError> {
        let (scenario, _) = parse_scenario(json)?;
        self.insert(scenario)
    }

    /// Loads a scenario JSON file into the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise see [`parse_scenario`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<DataWarning>, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.insert_json(&json)
    }

    /// Looks up a scenario by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Scenario>> {
        self.scenarios.iter().find(|s| s.id == id).cloned()
    }

    /// Looks up a scenario by id, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ScenarioNotFound`.
    pub fn require(&self, id: &str) -> Result<Arc<Scenario>, CatalogError> {
        self.get(id).ok_or_else(|| CatalogError::ScenarioNotFound { id: id.to_string() })
    }

    /// Scenario ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.id.as_str())
    }

    /// Scenarios in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Scenario>> {
        self.scenarios.iter()
    }

    /// Number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog holds no scenarios.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
