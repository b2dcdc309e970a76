//! Engine and runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scenario::Locale;

/// Environment variable overriding [`EngineConfig::default_speed`].
pub const ENV_SPEED: &str = "FRAUDSIM_SPEED";
/// Environment variable overriding [`EngineConfig::locale`].
pub const ENV_LOCALE: &str = "FRAUDSIM_LOCALE";
/// Environment variable overriding [`EngineConfig::unmask_on_reveal`].
pub const ENV_UNMASK_ON_REVEAL: &str = "FRAUDSIM_UNMASK_ON_REVEAL";

/// Playback engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speed multiplier a fresh engine starts with.
    pub default_speed: f64,
    /// Lowest accepted speed; slower requests are clamped up.
    pub min_speed: f64,
    /// Highest accepted speed; faster requests are clamped down.
    pub max_speed: f64,
    /// Language used for timeline entries and summaries.
    pub locale: Locale,
    /// A processed reveal step returns every compromised agent to good.
    pub unmask_on_reveal: bool,
    /// Per-subscriber event buffer.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            min_speed: 0.25,
            max_speed: 4.0,
            locale: Locale::Th,
            unmask_on_reveal: true,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `FRAUDSIM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for unparseable values or an invalid result.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for unparseable values or an invalid result.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_SPEED) {
            let speed: f64 = raw.trim().parse().map_err(|_| ValidationError::InvalidConfig {
                reason: format!("{ENV_SPEED} is not a number: {raw:?}"),
            })?;
            cfg.default_speed = speed;
        }
        if let Some(raw) = lookup(ENV_LOCALE) {
            cfg.locale = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_UNMASK_ON_REVEAL) {
            cfg.unmask_on_reveal = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ValidationError::InvalidConfig {
                        reason: format!("{ENV_UNMASK_ON_REVEAL} is not a boolean: {raw:?}"),
                    })
                }
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the speed bounds are not positive and
    /// ordered, the default speed lies outside them, or the event capacity is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [("min_speed", self.min_speed), ("max_speed", self.max_speed)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::InvalidSpeed {
                    value,
                    reason: format!("{name} must be a positive finite number"),
                });
            }
        }
        if self.min_speed > self.max_speed {
            return Err(ValidationError::InvalidConfig {
                reason: "min_speed must be <= max_speed".to_string(),
            });
        }
        if !self.default_speed.is_finite() || self.default_speed < self.min_speed || self.default_speed > self.max_speed {
            return Err(ValidationError::InvalidSpeed {
                value: self.default_speed,
                reason: format!("default_speed must lie within [{}, {}]", self.min_speed, self.max_speed),
            });
        }
        if self.event_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "event_capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Normalize a requested speed.
    ///
    /// Returns `None` for non-finite or non-positive values, otherwise the value
    /// clamped into `[min_speed, max_speed]`.
    #[must_use]
    pub fn clamp_speed(&self, requested: f64) -> Option<f64> {
        if !requested.is_finite() || requested <= 0.0 {
            return None;
        }
        Some(requested.clamp(self.min_speed, self.max_speed))
    }
}

/// Threaded playback runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum queued commands before `QueueFull` is reported.
    pub command_queue_capacity: usize,
    /// How long query commands wait for the worker's reply.
    pub reply_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: 256,
            reply_timeout_ms: 1000,
        }
    }
}

impl RuntimeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` for zero capacity or timeout.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.command_queue_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "command_queue_capacity must be > 0".to_string(),
            });
        }
        if self.reply_timeout_ms == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "reply_timeout_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
