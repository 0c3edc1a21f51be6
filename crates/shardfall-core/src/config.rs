//! Engine configuration.
//!
//! [`EngineConfig`] is plain serde data so an embedding simulation can load it
//! from whatever profile format it uses. Call [`EngineConfig::validate`] (done
//! by [`Engine::new`](crate::engine::Engine::new)) before use.
//!
//! # Example
//!
//! ```
//! use shardfall_core::config::{EngineConfig, OverflowPolicy};
//!
//! let config = EngineConfig {
//!     max_fragments: 3,
//!     overflow_policy: OverflowPolicy::EvictOldest,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use cadence::Timespan;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default Pending+Active capacity.
pub const DEFAULT_MAX_FRAGMENTS: usize = 5;

/// Behaviour when a spawn would exceed capacity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new fragment; existing fragments and their timers are untouched.
    #[default]
    Reject,
    /// Consume the earliest-spawned Pending or Active fragment to make room.
    EvictOldest,
}

/// Configuration for one actor's engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of Pending+Active fragments.
    pub max_fragments: usize,
    /// How long an Active fragment lies before expiring.
    pub fragment_duration: Timespan,
    /// Lateral distance between spawn origin and fragment placement (yards).
    pub placement_offset: f32,
    /// What to do when a spawn hits capacity.
    pub overflow_policy: OverflowPolicy,
    /// Chance for each Active fragment to be picked up by a movement effect.
    pub movement_consume_chance: f64,
    /// Default direction factor for movement effects: 1.0 moves straight away
    /// from the target, 2.0 moves fully across it.
    pub movement_direction_factor: f32,
    /// Seed for the engine's deterministic RNG.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fragments: DEFAULT_MAX_FRAGMENTS,
            fragment_duration: Timespan::from_millis(20_000),
            placement_offset: 3.0,
            overflow_policy: OverflowPolicy::Reject,
            movement_consume_chance: 0.0,
            movement_direction_factor: 1.0,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Checks every field against its permitted range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_fragments == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let offset = f64::from(self.placement_offset);
        if !offset.is_finite() || offset < 0.0 {
            return Err(ConfigError::NotFiniteNonNegative {
                field: "placement_offset",
                value: offset,
            });
        }
        check_range(
            "movement_consume_chance",
            self.movement_consume_chance,
            0.0,
            1.0,
        )?;
        check_range(
            "movement_direction_factor",
            f64::from(self.movement_direction_factor),
            1.0,
            2.0,
        )?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
