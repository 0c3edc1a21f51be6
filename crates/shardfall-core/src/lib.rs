//! # Shardfall Core
//!
//! Fragment lifecycle and movement-state engine for combat simulations.
//!
//! One [`Engine`](engine::Engine) serves one actor and manages two things on a
//! shared simulated clock:
//!
//! - **Fragments**: ephemeral resource entities that travel to a placement,
//!   become consumable, and either expire or are consumed for a resource grant
//! - **Movement state**: whether a movement effect carries the actor out of
//!   interaction range, when, and for how long
//!
//! Everything time-dependent is a cancelable event on a
//! [`cadence::Scheduler`], so the engine is deterministic for a given seed and
//! input sequence.
//!
//! ## Architecture
//!
//! - [`fragment`]: fragment entity and its category set
//! - [`registry`]: capacity, spawn placement, activation, expiry, consumption
//! - [`query`]: the `<category>.<filter>` count-query grammar
//! - [`movement`]: range tracker and movement observers
//! - [`engine`]: event loop tying the above to an [`Actor`](actor::Actor)
//! - [`replicate`]: parallel, fully isolated Monte Carlo runs
//!
//! ## Usage
//!
//! ```
//! use cadence::Timespan;
//! use glam::Vec2;
//! use shardfall_core::prelude::*;
//!
//! struct Hunter;
//!
//! impl Actor for Hunter {
//!     fn position(&self) -> Vec2 { Vec2::ZERO }
//!     fn run_speed(&self) -> f32 { 10.0 }
//!     fn interaction_reach(&self) -> f32 { 5.0 }
//!     fn set_out_of_range(&mut self, _duration: Timespan) {}
//!     fn grant(&mut self, _kind: FragmentKind, _amount: u32) {}
//! }
//!
//! let mut engine = Engine::new(EngineConfig::default(), Hunter).unwrap();
//! let outcome = engine
//!     .trigger_movement(&MovementEffect::new(20.0, Timespan::from_secs_f64(2.0)))
//!     .unwrap();
//! assert!(matches!(outcome, MovementOutcome::ExitScheduled { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export cadence for time and scheduling types
pub use cadence;

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod movement;
pub mod query;
pub mod registry;
pub mod replicate;
pub mod telemetry;
pub mod travel;

#[cfg(test)]
mod tests;

/// Commonly used types.
pub mod prelude {
    pub use crate::actor::Actor;
    pub use crate::config::{EngineConfig, OverflowPolicy};
    pub use crate::engine::{Engine, EngineEvent};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::fragment::{Fragment, FragmentId, FragmentKind, FragmentState};
    pub use crate::movement::{MovementEffect, MovementObserver, MovementOutcome, RangeStatus};
    pub use crate::query::{CountFilter, FragmentCategory, FragmentQuery};
    pub use crate::registry::{ConsumeOptions, SpawnReport, SpawnRequest};
    pub use crate::telemetry::{Signal, SignalKind};
}
