//! Test actor and harness.

use cadence::{Scheduler, Timespan};
use glam::Vec2;

use crate::actor::Actor;
use crate::engine::{EngineContext, EngineEvent};
use crate::fragment::FragmentKind;
use crate::telemetry::Telemetry;

// =============================================================================
// TestActor
// =============================================================================

/// Actor that records every effect applied to it.
///
/// Defaults: at the origin, 10 yd/s, 5 yd reach, not moving.
#[derive(Debug, Clone)]
pub struct TestActor {
    pub position: Vec2,
    pub run_speed: f32,
    pub reach: f32,
    pub moving: bool,
    pub out_of_range: Vec<Timespan>,
    pub granted: Vec<(FragmentKind, u32)>,
}

impl Default for TestActor {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            run_speed: 10.0,
            reach: 5.0,
            moving: false,
            out_of_range: Vec::new(),
            granted: Vec::new(),
        }
    }
}

impl Actor for TestActor {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn run_speed(&self) -> f32 {
        self.run_speed
    }

    fn interaction_reach(&self) -> f32 {
        self.reach
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn set_out_of_range(&mut self, duration: Timespan) {
        self.out_of_range.push(duration);
    }

    fn grant(&mut self, kind: FragmentKind, amount: u32) {
        self.granted.push((kind, amount));
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Loose collaborators for driving the registry or tracker without an engine.
#[derive(Debug, Default)]
pub struct Harness {
    pub scheduler: Scheduler<EngineEvent>,
    pub actor: TestActor,
    pub telemetry: Telemetry,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }
}

/// Borrows a harness as an engine context.
pub fn ctx(h: &mut Harness) -> EngineContext<'_> {
    EngineContext {
        scheduler: &mut h.scheduler,
        actor: &mut h.actor,
        telemetry: &mut h.telemetry,
    }
}

/// Installs a test-writer subscriber once per process; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
