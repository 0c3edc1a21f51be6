//! Per-actor engine and event loop.
//!
//! [`Engine`] owns everything one actor needs: the scheduler, the fragment
//! registry, the movement tracker, telemetry, a seeded RNG and the actor
//! itself. Entry points (`spawn`, `consume`, `trigger_movement`) run to
//! completion at the current instant; `advance_*` methods fire due events in
//! time order, breaking ties by registration order.
//!
//! # Example
//!
//! ```
//! use cadence::Timespan;
//! use glam::Vec2;
//! use shardfall_core::prelude::*;
//!
//! struct Hunter { souls: u32 }
//!
//! impl Actor for Hunter {
//!     fn position(&self) -> Vec2 { Vec2::ZERO }
//!     fn run_speed(&self) -> f32 { 10.0 }
//!     fn interaction_reach(&self) -> f32 { 5.0 }
//!     fn set_out_of_range(&mut self, _duration: Timespan) {}
//!     fn grant(&mut self, _kind: FragmentKind, amount: u32) { self.souls += amount; }
//! }
//!
//! let mut engine = Engine::new(EngineConfig::default(), Hunter { souls: 0 }).unwrap();
//! engine.spawn(&SpawnRequest::new(FragmentKind::lesser(), 2)).unwrap();
//! assert_eq!(engine.evaluate("soul_fragments.inactive").unwrap(), 2);
//!
//! engine.advance_by(Timespan::from_secs_f64(1.0)).unwrap();
//! assert_eq!(engine.evaluate("soul_fragments").unwrap(), 2);
//!
//! engine.consume(FragmentKind::ANY, ConsumeOptions::new().instant()).unwrap();
//! assert_eq!(engine.actor().souls, 2);
//! ```

use cadence::{EventHandle, Fired, Scheduler, SimTime, Timespan};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::fragment::{Fragment, FragmentId, FragmentKind};
use crate::movement::{MovementEffect, MovementObserver, MovementOutcome, MovementTracker};
use crate::query::FragmentQuery;
use crate::registry::{ConsumeOptions, FragmentRegistry, SpawnReport, SpawnRequest};
use crate::telemetry::{Signal, Telemetry};

// =============================================================================
// Events and Context
// =============================================================================

/// Every event the engine schedules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A Pending fragment reaches its placement.
    ActivateFragment(FragmentId),
    /// An Active fragment times out.
    ExpireFragment(FragmentId),
    /// A consumed fragment's resource reaches the actor.
    GrantResource(FragmentKind),
    /// A movement effect carries the actor out of range.
    ExitRange,
    /// The actor is back within range.
    ReturnToRange,
}

/// Mutable view of the collaborators shared by the registry and the tracker.
///
/// Built fresh for each entry point or fired event; never stored.
pub struct EngineContext<'a> {
    /// The engine's event queue.
    pub scheduler: &'a mut Scheduler<EngineEvent>,
    /// The actor being served.
    pub actor: &'a mut dyn Actor,
    /// Signal sink.
    pub telemetry: &'a mut Telemetry,
}

impl EngineContext<'_> {
    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Records a signal at the current time.
    pub fn record(&mut self, signal: Signal) {
        let now = self.scheduler.now();
        self.telemetry.record(now, signal);
    }

    /// Delivers one unit of the resource produced by a `kind` fragment.
    pub fn grant(&mut self, kind: FragmentKind) {
        self.actor.grant(kind, 1);
        self.record(Signal::Granted { kind, amount: 1 });
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Fragment and movement engine for one actor.
#[derive(Debug)]
pub struct Engine<A: Actor> {
    config: EngineConfig,
    scheduler: Scheduler<EngineEvent>,
    registry: FragmentRegistry,
    movement: MovementTracker,
    telemetry: Telemetry,
    rng: ChaCha8Rng,
    actor: A,
}

impl<A: Actor> Engine<A> {
    /// Creates an engine at time zero.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`](crate::error::EngineError::Config) if
    /// `config` fails validation.
    pub fn new(config: EngineConfig, actor: A) -> EngineResult<Self> {
        config.validate()?;
        tracing::debug!(?config, "engine created");
        Ok(Self {
            registry: FragmentRegistry::new(&config),
            movement: MovementTracker::new(&config),
            scheduler: Scheduler::new(),
            telemetry: Telemetry::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            actor,
        })
    }

    // -------------------------------------------------------------------------
    // Entry points
    // -------------------------------------------------------------------------

    /// Spawns fragments. See [`FragmentRegistry::spawn`].
    ///
    /// # Errors
    ///
    /// Propagates the registry's kind and travel errors.
    pub fn spawn(&mut self, request: &SpawnRequest) -> EngineResult<SpawnReport> {
        let (registry, _, _, mut cx) = self.split();
        registry.spawn(request, &mut cx)
    }

    /// Consumes Active fragments. See [`FragmentRegistry::consume`].
    ///
    /// # Errors
    ///
    /// Propagates travel errors for delayed grants.
    pub fn consume(&mut self, mask: FragmentKind, options: ConsumeOptions) -> EngineResult<usize> {
        let (registry, _, _, mut cx) = self.split();
        registry.consume(mask, options, &mut cx)
    }

    /// Applies a movement effect using the actor's current interaction reach.
    ///
    /// After the tracker has run, each Active fragment (earliest first) is
    /// picked up with probability `movement_consume_chance`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Movement`](crate::error::EngineError::Movement)
    /// for an invalid effect; nothing changes in that case.
    pub fn trigger_movement(&mut self, effect: &MovementEffect) -> EngineResult<MovementOutcome> {
        let chance = self.config.movement_consume_chance;
        let (registry, movement, rng, mut cx) = self.split();
        let reach = cx.actor.interaction_reach();
        let outcome = movement.trigger(effect, reach, &mut cx)?;

        if chance > 0.0 {
            let active: Vec<FragmentId> = registry
                .iter()
                .filter(|f| f.is_active())
                .map(Fragment::id)
                .collect();
            for id in active {
                if rng.gen_bool(chance) {
                    registry.pick_up(id, &mut cx);
                }
            }
        }
        Ok(outcome)
    }

    /// Evaluates a parsed count query.
    #[must_use]
    pub fn count(&self, query: &FragmentQuery) -> usize {
        query.evaluate(&self.registry)
    }

    /// Parses and evaluates a count-query expression such as
    /// `"greater_soul_fragments.total"`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Query`](crate::error::EngineError::Query) for an
    /// expression that does not parse.
    pub fn evaluate(&self, expr: &str) -> EngineResult<usize> {
        let query: FragmentQuery = expr.parse()?;
        Ok(self.count(&query))
    }

    /// Registers a movement observer.
    pub fn add_movement_observer<O>(&mut self, observer: O)
    where
        O: MovementObserver + Send + 'static,
    {
        self.movement.add_observer(observer);
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Fires every event due at or before `t`, then moves the clock to `t`.
    ///
    /// Times in the past leave the clock where it is. Returns the number of
    /// events fired.
    ///
    /// # Errors
    ///
    /// Propagates travel errors raised while handling an exit transition. Events
    /// fired before the failing one stay applied.
    pub fn advance_to(&mut self, t: SimTime) -> EngineResult<usize> {
        let mut fired = 0;
        while let Some(event) = self.scheduler.pop_until(t) {
            self.dispatch(event)?;
            fired += 1;
        }
        self.scheduler.advance_to(t);
        Ok(fired)
    }

    /// Advances the clock by `dt`. See [`Engine::advance_to`].
    ///
    /// # Errors
    ///
    /// As [`Engine::advance_to`].
    pub fn advance_by(&mut self, dt: Timespan) -> EngineResult<usize> {
        self.advance_to(self.scheduler.now() + dt)
    }

    /// Fires events until the queue is empty. The clock stops at the last
    /// event fired.
    ///
    /// # Errors
    ///
    /// As [`Engine::advance_to`].
    pub fn run_until_idle(&mut self) -> EngineResult<usize> {
        let mut fired = 0;
        while let Some(event) = self.scheduler.pop_until(SimTime::MAX) {
            self.dispatch(event)?;
            fired += 1;
        }
        Ok(fired)
    }

    fn dispatch(&mut self, fired: Fired<EngineEvent>) -> EngineResult<()> {
        let Fired { handle, payload } = fired;
        tracing::trace!(?handle, ?payload, "dispatch");
        let (registry, movement, _, mut cx) = self.split();
        match payload {
            EngineEvent::ActivateFragment(id) => registry.on_activate(id, handle, &mut cx),
            EngineEvent::ExpireFragment(id) => registry.on_expire(id, handle, &mut cx),
            EngineEvent::GrantResource(kind) => cx.grant(kind),
            EngineEvent::ExitRange => movement.on_exit(handle, &mut cx)?,
            EngineEvent::ReturnToRange => movement.on_return(handle, &mut cx),
        }
        Ok(())
    }

    /// Splits the engine into the registry, the tracker, the RNG and a context
    /// over the remaining collaborators.
    fn split(
        &mut self,
    ) -> (
        &mut FragmentRegistry,
        &mut MovementTracker,
        &mut ChaCha8Rng,
        EngineContext<'_>,
    ) {
        (
            &mut self.registry,
            &mut self.movement,
            &mut self.rng,
            EngineContext {
                scheduler: &mut self.scheduler,
                actor: &mut self.actor,
                telemetry: &mut self.telemetry,
            },
        )
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// The fragment registry.
    #[must_use]
    pub fn fragments(&self) -> &FragmentRegistry {
        &self.registry
    }

    /// The movement tracker.
    #[must_use]
    pub fn movement(&self) -> &MovementTracker {
        &self.movement
    }

    /// The event queue.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<EngineEvent> {
        &self.scheduler
    }

    /// Recorded signals and counters.
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Mutable telemetry, for draining the log.
    pub fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    /// The actor.
    #[must_use]
    pub fn actor(&self) -> &A {
        &self.actor
    }

    /// Mutable actor, for moving it or changing its speed between calls.
    pub fn actor_mut(&mut self) -> &mut A {
        &mut self.actor
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Remaining delay of a pending event.
    #[must_use]
    pub fn remains(&self, handle: EventHandle) -> Option<Timespan> {
        self.scheduler.remains(handle)
    }
}
