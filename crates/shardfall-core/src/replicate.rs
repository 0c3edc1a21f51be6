//! Isolated Monte Carlo replicates.
//!
//! Each replicate builds its own [`Engine`] from a seed and runs a scenario on
//! it. Replicates execute in parallel with rayon; nothing is shared between
//! them, so no locking is involved and results depend only on the seed.

use rayon::prelude::*;

use crate::actor::Actor;
use crate::engine::Engine;
use crate::error::EngineResult;

/// Runs `scenario` once per seed on a freshly built engine.
///
/// Results come back in the order of `seeds`, whatever order the replicates
/// finished in.
///
/// # Arguments
///
/// * `seeds` - One seed per replicate
/// * `build` - Creates the replicate's engine from its seed
/// * `scenario` - Drives the engine and extracts a result
///
/// # Example
///
/// ```
/// use cadence::Timespan;
/// use glam::Vec2;
/// use shardfall_core::prelude::*;
/// use shardfall_core::replicate::run_replicates;
///
/// struct Dummy;
///
/// impl Actor for Dummy {
///     fn position(&self) -> Vec2 { Vec2::ZERO }
///     fn run_speed(&self) -> f32 { 10.0 }
///     fn interaction_reach(&self) -> f32 { 5.0 }
///     fn set_out_of_range(&mut self, _duration: Timespan) {}
///     fn grant(&mut self, _kind: FragmentKind, _amount: u32) {}
/// }
///
/// let results = run_replicates(
///     &[1, 2, 3],
///     |seed| Engine::new(EngineConfig { seed, ..Default::default() }, Dummy),
///     |engine| {
///         engine.spawn(&SpawnRequest::new(FragmentKind::lesser(), 2))?;
///         engine.run_until_idle()
///     },
/// );
/// assert!(results.iter().all(|r| *r == Ok(4)));
/// ```
pub fn run_replicates<A, B, S, R>(seeds: &[u64], build: B, scenario: S) -> Vec<EngineResult<R>>
where
    A: Actor,
    B: Fn(u64) -> EngineResult<Engine<A>> + Sync,
    S: Fn(&mut Engine<A>) -> EngineResult<R> + Sync,
    R: Send,
{
    seeds
        .par_iter()
        .map(|&seed| {
            let mut engine = build(seed)?;
            tracing::trace!(seed, "replicate started");
            scenario(&mut engine)
        })
        .collect()
}
