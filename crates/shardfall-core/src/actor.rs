//! The actor collaborator.
//!
//! The engine never owns actor state. Everything it needs from the surrounding
//! actor model goes through [`Actor`]: read-only queries made at the moment of
//! each operation (never cached) and the two outward effects the engine
//! decides on (range changes and resource grants).

use cadence::Timespan;
use glam::Vec2;

use crate::fragment::FragmentKind;

/// Interface between the engine and the actor it serves.
///
/// # Example
///
/// ```
/// use cadence::Timespan;
/// use glam::Vec2;
/// use shardfall_core::actor::Actor;
/// use shardfall_core::fragment::FragmentKind;
///
/// #[derive(Default)]
/// struct Dummy {
///     souls: u32,
///     out_of_range_for: Timespan,
/// }
///
/// impl Actor for Dummy {
///     fn position(&self) -> Vec2 { Vec2::ZERO }
///     fn run_speed(&self) -> f32 { 7.0 }
///     fn interaction_reach(&self) -> f32 { 5.0 }
///     fn set_out_of_range(&mut self, duration: Timespan) { self.out_of_range_for = duration; }
///     fn grant(&mut self, _kind: FragmentKind, amount: u32) { self.souls += amount; }
/// }
/// ```
pub trait Actor {
    /// Current world position.
    fn position(&self) -> Vec2;

    /// Current run speed in yards per second.
    fn run_speed(&self) -> f32;

    /// Distance within which the actor can interact with its target.
    fn interaction_reach(&self) -> f32;

    /// Whether a movement outside this engine's tracking is in progress.
    ///
    /// A movement trigger that arrives while the actor is already moving is
    /// treated as moving back toward the target.
    fn is_moving(&self) -> bool {
        false
    }

    /// Marks the actor out of range for `duration`. [`Timespan::ZERO`] clears
    /// any out-of-range state.
    fn set_out_of_range(&mut self, duration: Timespan);

    /// Delivers the resource produced by consuming a fragment.
    fn grant(&mut self, kind: FragmentKind, amount: u32);
}
