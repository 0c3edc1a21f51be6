//! Movement-state tracking.
//!
//! A movement effect displaces the actor for a fixed duration. The tracker
//! predicts whether that displacement carries the actor beyond its interaction
//! reach, and if so schedules the moment it leaves range. When that moment
//! arrives the actor is marked out of range for the time it needs to run back
//! plus whatever is left of the effect.
//!
//! # State Machine
//!
//! ```text
//! InRange --trigger(yards > 0)--> PendingExit --exit fires--> OutOfRange
//! InRange --trigger(yards == 0)--> InRange
//! OutOfRange --return fires--> InRange
//! any --trigger while already moving--> InRange   (reset, cancels timers)
//! ```
//!
//! A pending exit only exists while the status is `InRange`, and at most one is
//! in flight.

use std::fmt;

use cadence::{EventHandle, SimTime, Timespan};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::{EngineContext, EngineEvent};
use crate::error::{MovementError, TravelError};
use crate::telemetry::Signal;
use crate::travel::travel_time;

// =============================================================================
// Types
// =============================================================================

/// Whether the actor is within interaction reach of its target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RangeStatus {
    /// Within reach.
    #[default]
    InRange,
    /// Beyond reach until the scheduled return.
    OutOfRange,
}

/// Observable phase of the tracker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// In range, nothing scheduled.
    InRange,
    /// In range, with an exit transition in flight.
    PendingExit,
    /// Out of range.
    OutOfRange,
}

/// Parameters of one movement effect.
///
/// # Example
///
/// ```
/// use cadence::Timespan;
/// use shardfall_core::movement::MovementEffect;
///
/// let leap = MovementEffect::new(20.0, Timespan::from_secs_f64(1.0))
///     .with_direction_factor(2.0);
/// assert!(leap.validate().is_ok());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementEffect {
    /// Yards travelled over the whole effect.
    pub distance: f32,
    /// How long the displacement lasts.
    pub duration: Timespan,
    /// Direction factor; `None` uses the configured default.
    pub direction_factor: Option<f32>,
}

impl MovementEffect {
    /// An effect moving `distance` yards over `duration`.
    #[must_use]
    pub fn new(distance: f32, duration: Timespan) -> Self {
        Self {
            distance,
            duration,
            direction_factor: None,
        }
    }

    /// Overrides the configured direction factor for this effect.
    #[must_use]
    pub fn with_direction_factor(mut self, factor: f32) -> Self {
        self.direction_factor = Some(factor);
        self
    }

    /// Checks the effect parameters.
    ///
    /// # Errors
    ///
    /// - [`MovementError::InvalidDistance`] unless distance is positive and finite
    /// - [`MovementError::ZeroDuration`] for a zero duration
    /// - [`MovementError::InvalidDirectionFactor`] for a negative or non-finite factor
    pub fn validate(&self) -> Result<(), MovementError> {
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return Err(MovementError::InvalidDistance(self.distance));
        }
        if self.duration.is_zero() {
            return Err(MovementError::ZeroDuration);
        }
        if let Some(factor) = self.direction_factor {
            if !factor.is_finite() || factor < 0.0 {
                return Err(MovementError::InvalidDirectionFactor(factor));
            }
        }
        Ok(())
    }
}

/// What a trigger decided.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MovementOutcome {
    /// The actor was already moving; range tracking was reset to `InRange`.
    Reset,
    /// The effect keeps the actor within reach.
    StaysInRange,
    /// The actor will leave range.
    ExitScheduled {
        /// Yards beyond reach at the end of the effect.
        yards: f32,
        /// Delay until the actor leaves range.
        exit_after: Timespan,
    },
}

/// Callback invoked once per movement trigger.
///
/// Closures taking `(SimTime, &MovementOutcome)` implement this trait.
pub trait MovementObserver {
    /// Called synchronously after the tracker has applied a trigger.
    fn on_movement(&mut self, at: SimTime, outcome: &MovementOutcome);
}

impl<F> MovementObserver for F
where
    F: FnMut(SimTime, &MovementOutcome),
{
    fn on_movement(&mut self, at: SimTime, outcome: &MovementOutcome) {
        self(at, outcome);
    }
}

// =============================================================================
// MovementTracker
// =============================================================================

/// Range state of one actor.
pub struct MovementTracker {
    status: RangeStatus,
    yards_out_of_range: f32,
    pending_exit: Option<EventHandle>,
    pending_return: Option<EventHandle>,
    effect_until: SimTime,
    default_direction_factor: f32,
    observers: Vec<Box<dyn MovementObserver + Send>>,
}

impl MovementTracker {
    /// Creates an in-range tracker using the configured direction factor.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            status: RangeStatus::InRange,
            yards_out_of_range: 0.0,
            pending_exit: None,
            pending_return: None,
            effect_until: SimTime::ZERO,
            default_direction_factor: config.movement_direction_factor,
            observers: Vec::new(),
        }
    }

    /// Registers an observer. Observers run in registration order.
    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: MovementObserver + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Current range status.
    #[must_use]
    pub fn status(&self) -> RangeStatus {
        self.status
    }

    /// Current phase, distinguishing a pending exit from plain `InRange`.
    #[must_use]
    pub fn phase(&self) -> MovementPhase {
        match (self.status, self.pending_exit) {
            (RangeStatus::OutOfRange, _) => MovementPhase::OutOfRange,
            (RangeStatus::InRange, Some(_)) => MovementPhase::PendingExit,
            (RangeStatus::InRange, None) => MovementPhase::InRange,
        }
    }

    /// Yards beyond reach predicted by the last trigger.
    #[must_use]
    pub fn yards_out_of_range(&self) -> f32 {
        self.yards_out_of_range
    }

    /// Outstanding exit transition, if any.
    #[must_use]
    pub fn pending_exit(&self) -> Option<EventHandle> {
        self.pending_exit
    }

    /// Outstanding return transition, if any.
    #[must_use]
    pub fn pending_return(&self) -> Option<EventHandle> {
        self.pending_return
    }

    /// When the most recent movement effect ends.
    #[must_use]
    pub fn effect_until(&self) -> SimTime {
        self.effect_until
    }

    /// Applies a movement effect.
    ///
    /// If the actor is already moving (it says so itself, the tracker is out of
    /// range, or the previous effect has not ended) the trigger is read as
    /// moving back toward the target: every pending transition is cancelled and
    /// the actor is put back in range. Otherwise the yards beyond
    /// `interaction_reach × direction_factor` are computed and, when positive,
    /// an exit is scheduled at the matching fraction of the effect duration.
    ///
    /// Observers are notified exactly once whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns a [`MovementError`] if the effect fails
    /// [`MovementEffect::validate`]. The tracker is unchanged in that case.
    pub fn trigger(
        &mut self,
        effect: &MovementEffect,
        interaction_reach: f32,
        cx: &mut EngineContext<'_>,
    ) -> Result<MovementOutcome, MovementError> {
        effect.validate()?;
        let now = cx.now();

        let already_moving = cx.actor.is_moving()
            || self.status == RangeStatus::OutOfRange
            || self.effect_until > now;

        let outcome = if already_moving {
            self.cancel_transitions(cx);
            self.status = RangeStatus::InRange;
            self.yards_out_of_range = 0.0;
            cx.actor.set_out_of_range(Timespan::ZERO);
            cx.record(Signal::MovementReset);
            MovementOutcome::Reset
        } else {
            let factor = effect
                .direction_factor
                .unwrap_or(self.default_direction_factor);
            let yards = (effect.distance - interaction_reach * factor).max(0.0);
            self.yards_out_of_range = yards;

            if yards > 0.0 {
                let fraction = 1.0 - f64::from(yards) / f64::from(effect.distance);
                let exit_after = effect.duration.mul_f64(fraction);
                self.pending_exit = Some(cx.scheduler.schedule(exit_after, EngineEvent::ExitRange));
                tracing::debug!(yards, %exit_after, "exit from range scheduled");
                MovementOutcome::ExitScheduled { yards, exit_after }
            } else {
                MovementOutcome::StaysInRange
            }
        };

        self.effect_until = now + effect.duration;
        for observer in &mut self.observers {
            observer.on_movement(now, &outcome);
        }
        Ok(outcome)
    }

    /// Handles a fired exit transition.
    ///
    /// The actor is marked out of range for `yards / run_speed` plus the time
    /// left on the running effect, and a return transition is scheduled after
    /// the same duration. Stale handles are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TravelError::NonPositiveSpeed`] if the actor's run speed is
    /// not positive. The exit is dropped and the actor stays in range.
    pub fn on_exit(&mut self, handle: EventHandle, cx: &mut EngineContext<'_>) -> Result<(), TravelError> {
        if self.pending_exit != Some(handle) {
            tracing::trace!(?handle, "stale exit ignored");
            return Ok(());
        }
        self.pending_exit = None;

        let remaining = self.effect_until.saturating_since(cx.now());
        let return_after = travel_time(self.yards_out_of_range, cx.actor.run_speed())? + remaining;

        cx.actor.set_out_of_range(return_after);
        self.status = RangeStatus::OutOfRange;
        self.pending_return = Some(
            cx.scheduler
                .schedule(return_after, EngineEvent::ReturnToRange),
        );
        tracing::debug!(%return_after, "actor out of range");
        cx.record(Signal::ExitRange { return_after });
        Ok(())
    }

    /// Handles a fired return transition. Stale handles are ignored.
    pub fn on_return(&mut self, handle: EventHandle, cx: &mut EngineContext<'_>) {
        if self.pending_return != Some(handle) {
            tracing::trace!(?handle, "stale return ignored");
            return;
        }
        self.pending_return = None;
        self.status = RangeStatus::InRange;
        self.yards_out_of_range = 0.0;
        tracing::debug!("actor back in range");
        cx.record(Signal::ReturnToRange);
    }

    fn cancel_transitions(&mut self, cx: &mut EngineContext<'_>) {
        if let Some(handle) = self.pending_exit.take() {
            cx.scheduler.cancel(handle);
        }
        if let Some(handle) = self.pending_return.take() {
            cx.scheduler.cancel(handle);
        }
    }
}

impl fmt::Debug for MovementTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovementTracker")
            .field("status", &self.status)
            .field("yards_out_of_range", &self.yards_out_of_range)
            .field("pending_exit", &self.pending_exit)
            .field("pending_return", &self.pending_return)
            .field("effect_until", &self.effect_until)
            .field("observers", &self.observers.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{ctx, Harness};
    use std::sync::{Arc, Mutex};

    fn tracker() -> MovementTracker {
        MovementTracker::new(&EngineConfig::default())
    }

    fn secs(s: f64) -> Timespan {
        Timespan::from_secs_f64(s)
    }

    /// Fires movement events due by `until`.
    fn run(h: &mut Harness, tracker: &mut MovementTracker, until: SimTime) {
        while let Some(fired) = h.scheduler.pop_until(until) {
            let mut cx = ctx(h);
            match fired.payload {
                EngineEvent::ExitRange => tracker.on_exit(fired.handle, &mut cx).unwrap(),
                EngineEvent::ReturnToRange => tracker.on_return(fired.handle, &mut cx),
                _ => {}
            }
        }
        h.scheduler.advance_to(until);
    }

    mod effect_tests {
        use super::*;

        #[test]
        fn rejects_bad_parameters() {
            assert_eq!(
                MovementEffect::new(0.0, secs(1.0)).validate(),
                Err(MovementError::InvalidDistance(0.0))
            );
            assert_eq!(
                MovementEffect::new(10.0, Timespan::ZERO).validate(),
                Err(MovementError::ZeroDuration)
            );
            assert!(MovementEffect::new(10.0, secs(1.0))
                .with_direction_factor(f32::NAN)
                .validate()
                .is_err());
        }

        #[test]
        fn invalid_effect_leaves_tracker_untouched() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let result = tracker.trigger(&MovementEffect::new(-1.0, secs(1.0)), 5.0, &mut ctx(&mut h));

            assert!(result.is_err());
            assert_eq!(tracker.effect_until(), SimTime::ZERO);
            assert!(h.scheduler.is_empty());
        }
    }

    mod trigger_tests {
        use super::*;

        #[test]
        fn short_move_stays_in_range() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let outcome = tracker
                .trigger(&MovementEffect::new(4.0, secs(1.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            assert_eq!(outcome, MovementOutcome::StaysInRange);
            assert_eq!(tracker.phase(), MovementPhase::InRange);
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn long_move_schedules_exit_at_fraction_of_duration() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let outcome = tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            // 15 yards beyond reach: exit after 2.0 * (1 - 15/20)
            assert_eq!(
                outcome,
                MovementOutcome::ExitScheduled {
                    yards: 15.0,
                    exit_after: secs(0.5),
                }
            );
            assert_eq!(tracker.phase(), MovementPhase::PendingExit);
            assert_eq!(tracker.pending_exit().unwrap().due(), SimTime::from_secs_f64(0.5));
        }

        #[test]
        fn direction_factor_extends_reach() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let outcome = tracker
                .trigger(
                    &MovementEffect::new(20.0, secs(2.0)).with_direction_factor(2.0),
                    5.0,
                    &mut ctx(&mut h),
                )
                .unwrap();

            assert_eq!(
                outcome,
                MovementOutcome::ExitScheduled {
                    yards: 10.0,
                    exit_after: secs(1.0),
                }
            );
        }

        #[test]
        fn exit_marks_actor_out_of_range() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            run(&mut h, &mut tracker, SimTime::from_secs_f64(0.5));

            // 15 yards at 10 yd/s, plus 1.5s left on the effect
            assert_eq!(tracker.status(), RangeStatus::OutOfRange);
            assert_eq!(tracker.pending_exit(), None);
            assert_eq!(h.actor.out_of_range, vec![secs(3.0)]);
            assert_eq!(tracker.pending_return().unwrap().due(), SimTime::from_secs_f64(3.5));

            run(&mut h, &mut tracker, SimTime::from_secs_f64(3.5));
            assert_eq!(tracker.phase(), MovementPhase::InRange);
            assert_eq!(tracker.yards_out_of_range(), 0.0);
        }
    }

    mod reset_tests {
        use super::*;

        #[test]
        fn trigger_while_out_of_range_resets() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();
            run(&mut h, &mut tracker, SimTime::from_secs_f64(2.5));
            assert_eq!(tracker.status(), RangeStatus::OutOfRange);

            let outcome = tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            assert_eq!(outcome, MovementOutcome::Reset);
            assert_eq!(tracker.status(), RangeStatus::InRange);
            assert_eq!(tracker.yards_out_of_range(), 0.0);
            assert_eq!(tracker.pending_exit(), None);
            assert_eq!(tracker.pending_return(), None);
            assert!(h.scheduler.is_empty());
            assert_eq!(h.actor.out_of_range.last(), Some(&Timespan::ZERO));
        }

        #[test]
        fn trigger_during_running_effect_cancels_pending_exit() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();
            let exit = tracker.pending_exit().unwrap();
            run(&mut h, &mut tracker, SimTime::from_secs_f64(0.2));

            let outcome = tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            assert_eq!(outcome, MovementOutcome::Reset);
            assert!(!h.scheduler.is_pending(exit));
            run(&mut h, &mut tracker, SimTime::from_secs_f64(10.0));
            assert_eq!(tracker.status(), RangeStatus::InRange);
        }

        #[test]
        fn externally_moving_actor_resets() {
            let mut h = Harness::new();
            h.actor.moving = true;
            let mut tracker = tracker();
            let outcome = tracker
                .trigger(&MovementEffect::new(30.0, secs(1.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            assert_eq!(outcome, MovementOutcome::Reset);
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn stale_exit_is_ignored() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();
            let exit = tracker.pending_exit().unwrap();
            h.scheduler.advance_to(SimTime::from_secs_f64(0.1));
            tracker
                .trigger(&MovementEffect::new(20.0, secs(2.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            tracker.on_exit(exit, &mut ctx(&mut h)).unwrap();
            assert_eq!(tracker.status(), RangeStatus::InRange);
            assert!(h.actor.out_of_range.iter().all(|d| d.is_zero()));
        }
    }

    mod observer_tests {
        use super::*;

        #[test]
        fn observers_run_once_per_trigger() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&seen);
            tracker.add_observer(move |at: SimTime, outcome: &MovementOutcome| {
                sink.lock().unwrap().push((at, *outcome));
            });

            tracker
                .trigger(&MovementEffect::new(4.0, secs(1.0)), 5.0, &mut ctx(&mut h))
                .unwrap();
            tracker
                .trigger(&MovementEffect::new(4.0, secs(1.0)), 5.0, &mut ctx(&mut h))
                .unwrap();

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].1, MovementOutcome::StaysInRange);
            assert_eq!(seen[1].1, MovementOutcome::Reset);
        }

        #[test]
        fn invalid_effect_notifies_nobody() {
            let mut h = Harness::new();
            let mut tracker = tracker();
            let calls = Arc::new(Mutex::new(0));
            let sink = Arc::clone(&calls);
            tracker.add_observer(move |_: SimTime, _: &MovementOutcome| {
                *sink.lock().unwrap() += 1;
            });

            let _ = tracker.trigger(&MovementEffect::new(10.0, Timespan::ZERO), 5.0, &mut ctx(&mut h));
            assert_eq!(*calls.lock().unwrap(), 0);
        }
    }
}
