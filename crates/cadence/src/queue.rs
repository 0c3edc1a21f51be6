//! Cancelable event queue.
//!
//! The [`Scheduler`] holds future events keyed by `(due, sequence)`:
//!
//! - `due` orders events chronologically
//! - `sequence` is a monotonically increasing registration stamp that breaks
//!   same-instant ties in registration order
//!
//! The key doubles as the event's [`EventHandle`]. Because sequence numbers are
//! never reused, a handle can only ever match the one event it was issued for.
//! Cancelling removes the key; cancelling again (or cancelling a handle whose
//! event already fired) finds nothing and is a no-op. Holders of a stale handle
//! can therefore never observe or disturb a different event.
//!
//! # Example
//!
//! ```
//! use cadence::{Scheduler, SimTime, Timespan};
//!
//! let mut scheduler = Scheduler::new();
//! let first = scheduler.schedule(Timespan::from_secs_f64(1.0), "first");
//! let second = scheduler.schedule(Timespan::from_secs_f64(1.0), "second");
//!
//! // Same instant: registration order wins
//! let fired = scheduler.pop_until(SimTime::MAX).unwrap();
//! assert_eq!(fired.handle, first);
//! assert_eq!(scheduler.now(), SimTime::from_secs_f64(1.0));
//!
//! // A fired handle is stale; cancelling it does nothing
//! assert!(!scheduler.cancel(first));
//! assert!(scheduler.is_pending(second));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::time::{SimTime, Timespan};

// =============================================================================
// EventHandle
// =============================================================================

/// Generation-stamped reference to a scheduled event.
///
/// Handles are cheap to copy and safe to hold after the event fires or is
/// cancelled: every query or cancellation through a stale handle is a no-op.
///
/// # Ordering
///
/// Handles order by `(due, sequence)`, which is exactly the firing order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventHandle {
    due: SimTime,
    sequence: u64,
}

impl EventHandle {
    /// The instant this event is (or was) due to fire.
    #[must_use]
    pub const fn due(self) -> SimTime {
        self.due
    }

    /// The registration stamp of this event.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.sequence
    }
}

impl fmt::Debug for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandle(#{} @ {})", self.sequence, self.due)
    }
}

/// An event removed from the queue because its due time was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    /// The handle the event was scheduled under.
    pub handle: EventHandle,
    /// The scheduled payload.
    pub payload: E,
}

// =============================================================================
// Scheduler
// =============================================================================

/// Discrete-event scheduler over a closed payload type.
///
/// The scheduler owns the simulated clock. The clock only moves forward, either
/// when an event is popped (to that event's due time) or through
/// [`advance_to`](Self::advance_to).
///
/// # Determinism
///
/// Events fire strictly in `(due, registration)` order. Two runs that schedule
/// the same events in the same order observe the same firing sequence.
pub struct Scheduler<E> {
    now: SimTime,
    next_sequence: u64,
    pending: BTreeMap<EventHandle, E>,
}

impl<E> Scheduler<E> {
    /// Creates an empty scheduler with the clock at [`SimTime::ZERO`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_sequence: 0,
            pending: BTreeMap::new(),
        }
    }

    /// The current simulated instant.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedules `payload` to fire `delay` after the current instant.
    ///
    /// A zero delay fires at the current instant, after every event already
    /// scheduled for it.
    pub fn schedule(&mut self, delay: Timespan, payload: E) -> EventHandle {
        self.insert(self.now + delay, payload)
    }

    /// Schedules `payload` to fire at the absolute instant `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InThePast`] if `at` is earlier than the clock.
    pub fn schedule_at(&mut self, at: SimTime, payload: E) -> Result<EventHandle, ScheduleError> {
        if at < self.now {
            return Err(ScheduleError::InThePast {
                requested: at,
                now: self.now,
            });
        }
        Ok(self.insert(at, payload))
    }

    fn insert(&mut self, due: SimTime, payload: E) -> EventHandle {
        let handle = EventHandle {
            due,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.pending.insert(handle, payload);
        tracing::trace!(?handle, "event scheduled");
        handle
    }

    /// Cancels a pending event.
    ///
    /// Returns `true` if the event was pending and is now removed. Cancelling a
    /// handle that already fired or was already cancelled returns `false` and
    /// has no effect.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let removed = self.pending.remove(&handle).is_some();
        if removed {
            tracing::trace!(?handle, "event cancelled");
        }
        removed
    }

    /// Returns true if `handle` refers to an event that has not yet fired.
    #[must_use]
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Time left until a pending event fires, or `None` for stale handles.
    #[must_use]
    pub fn remains(&self, handle: EventHandle) -> Option<Timespan> {
        self.is_pending(handle)
            .then(|| handle.due.saturating_since(self.now))
    }

    /// Removes and returns the earliest event due at or before `limit`.
    ///
    /// Advances the clock to the event's due time. Returns `None` (leaving the
    /// clock untouched) when no event is due by `limit`.
    pub fn pop_until(&mut self, limit: SimTime) -> Option<Fired<E>> {
        let entry = self.pending.first_entry()?;
        if entry.key().due > limit {
            return None;
        }
        let (handle, payload) = entry.remove_entry();
        self.now = self.now.max(handle.due);
        tracing::trace!(?handle, "event fired");
        Some(Fired { handle, payload })
    }

    /// Moves the clock forward to `t`. Earlier instants are ignored.
    ///
    /// Events due before `t` are not fired; drain them with
    /// [`pop_until`](Self::pop_until) first.
    pub fn advance_to(&mut self, t: SimTime) {
        self.now = self.now.max(t);
    }

    /// Due time of the earliest pending event.
    #[must_use]
    pub fn next_due(&self) -> Option<SimTime> {
        self.pending.keys().next().map(|handle| handle.due)
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterates pending events in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (EventHandle, &E)> {
        self.pending.iter().map(|(handle, payload)| (*handle, payload))
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for Scheduler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("next_sequence", &self.next_sequence)
            .field("pending", &self.pending)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
