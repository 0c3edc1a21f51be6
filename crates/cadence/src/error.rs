//! Scheduling errors.

use thiserror::Error;

use crate::SimTime;

/// Errors raised by [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// An absolute instant earlier than the scheduler's clock was requested.
    #[error("cannot schedule at {requested}: clock is already at {now}")]
    InThePast {
        /// The instant that was requested.
        requested: SimTime,
        /// The scheduler's current instant.
        now: SimTime,
    },
}
