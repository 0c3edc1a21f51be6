//! # Cadence
//!
//! Discrete-event substrate for deterministic simulations.
//!
//! Cadence provides the two primitives every event-driven component needs:
//!
//! - **Simulated time**: [`SimTime`] instants and [`Timespan`] durations stored as
//!   integer microseconds, so ordering is total and arithmetic never drifts
//! - **Scheduling**: a [`Scheduler`] that fires payloads in time order, breaks
//!   ties by registration order, and cancels through generation-stamped
//!   [`EventHandle`]s
//!
//! Cancellation is idempotent: a handle that already fired or was already
//! cancelled simply matches nothing.
//!
//! ## Quick Start
//!
//! ```
//! use cadence::{Scheduler, Timespan};
//!
//! #[derive(Debug, PartialEq)]
//! enum Ping {
//!     Early,
//!     Late,
//! }
//!
//! let mut scheduler = Scheduler::new();
//! let late = scheduler.schedule(Timespan::from_secs_f64(2.0), Ping::Late);
//! scheduler.schedule(Timespan::from_secs_f64(1.0), Ping::Early);
//!
//! assert!(scheduler.cancel(late));
//! assert!(!scheduler.cancel(late)); // second cancel is a no-op
//!
//! let fired = scheduler.pop_until(scheduler.now() + Timespan::from_secs_f64(5.0)).unwrap();
//! assert_eq!(fired.payload, Ping::Early);
//! assert!(scheduler.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod queue;
pub mod time;

// Re-exports for convenience
pub use error::ScheduleError;
pub use queue::{EventHandle, Fired, Scheduler};
pub use time::{SimTime, Timespan};
