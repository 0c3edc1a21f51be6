//! Simulated time.
//!
//! Time is stored as integer microseconds. Using an integer as the canonical
//! unit means ordering is total (no NaN), comparisons are exact, and repeated
//! scheduling never accumulates floating-point drift. Conversions from seconds
//! round to the nearest microsecond.
//!
//! # Example
//!
//! ```
//! use cadence::{SimTime, Timespan};
//!
//! let start = SimTime::ZERO;
//! let later = start + Timespan::from_secs_f64(1.5);
//!
//! assert_eq!(later.as_micros(), 1_500_000);
//! assert_eq!(later - start, Timespan::from_millis(1_500));
//! assert_eq!(later.to_string(), "1.500s");
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: f64 = 1_000_000.0;

// =============================================================================
// Timespan
// =============================================================================

/// A non-negative simulated duration in microseconds.
///
/// Durations are never negative: conversions from negative or NaN seconds
/// clamp to [`Timespan::ZERO`], and subtraction saturates.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timespan(u64);

impl Timespan {
    /// The empty duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from whole microseconds.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Creates a duration from whole milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }

    /// Creates a duration from fractional seconds.
    ///
    /// Rounds to the nearest microsecond. Negative and NaN inputs clamp to
    /// zero; values too large to represent saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        // `as` saturates for out-of-range floats
        Self((secs * MICROS_PER_SEC).round() as u64)
    }

    /// Returns the duration in whole microseconds.
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns the duration in fractional seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SEC
    }

    /// Returns true for the empty duration.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Scales the duration by a factor, clamping negative results to zero.
    #[must_use]
    pub fn mul_f64(self, factor: f64) -> Self {
        Self::from_secs_f64(self.as_secs_f64() * factor)
    }

    /// Subtracts `rhs`, stopping at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Timespan {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Timespan {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Debug for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timespan({self})")
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

// =============================================================================
// SimTime
// =============================================================================

/// An absolute simulated instant, in microseconds since simulation start.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The simulation start.
    pub const ZERO: Self = Self(0);

    /// The largest representable instant.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates an instant from microseconds since start.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Creates an instant from fractional seconds since start.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Timespan::from_secs_f64(secs).as_micros())
    }

    /// Returns the instant in microseconds since start.
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns the instant in fractional seconds since start.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        Timespan(self.0).as_secs_f64()
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> Timespan {
        Timespan(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Timespan> for SimTime {
    type Output = Self;

    fn add(self, rhs: Timespan) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for SimTime {
    type Output = Timespan;

    fn sub(self, rhs: Self) -> Timespan {
        self.saturating_since(rhs)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({self})")
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

// =============================================================================
// Tests
// =============================================================================
