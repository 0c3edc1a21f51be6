//! Travel-time model.
//!
//! Maps a distance and a speed to a delay: `distance / speed`, never negative.
//! Used for fragment activation (spawn origin to placement) and for
//! non-instant resource grants (fragment to actor).

use cadence::Timespan;

use crate::error::TravelError;

/// Time needed to cover `distance` yards at `speed` yards per second.
///
/// Negative distances clamp to zero delay.
///
/// # Errors
///
/// Returns [`TravelError::NonPositiveSpeed`] when `speed` is zero, negative,
/// or not finite. This is a precondition violation on the caller's side: the
/// delay would be infinite or undefined.
///
/// # Example
///
/// ```
/// use shardfall_core::travel::travel_time;
/// use cadence::Timespan;
///
/// assert_eq!(travel_time(10.0, 10.0).unwrap(), Timespan::from_secs_f64(1.0));
/// assert!(travel_time(10.0, 0.0).is_err());
/// ```
pub fn travel_time(distance: f32, speed: f32) -> Result<Timespan, TravelError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(TravelError::NonPositiveSpeed(speed));
    }
    let distance = f64::from(distance.max(0.0));
    Ok(Timespan::from_secs_f64(distance / f64::from(speed)))
}
