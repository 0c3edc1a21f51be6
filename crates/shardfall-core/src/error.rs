//! Error types for the fragment and movement engine.
//!
//! Each concern has its own enum so call sites stay precise; all of them fold
//! into [`EngineError`] through `From` so engine entry points can use `?`.
//!
//! Capacity overflow is deliberately absent: it is governed by
//! [`OverflowPolicy`](crate::config::OverflowPolicy) and reported through
//! [`SpawnReport`](crate::registry::SpawnReport), not raised.

use thiserror::Error;

use crate::fragment::FragmentKind;

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Capacity must allow at least one fragment.
    #[error("max_fragments must be at least 1")]
    ZeroCapacity,

    /// A numeric field was negative, NaN or infinite.
    #[error("{field} must be finite and non-negative, got {value}")]
    NotFiniteNonNegative {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A numeric field fell outside its permitted range.
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
}

/// A count-query expression that cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The expression was empty or had more than two dotted tokens.
    #[error("malformed fragment query '{0}': expected <category>[.<filter>]")]
    Malformed(String),

    /// The first token does not name a fragment category.
    #[error("unknown fragment category '{0}'")]
    UnknownCategory(String),

    /// The second token is not `active`, `inactive` or `total`.
    #[error("unsupported fragment filter '{0}'")]
    UnknownFilter(String),
}

/// Travel-time precondition violation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TravelError {
    /// Speed was zero, negative or not finite; the delay would be undefined.
    #[error("travel speed must be positive and finite, got {0}")]
    NonPositiveSpeed(f32),
}

/// Invalid fragment construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FragmentError {
    /// A spawnable kind needs exactly one size class and one origin class.
    #[error("fragment kind {0:?} must have exactly one size class and one origin class")]
    InvalidKind(FragmentKind),
}

/// Invalid movement effect parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MovementError {
    /// Distance must be positive and finite.
    #[error("movement distance must be positive and finite, got {0}")]
    InvalidDistance(f32),

    /// Effect duration must be non-zero.
    #[error("movement effect duration must be non-zero")]
    ZeroDuration,

    /// Direction factor must be finite and non-negative.
    #[error("movement direction factor must be finite and non-negative, got {0}")]
    InvalidDirectionFactor(f32),
}

/// Top-level error for engine entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Configuration rejected at construction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Count query rejected at parse time.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Travel-time precondition violated.
    #[error("travel error: {0}")]
    Travel(#[from] TravelError),

    /// Fragment construction rejected.
    #[error("fragment error: {0}")]
    Fragment(#[from] FragmentError),

    /// Movement effect rejected.
    #[error("movement error: {0}")]
    Movement(#[from] MovementError),
}

/// Shorthand result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
