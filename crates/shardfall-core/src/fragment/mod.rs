//! Fragment entities.
//!
//! This module provides the single resource object managed by the engine:
//! - [`FragmentId`]: Spawn-ordered identifier
//! - [`FragmentKind`]: Category set (size class + origin class)
//! - [`FragmentState`]: Lifecycle state machine
//! - [`Fragment`]: The complete fragment with position and timers
//!
//! # Lifecycle
//!
//! ```text
//! Pending --activation fires--> Active --expiration fires--> Expired
//!    |                            |
//!    | (consume_on_activation)    +--consume()-------------> Consumed
//!    +---------------------------------------------------->  Consumed
//! ```
//!
//! `Consumed` and `Expired` are terminal; the registry removes a fragment as
//! soon as it reaches either.

pub mod kind;

use std::fmt;

use cadence::{EventHandle, SimTime};
use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use kind::FragmentKind;

/// Unique identifier for a fragment.
///
/// Identifiers are assigned from a per-registry counter, so ordering by id is
/// ordering by spawn time. Consumption relies on this for its
/// earliest-spawned-first rule.
///
/// # Example
///
/// ```
/// use shardfall_core::fragment::FragmentId;
///
/// assert!(FragmentId::new(1) < FragmentId::new(2));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FragmentId(u64);

impl FragmentId {
    /// Creates a `FragmentId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FragmentId({})", self.0)
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a fragment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentState {
    /// Travelling to its placement; not yet consumable.
    Pending,
    /// Lying at its placement; consumable until it expires.
    Active,
    /// Picked up by the actor (terminal).
    Consumed,
    /// Timed out unconsumed (terminal).
    Expired,
}

impl FragmentState {
    /// Returns true for `Consumed` and `Expired`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Consumed | Self::Expired)
    }
}

/// A single fragment.
///
/// Position, kind and the consume-on-activation flag are fixed at spawn. The
/// two timer handles are owned here: at most one activation and at most one
/// expiration may be outstanding, and both are cleared whenever the fragment
/// leaves `Pending`/`Active`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    id: FragmentId,
    kind: FragmentKind,
    position: Vec2,
    consume_on_activation: bool,
    spawned_at: SimTime,
    source: Option<&'static str>,
    pub(crate) state: FragmentState,
    pub(crate) activation: Option<EventHandle>,
    pub(crate) expiration: Option<EventHandle>,
}

impl Fragment {
    pub(crate) fn pending(
        id: FragmentId,
        kind: FragmentKind,
        position: Vec2,
        consume_on_activation: bool,
        spawned_at: SimTime,
        source: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            consume_on_activation,
            spawned_at,
            source,
            state: FragmentState::Pending,
            activation: None,
            expiration: None,
        }
    }

    /// The fragment's identifier.
    #[must_use]
    pub fn id(&self) -> FragmentId {
        self.id
    }

    /// The fragment's category set.
    #[must_use]
    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// Where the fragment was placed.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether activation consumes the fragment instead of making it Active.
    #[must_use]
    pub fn consume_on_activation(&self) -> bool {
        self.consume_on_activation
    }

    /// When the fragment was spawned.
    #[must_use]
    pub fn spawned_at(&self) -> SimTime {
        self.spawned_at
    }

    /// Label of the ability or effect that spawned the fragment.
    #[must_use]
    pub fn source(&self) -> Option<&'static str> {
        self.source
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> FragmentState {
        self.state
    }

    /// Returns true while the fragment can be consumed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == FragmentState::Active
    }

    /// Returns true while the fragment is still travelling.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == FragmentState::Pending
    }

    /// Outstanding activation event, if any.
    #[must_use]
    pub fn activation(&self) -> Option<EventHandle> {
        self.activation
    }

    /// Outstanding expiration event, if any.
    #[must_use]
    pub fn expiration(&self) -> Option<EventHandle> {
        self.expiration
    }
}
