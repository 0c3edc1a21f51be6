//! Fire-and-forget telemetry.
//!
//! The engine records a [`Signal`] for every externally interesting transition:
//! spawns, activations, expirations, overflows, consumptions, grants and range
//! changes. Signals never influence engine state.
//!
//! [`Telemetry`] keeps:
//! - an ordered log of `(SimTime, Signal)` that callers drain with
//!   [`Telemetry::take_signals`]
//! - running per-kind counters that survive draining
//! - per-source spawn counters, keyed by the label passed to
//!   [`SpawnRequest::from_source`](crate::registry::SpawnRequest::from_source)
//!
//! Every signal is also emitted as a `tracing` event at `debug` level
//! (`warn` for overflow).

use std::collections::BTreeMap;

use cadence::{SimTime, Timespan};
use serde::{Deserialize, Serialize};

use crate::config::OverflowPolicy;
use crate::fragment::{FragmentId, FragmentKind};

/// A recorded engine transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Signal {
    /// A fragment was created in the Pending state.
    Spawned {
        /// New fragment.
        id: FragmentId,
        /// Its kind.
        kind: FragmentKind,
        /// Spawning ability, if labelled.
        source: Option<&'static str>,
    },
    /// A fragment became Active.
    Activated {
        /// Activated fragment.
        id: FragmentId,
    },
    /// A fragment expired unconsumed.
    Expired {
        /// Expired fragment.
        id: FragmentId,
        /// Its kind.
        kind: FragmentKind,
    },
    /// A spawn hit capacity.
    Overflow {
        /// Kind of the fragment that did not fit.
        kind: FragmentKind,
        /// Policy applied.
        policy: OverflowPolicy,
    },
    /// A fragment was consumed.
    Consumed {
        /// Consumed fragment.
        id: FragmentId,
        /// Its kind.
        kind: FragmentKind,
        /// Whether the grant was applied synchronously.
        instant: bool,
    },
    /// A resource grant was delivered to the actor.
    Granted {
        /// Kind of the fragment that produced the grant.
        kind: FragmentKind,
        /// Amount granted.
        amount: u32,
    },
    /// A movement effect carried the actor out of range.
    ExitRange {
        /// How long until the actor is back in range.
        return_after: Timespan,
    },
    /// The actor is back in range after an exit.
    ReturnToRange,
    /// A movement effect arrived mid-movement and reset range tracking.
    MovementReset,
}

/// Discriminant of a [`Signal`], used for counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// [`Signal::Spawned`]
    Spawned,
    /// [`Signal::Activated`]
    Activated,
    /// [`Signal::Expired`]
    Expired,
    /// [`Signal::Overflow`]
    Overflow,
    /// [`Signal::Consumed`]
    Consumed,
    /// [`Signal::Granted`]
    Granted,
    /// [`Signal::ExitRange`]
    ExitRange,
    /// [`Signal::ReturnToRange`]
    ReturnToRange,
    /// [`Signal::MovementReset`]
    MovementReset,
}

impl Signal {
    /// Returns this signal's discriminant.
    #[must_use]
    pub const fn kind(&self) -> SignalKind {
        match self {
            Self::Spawned { .. } => SignalKind::Spawned,
            Self::Activated { .. } => SignalKind::Activated,
            Self::Expired { .. } => SignalKind::Expired,
            Self::Overflow { .. } => SignalKind::Overflow,
            Self::Consumed { .. } => SignalKind::Consumed,
            Self::Granted { .. } => SignalKind::Granted,
            Self::ExitRange { .. } => SignalKind::ExitRange,
            Self::ReturnToRange => SignalKind::ReturnToRange,
            Self::MovementReset => SignalKind::MovementReset,
        }
    }
}

/// Signal log and counters for one engine.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    log: Vec<(SimTime, Signal)>,
    counts: BTreeMap<SignalKind, u64>,
    spawns_by_source: BTreeMap<&'static str, u64>,
}

impl Telemetry {
    /// Creates an empty telemetry sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signal at `at`.
    pub fn record(&mut self, at: SimTime, signal: Signal) {
        match &signal {
            Signal::Overflow { kind, policy } => {
                tracing::warn!(%at, %kind, ?policy, "fragment capacity overflow");
            }
            Signal::Spawned { source, .. } => {
                if let Some(source) = source {
                    *self.spawns_by_source.entry(*source).or_insert(0) += 1;
                }
                tracing::debug!(%at, ?signal, "telemetry");
            }
            _ => tracing::debug!(%at, ?signal, "telemetry"),
        }
        *self.counts.entry(signal.kind()).or_insert(0) += 1;
        self.log.push((at, signal));
    }

    /// Total signals of `kind` recorded so far, including drained ones.
    #[must_use]
    pub fn count(&self, kind: SignalKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Fragments spawned with the given source label.
    #[must_use]
    pub fn spawned_from(&self, source: &str) -> u64 {
        self.spawns_by_source.get(source).copied().unwrap_or(0)
    }

    /// Signals recorded since the last drain, in recording order.
    #[must_use]
    pub fn signals(&self) -> &[(SimTime, Signal)] {
        &self.log
    }

    /// Drains and returns the signal log. Counters are kept.
    pub fn take_signals(&mut self) -> Vec<(SimTime, Signal)> {
        std::mem::take(&mut self.log)
    }

    /// Returns true if no signals are waiting in the log.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
