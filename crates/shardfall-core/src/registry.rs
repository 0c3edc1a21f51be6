//! Fragment registry.
//!
//! The registry owns every live fragment of one actor and drives their
//! lifecycle through the engine's scheduler:
//! - **spawn** places Pending fragments and schedules their activation
//! - **activation** makes a fragment Active and schedules its expiration, or
//!   consumes it on the spot when it was spawned `consume_on_activation`
//! - **expiration** removes an Active fragment that was never picked up
//! - **consume** removes Active fragments matching a mask and grants their
//!   resource to the actor
//!
//! # Invariants
//!
//! - Pending + Active fragments never exceed the configured capacity
//! - Each fragment has at most one outstanding activation and at most one
//!   outstanding expiration; expiration is only scheduled by activation, so it
//!   always fires later
//! - Leaving the registry cancels every outstanding handle of the fragment, so
//!   a consumed fragment can never expire
//!
//! # Ordering
//!
//! Fragments are stored in a `BTreeMap` keyed by [`FragmentId`]. Ids grow with
//! every spawn, so iteration order is spawn order, and consumption picks the
//! earliest-spawned matching fragments first.

use std::collections::BTreeMap;

use cadence::{EventHandle, Timespan};
use glam::Vec2;

use crate::config::{EngineConfig, OverflowPolicy};
use crate::engine::{EngineContext, EngineEvent};
use crate::error::{EngineResult, TravelError};
use crate::fragment::{Fragment, FragmentId, FragmentKind, FragmentState};
use crate::telemetry::Signal;
use crate::travel::travel_time;

// =============================================================================
// Requests and Reports
// =============================================================================

/// Parameters for [`FragmentRegistry::spawn`].
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use shardfall_core::fragment::FragmentKind;
/// use shardfall_core::registry::SpawnRequest;
///
/// let request = SpawnRequest::new(FragmentKind::lesser(), 2)
///     .at(Vec2::new(10.0, 0.0))
///     .from_source("fracture");
/// assert_eq!(request.count, 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Kind of every fragment in this request.
    pub kind: FragmentKind,
    /// Number of fragments to spawn.
    pub count: usize,
    /// Spawn origin; `None` uses the actor's current position.
    pub origin: Option<Vec2>,
    /// Consume each fragment as soon as it activates.
    pub consume_on_activation: bool,
    /// Label of the spawning ability, for telemetry.
    pub source: Option<&'static str>,
}

impl SpawnRequest {
    /// Spawns `count` fragments of `kind` at the actor's position.
    #[must_use]
    pub fn new(kind: FragmentKind, count: usize) -> Self {
        Self {
            kind,
            count,
            origin: None,
            consume_on_activation: false,
            source: None,
        }
    }

    /// Sets an explicit spawn origin.
    #[must_use]
    pub fn at(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Consumes the fragments as soon as they activate.
    #[must_use]
    pub fn consume_on_activation(mut self) -> Self {
        self.consume_on_activation = true;
        self
    }

    /// Labels the spawn with the ability that caused it.
    #[must_use]
    pub fn from_source(mut self, source: &'static str) -> Self {
        self.source = Some(source);
        self
    }
}

/// Outcome of a spawn call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnReport {
    /// Fragments created, in spawn order.
    pub created: Vec<FragmentId>,
    /// Units dropped under [`OverflowPolicy::Reject`].
    pub rejected: usize,
    /// Fragments consumed to make room under [`OverflowPolicy::EvictOldest`].
    pub evicted: Vec<FragmentId>,
}

/// Parameters for [`FragmentRegistry::consume`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Grant the fragment's resource to the actor.
    pub heal: bool,
    /// Grant synchronously instead of after the fragment travels to the actor.
    pub instant: bool,
    /// Upper bound on fragments consumed; `None` means the registry capacity.
    pub max: Option<usize>,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            heal: true,
            instant: false,
            max: None,
        }
    }
}

impl ConsumeOptions {
    /// Default options: heal, travel-delayed grant, no limit below capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes at most `max` fragments.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Grants synchronously.
    #[must_use]
    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    /// Removes the fragments without granting anything.
    #[must_use]
    pub fn without_heal(mut self) -> Self {
        self.heal = false;
        self
    }
}

/// How a consumed fragment's resource reaches the actor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Grant {
    None,
    Now,
    After(Timespan),
}

// =============================================================================
// FragmentRegistry
// =============================================================================

/// All live fragments of one actor.
#[derive(Debug, Clone)]
pub struct FragmentRegistry {
    fragments: BTreeMap<FragmentId, Fragment>,
    next_id: u64,
    spawn_left: bool,
    max_fragments: usize,
    fragment_duration: Timespan,
    placement_offset: f32,
    overflow_policy: OverflowPolicy,
}

impl FragmentRegistry {
    /// Creates an empty registry with limits taken from `config`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fragments: BTreeMap::new(),
            next_id: 0,
            spawn_left: false,
            max_fragments: config.max_fragments,
            fragment_duration: config.fragment_duration,
            placement_offset: config.placement_offset,
            overflow_policy: config.overflow_policy,
        }
    }

    /// Maximum number of Pending + Active fragments.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_fragments
    }

    /// Number of live (Pending + Active) fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if no fragments are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Looks up a live fragment.
    #[must_use]
    pub fn get(&self, id: FragmentId) -> Option<&Fragment> {
        self.fragments.get(&id)
    }

    /// Iterates live fragments in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    // -------------------------------------------------------------------------
    // Counts
    // -------------------------------------------------------------------------

    /// Active fragments whose kind intersects `mask`.
    #[must_use]
    pub fn count_active(&self, mask: FragmentKind) -> usize {
        self.count_where(mask, FragmentState::Active)
    }

    /// Pending fragments whose kind intersects `mask`.
    #[must_use]
    pub fn count_inactive(&self, mask: FragmentKind) -> usize {
        self.count_where(mask, FragmentState::Pending)
    }

    /// Live fragments whose kind intersects `mask`.
    ///
    /// Always equals `count_active(mask) + count_inactive(mask)`.
    #[must_use]
    pub fn count_total(&self, mask: FragmentKind) -> usize {
        self.fragments
            .values()
            .filter(|f| f.kind().matches(mask))
            .count()
    }

    fn count_where(&self, mask: FragmentKind, state: FragmentState) -> usize {
        self.fragments
            .values()
            .filter(|f| f.state == state && f.kind().matches(mask))
            .count()
    }

    // -------------------------------------------------------------------------
    // Spawn
    // -------------------------------------------------------------------------

    /// Spawns the fragments described by `request`.
    ///
    /// Every unit of one call is placed on the same side of the origin; the
    /// side alternates left/right between calls. Each fragment activates after
    /// the travel time from origin to placement at the actor's run speed.
    ///
    /// Units that do not fit are handled by the configured
    /// [`OverflowPolicy`]; overflow is reported, never raised.
    ///
    /// # Errors
    ///
    /// - [`FragmentError::InvalidKind`](crate::error::FragmentError::InvalidKind)
    ///   if `request.kind` is a mask rather than a concrete kind
    /// - [`TravelError::NonPositiveSpeed`] if the actor's run speed is not
    ///   positive
    ///
    /// On error the registry is unchanged.
    pub fn spawn(
        &mut self,
        request: &SpawnRequest,
        cx: &mut EngineContext<'_>,
    ) -> EngineResult<SpawnReport> {
        let kind = request.kind.validate()?;
        let origin = request.origin.unwrap_or_else(|| cx.actor.position());
        let side = if self.spawn_left { -1.0 } else { 1.0 };
        let placement = origin + Vec2::new(side * self.placement_offset, 0.0);
        let delay = travel_time(origin.distance(placement), cx.actor.run_speed())?;
        self.spawn_left = !self.spawn_left;

        let mut report = SpawnReport::default();
        for _ in 0..request.count {
            if self.fragments.len() >= self.max_fragments {
                cx.record(Signal::Overflow {
                    kind,
                    policy: self.overflow_policy,
                });
                match self.overflow_policy {
                    OverflowPolicy::Reject => {
                        report.rejected += 1;
                        continue;
                    }
                    OverflowPolicy::EvictOldest => {
                        if let Some(oldest) = self.fragments.keys().next().copied() {
                            self.finish(oldest, Grant::Now, cx);
                            report.evicted.push(oldest);
                        }
                    }
                }
            }

            let id = FragmentId::new(self.next_id);
            self.next_id += 1;

            let mut fragment = Fragment::pending(
                id,
                kind,
                placement,
                request.consume_on_activation,
                cx.scheduler.now(),
                request.source,
            );
            fragment.activation = Some(
                cx.scheduler
                    .schedule(delay, EngineEvent::ActivateFragment(id)),
            );
            self.fragments.insert(id, fragment);

            tracing::debug!(%id, %kind, %delay, "fragment spawned");
            cx.record(Signal::Spawned {
                id,
                kind,
                source: request.source,
            });
            report.created.push(id);
        }

        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Timer callbacks
    // -------------------------------------------------------------------------

    /// Handles a fired activation event.
    ///
    /// Stale handles (the fragment is gone or holds a different activation)
    /// are ignored.
    pub fn on_activate(&mut self, id: FragmentId, handle: EventHandle, cx: &mut EngineContext<'_>) {
        let Some(fragment) = self.fragments.get_mut(&id) else {
            tracing::trace!(%id, "activation for missing fragment ignored");
            return;
        };
        if fragment.activation != Some(handle) || fragment.state != FragmentState::Pending {
            tracing::trace!(%id, ?handle, "stale activation ignored");
            return;
        }
        fragment.activation = None;

        if fragment.consume_on_activation() {
            self.finish(id, Grant::Now, cx);
            return;
        }

        fragment.state = FragmentState::Active;
        fragment.expiration = Some(
            cx.scheduler
                .schedule(self.fragment_duration, EngineEvent::ExpireFragment(id)),
        );
        tracing::debug!(%id, "fragment active");
        cx.record(Signal::Activated { id });
    }

    /// Handles a fired expiration event.
    ///
    /// Stale handles are ignored.
    pub fn on_expire(&mut self, id: FragmentId, handle: EventHandle, cx: &mut EngineContext<'_>) {
        let current = self
            .fragments
            .get(&id)
            .is_some_and(|f| f.expiration == Some(handle) && f.is_active());
        if !current {
            tracing::trace!(%id, ?handle, "stale expiration ignored");
            return;
        }

        if let Some(mut fragment) = self.fragments.remove(&id) {
            fragment.expiration = None;
            fragment.state = FragmentState::Expired;
            tracing::debug!(%id, kind = %fragment.kind(), "fragment expired");
            cx.record(Signal::Expired {
                id,
                kind: fragment.kind(),
            });
        }
    }

    // -------------------------------------------------------------------------
    // Consumption
    // -------------------------------------------------------------------------

    /// Consumes up to `options.max` Active fragments matching `mask`,
    /// earliest-spawned first.
    ///
    /// Each consumed fragment's expiration is cancelled before it is removed.
    /// With `heal`, the actor receives one unit per fragment: immediately when
    /// `instant`, otherwise after the fragment travels from its placement to
    /// the actor's current position.
    ///
    /// Returns the number of fragments consumed, which is 0 when nothing
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns [`TravelError::NonPositiveSpeed`] for a delayed grant when the
    /// actor's run speed is not positive. Nothing is consumed in that case.
    pub fn consume(
        &mut self,
        mask: FragmentKind,
        options: ConsumeOptions,
        cx: &mut EngineContext<'_>,
    ) -> EngineResult<usize> {
        let max = options.max.unwrap_or(self.max_fragments);
        let actor_position = cx.actor.position();
        let speed = cx.actor.run_speed();

        let plan = self
            .fragments
            .values()
            .filter(|f| f.is_active() && f.kind().matches(mask))
            .take(max)
            .map(|f| -> Result<(FragmentId, Grant), TravelError> {
                let grant = match (options.heal, options.instant) {
                    (false, _) => Grant::None,
                    (true, true) => Grant::Now,
                    (true, false) => {
                        Grant::After(travel_time(f.position().distance(actor_position), speed)?)
                    }
                };
                Ok((f.id(), grant))
            })
            .collect::<Result<Vec<_>, TravelError>>()?;

        for (id, grant) in &plan {
            self.finish(*id, *grant, cx);
        }
        Ok(plan.len())
    }

    /// Consumes one specific Active fragment with an immediate grant.
    ///
    /// Returns false if the fragment is not live or not yet Active.
    pub fn pick_up(&mut self, id: FragmentId, cx: &mut EngineContext<'_>) -> bool {
        if !self.fragments.get(&id).is_some_and(Fragment::is_active) {
            return false;
        }
        self.finish(id, Grant::Now, cx);
        true
    }

    /// Removes a fragment as Consumed, cancelling both of its timers.
    fn finish(&mut self, id: FragmentId, grant: Grant, cx: &mut EngineContext<'_>) {
        let Some(mut fragment) = self.fragments.remove(&id) else {
            return;
        };
        if let Some(handle) = fragment.activation.take() {
            cx.scheduler.cancel(handle);
        }
        if let Some(handle) = fragment.expiration.take() {
            cx.scheduler.cancel(handle);
        }
        fragment.state = FragmentState::Consumed;

        let kind = fragment.kind();
        tracing::debug!(%id, %kind, ?grant, "fragment consumed");
        cx.record(Signal::Consumed {
            id,
            kind,
            instant: !matches!(grant, Grant::After(_)),
        });

        match grant {
            Grant::None => {}
            Grant::Now => cx.grant(kind),
            Grant::After(delay) => {
                cx.scheduler
                    .schedule(delay, EngineEvent::GrantResource(kind));
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{ctx, Harness};
    use cadence::SimTime;

    fn harness_with(config: EngineConfig) -> (Harness, FragmentRegistry) {
        let registry = FragmentRegistry::new(&config);
        (Harness::new(), registry)
    }

    fn harness() -> (Harness, FragmentRegistry) {
        harness_with(EngineConfig::default())
    }

    /// Fires every event due by `until`, routing fragment events to `registry`.
    fn run(h: &mut Harness, registry: &mut FragmentRegistry, until: SimTime) {
        while let Some(fired) = h.scheduler.pop_until(until) {
            let mut cx = ctx(h);
            match fired.payload {
                EngineEvent::ActivateFragment(id) => registry.on_activate(id, fired.handle, &mut cx),
                EngineEvent::ExpireFragment(id) => registry.on_expire(id, fired.handle, &mut cx),
                EngineEvent::GrantResource(kind) => cx.grant(kind),
                EngineEvent::ExitRange | EngineEvent::ReturnToRange => {}
            }
        }
        h.scheduler.advance_to(until);
    }

    mod spawn_tests {
        use super::*;

        #[test]
        fn spawn_creates_pending_fragments() {
            let (mut h, mut registry) = harness();
            let report = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 2), &mut ctx(&mut h))
                .unwrap();

            assert_eq!(report.created.len(), 2);
            assert_eq!(registry.count_inactive(FragmentKind::ANY), 2);
            assert_eq!(registry.count_active(FragmentKind::ANY), 0);
            assert!(registry.iter().all(|f| f.activation().is_some()));
        }

        #[test]
        fn placement_alternates_per_call() {
            let (mut h, mut registry) = harness();
            let origin = Vec2::new(10.0, 5.0);
            let first = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 2).at(origin), &mut ctx(&mut h))
                .unwrap();
            let second = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 1).at(origin), &mut ctx(&mut h))
                .unwrap();

            let pos = |id| registry.get(id).unwrap().position();
            assert_eq!(pos(first.created[0]), Vec2::new(13.0, 5.0));
            assert_eq!(pos(first.created[1]), Vec2::new(13.0, 5.0));
            assert_eq!(pos(second.created[0]), Vec2::new(7.0, 5.0));
        }

        #[test]
        fn default_origin_is_actor_position() {
            let (mut h, mut registry) = harness();
            h.actor.position = Vec2::new(-4.0, 2.0);
            let report = registry
                .spawn(&SpawnRequest::new(FragmentKind::greater(), 1), &mut ctx(&mut h))
                .unwrap();

            assert_eq!(registry.get(report.created[0]).unwrap().position(), Vec2::new(-1.0, 2.0));
        }

        #[test]
        fn rejects_mask_kind() {
            let (mut h, mut registry) = harness();
            let result = registry.spawn(&SpawnRequest::new(FragmentKind::ANY, 1), &mut ctx(&mut h));

            assert!(result.is_err());
            assert!(registry.is_empty());
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn zero_speed_is_an_error_and_changes_nothing() {
            let (mut h, mut registry) = harness();
            h.actor.run_speed = 0.0;
            let result = registry.spawn(&SpawnRequest::new(FragmentKind::lesser(), 1), &mut ctx(&mut h));

            assert!(result.is_err());
            assert!(registry.is_empty());
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn records_source_telemetry() {
            let (mut h, mut registry) = harness();
            registry
                .spawn(
                    &SpawnRequest::new(FragmentKind::lesser(), 2).from_source("fracture"),
                    &mut ctx(&mut h),
                )
                .unwrap();

            assert_eq!(h.telemetry.spawned_from("fracture"), 2);
        }
    }

    mod overflow_tests {
        use super::*;
        use crate::telemetry::SignalKind;

        #[test]
        fn reject_keeps_existing_fragments() {
            let (mut h, mut registry) = harness_with(EngineConfig {
                max_fragments: 2,
                ..Default::default()
            });
            let first = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 2), &mut ctx(&mut h))
                .unwrap();
            let pending_events = h.scheduler.len();

            let report = registry
                .spawn(&SpawnRequest::new(FragmentKind::greater(), 3), &mut ctx(&mut h))
                .unwrap();

            assert!(report.created.is_empty());
            assert_eq!(report.rejected, 3);
            assert_eq!(registry.iter().map(Fragment::id).collect::<Vec<_>>(), first.created);
            assert_eq!(h.scheduler.len(), pending_events);
            assert_eq!(h.telemetry.count(SignalKind::Overflow), 3);
        }

        #[test]
        fn reject_fills_remaining_room() {
            let (mut h, mut registry) = harness_with(EngineConfig {
                max_fragments: 3,
                ..Default::default()
            });
            let report = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 5), &mut ctx(&mut h))
                .unwrap();

            assert_eq!(report.created.len(), 3);
            assert_eq!(report.rejected, 2);
            assert_eq!(registry.len(), 3);
        }

        #[test]
        fn evict_oldest_consumes_earliest() {
            let (mut h, mut registry) = harness_with(EngineConfig {
                max_fragments: 2,
                overflow_policy: OverflowPolicy::EvictOldest,
                ..Default::default()
            });
            let first = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 2), &mut ctx(&mut h))
                .unwrap();
            let report = registry
                .spawn(&SpawnRequest::new(FragmentKind::greater(), 1), &mut ctx(&mut h))
                .unwrap();

            assert_eq!(report.evicted, vec![first.created[0]]);
            assert_eq!(report.created.len(), 1);
            assert_eq!(registry.len(), 2);
            assert!(registry.get(first.created[0]).is_none());
            assert_eq!(h.actor.granted, vec![(FragmentKind::lesser(), 1)]);
            // The evicted fragment's activation was cancelled with it
            assert_eq!(h.scheduler.len(), 2);
        }
    }

    mod lifecycle_tests {
        use super::*;
        use crate::telemetry::SignalKind;

        #[test]
        fn activation_then_expiration() {
            let (mut h, mut registry) = harness();
            let id = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 1), &mut ctx(&mut h))
                .unwrap()
                .created[0];

            // 3 yards at 10 yd/s
            run(&mut h, &mut registry, SimTime::from_secs_f64(0.3));
            let fragment = registry.get(id).unwrap();
            assert!(fragment.is_active());
            assert_eq!(fragment.activation(), None);
            let expiry = fragment.expiration().unwrap().due();
            assert_eq!(expiry, SimTime::from_secs_f64(20.3));

            run(&mut h, &mut registry, expiry);
            assert!(registry.get(id).is_none());
            assert_eq!(h.telemetry.count(SignalKind::Expired), 1);
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn consume_on_activation_skips_active_state() {
            let (mut h, mut registry) = harness();
            registry
                .spawn(
                    &SpawnRequest::new(FragmentKind::greater(), 1).consume_on_activation(),
                    &mut ctx(&mut h),
                )
                .unwrap();

            run(&mut h, &mut registry, SimTime::from_secs_f64(1.0));
            assert!(registry.is_empty());
            assert_eq!(h.actor.granted, vec![(FragmentKind::greater(), 1)]);
            assert_eq!(h.telemetry.count(SignalKind::Activated), 0);
            assert!(h.scheduler.is_empty());
        }

        #[test]
        fn stale_activation_is_ignored() {
            let (mut h, mut registry) = harness();
            let id = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 1), &mut ctx(&mut h))
                .unwrap()
                .created[0];
            let real = registry.get(id).unwrap().activation().unwrap();
            let bogus = h.scheduler.schedule(Timespan::ZERO, EngineEvent::ActivateFragment(id));

            let fired = h.scheduler.pop_until(SimTime::MAX).unwrap();
            assert_eq!(fired.handle, bogus);
            registry.on_activate(id, fired.handle, &mut ctx(&mut h));

            assert!(registry.get(id).unwrap().is_pending());
            assert_eq!(registry.get(id).unwrap().activation(), Some(real));
        }
    }

    mod consume_tests {
        use super::*;
        use crate::telemetry::SignalKind;

        fn spawn_active(h: &mut Harness, registry: &mut FragmentRegistry, kinds: &[FragmentKind]) -> Vec<FragmentId> {
            let mut ids = Vec::new();
            for kind in kinds {
                ids.extend(
                    registry
                        .spawn(&SpawnRequest::new(*kind, 1), &mut ctx(h))
                        .unwrap()
                        .created,
                );
            }
            let now = h.scheduler.now();
            run(h, registry, now + Timespan::from_secs_f64(1.0));
            ids
        }

        #[test]
        fn consumes_earliest_matching_first() {
            let (mut h, mut registry) = harness();
            let ids = spawn_active(
                &mut h,
                &mut registry,
                &[FragmentKind::greater(), FragmentKind::lesser(), FragmentKind::greater()],
            );

            let consumed = registry
                .consume(FragmentKind::ANY_GREATER, ConsumeOptions::new().max(1).instant(), &mut ctx(&mut h))
                .unwrap();

            assert_eq!(consumed, 1);
            assert!(registry.get(ids[0]).is_none());
            assert!(registry.get(ids[1]).is_some());
            assert!(registry.get(ids[2]).is_some());
        }

        #[test]
        fn zero_matches_returns_zero() {
            let (mut h, mut registry) = harness();
            spawn_active(&mut h, &mut registry, &[FragmentKind::lesser()]);

            let consumed = registry
                .consume(FragmentKind::ANY_DEMON, ConsumeOptions::new(), &mut ctx(&mut h))
                .unwrap();
            assert_eq!(consumed, 0);
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn pending_fragments_are_not_consumed() {
            let (mut h, mut registry) = harness();
            registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 2), &mut ctx(&mut h))
                .unwrap();

            let consumed = registry
                .consume(FragmentKind::ANY, ConsumeOptions::new(), &mut ctx(&mut h))
                .unwrap();
            assert_eq!(consumed, 0);
            assert_eq!(registry.count_inactive(FragmentKind::ANY), 2);
        }

        #[test]
        fn consumption_cancels_expiration() {
            let (mut h, mut registry) = harness();
            let ids = spawn_active(&mut h, &mut registry, &[FragmentKind::lesser()]);
            let expiration = registry.get(ids[0]).unwrap().expiration().unwrap();

            registry
                .consume(FragmentKind::ANY, ConsumeOptions::new().instant(), &mut ctx(&mut h))
                .unwrap();

            assert!(!h.scheduler.is_pending(expiration));
            run(&mut h, &mut registry, SimTime::from_secs_f64(60.0));
            assert_eq!(h.telemetry.count(SignalKind::Expired), 0);
        }

        #[test]
        fn delayed_grant_arrives_after_travel() {
            let (mut h, mut registry) = harness();
            spawn_active(&mut h, &mut registry, &[FragmentKind::lesser()]);
            let consumed_at = h.scheduler.now();

            registry
                .consume(FragmentKind::ANY, ConsumeOptions::new(), &mut ctx(&mut h))
                .unwrap();
            assert!(registry.is_empty());
            assert!(h.actor.granted.is_empty());

            // Fragment lies 3 yards from the actor at 10 yd/s
            run(&mut h, &mut registry, consumed_at + Timespan::from_millis(299));
            assert!(h.actor.granted.is_empty());
            run(&mut h, &mut registry, consumed_at + Timespan::from_millis(300));
            assert_eq!(h.actor.granted, vec![(FragmentKind::lesser(), 1)]);
        }

        #[test]
        fn without_heal_grants_nothing() {
            let (mut h, mut registry) = harness();
            spawn_active(&mut h, &mut registry, &[FragmentKind::lesser(), FragmentKind::lesser()]);

            let consumed = registry
                .consume(FragmentKind::ANY, ConsumeOptions::new().without_heal(), &mut ctx(&mut h))
                .unwrap();
            run(&mut h, &mut registry, SimTime::from_secs_f64(5.0));

            assert_eq!(consumed, 2);
            assert!(h.actor.granted.is_empty());
        }

        #[test]
        fn pick_up_requires_active() {
            let (mut h, mut registry) = harness();
            let id = registry
                .spawn(&SpawnRequest::new(FragmentKind::lesser(), 1), &mut ctx(&mut h))
                .unwrap()
                .created[0];

            assert!(!registry.pick_up(id, &mut ctx(&mut h)));
            run(&mut h, &mut registry, SimTime::from_secs_f64(1.0));
            assert!(registry.pick_up(id, &mut ctx(&mut h)));
            assert!(!registry.pick_up(id, &mut ctx(&mut h)));
        }
    }
}
