//! Line-of-sight obstruction and occlusion between an emitter and its listeners.

use crate::config::{CollisionChannel, SharedRoomObstruction};
use crate::engine::{GameObjectId, ObstructionValue};
use crate::math::Vec3;
use crate::scene::{ActorId, RayTracer, TraceQuery};
use std::collections::BTreeMap;

/// Hits closer than this to the listener count as reaching it
const LISTENER_TOLERANCE: f32 = 0.01;

/// Last values computed for one listener
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObstructionState {
    pub obstruction: f32,
    pub occlusion: f32,
    /// World time of the last trace, `None` before the first one
    pub last_refresh: Option<f64>,
    /// Obstruction and occlusion the engine last accepted
    pub sent: (f32, f32),
}

/// Inputs of one refresh
#[derive(Debug, Clone, Copy)]
pub struct ObstructionQuery {
    pub emitter: Vec3,
    pub listener: Vec3,
    /// Actor the emitter is attached to, ignored by the trace
    pub owner: Option<ActorId>,
    /// Emitter and listener are in the same spatial audio room
    pub shared_room: bool,
    pub channel: CollisionChannel,
    /// Seconds between traces; 0 or less disables tracing
    pub refresh_interval: f32,
    pub now: f64,
    /// Report blocked lines as obstruction rather than occlusion. Set when
    /// spatial audio rooms carry occlusion through their transmission loss.
    pub as_obstruction: bool,
}

/// Result of [`ObstructionOcclusionService::maybe_refresh`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refresh {
    pub value: ObstructionValue,
    /// The values differ from the ones the engine last accepted
    pub changed: bool,
}

/// Throttled per-listener obstruction of one emitter.
#[derive(Debug)]
pub struct ObstructionOcclusionService {
    states: BTreeMap<GameObjectId, ObstructionState>,
    shared_room_policy: SharedRoomObstruction,
}

impl ObstructionOcclusionService {
    pub fn new(shared_room_policy: SharedRoomObstruction) -> Self {
        Self {
            states: BTreeMap::new(),
            shared_room_policy,
        }
    }

    pub fn state(&self, listener: GameObjectId) -> Option<&ObstructionState> {
        self.states.get(&listener)
    }

    pub fn listeners(&self) -> impl Iterator<Item = GameObjectId> + '_ {
        self.states.keys().copied()
    }

    /// Recomputes the values for `listener` if the refresh interval elapsed,
    /// otherwise returns the cached ones without tracing.
    pub fn maybe_refresh(
        &mut self,
        listener: GameObjectId,
        query: &ObstructionQuery,
        tracer: &dyn RayTracer,
    ) -> Refresh {
        let state = self.states.entry(listener).or_default();
        let due = query.refresh_interval > 0.0
            && state
                .last_refresh
                .is_none_or(|last| query.now - last >= f64::from(query.refresh_interval));
        if !due {
            return Refresh {
                value: value_of(listener, state),
                changed: state.sent != (state.obstruction, state.occlusion),
            };
        }

        let blocked = if query.shared_room
            && self.shared_room_policy == SharedRoomObstruction::Skip
        {
            0.0
        } else {
            trace(query, tracer)
        };
        let (obstruction, occlusion) = if query.as_obstruction {
            (blocked, 0.0)
        } else {
            (0.0, blocked)
        };

        if state.obstruction != obstruction || state.occlusion != occlusion {
            log::debug!(
                "Obstruction toward {} is now {} / occlusion {}",
                listener,
                obstruction,
                occlusion
            );
        }
        state.obstruction = obstruction;
        state.occlusion = occlusion;
        state.last_refresh = Some(query.now);
        Refresh {
            value: value_of(listener, state),
            changed: state.sent != (obstruction, occlusion),
        }
    }

    /// Records `value` as accepted by the engine.
    pub fn mark_sent(&mut self, value: &ObstructionValue) {
        if let Some(state) = self.states.get_mut(&value.listener) {
            state.sent = (value.obstruction, value.occlusion);
        }
    }

    /// Drops the cached values of a listener that went away.
    pub fn forget_listener(&mut self, listener: GameObjectId) -> bool {
        self.states.remove(&listener).is_some()
    }

    /// Keeps only the listeners in `current`.
    ///
    /// Returns the ones that were dropped.
    pub fn retain_listeners(&mut self, current: &[GameObjectId]) -> Vec<GameObjectId> {
        let stale: Vec<GameObjectId> = self
            .states
            .keys()
            .filter(|id| !current.contains(id))
            .copied()
            .collect();
        for id in &stale {
            self.states.remove(id);
        }
        stale
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

fn value_of(listener: GameObjectId, state: &ObstructionState) -> ObstructionValue {
    ObstructionValue {
        listener,
        obstruction: state.obstruction,
        occlusion: state.occlusion,
    }
}

/// How strongly the direct line from emitter to listener is blocked.
fn trace(query: &ObstructionQuery, tracer: &dyn RayTracer) -> f32 {
    let Some(ray) = TraceQuery::between(query.emitter, query.listener, query.channel, query.owner)
    else {
        return 0.0;
    };
    let hit = tracer.cast_ray(&ray);
    if hit.blocks(&ray, LISTENER_TOLERANCE) {
        hit.occlusion
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::RayHit;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A wall at x = 5 that counts its traces
    struct Wall {
        traces: AtomicUsize,
    }

    impl Wall {
        fn new() -> Self {
            Self {
                traces: AtomicUsize::new(0),
            }
        }

        fn traces(&self) -> usize {
            self.traces.load(Ordering::Relaxed)
        }
    }

    impl RayTracer for Wall {
        fn cast_ray(&self, query: &TraceQuery) -> RayHit {
            self.traces.fetch_add(1, Ordering::Relaxed);
            let end = query.origin + query.direction * query.max_distance;
            if (query.origin.x - 5.0).signum() != (end.x - 5.0).signum() {
                let distance = (5.0 - query.origin.x) / query.direction.x;
                RayHit::new(distance, -Vec3::X).with_occlusion(0.7)
            } else {
                RayHit::miss()
            }
        }
    }

    fn query(listener: Vec3, now: f64) -> ObstructionQuery {
        ObstructionQuery {
            emitter: Vec3::ZERO,
            listener,
            owner: None,
            shared_room: false,
            channel: CollisionChannel::Visibility,
            refresh_interval: 0.5,
            now,
            as_obstruction: false,
        }
    }

    #[test]
    fn second_call_within_interval_uses_cache() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        let listener = GameObjectId(2);

        let first = service.maybe_refresh(listener, &query(Vec3::new(10.0, 0.0, 0.0), 1.0), &wall);
        service.mark_sent(&first.value);
        let second = service.maybe_refresh(listener, &query(Vec3::new(10.0, 0.0, 0.0), 1.2), &wall);
        assert_eq!(first.value, second.value);
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(wall.traces(), 1);
        assert_eq!(first.value.occlusion, 0.7);

        service.maybe_refresh(listener, &query(Vec3::new(10.0, 0.0, 0.0), 1.5), &wall);
        assert_eq!(wall.traces(), 2);
    }

    #[test]
    fn zero_interval_disables_tracing() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        let mut disabled = query(Vec3::new(10.0, 0.0, 0.0), 1.0);
        disabled.refresh_interval = 0.0;

        let refresh = service.maybe_refresh(GameObjectId(2), &disabled, &wall);
        assert_eq!(refresh.value.occlusion, 0.0);
        assert_eq!(wall.traces(), 0);
    }

    #[test]
    fn blocked_line_reports_obstruction_when_rooms_are_used() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        let mut with_rooms = query(Vec3::new(10.0, 0.0, 0.0), 1.0);
        with_rooms.as_obstruction = true;

        let refresh = service.maybe_refresh(GameObjectId(2), &with_rooms, &wall);
        assert_eq!(refresh.value.obstruction, 0.7);
        assert_eq!(refresh.value.occlusion, 0.0);
    }

    #[test]
    fn shared_room_can_skip_the_trace() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Skip);
        let mut same_room = query(Vec3::new(10.0, 0.0, 0.0), 1.0);
        same_room.shared_room = true;

        let refresh = service.maybe_refresh(GameObjectId(2), &same_room, &wall);
        assert_eq!(refresh.value.occlusion, 0.0);
        assert_eq!(wall.traces(), 0);
    }

    #[test]
    fn clear_line_is_unobstructed() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        let refresh = service.maybe_refresh(GameObjectId(2), &query(Vec3::new(3.0, 1.0, 0.0), 1.0), &wall);
        assert_eq!(refresh.value.occlusion, 0.0);
        assert!(!refresh.changed);
    }

    #[test]
    fn stale_listeners_are_dropped() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        service.maybe_refresh(GameObjectId(2), &query(Vec3::X, 1.0), &wall);
        service.maybe_refresh(GameObjectId(3), &query(Vec3::X, 1.0), &wall);

        assert_eq!(service.retain_listeners(&[GameObjectId(3)]), vec![GameObjectId(2)]);
        assert!(service.state(GameObjectId(2)).is_none());
        assert!(service.forget_listener(GameObjectId(3)));
        assert_eq!(service.listeners().count(), 0);
    }

    #[test]
    fn unsent_values_stay_pending() {
        let wall = Wall::new();
        let mut service = ObstructionOcclusionService::new(SharedRoomObstruction::Trace);
        let listener = GameObjectId(2);
        let behind_wall = Vec3::new(10.0, 0.0, 0.0);

        assert!(service.maybe_refresh(listener, &query(behind_wall, 1.0), &wall).changed);
        let retry = service.maybe_refresh(listener, &query(behind_wall, 1.1), &wall);
        assert!(retry.changed);
        assert_eq!(wall.traces(), 1);

        service.mark_sent(&retry.value);
        assert!(!service.maybe_refresh(listener, &query(behind_wall, 1.2), &wall).changed);
    }
}
