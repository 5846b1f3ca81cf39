//! The game object every sound is played on.
//!
//! An [`EmitterGameObject`] tracks which rooms it is in, owns its reverb sends
//! and its per-listener obstruction, and pushes whatever changed to the sound
//! engine once per tick.

use crate::config::{EmitterConfig, RoomverbWorldDesc};
use crate::engine::{
    self, AudioContext, CallbackFlags, EventId, GameObjectId, GameObjectUpdate, PlayingId, RoomId,
    SoundEngine, SwitchGroupId, SwitchStateId, TriggerId,
};
use crate::events::RoomverbEvent;
use crate::listener::ListenerSet;
use crate::math::Pose;
use crate::obstruction::{ObstructionOcclusionService, ObstructionQuery};
use crate::reverb::{ReverbCandidate, ReverbSendTable};
use crate::room::{IndexedRoom, RoomIndex};
use crate::scene::{ActorRef, RayTracer};
use crate::world::SimulationMode;
use std::collections::BTreeMap;

/// Where a listener was at the start of the tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerSnapshot {
    pub pose: Pose,
    pub room: Option<RoomId>,
}

/// Shared inputs of one emitter tick
pub struct EmitterTick<'a> {
    pub dt: f32,
    /// World time in seconds
    pub now: f64,
    pub mode: SimulationMode,
    pub audio: &'a AudioContext,
    pub desc: &'a RoomverbWorldDesc,
    pub tracer: &'a dyn RayTracer,
    /// Every live listener of the world
    pub listeners: &'a BTreeMap<GameObjectId, ListenerSnapshot>,
    pub default_listeners: &'a [GameObjectId],
}

/// An emitter or listener registered with the sound engine.
#[derive(Debug)]
pub struct EmitterGameObject {
    id: GameObjectId,
    name: String,
    config: EmitterConfig,
    pose: Pose,
    registered: bool,
    sent_pose: Option<Pose>,
    sent_room: Option<Option<RoomId>>,
    sent_listeners: Option<Vec<GameObjectId>>,
    room_revision: Option<u64>,
    rooms: Vec<RoomId>,
    current_room: Option<RoomId>,
    reverb: ReverbSendTable,
    obstruction: ObstructionOcclusionService,
    listeners: ListenerSet,
    playing: Vec<PlayingId>,
    radius: Option<(f32, f32)>,
}

impl EmitterGameObject {
    pub fn new(
        id: GameObjectId,
        name: impl Into<String>,
        pose: Pose,
        config: EmitterConfig,
        desc: &RoomverbWorldDesc,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            pose,
            registered: false,
            sent_pose: None,
            sent_room: None,
            sent_listeners: None,
            room_revision: None,
            rooms: Vec::new(),
            current_room: None,
            reverb: ReverbSendTable::new(
                usize::from(desc.max_simultaneous_reverb_volumes),
                desc.snap_initial_reverb_sends,
                desc.aux_send_epsilon,
            ),
            obstruction: ObstructionOcclusionService::new(desc.shared_room_obstruction),
            listeners: ListenerSet::new(),
            playing: Vec::new(),
            radius: None,
        }
    }

    pub fn id(&self) -> GameObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn is_listener(&self) -> bool {
        self.config.is_listener
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// The spatial audio room the object is in
    pub fn current_room(&self) -> Option<RoomId> {
        self.current_room
    }

    /// Every room containing the object, smallest first
    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }

    pub fn reverb_sends(&self) -> &ReverbSendTable {
        &self.reverb
    }

    pub fn obstruction(&self) -> &ObstructionOcclusionService {
        &self.obstruction
    }

    /// Explicit listeners, used once [`set_listeners`](Self::set_listeners) was called
    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn uses_default_listeners(&self) -> bool {
        self.config.use_default_listeners
    }

    /// Replaces the default listeners with an explicit set.
    pub fn set_listeners(&mut self, listeners: impl IntoIterator<Item = GameObjectId>) {
        self.listeners.replace(listeners);
        self.config.use_default_listeners = false;
    }

    /// Goes back to following the world's default listeners.
    pub fn use_default_listeners(&mut self) {
        self.config.use_default_listeners = true;
        self.sent_listeners = None;
    }

    pub fn set_occlusion_refresh_interval(&mut self, seconds: f32) {
        self.config.occlusion_refresh_interval = seconds;
    }

    pub fn set_use_reverb_volumes(&mut self, enable: bool) {
        self.config.use_reverb_volumes = enable;
    }

    pub fn owner(&self) -> Option<&ActorRef> {
        self.config.owner.as_ref()
    }

    pub fn set_stop_when_owner_destroyed(&mut self, stop: bool) {
        self.config.stop_when_owner_destroyed = stop;
    }

    /// Outer and inner attenuation radii, if set
    pub fn radius(&self) -> Option<(f32, f32)> {
        self.radius
    }

    pub fn playing_ids(&self) -> &[PlayingId] {
        &self.playing
    }

    fn register(&mut self, engine: &dyn SoundEngine) -> bool {
        if !self.registered
            && engine::succeeded(
                engine.register_game_object(self.id, &self.name),
                "RegisterGameObject",
            )
            .is_some()
        {
            log::debug!("Registered {} '{}'", self.id, self.name);
            self.registered = true;
            self.sent_pose = None;
            self.sent_room = None;
            self.sent_listeners = None;
            if let Some((outer, inner)) = self.radius {
                engine::succeeded(
                    engine.set_game_object_radius(self.id, outer, inner),
                    "SetGameObjectRadius",
                );
            }
        }
        self.registered
    }

    /// One simulation step, in this order: rooms, reverb sends, obstruction,
    /// then a single batched push of whatever changed.
    ///
    /// Skipped entirely while the engine is unavailable. Reverb and
    /// obstruction only run in [`SimulationMode::Play`].
    pub fn tick(
        &mut self,
        ctx: &EmitterTick<'_>,
        index: &mut RoomIndex,
        events: &mut Vec<RoomverbEvent>,
    ) {
        let Some(engine) = ctx.audio.engine() else {
            return;
        };
        if !self.register(engine) {
            return;
        }
        self.stop_if_owner_destroyed(engine);

        let mut update = GameObjectUpdate::new(self.id);

        let moved = self
            .sent_pose
            .is_none_or(|sent| self.pose.differs_from(&sent, ctx.desc.movement_epsilon));
        if moved {
            update.pose = Some(self.pose);
        }
        if moved || self.room_revision != Some(index.revision()) {
            self.update_rooms(index, ctx.desc.containment_epsilon, events);
        }
        if self.sent_room != Some(self.current_room) {
            update.room = Some(self.current_room);
        }

        if ctx.mode == SimulationMode::Play {
            let candidates = if self.config.use_reverb_volumes {
                self.reverb_candidates(index)
            } else {
                Vec::new()
            };
            self.reverb.recompute(&candidates);
            self.reverb.advance(ctx.dt);
            update.aux_sends = self.reverb.pending_update();

            self.refresh_obstruction(ctx, index, &mut update);
        }

        self.sync_listeners(engine);

        if update.is_empty() {
            return;
        }
        // Anything not accepted stays pending and goes out again next tick
        if engine::succeeded(engine.submit(&update), "GameObjectUpdate").is_none() {
            return;
        }
        if let Some(pose) = update.pose {
            self.sent_pose = Some(pose);
        }
        if let Some(room) = update.room {
            self.sent_room = Some(room);
        }
        if let Some(sends) = update.aux_sends {
            self.reverb.commit(&sends);
            events.push(RoomverbEvent::ReverbSendsChanged {
                game_object: self.id,
                sends,
            });
        }
        for value in update.obstruction {
            self.obstruction.mark_sent(&value);
            events.push(RoomverbEvent::ObstructionChanged {
                game_object: self.id,
                listener: value.listener,
                obstruction: value.obstruction,
                occlusion: value.occlusion,
            });
        }
    }

    fn stop_if_owner_destroyed(&mut self, engine: &dyn SoundEngine) {
        let owner_gone = self
            .config
            .owner
            .as_ref()
            .is_some_and(|owner| !owner.is_alive());
        if !self.config.stop_when_owner_destroyed || !owner_gone || self.playing.is_empty() {
            return;
        }
        log::debug!("Owner of {} destroyed; stopping its sounds", self.id);
        if engine::succeeded(engine.stop_game_object(self.id), "StopGameObject").is_some() {
            self.playing.clear();
        }
    }

    fn update_rooms(
        &mut self,
        index: &mut RoomIndex,
        epsilon: f32,
        events: &mut Vec<RoomverbEvent>,
    ) {
        let containing = index.rooms_containing(self.pose.position, epsilon);
        let ids: Vec<RoomId> = containing.iter().map(|r| r.id).collect();
        let primary = self.pick_primary(&containing);

        for room in ids.iter().filter(|id| !self.rooms.contains(id)) {
            log::debug!("{} entered {}", self.id, room);
            events.push(RoomverbEvent::RoomEntered {
                game_object: self.id,
                room: *room,
            });
        }
        for room in self.rooms.iter().filter(|id| !ids.contains(id)) {
            log::debug!("{} left {}", self.id, room);
            events.push(RoomverbEvent::RoomExited {
                game_object: self.id,
                room: *room,
            });
        }

        index.set_occupancy(self.id, &ids);
        self.room_revision = Some(index.revision());
        self.rooms = ids;
        self.current_room = primary;
    }

    /// The smallest spatial audio room; among equally small ones, a room
    /// just entered wins over the one the object was already in.
    fn pick_primary(&self, containing: &[&IndexedRoom]) -> Option<RoomId> {
        let mut spatial = containing.iter().filter(|r| r.spatial_audio);
        let smallest = spatial.next()?;
        let ties: Vec<RoomId> = std::iter::once(*smallest)
            .chain(spatial.take_while(|r| r.volume == smallest.volume).copied())
            .map(|r| r.id)
            .collect();

        ties.iter()
            .find(|id| !self.rooms.contains(id))
            .or_else(|| ties.iter().find(|id| Some(**id) == self.current_room))
            .or(ties.first())
            .copied()
    }

    fn reverb_candidates(&self, index: &RoomIndex) -> Vec<ReverbCandidate> {
        self.rooms
            .iter()
            .filter_map(|id| index.get(*id))
            .filter_map(|room| {
                let reverb = room.reverb?;
                Some(ReverbCandidate {
                    room: room.id,
                    aux_bus: reverb.aux_bus,
                    send_level: reverb.send_level,
                    fade_rate: reverb.fade_rate,
                    priority: reverb.priority,
                    exempt: room.spatial_audio,
                })
            })
            .collect()
    }

    fn listener_ids(&self, ctx: &EmitterTick<'_>) -> Vec<GameObjectId> {
        if self.config.use_default_listeners {
            ctx.default_listeners.to_vec()
        } else {
            self.listeners.snapshot()
        }
    }

    fn refresh_obstruction(
        &mut self,
        ctx: &EmitterTick<'_>,
        index: &RoomIndex,
        update: &mut GameObjectUpdate,
    ) {
        let mut live = Vec::new();
        for listener in self.listener_ids(ctx) {
            if listener == self.id {
                continue;
            }
            if ctx.listeners.contains_key(&listener) {
                live.push(listener);
            } else if self.listeners.remove(listener) {
                log::warn!("{} dropped destroyed listener {}", self.id, listener);
            }
        }
        for stale in self.obstruction.retain_listeners(&live) {
            log::debug!("{} forgot obstruction toward {}", self.id, stale);
        }

        let owner = self.config.owner.as_ref().and_then(ActorRef::live_id);
        let channel = self
            .config
            .occlusion_channel
            .resolve(ctx.desc.default_occlusion_channel);
        let as_obstruction = index.has_spatial_audio_rooms();

        for listener in live {
            let Some(snapshot) = ctx.listeners.get(&listener) else {
                continue;
            };
            let query = ObstructionQuery {
                emitter: self.pose.position,
                listener: snapshot.pose.position,
                owner,
                shared_room: self.current_room.is_some() && self.current_room == snapshot.room,
                channel,
                refresh_interval: self.config.occlusion_refresh_interval,
                now: ctx.now,
                as_obstruction,
            };
            let refresh = self.obstruction.maybe_refresh(listener, &query, ctx.tracer);
            if refresh.changed {
                update.obstruction.push(refresh.value);
            }
        }
    }

    fn sync_listeners(&mut self, engine: &dyn SoundEngine) {
        if self.config.use_default_listeners {
            return;
        }
        let listeners = self.listeners.snapshot();
        if self.sent_listeners.as_ref() == Some(&listeners) {
            return;
        }
        if engine::succeeded(engine.set_listeners(self.id, &listeners), "SetListeners").is_some() {
            self.sent_listeners = Some(listeners);
        }
    }

    /// A listener was destroyed: stop tracking it.
    pub fn on_listener_unregistered(&mut self, listener: GameObjectId) {
        self.listeners.remove(listener);
        self.obstruction.forget_listener(listener);
    }

    /// A listener joined the default set. Emitters following the default
    /// set trace toward it on their next tick.
    pub fn on_default_listener_added(&mut self, listener: GameObjectId) {
        if self.config.use_default_listeners {
            self.obstruction.forget_listener(listener);
        }
    }

    /// Posts an event on this object, registering it first if needed.
    pub fn post_event(
        &mut self,
        audio: &AudioContext,
        event: EventId,
        flags: CallbackFlags,
    ) -> Option<PlayingId> {
        let engine = audio.engine()?;
        if !self.register(engine) {
            return None;
        }
        let playing_id = engine::succeeded(engine.post_event(event, self.id, flags), "PostEvent")?;
        self.playing.push(playing_id);
        Some(playing_id)
    }

    /// Sets a switch on this object, registering it first if needed.
    pub fn set_switch(
        &mut self,
        audio: &AudioContext,
        group: SwitchGroupId,
        state: SwitchStateId,
    ) -> bool {
        let Some(engine) = audio.engine() else {
            return false;
        };
        self.register(engine)
            && engine::succeeded(engine.set_switch(self.id, group, state), "SetSwitch").is_some()
    }

    pub fn post_trigger(&mut self, audio: &AudioContext, trigger: TriggerId) -> bool {
        let Some(engine) = audio.engine() else {
            return false;
        };
        self.register(engine)
            && engine::succeeded(engine.post_trigger(self.id, trigger), "PostTrigger").is_some()
    }

    /// Sets the attenuation radii. `inner` is kept within `[0, outer]`.
    ///
    /// The radii are re-sent whenever the object registers again.
    pub fn set_radius(&mut self, audio: &AudioContext, outer: f32, inner: f32) -> bool {
        let outer = outer.max(0.0);
        let inner = inner.clamp(0.0, outer);
        self.radius = Some((outer, inner));
        let Some(engine) = audio.engine() else {
            return false;
        };
        if !self.registered {
            return self.register(engine);
        }
        engine::succeeded(
            engine.set_game_object_radius(self.id, outer, inner),
            "SetGameObjectRadius",
        )
        .is_some()
    }

    /// Sets the dry path volume toward each of `listeners`.
    pub fn set_output_bus_volume(
        &mut self,
        audio: &AudioContext,
        listeners: &[GameObjectId],
        volume: f32,
    ) -> bool {
        let Some(engine) = audio.engine() else {
            return false;
        };
        if !self.register(engine) {
            return false;
        }
        listeners.iter().all(|listener| {
            engine::succeeded(
                engine.set_output_bus_volume(self.id, *listener, volume),
                "SetOutputBusVolume",
            )
            .is_some()
        })
    }

    pub fn on_event_finished(&mut self, playing_id: PlayingId) -> bool {
        let before = self.playing.len();
        self.playing.retain(|id| *id != playing_id);
        self.playing.len() != before
    }

    pub fn stop(&mut self, audio: &AudioContext) {
        if let (true, Some(engine)) = (self.registered, audio.engine()) {
            engine::succeeded(engine.stop_game_object(self.id), "StopGameObject");
        }
        self.playing.clear();
    }

    /// Tears the object down: sends are cut without fading, and the object
    /// leaves the room index, the obstruction caches and the engine.
    pub fn teardown(&mut self, audio: &AudioContext, index: &mut RoomIndex) {
        index.remove_occupant(self.id);
        self.obstruction.clear();
        let flushed = self.reverb.flush();

        if let (true, Some(engine)) = (self.registered, audio.engine()) {
            if let Some(sends) = flushed {
                engine::succeeded(engine.set_aux_send_values(self.id, &sends), "SetAuxSendValues");
            }
            engine::succeeded(engine.unregister_game_object(self.id), "UnregisterGameObject");
        }

        self.registered = false;
        self.rooms.clear();
        self.current_room = None;
        self.room_revision = None;
        self.playing.clear();
    }
}
