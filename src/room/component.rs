use super::{IndexedRoom, LateReverb, Room, RoomGeometry, RoomIndex};
use crate::config::RoomverbWorldDesc;
use crate::engine::{
    self, AudioContext, CallbackFlags, GeometrySetId, PlayingId, RoomId, RoomParams,
};
use crate::geometry::VolumeShape;
use crate::math::Vec3;
use crate::scene::ActorRef;
use crate::world::SimulationMode;

/// What a room volume is attached to in the host scene.
///
/// Only primitive components have a shape a room can use.
#[derive(Debug, Clone)]
pub enum AttachParent {
    Primitive(ActorRef),
    NonPrimitive(ActorRef),
    Detached,
}

impl AttachParent {
    pub fn owner(&self) -> Option<&ActorRef> {
        match self {
            Self::Primitive(owner) | Self::NonPrimitive(owner) => Some(owner),
            Self::Detached => None,
        }
    }
}

/// Lifecycle of one room: keeps the [`RoomIndex`] and the sound engine in
/// step with the room's description, its enabled flag and its movement.
#[derive(Debug)]
pub struct RoomComponent {
    room: Room,
    parent: AttachParent,
    geometry: Option<RoomGeometry>,
    configuration_error: bool,
    indexed: bool,
    sent_to_engine: bool,
    params_dirty: bool,
    moving: bool,
    seconds_since_movement: f32,
    playing: Vec<PlayingId>,
}

impl RoomComponent {
    pub fn new(room: Room, parent: AttachParent) -> Self {
        Self {
            room,
            parent,
            geometry: None,
            configuration_error: false,
            indexed: false,
            sent_to_engine: false,
            params_dirty: false,
            moving: false,
            seconds_since_movement: 0.0,
            playing: Vec::new(),
        }
    }

    pub fn with_geometry(mut self, geometry: RoomGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn id(&self) -> RoomId {
        self.room.id
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn parent(&self) -> &AttachParent {
        &self.parent
    }

    pub fn geometry(&self) -> Option<&RoomGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether the room was added to the sound engine
    pub fn is_registered(&self) -> bool {
        self.sent_to_engine
    }

    pub fn has_configuration_error(&self) -> bool {
        self.configuration_error
    }

    pub fn playing_ids(&self) -> &[PlayingId] {
        &self.playing
    }

    /// Attached to a live primitive and enabled
    pub fn is_active(&self) -> bool {
        self.room.enabled
            && !self.configuration_error
            && matches!(&self.parent, AttachParent::Primitive(owner) if owner.is_alive())
    }

    pub fn has_effect_on_location(&self, point: Vec3, epsilon: f32) -> bool {
        self.is_active() && self.room.shape.contains(point, epsilon)
    }

    /// Parameters the room is registered with
    pub fn room_params(&self, desc: &RoomverbWorldDesc) -> RoomParams {
        let (up, front) = self.room.shape.up_and_front();
        let reverb = self.room.active_reverb();
        RoomParams {
            up,
            front,
            transmission_loss: self.room.transmission_loss,
            reverb_aux_bus: reverb.map(|r| r.aux_bus),
            reverb_level: reverb.map_or(0.0, |r| r.send_level),
            geometry_instance: self.geometry.as_ref().map(RoomGeometry::id),
            self_send_level: self.room.self_send_level,
            keep_registered: self.room.event.is_some() || desc.reverb_rtpcs_in_use,
        }
    }

    fn indexed_record(&self) -> IndexedRoom {
        IndexedRoom::new(
            self.room.id,
            self.room.shape.clone(),
            self.room.active_reverb(),
            self.room.transmission_loss,
            self.room.spatial_audio,
        )
    }

    /// Called when the host registers the component.
    pub fn on_register(
        &mut self,
        audio: &AudioContext,
        index: &mut RoomIndex,
        desc: &RoomverbWorldDesc,
    ) {
        match &self.parent {
            AttachParent::NonPrimitive(owner) => {
                log::error!(
                    "Room '{}' ({}) is attached to a non-primitive component of '{}'; \
                     it needs a primitive parent to define its shape and is disabled",
                    self.room.name,
                    self.room.id,
                    owner.name()
                );
                self.configuration_error = true;
                return;
            }
            AttachParent::Detached => {
                log::debug!("Room '{}' has no attach parent yet", self.room.name);
            }
            AttachParent::Primitive(_) => {}
        }
        self.add(audio, index, desc);
    }

    /// Called when play begins.
    ///
    /// A spatial audio room without geometry gets a geometry set of its own,
    /// and the associated event is posted if `auto_post` is set and nothing
    /// is playing yet.
    pub fn begin_play(
        &mut self,
        audio: &AudioContext,
        index: &mut RoomIndex,
        desc: &RoomverbWorldDesc,
    ) {
        if self.geometry.is_none() && self.room.spatial_audio {
            self.geometry = Some(RoomGeometry::created_by_room(GeometrySetId(self.room.id.0)));
            self.update(audio, index, desc);
        }
        if self.room.auto_post && self.playing.is_empty() {
            self.post_associated_event(audio, CallbackFlags::empty());
        }
    }

    /// Called when the host unregisters the component or destroys its actor.
    pub fn on_unregister(&mut self, audio: &AudioContext, index: &mut RoomIndex, mode: SimulationMode) {
        self.remove(audio, index, mode);
        if self.geometry.as_ref().is_some_and(RoomGeometry::added_by_room) {
            self.geometry = None;
        }
    }

    /// Per-tick upkeep.
    ///
    /// Reconciles the enabled flag with the index, retries engine
    /// registration, and re-sends the room once pending edits exist or once it
    /// stopped moving for `room_movement_stop_timeout` seconds. During play
    /// only dynamic rooms follow their movement.
    pub fn tick(
        &mut self,
        dt: f32,
        mode: SimulationMode,
        audio: &AudioContext,
        index: &mut RoomIndex,
        desc: &RoomverbWorldDesc,
    ) {
        let active = self.is_active();
        if active && !self.indexed {
            self.add(audio, index, desc);
        } else if !active && self.indexed {
            self.remove(audio, index, mode);
        }
        if !self.indexed {
            return;
        }

        if self.room.spatial_audio && !self.sent_to_engine {
            self.send_to_engine(audio, desc);
        }

        let mut needs_update = std::mem::take(&mut self.params_dirty);
        if self.moving && (mode == SimulationMode::Edit || self.room.dynamic) {
            self.seconds_since_movement += dt;
            if self.seconds_since_movement >= desc.room_movement_stop_timeout {
                self.moving = false;
                needs_update = true;
            }
        }
        if needs_update {
            self.update(audio, index, desc);
        }
    }

    /// The attach parent moved; `shape` is its new world-space shape.
    pub fn move_to(&mut self, shape: VolumeShape) {
        self.room.shape = shape;
        self.moving = true;
        self.seconds_since_movement = 0.0;
    }

    pub fn set_parent(&mut self, parent: AttachParent) {
        self.configuration_error = matches!(parent, AttachParent::NonPrimitive(_));
        if self.configuration_error {
            log::error!(
                "Room '{}' ({}) cannot use a non-primitive attach parent; disabled",
                self.room.name,
                self.room.id
            );
        }
        self.parent = parent;
    }

    /// Takes effect on the next tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.room.enabled = enabled;
    }

    pub fn set_dynamic(&mut self, dynamic: bool) {
        self.room.dynamic = dynamic;
    }

    pub fn set_transmission_loss(&mut self, loss: f32) {
        self.room.transmission_loss = loss.clamp(0.0, 1.0);
        self.params_dirty = true;
    }

    pub fn set_reverb(&mut self, reverb: Option<LateReverb>) {
        self.room.reverb = reverb;
        self.params_dirty = true;
    }

    pub fn set_self_send_level(&mut self, level: f32) {
        self.room.self_send_level = level.clamp(0.0, 1.0);
        self.params_dirty = true;
    }

    /// Replaces the room geometry, withdrawing the old one from the engine.
    pub fn set_geometry(&mut self, audio: &AudioContext, geometry: Option<RoomGeometry>) {
        if let (Some(mut old), Some(engine)) = (self.geometry.take(), audio.engine()) {
            engine::succeeded(old.remove(engine), "RemoveGeometry");
        }
        self.geometry = geometry;
        if self.sent_to_engine {
            if let (Some(new), Some(engine)) = (self.geometry.as_mut(), audio.engine()) {
                engine::succeeded(new.send(engine), "SetGeometry");
            }
            self.params_dirty = true;
        }
    }

    /// Posts the room's associated event on the room game object.
    ///
    /// Returns `None` if the room has no event, is not registered with the
    /// engine, or the engine rejected the call.
    pub fn post_associated_event(
        &mut self,
        audio: &AudioContext,
        flags: CallbackFlags,
    ) -> Option<PlayingId> {
        let event = self.room.event.as_ref()?.id();
        if !self.sent_to_engine {
            log::warn!(
                "Cannot post {} on room '{}': not registered with the sound engine",
                event,
                self.room.name
            );
            return None;
        }
        let engine = audio.engine()?;
        let playing_id = engine::succeeded(
            engine.post_event(event, self.room.id.game_object(), flags),
            "PostEvent",
        )?;
        self.playing.push(playing_id);
        Some(playing_id)
    }

    pub fn on_event_finished(&mut self, playing_id: PlayingId) {
        self.playing.retain(|id| *id != playing_id);
    }

    /// Stops everything playing on the room game object.
    pub fn stop(&mut self, audio: &AudioContext) {
        if let Some(engine) = audio.engine() {
            engine::succeeded(
                engine.stop_game_object(self.room.id.game_object()),
                "StopGameObject",
            );
        }
        self.playing.clear();
    }

    fn add(&mut self, audio: &AudioContext, index: &mut RoomIndex, desc: &RoomverbWorldDesc) {
        if !self.is_active() {
            return;
        }
        index.index_room(self.indexed_record());
        index.notify_portals_need_update();
        self.indexed = true;
        self.send_to_engine(audio, desc);
    }

    fn update(&mut self, audio: &AudioContext, index: &mut RoomIndex, desc: &RoomverbWorldDesc) {
        if !self.indexed {
            return;
        }
        index.reindex_room(self.indexed_record());
        index.notify_portals_need_update();
        self.send_to_engine(audio, desc);
    }

    fn remove(&mut self, audio: &AudioContext, index: &mut RoomIndex, mode: SimulationMode) {
        if !self.indexed {
            return;
        }
        index.unindex_room(self.room.id);
        index.notify_portals_need_update();
        self.indexed = false;

        if !self.sent_to_engine {
            return;
        }
        if mode == SimulationMode::Play && !self.playing.is_empty() {
            self.stop(audio);
        }
        if let Some(engine) = audio.engine() {
            if let Some(geometry) = self.geometry.as_mut() {
                engine::succeeded(geometry.remove(engine), "RemoveGeometry");
            }
            if engine::succeeded(engine.remove_room(self.room.id), "RemoveRoom").is_some() {
                log::info!("Removed room '{}' ({}) from the sound engine", self.room.name, self.room.id);
            }
        }
        self.sent_to_engine = false;
    }

    fn send_to_engine(&mut self, audio: &AudioContext, desc: &RoomverbWorldDesc) {
        if !self.room.spatial_audio {
            return;
        }
        let Some(engine) = audio.engine() else {
            return;
        };
        if let Some(geometry) = self.geometry.as_mut() {
            engine::succeeded(geometry.send(engine), "SetGeometry");
        }
        let params = self.room_params(desc);
        if engine::succeeded(engine.add_room(self.room.id, &params), "AddRoom").is_some() {
            if !self.sent_to_engine {
                log::info!("Added room '{}' ({}) to the sound engine", self.room.name, self.room.id);
            }
            self.sent_to_engine = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AuxBusId, ChannelSoundEngine, EngineCommand, EventId};
    use crate::scene::{ActorHandle, ActorId};
    use std::sync::Arc;

    fn setup() -> (
        AudioContext,
        crossbeam_channel::Receiver<EngineCommand>,
        RoomIndex,
        RoomverbWorldDesc,
    ) {
        let (engine, commands) = ChannelSoundEngine::new();
        (
            AudioContext::new(Arc::new(engine)),
            commands,
            RoomIndex::new(),
            RoomverbWorldDesc::default(),
        )
    }

    fn hall(actor: &ActorHandle) -> RoomComponent {
        let room = Room::new(
            RoomId(1),
            "Hall",
            VolumeShape::aabb(Vec3::ZERO, Vec3::splat(10.0)),
        )
        .reverb(LateReverb::new(AuxBusId(10)).send_level(0.8));
        RoomComponent::new(room, AttachParent::Primitive(actor.downgrade()))
    }

    #[test]
    fn register_indexes_and_adds_room() {
        let (audio, commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);

        room.on_register(&audio, &mut index, &desc);
        assert!(index.contains(RoomId(1)));
        assert!(room.is_registered());
        assert!(index.take_portals_dirty());

        let added = commands.try_iter().find_map(|c| match c {
            EngineCommand::AddRoom(id, params) => Some((id, params)),
            _ => None,
        });
        let (id, params) = added.unwrap();
        assert_eq!(id, RoomId(1));
        assert_eq!(params.reverb_aux_bus, Some(AuxBusId(10)));
        assert_eq!(params.reverb_level, 0.8);
        assert!(!params.keep_registered);
    }

    #[test]
    fn non_primitive_parent_disables_room() {
        let (audio, commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let room = Room::new(RoomId(1), "Hall", VolumeShape::sphere(Vec3::ZERO, 5.0));
        let mut room = RoomComponent::new(room, AttachParent::NonPrimitive(actor.downgrade()));

        room.on_register(&audio, &mut index, &desc);
        room.tick(0.1, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(room.has_configuration_error());
        assert!(!room.is_active());
        assert!(index.is_empty());
        assert_eq!(commands.try_iter().count(), 0);
    }

    #[test]
    fn enable_flag_is_reconciled_in_tick() {
        let (audio, commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);
        room.on_register(&audio, &mut index, &desc);
        commands.try_iter().count();

        room.set_enabled(false);
        room.tick(0.1, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(!index.contains(RoomId(1)));
        assert!(commands.try_iter().any(|c| c == EngineCommand::RemoveRoom(RoomId(1))));

        room.set_enabled(true);
        room.tick(0.1, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(index.contains(RoomId(1)));
    }

    #[test]
    fn dead_parent_unindexes_room() {
        let (audio, _commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);
        room.on_register(&audio, &mut index, &desc);

        drop(actor);
        room.tick(0.1, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(index.is_empty());
    }

    #[test]
    fn dynamic_room_reindexes_after_it_stops_moving() {
        let (audio, _commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);
        room.set_dynamic(true);
        room.on_register(&audio, &mut index, &desc);

        room.move_to(VolumeShape::aabb(Vec3::splat(100.0), Vec3::splat(110.0)));
        room.tick(0.05, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(!index.rooms_containing(Vec3::splat(5.0), 0.01).is_empty());

        room.tick(0.06, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(index.rooms_containing(Vec3::splat(5.0), 0.01).is_empty());
        assert_eq!(index.rooms_containing(Vec3::splat(105.0), 0.01).len(), 1);
    }

    #[test]
    fn static_room_ignores_movement_during_play() {
        let (audio, _commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);
        room.on_register(&audio, &mut index, &desc);

        room.move_to(VolumeShape::aabb(Vec3::splat(100.0), Vec3::splat(110.0)));
        room.tick(1.0, SimulationMode::Play, &audio, &mut index, &desc);
        assert_eq!(index.rooms_containing(Vec3::splat(5.0), 0.01).len(), 1);

        room.tick(1.0, SimulationMode::Edit, &audio, &mut index, &desc);
        assert!(index.rooms_containing(Vec3::splat(5.0), 0.01).is_empty());
    }

    #[test]
    fn begin_play_creates_geometry_and_posts_event() {
        let (audio, commands, mut index, desc) = setup();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let room = Room::new(RoomId(4), "Crypt", VolumeShape::sphere(Vec3::ZERO, 3.0))
            .event("Play_Fireplace", true);
        let mut room = RoomComponent::new(room, AttachParent::Primitive(actor.downgrade()));
        room.on_register(&audio, &mut index, &desc);
        room.begin_play(&audio, &mut index, &desc);

        assert!(room.geometry().unwrap().added_by_room());
        assert_eq!(room.playing_ids().len(), 1);
        let commands: Vec<_> = commands.try_iter().collect();
        assert!(commands.contains(&EngineCommand::SetGeometry(GeometrySetId(4))));
        assert!(commands.iter().any(|c| matches!(
            c,
            EngineCommand::PostEvent { event: EventId(1_501_216_439), .. }
        )));

        room.on_unregister(&audio, &mut index, SimulationMode::Play);
        assert!(room.geometry().is_none());
        assert!(room.playing_ids().is_empty());
    }

    #[test]
    fn room_added_without_engine_is_sent_later() {
        let (_, _, mut index, desc) = setup();
        let mut audio = AudioContext::unavailable();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        let mut room = hall(&actor);
        room.on_register(&audio, &mut index, &desc);
        assert!(index.contains(RoomId(1)));
        assert!(!room.is_registered());

        let (engine, commands) = ChannelSoundEngine::new();
        audio.attach(Arc::new(engine));
        room.tick(0.1, SimulationMode::Play, &audio, &mut index, &desc);
        assert!(room.is_registered());
        assert_eq!(commands.try_iter().count(), 1);
    }
}
