use crate::config::{EmitterConfig, RoomverbWorldDesc};
use crate::emitter::{EmitterGameObject, EmitterTick, ListenerSnapshot};
use crate::engine::{
    self, AudioContext, CallbackFlags, EventRef, GameObjectId, PlayingId, PortalId, RoomId,
    SoundEngine, SwitchGroupId, SwitchStateId, TriggerId, short_id,
};
use crate::error::{Result, RoomverbError};
use crate::events::RoomverbEvent;
use crate::geometry::VolumeShape;
use crate::listener::ListenerSet;
use crate::math::{Pose, Vec3};
use crate::room::{AttachParent, Portal, Room, RoomComponent, RoomGeometry, RoomIndex};
use crate::scene::RayTracer;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether the host is editing the level or running the game.
///
/// In `Edit`, objects only follow their position and room; reverb sends and
/// obstruction run during `Play` only, and every room follows its movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationMode {
    #[default]
    Edit,
    Play,
}

/// Main world object that owns rooms, portals and game objects.
///
/// `RoomverbWorld` is the central API of Roomverb. The host drives it from its
/// simulation thread by calling [`tick`](Self::tick) once per frame; every
/// change that needs to reach the sound engine is issued from there, through
/// the [`AudioContext`] the world was created with.
///
/// # Tick order
///
/// 1. Rooms reconcile their enabled flag and movement with the [`RoomIndex`]
/// 2. Portals re-evaluate the rooms they connect if the index asked for it
/// 3. Every game object updates its room, reverb sends and obstruction, and
///    pushes one batched update if anything changed
pub struct RoomverbWorld {
    desc: RoomverbWorldDesc,
    audio: AudioContext,
    index: RoomIndex,
    rooms: BTreeMap<RoomId, RoomComponent>,
    portals: BTreeMap<PortalId, Portal>,
    objects: BTreeMap<GameObjectId, EmitterGameObject>,
    default_listeners: ListenerSet,
    sent_default_listeners: Option<Vec<GameObjectId>>,
    tracer: Box<dyn RayTracer>,
    clock: f64,
    mode: SimulationMode,
    playing: bool,
    engine_was_available: bool,
    events: Vec<RoomverbEvent>,
}

impl RoomverbWorld {
    /// Creates a world.
    ///
    /// # Arguments
    ///
    /// * `desc` - World settings
    /// * `audio` - Handle to the sound engine; may be empty until the engine starts
    /// * `tracer` - Line traces against host geometry, used for obstruction
    ///
    /// # Errors
    ///
    /// Returns [`RoomverbError::Configuration`] if a tolerance in `desc` is
    /// negative or not a number.
    pub fn new(
        desc: RoomverbWorldDesc,
        audio: AudioContext,
        tracer: Box<dyn RayTracer>,
    ) -> Result<Self> {
        for (name, value) in [
            ("containment_epsilon", desc.containment_epsilon),
            ("movement_epsilon", desc.movement_epsilon),
            ("aux_send_epsilon", desc.aux_send_epsilon),
            ("room_movement_stop_timeout", desc.room_movement_stop_timeout),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(RoomverbError::Configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        log::info!(
            "Roomverb world created (max {} reverb volumes, sound engine {})",
            desc.max_simultaneous_reverb_volumes,
            if audio.is_available() {
                "available"
            } else {
                "not available yet"
            }
        );
        let engine_was_available = audio.is_available();
        Ok(Self {
            desc,
            audio,
            index: RoomIndex::new(),
            rooms: BTreeMap::new(),
            portals: BTreeMap::new(),
            objects: BTreeMap::new(),
            default_listeners: ListenerSet::new(),
            sent_default_listeners: None,
            tracer,
            clock: 0.0,
            mode: SimulationMode::Edit,
            playing: false,
            engine_was_available,
            events: Vec::new(),
        })
    }

    pub fn desc(&self) -> &RoomverbWorldDesc {
        &self.desc
    }

    pub fn audio(&self) -> &AudioContext {
        &self.audio
    }

    /// Attaches a sound engine. Rooms and game objects register with it on
    /// the next tick.
    pub fn attach_engine(&mut self, engine: Arc<dyn SoundEngine>) {
        log::info!("Sound engine attached");
        self.audio.attach(engine);
        self.sent_default_listeners = None;
    }

    pub fn detach_engine(&mut self) -> Option<Arc<dyn SoundEngine>> {
        self.audio.detach()
    }

    pub fn room_index(&self) -> &RoomIndex {
        &self.index
    }

    /// Seconds of simulated time since the world was created
    pub fn now(&self) -> f64 {
        self.clock
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Drains the notifications produced since the last call.
    pub fn poll_events(&mut self) -> Vec<RoomverbEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances the world by `dt` seconds.
    pub fn tick(&mut self, dt: f32, mode: SimulationMode) {
        self.clock += f64::from(dt.max(0.0));
        self.mode = mode;

        let available = self.audio.is_available();
        if !available && self.engine_was_available {
            log::warn!("Sound engine unavailable; game objects are not updated");
            self.events.push(RoomverbEvent::EngineUnavailable);
        }
        self.engine_was_available = available;

        for room in self.rooms.values_mut() {
            room.tick(dt, mode, &self.audio, &mut self.index, &self.desc);
        }

        let portals_dirty = self.index.take_portals_dirty();
        for portal in self.portals.values_mut() {
            if portals_dirty || portal.needs_refresh() {
                portal.refresh_rooms(&self.index, self.desc.containment_epsilon);
            }
            portal.sync(&self.audio);
        }

        self.sync_default_listeners();

        let listeners: BTreeMap<GameObjectId, ListenerSnapshot> = self
            .objects
            .values()
            .filter(|o| o.is_listener())
            .map(|o| {
                (
                    o.id(),
                    ListenerSnapshot {
                        pose: o.pose(),
                        room: o.current_room(),
                    },
                )
            })
            .collect();
        let default_listeners = self.default_listeners.snapshot();

        self.tracer.begin_frame();
        let ctx = EmitterTick {
            dt,
            now: self.clock,
            mode,
            audio: &self.audio,
            desc: &self.desc,
            tracer: self.tracer.as_ref(),
            listeners: &listeners,
            default_listeners: &default_listeners,
        };
        for object in self.objects.values_mut() {
            object.tick(&ctx, &mut self.index, &mut self.events);
        }
        self.tracer.end_frame();
    }

    fn sync_default_listeners(&mut self) {
        for stale in self
            .default_listeners
            .snapshot()
            .into_iter()
            .filter(|id| !self.objects.contains_key(id))
        {
            log::warn!("Dropping destroyed default listener {}", stale);
            self.default_listeners.remove(stale);
        }

        let listeners = self.default_listeners.snapshot();
        if self.sent_default_listeners.as_ref() == Some(&listeners) {
            return;
        }
        let Some(engine) = self.audio.engine() else {
            return;
        };
        if engine::succeeded(engine.set_default_listeners(&listeners), "SetDefaultListeners").is_some() {
            self.sent_default_listeners = Some(listeners);
        }
    }

    /// Starts play: rooms create missing geometry and auto-post their events.
    pub fn begin_play(&mut self) {
        self.playing = true;
        for room in self.rooms.values_mut() {
            room.begin_play(&self.audio, &mut self.index, &self.desc);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn ensure_free_id(&self, id: GameObjectId) -> Result<()> {
        if self.objects.contains_key(&id) || self.rooms.contains_key(&RoomId(id.0)) {
            return Err(RoomverbError::Configuration(format!(
                "game object id {} is already in use",
                id.0
            )));
        }
        Ok(())
    }

    // Game objects

    /// Registers an emitter or listener. It reaches the sound engine on the
    /// next tick.
    ///
    /// # Errors
    ///
    /// Returns [`RoomverbError::Configuration`] if the id is already used by a
    /// game object or a room.
    pub fn register_game_object(
        &mut self,
        id: GameObjectId,
        name: impl Into<String>,
        pose: Pose,
        config: EmitterConfig,
    ) -> Result<()> {
        self.ensure_free_id(id)?;
        let object = EmitterGameObject::new(id, name, pose, config, &self.desc);
        log::debug!(
            "Registered {} '{}'{}",
            id,
            object.name(),
            if object.is_listener() { " (listener)" } else { "" }
        );
        self.objects.insert(id, object);
        Ok(())
    }

    /// Destroys a game object. Its sends are cut immediately and every
    /// emitter stops tracking it as a listener.
    pub fn destroy_game_object(&mut self, id: GameObjectId) -> Result<()> {
        let mut object = self
            .objects
            .remove(&id)
            .ok_or(RoomverbError::UnknownGameObject(id.0))?;
        object.teardown(&self.audio, &mut self.index);

        if object.is_listener() {
            self.on_listener_unregistered(id);
        }
        Ok(())
    }

    fn on_listener_unregistered(&mut self, listener: GameObjectId) {
        self.default_listeners.remove(listener);
        for other in self.objects.values_mut() {
            other.on_listener_unregistered(listener);
        }
    }

    pub fn game_object(&self, id: GameObjectId) -> Option<&EmitterGameObject> {
        self.objects.get(&id)
    }

    pub fn game_object_mut(&mut self, id: GameObjectId) -> Option<&mut EmitterGameObject> {
        self.objects.get_mut(&id)
    }

    pub fn game_objects(&self) -> impl Iterator<Item = &EmitterGameObject> {
        self.objects.values()
    }

    fn object_mut(&mut self, id: GameObjectId) -> Result<&mut EmitterGameObject> {
        self.objects
            .get_mut(&id)
            .ok_or(RoomverbError::UnknownGameObject(id.0))
    }

    pub fn set_pose(&mut self, id: GameObjectId, pose: Pose) -> Result<()> {
        self.object_mut(id)?.set_pose(pose);
        Ok(())
    }

    /// Gives an emitter an explicit listener set instead of the default one.
    pub fn set_listeners(&mut self, emitter: GameObjectId, listeners: &[GameObjectId]) -> Result<()> {
        if let Some(unknown) = listeners.iter().find(|id| !self.objects.contains_key(id)) {
            return Err(RoomverbError::UnknownGameObject(unknown.0));
        }
        self.object_mut(emitter)?.set_listeners(listeners.iter().copied());
        Ok(())
    }

    /// Adds a listener to the default set every emitter follows unless it
    /// has explicit listeners.
    pub fn add_default_listener(&mut self, listener: GameObjectId) -> Result<()> {
        if !self.objects.contains_key(&listener) {
            return Err(RoomverbError::UnknownGameObject(listener.0));
        }
        if self.default_listeners.add(listener) {
            log::debug!("{} is now a default listener", listener);
            for object in self.objects.values_mut() {
                object.on_default_listener_added(listener);
            }
        }
        Ok(())
    }

    pub fn remove_default_listener(&mut self, listener: GameObjectId) -> bool {
        self.default_listeners.remove(listener)
    }

    /// Shared handle to the default listener set, usable from other threads
    pub fn default_listeners(&self) -> ListenerSet {
        self.default_listeners.clone()
    }

    /// Posts an event on a game object.
    ///
    /// Returns `Ok(None)` when the engine is unavailable or rejected the call.
    ///
    /// # Errors
    ///
    /// Returns [`RoomverbError::UnknownGameObject`] if `game_object` is not registered.
    pub fn post_event(
        &mut self,
        game_object: GameObjectId,
        event: impl Into<EventRef>,
        flags: CallbackFlags,
    ) -> Result<Option<PlayingId>> {
        let event = event.into().id();
        let audio = self.audio.clone();
        Ok(self.object_mut(game_object)?.post_event(&audio, event, flags))
    }

    pub fn stop_game_object(&mut self, game_object: GameObjectId) -> Result<()> {
        let audio = self.audio.clone();
        self.object_mut(game_object)?.stop(&audio);
        Ok(())
    }

    /// Sets a switch on a game object by group and state name.
    ///
    /// Returns `Ok(false)` when the engine is unavailable or rejected the call.
    ///
    /// # Errors
    ///
    /// Returns [`RoomverbError::UnknownGameObject`] if `game_object` is not registered.
    pub fn set_switch(&mut self, game_object: GameObjectId, group: &str, state: &str) -> Result<bool> {
        let group = SwitchGroupId(short_id(group));
        let state = SwitchStateId(short_id(state));
        let audio = self.audio.clone();
        Ok(self.object_mut(game_object)?.set_switch(&audio, group, state))
    }

    pub fn post_trigger(&mut self, game_object: GameObjectId, trigger: &str) -> Result<bool> {
        let trigger = TriggerId(short_id(trigger));
        let audio = self.audio.clone();
        Ok(self.object_mut(game_object)?.post_trigger(&audio, trigger))
    }

    /// Sets the attenuation radii of a game object.
    ///
    /// The radii stick and are sent again if the object re-registers.
    pub fn set_game_object_radius(
        &mut self,
        game_object: GameObjectId,
        outer: f32,
        inner: f32,
    ) -> Result<bool> {
        let audio = self.audio.clone();
        Ok(self.object_mut(game_object)?.set_radius(&audio, outer, inner))
    }

    /// Sets the dry path volume of a game object toward each of its listeners.
    ///
    /// # Arguments
    ///
    /// * `game_object` - The emitter
    /// * `volume` - Linear gain applied to the output bus
    pub fn set_output_bus_volume(&mut self, game_object: GameObjectId, volume: f32) -> Result<bool> {
        let defaults = self.default_listeners.snapshot();
        let audio = self.audio.clone();
        let object = self.object_mut(game_object)?;
        let listeners = if object.uses_default_listeners() {
            defaults
        } else {
            object.listeners().snapshot()
        };
        Ok(object.set_output_bus_volume(&audio, &listeners, volume))
    }

    /// Forwards an end-of-event callback from the sound engine.
    pub fn notify_end_of_event(&mut self, game_object: GameObjectId, playing_id: PlayingId) {
        let finished = match self.objects.get_mut(&game_object) {
            Some(object) => object.on_event_finished(playing_id),
            None => match self.rooms.get_mut(&RoomId(game_object.0)) {
                Some(room) => {
                    room.on_event_finished(playing_id);
                    true
                }
                None => false,
            },
        };
        if finished {
            self.events.push(RoomverbEvent::EventFinished {
                game_object,
                playing_id,
            });
        }
    }

    // Rooms

    /// Adds a room and registers it right away.
    ///
    /// A room attached to a non-primitive parent is kept but disabled, and a
    /// [`RoomverbEvent::RoomDisabled`] is queued.
    ///
    /// # Errors
    ///
    /// Returns [`RoomverbError::Configuration`] if the id is already used by a
    /// room or a game object.
    pub fn add_room(
        &mut self,
        room: Room,
        parent: AttachParent,
        geometry: Option<RoomGeometry>,
    ) -> Result<RoomId> {
        let id = room.id;
        self.ensure_free_id(id.game_object())?;

        let mut component = RoomComponent::new(room, parent);
        if let Some(geometry) = geometry {
            component = component.with_geometry(geometry);
        }
        component.on_register(&self.audio, &mut self.index, &self.desc);
        if component.has_configuration_error() {
            self.events.push(RoomverbEvent::RoomDisabled {
                room: id,
                reason: "attached to a non-primitive component".to_owned(),
            });
        }
        if self.playing {
            component.begin_play(&self.audio, &mut self.index, &self.desc);
        }
        self.rooms.insert(id, component);
        Ok(id)
    }

    pub fn remove_room(&mut self, id: RoomId) -> Result<()> {
        let mut component = self
            .rooms
            .remove(&id)
            .ok_or(RoomverbError::UnknownRoom(id.0))?;
        component.on_unregister(&self.audio, &mut self.index, self.mode);
        Ok(())
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomComponent> {
        self.rooms.get(&id)
    }

    /// Mutable access for property edits; they take effect on the next tick.
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut RoomComponent> {
        self.rooms.get_mut(&id)
    }

    fn room_component_mut(&mut self, id: RoomId) -> Result<&mut RoomComponent> {
        self.rooms
            .get_mut(&id)
            .ok_or(RoomverbError::UnknownRoom(id.0))
    }

    /// The room's attach parent moved.
    pub fn move_room(&mut self, id: RoomId, shape: VolumeShape) -> Result<()> {
        self.room_component_mut(id)?.move_to(shape);
        Ok(())
    }

    pub fn set_room_geometry(&mut self, id: RoomId, geometry: Option<RoomGeometry>) -> Result<()> {
        let audio = self.audio.clone();
        self.room_component_mut(id)?.set_geometry(&audio, geometry);
        Ok(())
    }

    /// Posts the room's associated event on the room game object.
    pub fn post_room_event(&mut self, id: RoomId, flags: CallbackFlags) -> Result<Option<PlayingId>> {
        let audio = self.audio.clone();
        Ok(self
            .room_component_mut(id)?
            .post_associated_event(&audio, flags))
    }

    /// Rooms containing `point`, smallest first
    pub fn rooms_containing(&self, point: Vec3) -> Vec<RoomId> {
        self.index
            .rooms_containing(point, self.desc.containment_epsilon)
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    /// Game objects inside `room` as of the last tick
    pub fn occupants(&self, room: RoomId) -> Vec<GameObjectId> {
        self.index.occupants(room).collect()
    }

    // Portals

    pub fn add_portal(&mut self, portal: Portal) -> Result<PortalId> {
        let id = portal.id();
        if self.portals.contains_key(&id) {
            return Err(RoomverbError::Configuration(format!(
                "portal id {} is already in use",
                id.0
            )));
        }
        self.portals.insert(id, portal);
        Ok(id)
    }

    pub fn remove_portal(&mut self, id: PortalId) -> Result<()> {
        let mut portal = self
            .portals
            .remove(&id)
            .ok_or(RoomverbError::UnknownPortal(id.0))?;
        portal.remove(&self.audio);
        Ok(())
    }

    pub fn portal(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(&id)
    }

    pub fn set_portal_pose(&mut self, id: PortalId, pose: Pose) -> Result<()> {
        self.portals
            .get_mut(&id)
            .ok_or(RoomverbError::UnknownPortal(id.0))?
            .set_pose(pose);
        Ok(())
    }

    pub fn set_portal_enabled(&mut self, id: PortalId, enabled: bool) -> Result<()> {
        self.portals
            .get_mut(&id)
            .ok_or(RoomverbError::UnknownPortal(id.0))?
            .set_enabled(enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChannelSoundEngine, EngineCommand, EventId, short_id};
    use crate::scene::{ActorHandle, ActorId, RayHit, TraceQuery};

    struct OpenField;

    impl RayTracer for OpenField {
        fn cast_ray(&self, _query: &TraceQuery) -> RayHit {
            RayHit::miss()
        }
    }

    fn world() -> (RoomverbWorld, crossbeam_channel::Receiver<EngineCommand>) {
        let (engine, commands) = ChannelSoundEngine::new();
        let world = RoomverbWorld::new(
            RoomverbWorldDesc::default(),
            AudioContext::new(Arc::new(engine)),
            Box::new(OpenField),
        )
        .unwrap();
        (world, commands)
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let result = RoomverbWorld::new(
            RoomverbWorldDesc::default().containment_epsilon(-1.0),
            AudioContext::unavailable(),
            Box::new(OpenField),
        );
        assert!(matches!(result, Err(RoomverbError::Configuration(_))));

        let result = RoomverbWorld::new(
            RoomverbWorldDesc::default().aux_send_epsilon(-0.5),
            AudioContext::unavailable(),
            Box::new(OpenField),
        );
        assert!(matches!(result, Err(RoomverbError::Configuration(_))));
    }

    #[test]
    fn ids_are_unique_across_rooms_and_objects() {
        let (mut world, _commands) = world();
        let actor = ActorHandle::new(ActorId(1), "Hall");
        world
            .add_room(
                Room::new(RoomId(5), "Hall", VolumeShape::sphere(Vec3::ZERO, 5.0)),
                AttachParent::Primitive(actor.downgrade()),
                None,
            )
            .unwrap();
        let clash = world.register_game_object(
            GameObjectId(5),
            "Torch",
            Pose::identity(),
            EmitterConfig::emitter(),
        );
        assert!(matches!(clash, Err(RoomverbError::Configuration(_))));
    }

    #[test]
    fn destroying_a_listener_prunes_it_everywhere() {
        let (mut world, _commands) = world();
        let listener = GameObjectId(1);
        let emitter = GameObjectId(2);
        world
            .register_game_object(listener, "Camera", Pose::identity(), EmitterConfig::listener())
            .unwrap();
        world
            .register_game_object(emitter, "Torch", Pose::identity(), EmitterConfig::emitter())
            .unwrap();
        world.add_default_listener(listener).unwrap();
        world.set_listeners(emitter, &[listener]).unwrap();

        world.destroy_game_object(listener).unwrap();
        assert!(world.default_listeners().is_empty());
        assert!(world.game_object(emitter).unwrap().listeners().is_empty());
        assert!(matches!(
            world.destroy_game_object(listener),
            Err(RoomverbError::UnknownGameObject(1))
        ));
    }

    #[test]
    fn default_listeners_are_sent_when_they_change() {
        let (mut world, commands) = world();
        world
            .register_game_object(GameObjectId(1), "Camera", Pose::identity(), EmitterConfig::listener())
            .unwrap();
        world.add_default_listener(GameObjectId(1)).unwrap();

        world.tick(0.016, SimulationMode::Play);
        world.tick(0.016, SimulationMode::Play);
        let sent: Vec<_> = commands
            .try_iter()
            .filter(|c| matches!(c, EngineCommand::SetDefaultListeners(_)))
            .collect();
        assert_eq!(
            sent,
            vec![EngineCommand::SetDefaultListeners(vec![GameObjectId(1)])]
        );
    }

    #[test]
    fn events_can_be_posted_by_name() {
        let (mut world, commands) = world();
        world
            .register_game_object(GameObjectId(2), "Torch", Pose::identity(), EmitterConfig::emitter())
            .unwrap();
        let playing = world
            .post_event(GameObjectId(2), "Play_Footstep", CallbackFlags::END_OF_EVENT)
            .unwrap()
            .unwrap();
        assert!(commands.try_iter().any(|c| c
            == EngineCommand::PostEvent {
                event: EventId(short_id("play_footstep")),
                game_object: GameObjectId(2),
                flags: CallbackFlags::END_OF_EVENT,
                playing_id: playing,
            }));

        world.notify_end_of_event(GameObjectId(2), playing);
        assert_eq!(
            world.poll_events(),
            vec![RoomverbEvent::EventFinished {
                game_object: GameObjectId(2),
                playing_id: playing,
            }]
        );
    }

    #[test]
    fn losing_the_engine_is_reported_once() {
        let (mut world, _commands) = world();
        world.detach_engine();
        world.tick(0.016, SimulationMode::Play);
        world.tick(0.016, SimulationMode::Play);
        assert_eq!(world.poll_events(), vec![RoomverbEvent::EngineUnavailable]);
    }

    #[test]
    fn portals_follow_room_changes() {
        let (mut world, commands) = world();
        let actor = ActorHandle::new(ActorId(1), "House");
        world
            .add_room(
                Room::new(
                    RoomId(10),
                    "Kitchen",
                    VolumeShape::aabb(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 5.0, 10.0)),
                ),
                AttachParent::Primitive(actor.downgrade()),
                None,
            )
            .unwrap();
        world
            .add_portal(Portal::new(
                PortalId(1),
                Pose::from_position(Vec3::new(0.0, 2.0, 5.0)),
                Vec3::new(0.5, 2.0, 1.0),
            ))
            .unwrap();

        world.tick(0.016, SimulationMode::Play);
        assert_eq!(world.portal(PortalId(1)).unwrap().front_room(), Some(RoomId(10)));
        assert_eq!(world.portal(PortalId(1)).unwrap().back_room(), None);

        world
            .add_room(
                Room::new(
                    RoomId(11),
                    "Hallway",
                    VolumeShape::aabb(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 5.0, 10.0)),
                ),
                AttachParent::Primitive(actor.downgrade()),
                None,
            )
            .unwrap();
        world.tick(0.016, SimulationMode::Play);
        assert_eq!(world.portal(PortalId(1)).unwrap().back_room(), Some(RoomId(11)));

        let portal_updates = commands
            .try_iter()
            .filter(|c| matches!(c, EngineCommand::SetPortal(..)))
            .count();
        assert_eq!(portal_updates, 2);
    }

    #[test]
    fn non_primitive_room_is_reported() {
        let (mut world, _commands) = world();
        let actor = ActorHandle::new(ActorId(1), "Prop");
        world
            .add_room(
                Room::new(RoomId(3), "Closet", VolumeShape::sphere(Vec3::ZERO, 1.0)),
                AttachParent::NonPrimitive(actor.downgrade()),
                None,
            )
            .unwrap();
        assert!(world.poll_events()[0].is_error());
        assert!(world.room_index().is_empty());
    }

    #[test]
    fn named_switches_and_triggers_are_hashed() {
        let (mut world, commands) = world();
        let torch = GameObjectId(2);
        world
            .register_game_object(torch, "Torch", Pose::identity(), EmitterConfig::emitter())
            .unwrap();

        assert!(world.set_switch(torch, "Surface", "Stone").unwrap());
        assert!(world.post_trigger(torch, "Flare").unwrap());
        let sent: Vec<_> = commands
            .try_iter()
            .filter(|c| matches!(c, EngineCommand::SetSwitch { .. } | EngineCommand::PostTrigger(..)))
            .collect();
        assert_eq!(
            sent,
            vec![
                EngineCommand::SetSwitch {
                    game_object: torch,
                    group: SwitchGroupId(short_id("Surface")),
                    state: SwitchStateId(short_id("Stone")),
                },
                EngineCommand::PostTrigger(torch, TriggerId(short_id("Flare"))),
            ]
        );
        assert!(matches!(
            world.post_trigger(GameObjectId(99), "Flare"),
            Err(RoomverbError::UnknownGameObject(99))
        ));
    }

    #[test]
    fn output_bus_volume_follows_default_listeners() {
        let (mut world, commands) = world();
        let camera = GameObjectId(1);
        let torch = GameObjectId(2);
        world
            .register_game_object(camera, "Camera", Pose::identity(), EmitterConfig::listener())
            .unwrap();
        world
            .register_game_object(torch, "Torch", Pose::identity(), EmitterConfig::emitter())
            .unwrap();
        world.add_default_listener(camera).unwrap();

        assert!(world.set_output_bus_volume(torch, 0.5).unwrap());
        let volumes: Vec<_> = commands
            .try_iter()
            .filter(|c| matches!(c, EngineCommand::SetOutputBusVolume { .. }))
            .collect();
        assert_eq!(
            volumes,
            vec![EngineCommand::SetOutputBusVolume {
                emitter: torch,
                listener: camera,
                volume: 0.5,
            }]
        );
    }
}
