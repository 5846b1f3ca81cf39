use super::{
    AuxSendValue, CallbackFlags, EventId, GameObjectId, GameObjectUpdate, GeometrySetId, PlayingId, PortalId,
    PortalParams, RoomId, RoomParams, SoundEngine, SwitchGroupId, SwitchStateId, TriggerId,
};
use crate::error::{EngineFailure, EngineResult};
use crate::math::Pose;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU32, Ordering};

/// A sound engine call, as queued by [`ChannelSoundEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    RegisterGameObject(GameObjectId, String),
    UnregisterGameObject(GameObjectId),
    SetPosition(GameObjectId, Pose),
    SetGameObjectInRoom(GameObjectId, Option<RoomId>),
    SetAuxSendValues(GameObjectId, Vec<AuxSendValue>),
    SetObstructionAndOcclusion {
        emitter: GameObjectId,
        listener: GameObjectId,
        obstruction: f32,
        occlusion: f32,
    },
    SetListeners(GameObjectId, Vec<GameObjectId>),
    SetDefaultListeners(Vec<GameObjectId>),
    AddRoom(RoomId, RoomParams),
    RemoveRoom(RoomId),
    SetPortal(PortalId, PortalParams),
    RemovePortal(PortalId),
    SetGeometry(GeometrySetId),
    RemoveGeometry(GeometrySetId),
    SetGeometryInstance(GeometrySetId),
    RemoveGeometryInstance(GeometrySetId),
    PostEvent {
        event: EventId,
        game_object: GameObjectId,
        flags: CallbackFlags,
        playing_id: PlayingId,
    },
    StopGameObject(GameObjectId),
    SetSwitch {
        game_object: GameObjectId,
        group: SwitchGroupId,
        state: SwitchStateId,
    },
    PostTrigger(GameObjectId, TriggerId),
    SetGameObjectRadius {
        game_object: GameObjectId,
        outer: f32,
        inner: f32,
    },
    SetOutputBusVolume {
        emitter: GameObjectId,
        listener: GameObjectId,
        volume: f32,
    },
    /// All changes of one game object for one tick
    Update(GameObjectUpdate),
}

/// Fire-and-forget sound engine front end.
///
/// Every call is turned into an [`EngineCommand`] and queued on an unbounded
/// channel; the thread that owns the real engine drains the receiver. Playing
/// ids are allocated locally so posting never waits on the engine.
pub struct ChannelSoundEngine {
    command_sender: Sender<EngineCommand>,
    next_playing_id: AtomicU32,
}

impl ChannelSoundEngine {
    pub fn new() -> (Self, Receiver<EngineCommand>) {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        (
            Self {
                command_sender,
                next_playing_id: AtomicU32::new(1),
            },
            command_receiver,
        )
    }

    fn send(&self, command: EngineCommand) -> EngineResult {
        self.command_sender
            .send(command)
            .map_err(|_| EngineFailure::Disconnected)
    }
}

impl SoundEngine for ChannelSoundEngine {
    fn register_game_object(&self, id: GameObjectId, name: &str) -> EngineResult {
        self.send(EngineCommand::RegisterGameObject(id, name.to_owned()))
    }

    fn unregister_game_object(&self, id: GameObjectId) -> EngineResult {
        self.send(EngineCommand::UnregisterGameObject(id))
    }

    fn set_position(&self, id: GameObjectId, pose: Pose) -> EngineResult {
        self.send(EngineCommand::SetPosition(id, pose))
    }

    fn set_game_object_in_room(&self, id: GameObjectId, room: Option<RoomId>) -> EngineResult {
        self.send(EngineCommand::SetGameObjectInRoom(id, room))
    }

    fn set_aux_send_values(&self, id: GameObjectId, sends: &[AuxSendValue]) -> EngineResult {
        self.send(EngineCommand::SetAuxSendValues(id, sends.to_vec()))
    }

    fn set_obstruction_and_occlusion(
        &self,
        emitter: GameObjectId,
        listener: GameObjectId,
        obstruction: f32,
        occlusion: f32,
    ) -> EngineResult {
        self.send(EngineCommand::SetObstructionAndOcclusion {
            emitter,
            listener,
            obstruction,
            occlusion,
        })
    }

    fn set_listeners(&self, emitter: GameObjectId, listeners: &[GameObjectId]) -> EngineResult {
        self.send(EngineCommand::SetListeners(emitter, listeners.to_vec()))
    }

    fn set_default_listeners(&self, listeners: &[GameObjectId]) -> EngineResult {
        self.send(EngineCommand::SetDefaultListeners(listeners.to_vec()))
    }

    fn add_room(&self, id: RoomId, params: &RoomParams) -> EngineResult {
        self.send(EngineCommand::AddRoom(id, params.clone()))
    }

    fn remove_room(&self, id: RoomId) -> EngineResult {
        self.send(EngineCommand::RemoveRoom(id))
    }

    fn set_portal(&self, id: PortalId, params: &PortalParams) -> EngineResult {
        self.send(EngineCommand::SetPortal(id, params.clone()))
    }

    fn remove_portal(&self, id: PortalId) -> EngineResult {
        self.send(EngineCommand::RemovePortal(id))
    }

    fn set_geometry(&self, id: GeometrySetId) -> EngineResult {
        self.send(EngineCommand::SetGeometry(id))
    }

    fn remove_geometry(&self, id: GeometrySetId) -> EngineResult {
        self.send(EngineCommand::RemoveGeometry(id))
    }

    fn set_geometry_instance(&self, id: GeometrySetId) -> EngineResult {
        self.send(EngineCommand::SetGeometryInstance(id))
    }

    fn remove_geometry_instance(&self, id: GeometrySetId) -> EngineResult {
        self.send(EngineCommand::RemoveGeometryInstance(id))
    }

    fn post_event(
        &self,
        event: EventId,
        game_object: GameObjectId,
        flags: CallbackFlags,
    ) -> EngineResult<PlayingId> {
        let playing_id = PlayingId(self.next_playing_id.fetch_add(1, Ordering::Relaxed));
        self.send(EngineCommand::PostEvent {
            event,
            game_object,
            flags,
            playing_id,
        })?;
        Ok(playing_id)
    }

    fn stop_game_object(&self, id: GameObjectId) -> EngineResult {
        self.send(EngineCommand::StopGameObject(id))
    }

    fn set_switch(&self, id: GameObjectId, group: SwitchGroupId, state: SwitchStateId) -> EngineResult {
        self.send(EngineCommand::SetSwitch {
            game_object: id,
            group,
            state,
        })
    }

    fn post_trigger(&self, id: GameObjectId, trigger: TriggerId) -> EngineResult {
        self.send(EngineCommand::PostTrigger(id, trigger))
    }

    fn set_game_object_radius(&self, id: GameObjectId, outer: f32, inner: f32) -> EngineResult {
        self.send(EngineCommand::SetGameObjectRadius {
            game_object: id,
            outer,
            inner,
        })
    }

    fn set_output_bus_volume(
        &self,
        emitter: GameObjectId,
        listener: GameObjectId,
        volume: f32,
    ) -> EngineResult {
        self.send(EngineCommand::SetOutputBusVolume {
            emitter,
            listener,
            volume,
        })
    }

    fn submit(&self, update: &GameObjectUpdate) -> EngineResult {
        self.send(EngineCommand::Update(update.clone()))
    }
}
