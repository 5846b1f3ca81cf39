//! The external sound engine, seen from Roomverb.
//!
//! The sound engine is a black box that owns mixing, DSP and the actual
//! spatial audio simulation. Roomverb only decides *what* to tell it and
//! *when*. Every call is best-effort: results are either success or an opaque
//! [`EngineFailure`](crate::error::EngineFailure) which gets logged.
//!
//! The engine is reached through an [`AudioContext`] handed to each component,
//! which may legitimately hold no engine (not initialised yet, shutting down).

mod channel;
mod event;
mod types;

pub use channel::{ChannelSoundEngine, EngineCommand};
pub use event::{CallbackFlags, EventRef, short_id};
pub use types::{
    AuxBusId, AuxSendValue, EventId, GameObjectId, GameObjectUpdate, GeometrySetId,
    ObstructionValue, PlayingId, PortalId, PortalParams, RoomId, RoomParams, SwitchGroupId,
    SwitchStateId, TriggerId,
};

use crate::error::EngineResult;
use crate::math::Pose;
use std::sync::Arc;

/// Calls Roomverb issues to the sound engine.
///
/// Implementations must not block waiting for the engine to apply a call.
pub trait SoundEngine: Send + Sync {
    fn register_game_object(&self, id: GameObjectId, name: &str) -> EngineResult;

    fn unregister_game_object(&self, id: GameObjectId) -> EngineResult;

    fn set_position(&self, id: GameObjectId, pose: Pose) -> EngineResult;

    fn set_game_object_in_room(&self, id: GameObjectId, room: Option<RoomId>) -> EngineResult;

    fn set_aux_send_values(&self, id: GameObjectId, sends: &[AuxSendValue]) -> EngineResult;

    fn set_obstruction_and_occlusion(
        &self,
        emitter: GameObjectId,
        listener: GameObjectId,
        obstruction: f32,
        occlusion: f32,
    ) -> EngineResult;

    fn set_listeners(&self, emitter: GameObjectId, listeners: &[GameObjectId]) -> EngineResult;

    fn set_default_listeners(&self, listeners: &[GameObjectId]) -> EngineResult;

    fn add_room(&self, id: RoomId, params: &RoomParams) -> EngineResult;

    fn remove_room(&self, id: RoomId) -> EngineResult;

    fn set_portal(&self, id: PortalId, params: &PortalParams) -> EngineResult;

    fn remove_portal(&self, id: PortalId) -> EngineResult;

    fn set_geometry(&self, id: GeometrySetId) -> EngineResult;

    fn remove_geometry(&self, id: GeometrySetId) -> EngineResult;

    fn set_geometry_instance(&self, id: GeometrySetId) -> EngineResult;

    fn remove_geometry_instance(&self, id: GeometrySetId) -> EngineResult;

    fn post_event(
        &self,
        event: EventId,
        game_object: GameObjectId,
        flags: CallbackFlags,
    ) -> EngineResult<PlayingId>;

    fn stop_game_object(&self, id: GameObjectId) -> EngineResult;

    fn set_switch(&self, id: GameObjectId, group: SwitchGroupId, state: SwitchStateId) -> EngineResult;

    fn post_trigger(&self, id: GameObjectId, trigger: TriggerId) -> EngineResult;

    /// Attenuation radii of the game object, used by room and portal culling
    fn set_game_object_radius(&self, id: GameObjectId, outer: f32, inner: f32) -> EngineResult;

    /// Volume of the emitter's dry path toward one listener
    fn set_output_bus_volume(
        &self,
        emitter: GameObjectId,
        listener: GameObjectId,
        volume: f32,
    ) -> EngineResult;

    /// Applies one tick's worth of changes for a game object.
    ///
    /// The default splits the update into individual calls; engines that can
    /// batch should override it.
    fn submit(&self, update: &GameObjectUpdate) -> EngineResult {
        let id = update.game_object;
        if let Some(pose) = update.pose {
            self.set_position(id, pose)?;
        }
        if let Some(room) = update.room {
            self.set_game_object_in_room(id, room)?;
        }
        if let Some(sends) = &update.aux_sends {
            self.set_aux_send_values(id, sends)?;
        }
        for value in &update.obstruction {
            self.set_obstruction_and_occlusion(id, value.listener, value.obstruction, value.occlusion)?;
        }
        Ok(())
    }
}

/// Handle to the sound engine service, injected into every component.
///
/// An empty context means the engine is unavailable; operations that need it
/// become no-ops until one is attached.
#[derive(Clone, Default)]
pub struct AudioContext {
    engine: Option<Arc<dyn SoundEngine>>,
}

impl AudioContext {
    pub fn new(engine: Arc<dyn SoundEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    /// A context with no engine attached
    pub fn unavailable() -> Self {
        Self { engine: None }
    }

    pub fn engine(&self) -> Option<&dyn SoundEngine> {
        self.engine.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn attach(&mut self, engine: Arc<dyn SoundEngine>) {
        self.engine = Some(engine);
    }

    pub fn detach(&mut self) -> Option<Arc<dyn SoundEngine>> {
        self.engine.take()
    }
}

impl std::fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContext")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Logs a failed engine call. Returns the call's value on success.
pub(crate) fn succeeded<T>(result: EngineResult<T>, operation: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Sound engine call {} failed: {}", operation, e);
            None
        }
    }
}
