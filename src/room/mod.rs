//! Rooms, reverb volumes and portals.
//!
//! A [`Room`] describes an acoustic volume. The [`RoomComponent`] drives its
//! lifecycle against the sound engine and keeps the [`RoomIndex`] up to date,
//! which is what emitters query to find out where they are.

pub mod component;
pub mod index;
pub mod portal;
pub mod surfaces;

pub use component::{AttachParent, RoomComponent};
pub use index::{IndexedRoom, RoomIndex};
pub use portal::Portal;
pub use surfaces::RoomGeometry;

use crate::engine::{AuxBusId, EventRef, RoomId};
use crate::geometry::VolumeShape;

/// Late reverb carried by a room: the aux bus emitters inside it send to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateReverb {
    pub aux_bus: AuxBusId,
    /// Send gain in [0, 1] emitters inside the room converge to
    pub send_level: f32,
    /// Gain units per second. 0 switches sends without fading.
    pub fade_rate: f32,
    /// Higher priorities survive eviction when too many volumes overlap
    pub priority: f32,
    pub enabled: bool,
}

impl LateReverb {
    pub fn new(aux_bus: AuxBusId) -> Self {
        Self {
            aux_bus,
            send_level: 1.0,
            fade_rate: 0.5,
            priority: 1.0,
            enabled: true,
        }
    }

    pub fn send_level(mut self, level: f32) -> Self {
        self.send_level = level.clamp(0.0, 1.0);
        self
    }

    pub fn fade_rate(mut self, rate: f32) -> Self {
        self.fade_rate = rate;
        self
    }

    pub fn priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Description of a room volume.
///
/// Spatial audio rooms are registered with the sound engine and become the
/// current room of the objects inside them. Plain reverb volumes only feed
/// aux sends and count against the per-object reverb budget.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// World-space shape of the attach parent
    pub shape: VolumeShape,
    /// Wall occlusion of sound crossing the room boundary, in [0, 1]
    pub transmission_loss: f32,
    pub reverb: Option<LateReverb>,
    pub enabled: bool,
    /// Re-evaluated while moving during play, instead of only on geometry changes
    pub dynamic: bool,
    pub spatial_audio: bool,
    /// Send level of sounds played on the room to its own reverb
    pub self_send_level: f32,
    pub event: Option<EventRef>,
    /// Post `event` when play begins
    pub auto_post: bool,
}

impl Room {
    /// A spatial audio room
    pub fn new(id: RoomId, name: impl Into<String>, shape: VolumeShape) -> Self {
        Self {
            id,
            name: name.into(),
            shape,
            transmission_loss: 1.0,
            reverb: None,
            enabled: true,
            dynamic: false,
            spatial_audio: true,
            self_send_level: 0.0,
            event: None,
            auto_post: false,
        }
    }

    /// A volume that only contributes reverb sends
    pub fn reverb_volume(
        id: RoomId,
        name: impl Into<String>,
        shape: VolumeShape,
        reverb: LateReverb,
    ) -> Self {
        Self {
            spatial_audio: false,
            reverb: Some(reverb),
            ..Self::new(id, name, shape)
        }
    }

    pub fn transmission_loss(mut self, loss: f32) -> Self {
        self.transmission_loss = loss.clamp(0.0, 1.0);
        self
    }

    pub fn reverb(mut self, reverb: LateReverb) -> Self {
        self.reverb = Some(reverb);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn self_send_level(mut self, level: f32) -> Self {
        self.self_send_level = level.clamp(0.0, 1.0);
        self
    }

    /// Associates an event played on the room game object.
    pub fn event(mut self, event: impl Into<EventRef>, auto_post: bool) -> Self {
        self.event = Some(event.into());
        self.auto_post = auto_post;
        self
    }

    /// Reverb that is currently switched on
    pub fn active_reverb(&self) -> Option<LateReverb> {
        self.reverb.filter(|r| r.enabled)
    }
}
