use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Trace channel used for line-of-sight obstruction queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum CollisionChannel {
    WorldStatic,
    WorldDynamic,
    Pawn,
    #[default]
    Visibility,
    Camera,
    PhysicsBody,
    Vehicle,
    Destructible,
}

/// What to do when an emitter and a listener are inside the same room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SharedRoomObstruction {
    /// Trace regardless of room membership
    #[default]
    Trace,
    /// Report a clear path without tracing
    Skip,
}

/// Configuration descriptor for a Roomverb world
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomverbWorldDesc {
    /// Maximum number of reverb sends simultaneously applied to one emitter.
    /// Reverbs of spatial audio rooms the emitter is inside are not counted.
    pub max_simultaneous_reverb_volumes: u8,
    /// Trace channel used by emitters that do not pick one explicitly
    pub default_occlusion_channel: CollisionChannel,
    /// Boundary tolerance for room containment tests (world units)
    pub containment_epsilon: f32,
    /// Minimum position/orientation change that counts as movement
    pub movement_epsilon: f32,
    /// Minimum gain change that makes an aux send list worth re-sending
    pub aux_send_epsilon: f32,
    /// Seconds a dynamic room must stay still before it is re-indexed
    pub room_movement_stop_timeout: f32,
    /// Snap the first reverb sends of a new emitter to their target instead of fading in
    pub snap_initial_reverb_sends: bool,
    /// Obstruction policy when emitter and listener share a room
    pub shared_room_obstruction: SharedRoomObstruction,
    /// Reverb RTPCs are driven from rooms, so room game objects must stay registered
    pub reverb_rtpcs_in_use: bool,
}

impl Default for RoomverbWorldDesc {
    fn default() -> Self {
        Self {
            max_simultaneous_reverb_volumes: 4,
            default_occlusion_channel: CollisionChannel::Visibility,
            containment_epsilon: 0.01,
            movement_epsilon: 0.001,
            aux_send_epsilon: 0.0001,
            room_movement_stop_timeout: 0.1,
            snap_initial_reverb_sends: true,
            shared_room_obstruction: SharedRoomObstruction::Trace,
            reverb_rtpcs_in_use: false,
        }
    }
}

impl RoomverbWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a descriptor from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a descriptor from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded world settings from {}", path.as_ref().display());
        Self::from_toml_str(&source)
    }

    pub fn max_simultaneous_reverb_volumes(mut self, max: u8) -> Self {
        self.max_simultaneous_reverb_volumes = max;
        self
    }

    pub fn default_occlusion_channel(mut self, channel: CollisionChannel) -> Self {
        self.default_occlusion_channel = channel;
        self
    }

    pub fn containment_epsilon(mut self, epsilon: f32) -> Self {
        self.containment_epsilon = epsilon;
        self
    }

    pub fn movement_epsilon(mut self, epsilon: f32) -> Self {
        self.movement_epsilon = epsilon;
        self
    }

    pub fn aux_send_epsilon(mut self, epsilon: f32) -> Self {
        self.aux_send_epsilon = epsilon;
        self
    }

    pub fn room_movement_stop_timeout(mut self, seconds: f32) -> Self {
        self.room_movement_stop_timeout = seconds;
        self
    }

    pub fn snap_initial_reverb_sends(mut self, snap: bool) -> Self {
        self.snap_initial_reverb_sends = snap;
        self
    }

    pub fn shared_room_obstruction(mut self, policy: SharedRoomObstruction) -> Self {
        self.shared_room_obstruction = policy;
        self
    }

    pub fn reverb_rtpcs_in_use(mut self, in_use: bool) -> Self {
        self.reverb_rtpcs_in_use = in_use;
        self
    }
}
