use crate::math::{Pose, Vec3};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

id_type!(
    /// Opaque handle of a game object (emitter, listener or room) in the sound engine
    GameObjectId(u64)
);
id_type!(
    /// Identity of a spatial audio room
    RoomId(u64)
);
id_type!(
    /// Identity of an acoustic portal
    PortalId(u64)
);
id_type!(
    /// Short id of an auxiliary bus
    AuxBusId(u32)
);
id_type!(
    /// Handle of one playing instance of an event
    PlayingId(u32)
);
id_type!(
    /// Identity of a geometry set and of its instance
    GeometrySetId(u64)
);
id_type!(
    /// Short id of an event
    EventId(u32)
);
id_type!(
    /// Short id of a switch group
    SwitchGroupId(u32)
);
id_type!(
    /// Short id of a state within a switch group
    SwitchStateId(u32)
);
id_type!(
    /// Short id of a trigger
    TriggerId(u32)
);

impl RoomId {
    /// Rooms are game objects too; they share the numeric id.
    pub fn game_object(self) -> GameObjectId {
        GameObjectId(self.0)
    }
}

/// One auxiliary send of a game object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxSendValue {
    pub aux_bus: AuxBusId,
    /// Send gain in [0, 1]
    pub gain: f32,
}

/// Parameters of a room as registered with the sound engine
#[derive(Debug, Clone, PartialEq)]
pub struct RoomParams {
    pub up: Vec3,
    pub front: Vec3,
    /// Wall occlusion applied to sound crossing the room boundary, in [0, 1]
    pub transmission_loss: f32,
    pub reverb_aux_bus: Option<AuxBusId>,
    pub reverb_level: f32,
    pub geometry_instance: Option<GeometrySetId>,
    /// Send level of sounds posted on the room itself to its own reverb
    pub self_send_level: f32,
    /// Keep the room game object registered even when nothing plays on it
    pub keep_registered: bool,
}

impl Default for RoomParams {
    fn default() -> Self {
        Self {
            up: Vec3::Y,
            front: -Vec3::Z,
            transmission_loss: 1.0,
            reverb_aux_bus: None,
            reverb_level: 1.0,
            geometry_instance: None,
            self_send_level: 0.0,
            keep_registered: false,
        }
    }
}

/// Parameters of a portal as registered with the sound engine
#[derive(Debug, Clone, PartialEq)]
pub struct PortalParams {
    pub pose: Pose,
    pub half_extents: Vec3,
    pub enabled: bool,
    pub front_room: Option<RoomId>,
    pub back_room: Option<RoomId>,
}

/// Obstruction and occlusion of an emitter as heard by one listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstructionValue {
    pub listener: GameObjectId,
    pub obstruction: f32,
    pub occlusion: f32,
}

/// Everything that changed for one game object during a tick.
///
/// `None` fields are unchanged and are not sent.
#[derive(Debug, Clone, PartialEq)]
pub struct GameObjectUpdate {
    pub game_object: GameObjectId,
    pub pose: Option<Pose>,
    pub room: Option<Option<RoomId>>,
    pub aux_sends: Option<Vec<AuxSendValue>>,
    pub obstruction: Vec<ObstructionValue>,
}

impl GameObjectUpdate {
    pub fn new(game_object: GameObjectId) -> Self {
        Self {
            game_object,
            pose: None,
            room: None,
            aux_sends: None,
            obstruction: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pose.is_none()
            && self.room.is_none()
            && self.aux_sends.is_none()
            && self.obstruction.is_empty()
    }
}
